use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "media-catalog")]
#[command(about = "Index a media folder and manage its tags, reactions and analytics", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the database schema
    Init,
    /// Index the root directory (only for a new database unless forced)
    Index {
        /// Re-walk the tree even if the database already existed
        #[arg(long)]
        force: bool,
    },
    /// Index a single file or directory under the root
    IndexFile { path: PathBuf },
    /// Copy files into the root (or a folder under it) and index them
    Import {
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        /// Destination folder relative to the root
        #[arg(long)]
        folder: Option<String>,
    },
    /// Recompute the subtype of every cataloged entry
    Reclassify,
    /// List every cataloged entry
    Files,
    /// Show a file with its tags, reactions and analytics
    File { id: i64 },
    /// Delete a cataloged entry and everything under it
    DeleteFile { id: i64 },
    /// Count a view of a file
    View { file_id: i64, file_type: String },
    /// Show the analytics of a file
    Analytics { file_id: i64 },
    /// Apply a JSON analytics report ({"fileId", "fileType", "totalWatchTime", "skips", ...})
    UpdateAnalytics { payload: String },
    /// Likes at a playback position
    Like {
        #[command(subcommand)]
        action: ReactionAction,
    },
    /// Dislikes at a playback position
    Dislike {
        #[command(subcommand)]
        action: ReactionAction,
    },
    /// The favorite mark of a file
    Favorite {
        #[command(subcommand)]
        action: FavoriteAction,
    },
    /// Tags and their file associations
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },
    /// Color palettes
    Color {
        #[command(subcommand)]
        action: ColorAction,
    },
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Subcommand)]
pub enum ReactionAction {
    Add {
        file_id: i64,
        #[arg(allow_negative_numbers = true)]
        timestamp: f64,
    },
    List { file_id: i64 },
    Remove { id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum FavoriteAction {
    Add {
        file_id: i64,
        #[arg(long)]
        timestamp: Option<f64>,
    },
    Show { file_id: i64 },
    Remove { file_id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum TagAction {
    List,
    /// Tags attached to one file
    Of { file_id: i64 },
    Create {
        name: String,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    Delete { id: i64 },
    /// Attach a tag to a file
    Assign { file_id: i64, tag_id: i64 },
    /// Detach a tag from a file
    Unassign { file_id: i64, tag_id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum ColorAction {
    List,
    /// Create a palette from a name and one or more colors
    Create {
        name: String,
        #[arg(required = true)]
        colors: Vec<String>,
    },
    Show { id: i64 },
    Delete { id: i64 },
}
