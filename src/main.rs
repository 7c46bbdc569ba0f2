mod cli;
mod logging;

use std::process;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use dotenv::dotenv;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use cli::{Cli, ColorAction, Commands, FavoriteAction, ReactionAction, TagAction};
use media_catalog::config::load_settings;
use media_catalog::models::Subtype;
use media_catalog::payload::{AnalyticsUpdate, NewPalette, NewTag, TagUpdate};
use media_catalog::{Catalog, Settings};

fn main() {
    dotenv().ok();
    logging::init_logger();

    let args = Cli::parse();
    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return;
    };

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    if let Commands::PrintConfig = command {
        println!("Configuration: {:?}", settings);
        println!("Database: {}", settings.db_path().display());
        return;
    }

    if let Err(err) = run(command, settings) {
        let client_error = err
            .downcast_ref::<media_catalog::Error>()
            .is_some_and(media_catalog::Error::is_client_error);
        if client_error {
            warn!("{}", err);
            process::exit(2);
        }
        error!("{:#}", err);
        process::exit(1);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(command: Commands, settings: Settings) -> Result<()> {
    if !settings.root_directory.is_dir() {
        anyhow::bail!(
            "Root directory not found: {}",
            settings.root_directory.display()
        );
    }

    let db_existed = settings.db_path().exists();
    info!("Root directory: {}", settings.root_directory.display());
    info!("Database: {}", settings.db_path().display());

    let catalog = Catalog::open(settings).context("opening the catalog database")?;

    match command {
        Commands::PrintConfig => {
            println!("Configuration: {:?}", catalog.settings());
        }
        Commands::Init => {
            info!("Database schema ready");
        }
        Commands::Index { force } => {
            if db_existed && !force {
                info!("Database exists, skipping file scan (use --force to reindex)");
                return Ok(());
            }
            info!(
                "{} files...",
                if force { "Force re-indexing" } else { "New database - indexing" }
            );
            let start_time = Instant::now();
            let summary = catalog.index_tree()?;
            info!("Scan complete in {:.2?}", start_time.elapsed());
            print_json(&summary)?;
        }
        Commands::IndexFile { path } => print_json(&catalog.index_path(&path)?)?,
        Commands::Import { sources, folder } => {
            let results = catalog.import_files(sources.as_slice(), folder.as_deref())?;
            print_json(&results)?;
        }
        Commands::Reclassify => {
            let changed = catalog.reclassify()?;
            print_json(&json!({ "updated": changed }))?;
        }
        Commands::Files => print_json(&catalog.files()?)?,
        Commands::File { id } => print_json(&catalog.file_details(id)?)?,
        Commands::DeleteFile { id } => {
            catalog.delete_file(id)?;
            print_json(&json!({ "message": "File removed from the catalog." }))?;
        }
        Commands::View { file_id, file_type } => {
            let file_type = file_type.parse::<Subtype>().map_err(anyhow::Error::msg)?;
            print_json(&catalog.record_view(file_id, file_type)?)?;
        }
        Commands::Analytics { file_id } => print_json(&catalog.analytics(file_id)?)?,
        Commands::UpdateAnalytics { payload } => {
            let value: Value = serde_json::from_str(&payload).context("payload is not JSON")?;
            let update = AnalyticsUpdate::from_json(&value)?;
            print_json(&catalog.update_analytics(&update)?)?;
        }
        Commands::Like { action } => match action {
            ReactionAction::Add { file_id, timestamp } => {
                print_json(&catalog.add_like(file_id, timestamp)?)?
            }
            ReactionAction::List { file_id } => print_json(&catalog.likes(file_id)?)?,
            ReactionAction::Remove { id } => {
                catalog.remove_like(id)?;
                print_json(&json!({ "message": "Like removed successfully" }))?;
            }
        },
        Commands::Dislike { action } => match action {
            ReactionAction::Add { file_id, timestamp } => {
                print_json(&catalog.add_dislike(file_id, timestamp)?)?
            }
            ReactionAction::List { file_id } => print_json(&catalog.dislikes(file_id)?)?,
            ReactionAction::Remove { id } => {
                catalog.remove_dislike(id)?;
                print_json(&json!({ "message": "Dislike removed successfully" }))?;
            }
        },
        Commands::Favorite { action } => match action {
            FavoriteAction::Add { file_id, timestamp } => {
                print_json(&catalog.add_favorite(file_id, timestamp)?)?
            }
            FavoriteAction::Show { file_id } => print_json(&catalog.favorite(file_id)?)?,
            FavoriteAction::Remove { file_id } => {
                catalog.remove_favorite(file_id)?;
                print_json(&json!({ "message": "Favorite removed successfully." }))?;
            }
        },
        Commands::Tag { action } => match action {
            TagAction::List => print_json(&catalog.tags()?)?,
            TagAction::Of { file_id } => print_json(&catalog.file_tags(file_id)?)?,
            TagAction::Create { name, group, color } => {
                let tag = NewTag::new(&name, group.as_deref(), color.as_deref())?;
                print_json(&catalog.create_tag(&tag)?)?;
            }
            TagAction::Update {
                id,
                name,
                group,
                color,
            } => {
                let update = TagUpdate {
                    name,
                    tag_group: group,
                    color,
                }
                .validated()?;
                print_json(&catalog.update_tag(id, &update)?)?;
            }
            TagAction::Delete { id } => {
                catalog.delete_tag(id)?;
                print_json(&json!({ "message": "Tag deleted." }))?;
            }
            TagAction::Assign { file_id, tag_id } => {
                catalog.tag_file(file_id, tag_id)?;
                print_json(&json!({ "success": true, "fileId": file_id, "tagId": tag_id }))?;
            }
            TagAction::Unassign { file_id, tag_id } => {
                catalog.untag_file(file_id, tag_id)?;
                print_json(&json!({ "success": true, "fileId": file_id, "tagId": tag_id }))?;
            }
        },
        Commands::Color { action } => match action {
            ColorAction::List => print_json(&catalog.palettes()?)?,
            ColorAction::Create { name, colors } => {
                let palette =
                    NewPalette::from_json(&json!({ "name": name, "colorPalette": colors }))?;
                print_json(&catalog.create_palette(&palette)?)?;
            }
            ColorAction::Show { id } => print_json(&catalog.palette(id)?)?,
            ColorAction::Delete { id } => {
                catalog.delete_palette(id)?;
                print_json(&json!({ "message": "Color palette deleted successfully." }))?;
            }
        },
    }

    Ok(())
}
