use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;

use crate::analytics::DEFAULT_SKIP_BUCKET_SECS;
use crate::models::Subtype;

pub const DEFAULT_ROOT_DIRECTORY: &str = "./static";
pub const DEFAULT_DB_FILE_NAME: &str = "file_paths.db";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Folder whose contents are cataloged and served.
    pub root_directory: PathBuf,
    /// Database location; defaults to `file_paths.db` inside the root.
    pub file_db_path: Option<PathBuf>,
    pub directory_subtype: Subtype,
    pub skip_bucket_secs: i64,
}

impl Settings {
    pub fn new(root_directory: impl Into<PathBuf>) -> Self {
        Self {
            root_directory: root_directory.into(),
            file_db_path: None,
            directory_subtype: Subtype::Text,
            skip_bucket_secs: DEFAULT_SKIP_BUCKET_SECS,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.file_db_path
            .clone()
            .unwrap_or_else(|| self.root_directory.join(DEFAULT_DB_FILE_NAME))
    }

    /// The database file and the journal files SQLite keeps beside it.
    pub fn db_files(&self) -> Vec<PathBuf> {
        let db = self.db_path();
        let mut files = vec![db.clone()];
        for suffix in ["-wal", "-shm", "-journal"] {
            let mut name = db.clone().into_os_string();
            name.push(suffix);
            files.push(PathBuf::from(name));
        }
        files
    }
}

/// Defaults, then `media-catalog.toml` if present, then environment variables
/// (`ROOT_DIRECTORY`, `FILE_DB_PATH`, `DIRECTORY_SUBTYPE`, `SKIP_BUCKET_SECS`).
pub fn load_settings() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .set_default("root_directory", DEFAULT_ROOT_DIRECTORY)?
        .set_default("directory_subtype", Subtype::Text.as_str())?
        .set_default("skip_bucket_secs", DEFAULT_SKIP_BUCKET_SECS)?
        .add_source(ConfigFile::with_name("media-catalog").required(false))
        .add_source(Environment::default().try_parsing(true))
        .build()?;
    builder.try_deserialize::<Settings>()
}
