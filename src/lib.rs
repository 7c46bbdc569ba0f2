pub mod analytics;
pub mod cache;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod payload;
pub mod scanner;

pub use catalog::Catalog;
pub use classify::classify;
pub use config::Settings;
pub use db::Database;
pub use error::{Error, Result};
pub use scanner::Scanner;
