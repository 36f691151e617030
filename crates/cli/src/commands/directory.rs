//! External organization dataset checks.
//!
//! # Usage
//!
//! ```bash
//! vh-cli directory check [--path <file>]
//! ```

use std::path::PathBuf;

use thiserror::Error;
use volunteer_hub_web::directory::{Directory, DirectoryError};

/// Bundled dataset location, relative to the workspace root.
const DEFAULT_PATH: &str = "crates/web/data/organizations.json";

/// Errors that can occur while checking the dataset.
#[derive(Debug, Error)]
pub enum CheckError {
    /// File unreadable or not valid JSON.
    #[error(transparent)]
    Load(#[from] DirectoryError),

    /// Two or more records share an id.
    #[error("Duplicate ids: {0:?}")]
    DuplicateIds(Vec<i64>),
}

/// Load the dataset and report its size; fails on duplicate ids.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or ids repeat.
pub fn check(path: Option<PathBuf>) -> Result<(), CheckError> {
    let _ = dotenvy::dotenv();

    let path = path
        .or_else(|| std::env::var("HUB_DIRECTORY_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PATH));

    let directory = Directory::load(&path)?;
    let duplicates = directory.duplicate_ids();

    #[allow(clippy::print_stdout)]
    {
        println!("{}: {} records", path.display(), directory.len());
    }

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(CheckError::DuplicateIds(duplicates))
    }
}
