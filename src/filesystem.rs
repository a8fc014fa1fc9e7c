use std::collections::HashSet;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncBufReadExt;

use crate::display::Display;
use crate::logging;

#[derive(Error, Debug)]
#[error("Directory could not be created (Path: '{path})': {source}")]
pub struct DirectoryCreationError {
    path: String,
    source: std::io::Error,
}

pub async fn create_directory(dir_to_create: &PathBuf) -> Result<(), DirectoryCreationError> {
    if !dir_to_create.exists() {
        let dir_display = dir_to_create.to_display();
        logging::debug!("Create directory: {}", &dir_display);
        tokio::fs::create_dir_all(dir_to_create)
            .await
            .map_err(|e| DirectoryCreationError {
                path: dir_display,
                source: e,
            })?;
    }
    Ok(())
}

#[derive(Error, Debug)]
pub enum ItemUniverseError {
    #[error("open items file '{path}': {source}")]
    FileOpenFailed {
        path: String,
        source: std::io::Error,
    },
    #[error("read items file '{path}' (line {line}): {source}")]
    FileReadFailed {
        path: String,
        line: usize,
        source: std::io::Error,
    },
    #[error("invalid item id '{content}' in '{path}' (line {line}): {source}")]
    InvalidItemId {
        path: String,
        line: usize,
        content: String,
        source: ParseIntError,
    },
}

/// Reads an item list: one `<type_id>, <optional name>` per line.
///
/// Blank lines and lines starting with `#` are ignored. Ids are returned in file order,
/// duplicates removed.
pub async fn load_item_universe(path: &Path) -> Result<Vec<i32>, ItemUniverseError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|source| ItemUniverseError::FileOpenFailed {
            path: path.to_display(),
            source,
        })?;
    let mut lines = tokio::io::BufReader::new(file).lines();

    let mut seen = HashSet::new();
    let mut items = vec![];
    let mut line_nb = 0;
    while let Some(line) =
        lines
            .next_line()
            .await
            .map_err(|source| ItemUniverseError::FileReadFailed {
                path: path.to_display(),
                line: line_nb + 1,
                source,
            })?
    {
        line_nb += 1;
        let trimmed_line = line.trim();
        if trimmed_line.is_empty() || trimmed_line.starts_with('#') {
            continue;
        }
        let id = trimmed_line
            .split(',')
            .next()
            .unwrap_or_default()
            .trim();
        let item_id: i32 = id.parse().map_err(|source| ItemUniverseError::InvalidItemId {
            path: path.to_display(),
            line: line_nb,
            content: id.to_string(),
            source,
        })?;
        if seen.insert(item_id) {
            items.push(item_id);
        } else {
            logging::debug!("Item '{}' listed twice in '{}'", item_id, path.to_display());
        }
    }
    logging::debug!("Loaded {} items from '{}'", items.len(), path.to_display());
    Ok(items)
}
