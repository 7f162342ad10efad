use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::recognition::domain::detection::IdentityId;
use crate::recognition::domain::identity_directory::IdentityDirectory;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("failed to read label map {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("label map {path} is not a JSON object: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Loads the `label -> name` map written by the training step.
///
/// The file is a JSON object keyed by stringified integer labels, e.g.
/// `{"1": "Pavan", "2": "Asha"}`. Entries with a non-integer key or a
/// non-string name are skipped; those ids then display as "Unknown".
pub fn load(path: &Path) -> Result<IdentityDirectory, DirectoryError> {
    let json = fs::read_to_string(path).map_err(|e| DirectoryError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse(&json).map_err(|e| DirectoryError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn parse(json: &str) -> Result<IdentityDirectory, serde_json::Error> {
    let raw: Map<String, Value> = serde_json::from_str(json)?;

    let directory: IdentityDirectory = raw
        .into_iter()
        .filter_map(|(key, value)| {
            let Ok(label) = key.trim().parse::<u32>() else {
                log::warn!("Skipping label map entry with non-integer key {key:?}");
                return None;
            };
            match value {
                Value::String(name) if !name.trim().is_empty() => {
                    Some((IdentityId(label), name.trim().to_string()))
                }
                other => {
                    log::warn!("Skipping label map entry {label}: unusable name {other}");
                    None
                }
            }
        })
        .collect();

    log::info!("Loaded {} identities from label map", directory.len());
    Ok(directory)
}
