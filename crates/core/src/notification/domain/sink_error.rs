use std::path::PathBuf;

use thiserror::Error;

/// Delivery failure in a notification sink.
///
/// Never reaches the access loop: the dispatcher retries once, then drops
/// the intent.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}
