use std::path::PathBuf;

use crate::notification::domain::sink_error::SinkError;
use crate::shared::frame::Frame;
use crate::shared::timestamp::Timestamp;

/// Persists intruder snapshots.
///
/// Implementations must never overwrite an existing snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Writes `frame` and returns the path it was saved to.
    fn save(&self, frame: &Frame, at: Timestamp) -> Result<PathBuf, SinkError>;
}
