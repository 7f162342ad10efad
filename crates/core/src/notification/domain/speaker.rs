use crate::notification::domain::sink_error::SinkError;

/// Voice output. Playback is slow; only ever called from dispatcher workers.
pub trait Speaker: Send + Sync {
    fn speak(&self, text: &str) -> Result<(), SinkError>;
}
