use crate::access::domain::intent::AccessEvent;
use crate::notification::domain::sink_error::SinkError;

/// Append-only record of grant and deny decisions.
pub trait EventRecorder: Send + Sync {
    fn record(&self, event: &AccessEvent) -> Result<(), SinkError>;
}
