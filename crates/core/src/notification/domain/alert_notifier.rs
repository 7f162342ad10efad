use std::path::Path;

use crate::notification::domain::sink_error::SinkError;

/// Outward security notification (push message, chat bot, pager).
///
/// Transport, formatting and any retries beyond the dispatcher's single
/// retry belong to the implementation.
pub trait AlertNotifier: Send + Sync {
    fn notify(&self, message: &str, snapshot: Option<&Path>) -> Result<(), SinkError>;
}
