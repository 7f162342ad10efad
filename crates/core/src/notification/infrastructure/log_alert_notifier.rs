use std::path::Path;

use crate::notification::domain::alert_notifier::AlertNotifier;
use crate::notification::domain::sink_error::SinkError;

/// Alert notifier that reports to the log.
///
/// Outward transports (chat bots, push services) plug in behind the same
/// trait.
pub struct LogAlertNotifier;

impl AlertNotifier for LogAlertNotifier {
    fn notify(&self, message: &str, snapshot: Option<&Path>) -> Result<(), SinkError> {
        match snapshot {
            Some(path) => log::warn!("[alert] {message} (snapshot: {})", path.display()),
            None => log::warn!("[alert] {message}"),
        }
        Ok(())
    }
}
