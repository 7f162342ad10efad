use std::time::Duration;

use crate::shared::timestamp::Timestamp;

/// Allows at most one security alert per cooldown interval.
///
/// A continuously present unrecognized face keeps producing confirmed
/// `Unknown` majorities; only the first one per interval may snapshot and
/// notify.
#[derive(Clone, Debug)]
pub struct AlertThrottle {
    cooldown: Duration,
    last_alert_at: Option<Timestamp>,
}

impl AlertThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_alert_at: None,
        }
    }

    /// Side-effect free; may be queried any number of times per tick.
    pub fn allow(&self, now: Timestamp) -> bool {
        match self.last_alert_at {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.cooldown,
        }
    }

    /// Must be called exactly once per dispatched alert.
    pub fn record(&mut self, now: Timestamp) {
        self.last_alert_at = Some(now);
    }
}
