use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::recognition::domain::detection::IdentityId;
use crate::shared::frame::Frame;
use crate::shared::timestamp::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessOutcome {
    #[serde(rename = "access_granted")]
    Granted,
    #[serde(rename = "access_denied")]
    Denied,
}

impl fmt::Display for AccessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessOutcome::Granted => write!(f, "access_granted"),
            AccessOutcome::Denied => write!(f, "access_denied"),
        }
    }
}

/// A grant or deny decision, destined for the append-only event log.
#[derive(Clone, Debug, PartialEq)]
pub struct AccessEvent {
    /// `None` for an unrecognized subject.
    pub subject: Option<IdentityId>,
    pub name: String,
    pub outcome: AccessOutcome,
    pub score: Option<f64>,
    pub at: Timestamp,
}

/// A security alert for a confirmed unknown presence.
///
/// Carries the frame pixels rather than a path: the snapshot file is written
/// off the decision loop, and its path is attached at delivery time.
#[derive(Clone, Debug)]
pub struct Alert {
    pub message: String,
    pub snapshot: Option<Arc<Frame>>,
    pub at: Timestamp,
}

/// Side effect requested by the decision engine.
///
/// Intents are values: once emitted, the engine keeps no reference to them
/// and delivery is entirely the sink's concern.
#[derive(Clone, Debug)]
pub enum Intent {
    Speak(String),
    LogEvent(AccessEvent),
    RaiseAlert(Alert),
}

impl Intent {
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::Speak(_) => "speak",
            Intent::LogEvent(_) => "log_event",
            Intent::RaiseAlert(_) => "raise_alert",
        }
    }
}
