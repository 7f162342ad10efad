use std::sync::Arc;
use std::time::Duration;

use crate::access::domain::access_config::{AccessConfig, ConfigError};
use crate::access::domain::alert_throttle::AlertThrottle;
use crate::access::domain::intent::{AccessEvent, AccessOutcome, Alert, Intent};
use crate::access::domain::voting_window::{Vote, VotingWindow};
use crate::recognition::domain::detection::IdentityId;
use crate::recognition::domain::frame_tag::FrameTag;
use crate::recognition::domain::identity_directory::IdentityDirectory;
use crate::shared::constants::{
    DENIED_ANNOUNCEMENT, INTRUDER_ALERT_MESSAGE, UNKNOWN_DISPLAY_NAME,
};
use crate::shared::frame::Frame;
use crate::shared::timestamp::Timestamp;

/// Door lock state.
///
/// `Granting` and `Denying` are transient: a tick passes through them and
/// settles in `Open` or `Locked` before returning, so they only ever show up
/// in [`TickOutcome::passed_through`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessState {
    Locked,
    Granting(IdentityId),
    Open {
        identity: IdentityId,
        expiry: Timestamp,
    },
    Denying,
}

impl AccessState {
    pub fn is_open(&self) -> bool {
        matches!(self, AccessState::Open { .. })
    }

    pub fn identity(&self) -> Option<IdentityId> {
        match self {
            AccessState::Granting(id) => Some(*id),
            AccessState::Open { identity, .. } => Some(*identity),
            AccessState::Locked | AccessState::Denying => None,
        }
    }
}

/// Subject of the most recent grant/deny announcement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Announced {
    Identity(IdentityId),
    Unknown,
}

/// Per-frame context that is not part of the vote itself.
#[derive(Clone, Debug, Default)]
pub struct FrameEvidence {
    /// Score of record for the frame's tag, logged with the event.
    pub score: Option<f64>,
    /// Frame pixels, snapshotted if this tick raises an alert.
    pub image: Option<Arc<Frame>>,
}

/// Result of one tick.
#[derive(Clone, Debug)]
pub struct TickOutcome {
    pub vote: Vote,
    pub confirmed: bool,
    /// Settled state after the tick.
    pub state: AccessState,
    /// Transient state entered during this tick, if any.
    pub passed_through: Option<AccessState>,
    /// Intents in the order they must be dispatched.
    pub intents: Vec<Intent>,
}

/// The access decision core.
///
/// Consumes one frame tag per tick, votes over a sliding window and moves
/// between `Locked` and `Open`, holding the door for a fixed duration after
/// the last confirmed sighting. Grant and deny announcements are
/// deduplicated against the last announced subject, and deny side effects
/// are rate-limited by an [`AlertThrottle`].
///
/// The access loop is the only owner; nothing here is shared or locked.
pub struct AccessStateMachine {
    window: VotingWindow,
    throttle: AlertThrottle,
    hold: Duration,
    directory: Arc<IdentityDirectory>,
    state: AccessState,
    last_announced: Option<Announced>,
}

impl AccessStateMachine {
    pub fn new(
        config: &AccessConfig,
        directory: Arc<IdentityDirectory>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            window: VotingWindow::new(config.window, config.tie_break),
            throttle: AlertThrottle::new(config.alert_cooldown),
            hold: config.hold,
            directory,
            state: AccessState::Locked,
            last_announced: None,
        })
    }

    pub fn state(&self) -> AccessState {
        self.state
    }

    /// Pushes this frame's tag into the voting window and advances the state
    /// machine with the resulting majority.
    pub fn tick(
        &mut self,
        tag: FrameTag,
        now: Timestamp,
        evidence: FrameEvidence,
    ) -> TickOutcome {
        let vote = self.window.push(tag);
        self.decide(vote, now, evidence)
    }

    fn decide(&mut self, vote: Vote, now: Timestamp, evidence: FrameEvidence) -> TickOutcome {
        let confirmed = self.window.is_confirmed(&vote);
        let decision = confirmed.then_some(vote.majority);
        let mut intents = Vec::new();
        let mut passed_through = None;

        match (self.state, decision) {
            (AccessState::Locked, Some(FrameTag::Known(id))) => {
                passed_through = Some(AccessState::Granting(id));
                self.grant(id, now, evidence.score, &mut intents);
            }
            (AccessState::Locked, Some(FrameTag::Unknown)) => {
                if self.throttle.allow(now) {
                    passed_through = Some(AccessState::Denying);
                    self.deny(now, evidence, &mut intents);
                }
            }
            (AccessState::Open { identity, .. }, Some(FrameTag::Known(id))) => {
                if id == identity {
                    self.state = AccessState::Open {
                        identity,
                        expiry: now.saturating_add(self.hold),
                    };
                } else {
                    passed_through = Some(AccessState::Granting(id));
                    self.grant(id, now, evidence.score, &mut intents);
                }
            }
            (AccessState::Open { identity, expiry }, _) if now > expiry => {
                log::info!(
                    "Auto-locking after hold expired for {}",
                    self.directory.display_name(identity)
                );
                self.state = AccessState::Locked;
                self.last_announced = None;
                self.window.reset();
            }
            _ => {}
        }

        TickOutcome {
            vote,
            confirmed,
            state: self.state,
            passed_through,
            intents,
        }
    }

    fn grant(
        &mut self,
        id: IdentityId,
        now: Timestamp,
        score: Option<f64>,
        intents: &mut Vec<Intent>,
    ) {
        let name = self.directory.display_name(id).to_string();
        self.state = AccessState::Open {
            identity: id,
            expiry: now.saturating_add(self.hold),
        };

        if self.last_announced == Some(Announced::Identity(id)) {
            return;
        }
        log::info!("Access granted to {name} ({id})");
        intents.push(Intent::LogEvent(AccessEvent {
            subject: Some(id),
            name: name.clone(),
            outcome: AccessOutcome::Granted,
            score,
            at: now,
        }));
        intents.push(Intent::Speak(format!("Access granted. Welcome {name}")));
        self.last_announced = Some(Announced::Identity(id));
    }

    fn deny(&mut self, now: Timestamp, evidence: FrameEvidence, intents: &mut Vec<Intent>) {
        log::info!("Access denied: unknown person confirmed");
        intents.push(Intent::LogEvent(AccessEvent {
            subject: None,
            name: UNKNOWN_DISPLAY_NAME.to_string(),
            outcome: AccessOutcome::Denied,
            score: evidence.score,
            at: now,
        }));
        intents.push(Intent::RaiseAlert(Alert {
            message: INTRUDER_ALERT_MESSAGE.to_string(),
            snapshot: evidence.image,
            at: now,
        }));
        if self.last_announced != Some(Announced::Unknown) {
            intents.push(Intent::Speak(DENIED_ANNOUNCEMENT.to_string()));
            self.last_announced = Some(Announced::Unknown);
        }
        self.throttle.record(now);
        self.state = AccessState::Locked;
    }
}
