use std::time::Duration;

use thiserror::Error;

use crate::access::domain::voting_window::TieBreak;
use crate::recognition::domain::frame_tagger::ScoreComparison;
use crate::shared::constants::{
    DEFAULT_ALERT_COOLDOWN_SECS, DEFAULT_ANIMATION_STEPS, DEFAULT_HOLD_SECS, DEFAULT_THRESHOLD,
    DEFAULT_WINDOW, MAX_TIMER_SECS,
};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("voting window must be odd, got {0}")]
    EvenWindow(usize),
    #[error("voting window must be at least 3, got {0}")]
    WindowTooSmall(usize),
    #[error("threshold must be a positive finite number, got {0}")]
    InvalidThreshold(f64),
    #[error("hold duration must be greater than zero")]
    ZeroHold,
    #[error("hold duration must be at most {max}s, got {0:?}", max = MAX_TIMER_SECS)]
    HoldTooLong(Duration),
    #[error("alert cooldown must be at most {max}s, got {0:?}", max = MAX_TIMER_SECS)]
    CooldownTooLong(Duration),
}

/// Decision parameters, fixed for the lifetime of the access loop.
#[derive(Clone, Debug, PartialEq)]
pub struct AccessConfig {
    pub threshold: f64,
    pub comparison: ScoreComparison,
    pub window: usize,
    pub tie_break: TieBreak,
    pub hold: Duration,
    pub alert_cooldown: Duration,
    pub animation_steps: u32,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            comparison: ScoreComparison::default(),
            window: DEFAULT_WINDOW,
            tie_break: TieBreak::default(),
            hold: Duration::from_secs_f64(DEFAULT_HOLD_SECS),
            alert_cooldown: Duration::from_secs_f64(DEFAULT_ALERT_COOLDOWN_SECS),
            animation_steps: DEFAULT_ANIMATION_STEPS,
        }
    }
}

impl AccessConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window < 3 {
            return Err(ConfigError::WindowTooSmall(self.window));
        }
        if self.window % 2 == 0 {
            return Err(ConfigError::EvenWindow(self.window));
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if self.hold.is_zero() {
            return Err(ConfigError::ZeroHold);
        }
        let max = Duration::from_secs(MAX_TIMER_SECS);
        if self.hold > max {
            return Err(ConfigError::HoldTooLong(self.hold));
        }
        if self.alert_cooldown > max {
            return Err(ConfigError::CooldownTooLong(self.alert_cooldown));
        }
        Ok(())
    }
}
