/// LBPH distances below this are accepted as a match (65-85 is typical).
pub const DEFAULT_THRESHOLD: f64 = 75.0;

/// Voting window width; must be odd.
pub const DEFAULT_WINDOW: usize = 5;

pub const DEFAULT_HOLD_SECS: f64 = 4.0;
pub const DEFAULT_ALERT_COOLDOWN_SECS: f64 = 2.0;
pub const DEFAULT_ANIMATION_STEPS: u32 = 8;

/// Upper bound for the hold and alert cooldown timers (one day).
pub const MAX_TIMER_SECS: u64 = 86_400;

/// Frame rate assumed for replayed input that carries no timestamps.
pub const DEFAULT_REPLAY_FPS: f64 = 30.0;

pub const DEFAULT_DISPATCH_WORKERS: usize = 2;
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// How long shutdown waits for in-flight notifications before abandoning them.
pub const DEFAULT_SHUTDOWN_GRACE_SECS: f64 = 3.0;

pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

pub const SNAPSHOT_PREFIX: &str = "intruder";
pub const SNAPSHOT_EXTENSION: &str = "jpg";

pub const STARTUP_ANNOUNCEMENT: &str = "Smart door system activated";
pub const SHUTDOWN_ANNOUNCEMENT: &str = "System shutting down.";
pub const DENIED_ANNOUNCEMENT: &str = "Warning. Unknown person detected. Access denied.";
pub const INTRUDER_ALERT_MESSAGE: &str = "Alert! Unknown person detected at your door.";
