pub mod access_config;
pub mod access_state_machine;
pub mod alert_throttle;
pub mod door_animator;
pub mod intent;
pub mod voting_window;
