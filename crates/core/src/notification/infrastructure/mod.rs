pub mod image_snapshot_store;
pub mod jsonl_event_log;
pub mod log_alert_notifier;
pub mod log_speaker;
pub mod notification_dispatcher;
