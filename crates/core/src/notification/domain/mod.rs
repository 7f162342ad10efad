pub mod alert_notifier;
pub mod event_recorder;
pub mod intent_sink;
pub mod sink_error;
pub mod snapshot_store;
pub mod speaker;
