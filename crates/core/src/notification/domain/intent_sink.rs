use crate::access::domain::intent::Intent;

/// Outbound side of the access loop.
///
/// Must never block: an implementation that cannot accept an intent right
/// away drops it and returns `false`.
pub trait IntentSink {
    fn dispatch(&self, intent: Intent) -> bool;

    /// Intents accepted but not yet picked up by a worker.
    fn queue_depth(&self) -> usize {
        0
    }
}
