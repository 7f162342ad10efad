use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::access::domain::intent::{Alert, Intent};
use crate::notification::domain::alert_notifier::AlertNotifier;
use crate::notification::domain::event_recorder::EventRecorder;
use crate::notification::domain::intent_sink::IntentSink;
use crate::notification::domain::sink_error::SinkError;
use crate::notification::domain::snapshot_store::SnapshotStore;
use crate::notification::domain::speaker::Speaker;

/// The delivery targets shared by all dispatcher workers.
pub struct Sinks {
    pub speaker: Box<dyn Speaker>,
    pub recorder: Box<dyn EventRecorder>,
    pub notifier: Box<dyn AlertNotifier>,
    pub snapshots: Box<dyn SnapshotStore>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Intents delivered, possibly on the retry.
    pub delivered: usize,
    /// Intents (or alert snapshots) that failed twice and were dropped.
    pub failed: usize,
    /// Intents refused because the queue was full or closed.
    pub dropped: usize,
    /// Workers still busy when the shutdown grace period ran out.
    pub abandoned_workers: usize,
}

#[derive(Default)]
struct Counters {
    delivered: AtomicUsize,
    failed: AtomicUsize,
    dropped: AtomicUsize,
}

/// Drains intents on a pool of worker threads so the access loop never
/// waits on speech, disk or network.
///
/// Layout: `loop → [bounded queue] → worker × N → sinks`
///
/// Intents are enqueued in tick order; with more than one worker they may
/// complete in any order.
pub struct NotificationDispatcher {
    sender: Option<Sender<Intent>>,
    queue: Receiver<Intent>,
    workers: Vec<JoinHandle<()>>,
    done_rx: Receiver<usize>,
    counters: Arc<Counters>,
}

impl NotificationDispatcher {
    pub fn spawn(sinks: Sinks, workers: usize, capacity: usize) -> Self {
        let (sender, queue) = crossbeam_channel::bounded::<Intent>(capacity.max(1));
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<usize>();
        let sinks = Arc::new(sinks);
        let counters = Arc::new(Counters::default());

        let workers = (0..workers.max(1))
            .map(|id| {
                spawn_worker(
                    id,
                    Arc::clone(&sinks),
                    queue.clone(),
                    Arc::clone(&counters),
                    done_tx.clone(),
                )
            })
            .collect();

        Self {
            sender: Some(sender),
            queue,
            workers,
            done_rx,
            counters,
        }
    }

    /// Enqueues `intent` without blocking. Returns `false` if it was dropped.
    pub fn dispatch(&self, intent: Intent) -> bool {
        let Some(sender) = &self.sender else {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        match sender.try_send(intent) {
            Ok(()) => true,
            Err(TrySendError::Full(intent)) => {
                log::warn!("Notification queue full, dropping {} intent", intent.kind());
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Disconnected(intent)) => {
                log::warn!(
                    "Notification workers gone, dropping {} intent",
                    intent.kind()
                );
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            abandoned_workers: 0,
        }
    }

    /// Closes the queue and waits up to `grace` for the workers to drain it.
    ///
    /// Workers still running at the deadline are detached; whatever they
    /// were delivering may or may not complete.
    pub fn shutdown(mut self, grace: Duration) -> DispatchStats {
        drop(self.sender.take());

        let deadline = Instant::now() + grace;
        let mut finished = vec![false; self.workers.len()];
        let mut remaining = self.workers.len();
        while remaining > 0 {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.done_rx.recv_timeout(left) {
                Ok(id) => {
                    finished[id] = true;
                    remaining -= 1;
                }
                Err(_) => break,
            }
        }

        let mut abandoned = 0;
        for (id, handle) in self.workers.drain(..).enumerate() {
            if finished[id] || handle.is_finished() {
                if handle.join().is_err() {
                    log::warn!("Notification worker {id} panicked");
                }
            } else {
                abandoned += 1;
            }
        }
        if abandoned > 0 {
            log::warn!(
                "Abandoning {abandoned} notification worker(s) after {:.1}s grace period",
                grace.as_secs_f64()
            );
        }

        DispatchStats {
            abandoned_workers: abandoned,
            ..self.stats()
        }
    }
}

impl IntentSink for NotificationDispatcher {
    fn dispatch(&self, intent: Intent) -> bool {
        NotificationDispatcher::dispatch(self, intent)
    }

    fn queue_depth(&self) -> usize {
        NotificationDispatcher::queue_depth(self)
    }
}

fn spawn_worker(
    id: usize,
    sinks: Arc<Sinks>,
    queue: Receiver<Intent>,
    counters: Arc<Counters>,
    done_tx: Sender<usize>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for intent in queue {
            let kind = intent.kind();
            match deliver(&sinks, &intent, &counters) {
                Ok(()) => {
                    counters.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    log::warn!("Dropping {kind} intent after retry: {e}");
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        let _ = done_tx.send(id);
    })
}

fn deliver(sinks: &Sinks, intent: &Intent, counters: &Counters) -> Result<(), SinkError> {
    match intent {
        Intent::Speak(text) => with_retry(|| sinks.speaker.speak(text)),
        Intent::LogEvent(event) => with_retry(|| sinks.recorder.record(event)),
        Intent::RaiseAlert(alert) => raise_alert(sinks, alert, counters),
    }
}

/// Saves the snapshot once, then notifies. A retried notification reuses
/// the saved path so no duplicate file is written.
fn raise_alert(sinks: &Sinks, alert: &Alert, counters: &Counters) -> Result<(), SinkError> {
    let snapshot = alert.snapshot.as_ref().and_then(|frame| {
        match with_retry(|| sinks.snapshots.save(frame, alert.at)) {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("Sending alert without snapshot: {e}");
                counters.failed.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    });

    with_retry(|| sinks.notifier.notify(&alert.message, snapshot.as_deref()))
}

fn with_retry<T>(mut attempt: impl FnMut() -> Result<T, SinkError>) -> Result<T, SinkError> {
    attempt().or_else(|e| {
        log::debug!("Delivery failed, retrying once: {e}");
        attempt()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::domain::intent::{AccessEvent, AccessOutcome};
    use crate::shared::frame::Frame;
    use crate::shared::timestamp::Timestamp;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    const GRACE: Duration = Duration::from_secs(5);

    #[derive(Default)]
    struct Journal {
        spoken: Mutex<Vec<String>>,
        events: Mutex<Vec<AccessOutcome>>,
        alerts: Mutex<Vec<(String, Option<PathBuf>)>>,
        saves: AtomicUsize,
        speak_attempts: AtomicUsize,
    }

    /// Fails the first `failures` calls of each kind.
    struct FakeSink {
        journal: Arc<Journal>,
        failures: usize,
        gate: Option<(Sender<()>, Receiver<()>)>,
    }

    impl FakeSink {
        fn fail(&self, attempts: usize) -> Result<(), SinkError> {
            if attempts < self.failures {
                Err(SinkError::Unavailable("offline".into()))
            } else {
                Ok(())
            }
        }
    }

    impl Speaker for FakeSink {
        fn speak(&self, text: &str) -> Result<(), SinkError> {
            let attempts = self.journal.speak_attempts.fetch_add(1, Ordering::SeqCst);
            if let Some((started, release)) = &self.gate {
                let _ = started.send(());
                let _ = release.recv();
            }
            self.fail(attempts)?;
            self.journal.spoken.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    impl EventRecorder for FakeSink {
        fn record(&self, event: &AccessEvent) -> Result<(), SinkError> {
            self.journal.events.lock().unwrap().push(event.outcome);
            Ok(())
        }
    }

    impl AlertNotifier for FakeSink {
        fn notify(&self, message: &str, snapshot: Option<&Path>) -> Result<(), SinkError> {
            self.journal
                .alerts
                .lock()
                .unwrap()
                .push((message.to_string(), snapshot.map(Path::to_path_buf)));
            Ok(())
        }
    }

    impl SnapshotStore for FakeSink {
        fn save(&self, _frame: &Frame, _at: Timestamp) -> Result<PathBuf, SinkError> {
            let n = self.journal.saves.fetch_add(1, Ordering::SeqCst);
            self.fail(n)?;
            Ok(PathBuf::from(format!("intruder_{n}.jpg")))
        }
    }

    fn sinks(journal: &Arc<Journal>, failures: usize) -> Sinks {
        let fake = || FakeSink {
            journal: Arc::clone(journal),
            failures,
            gate: None,
        };
        Sinks {
            speaker: Box::new(fake()),
            recorder: Box::new(fake()),
            notifier: Box::new(fake()),
            snapshots: Box::new(fake()),
        }
    }

    fn gated_sinks(journal: &Arc<Journal>) -> (Sinks, Receiver<()>, Sender<()>) {
        let (started_tx, started_rx) = crossbeam_channel::unbounded();
        let (release_tx, release_rx) = crossbeam_channel::unbounded();
        let mut sinks = sinks(journal, 0);
        sinks.speaker = Box::new(FakeSink {
            journal: Arc::clone(journal),
            failures: 0,
            gate: Some((started_tx, release_rx)),
        });
        (sinks, started_rx, release_tx)
    }

    fn denied() -> Intent {
        Intent::LogEvent(AccessEvent {
            subject: None,
            name: "Unknown".into(),
            outcome: AccessOutcome::Denied,
            score: None,
            at: Duration::ZERO,
        })
    }

    fn alert(with_frame: bool) -> Intent {
        Intent::RaiseAlert(Alert {
            message: "Alert!".into(),
            snapshot: with_frame.then(|| Arc::new(Frame::new(vec![0; 12], 2, 2, 0))),
            at: Duration::ZERO,
        })
    }

    #[test]
    fn test_delivers_every_intent_kind() {
        let journal = Arc::new(Journal::default());
        let dispatcher = NotificationDispatcher::spawn(sinks(&journal, 0), 2, 8);

        assert!(dispatcher.dispatch(Intent::Speak("hello".into())));
        assert!(dispatcher.dispatch(denied()));
        assert!(dispatcher.dispatch(alert(true)));

        let stats = dispatcher.shutdown(GRACE);
        assert_eq!(stats.delivered, 3);
        assert_eq!(stats.dropped, 0);
        assert_eq!(*journal.spoken.lock().unwrap(), vec!["hello"]);
        assert_eq!(*journal.events.lock().unwrap(), vec![AccessOutcome::Denied]);
        let alerts = journal.alerts.lock().unwrap();
        assert_eq!(alerts[0].1.as_deref(), Some(Path::new("intruder_0.jpg")));
    }

    #[test]
    fn test_alert_without_frame_has_no_snapshot() {
        let journal = Arc::new(Journal::default());
        let dispatcher = NotificationDispatcher::spawn(sinks(&journal, 0), 1, 8);
        dispatcher.dispatch(alert(false));
        dispatcher.shutdown(GRACE);

        assert_eq!(journal.saves.load(Ordering::SeqCst), 0);
        assert!(journal.alerts.lock().unwrap()[0].1.is_none());
    }

    #[test]
    fn test_single_failure_is_retried() {
        let journal = Arc::new(Journal::default());
        let dispatcher = NotificationDispatcher::spawn(sinks(&journal, 1), 1, 8);
        dispatcher.dispatch(Intent::Speak("hello".into()));

        let stats = dispatcher.shutdown(GRACE);
        assert_eq!(stats.delivered, 1);
        assert_eq!(journal.speak_attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_second_failure_drops_intent() {
        let journal = Arc::new(Journal::default());
        let dispatcher = NotificationDispatcher::spawn(sinks(&journal, 2), 1, 8);
        dispatcher.dispatch(Intent::Speak("hello".into()));

        let stats = dispatcher.shutdown(GRACE);
        assert_eq!(stats.delivered, 0);
        assert_eq!(stats.failed, 1);
        assert_eq!(journal.speak_attempts.load(Ordering::SeqCst), 2);
        assert!(journal.spoken.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failed_snapshot_still_alerts() {
        let journal = Arc::new(Journal::default());
        let dispatcher = NotificationDispatcher::spawn(sinks(&journal, 2), 1, 8);
        dispatcher.dispatch(alert(true));
        dispatcher.shutdown(GRACE);

        let alerts = journal.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].1.is_none());
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let journal = Arc::new(Journal::default());
        let (sinks, started, release) = gated_sinks(&journal);
        let dispatcher = NotificationDispatcher::spawn(sinks, 1, 1);

        assert!(dispatcher.dispatch(Intent::Speak("first".into())));
        started.recv().unwrap();
        assert!(dispatcher.dispatch(Intent::Speak("queued".into())));
        assert!(!dispatcher.dispatch(Intent::Speak("overflow".into())));
        assert_eq!(dispatcher.queue_depth(), 1);

        release.send(()).unwrap();
        release.send(()).unwrap();
        let stats = dispatcher.shutdown(GRACE);
        assert_eq!(stats.dropped, 1);
        assert_eq!(*journal.spoken.lock().unwrap(), vec!["first", "queued"]);
    }

    #[test]
    fn test_shutdown_abandons_stuck_worker() {
        let journal = Arc::new(Journal::default());
        let (sinks, started, release) = gated_sinks(&journal);
        let dispatcher = NotificationDispatcher::spawn(sinks, 1, 4);

        dispatcher.dispatch(Intent::Speak("slow".into()));
        started.recv().unwrap();

        let begin = Instant::now();
        let stats = dispatcher.shutdown(Duration::from_millis(50));
        assert!(begin.elapsed() < GRACE);
        assert_eq!(stats.abandoned_workers, 1);

        release.send(()).unwrap();
    }
}
