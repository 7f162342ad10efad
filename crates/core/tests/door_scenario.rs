use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use door_access_core::access::domain::access_config::AccessConfig;
use door_access_core::access::domain::access_state_machine::AccessState;
use door_access_core::notification::infrastructure::image_snapshot_store::ImageSnapshotStore;
use door_access_core::notification::infrastructure::jsonl_event_log::JsonlEventLog;
use door_access_core::notification::infrastructure::log_alert_notifier::LogAlertNotifier;
use door_access_core::notification::infrastructure::log_speaker::LogSpeaker;
use door_access_core::notification::infrastructure::notification_dispatcher::{
    NotificationDispatcher, Sinks,
};
use door_access_core::pipeline::access_loop::AccessLoop;
use door_access_core::pipeline::loop_logger::NullLoopLogger;
use door_access_core::recognition::domain::detection::IdentityId;
use door_access_core::recognition::infrastructure::jsonl_classification_source::JsonlClassificationSource;
use door_access_core::recognition::infrastructure::label_map_file;
use door_access_core::shared::timestamp::ClockAnchor;

const GRACE: Duration = Duration::from_secs(5);

const NO_FACE: &str = r#"{"detections": []}"#;
const UNKNOWN: &str =
    r#"{"detections": [{"region": {"x": 0, "y": 0, "width": 90, "height": 90}, "identity": 1, "score": 110.0}]}"#;
const KNOWN: &str =
    r#"{"detections": [{"region": {"x": 0, "y": 0, "width": 90, "height": 90}, "identity": 1, "score": 40.0}]}"#;
const UNKNOWN_WITH_IMAGE: &str =
    r#"{"detections": [{"region": {"x": 0, "y": 0, "width": 90, "height": 90}, "score": 130.0}], "image": "door.png"}"#;

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new(lines: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("label_map.json"), r#"{"1": "Pavan"}"#).unwrap();
        fs::write(dir.path().join("frames.jsonl"), lines.join("\n")).unwrap();
        image::RgbImage::from_pixel(32, 24, image::Rgb([90, 60, 30]))
            .save(dir.path().join("door.png"))
            .unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }

    fn dispatcher(&self) -> NotificationDispatcher {
        let clock = ClockAnchor::now();
        let sinks = Sinks {
            speaker: Box::new(LogSpeaker),
            recorder: Box::new(JsonlEventLog::open(&self.path("access_log.jsonl"), clock).unwrap()),
            notifier: Box::new(LogAlertNotifier),
            snapshots: Box::new(ImageSnapshotStore::new(&self.path("intruders"), clock).unwrap()),
        };
        // A single worker keeps the event log in tick order.
        NotificationDispatcher::spawn(sinks, 1, 64)
    }

    fn events(&self) -> Vec<Value> {
        read_jsonl(&self.path("access_log.jsonl"))
    }

    fn snapshots(&self) -> usize {
        fs::read_dir(self.path("intruders")).unwrap().count()
    }
}

fn read_jsonl(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[test]
fn unknown_visitor_then_resident_opens_on_seventh_frame() {
    let fixture = Fixture::new(&[
        NO_FACE,
        UNKNOWN,
        UNKNOWN,
        UNKNOWN_WITH_IMAGE,
        KNOWN,
        KNOWN,
        KNOWN,
    ]);
    let directory = Arc::new(label_map_file::load(&fixture.path("label_map.json")).unwrap());
    let states = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&states);

    let mut access_loop = AccessLoop::new(&AccessConfig::default(), directory)
        .unwrap()
        .on_tick(move |report| seen.lock().unwrap().push(report.outcome.state));
    let mut source = JsonlClassificationSource::open(&fixture.path("frames.jsonl"), 10.0).unwrap();
    let dispatcher = fixture.dispatcher();

    let summary = access_loop.run(&mut source, &dispatcher, &mut NullLoopLogger);
    let stats = dispatcher.shutdown(GRACE);

    let states = states.lock().unwrap();
    assert_eq!(states.len(), 7);
    assert!(states[..6].iter().all(|s| *s == AccessState::Locked));
    match states[6] {
        AccessState::Open { identity, expiry } => {
            assert_eq!(identity, IdentityId(1));
            let expected = Duration::from_millis(4600);
            let drift = expiry.max(expected) - expiry.min(expected);
            assert!(drift < Duration::from_millis(1));
        }
        other => panic!("expected the door open on the seventh frame, got {other:?}"),
    }

    assert_eq!(summary.grants, 1);
    assert_eq!(summary.denials, 1);
    assert_eq!(stats.dropped, 0);
    assert_eq!(stats.failed, 0);

    let events = fixture.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["status"], "access_denied");
    assert_eq!(events[0]["name"], "Unknown");
    assert_eq!(events[0]["confidence"], 130.0);
    assert_eq!(events[1]["status"], "access_granted");
    assert_eq!(events[1]["name"], "Pavan");
    assert_eq!(events[1]["identity"], 1);
    assert_eq!(fixture.snapshots(), 1);
}

#[test]
fn lingering_stranger_is_alerted_once_per_cooldown() {
    let lines = vec![UNKNOWN; 30];
    let fixture = Fixture::new(&lines);
    let directory = Arc::new(label_map_file::load(&fixture.path("label_map.json")).unwrap());

    let mut access_loop = AccessLoop::new(&AccessConfig::default(), directory).unwrap();
    let mut source = JsonlClassificationSource::open(&fixture.path("frames.jsonl"), 10.0).unwrap();
    let dispatcher = fixture.dispatcher();

    let summary = access_loop.run(&mut source, &dispatcher, &mut NullLoopLogger);
    dispatcher.shutdown(GRACE);

    // Confirmed at 0.2s, then once more after the 2s cooldown.
    assert_eq!(summary.denials, 2);
    assert_eq!(fixture.events().len(), 2);
    // No image on these frames, so alerts carry no snapshot.
    assert_eq!(fixture.snapshots(), 0);
    assert_eq!(summary.final_state, AccessState::Locked);
}

#[test]
fn resident_door_auto_locks_after_leaving() {
    let mut lines = vec![KNOWN; 5];
    lines.extend(vec![NO_FACE; 5]);
    lines.push(r#"{"t": 10.0, "detections": []}"#);
    let fixture = Fixture::new(&lines);
    let directory = Arc::new(label_map_file::load(&fixture.path("label_map.json")).unwrap());

    let mut access_loop = AccessLoop::new(&AccessConfig::default(), directory).unwrap();
    let mut source = JsonlClassificationSource::open(&fixture.path("frames.jsonl"), 10.0).unwrap();
    let dispatcher = fixture.dispatcher();

    let summary = access_loop.run(&mut source, &dispatcher, &mut NullLoopLogger);
    dispatcher.shutdown(GRACE);

    assert_eq!(summary.grants, 1);
    assert_eq!(summary.final_state, AccessState::Locked);
}
