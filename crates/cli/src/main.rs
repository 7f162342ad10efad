mod settings;

use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use door_access_core::access::domain::access_config::AccessConfig;
use door_access_core::access::domain::voting_window::TieBreak;
use door_access_core::notification::infrastructure::image_snapshot_store::ImageSnapshotStore;
use door_access_core::notification::infrastructure::jsonl_event_log::JsonlEventLog;
use door_access_core::notification::infrastructure::log_alert_notifier::LogAlertNotifier;
use door_access_core::notification::infrastructure::log_speaker::LogSpeaker;
use door_access_core::notification::infrastructure::notification_dispatcher::{
    NotificationDispatcher, Sinks,
};
use door_access_core::pipeline::access_loop::{AccessLoop, LoopSummary};
use door_access_core::pipeline::loop_logger::StdoutLoopLogger;
use door_access_core::recognition::domain::frame_tagger::ScoreComparison;
use door_access_core::recognition::infrastructure::jsonl_classification_source::JsonlClassificationSource;
use door_access_core::recognition::infrastructure::label_map_file;
use door_access_core::shared::constants::{
    DEFAULT_ALERT_COOLDOWN_SECS, DEFAULT_ANIMATION_STEPS, DEFAULT_DISPATCH_WORKERS,
    DEFAULT_HOLD_SECS, DEFAULT_QUEUE_CAPACITY, DEFAULT_REPLAY_FPS, DEFAULT_SHUTDOWN_GRACE_SECS,
    DEFAULT_THRESHOLD, DEFAULT_WINDOW,
};
use door_access_core::shared::timestamp::ClockAnchor;

use settings::Settings;

const DEFAULT_LABEL_MAP: &str = "label_map.json";
const DEFAULT_EVENT_LOG: &str = "access_log.jsonl";
const DEFAULT_INTRUDERS_DIR: &str = "intruders";
const STDIN_MARKER: &str = "-";

/// Face-recognition door access controller.
///
/// Replays per-frame classifier output and decides when to unlock the door,
/// logging every decision and alerting on unknown visitors.
#[derive(Parser)]
#[command(name = "door-access", version)]
struct Cli {
    /// JSON Lines file of classifier output, one frame per line ("-" for stdin).
    #[arg(long)]
    detections: PathBuf,

    /// Label map JSON file mapping identity ids to names.
    #[arg(long)]
    label_map: Option<PathBuf>,

    /// Trained recognizer model; only checked for existence.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Append-only access event log (JSON Lines).
    #[arg(long)]
    event_log: Option<PathBuf>,

    /// Directory for intruder snapshots (created if missing).
    #[arg(long)]
    intruders_dir: Option<PathBuf>,

    /// Acceptance threshold on the classifier distance (lower is better).
    #[arg(long)]
    threshold: Option<f64>,

    /// Threshold comparison: strict (<) or inclusive (<=).
    #[arg(long)]
    comparison: Option<String>,

    /// Voting window size (odd, at least 3).
    #[arg(long)]
    window: Option<usize>,

    /// Majority tie-break: most_recent or oldest.
    #[arg(long)]
    tie_break: Option<String>,

    /// Seconds the door stays open after the last confirmed sighting.
    #[arg(long)]
    hold: Option<f64>,

    /// Minimum seconds between intruder alerts.
    #[arg(long)]
    alert_cooldown: Option<f64>,

    /// Door animation steps from closed to fully open.
    #[arg(long)]
    animation_steps: Option<u32>,

    /// Frame rate used for lines without a timestamp.
    #[arg(long)]
    fps: Option<f64>,

    /// Release frames no faster than their timestamps.
    #[arg(long)]
    realtime: bool,

    /// Notification worker threads.
    #[arg(long)]
    workers: Option<usize>,

    /// Pending notifications before new ones are dropped.
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Settings JSON file (default: per-user config directory).
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Startup configuration after merging flags, settings file and defaults.
#[derive(Debug)]
struct RunOptions {
    access: AccessConfig,
    detections: PathBuf,
    label_map: PathBuf,
    model: Option<PathBuf>,
    event_log: PathBuf,
    intruders_dir: PathBuf,
    fps: f64,
    realtime: bool,
    workers: usize,
    queue_capacity: usize,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let options = resolve(cli, settings)?;
    validate(&options)?;

    let directory = Arc::new(label_map_file::load(&options.label_map)?);
    let clock = ClockAnchor::now();
    let sinks = Sinks {
        speaker: Box::new(LogSpeaker),
        recorder: Box::new(JsonlEventLog::open(&options.event_log, clock)?),
        notifier: Box::new(LogAlertNotifier),
        snapshots: Box::new(ImageSnapshotStore::new(&options.intruders_dir, clock)?),
    };
    let dispatcher =
        NotificationDispatcher::spawn(sinks, options.workers, options.queue_capacity);

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || handler_stop.store(true, Ordering::Relaxed))?;

    let caption_directory = Arc::clone(&directory);
    let mut last_caption = String::new();
    let mut access_loop = AccessLoop::new(&options.access, directory)?
        .with_stop_signal(stop)
        .with_pacing(options.realtime)
        .on_tick(move |report| {
            let caption = report.view.caption(&caption_directory);
            if caption != last_caption {
                log::info!("Frame {}: {caption}", report.index);
                last_caption = caption;
            }
        });
    let mut logger = StdoutLoopLogger::default();

    let summary: LoopSummary = if options.detections == Path::new(STDIN_MARKER) {
        let mut source =
            JsonlClassificationSource::from_reader(BufReader::new(io::stdin()), options.fps);
        access_loop.run(&mut source, &dispatcher, &mut logger)
    } else {
        let mut source = JsonlClassificationSource::open(&options.detections, options.fps)?;
        access_loop.run(&mut source, &dispatcher, &mut logger)
    };

    let stats = dispatcher.shutdown(Duration::from_secs_f64(DEFAULT_SHUTDOWN_GRACE_SECS));
    log::info!(
        "Notifications: {} delivered, {} failed, {} dropped",
        stats.delivered,
        stats.failed,
        stats.dropped + summary.dropped
    );
    log::info!("Event log written to {}", options.event_log.display());
    Ok(())
}

fn resolve(cli: Cli, settings: Settings) -> Result<RunOptions, Box<dyn std::error::Error>> {
    let comparison = parse_comparison(
        cli.comparison
            .as_deref()
            .or(settings.comparison.as_deref())
            .unwrap_or("strict"),
    )?;
    let tie_break = parse_tie_break(
        cli.tie_break
            .as_deref()
            .or(settings.tie_break.as_deref())
            .unwrap_or("most_recent"),
    )?;
    let hold = cli.hold.or(settings.hold_secs).unwrap_or(DEFAULT_HOLD_SECS);
    let cooldown = cli
        .alert_cooldown
        .or(settings.alert_cooldown_secs)
        .unwrap_or(DEFAULT_ALERT_COOLDOWN_SECS);

    let access = AccessConfig {
        threshold: cli
            .threshold
            .or(settings.threshold)
            .unwrap_or(DEFAULT_THRESHOLD),
        comparison,
        window: cli.window.or(settings.window).unwrap_or(DEFAULT_WINDOW),
        tie_break,
        hold: seconds("Hold", hold)?,
        alert_cooldown: seconds("Alert cooldown", cooldown)?,
        animation_steps: cli
            .animation_steps
            .or(settings.animation_steps)
            .unwrap_or(DEFAULT_ANIMATION_STEPS),
    };

    Ok(RunOptions {
        access,
        detections: cli.detections,
        label_map: cli
            .label_map
            .or(settings.label_map)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LABEL_MAP)),
        model: cli.model.or(settings.model),
        event_log: cli
            .event_log
            .or(settings.event_log)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EVENT_LOG)),
        intruders_dir: cli
            .intruders_dir
            .or(settings.intruders_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INTRUDERS_DIR)),
        fps: cli.fps.or(settings.fps).unwrap_or(DEFAULT_REPLAY_FPS),
        realtime: cli.realtime,
        workers: cli
            .workers
            .or(settings.workers)
            .unwrap_or(DEFAULT_DISPATCH_WORKERS),
        queue_capacity: cli
            .queue_capacity
            .or(settings.queue_capacity)
            .unwrap_or(DEFAULT_QUEUE_CAPACITY),
    })
}

fn validate(options: &RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    options.access.validate()?;
    if !options.fps.is_finite() || options.fps <= 0.0 {
        return Err(format!("Frame rate must be positive, got {}", options.fps).into());
    }
    if options.workers == 0 {
        return Err("At least one notification worker is required".into());
    }
    if options.queue_capacity == 0 {
        return Err("Queue capacity must be at least 1".into());
    }

    let missing = missing_artifacts(options);
    if !missing.is_empty() {
        for path in &missing {
            log::error!("Required file not found: {}", path.display());
        }
        let list: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
        return Err(format!("Missing required files: {}", list.join(", ")).into());
    }
    Ok(())
}

/// Every required startup file that does not exist, in a stable order.
fn missing_artifacts(options: &RunOptions) -> Vec<PathBuf> {
    let mut required = vec![options.label_map.as_path()];
    if let Some(model) = &options.model {
        required.push(model.as_path());
    }
    if options.detections != Path::new(STDIN_MARKER) {
        required.push(options.detections.as_path());
    }
    required
        .into_iter()
        .filter(|path| !path.exists())
        .map(Path::to_path_buf)
        .collect()
}

fn parse_comparison(value: &str) -> Result<ScoreComparison, String> {
    match value {
        "strict" => Ok(ScoreComparison::Strict),
        "inclusive" => Ok(ScoreComparison::Inclusive),
        other => Err(format!(
            "Comparison must be 'strict' or 'inclusive', got '{other}'"
        )),
    }
}

fn parse_tie_break(value: &str) -> Result<TieBreak, String> {
    match value {
        "most_recent" => Ok(TieBreak::MostRecent),
        "oldest" => Ok(TieBreak::Oldest),
        other => Err(format!(
            "Tie break must be 'most_recent' or 'oldest', got '{other}'"
        )),
    }
}

fn seconds(name: &str, secs: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| format!("{name} must be a non-negative number of seconds, got {secs}"))
}
