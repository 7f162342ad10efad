use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::access::domain::access_config::{AccessConfig, ConfigError};
use crate::access::domain::access_state_machine::{
    AccessState, AccessStateMachine, FrameEvidence, TickOutcome,
};
use crate::access::domain::door_animator::{DoorAnimator, DoorView};
use crate::access::domain::intent::{AccessOutcome, Intent};
use crate::notification::domain::intent_sink::IntentSink;
use crate::pipeline::loop_logger::LoopLogger;
use crate::recognition::domain::classification_source::{
    ClassificationSource, ClassifiedFrame, SourceError,
};
use crate::recognition::domain::frame_tag::FrameTag;
use crate::recognition::domain::frame_tagger::FrameTagger;
use crate::recognition::domain::identity_directory::IdentityDirectory;
use crate::shared::constants::{SHUTDOWN_ANNOUNCEMENT, STARTUP_ANNOUNCEMENT};
use crate::shared::timestamp::Timestamp;

const PACING_SLICE: Duration = Duration::from_millis(50);

/// Everything the rendering collaborator needs for one tick.
#[derive(Clone, Debug)]
pub struct TickReport {
    pub index: usize,
    pub at: Timestamp,
    pub tag: FrameTag,
    pub outcome: TickOutcome,
    pub view: DoorView,
    /// Intents the sink refused this tick.
    pub dropped: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopSummary {
    pub frames: usize,
    /// Frames whose classifier output could not be read.
    pub degraded: usize,
    pub grants: usize,
    pub denials: usize,
    pub intents: usize,
    pub dropped: usize,
    pub final_state: AccessState,
}

/// The explicit context object for one run of the door system.
///
/// Built once at startup from validated configuration and the identity
/// directory. [`AccessLoop::run`] pulls frames until the source ends or the
/// stop flag is raised, and is the only writer of the voting window, door
/// state and alert throttle.
pub struct AccessLoop {
    tagger: FrameTagger,
    machine: AccessStateMachine,
    animator: DoorAnimator,
    directory: Arc<IdentityDirectory>,
    stop: Arc<AtomicBool>,
    paced: bool,
    on_tick: Option<Box<dyn FnMut(&TickReport) + Send>>,
}

impl AccessLoop {
    pub fn new(
        config: &AccessConfig,
        directory: Arc<IdentityDirectory>,
    ) -> Result<Self, ConfigError> {
        let machine = AccessStateMachine::new(config, Arc::clone(&directory))?;
        Ok(Self {
            tagger: FrameTagger::new(config.threshold, config.comparison),
            machine,
            animator: DoorAnimator::new(config.animation_steps),
            directory,
            stop: Arc::new(AtomicBool::new(false)),
            paced: false,
            on_tick: None,
        })
    }

    /// Shares an externally owned stop flag (e.g. set from a Ctrl-C handler).
    pub fn with_stop_signal(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// When enabled, frames are released no faster than their timestamps.
    pub fn with_pacing(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    pub fn on_tick(mut self, callback: impl FnMut(&TickReport) + Send + 'static) -> Self {
        self.on_tick = Some(Box::new(callback));
        self
    }

    /// Runs one frame through tagger, state machine and sink.
    pub fn tick(
        &mut self,
        frame: ClassifiedFrame,
        sink: &dyn IntentSink,
        logger: &mut dyn LoopLogger,
    ) -> TickReport {
        let started = Instant::now();
        let tagged = self.tagger.tag_with_score(&frame.detections);
        logger.timing("tag", elapsed_ms(started));

        let started = Instant::now();
        let evidence = FrameEvidence {
            score: tagged.score,
            image: frame.image,
        };
        let outcome = self.machine.tick(tagged.tag, frame.at, evidence);
        logger.timing("decide", elapsed_ms(started));
        logger.metric("support", outcome.vote.support as f64);

        let started = Instant::now();
        let mut dropped = 0;
        for intent in &outcome.intents {
            if !sink.dispatch(intent.clone()) {
                dropped += 1;
            }
        }
        logger.timing("dispatch", elapsed_ms(started));
        logger.metric("queue_depth", sink.queue_depth() as f64);

        let report = TickReport {
            index: frame.index,
            at: frame.at,
            tag: tagged.tag,
            view: self.animator.advance(&outcome.state),
            outcome,
            dropped,
        };
        if let Some(callback) = self.on_tick.as_mut() {
            callback(&report);
        }
        report
    }

    /// Pulls frames until the source is exhausted or the stop flag is set.
    ///
    /// Unreadable records degrade to an empty frame; a source that stops
    /// yielding ends the run the same way an explicit stop does.
    pub fn run(
        &mut self,
        source: &mut dyn ClassificationSource,
        sink: &dyn IntentSink,
        logger: &mut dyn LoopLogger,
    ) -> LoopSummary {
        let mut summary = LoopSummary {
            frames: 0,
            degraded: 0,
            grants: 0,
            denials: 0,
            intents: 0,
            dropped: 0,
            final_state: self.machine.state(),
        };

        logger.info(&format!(
            "Access loop started ({} identities enrolled)",
            self.directory.len()
        ));
        sink.dispatch(Intent::Speak(STARTUP_ANNOUNCEMENT.to_string()));
        let started = Instant::now();

        while !self.stop.load(Ordering::Relaxed) {
            let frame = match source.next_frame() {
                None => {
                    logger.info("Classification source ended");
                    break;
                }
                Some(Ok(frame)) => frame,
                Some(Err(SourceError::Record { index, at, reason })) => {
                    log::debug!("Frame {index}: unreadable classifier output ({reason})");
                    summary.degraded += 1;
                    ClassifiedFrame::new(index, at, Vec::new())
                }
                Some(Err(e)) => {
                    logger.info(&format!("Capture lost: {e}"));
                    break;
                }
            };

            if self.paced && !self.wait_until(started, frame.at) {
                break;
            }

            let report = self.tick(frame, sink, logger);
            summary.frames += 1;
            summary.intents += report.outcome.intents.len();
            summary.dropped += report.dropped;
            for intent in &report.outcome.intents {
                if let Intent::LogEvent(event) = intent {
                    match event.outcome {
                        AccessOutcome::Granted => summary.grants += 1,
                        AccessOutcome::Denied => summary.denials += 1,
                    }
                }
            }
            logger.progress(summary.frames);
        }

        source.close();
        sink.dispatch(Intent::Speak(SHUTDOWN_ANNOUNCEMENT.to_string()));
        summary.final_state = self.machine.state();
        logger.info(&format!(
            "Access loop stopped after {} frames: {} granted, {} denied, {} intents dropped",
            summary.frames, summary.grants, summary.denials, summary.dropped
        ));
        logger.summary();
        summary
    }

    /// Sleeps until `at` past `started`. Returns `false` if stopped meanwhile.
    /// A timestamp too far out to schedule is released immediately.
    fn wait_until(&self, started: Instant, at: Timestamp) -> bool {
        let Some(due) = started.checked_add(at) else {
            log::debug!("Not pacing frame at {at:?}: too far in the future");
            return !self.stop.load(Ordering::Relaxed);
        };
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return false;
            }
            let left = due.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return true;
            }
            std::thread::sleep(left.min(PACING_SLICE));
        }
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
