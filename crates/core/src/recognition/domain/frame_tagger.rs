use serde::{Deserialize, Serialize};

use crate::recognition::domain::detection::Detection;
use crate::recognition::domain::frame_tag::FrameTag;

/// How a detection score is compared against the acceptance threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreComparison {
    /// `score < threshold`
    #[default]
    Strict,
    /// `score <= threshold`
    Inclusive,
}

impl ScoreComparison {
    pub fn accepts(self, score: f64, threshold: f64) -> bool {
        match self {
            ScoreComparison::Strict => score < threshold,
            ScoreComparison::Inclusive => score <= threshold,
        }
    }
}

/// A frame tag together with the score that produced it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TaggedFrame {
    pub tag: FrameTag,
    /// Score of the winning known detection, or the best (lowest) distance
    /// among unrecognized detections. `None` for `NoFace`.
    pub score: Option<f64>,
}

/// Reduces the detections of one frame to a single [`FrameTag`].
///
/// Multiple simultaneous known faces collapse to the first one in detection
/// order. Malformed detections are treated as absent.
#[derive(Clone, Copy, Debug)]
pub struct FrameTagger {
    threshold: f64,
    comparison: ScoreComparison,
}

impl FrameTagger {
    pub fn new(threshold: f64, comparison: ScoreComparison) -> Self {
        Self {
            threshold,
            comparison,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn tag(&self, detections: &[Detection]) -> FrameTag {
        self.tag_with_score(detections).tag
    }

    pub fn tag_with_score(&self, detections: &[Detection]) -> TaggedFrame {
        let mut best_unknown: Option<f64> = None;
        let mut seen_any = false;

        for d in detections {
            if !d.is_well_formed() {
                log::debug!("Ignoring malformed detection at {}", d.region);
                continue;
            }
            seen_any = true;
            if let Some(id) = d.identity {
                if self.comparison.accepts(d.score, self.threshold) {
                    return TaggedFrame {
                        tag: FrameTag::Known(id),
                        score: Some(d.score),
                    };
                }
            }
            best_unknown = Some(best_unknown.map_or(d.score, |s| s.min(d.score)));
        }

        if seen_any {
            TaggedFrame {
                tag: FrameTag::Unknown,
                score: best_unknown,
            }
        } else {
            TaggedFrame {
                tag: FrameTag::NoFace,
                score: None,
            }
        }
    }
}
