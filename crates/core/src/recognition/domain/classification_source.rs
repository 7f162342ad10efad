use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::recognition::domain::detection::Detection;
use crate::shared::frame::Frame;
use crate::shared::timestamp::Timestamp;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to open classification source {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Degrades one frame; the source keeps producing.
    #[error("frame {index}: unreadable classifier output: {reason}")]
    Record {
        index: usize,
        at: Timestamp,
        reason: String,
    },
    /// Ends the capture, like the camera going away.
    #[error("classification source read failed: {0}")]
    Io(#[source] std::io::Error),
}

/// Classifier output for one processed frame.
#[derive(Clone, Debug)]
pub struct ClassifiedFrame {
    pub index: usize,
    pub at: Timestamp,
    pub detections: Vec<Detection>,
    /// Pixels of the frame, when the source can provide them. Only needed
    /// for intruder snapshots.
    pub image: Option<Arc<Frame>>,
}

impl ClassifiedFrame {
    pub fn new(index: usize, at: Timestamp, detections: Vec<Detection>) -> Self {
        Self {
            index,
            at,
            detections,
            image: None,
        }
    }

    pub fn with_image(mut self, image: Arc<Frame>) -> Self {
        self.image = Some(image);
        self
    }
}

/// Upstream port: the external detector + recognizer.
///
/// Implementations own the capture device and classifier handle; the access
/// loop only pulls results, one per frame, in capture order.
pub trait ClassificationSource: Send {
    /// Returns the next classified frame, or `None` once capture has ended.
    fn next_frame(&mut self) -> Option<Result<ClassifiedFrame, SourceError>>;

    /// Releases any resources held by the source.
    fn close(&mut self) {}
}
