use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::recognition::domain::classification_source::{
    ClassificationSource, ClassifiedFrame, SourceError,
};
use crate::recognition::domain::detection::{Detection, IdentityId};
use crate::shared::frame::Frame;
use crate::shared::region::Region;
use crate::shared::timestamp::{self, Timestamp};

#[derive(Deserialize)]
struct RawRecord {
    #[serde(default)]
    t: Option<f64>,
    #[serde(default)]
    detections: Vec<Value>,
    #[serde(default)]
    image: Option<PathBuf>,
}

#[derive(Deserialize)]
struct RawDetection {
    #[serde(default)]
    region: Region,
    #[serde(default)]
    identity: Value,
    #[serde(default)]
    score: Value,
}

/// Replays recorded classifier output, one JSON object per line.
///
/// ```text
/// {"t": 0.033, "detections": [{"region": {"x": 10, "y": 20, "width": 90, "height": 90}, "identity": 1, "score": 48.2}]}
/// ```
///
/// `t` is seconds since capture start; when absent the timestamp is derived
/// from the frame index and `fps`. A negative or unrepresentable `t` makes
/// the line unreadable. A detection with an unusable identity or
/// score is dropped; an unparsable line degrades only that frame. An
/// optional `image` path (relative to the input file) attaches pixels for
/// intruder snapshots.
pub struct JsonlClassificationSource<R: BufRead + Send> {
    reader: R,
    line: Vec<u8>,
    fps: f64,
    base_dir: Option<PathBuf>,
    index: usize,
}

impl JsonlClassificationSource<BufReader<File>> {
    pub fn open(path: &Path, fps: f64) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|e| SourceError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut source = Self::from_reader(BufReader::new(file), fps);
        source.base_dir = path.parent().map(Path::to_path_buf);
        Ok(source)
    }
}

impl<R: BufRead + Send> JsonlClassificationSource<R> {
    pub fn from_reader(reader: R, fps: f64) -> Self {
        Self {
            reader,
            line: Vec::new(),
            fps: if fps.is_finite() && fps > 0.0 { fps } else { 1.0 },
            base_dir: None,
            index: 0,
        }
    }

    fn synthetic_time(&self, index: usize) -> Timestamp {
        timestamp::from_secs(index as f64 / self.fps)
    }

    /// Invalid UTF-8 fails here like any other malformed JSON.
    fn parse_line(&self, index: usize, line: &[u8]) -> Result<ClassifiedFrame, SourceError> {
        let record: RawRecord = serde_json::from_slice(line).map_err(|e| SourceError::Record {
            index,
            at: self.synthetic_time(index),
            reason: e.to_string(),
        })?;

        let at = match record.t {
            None => self.synthetic_time(index),
            Some(t) => timestamp::try_from_secs(t).ok_or_else(|| SourceError::Record {
                index,
                at: self.synthetic_time(index),
                reason: format!("timestamp {t} is out of range"),
            })?,
        };

        let detections = record
            .detections
            .into_iter()
            .filter_map(|raw| match parse_detection(raw) {
                Ok(d) => Some(d),
                Err(reason) => {
                    log::debug!("Frame {index}: dropping malformed detection ({reason})");
                    None
                }
            })
            .collect();

        let mut frame = ClassifiedFrame::new(index, at, detections);
        if let Some(image_path) = record.image {
            match self.load_image(&image_path, index) {
                Ok(image) => frame = frame.with_image(Arc::new(image)),
                Err(e) => log::debug!(
                    "Frame {index}: could not load image {}: {e}",
                    image_path.display()
                ),
            }
        }
        Ok(frame)
    }

    fn load_image(&self, path: &Path, index: usize) -> Result<Frame, image::ImageError> {
        let resolved = match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        };
        let rgb = image::open(resolved)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        Ok(Frame::new(rgb.into_raw(), width, height, index))
    }
}

fn parse_detection(raw: Value) -> Result<Detection, String> {
    let raw: RawDetection = serde_json::from_value(raw).map_err(|e| e.to_string())?;

    // Negative labels are the recognizer's "no proposal" marker.
    let identity = match &raw.identity {
        Value::Null => None,
        Value::Number(n) if n.as_i64().is_some_and(|v| v < 0) => None,
        Value::Number(n) => {
            let id = n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| format!("identity {n} is not a label"))?;
            Some(IdentityId(id))
        }
        other => return Err(format!("identity {other} is not a label")),
    };

    let score = raw
        .score
        .as_f64()
        .filter(|s| s.is_finite())
        .ok_or_else(|| format!("score {} is not a finite number", raw.score))?;

    Ok(Detection::new(raw.region, identity, score))
}

impl<R: BufRead + Send> ClassificationSource for JsonlClassificationSource<R> {
    fn next_frame(&mut self) -> Option<Result<ClassifiedFrame, SourceError>> {
        loop {
            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(SourceError::Io(e))),
            }
            if self.line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let index = self.index;
            self.index += 1;
            return Some(self.parse_line(index, &self.line));
        }
    }
}
