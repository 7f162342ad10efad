use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::notification::domain::sink_error::SinkError;
use crate::notification::domain::snapshot_store::SnapshotStore;
use crate::shared::constants::{SNAPSHOT_EXTENSION, SNAPSHOT_PREFIX};
use crate::shared::frame::Frame;
use crate::shared::timestamp::{ClockAnchor, Timestamp};

const MAX_SUFFIX: u32 = 1000;

/// Writes intruder snapshots as JPEG files named after the capture time.
///
/// `intruder_20240501_120003.jpg`, then `intruder_20240501_120003_1.jpg` and
/// so on when several snapshots land in the same second.
pub struct ImageSnapshotStore {
    dir: PathBuf,
    clock: ClockAnchor,
}

impl ImageSnapshotStore {
    /// Creates `dir` if it does not exist yet.
    pub fn new(dir: &Path, clock: ClockAnchor) -> Result<Self, SinkError> {
        std::fs::create_dir_all(dir).map_err(|e| SinkError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            clock,
        })
    }

    /// Atomically claims the first free filename for `at`.
    fn reserve(&self, at: Timestamp) -> Result<(PathBuf, File), SinkError> {
        let stem = format!(
            "{SNAPSHOT_PREFIX}_{}",
            self.clock.wall_time(at).format("%Y%m%d_%H%M%S")
        );

        for suffix in 0..MAX_SUFFIX {
            let name = if suffix == 0 {
                format!("{stem}.{SNAPSHOT_EXTENSION}")
            } else {
                format!("{stem}_{suffix}.{SNAPSHOT_EXTENSION}")
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(SinkError::Io { path, source: e }),
            }
        }

        Err(SinkError::Unavailable(format!(
            "no free snapshot name for {stem} in {}",
            self.dir.display()
        )))
    }
}

impl SnapshotStore for ImageSnapshotStore {
    fn save(&self, frame: &Frame, at: Timestamp) -> Result<PathBuf, SinkError> {
        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or_else(|| {
                SinkError::Unavailable(format!(
                    "frame {} does not match its {}x{} size",
                    frame.index(),
                    frame.width(),
                    frame.height()
                ))
            })?;

        let (path, file) = self.reserve(at)?;
        let mut writer = BufWriter::new(file);
        let written = img
            .write_to(&mut writer, image::ImageFormat::Jpeg)
            .map_err(SinkError::from)
            .and_then(|_| {
                writer.flush().map_err(|e| SinkError::Io {
                    path: path.clone(),
                    source: e,
                })
            });

        if let Err(e) = written {
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }
        Ok(path)
    }
}
