use std::fmt;

use crate::recognition::domain::detection::IdentityId;

/// Frame-level verdict: exactly one per processed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameTag {
    NoFace,
    Unknown,
    Known(IdentityId),
}

impl fmt::Display for FrameTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameTag::NoFace => write!(f, "NO_FACE"),
            FrameTag::Unknown => write!(f, "UNKNOWN"),
            FrameTag::Known(id) => write!(f, "KNOWN({id})"),
        }
    }
}
