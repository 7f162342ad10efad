use std::fmt;

use serde::{Deserialize, Serialize};

use crate::shared::region::Region;

/// Opaque enrolled-person identifier as produced by the recognizer.
///
/// Display names live in the [`IdentityDirectory`](super::identity_directory::IdentityDirectory).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(pub u32);

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One classified face in a frame.
///
/// `score` is a distance: lower means a more confident match.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub region: Region,
    pub identity: Option<IdentityId>,
    pub score: f64,
}

impl Detection {
    pub fn new(region: Region, identity: Option<IdentityId>, score: f64) -> Self {
        Self {
            region,
            identity,
            score,
        }
    }

    /// A detection whose score is NaN or infinite carries no usable evidence
    /// and must be ignored by the tagger.
    pub fn is_well_formed(&self) -> bool {
        self.score.is_finite()
    }
}
