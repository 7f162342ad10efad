use std::collections::HashMap;

use crate::recognition::domain::detection::IdentityId;
use crate::shared::constants::UNKNOWN_DISPLAY_NAME;

/// Maps identity ids to display names, loaded once at startup.
///
/// Lookups never fail: an id without an entry displays as "Unknown".
#[derive(Clone, Debug, Default)]
pub struct IdentityDirectory {
    names: HashMap<IdentityId, String>,
}

impl IdentityDirectory {
    pub fn new(names: HashMap<IdentityId, String>) -> Self {
        Self { names }
    }

    pub fn display_name(&self, id: IdentityId) -> &str {
        self.names
            .get(&id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_DISPLAY_NAME)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(IdentityId, String)> for IdentityDirectory {
    fn from_iter<T: IntoIterator<Item = (IdentityId, String)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
