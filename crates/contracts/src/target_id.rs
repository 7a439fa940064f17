//! TargetId - shared catalog key
//!
//! Targets are defined once at load time and their ids are attached to every
//! result, log line and metric label afterwards, so the id is an `Arc<str>`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Identifier of one catalog target.
///
/// # Examples
/// ```
/// use contracts::TargetId;
///
/// let id = TargetId::new("status_page");
/// assert_eq!(id, "status_page");
/// assert_eq!(id.len(), 11);
/// ```
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId(Arc<str>);

impl TargetId {
    /// Create a new id.
    pub fn new(id: &str) -> Self {
        Self(Arc::from(id))
    }

    /// Underlying string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for TargetId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

// `Hash`/`Eq` are derived from `Arc<str>`, which delegate to `str`, so
// `HashMap<TargetId, _>::get("id")` works through this impl.
impl Borrow<str> for TargetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TargetId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl PartialEq<str> for TargetId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for TargetId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TargetId({:?})", &*self.0)
    }
}

impl Serialize for TargetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TargetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}
