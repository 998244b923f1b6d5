use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque per-model instance identifier.
///
/// Intended to hold a UUID, but kept as a plain string so the empty string
/// can serve as the "unassigned" sentinel (a `Uuid` has no such value).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// The sentinel value used for records that haven't been assigned an id yet.
    pub const UNASSIGNED: &'static str = "";

    /// Generate a fresh, randomly assigned id (UUID v4).
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The unassigned sentinel (empty string).
    pub fn unassigned() -> Self {
        Self(String::new())
    }

    pub fn is_unassigned(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
