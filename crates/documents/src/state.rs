use serde::{Deserialize, Serialize};

/// Document lifecycle state.
///
/// Stored as a small integer. Only `DRAFT` (0) carries behaviour: it is the
/// single state in which header and lines may be edited. Other values are
/// opaque; the named ones exist for readability and unknown codes round-trip
/// unchanged.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentState(i16);

impl DocumentState {
    pub const DRAFT: Self = Self(0);
    pub const POSTED: Self = Self(1);
    pub const CANCELLED: Self = Self(2);

    pub const fn from_code(code: i16) -> Self {
        Self(code)
    }

    pub const fn code(self) -> i16 {
        self.0
    }

    pub fn is_draft(self) -> bool {
        self == Self::DRAFT
    }

    /// Human name for the well-known codes.
    pub fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("draft"),
            1 => Some("posted"),
            2 => Some("cancelled"),
            _ => None,
        }
    }
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::DRAFT
    }
}

impl core::fmt::Display for DocumentState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "state {}", self.0),
        }
    }
}

impl From<i16> for DocumentState {
    fn from(value: i16) -> Self {
        Self(value)
    }
}
