use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a player within a match.
///
/// Scorecard aggregation, bowler figures and eligibility checks all key off
/// this id, never off display names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new() -> Self {
        PlayerId(Uuid::new_v4())
    }

    /// Deterministic id derived from a team side (0 or 1) and roster slot.
    ///
    /// Used by the JSON facade when a request carries bare names, so that the
    /// same request always produces the same ids. The high bits carry an
    /// `OC` tag to keep these visually distinct from random v4 ids.
    pub fn from_roster_slot(side: u8, slot: u8) -> Self {
        let tag: u128 = 0x4F43 << 112;
        PlayerId(Uuid::from_u128(tag | ((side as u128) << 8) | slot as u128))
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Exactly one per side; controls the dagger prefix in "c †{name}"
    /// dismissal lines and stumping credit.
    #[serde(default)]
    pub is_wicketkeeper: bool,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Player {
            id: PlayerId::new(),
            name: name.into(),
            is_wicketkeeper: false,
        }
    }

    pub fn keeper(name: impl Into<String>) -> Self {
        Player {
            id: PlayerId::new(),
            name: name.into(),
            is_wicketkeeper: true,
        }
    }

    pub fn with_id(mut self, id: PlayerId) -> Self {
        self.id = id;
        self
    }
}
