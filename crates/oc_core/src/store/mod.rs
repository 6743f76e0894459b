//! Persistence behind the scoring session: an append/read interface plus an
//! in-memory reference implementation.
//!
//! The state document is self-contained, so the event log kept by a store is
//! an audit trail, not something the engine reads back during normal play.

mod file;

pub use file::FileStore;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use crate::error::{Result, ScoreError};
use crate::models::{BallEvent, MatchState};

/// Storage for match documents and their ball-by-ball audit logs.
///
/// Implementations take `&self`; interior locking is the implementation's
/// business so a session can hold a shared store.
pub trait MatchStore: Send + Sync {
    /// Append one event to the match's audit log.
    fn append_event(&self, match_id: Uuid, event: &BallEvent) -> Result<()>;

    /// Drop the newest event from the audit log, mirroring an undo.
    fn remove_last_event(&self, match_id: Uuid) -> Result<BallEvent>;

    fn load_events(&self, match_id: Uuid) -> Result<Vec<BallEvent>>;

    /// Replace the stored state document for this match.
    fn save_state(&self, state: &MatchState) -> Result<()>;

    fn load_state(&self, match_id: Uuid) -> Result<MatchState>;
}

/// Reference store keeping serialized documents in process memory. The
/// serialize/deserialize round trip is deliberate: it keeps the in-memory
/// store honest about what a durable one would persist.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    states: HashMap<Uuid, String>,
    events: HashMap<Uuid, Vec<BallEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| ScoreError::Store("store mutex poisoned".to_string()))
    }
}

impl MatchStore for MemoryStore {
    fn append_event(&self, match_id: Uuid, event: &BallEvent) -> Result<()> {
        let mut inner = self.lock()?;
        inner.events.entry(match_id).or_default().push(event.clone());
        Ok(())
    }

    fn remove_last_event(&self, match_id: Uuid) -> Result<BallEvent> {
        let mut inner = self.lock()?;
        inner
            .events
            .get_mut(&match_id)
            .and_then(|log| log.pop())
            .ok_or_else(|| {
                ScoreError::Store(format!("no events recorded for match {match_id}"))
            })
    }

    fn load_events(&self, match_id: Uuid) -> Result<Vec<BallEvent>> {
        let inner = self.lock()?;
        Ok(inner.events.get(&match_id).cloned().unwrap_or_default())
    }

    fn save_state(&self, state: &MatchState) -> Result<()> {
        let document = serde_json::to_string(state)?;
        let mut inner = self.lock()?;
        inner.states.insert(state.match_id, document);
        Ok(())
    }

    fn load_state(&self, match_id: Uuid) -> Result<MatchState> {
        let inner = self.lock()?;
        let document = inner.states.get(&match_id).ok_or_else(|| {
            ScoreError::Store(format!("no saved state for match {match_id}"))
        })?;
        Ok(serde_json::from_str(document)?)
    }
}
