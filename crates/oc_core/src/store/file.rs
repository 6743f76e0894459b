//! Durable store writing one state document and one append-only event log
//! per match under a single directory.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{Result, ScoreError};
use crate::models::{BallEvent, MatchState};
use crate::store::MatchStore;

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn state_path(&self, match_id: Uuid) -> PathBuf {
        self.root.join(format!("{match_id}.json"))
    }

    fn events_path(&self, match_id: Uuid) -> PathBuf {
        self.root.join(format!("{match_id}.events.jsonl"))
    }

    /// Write through a temp file and rename so a crash mid-write never
    /// leaves a truncated document behind.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl MatchStore for FileStore {
    fn append_event(&self, match_id: Uuid, event: &BallEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.events_path(match_id))?;
        writeln!(file, "{line}")?;
        file.sync_all()?;
        Ok(())
    }

    fn remove_last_event(&self, match_id: Uuid) -> Result<BallEvent> {
        let mut events = self.load_events(match_id)?;
        let last = events.pop().ok_or_else(|| {
            ScoreError::Store(format!("no events recorded for match {match_id}"))
        })?;

        let mut body = String::new();
        for event in &events {
            body.push_str(&serde_json::to_string(event)?);
            body.push('\n');
        }
        self.write_atomic(&self.events_path(match_id), body.as_bytes())?;
        Ok(last)
    }

    fn load_events(&self, match_id: Uuid) -> Result<Vec<BallEvent>> {
        let raw = match fs::read_to_string(self.events_path(match_id)) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| Ok(serde_json::from_str(line)?))
            .collect()
    }

    fn save_state(&self, state: &MatchState) -> Result<()> {
        let document = serde_json::to_vec_pretty(state)?;
        self.write_atomic(&self.state_path(state.match_id), &document)
    }

    fn load_state(&self, match_id: Uuid) -> Result<MatchState> {
        let raw = match fs::read_to_string(self.state_path(match_id)) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ScoreError::Store(format!(
                    "no saved state for match {match_id}"
                )))
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }
}
