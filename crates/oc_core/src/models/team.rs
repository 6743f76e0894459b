use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::player::{Player, PlayerId};
use crate::error::{Result, ScoreError};

/// An eleven taking part in one match. Roster order doubles as the default
/// batting order for the side's innings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Team {
    pub name: String,
    pub players: Vec<Player>,
}

pub const PLAYERS_PER_SIDE: usize = 11;

impl Team {
    pub fn new(name: impl Into<String>, players: Vec<Player>) -> Self {
        Team {
            name: name.into(),
            players,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.players.len() != PLAYERS_PER_SIDE {
            return Err(ScoreError::Validation(format!(
                "team {} must have exactly {} players, found {}",
                self.name,
                PLAYERS_PER_SIDE,
                self.players.len()
            )));
        }

        let mut seen = HashSet::new();
        for p in &self.players {
            if !seen.insert(p.id) {
                return Err(ScoreError::Validation(format!(
                    "team {} has duplicate player id {}",
                    self.name, p.id
                )));
            }
        }

        let keepers = self.players.iter().filter(|p| p.is_wicketkeeper).count();
        if keepers > 1 {
            return Err(ScoreError::Validation(format!(
                "team {} designates {} wicketkeepers, at most one is allowed",
                self.name, keepers
            )));
        }

        Ok(())
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.player(id).is_some()
    }

    pub fn wicketkeeper(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_wicketkeeper)
    }

    /// Roster order as an id list; the seed for batting and bowling orders.
    pub fn order(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id).collect()
    }

    /// Display name for an id, falling back to the raw id for robustness in
    /// log lines. Scorecard rows only ever hold ids that came from a roster.
    pub fn display_name(&self, id: PlayerId) -> String {
        match self.player(id) {
            Some(p) => p.name.clone(),
            None => id.to_string(),
        }
    }
}
