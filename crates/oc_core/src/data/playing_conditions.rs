//! Playing-conditions loading.
//!
//! The standard limited-overs conditions ship embedded in the binary; a
//! tournament can load overrides from a YAML file at runtime.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoreError};

/// Standard conditions YAML, embedded at compile time.
pub const PLAYING_CONDITIONS_YAML: &str =
    include_str!("../../../../data/playing_conditions.yaml");

static STANDARD: OnceLock<PlayingConditions> = OnceLock::new();

/// The embedded standard conditions, parsed once and cached.
///
/// # Panics
///
/// Panics if the embedded YAML fails to parse, which cannot happen in a
/// correctly built binary.
pub fn standard_conditions() -> &'static PlayingConditions {
    STANDARD.get_or_init(|| {
        PlayingConditions::from_yaml_str(PLAYING_CONDITIONS_YAML)
            .expect("Failed to parse playing_conditions.yaml")
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayingConditions {
    pub conditions_id: String,
    pub name: String,
    /// Default innings length when match creation does not specify one.
    pub overs_limit: u8,
    pub bowling: BowlingRules,
    pub free_hit: FreeHitRules,
    pub edit_lock: EditLockRules,
    pub simulator: SimulatorTuning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BowlingRules {
    /// Per-bowler cap = overs_limit / divisor, rounded per `overs_cap_rounding`.
    pub overs_cap_divisor: u8,
    pub overs_cap_rounding: CapRounding,
    /// Whether a bowler may bowl the over straight after one they bowled.
    pub allow_consecutive_overs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapRounding {
    Ceil,
    Floor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeHitRules {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditLockRules {
    pub expiry_seconds: u64,
}

impl EditLockRules {
    pub fn expiry_window(&self) -> Duration {
        Duration::from_secs(self.expiry_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorTuning {
    pub outcome_weights: OutcomeWeights,
}

/// Relative per-ball outcome weights for the simulator. The sampler
/// normalises them, so only ratios matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeWeights {
    pub dot: f32,
    pub single: f32,
    pub two: f32,
    pub three: f32,
    pub four: f32,
    pub six: f32,
    pub wicket: f32,
    pub wide: f32,
    pub no_ball: f32,
    pub bye: f32,
    pub leg_bye: f32,
}

impl OutcomeWeights {
    pub(crate) fn values(&self) -> [f32; 11] {
        [
            self.dot, self.single, self.two, self.three, self.four, self.six, self.wicket,
            self.wide, self.no_ball, self.bye, self.leg_bye,
        ]
    }
}

impl PlayingConditions {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let conditions: PlayingConditions = serde_yaml::from_str(yaml)?;
        conditions.validate()?;
        Ok(conditions)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.overs_limit == 0 {
            return Err(ScoreError::Validation(
                "playing conditions: overs_limit must be at least 1".to_string(),
            ));
        }
        if self.bowling.overs_cap_divisor == 0 {
            return Err(ScoreError::Validation(
                "playing conditions: overs_cap_divisor must be at least 1".to_string(),
            ));
        }
        if self.edit_lock.expiry_seconds == 0 {
            return Err(ScoreError::Validation(
                "playing conditions: edit_lock.expiry_seconds must be at least 1".to_string(),
            ));
        }
        let weights = self.simulator.outcome_weights.values();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ScoreError::Validation(
                "playing conditions: outcome weights must be finite and non-negative".to_string(),
            ));
        }
        if weights.iter().sum::<f32>() <= 0.0 {
            return Err(ScoreError::Validation(
                "playing conditions: at least one outcome weight must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-bowler over cap for a given innings length, never below one.
    pub fn max_overs_per_bowler(&self, overs_limit: u8) -> u8 {
        let d = self.bowling.overs_cap_divisor as u16;
        let limit = overs_limit as u16;
        let cap = match self.bowling.overs_cap_rounding {
            CapRounding::Ceil => (limit + d - 1) / d,
            CapRounding::Floor => limit / d,
        };
        cap.max(1) as u8
    }
}

impl Default for PlayingConditions {
    fn default() -> Self {
        standard_conditions().clone()
    }
}
