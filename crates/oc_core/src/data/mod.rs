pub mod playing_conditions;

pub use playing_conditions::{
    standard_conditions, BowlingRules, CapRounding, EditLockRules, FreeHitRules, OutcomeWeights,
    PlayingConditions, SimulatorTuning, PLAYING_CONDITIONS_YAML,
};
