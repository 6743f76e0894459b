//! # oc_core - Limited-Overs Cricket Scoring Engine
//!
//! Ball-by-ball scoring core for limited-overs cricket, with a stateless
//! JSON API for embedding in scoring apps and back ends.
//!
//! ## Features
//! - Full delivery grammar: extras, penalties, free hits, strike rotation,
//!   fall of wickets, over caps
//! - Scorecards derived purely from the ball log, never accumulated
//! - Deterministic match simulation (same seed = same match)
//! - Holder-keyed edit locking for multi-scorer setups

// Allow unused code for API surface kept for embedders
#![allow(dead_code)]
// Scoring arithmetic reads better with explicit casts
#![allow(clippy::cast_lossless)]

pub mod api;
pub mod data;
pub mod engine;
pub mod error;
pub mod lock;
pub mod models;
pub mod store;

// Re-export main API functions
pub use api::{
    new_match_json, score_delivery_json, scorecard_json, simulate_match_json,
    start_second_innings_json,
};
pub use error::{Result, ScoreError};

// Re-export core model types
pub use models::{
    BallEvent, DeliveryRequest, ExtraType, InningsSummary, MatchOutcome, MatchPhase, MatchState,
    Player, PlayerId, Scorecard, SelectionNeed, Team, WicketType,
};

// Re-export the scoring engine surface
pub use engine::{
    apply_delivery, build_scorecard, check_transition, eligible_bowlers, live_scorecard,
    reorder_remaining_batters, select_next_batter, select_next_bowler, simulate_innings,
    simulate_match, start_second_innings, undo_last_ball, AbortSignal, FlowTransition,
    InningsCloseReason, ScoringSession, SimReport,
};

// Re-export locking and persistence
pub use data::{standard_conditions, PlayingConditions};
pub use lock::{EditLock, EditLockCoordinator};
pub use store::{FileStore, MatchStore, MemoryStore};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const SCHEMA_VERSION: u8 = 1;
