//! The scoring engine: one entry point per operation, all of them pure
//! functions over [`MatchState`](crate::models::MatchState).
//!
//! A ball goes through [`apply_delivery`], then [`check_transition`] to see
//! whether it closed the innings or the match. Selections, the scorecard and
//! the simulator each live in their own module; [`session`] wraps the lot
//! behind an edit lock and a store for multi-editor use.

pub mod delivery;
pub mod flow;
pub mod scorecard;
pub mod selection;
pub mod session;
pub mod sim;


pub use delivery::{apply_delivery, undo_last_ball, MAX_RUNS_PER_BALL};
pub use flow::{check_transition, start_second_innings, FlowTransition, InningsCloseReason};
pub use scorecard::{build_scorecard, live_scorecard};
pub use selection::{
    bowler_figures, eligible_bowlers, reorder_remaining_batters, select_next_batter,
    select_next_bowler,
};
pub use session::{DeliveryOutcome, ScoringSession};
pub use sim::{simulate_innings, simulate_match, AbortSignal, SimReport};

/// Shared builders for engine tests.
#[cfg(test)]
pub(crate) mod testkit {
    use crate::data::{standard_conditions, PlayingConditions};
    use crate::engine::selection::{select_next_batter, select_next_bowler};
    use crate::models::fixtures::two_teams;
    use crate::models::MatchState;

    pub fn conditions() -> &'static PlayingConditions {
        standard_conditions()
    }

    /// A twenty-over match with openers and an opening bowler in place,
    /// ready for the first ball.
    pub fn ready_match() -> MatchState {
        let (one, two) = two_teams();
        let mut state = MatchState::new(one, two, 20).unwrap();
        let openers = (state.batting_order[0], state.batting_order[1]);
        select_next_batter(&mut state, openers.0).unwrap();
        select_next_batter(&mut state, openers.1).unwrap();
        let opening_bowler = state.bowling_order[0];
        select_next_bowler(&mut state, conditions(), opening_bowler).unwrap();
        state
    }
}
