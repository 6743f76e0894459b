//! Innings and match lifecycle: close detection, the innings break, and the
//! final result.
//!
//! `check_transition` runs after every scored ball. It is the only place an
//! innings is closed or a result decided, so the close-priority rule lives
//! here and nowhere else.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoreError};
use crate::models::{InningsSummary, MatchOutcome, MatchPhase, MatchState, WICKETS_PER_INNINGS};

/// Why an innings closed. When several conditions hold after the same ball,
/// the earliest variant wins: a chase that passes its target with the last
/// wicket falling is still a win by one wicket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InningsCloseReason {
    TargetReached,
    AllOut,
    OversCompleted,
}

/// A lifecycle step taken by [`check_transition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowTransition {
    /// Innings one closed; the match now waits at the innings break.
    InningsClosed {
        summary: InningsSummary,
        reason: InningsCloseReason,
    },
    /// Innings two closed and the result is in.
    MatchCompleted {
        summary: InningsSummary,
        reason: InningsCloseReason,
        outcome: MatchOutcome,
    },
}

/// Close the live innings if any close condition holds, and return what
/// happened. A no-op on a state that is not live or whose innings is still
/// open.
///
/// Everything mutated here is covered by the per-ball undo snapshot, so
/// undoing the closing ball reopens the innings (and un-decides the match).
pub fn check_transition(state: &mut MatchState) -> Option<FlowTransition> {
    if !state.phase.is_live() {
        return None;
    }
    let reason = close_reason(state)?;

    let summary = InningsSummary {
        innings: state.innings,
        batting_team: state.batting_team.clone(),
        bowling_team: state.bowling_team.clone(),
        runs: state.total_runs,
        wickets: state.wickets,
        overs: state.over_index,
        balls: state.legal_balls_in_over,
    };
    state.innings_history.push(summary.clone());
    state.striker = None;
    state.non_striker = None;
    state.bowler = None;

    if state.innings == 1 {
        let target = state.total_runs + 1;
        state.phase = MatchPhase::InningsBreak;
        state.target_score = Some(target);
        log::info!("innings one closed ({reason:?}): {summary}. Target {target}");
        Some(FlowTransition::InningsClosed { summary, reason })
    } else {
        let outcome = decide_outcome(state, reason);
        state.phase = MatchPhase::MatchComplete;
        state.result = Some(outcome.clone());
        log::info!("match complete ({reason:?}): {}", outcome.text);
        Some(FlowTransition::MatchCompleted {
            summary,
            reason,
            outcome,
        })
    }
}

/// Flip the state over for the chase. Openers and an opening bowler are
/// selected afterwards, exactly as at the start of the match.
///
/// Undo history does not cross the innings break.
pub fn start_second_innings(state: &mut MatchState) -> Result<()> {
    if !state.phase.is_awaiting_second_innings() {
        return Err(ScoreError::StateConflict(format!(
            "cannot start the second innings while the match is {:?}",
            state.phase
        )));
    }

    state.innings = 2;
    state.phase = MatchPhase::InningsTwoLive;
    state.batting_team = state.team_two.name.clone();
    state.bowling_team = state.team_one.name.clone();
    state.batting_order = state.team_two.order();
    state.bowling_order = state.team_one.order();
    state.remaining_batters = state.batting_order.iter().copied().collect();
    state.over_index = 0;
    state.legal_balls_in_over = 0;
    state.striker = None;
    state.non_striker = None;
    state.bowler = None;
    state.last_over_bowler = None;
    state.pending_free_hit = false;
    state.total_runs = 0;
    state.wickets = 0;
    state.undo_stack.clear();

    log::info!(
        "second innings under way: {} need {} from {} overs",
        state.batting_team,
        state.target_score.unwrap_or(0),
        state.overs_limit
    );
    Ok(())
}

fn close_reason(state: &MatchState) -> Option<InningsCloseReason> {
    if state.innings == 2 {
        if let Some(target) = state.target_score {
            if state.total_runs >= target {
                return Some(InningsCloseReason::TargetReached);
            }
        }
    }
    if state.wickets >= WICKETS_PER_INNINGS {
        return Some(InningsCloseReason::AllOut);
    }
    if state.over_index >= state.overs_limit {
        return Some(InningsCloseReason::OversCompleted);
    }
    None
}

fn decide_outcome(state: &MatchState, reason: InningsCloseReason) -> MatchOutcome {
    match reason {
        InningsCloseReason::TargetReached => {
            // Ten down exactly as the winning run completes is still a win,
            // by the narrowest margin the scorebook allows.
            let margin = (WICKETS_PER_INNINGS - state.wickets).max(1);
            MatchOutcome::won_by_wickets(&state.batting_team, margin)
        }
        InningsCloseReason::AllOut | InningsCloseReason::OversCompleted => {
            // Innings two always carries a target set at the break.
            let target = state.target_score.unwrap_or(state.total_runs + 1);
            let first_innings_runs = target.saturating_sub(1);
            if state.total_runs == first_innings_runs {
                MatchOutcome::tie()
            } else {
                MatchOutcome::won_by_runs(
                    &state.bowling_team,
                    first_innings_runs - state.total_runs,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::eleven;
    use crate::models::{ResultMargin, Team};

    fn fresh_state() -> MatchState {
        MatchState::new(
            Team::new("Harbour CC", eleven("H")),
            Team::new("Valley XI", eleven("V")),
            20,
        )
        .unwrap()
    }

    fn chasing_state(target: u16) -> MatchState {
        let mut state = fresh_state();
        state.innings_history.push(InningsSummary {
            innings: 1,
            batting_team: "Harbour CC".to_string(),
            bowling_team: "Valley XI".to_string(),
            runs: target - 1,
            wickets: 6,
            overs: 20,
            balls: 0,
        });
        state.target_score = Some(target);
        state.innings = 2;
        state.phase = MatchPhase::InningsTwoLive;
        state.batting_team = "Valley XI".to_string();
        state.bowling_team = "Harbour CC".to_string();
        state
    }

    #[test]
    fn open_innings_is_left_alone() {
        let mut state = fresh_state();
        state.total_runs = 45;
        state.wickets = 3;
        state.over_index = 9;
        assert_eq!(check_transition(&mut state), None);
        assert_eq!(state.phase, MatchPhase::InningsOneLive);
    }

    #[test]
    fn first_innings_closes_all_out_and_sets_target() {
        let mut state = fresh_state();
        state.total_runs = 87;
        state.wickets = 10;
        state.over_index = 14;
        state.legal_balls_in_over = 3;

        let transition = check_transition(&mut state).unwrap();

        match transition {
            FlowTransition::InningsClosed { summary, reason } => {
                assert_eq!(reason, InningsCloseReason::AllOut);
                assert_eq!(summary.runs, 87);
                assert_eq!(summary.overs_display(), "14.3");
                assert_eq!(summary.to_string(), "Harbour CC 87/10 (14.3 ov)");
            }
            other => panic!("expected innings close, got {other:?}"),
        }
        assert_eq!(state.phase, MatchPhase::InningsBreak);
        assert_eq!(state.target_score, Some(88));
        assert_eq!(state.innings_history.len(), 1);
        assert!(state.striker.is_none() && state.bowler.is_none());
    }

    #[test]
    fn first_innings_closes_when_overs_run_out() {
        let mut state = fresh_state();
        state.total_runs = 161;
        state.wickets = 5;
        state.over_index = 20;

        let transition = check_transition(&mut state).unwrap();
        assert!(matches!(
            transition,
            FlowTransition::InningsClosed {
                reason: InningsCloseReason::OversCompleted,
                ..
            }
        ));
        assert_eq!(state.target_score, Some(162));
    }

    #[test]
    fn second_innings_starts_with_everything_reset() {
        let mut state = fresh_state();
        state.total_runs = 120;
        state.wickets = 10;
        check_transition(&mut state).unwrap();

        start_second_innings(&mut state).unwrap();

        assert_eq!(state.innings, 2);
        assert_eq!(state.phase, MatchPhase::InningsTwoLive);
        assert_eq!(state.batting_team, "Valley XI");
        assert_eq!(state.bowling_team, "Harbour CC");
        assert_eq!(state.total_runs, 0);
        assert_eq!(state.wickets, 0);
        assert_eq!(state.over_index, 0);
        assert_eq!(state.target_score, Some(121));
        assert_eq!(state.remaining_batters.len(), 11);
        assert_eq!(state.undo_depth(), 0);
        assert!(state.required_selection().is_some());
    }

    #[test]
    fn second_innings_cannot_start_from_live_play() {
        let mut state = fresh_state();
        let err = start_second_innings(&mut state).unwrap_err();
        assert!(matches!(err, ScoreError::StateConflict(_)));
    }

    #[test]
    fn chase_won_with_four_down_is_six_wickets() {
        let mut state = chasing_state(88);
        state.total_runs = 88;
        state.wickets = 4;
        state.over_index = 16;
        state.legal_balls_in_over = 2;

        let transition = check_transition(&mut state).unwrap();
        match transition {
            FlowTransition::MatchCompleted {
                reason, outcome, ..
            } => {
                assert_eq!(reason, InningsCloseReason::TargetReached);
                assert_eq!(outcome.text, "Valley XI won by 6 wickets");
                assert_eq!(outcome.margin, ResultMargin::Wickets { wickets: 6 });
            }
            other => panic!("expected a completed match, got {other:?}"),
        }
        assert_eq!(state.phase, MatchPhase::MatchComplete);
        assert!(state.result.is_some());
    }

    #[test]
    fn target_reached_with_all_ten_down_is_one_wicket() {
        // A run out where the winning run was completed first: the run
        // counts, the wicket counts, and the target-reached rule wins.
        let mut state = chasing_state(88);
        state.total_runs = 88;
        state.wickets = 10;

        let transition = check_transition(&mut state).unwrap();
        match transition {
            FlowTransition::MatchCompleted { outcome, .. } => {
                assert_eq!(outcome.text, "Valley XI won by 1 wicket");
            }
            other => panic!("expected a completed match, got {other:?}"),
        }
    }

    #[test]
    fn defenders_win_by_the_runs_margin() {
        let mut state = chasing_state(88);
        state.total_runs = 77;
        state.wickets = 6;
        state.over_index = 20;

        let transition = check_transition(&mut state).unwrap();
        match transition {
            FlowTransition::MatchCompleted {
                reason, outcome, ..
            } => {
                assert_eq!(reason, InningsCloseReason::OversCompleted);
                assert_eq!(outcome.text, "Harbour CC won by 10 runs");
                assert_eq!(outcome.winner.as_deref(), Some("Harbour CC"));
            }
            other => panic!("expected a completed match, got {other:?}"),
        }
    }

    #[test]
    fn level_scores_at_the_close_is_a_tie() {
        let mut state = chasing_state(88);
        state.total_runs = 87;
        state.wickets = 10;

        let transition = check_transition(&mut state).unwrap();
        match transition {
            FlowTransition::MatchCompleted { outcome, .. } => {
                assert_eq!(outcome.text, "Match tied");
                assert_eq!(outcome.margin, ResultMargin::Tie);
                assert!(outcome.winner.is_none());
            }
            other => panic!("expected a completed match, got {other:?}"),
        }
    }

    #[test]
    fn completed_match_is_never_reclosed() {
        let mut state = chasing_state(88);
        state.total_runs = 88;
        check_transition(&mut state).unwrap();
        assert_eq!(check_transition(&mut state), None);
        assert_eq!(state.innings_history.len(), 2);
    }
}
