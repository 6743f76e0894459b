//! Batter and bowler selection, and the bowling eligibility rules.
//!
//! Selections fill the `Option` slots on [`MatchState`]; scoring stays
//! blocked while any slot is empty. A bowler picked here gets their figures
//! rebuilt from the ball log, so a returning bowler resumes their analysis.

use crate::data::PlayingConditions;
use crate::error::{Result, ScoreError};
use crate::models::{BatterAtCrease, BowlerAtMark, MatchState, PlayerId};

/// Send the next batter in. Fills the striker's end first if both ends are
/// vacant (the start of an innings), otherwise the single vacant end.
///
/// The batter must still be in `remaining_batters`: not already out, not
/// already in, and on the batting side.
pub fn select_next_batter(state: &mut MatchState, id: PlayerId) -> Result<()> {
    if !state.phase.is_live() {
        return Err(ScoreError::StateConflict(format!(
            "cannot select a batter while the match is {:?}",
            state.phase
        )));
    }
    if state.striker.is_some() && state.non_striker.is_some() {
        return Err(ScoreError::StateConflict(
            "both batters are already in place".to_string(),
        ));
    }
    let position = match state.remaining_batters.iter().position(|b| *b == id) {
        Some(position) => position,
        None => {
            return Err(ScoreError::Validation(format!(
                "{} is not available to bat",
                state.display_name(id)
            )))
        }
    };

    state.remaining_batters.remove(position);
    let incoming = BatterAtCrease::fresh(id);
    if state.striker.is_none() {
        state.striker = Some(incoming);
    } else {
        state.non_striker = Some(incoming);
    }
    log::info!(
        "{} comes in at {}/{}",
        state.display_name(id),
        state.total_runs,
        state.wickets
    );
    Ok(())
}

/// Hand the ball to a bowler, either for a fresh over or as a mid-over
/// replacement. Re-selecting the current bowler is a no-op.
pub fn select_next_bowler(
    state: &mut MatchState,
    conditions: &PlayingConditions,
    id: PlayerId,
) -> Result<()> {
    if !state.phase.is_live() {
        return Err(ScoreError::StateConflict(format!(
            "cannot select a bowler while the match is {:?}",
            state.phase
        )));
    }
    if state.bowler_id() == Some(id) {
        return Ok(());
    }
    if !state.bowling_side().contains(id) {
        return Err(ScoreError::Validation(format!(
            "{} is not in the bowling side",
            state.display_name(id)
        )));
    }
    check_bowler_eligibility(state, conditions, id)?;

    state.bowler = Some(bowler_figures(state, id));
    log::info!(
        "{} to bowl over {}",
        state.display_name(id),
        state.over_index + 1
    );
    Ok(())
}

/// Bowling-side members who could legally take the ball right now. The
/// current bowler, if any, is always included.
pub fn eligible_bowlers(state: &MatchState, conditions: &PlayingConditions) -> Vec<PlayerId> {
    state
        .bowling_side()
        .players
        .iter()
        .map(|p| p.id)
        .filter(|id| {
            state.bowler_id() == Some(*id)
                || check_bowler_eligibility(state, conditions, *id).is_ok()
        })
        .collect()
}

/// Replace the order of the batters still to come. The new order must be a
/// permutation of the current queue; nobody can be added or dropped.
pub fn reorder_remaining_batters(state: &mut MatchState, order: &[PlayerId]) -> Result<()> {
    if !state.phase.is_live() {
        return Err(ScoreError::StateConflict(format!(
            "cannot reorder batters while the match is {:?}",
            state.phase
        )));
    }
    let mut current: Vec<PlayerId> = state.remaining_batters.iter().copied().collect();
    let mut proposed: Vec<PlayerId> = order.to_vec();
    current.sort();
    proposed.sort();
    if current != proposed {
        return Err(ScoreError::Validation(
            "new batting order must contain exactly the batters still to come".to_string(),
        ));
    }

    state.remaining_batters = order.iter().copied().collect();
    log::debug!("batting order updated, {} to come", order.len());
    Ok(())
}

fn check_bowler_eligibility(
    state: &MatchState,
    conditions: &PlayingConditions,
    id: PlayerId,
) -> Result<()> {
    let cap = conditions.max_overs_per_bowler(state.overs_limit);
    if bowler_figures(state, id).completed_overs() >= cap as u16 {
        return Err(ScoreError::CapacityExceeded(format!(
            "{} has bowled their full allocation of {} overs",
            state.display_name(id),
            cap
        )));
    }
    // The previous over's bowler sits out the whole of the next one: they
    // can neither open it nor be swapped in to finish it.
    if !conditions.bowling.allow_consecutive_overs && state.last_over_bowler == Some(id) {
        return Err(ScoreError::CapacityExceeded(format!(
            "{} bowled the previous over",
            state.display_name(id)
        )));
    }
    Ok(())
}

/// A bowler's figures for the live innings, rebuilt from the ball log.
pub fn bowler_figures(state: &MatchState, id: PlayerId) -> BowlerAtMark {
    let mut figures = BowlerAtMark::fresh(id);
    for ball in state.innings_balls(state.innings).filter(|b| b.bowler == id) {
        if ball.legal_delivery {
            figures.legal_balls += 1;
        }
        figures.runs_conceded += ball.bowler_conceded() as u16;
        if ball.wicket.as_ref().map_or(false, |w| w.kind.credits_bowler()) {
            figures.wickets += 1;
        }
    }
    figures
}
