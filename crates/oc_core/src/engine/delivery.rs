//! The single entry point for scoring one delivery, and its inverse.
//!
//! `apply_delivery` validates the whole request against the current state
//! before touching anything, so a rejected ball leaves the state
//! byte-identical. The mutation phase is straight-line arithmetic with no
//! fallible steps.

use chrono::Utc;

use crate::data::PlayingConditions;
use crate::engine::selection::bowler_figures;
use crate::error::{Result, ScoreError};
use crate::models::{
    BallEvent, DeliveryRequest, ExtraDetails, ExtraType, MatchPhase, MatchState, RunSource,
    WicketDetails, BALLS_PER_OVER, WICKETS_PER_INNINGS,
};

/// Most runs a single delivery can be scored for, before penalties.
pub const MAX_RUNS_PER_BALL: u8 = 6;

/// Score one delivery against the live innings.
///
/// On success the event has been appended to the log, every live counter
/// updated, strike rotated, the over advanced if this was its sixth legal
/// ball, and the free-hit flag rolled forward. Lifecycle transitions (end
/// of innings, end of match) are *not* taken here; callers follow up with
/// [`crate::engine::flow::check_transition`].
pub fn apply_delivery(
    state: &mut MatchState,
    conditions: &PlayingConditions,
    request: &DeliveryRequest,
) -> Result<BallEvent> {
    // Phase gates.
    match state.phase {
        MatchPhase::MatchComplete => {
            return Err(ScoreError::StateConflict(
                "match is complete; no further deliveries can be scored".to_string(),
            ))
        }
        MatchPhase::InningsBreak => {
            return Err(ScoreError::StateConflict(
                "awaiting the start of the second innings".to_string(),
            ))
        }
        MatchPhase::InningsOneLive | MatchPhase::InningsTwoLive => {}
    }
    if state.wickets >= WICKETS_PER_INNINGS {
        return Err(ScoreError::CapacityExceeded(
            "no wickets left in the innings".to_string(),
        ));
    }
    if state.over_index >= state.overs_limit {
        return Err(ScoreError::StateConflict(
            "innings already closed: overs completed".to_string(),
        ));
    }

    // Selection gate: both batters and a bowler must be in place.
    let (striker_id, non_striker_id, bowler_id) = match (
        state.striker_id(),
        state.non_striker_id(),
        state.bowler_id(),
    ) {
        (Some(s), Some(n), Some(b)) => (s, n, b),
        _ => {
            // required_selection is Some whenever any of the three is None.
            let need = match state.required_selection() {
                Some(need) => need,
                None => {
                    return Err(ScoreError::StateConflict(
                        "no live innings to score against".to_string(),
                    ))
                }
            };
            return Err(ScoreError::SelectionRequired { need });
        }
    };

    let extra_kind = request.extra.as_ref().map(|e| e.kind);
    validate_request(state, conditions, request, extra_kind)?;

    // Split the caller's runs into the recorded composition.
    let (total, batter_runs, run_source) = split_runs(request.runs, request.extra.as_ref());
    let extra_runs = total - batter_runs;
    let legal = extra_kind.map_or(true, |k| k.is_legal_delivery());

    let was_free_hit = state.pending_free_hit && conditions.free_hit.enabled;
    let awarded_free_hit =
        matches!(extra_kind, Some(ExtraType::NoBall)) && conditions.free_hit.enabled;

    // Legal deliveries take the next slot; illegal ones are tagged with the
    // slot of the legal ball they precede, capped at 6.
    let ball_in_over = (state.legal_balls_in_over + 1).min(BALLS_PER_OVER);

    let event = BallEvent {
        seq: state.next_seq(),
        innings: state.innings,
        over: state.over_index,
        ball_in_over,
        striker: striker_id,
        non_striker: non_striker_id,
        bowler: bowler_id,
        runs: total,
        batter_runs,
        extra_runs,
        extra: extra_kind.map(|kind| ExtraDetails { kind, run_source }),
        wicket: request.wicket.as_ref().map(|w| WicketDetails {
            kind: w.kind,
            batter: striker_id,
            fielder: w.fielder,
        }),
        legal_delivery: legal,
        was_free_hit,
        awarded_free_hit,
        timestamp: Utc::now(),
    };

    // Everything validated; mutate. Undo restores this snapshot.
    let snapshot = state.capture_snapshot();

    state.balls.push(event.clone());
    state.total_runs += total as u16;

    if let Some(batter) = state.striker.as_mut() {
        batter.runs += batter_runs as u16;
        if legal {
            batter.balls_faced += 1;
        }
        if batter_runs == 4 {
            batter.fours += 1;
        }
        if batter_runs == 6 {
            batter.sixes += 1;
        }
    }

    // The bowler slot is re-summed from the log, never accumulated, so it
    // cannot drift from the book.
    if state.bowler.is_some() {
        state.bowler = Some(bowler_figures(state, bowler_id));
    }

    // Wicket: the facing striker leaves; their replacement (if any) is a
    // selection the caller supplies.
    if let Some(wicket) = &event.wicket {
        state.wickets += 1;
        state.striker = None;
        log::info!(
            "wicket {} ({:?}): {} out, {}",
            state.wickets,
            wicket.kind,
            state.display_name(wicket.batter),
            state.score_line()
        );
    }

    if legal {
        state.legal_balls_in_over += 1;
    }

    // Strike rotation on odd run counts, then the end change if the over is
    // done. A single off the last ball therefore keeps the strike.
    if event.rotation_runs() % 2 == 1 {
        std::mem::swap(&mut state.striker, &mut state.non_striker);
    }

    if legal && state.legal_balls_in_over == BALLS_PER_OVER {
        state.legal_balls_in_over = 0;
        state.over_index += 1;
        std::mem::swap(&mut state.striker, &mut state.non_striker);
        state.last_over_bowler = Some(bowler_id);
        state.bowler = None;
        log::debug!(
            "over {} complete by {}, {}",
            state.over_index,
            state.display_name(bowler_id),
            state.score_line()
        );
    }

    state.pending_free_hit = awarded_free_hit || (was_free_hit && !legal);

    state.undo_stack.push(snapshot);

    log::debug!(
        "ball {} scored: {} run(s){}{}, {}",
        event.seq,
        event.runs,
        match extra_kind {
            Some(kind) => format!(" ({kind:?})"),
            None => String::new(),
        },
        if event.is_wicket() { " W" } else { "" },
        state.score_line()
    );

    Ok(event)
}

/// Reverse the most recent delivery of the live innings.
///
/// Pops the newest event and restores every counter and pointer to the
/// instant before that ball, including a batter or bowler selection made
/// since. Undo history is runtime-only; a freshly loaded match has none.
pub fn undo_last_ball(state: &mut MatchState) -> Result<BallEvent> {
    let snapshot = match state.undo_stack.pop() {
        Some(snapshot) => snapshot,
        None => {
            return Err(ScoreError::StateConflict(
                "nothing to undo in this innings".to_string(),
            ))
        }
    };
    let event = match state.balls.pop() {
        Some(event) => event,
        None => {
            state.undo_stack.push(snapshot);
            return Err(ScoreError::StateConflict(
                "undo history does not match the ball log".to_string(),
            ));
        }
    };

    state.restore_snapshot(snapshot);
    log::info!("undid ball {}: {}", event.seq, state.score_line());
    Ok(event)
}

fn validate_request(
    state: &MatchState,
    conditions: &PlayingConditions,
    request: &DeliveryRequest,
    extra_kind: Option<ExtraType>,
) -> Result<()> {
    if request.runs > MAX_RUNS_PER_BALL {
        return Err(ScoreError::Validation(format!(
            "runs out of range: {} (0..={} allowed)",
            request.runs, MAX_RUNS_PER_BALL
        )));
    }

    if matches!(extra_kind, Some(ExtraType::Bye) | Some(ExtraType::LegBye)) && request.runs == 0 {
        return Err(ScoreError::Validation(
            "byes and leg byes require at least one run".to_string(),
        ));
    }

    if let Some(wicket) = &request.wicket {
        if !wicket.kind.allowed_with_extra(extra_kind) {
            // Only reachable with an extra on the ball; a fair delivery
            // permits every dismissal.
            let kind = extra_kind.map(|k| format!("{k:?}")).unwrap_or_default();
            return Err(ScoreError::Validation(format!(
                "{:?} cannot be given on a {}",
                wicket.kind, kind
            )));
        }
        if state.pending_free_hit
            && conditions.free_hit.enabled
            && !wicket.kind.allowed_on_free_hit()
        {
            return Err(ScoreError::Validation(
                "only a run out can stand on a free hit".to_string(),
            ));
        }
        if wicket.kind.requires_fielder() && wicket.fielder.is_none() {
            return Err(ScoreError::Validation(format!(
                "{:?} requires a fielder",
                wicket.kind
            )));
        }
        if !wicket.kind.requires_fielder() && wicket.fielder.is_some() {
            return Err(ScoreError::Validation(format!(
                "{:?} does not take a fielder",
                wicket.kind
            )));
        }
        if let Some(fielder) = wicket.fielder {
            if !state.bowling_side().contains(fielder) {
                return Err(ScoreError::Validation(format!(
                    "fielder {} is not in the bowling side",
                    fielder
                )));
            }
        }
    }

    Ok(())
}

/// Split the caller's ran/hit runs into (total, batter runs, run source),
/// adding the automatic penalty for wides and no-balls.
fn split_runs(
    runs: u8,
    extra: Option<&crate::models::ExtraRequest>,
) -> (u8, u8, Option<RunSource>) {
    match extra.map(|e| (e.kind, e.run_source)) {
        None => (runs, runs, None),
        Some((ExtraType::Wide, _)) => (runs + 1, 0, None),
        Some((ExtraType::Bye, _)) | Some((ExtraType::LegBye, _)) => (runs, 0, None),
        Some((ExtraType::NoBall, source)) => {
            let source = source.unwrap_or(RunSource::Bat);
            match source {
                RunSource::Bat => (runs + 1, runs, Some(RunSource::Bat)),
                RunSource::Bye | RunSource::LegBye => (runs + 1, 0, Some(source)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testkit::{conditions, ready_match};
    use crate::engine::{select_next_batter, select_next_bowler};
    use crate::models::WicketType;

    fn apply(state: &mut MatchState, request: DeliveryRequest) -> BallEvent {
        apply_delivery(state, conditions(), &request).unwrap()
    }

    #[test]
    fn worked_over_single_four_dot_six_two_single() {
        let mut state = ready_match();
        let opener_one = state.striker_id().unwrap();
        let opener_two = state.non_striker_id().unwrap();

        for runs in [1, 4, 0, 6, 2, 1] {
            apply(&mut state, DeliveryRequest::runs(runs));
        }

        assert_eq!(state.total_runs, 14);
        assert_eq!(state.wickets, 0);
        assert_eq!(state.over_index, 1);
        assert_eq!(state.legal_balls_in_over, 0);

        // Ball 1 rotated to opener two; balls 2-5 left them there; ball 6
        // rotated back, then the end change handed opener two the strike.
        assert_eq!(state.striker_id(), Some(opener_two));
        assert_eq!(state.non_striker_id(), Some(opener_one));

        // The over is done, so the next ball demands a bowler.
        let err = apply_delivery(&mut state, conditions(), &DeliveryRequest::dot()).unwrap_err();
        assert!(matches!(err, ScoreError::SelectionRequired { .. }));
    }

    #[test]
    fn no_ball_with_two_off_the_bat_scores_three() {
        let mut state = ready_match();
        let striker = state.striker_id().unwrap();

        let event = apply(&mut state, DeliveryRequest::no_ball(2, RunSource::Bat));

        assert_eq!(event.runs, 3);
        assert_eq!(event.batter_runs, 2);
        assert_eq!(event.extra_runs, 1);
        assert!(!event.legal_delivery);
        assert!(event.awarded_free_hit);

        assert_eq!(state.total_runs, 3);
        // Not a legal ball: over counter untouched, no ball faced.
        assert_eq!(state.legal_balls_in_over, 0);
        // Even batter runs: no rotation.
        assert_eq!(state.striker_id(), Some(striker));
        let at_crease = state.striker.as_ref().unwrap();
        assert_eq!(at_crease.runs, 2);
        assert_eq!(at_crease.balls_faced, 0);
        assert!(state.pending_free_hit);
    }

    #[test]
    fn free_hit_carries_across_a_wide_and_clears_on_a_legal_ball() {
        let mut state = ready_match();

        apply(&mut state, DeliveryRequest::no_ball(0, RunSource::Bat));
        assert!(state.pending_free_hit);

        // The free-hit delivery turns out to be a wide: flag carries.
        let wide = apply(&mut state, DeliveryRequest::wide(0));
        assert!(wide.was_free_hit);
        assert!(state.pending_free_hit);

        // The next legal ball consumes it.
        let legal = apply(&mut state, DeliveryRequest::dot());
        assert!(legal.was_free_hit);
        assert!(!state.pending_free_hit);

        let after = apply(&mut state, DeliveryRequest::dot());
        assert!(!after.was_free_hit);
    }

    #[test]
    fn wide_with_one_completed_run_rotates_strike() {
        let mut state = ready_match();
        let striker = state.striker_id().unwrap();

        let event = apply(&mut state, DeliveryRequest::wide(1));

        assert_eq!(event.runs, 2);
        assert_eq!(event.batter_runs, 0);
        assert_eq!(state.total_runs, 2);
        assert_ne!(state.striker_id(), Some(striker));
    }

    #[test]
    fn plain_wide_does_not_rotate_strike() {
        let mut state = ready_match();
        let striker = state.striker_id().unwrap();

        let event = apply(&mut state, DeliveryRequest::wide(0));

        assert_eq!(event.runs, 1);
        assert_eq!(state.total_runs, 1);
        assert_eq!(state.striker_id(), Some(striker));
    }

    #[test]
    fn three_byes_rotate_and_skip_the_batter() {
        let mut state = ready_match();
        let striker = state.striker_id().unwrap();

        let event = apply(&mut state, DeliveryRequest::bye(3));

        assert_eq!(event.runs, 3);
        assert_eq!(event.batter_runs, 0);
        assert!(event.legal_delivery);
        assert_eq!(state.total_runs, 3);
        assert_eq!(state.legal_balls_in_over, 1);
        // Odd runs were run: ends swapped.
        assert_eq!(state.non_striker_id(), Some(striker));
        // The striker faced the ball but scored nothing off it.
        let non_striker = state.non_striker.as_ref().unwrap();
        assert_eq!(non_striker.runs, 0);
        assert_eq!(non_striker.balls_faced, 1);
    }

    #[test]
    fn bowled_clears_the_striker_and_blocks_scoring() {
        let mut state = ready_match();
        let striker = state.striker_id().unwrap();

        let event = apply(&mut state, DeliveryRequest::wicket(WicketType::Bowled));

        assert_eq!(event.wicket.as_ref().unwrap().batter, striker);
        assert_eq!(state.wickets, 1);
        assert!(state.striker.is_none());

        let err = apply_delivery(&mut state, conditions(), &DeliveryRequest::dot()).unwrap_err();
        assert!(matches!(err, ScoreError::SelectionRequired { .. }));

        // The bowler was credited.
        assert_eq!(state.bowler.as_ref().unwrap().wickets, 1);
    }

    #[test]
    fn run_out_with_a_completed_run_counts_both() {
        let mut state = ready_match();
        let fielder = state.bowling_side().players[5].id;

        let event = apply(
            &mut state,
            DeliveryRequest::runs(1).with_wicket(WicketType::RunOut, Some(fielder)),
        );

        assert_eq!(event.runs, 1);
        assert!(event.is_wicket());
        assert_eq!(state.total_runs, 1);
        assert_eq!(state.wickets, 1);
        // Run outs are not the bowler's wicket.
        assert_eq!(state.bowler.as_ref().unwrap().wickets, 0);
    }

    #[test]
    fn validation_rejections_leave_state_untouched() {
        let mut state = ready_match();
        let before = serde_json::to_string(&state).unwrap();

        let cases = vec![
            DeliveryRequest::runs(7),
            DeliveryRequest::bye(0),
            DeliveryRequest::wicket(WicketType::Caught),
            DeliveryRequest::wicket(WicketType::Bowled)
                .with_fielder(state.bowling_side().players[0].id),
            DeliveryRequest::wide(0).with_wicket(WicketType::Bowled, None),
            DeliveryRequest::no_ball(0, RunSource::Bat)
                .with_wicket(WicketType::Stumped, Some(state.bowling_side().players[1].id)),
            // Fielder from the batting side.
            DeliveryRequest::wicket(WicketType::Caught)
                .with_fielder(state.batting_side().players[3].id),
        ];
        for request in cases {
            let err = apply_delivery(&mut state, conditions(), &request).unwrap_err();
            assert!(matches!(err, ScoreError::Validation(_)), "{err}");
        }

        assert_eq!(serde_json::to_string(&state).unwrap(), before);
    }

    #[test]
    fn free_hit_rejects_bowled_but_allows_run_out() {
        let mut state = ready_match();
        apply(&mut state, DeliveryRequest::no_ball(0, RunSource::Bat));

        let err = apply_delivery(
            &mut state,
            conditions(),
            &DeliveryRequest::wicket(WicketType::Bowled),
        )
        .unwrap_err();
        assert!(err.to_string().contains("free hit"));

        let fielder = state.bowling_side().players[2].id;
        let event = apply(
            &mut state,
            DeliveryRequest::dot().with_wicket(WicketType::RunOut, Some(fielder)),
        );
        assert!(event.was_free_hit);
        assert_eq!(state.wickets, 1);
    }

    #[test]
    fn stumping_allowed_off_a_wide() {
        let mut state = ready_match();
        let keeper = state
            .bowling_side()
            .wicketkeeper()
            .map(|p| p.id)
            .unwrap();

        let event = apply(
            &mut state,
            DeliveryRequest::wide(0).with_wicket(WicketType::Stumped, Some(keeper)),
        );

        assert_eq!(event.runs, 1);
        assert_eq!(state.wickets, 1);
        assert_eq!(state.legal_balls_in_over, 0);
    }

    #[test]
    fn undo_restores_runs_and_strike() {
        let mut state = ready_match();
        let striker = state.striker_id().unwrap();

        apply(&mut state, DeliveryRequest::runs(4));
        apply(&mut state, DeliveryRequest::runs(1));
        assert_eq!(state.total_runs, 5);
        assert_ne!(state.striker_id(), Some(striker));

        let undone = undo_last_ball(&mut state).unwrap();
        assert_eq!(undone.runs, 1);
        assert_eq!(state.total_runs, 4);
        assert_eq!(state.striker_id(), Some(striker));
        assert_eq!(state.balls.len(), 1);

        undo_last_ball(&mut state).unwrap();
        assert_eq!(state.total_runs, 0);

        let err = undo_last_ball(&mut state).unwrap_err();
        assert!(matches!(err, ScoreError::StateConflict(_)));
    }

    #[test]
    fn undo_reopens_a_completed_over() {
        let mut state = ready_match();
        let opening_bowler = state.bowler_id().unwrap();

        for _ in 0..6 {
            apply(&mut state, DeliveryRequest::dot());
        }
        assert_eq!(state.over_index, 1);
        assert!(state.bowler.is_none());
        assert_eq!(state.last_over_bowler, Some(opening_bowler));

        undo_last_ball(&mut state).unwrap();

        assert_eq!(state.over_index, 0);
        assert_eq!(state.legal_balls_in_over, 5);
        assert_eq!(state.bowler_id(), Some(opening_bowler));
        assert_eq!(state.last_over_bowler, None);
    }

    #[test]
    fn undo_reverses_a_wicket_and_a_replacement_selection() {
        let mut state = ready_match();
        let striker = state.striker_id().unwrap();
        apply(&mut state, DeliveryRequest::runs(2));

        apply(&mut state, DeliveryRequest::wicket(WicketType::Bowled));
        let replacement = *state.remaining_batters.front().unwrap();
        select_next_batter(&mut state, replacement).unwrap();
        assert_eq!(state.striker_id(), Some(replacement));

        undo_last_ball(&mut state).unwrap();

        // The out batter is back on strike with their runs, and the
        // replacement is back at the front of the queue.
        assert_eq!(state.wickets, 0);
        assert_eq!(state.striker_id(), Some(striker));
        assert_eq!(state.striker.as_ref().unwrap().runs, 2);
        assert_eq!(state.remaining_batters.front(), Some(&replacement));
    }

    #[test]
    fn six_over_cap_is_enforced_per_over_not_per_ball() {
        // Wides never close an over: five legal balls plus any number of
        // wides keeps the over open.
        let mut state = ready_match();
        for _ in 0..5 {
            apply(&mut state, DeliveryRequest::dot());
        }
        for _ in 0..3 {
            apply(&mut state, DeliveryRequest::wide(0));
        }
        assert_eq!(state.over_index, 0);
        assert_eq!(state.legal_balls_in_over, 5);

        let last = apply(&mut state, DeliveryRequest::dot());
        assert_eq!(last.ball_in_over, 6);
        assert_eq!(state.over_index, 1);
    }

    #[test]
    fn second_bowler_needed_after_first_over() {
        let mut state = ready_match();
        for _ in 0..6 {
            apply(&mut state, DeliveryRequest::dot());
        }
        let second = state.bowling_order[1];
        select_next_bowler(&mut state, conditions(), second).unwrap();
        let event = apply(&mut state, DeliveryRequest::dot());
        assert_eq!(event.bowler, second);
        assert_eq!(event.over, 1);
        assert_eq!(event.ball_in_over, 1);
    }
}
