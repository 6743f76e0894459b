//! Deterministic match simulation.
//!
//! Every simulated ball goes through the same [`apply_delivery`] /
//! [`check_transition`] path as a hand-scored one, so simulated and manual
//! matches are indistinguishable downstream. One seeded ChaCha8 stream
//! drives the per-ball outcome draw; all secondary detail resolves through
//! [`deterministic`] hashing so the stream layout never shifts.

pub mod deterministic;
pub mod outcome;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::data::PlayingConditions;
use crate::engine::delivery::apply_delivery;
use crate::engine::flow::{check_transition, start_second_innings, FlowTransition};
use crate::engine::selection::{eligible_bowlers, select_next_batter, select_next_bowler};
use crate::error::{Result, ScoreError};
use crate::models::{
    BallEvent, DeliveryRequest, MatchPhase, MatchState, PlayerId, RunSource, SelectionNeed,
    WicketType,
};

use deterministic::{deterministic_choice, deterministic_pick, subcase};
use outcome::{table_for, BallOutcome, OutcomeTable};

/// Cooperative cancellation flag, checked between deliveries. Everything
/// scored before the flag was raised remains valid.
pub type AbortSignal = Arc<AtomicBool>;

/// A weights file with no legal-ball mass would bowl wides forever; the
/// runner refuses after this many deliveries in one innings.
const MAX_DELIVERIES_PER_INNINGS: u32 = 20_000;

/// What one simulation call did to the state it was handed.
#[derive(Debug, Clone, Default)]
pub struct SimReport {
    /// Deliveries scored by this call, including illegal ones.
    pub deliveries: u32,
    /// Runs added by this call.
    pub runs: u32,
    /// Wickets taken by this call.
    pub wickets: u8,
    /// True if the abort signal cut the run short.
    pub aborted: bool,
    /// Lifecycle transitions crossed, in order.
    pub transitions: Vec<FlowTransition>,
}

impl SimReport {
    /// True if the run ended with the match decided.
    pub fn match_completed(&self) -> bool {
        self.transitions
            .iter()
            .any(|t| matches!(t, FlowTransition::MatchCompleted { .. }))
    }
}

/// Simulate the current innings forward.
///
/// Plays at most `overs_to_play` further overs when given, otherwise to the
/// close of the innings. Required selections resolve automatically: batters
/// in queue order, bowlers round-robin through the bowling order subject to
/// the usual eligibility rules. The sink sees the state *after* each ball.
pub fn simulate_innings<S>(
    state: &mut MatchState,
    conditions: &PlayingConditions,
    seed: u64,
    overs_to_play: Option<u8>,
    abort: Option<&AbortSignal>,
    sink: &mut S,
) -> Result<SimReport>
where
    S: FnMut(&MatchState, &BallEvent),
{
    let table = table_for(conditions)?;
    let mut driver = SimDriver::new(conditions, &table, seed);
    let mut report = SimReport::default();
    driver.run_innings(state, overs_to_play, abort, sink, &mut report)?;
    Ok(report)
}

/// Simulate from the current position to an end-of-match result.
///
/// Crosses the innings break on its own. The same seed against the same
/// starting state always produces the same ball log, the same scorecards
/// and the same result.
pub fn simulate_match<S>(
    state: &mut MatchState,
    conditions: &PlayingConditions,
    seed: u64,
    abort: Option<&AbortSignal>,
    sink: &mut S,
) -> Result<SimReport>
where
    S: FnMut(&MatchState, &BallEvent),
{
    if state.phase == MatchPhase::MatchComplete {
        return Err(ScoreError::StateConflict(
            "match is complete; nothing left to simulate".to_string(),
        ));
    }

    log::info!(
        "simulating match {} to a result (seed {seed})",
        state.match_id
    );

    let table = table_for(conditions)?;
    let mut driver = SimDriver::new(conditions, &table, seed);
    let mut report = SimReport::default();

    if state.phase == MatchPhase::InningsOneLive {
        driver.run_innings(state, None, abort, sink, &mut report)?;
    }
    if state.phase == MatchPhase::InningsBreak && !report.aborted {
        start_second_innings(state)?;
    }
    if state.phase == MatchPhase::InningsTwoLive && !report.aborted {
        driver.run_innings(state, None, abort, sink, &mut report)?;
    }

    if report.aborted {
        log::info!(
            "simulation of match {} aborted after {} deliveries",
            state.match_id,
            report.deliveries
        );
    }
    Ok(report)
}

/// Dismissals a fair simulated delivery may produce, weighted by repetition.
/// Caught turns into caught-and-bowled when the pick lands on the bowler.
const FAIR_DISMISSALS: [WicketType; 8] = [
    WicketType::Bowled,
    WicketType::Caught,
    WicketType::Caught,
    WicketType::Caught,
    WicketType::Lbw,
    WicketType::Bowled,
    WicketType::Stumped,
    WicketType::RunOut,
];

struct SimDriver<'a> {
    conditions: &'a PlayingConditions,
    table: &'a OutcomeTable,
    rng: ChaCha8Rng,
    seed: u64,
    bowler_cursor: usize,
}

impl<'a> SimDriver<'a> {
    fn new(conditions: &'a PlayingConditions, table: &'a OutcomeTable, seed: u64) -> Self {
        SimDriver {
            conditions,
            table,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            bowler_cursor: 0,
        }
    }

    fn run_innings<S>(
        &mut self,
        state: &mut MatchState,
        overs_to_play: Option<u8>,
        abort: Option<&AbortSignal>,
        sink: &mut S,
        report: &mut SimReport,
    ) -> Result<()>
    where
        S: FnMut(&MatchState, &BallEvent),
    {
        if !state.phase.is_live() {
            return Err(ScoreError::StateConflict(
                "no live innings to simulate".to_string(),
            ));
        }

        let stop_over = overs_to_play.map(|n| state.over_index.saturating_add(n));
        let mut scored_this_call = 0u32;

        loop {
            if abort.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                report.aborted = true;
                return Ok(());
            }
            if stop_over.is_some_and(|limit| state.over_index >= limit) {
                return Ok(());
            }
            if scored_this_call >= MAX_DELIVERIES_PER_INNINGS {
                return Err(ScoreError::Validation(format!(
                    "innings did not close within {MAX_DELIVERIES_PER_INNINGS} deliveries; \
                     check the outcome weights"
                )));
            }

            let (striker, bowler) = self.resolve_selections(state)?;
            let request = self.plan_delivery(state, striker, bowler);

            let event = apply_delivery(state, self.conditions, &request)?;
            scored_this_call += 1;
            report.deliveries += 1;
            report.runs += u32::from(event.runs);
            if event.wicket.is_some() {
                report.wickets += 1;
            }
            sink(state, &event);

            if let Some(transition) = check_transition(state) {
                report.transitions.push(transition);
                return Ok(());
            }
        }
    }

    /// Fill any open crease or bowler slot, returning the striker and bowler
    /// for the coming ball.
    fn resolve_selections(&mut self, state: &mut MatchState) -> Result<(PlayerId, PlayerId)> {
        while let Some(need) = state.required_selection() {
            match need {
                SelectionNeed::Batter(_) => {
                    let next = state.remaining_batters.front().copied().ok_or_else(|| {
                        ScoreError::StateConflict(
                            "no batters left to fill the crease".to_string(),
                        )
                    })?;
                    select_next_batter(state, next)?;
                }
                SelectionNeed::Bowler => self.next_bowler(state)?,
            }
        }

        match (state.striker_id(), state.bowler_id()) {
            (Some(striker), Some(bowler)) => Ok((striker, bowler)),
            _ => Err(ScoreError::StateConflict(
                "selection left the crease unfilled".to_string(),
            )),
        }
    }

    /// Round-robin through the bowling order, skipping anyone the playing
    /// conditions rule out for this over.
    fn next_bowler(&mut self, state: &mut MatchState) -> Result<()> {
        let order = state.bowling_order.clone();
        let eligible = eligible_bowlers(state, self.conditions);
        for offset in 0..order.len() {
            let candidate = order[(self.bowler_cursor + offset) % order.len()];
            if eligible.contains(&candidate) {
                self.bowler_cursor = (self.bowler_cursor + offset + 1) % order.len();
                return select_next_bowler(state, self.conditions, candidate);
            }
        }
        Err(ScoreError::CapacityExceeded(
            "no bowler is eligible for the next over".to_string(),
        ))
    }

    /// Turn one outcome draw into a full delivery request.
    fn plan_delivery(
        &mut self,
        state: &MatchState,
        striker: PlayerId,
        bowler: PlayerId,
    ) -> DeliveryRequest {
        let ball = state.balls.len() as u64;
        let seed = self.seed;

        match self.table.sample(&mut self.rng) {
            BallOutcome::Dot => DeliveryRequest::dot(),
            BallOutcome::Single => DeliveryRequest::runs(1),
            BallOutcome::Two => DeliveryRequest::runs(2),
            BallOutcome::Three => DeliveryRequest::runs(3),
            BallOutcome::Four => DeliveryRequest::runs(4),
            BallOutcome::Six => DeliveryRequest::runs(6),
            BallOutcome::Wicket => self.plan_wicket(state, striker, bowler, ball),
            BallOutcome::Wide => {
                let ran =
                    deterministic_pick(seed, ball, striker, subcase::WIDE_RUNS, &[0, 0, 0, 1]);
                DeliveryRequest::wide(ran)
            }
            BallOutcome::NoBall => {
                let ran = deterministic_pick(
                    seed,
                    ball,
                    striker,
                    subcase::NO_BALL_BAT_RUNS,
                    &[0, 0, 1, 2],
                );
                let source = if ran > 0
                    && deterministic_choice(seed, ball, striker, subcase::NO_BALL_SOURCE, 4) == 3
                {
                    RunSource::LegBye
                } else {
                    RunSource::Bat
                };
                DeliveryRequest::no_ball(ran, source)
            }
            BallOutcome::Bye => {
                let ran = deterministic_pick(seed, ball, striker, subcase::BYE_RUNS, &[1, 1, 1, 2]);
                DeliveryRequest::bye(ran)
            }
            BallOutcome::LegBye => {
                let ran =
                    deterministic_pick(seed, ball, striker, subcase::LEG_BYE_RUNS, &[1, 1, 2, 1]);
                DeliveryRequest::leg_bye(ran)
            }
        }
    }

    fn plan_wicket(
        &self,
        state: &MatchState,
        striker: PlayerId,
        bowler: PlayerId,
        ball: u64,
    ) -> DeliveryRequest {
        let seed = self.seed;

        // On a free hit only a run out stands; the sampled wicket becomes one.
        let kind = if state.pending_free_hit && self.conditions.free_hit.enabled {
            WicketType::RunOut
        } else {
            deterministic_pick(seed, ball, striker, subcase::WICKET_KIND, &FAIR_DISMISSALS)
        };

        match kind {
            WicketType::Caught => {
                let fielder = self.pick_fielder(state, striker, ball);
                if fielder == bowler {
                    DeliveryRequest::wicket(WicketType::CaughtAndBowled)
                } else {
                    DeliveryRequest::wicket(WicketType::Caught).with_fielder(fielder)
                }
            }
            WicketType::Stumped => match self.keeper_id(state) {
                Some(keeper) => DeliveryRequest::wicket(WicketType::Stumped).with_fielder(keeper),
                // A side that named no keeper cannot effect a stumping.
                None => DeliveryRequest::wicket(WicketType::Bowled),
            },
            WicketType::RunOut => {
                let fielder = self.pick_fielder(state, striker, ball);
                let ran = deterministic_choice(seed, ball, striker, subcase::RUN_OUT_RUNS, 2) as u8;
                DeliveryRequest::runs(ran).with_wicket(WicketType::RunOut, Some(fielder))
            }
            other => DeliveryRequest::wicket(other),
        }
    }

    fn pick_fielder(&self, state: &MatchState, striker: PlayerId, ball: u64) -> PlayerId {
        let fielders = state.bowling_order.as_slice();
        deterministic_pick(self.seed, ball, striker, subcase::WICKET_FIELDER, fielders)
    }

    fn keeper_id(&self, state: &MatchState) -> Option<PlayerId> {
        state.bowling_side().wicketkeeper().map(|p| p.id)
    }
}
