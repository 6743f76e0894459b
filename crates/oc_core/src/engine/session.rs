//! Stateful scoring facade: one match, one edit lock, one store.
//!
//! Every mutation runs the same pipeline: lock check, engine call, lifecycle
//! check, store append, state save. A failure at any stage, the store
//! included, leaves the in-memory state exactly as it was, so a retry never
//! applies anything twice.

use std::sync::Arc;

use uuid::Uuid;

use crate::data::PlayingConditions;
use crate::engine::delivery::{apply_delivery, undo_last_ball};
use crate::engine::flow::{check_transition, start_second_innings, FlowTransition};
use crate::engine::scorecard::{build_scorecard, live_scorecard};
use crate::engine::selection;
use crate::engine::sim::{simulate_match, AbortSignal, SimReport};
use crate::error::Result;
use crate::lock::{EditLock, EditLockCoordinator};
use crate::models::{BallEvent, DeliveryRequest, MatchPhase, MatchState, PlayerId, Scorecard, Team};
use crate::store::MatchStore;

/// What one scored delivery did: the recorded event plus any lifecycle
/// transition it triggered.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub event: BallEvent,
    pub transition: Option<FlowTransition>,
}

/// A live scoring desk for one match.
///
/// Mutations require the caller to present the holder id of the current
/// edit lock; reads never do.
pub struct ScoringSession {
    state: MatchState,
    conditions: PlayingConditions,
    store: Arc<dyn MatchStore>,
    locks: EditLockCoordinator,
}

impl ScoringSession {
    /// Open a new match and persist its initial state.
    pub fn new(
        team_one: Team,
        team_two: Team,
        overs_limit: u8,
        conditions: PlayingConditions,
        store: Arc<dyn MatchStore>,
    ) -> Result<Self> {
        let state = MatchState::new(team_one, team_two, overs_limit)?;
        store.save_state(&state)?;
        log::info!(
            "match {} opened for scoring: {} v {}, {} overs",
            state.match_id,
            state.team_one.name,
            state.team_two.name,
            overs_limit
        );
        Ok(Self::attach(state, conditions, store))
    }

    /// Resume a stored match where its scorers left it.
    pub fn resume(
        match_id: Uuid,
        conditions: PlayingConditions,
        store: Arc<dyn MatchStore>,
    ) -> Result<Self> {
        let state = store.load_state(match_id)?;
        log::info!("match {} resumed at {}", match_id, state.score_line());
        Ok(Self::attach(state, conditions, store))
    }

    fn attach(
        state: MatchState,
        conditions: PlayingConditions,
        store: Arc<dyn MatchStore>,
    ) -> Self {
        let locks = EditLockCoordinator::new(state.match_id, conditions.edit_lock.expiry_window());
        ScoringSession {
            state,
            conditions,
            store,
            locks,
        }
    }

    // ------------------------------------------------------------------
    // Reads: no lock required.
    // ------------------------------------------------------------------

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn match_id(&self) -> Uuid {
        self.state.match_id
    }

    pub fn phase(&self) -> MatchPhase {
        self.state.phase
    }

    pub fn conditions(&self) -> &PlayingConditions {
        &self.conditions
    }

    /// Scorecard for the innings in progress (or the last one played).
    pub fn scorecard(&self) -> Result<Scorecard> {
        live_scorecard(&self.state)
    }

    pub fn scorecard_for(&self, innings: u8) -> Result<Scorecard> {
        build_scorecard(&self.state, innings)
    }

    pub fn lock_holder(&self) -> Option<&EditLock> {
        self.locks.holder()
    }

    // ------------------------------------------------------------------
    // Lock operations.
    // ------------------------------------------------------------------

    /// Take the edit lock, displacing an expired holder if there is one.
    /// Re-acquiring as the current holder renews.
    pub fn acquire_lock(&mut self, holder_id: Uuid, holder_name: &str) -> Result<EditLock> {
        self.locks.acquire(holder_id, holder_name)
    }

    /// Slide the lock's expiry window forward.
    pub fn renew_lock(&mut self, holder_id: Uuid) -> Result<()> {
        self.locks.renew(holder_id)
    }

    pub fn release_lock(&mut self, holder_id: Uuid) -> Result<()> {
        self.locks.release(holder_id)
    }

    // ------------------------------------------------------------------
    // Mutations: lock-gated, persisted.
    // ------------------------------------------------------------------

    /// Score one delivery and persist it.
    ///
    /// If the store refuses the write, the ball is rolled back off the
    /// in-memory state before the error propagates, so a retry scores it
    /// exactly once.
    pub fn score_delivery(
        &mut self,
        holder: Uuid,
        request: &DeliveryRequest,
    ) -> Result<DeliveryOutcome> {
        self.locks.verify(holder)?;
        let event = apply_delivery(&mut self.state, &self.conditions, request)?;
        let transition = check_transition(&mut self.state);
        if let Err(err) = self.persist_balls_from(self.state.balls.len() - 1) {
            // The snapshot undo restores the exact pre-ball state,
            // transition effects included.
            undo_last_ball(&mut self.state)?;
            return Err(err);
        }
        log::debug!(
            "match {}: ball {} recorded, {}",
            self.state.match_id,
            event.seq,
            self.state.score_line()
        );
        Ok(DeliveryOutcome { event, transition })
    }

    /// Send the next batter in after a wicket (or an opener at the start).
    pub fn select_next_batter(&mut self, holder: Uuid, id: PlayerId) -> Result<()> {
        self.locks.verify(holder)?;
        let before = self.state.clone();
        selection::select_next_batter(&mut self.state, id)?;
        self.save_or_restore(before)
    }

    /// Put a bowler on for the coming over.
    pub fn select_next_bowler(&mut self, holder: Uuid, id: PlayerId) -> Result<()> {
        self.locks.verify(holder)?;
        let before = self.state.clone();
        selection::select_next_bowler(&mut self.state, &self.conditions, id)?;
        self.save_or_restore(before)
    }

    /// Rearrange the batters still to come.
    pub fn reorder_batting(&mut self, holder: Uuid, order: &[PlayerId]) -> Result<()> {
        self.locks.verify(holder)?;
        let before = self.state.clone();
        selection::reorder_remaining_batters(&mut self.state, order)?;
        self.save_or_restore(before)
    }

    /// Cross the innings break.
    pub fn start_second_innings(&mut self, holder: Uuid) -> Result<()> {
        self.locks.verify(holder)?;
        let before = self.state.clone();
        start_second_innings(&mut self.state)?;
        self.save_or_restore(before)
    }

    /// Take the most recent ball back off the book, store included. A store
    /// failure puts the ball back, in memory and in the log.
    pub fn undo_last_ball(&mut self, holder: Uuid) -> Result<BallEvent> {
        self.locks.verify(holder)?;
        let before = self.state.clone();
        let event = undo_last_ball(&mut self.state)?;
        if let Err(err) = self.store.remove_last_event(self.state.match_id) {
            self.state = before;
            return Err(err);
        }
        if let Err(err) = self.store.save_state(&self.state) {
            if let Err(unwind) = self.store.append_event(self.state.match_id, &event) {
                log::error!(
                    "match {}: audit log diverged during a failed undo: {unwind}",
                    self.state.match_id
                );
            }
            self.state = before;
            return Err(err);
        }
        Ok(event)
    }

    /// Simulate the rest of the match under the edit lock, persisting every
    /// simulated ball as if it had been scored by hand. If the store refuses
    /// any of the writes, the whole simulation is discarded; a rerun with
    /// the same seed produces the identical match.
    pub fn simulate_to_result(
        &mut self,
        holder: Uuid,
        seed: u64,
        abort: Option<&AbortSignal>,
    ) -> Result<SimReport> {
        self.locks.verify(holder)?;
        let before = self.state.clone();
        let report = match simulate_match(
            &mut self.state,
            &self.conditions,
            seed,
            abort,
            &mut |_: &MatchState, _: &BallEvent| {},
        ) {
            Ok(report) => report,
            Err(err) => {
                self.state = before;
                return Err(err);
            }
        };
        if let Err(err) = self.persist_balls_from(before.balls.len()) {
            self.state = before;
            return Err(err);
        }
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Persistence plumbing.
    // ------------------------------------------------------------------

    /// Append every ball from `already_stored` onwards, then save the state
    /// document. On failure the appended events are taken back out, so the
    /// audit log never runs ahead of the saved document.
    fn persist_balls_from(&self, already_stored: usize) -> Result<()> {
        for (appended, event) in self.state.balls[already_stored..].iter().enumerate() {
            if let Err(err) = self.store.append_event(self.state.match_id, event) {
                self.unwind_appended_events(appended);
                return Err(err);
            }
        }
        if let Err(err) = self.store.save_state(&self.state) {
            self.unwind_appended_events(self.state.balls.len() - already_stored);
            return Err(err);
        }
        Ok(())
    }

    fn unwind_appended_events(&self, count: usize) {
        for _ in 0..count {
            if let Err(err) = self.store.remove_last_event(self.state.match_id) {
                log::error!(
                    "match {}: audit log cleanup stopped early: {err}",
                    self.state.match_id
                );
                break;
            }
        }
    }

    fn save_or_restore(&mut self, before: MatchState) -> Result<()> {
        if let Err(err) = self.store.save_state(&self.state) {
            self.state = before;
            return Err(err);
        }
        Ok(())
    }
}
