//! The per-ball outcome draw.
//!
//! One alias-method table over the eleven outcome weights from the playing
//! conditions. Sampling is O(1) and consumes exactly one draw from the
//! primary RNG stream per delivery, which keeps the stream layout stable as
//! the simulator grows detail.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use rand::Rng;
use rand_distr::{Distribution, WeightedAliasIndex};

use crate::data::{standard_conditions, OutcomeWeights, PlayingConditions};
use crate::error::{Result, ScoreError};

/// What the sampled ball was, before secondary detail is filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallOutcome {
    Dot,
    Single,
    Two,
    Three,
    Four,
    Six,
    Wicket,
    Wide,
    NoBall,
    Bye,
    LegBye,
}

/// Index order must match `OutcomeWeights::values`.
const OUTCOMES: [BallOutcome; 11] = [
    BallOutcome::Dot,
    BallOutcome::Single,
    BallOutcome::Two,
    BallOutcome::Three,
    BallOutcome::Four,
    BallOutcome::Six,
    BallOutcome::Wicket,
    BallOutcome::Wide,
    BallOutcome::NoBall,
    BallOutcome::Bye,
    BallOutcome::LegBye,
];

#[derive(Clone)]
pub struct OutcomeTable {
    dist: WeightedAliasIndex<f32>,
}

impl OutcomeTable {
    pub fn from_weights(weights: &OutcomeWeights) -> Result<Self> {
        let dist = WeightedAliasIndex::new(weights.values().to_vec())
            .map_err(|e| ScoreError::Validation(format!("outcome weights: {e}")))?;
        Ok(OutcomeTable { dist })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> BallOutcome {
        OUTCOMES[self.dist.sample(rng)]
    }
}

/// Table for the embedded standard weights, built once.
///
/// # Panics
///
/// Panics if the embedded weights fail alias-table construction, which
/// parse-time validation rules out.
static DEFAULT_OUTCOME_TABLE: Lazy<OutcomeTable> = Lazy::new(|| {
    OutcomeTable::from_weights(&standard_conditions().simulator.outcome_weights)
        .expect("embedded outcome weights are validated at parse time")
});

/// The outcome table for a set of conditions, borrowing the prebuilt
/// standard table when the weights are the standard ones.
pub fn table_for(conditions: &PlayingConditions) -> Result<Cow<'static, OutcomeTable>> {
    if conditions.simulator.outcome_weights == standard_conditions().simulator.outcome_weights {
        Ok(Cow::Borrowed(&*DEFAULT_OUTCOME_TABLE))
    } else {
        Ok(Cow::Owned(OutcomeTable::from_weights(
            &conditions.simulator.outcome_weights,
        )?))
    }
}
