//! Hash-based choices for simulated delivery detail.
//!
//! Secondary detail (which dismissal, which fielder, how many ran on a wide)
//! is resolved from (seed, ball, actor, subcase) without touching the RNG, so
//! enriching a delivery never perturbs the primary outcome stream. FxHasher
//! rather than DefaultHasher: the latter is not stable across Rust versions,
//! which would break same-seed replays after a toolchain bump.

use std::hash::{Hash, Hasher};

use fxhash::FxHasher;

use crate::models::PlayerId;

/// Subcase constants, one per decided field, keyed so no two decisions on
/// the same ball collide.
pub mod subcase {
    /// Which dismissal kind a sampled wicket becomes.
    pub const WICKET_KIND: u32 = 0x0100;
    /// Which fielder takes the catch / effects the run out or stumping.
    pub const WICKET_FIELDER: u32 = 0x0101;
    /// Completed runs before a run out.
    pub const RUN_OUT_RUNS: u32 = 0x0102;

    /// Completed runs on a wide, on top of the penalty.
    pub const WIDE_RUNS: u32 = 0x0200;
    /// Runs off the bat on a no-ball.
    pub const NO_BALL_BAT_RUNS: u32 = 0x0300;
    /// Whether no-ball runs came off the bat or the pads.
    pub const NO_BALL_SOURCE: u32 = 0x0301;
    /// Runs scampered on a bye.
    pub const BYE_RUNS: u32 = 0x0400;
    /// Runs scampered on a leg bye.
    pub const LEG_BYE_RUNS: u32 = 0x0401;
}

/// Pick an index in `0..options_count` from the hash of
/// (seed, ball, actor, subcase). Same inputs, same index, always.
#[inline]
pub fn deterministic_choice(
    seed: u64,
    ball: u64,
    actor: PlayerId,
    subcase: u32,
    options_count: usize,
) -> usize {
    if options_count <= 1 {
        return 0;
    }

    let mut hasher = FxHasher::default();
    seed.hash(&mut hasher);
    ball.hash(&mut hasher);
    actor.hash(&mut hasher);
    subcase.hash(&mut hasher);
    (hasher.finish() as usize) % options_count
}

/// Slice form of [`deterministic_choice`].
///
/// # Panics
///
/// Panics if `options` is empty; callers pick from rosters that are never
/// empty by construction.
#[inline]
pub fn deterministic_pick<T: Copy>(
    seed: u64,
    ball: u64,
    actor: PlayerId,
    subcase: u32,
    options: &[T],
) -> T {
    options[deterministic_choice(seed, ball, actor, subcase, options.len())]
}
