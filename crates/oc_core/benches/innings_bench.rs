use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use oc_core::{
    apply_delivery, build_scorecard, select_next_batter, select_next_bowler, simulate_match,
    standard_conditions, DeliveryRequest, MatchState, Player, Team,
};

fn side(name: &str, prefix: &str) -> Team {
    let players = (1..=11)
        .map(|n| {
            if n == 2 {
                Player::keeper(format!("{prefix} {n}"))
            } else {
                Player::new(format!("{prefix} {n}"))
            }
        })
        .collect();
    Team::new(name, players)
}

fn fresh_match(overs: u8) -> MatchState {
    MatchState::new(side("Harbour CC", "Harbour"), side("Valley XI", "Valley"), overs).unwrap()
}

/// A match with openers and an opening bowler selected, one ball away from
/// live scoring.
fn ready_match(overs: u8) -> MatchState {
    let mut state = fresh_match(overs);
    let openers = (state.batting_order[0], state.batting_order[1]);
    select_next_batter(&mut state, openers.0).unwrap();
    select_next_batter(&mut state, openers.1).unwrap();
    let opening_bowler = state.bowling_order[0];
    select_next_bowler(&mut state, standard_conditions(), opening_bowler).unwrap();
    state
}

fn completed_match(overs: u8, seed: u64) -> MatchState {
    let mut state = fresh_match(overs);
    simulate_match(&mut state, standard_conditions(), seed, None, &mut |_, _| {}).unwrap();
    state
}

fn bench_score_one_delivery(c: &mut Criterion) {
    let conditions = standard_conditions();
    let state = ready_match(20);

    c.bench_function("score_one_delivery", |b| {
        b.iter_batched(
            || state.clone(),
            |mut state| {
                apply_delivery(&mut state, conditions, &DeliveryRequest::runs(1)).unwrap();
                state
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_simulate_full_match(c: &mut Criterion) {
    let conditions = standard_conditions();
    let base = fresh_match(20);

    c.bench_function("simulate_20_over_match", |b| {
        b.iter_batched(
            || base.clone(),
            |mut state| {
                simulate_match(&mut state, conditions, 42, None, &mut |_, _| {}).unwrap();
                state
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_scorecard_aggregation(c: &mut Criterion) {
    // Aggregation is pure, so one completed match serves every iteration.
    let state = completed_match(20, 42);

    c.bench_function("build_scorecard_from_full_innings", |b| {
        b.iter(|| build_scorecard(black_box(&state), 1).unwrap())
    });
}

criterion_group!(
    benches,
    bench_score_one_delivery,
    bench_simulate_full_match,
    bench_scorecard_aggregation
);
criterion_main!(benches);
