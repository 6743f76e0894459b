//! Scorecard aggregation: a display-ready card rebuilt from the ball log.
//!
//! Nothing in here writes to [`MatchState`]; the card is a pure function of
//! the state, so building it twice yields identical output, and building it
//! for a past innings works long after that innings closed.

use fxhash::FxHashMap;

use crate::error::{Result, ScoreError};
use crate::models::{
    BallEvent, BattingLine, BowlingLine, ChaseSummary, ExtraType, ExtrasBreakdown, FallOfWicket,
    MatchPhase, MatchState, PartnershipSummary, PlayerId, Scorecard, ScoreSummary, WicketDetails,
    WicketType, BALLS_PER_OVER,
};

/// Build the card for the innings currently in progress (or the one that
/// just finished, once the match is over).
pub fn live_scorecard(state: &MatchState) -> Result<Scorecard> {
    build_scorecard(state, state.innings)
}

/// Build the card for a given innings, 1 or 2. The innings must have
/// started; asking for the second innings during the first is an error.
pub fn build_scorecard(state: &MatchState, innings: u8) -> Result<Scorecard> {
    if innings == 0 || innings > state.innings {
        return Err(ScoreError::Validation(format!(
            "innings {innings} has not started"
        )));
    }

    let is_live_innings = innings == state.innings && state.phase.is_live();
    let batting_side = state.batting_side_for(innings);
    let bowling_side = state.bowling_side_for(innings);

    let balls: Vec<&BallEvent> = state.innings_balls(innings).collect();

    let mut total: u16 = 0;
    let mut wickets: u8 = 0;
    let mut legal_balls: u16 = 0;
    let mut extras = ExtrasBreakdown::default();
    let mut fall_of_wickets = Vec::new();

    let mut batting: FxHashMap<PlayerId, BattingTally> = FxHashMap::default();
    let mut bowling: FxHashMap<PlayerId, BowlingTally> = FxHashMap::default();
    let mut overs: FxHashMap<u8, OverTally> = FxHashMap::default();

    // Partnership tracking for the live card: team runs and legal balls
    // since the most recent wicket.
    let mut stand_runs: u16 = 0;
    let mut stand_balls: u16 = 0;

    for ball in &balls {
        total += ball.runs as u16;
        if ball.legal_delivery {
            legal_balls += 1;
        }

        // The non-striker gets a row even before facing a ball.
        batting.entry(ball.non_striker).or_default();
        let striker = batting.entry(ball.striker).or_default();
        striker.runs += ball.batter_runs as u16;
        if ball.counts_as_ball_faced() {
            striker.balls += 1;
        }
        if ball.batter_runs == 4 {
            striker.fours += 1;
        }
        if ball.batter_runs == 6 {
            striker.sixes += 1;
        }

        let bowler = bowling.entry(ball.bowler).or_default();
        if ball.legal_delivery {
            bowler.legal_balls += 1;
        }
        bowler.conceded += ball.bowler_conceded() as u16;

        let over = overs.entry(ball.over).or_default();
        over.bowler = Some(match over.bowler {
            Some(existing) if existing != ball.bowler => SHARED_OVER,
            _ => ball.bowler,
        });
        if ball.legal_delivery {
            over.legal_balls += 1;
        }
        over.conceded += ball.bowler_conceded() as u16;

        if let Some(extra) = &ball.extra {
            extras.total += ball.extra_runs as u16;
            match extra.kind {
                ExtraType::Wide => extras.wides += ball.extra_runs as u16,
                ExtraType::NoBall => extras.no_balls += ball.extra_runs as u16,
                ExtraType::Bye => extras.byes += ball.extra_runs as u16,
                ExtraType::LegBye => extras.leg_byes += ball.extra_runs as u16,
            }
        }

        if let Some(wicket) = &ball.wicket {
            wickets += 1;
            if wicket.kind.credits_bowler() {
                bowling
                    .entry(ball.bowler)
                    .or_default()
                    .wickets += 1;
            }
            batting.entry(wicket.batter).or_default().dismissal =
                Some(dismissal_line(state, wicket, ball.bowler));
            fall_of_wickets.push(FallOfWicket {
                wicket: wickets,
                score: total,
                batter: state.display_name(wicket.batter),
                over: fall_notation(legal_balls),
            });
            stand_runs = 0;
            stand_balls = 0;
        } else {
            stand_runs += ball.runs as u16;
            if ball.legal_delivery {
                stand_balls += 1;
            }
        }
    }

    // Freshly selected batters and a bowler yet to deliver exist only on
    // the live state, not in the log.
    if is_live_innings {
        for id in [state.striker_id(), state.non_striker_id()]
            .into_iter()
            .flatten()
        {
            batting.entry(id).or_default();
        }
        if let Some(id) = state.bowler_id() {
            bowling.entry(id).or_default();
        }
    }

    // Rows print in the side's configured order, not in order of first
    // appearance, so a swapped opening pair still reads like the book.
    let batting_lines: Vec<BattingLine> = batting_side
        .order()
        .into_iter()
        .filter(|id| batting.contains_key(id))
        .map(|id| {
            let tally = &batting[&id];
            let at_crease = is_live_innings
                && (state.striker_id() == Some(id) || state.non_striker_id() == Some(id));
            BattingLine {
                id,
                name: state.display_name(id),
                runs: tally.runs,
                balls: tally.balls,
                fours: tally.fours,
                sixes: tally.sixes,
                strike_rate: per_hundred(tally.runs, tally.balls),
                dismissal: tally.dismissal.clone(),
                at_crease,
                on_strike: is_live_innings && state.striker_id() == Some(id),
            }
        })
        .collect();

    let maidens = maiden_counts(&overs);
    let bowling_lines: Vec<BowlingLine> = bowling_side
        .order()
        .into_iter()
        .filter(|id| bowling.contains_key(id))
        .map(|id| {
            let tally = &bowling[&id];
            BowlingLine {
                id,
                name: state.display_name(id),
                overs: overs_notation(tally.legal_balls),
                maidens: maidens.get(&id).copied().unwrap_or(0),
                runs: tally.conceded,
                wickets: tally.wickets,
                economy: per_over(tally.conceded, tally.legal_balls),
            }
        })
        .collect();

    let yet_to_bat: Vec<String> = if is_live_innings {
        state
            .remaining_batters
            .iter()
            .map(|id| state.display_name(*id))
            .collect()
    } else {
        batting_side
            .players
            .iter()
            .filter(|p| !batting.contains_key(&p.id))
            .map(|p| p.name.clone())
            .collect()
    };

    let chase = chase_summary(state, innings, total, legal_balls);
    let partnership = if is_live_innings && state.striker.is_some() && state.non_striker.is_some()
    {
        Some(PartnershipSummary {
            runs: stand_runs,
            balls: stand_balls,
        })
    } else {
        None
    };

    Ok(Scorecard {
        innings,
        batting_team: batting_side.name.clone(),
        bowling_team: bowling_side.name.clone(),
        summary: ScoreSummary {
            total,
            wickets,
            overs: overs_notation(legal_balls),
            run_rate: per_over(total, legal_balls),
            chase,
            partnership,
        },
        batting: batting_lines,
        bowling: bowling_lines,
        fall_of_wickets,
        extras,
        yet_to_bat,
    })
}

/// Scorebook dismissal text, keeper marked with a dagger.
fn dismissal_line(state: &MatchState, wicket: &WicketDetails, bowler: PlayerId) -> String {
    let bowler_name = state.display_name(bowler);
    let fielder_name = |id: Option<PlayerId>| -> String {
        match id {
            Some(id) => {
                let dagger = state
                    .find_player(id)
                    .map_or(false, |p| p.is_wicketkeeper);
                if dagger {
                    format!("\u{2020}{}", state.display_name(id))
                } else {
                    state.display_name(id)
                }
            }
            None => "(unknown)".to_string(),
        }
    };

    match wicket.kind {
        WicketType::Bowled => format!("b {bowler_name}"),
        WicketType::Caught => format!("c {} b {bowler_name}", fielder_name(wicket.fielder)),
        WicketType::CaughtAndBowled => format!("c & b {bowler_name}"),
        WicketType::Lbw => format!("lbw b {bowler_name}"),
        WicketType::RunOut => format!("run out ({})", fielder_name(wicket.fielder)),
        WicketType::Stumped => format!("st {} b {bowler_name}", fielder_name(wicket.fielder)),
        WicketType::HitWicket => format!("hit wicket b {bowler_name}"),
    }
}

#[derive(Default)]
struct BattingTally {
    runs: u16,
    balls: u16,
    fours: u8,
    sixes: u8,
    dismissal: Option<String>,
}

#[derive(Default)]
struct BowlingTally {
    legal_balls: u16,
    conceded: u16,
    wickets: u8,
}

#[derive(Default)]
struct OverTally {
    bowler: Option<PlayerId>,
    legal_balls: u16,
    conceded: u16,
}

/// Sentinel for an over split between two bowlers; such an over can never
/// be a maiden for either of them.
const SHARED_OVER: PlayerId = PlayerId(uuid::Uuid::nil());

fn maiden_counts(overs: &FxHashMap<u8, OverTally>) -> FxHashMap<PlayerId, u8> {
    let mut maidens: FxHashMap<PlayerId, u8> = FxHashMap::default();
    for tally in overs.values() {
        if tally.legal_balls == BALLS_PER_OVER as u16 && tally.conceded == 0 {
            if let Some(bowler) = tally.bowler {
                if bowler != SHARED_OVER {
                    *maidens.entry(bowler).or_default() += 1;
                }
            }
        }
    }
    maidens
}

fn chase_summary(
    state: &MatchState,
    innings: u8,
    total: u16,
    legal_balls: u16,
) -> Option<ChaseSummary> {
    if innings != 2 || state.phase != MatchPhase::InningsTwoLive || innings != state.innings {
        return None;
    }
    let target = state.target_score?;
    let runs_needed = target.saturating_sub(total);
    let balls_remaining =
        (state.overs_limit as u16 * BALLS_PER_OVER as u16).saturating_sub(legal_balls);
    Some(ChaseSummary {
        target,
        runs_needed,
        balls_remaining,
        required_rate: per_over(runs_needed, balls_remaining),
    })
}

fn overs_notation(legal_balls: u16) -> String {
    let overs = legal_balls / BALLS_PER_OVER as u16;
    let balls = legal_balls % BALLS_PER_OVER as u16;
    if balls == 0 {
        format!("{overs}")
    } else {
        format!("{overs}.{balls}")
    }
}

/// Over notation at the fall of a wicket: the last ball of an over reads
/// "14.6", never "15".
fn fall_notation(legal_balls: u16) -> String {
    let per_over = BALLS_PER_OVER as u16;
    if legal_balls > 0 && legal_balls % per_over == 0 {
        format!("{}.{}", legal_balls / per_over - 1, per_over)
    } else {
        format!("{}.{}", legal_balls / per_over, legal_balls % per_over)
    }
}

fn per_hundred(runs: u16, balls: u16) -> f32 {
    if balls == 0 {
        0.0
    } else {
        runs as f32 * 100.0 / balls as f32
    }
}

fn per_over(runs: u16, legal_balls: u16) -> f32 {
    if legal_balls == 0 {
        0.0
    } else {
        runs as f32 * BALLS_PER_OVER as f32 / legal_balls as f32
    }
}
