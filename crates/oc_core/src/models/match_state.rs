use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::BallEvent;
use super::player::{Player, PlayerId};
use super::team::Team;
use crate::error::{Result, ScoreError};

pub const BALLS_PER_OVER: u8 = 6;
pub const WICKETS_PER_INNINGS: u8 = 10;

/// Lifecycle phase of a two-innings limited-overs match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    InningsOneLive,
    InningsBreak,
    InningsTwoLive,
    MatchComplete,
}

impl MatchPhase {
    pub fn is_live(&self) -> bool {
        matches!(self, MatchPhase::InningsOneLive | MatchPhase::InningsTwoLive)
    }

    pub fn is_awaiting_second_innings(&self) -> bool {
        matches!(self, MatchPhase::InningsBreak)
    }

    pub fn is_match_completed(&self) -> bool {
        matches!(self, MatchPhase::MatchComplete)
    }
}

/// Which end of the pitch a selection fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CreaseRole {
    Striker,
    NonStriker,
}

/// The first unfilled slot that blocks scoring, reported to callers inside
/// `ScoreError::SelectionRequired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionNeed {
    Batter(CreaseRole),
    Bowler,
}

impl fmt::Display for SelectionNeed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SelectionNeed::Batter(CreaseRole::Striker) => {
                write!(f, "a batter at the striker's end")
            }
            SelectionNeed::Batter(CreaseRole::NonStriker) => {
                write!(f, "a batter at the non-striker's end")
            }
            SelectionNeed::Bowler => write!(f, "a bowler for the next over"),
        }
    }
}

/// Live figures for a batter currently at the crease. Past batters live only
/// in the ball log; the scorecard rebuilds them from there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatterAtCrease {
    pub id: PlayerId,
    pub runs: u16,
    pub balls_faced: u16,
    pub fours: u8,
    pub sixes: u8,
}

impl BatterAtCrease {
    pub fn fresh(id: PlayerId) -> Self {
        BatterAtCrease {
            id,
            runs: 0,
            balls_faced: 0,
            fours: 0,
            sixes: 0,
        }
    }
}

/// Live figures for the bowler currently at the mark. Re-derived from the
/// log whenever a bowler is selected, so a returning bowler resumes their
/// earlier analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BowlerAtMark {
    pub id: PlayerId,
    pub legal_balls: u16,
    pub runs_conceded: u16,
    pub wickets: u8,
}

impl BowlerAtMark {
    pub fn fresh(id: PlayerId) -> Self {
        BowlerAtMark {
            id,
            legal_balls: 0,
            runs_conceded: 0,
            wickets: 0,
        }
    }

    /// Completed overs, for cap checks: 22 legal balls is 3 full overs.
    pub fn completed_overs(&self) -> u16 {
        self.legal_balls / BALLS_PER_OVER as u16
    }
}

/// Frozen closing line of one innings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InningsSummary {
    pub innings: u8,
    pub batting_team: String,
    pub bowling_team: String,
    pub runs: u16,
    pub wickets: u8,
    /// Completed overs plus leftover legal balls, e.g. 18 overs and 3 balls.
    pub overs: u8,
    pub balls: u8,
}

impl InningsSummary {
    pub fn overs_display(&self) -> String {
        if self.balls == 0 {
            format!("{}", self.overs)
        } else {
            format!("{}.{}", self.overs, self.balls)
        }
    }
}

impl fmt::Display for InningsSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {}/{} ({} ov)",
            self.batting_team,
            self.runs,
            self.wickets,
            self.overs_display()
        )
    }
}

/// Final result of a completed match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MatchOutcome {
    /// Scorebook phrasing, e.g. "Harbour CC won by 6 wickets".
    pub text: String,
    pub margin: ResultMargin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultMargin {
    Runs { runs: u16 },
    Wickets { wickets: u8 },
    Tie,
}

impl MatchOutcome {
    pub fn won_by_runs(team: &str, runs: u16) -> Self {
        MatchOutcome {
            text: format!("{} won by {} {}", team, runs, plural(runs as u32, "run")),
            margin: ResultMargin::Runs { runs },
            winner: Some(team.to_string()),
        }
    }

    pub fn won_by_wickets(team: &str, wickets: u8) -> Self {
        MatchOutcome {
            text: format!(
                "{} won by {} {}",
                team,
                wickets,
                plural(wickets as u32, "wicket")
            ),
            margin: ResultMargin::Wickets { wickets },
            winner: Some(team.to_string()),
        }
    }

    pub fn tie() -> Self {
        MatchOutcome {
            text: "Match tied".to_string(),
            margin: ResultMargin::Tie,
            winner: None,
        }
    }
}

fn plural(n: u32, noun: &str) -> String {
    if n == 1 {
        noun.to_string()
    } else {
        format!("{}s", noun)
    }
}

/// Everything a ball mutates, captured before the ball is applied so undo
/// can restore it exactly. Never persisted; a reloaded match starts with an
/// empty undo history.
#[derive(Debug, Clone)]
pub(crate) struct ScoreSnapshot {
    innings: u8,
    phase: MatchPhase,
    over_index: u8,
    legal_balls_in_over: u8,
    striker: Option<BatterAtCrease>,
    non_striker: Option<BatterAtCrease>,
    bowler: Option<BowlerAtMark>,
    last_over_bowler: Option<PlayerId>,
    remaining_batters: VecDeque<PlayerId>,
    pending_free_hit: bool,
    total_runs: u16,
    wickets: u8,
    target_score: Option<u16>,
    innings_history_len: usize,
    result: Option<MatchOutcome>,
}

/// The single aggregate for one match: identity, rosters, the append-only
/// ball log, and the live scoring pointers for the innings in progress.
///
/// Serializes to a self-contained document. Derived artifacts (scorecards)
/// are never stored here; the one exception is `innings_history`, the frozen
/// closing line of each finished innings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MatchState {
    #[serde(default = "default_schema_version")]
    pub schema_version: u8,
    pub match_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub overs_limit: u8,

    /// Bats first, by convention.
    pub team_one: Team,
    pub team_two: Team,

    /// 1 or 2.
    pub innings: u8,
    pub phase: MatchPhase,
    pub batting_team: String,
    pub bowling_team: String,

    /// Whole-match ball log, both innings, append-only.
    pub balls: Vec<BallEvent>,

    /// 0-based index of the over in progress.
    pub over_index: u8,
    /// Legal balls already bowled in the over in progress (0..=5 between
    /// deliveries; reaching 6 closes the over and resets this to 0).
    pub legal_balls_in_over: u8,

    pub striker: Option<BatterAtCrease>,
    pub non_striker: Option<BatterAtCrease>,
    pub bowler: Option<BowlerAtMark>,
    /// Who bowled the over that just finished; drives the consecutive-over
    /// restriction.
    pub last_over_bowler: Option<PlayerId>,

    /// Batting order fixed at innings start (roster order of the side).
    pub batting_order: Vec<PlayerId>,
    pub bowling_order: Vec<PlayerId>,
    /// Batters yet to come, next batter at the front. Admins may reorder it
    /// between balls.
    pub remaining_batters: VecDeque<PlayerId>,

    /// The next delivery is a free hit.
    pub pending_free_hit: bool,

    pub total_runs: u16,
    pub wickets: u8,
    /// Runs the chasing side needs to win; set at the innings break.
    pub target_score: Option<u16>,

    pub innings_history: Vec<InningsSummary>,
    pub result: Option<MatchOutcome>,

    #[serde(skip)]
    pub(crate) undo_stack: Vec<ScoreSnapshot>,
}

fn default_schema_version() -> u8 {
    crate::SCHEMA_VERSION
}

impl MatchState {
    /// Seed a new match with innings one ready to start. Openers and an
    /// opening bowler must be selected before the first ball.
    pub fn new(team_one: Team, team_two: Team, overs_limit: u8) -> Result<Self> {
        if overs_limit == 0 {
            return Err(ScoreError::Validation(
                "overs limit must be at least 1".to_string(),
            ));
        }
        team_one.validate()?;
        team_two.validate()?;
        if team_one.name == team_two.name {
            return Err(ScoreError::Validation(format!(
                "both teams are named {:?}",
                team_one.name
            )));
        }

        let batting_order = team_one.order();
        let bowling_order = team_two.order();
        let remaining_batters: VecDeque<PlayerId> = batting_order.iter().copied().collect();

        Ok(MatchState {
            schema_version: crate::SCHEMA_VERSION,
            match_id: Uuid::new_v4(),
            created_at: Utc::now(),
            overs_limit,
            batting_team: team_one.name.clone(),
            bowling_team: team_two.name.clone(),
            team_one,
            team_two,
            innings: 1,
            phase: MatchPhase::InningsOneLive,
            balls: Vec::new(),
            over_index: 0,
            legal_balls_in_over: 0,
            striker: None,
            non_striker: None,
            bowler: None,
            last_over_bowler: None,
            batting_order,
            bowling_order,
            remaining_batters,
            pending_free_hit: false,
            total_runs: 0,
            wickets: 0,
            target_score: None,
            innings_history: Vec::new(),
            result: None,
            undo_stack: Vec::new(),
        })
    }

    /// Fixed id instead of a random one; the simulator uses this so equal
    /// seeds produce byte-identical state documents.
    pub fn with_match_id(mut self, id: Uuid) -> Self {
        self.match_id = id;
        self
    }

    // ------------------------------------------------------------------
    // Derived views
    // ------------------------------------------------------------------

    /// The side batting in the given innings (team one bats first).
    pub fn batting_side_for(&self, innings: u8) -> &Team {
        if innings == 1 {
            &self.team_one
        } else {
            &self.team_two
        }
    }

    pub fn bowling_side_for(&self, innings: u8) -> &Team {
        if innings == 1 {
            &self.team_two
        } else {
            &self.team_one
        }
    }

    pub fn batting_side(&self) -> &Team {
        self.batting_side_for(self.innings)
    }

    pub fn bowling_side(&self) -> &Team {
        self.bowling_side_for(self.innings)
    }

    pub fn find_player(&self, id: PlayerId) -> Option<&Player> {
        self.team_one.player(id).or_else(|| self.team_two.player(id))
    }

    pub fn display_name(&self, id: PlayerId) -> String {
        match self.find_player(id) {
            Some(p) => p.name.clone(),
            None => id.to_string(),
        }
    }

    pub fn innings_balls(&self, innings: u8) -> impl Iterator<Item = &BallEvent> {
        self.balls.iter().filter(move |b| b.innings == innings)
    }

    /// Legal balls bowled so far in the live innings.
    pub fn innings_legal_balls(&self) -> u16 {
        self.over_index as u16 * BALLS_PER_OVER as u16 + self.legal_balls_in_over as u16
    }

    pub fn last_ball(&self) -> Option<&BallEvent> {
        self.balls.last()
    }

    pub fn next_seq(&self) -> u64 {
        self.balls.len() as u64 + 1
    }

    pub fn striker_id(&self) -> Option<PlayerId> {
        self.striker.as_ref().map(|b| b.id)
    }

    pub fn non_striker_id(&self) -> Option<PlayerId> {
        self.non_striker.as_ref().map(|b| b.id)
    }

    pub fn bowler_id(&self) -> Option<PlayerId> {
        self.bowler.as_ref().map(|b| b.id)
    }

    /// The first unfilled crease or bowler slot, if any. Scoring is blocked
    /// while this returns `Some`.
    pub fn required_selection(&self) -> Option<SelectionNeed> {
        if !self.phase.is_live() {
            return None;
        }
        if self.striker.is_none() {
            return Some(SelectionNeed::Batter(CreaseRole::Striker));
        }
        if self.non_striker.is_none() {
            return Some(SelectionNeed::Batter(CreaseRole::NonStriker));
        }
        if self.bowler.is_none() {
            return Some(SelectionNeed::Bowler);
        }
        None
    }

    /// Overs in scorebook notation, e.g. "18.3"; whole overs drop the dot.
    pub fn overs_display(&self) -> String {
        if self.legal_balls_in_over == 0 {
            format!("{}", self.over_index)
        } else {
            format!("{}.{}", self.over_index, self.legal_balls_in_over)
        }
    }

    /// One-line score for log output, e.g. "Harbour CC 151/4 (18.3 ov)".
    pub fn score_line(&self) -> String {
        format!(
            "{} {}/{} ({} ov)",
            self.batting_team,
            self.total_runs,
            self.wickets,
            self.overs_display()
        )
    }

    // ------------------------------------------------------------------
    // Undo support
    // ------------------------------------------------------------------

    pub(crate) fn capture_snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            innings: self.innings,
            phase: self.phase,
            over_index: self.over_index,
            legal_balls_in_over: self.legal_balls_in_over,
            striker: self.striker.clone(),
            non_striker: self.non_striker.clone(),
            bowler: self.bowler.clone(),
            last_over_bowler: self.last_over_bowler,
            remaining_batters: self.remaining_batters.clone(),
            pending_free_hit: self.pending_free_hit,
            total_runs: self.total_runs,
            wickets: self.wickets,
            target_score: self.target_score,
            innings_history_len: self.innings_history.len(),
            result: self.result.clone(),
        }
    }

    pub(crate) fn restore_snapshot(&mut self, snap: ScoreSnapshot) {
        self.innings = snap.innings;
        self.phase = snap.phase;
        self.over_index = snap.over_index;
        self.legal_balls_in_over = snap.legal_balls_in_over;
        self.striker = snap.striker;
        self.non_striker = snap.non_striker;
        self.bowler = snap.bowler;
        self.last_over_bowler = snap.last_over_bowler;
        self.remaining_batters = snap.remaining_batters;
        self.pending_free_hit = snap.pending_free_hit;
        self.total_runs = snap.total_runs;
        self.wickets = snap.wickets;
        self.target_score = snap.target_score;
        self.innings_history.truncate(snap.innings_history_len);
        self.result = snap.result;
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
}
