use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::player::PlayerId;

/// Display-ready view of one innings, rebuilt from the ball log on demand.
/// Never stored; building it twice from the same state yields identical
/// output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scorecard {
    pub innings: u8,
    pub batting_team: String,
    pub bowling_team: String,
    pub summary: ScoreSummary,
    pub batting: Vec<BattingLine>,
    pub bowling: Vec<BowlingLine>,
    pub fall_of_wickets: Vec<FallOfWicket>,
    pub extras: ExtrasBreakdown,
    pub yet_to_bat: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoreSummary {
    pub total: u16,
    pub wickets: u8,
    pub overs: String,
    /// Runs per over so far; 0 before the first legal ball.
    pub run_rate: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chase: Option<ChaseSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partnership: Option<PartnershipSummary>,
}

/// Chase context, present only during the second innings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChaseSummary {
    pub target: u16,
    pub runs_needed: u16,
    pub balls_remaining: u16,
    pub required_rate: f32,
}

/// The unbroken stand at the crease: runs and legal balls since the last
/// wicket (or the start of the innings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PartnershipSummary {
    pub runs: u16,
    pub balls: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BattingLine {
    pub id: PlayerId,
    pub name: String,
    pub runs: u16,
    pub balls: u16,
    pub fours: u8,
    pub sixes: u8,
    /// Runs per hundred balls; 0 before the first ball faced.
    pub strike_rate: f32,
    /// Scorebook dismissal line, e.g. "c †Taylor b Nair". `None` while not
    /// out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismissal: Option<String>,
    pub at_crease: bool,
    pub on_strike: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BowlingLine {
    pub id: PlayerId,
    pub name: String,
    pub overs: String,
    pub maidens: u8,
    /// Runs conceded: everything except byes and leg byes.
    pub runs: u16,
    pub wickets: u8,
    /// Runs conceded per over; 0 before the first legal ball.
    pub economy: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FallOfWicket {
    /// 1-based wicket number.
    pub wicket: u8,
    /// Team score once that delivery's runs were counted.
    pub score: u16,
    pub batter: String,
    /// Over notation at the fall, e.g. "14.3".
    pub over: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtrasBreakdown {
    pub total: u16,
    pub wides: u16,
    pub no_balls: u16,
    pub byes: u16,
    pub leg_byes: u16,
}
