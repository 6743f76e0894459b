//! String-in, string-out JSON facade over the scoring engine.
//!
//! Every entry point here is stateless: the caller sends the full
//! [`MatchState`] document in and gets the updated document back, so the
//! surrounding application can park the state wherever it likes between
//! calls. Rosters arrive as bare names; player ids are derived from roster
//! slots, so the same request always resolves to the same ids.
//!
//! Undo is deliberately absent from this surface. Undo snapshots live only
//! in process memory, so a state document that has made a round trip
//! through JSON has nothing to undo into; live sessions undo through
//! [`ScoringSession`](crate::engine::ScoringSession) instead.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::data::standard_conditions;
use crate::engine::delivery::apply_delivery;
use crate::engine::flow::{check_transition, start_second_innings, FlowTransition};
use crate::engine::scorecard::{build_scorecard, live_scorecard};
use crate::engine::selection::{select_next_batter, select_next_bowler};
use crate::engine::sim::simulate_match;
use crate::error::{Result, ScoreError};
use crate::models::{
    BallEvent, DeliveryRequest, InningsSummary, MatchOutcome, MatchState, Player, PlayerId,
    Scorecard, Team,
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NewMatchRequest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u8,
    /// Bats first.
    pub team_one: TeamData,
    pub team_two: TeamData,
    pub overs_limit: u8,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TeamData {
    pub name: String,
    /// Exactly eleven, in batting order.
    pub players: Vec<PlayerData>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlayerData {
    pub name: String,
    #[serde(default)]
    pub wicketkeeper: bool,
}

/// One ball, plus whatever selections the state is currently waiting on.
///
/// Names refer to the rosters already inside the state document. Selections
/// resolve in order before the ball is scored, so "openers in, opening
/// bowler on, first ball" is a single call.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ScoreDeliveryRequest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u8,
    /// Resolve pending batter selections by name, striker end first.
    #[serde(default)]
    pub next_batters: Vec<String>,
    /// Resolve a pending bowler selection by name before scoring.
    #[serde(default)]
    pub next_bowler: Option<String>,
    pub delivery: DeliveryRequest,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ScoreDeliveryResponse {
    pub schema_version: u8,
    /// The event as recorded, penalties and free-hit flags included.
    pub event: BallEvent,
    /// Lifecycle step this ball triggered, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<FlowTransition>,
    /// Updated state document; feed it to the next call.
    pub state: MatchState,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SimulateMatchRequest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u8,
    pub seed: u64,
    pub team_one: TeamData,
    pub team_two: TeamData,
    pub overs_limit: u8,
}

/// Completed-match digest. Carries no ids or timestamps beyond the roster
/// slots, so the same request is answered byte for byte.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SimulateMatchResponse {
    pub schema_version: u8,
    pub seed: u64,
    pub result: MatchOutcome,
    pub innings: Vec<InningsSummary>,
    pub scorecards: Vec<Scorecard>,
    /// Deliveries bowled across both innings, illegal ones included.
    pub deliveries: u32,
}

fn default_schema_version() -> u8 {
    crate::SCHEMA_VERSION
}

fn ensure_schema_version(version: u8) -> Result<()> {
    if version != crate::SCHEMA_VERSION {
        return Err(ScoreError::Validation(format!(
            "unsupported schema version {version} (expected {})",
            crate::SCHEMA_VERSION
        )));
    }
    Ok(())
}

/// Build a [`Team`] from bare names, with slot-derived ids. Roster size and
/// keeper checks happen in [`MatchState::new`].
fn convert_team(side: u8, data: TeamData) -> Team {
    let players = data
        .players
        .into_iter()
        .enumerate()
        .map(|(slot, p)| {
            let mut player =
                Player::new(p.name).with_id(PlayerId::from_roster_slot(side, slot as u8));
            player.is_wicketkeeper = p.wicketkeeper;
            player
        })
        .collect();
    Team::new(data.name, players)
}

fn resolve_name(team: &Team, name: &str) -> Result<PlayerId> {
    team.players
        .iter()
        .find(|p| p.name == name)
        .map(|p| p.id)
        .ok_or_else(|| {
            ScoreError::Validation(format!("no player named {:?} in {}", name, team.name))
        })
}

/// Open a match from bare-name rosters. Returns the initial state document,
/// waiting on opener and opening-bowler selections.
pub fn new_match_json(request_json: &str) -> Result<String> {
    let request: NewMatchRequest = serde_json::from_str(request_json)?;
    ensure_schema_version(request.schema_version)?;

    let team_one = convert_team(0, request.team_one);
    let team_two = convert_team(1, request.team_two);
    let state = MatchState::new(team_one, team_two, request.overs_limit)?;

    Ok(serde_json::to_string(&state)?)
}

/// Score one ball against a state document.
///
/// A rejected call returns an error and no state; the input document is
/// untouched, so the caller fixes the request and sends the same document
/// again.
pub fn score_delivery_json(state_json: &str, request_json: &str) -> Result<String> {
    let mut state: MatchState = serde_json::from_str(state_json)?;
    let request: ScoreDeliveryRequest = serde_json::from_str(request_json)?;
    ensure_schema_version(request.schema_version)?;

    let conditions = standard_conditions();
    for name in &request.next_batters {
        let id = resolve_name(state.batting_side(), name)?;
        select_next_batter(&mut state, id)?;
    }
    if let Some(name) = request.next_bowler.as_deref() {
        let id = resolve_name(state.bowling_side(), name)?;
        select_next_bowler(&mut state, conditions, id)?;
    }

    let event = apply_delivery(&mut state, conditions, &request.delivery)?;
    let transition = check_transition(&mut state);

    let response = ScoreDeliveryResponse {
        schema_version: crate::SCHEMA_VERSION,
        event,
        transition,
        state,
    };
    Ok(serde_json::to_string(&response)?)
}

/// Cross the innings break. Returns the updated state document with the
/// chase ready to score.
pub fn start_second_innings_json(state_json: &str) -> Result<String> {
    let mut state: MatchState = serde_json::from_str(state_json)?;
    start_second_innings(&mut state)?;
    Ok(serde_json::to_string(&state)?)
}

/// Scorecard for the innings in progress (or the last one played).
pub fn scorecard_json(state_json: &str) -> Result<String> {
    let state: MatchState = serde_json::from_str(state_json)?;
    let card = live_scorecard(&state)?;
    Ok(serde_json::to_string(&card)?)
}

/// Simulate a whole match from bare-name rosters and a seed.
///
/// The response is a derived digest, not a state dump. Same request, same
/// bytes back.
pub fn simulate_match_json(request_json: &str) -> Result<String> {
    let request: SimulateMatchRequest = serde_json::from_str(request_json)?;
    ensure_schema_version(request.schema_version)?;

    let team_one = convert_team(0, request.team_one);
    let team_two = convert_team(1, request.team_two);
    let mut state = MatchState::new(team_one, team_two, request.overs_limit)?;

    let conditions = standard_conditions();
    let report = simulate_match(&mut state, conditions, request.seed, None, &mut |_, _| {})?;

    let result = state.result.clone().ok_or_else(|| {
        ScoreError::StateConflict("simulation ended without a result".to_string())
    })?;
    let scorecards = (1..=state.innings)
        .map(|i| build_scorecard(&state, i))
        .collect::<Result<Vec<_>>>()?;

    let response = SimulateMatchResponse {
        schema_version: crate::SCHEMA_VERSION,
        seed: request.seed,
        result,
        innings: state.innings_history.clone(),
        scorecards,
        deliveries: report.deliveries,
    };
    Ok(serde_json::to_string(&response)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roster(prefix: &str) -> serde_json::Value {
        let players: Vec<serde_json::Value> = (1..=11)
            .map(|n| json!({"name": format!("{prefix} {n}"), "wicketkeeper": n == 2}))
            .collect();
        json!(players)
    }

    fn new_match_request() -> String {
        json!({
            "schema_version": 1,
            "team_one": {"name": "Harbour CC", "players": roster("Harbour")},
            "team_two": {"name": "Valley XI", "players": roster("Valley")},
            "overs_limit": 20
        })
        .to_string()
    }

    #[test]
    fn new_match_produces_a_state_document() {
        let state_json = new_match_json(&new_match_request()).unwrap();
        let state: MatchState = serde_json::from_str(&state_json).unwrap();
        assert_eq!(state.overs_limit, 20);
        assert_eq!(state.phase, crate::models::MatchPhase::InningsOneLive);
        assert_eq!(state.team_one.players[0].id, PlayerId::from_roster_slot(0, 0));
        assert!(state.team_one.players[1].is_wicketkeeper);
    }

    #[test]
    fn schema_version_is_checked() {
        let request = json!({
            "schema_version": 9,
            "team_one": {"name": "A", "players": roster("A")},
            "team_two": {"name": "B", "players": roster("B")},
            "overs_limit": 20
        });
        let err = new_match_json(&request.to_string()).unwrap_err();
        assert!(matches!(err, ScoreError::Validation(_)), "got {err}");
    }

    #[test]
    fn malformed_request_is_a_deserialization_error() {
        let err = new_match_json("{not json").unwrap_err();
        assert!(matches!(err, ScoreError::Deserialization(_)), "got {err}");
    }

    #[test]
    fn a_full_over_scored_through_the_stateless_surface() {
        let mut state_json = new_match_json(&new_match_request()).unwrap();

        // Openers, opening bowler and the first ball in one request.
        let first = json!({
            "next_batters": ["Harbour 1", "Harbour 2"],
            "next_bowler": "Valley 4",
            "delivery": {"runs": 1}
        });
        let response = score_delivery_json(&state_json, &first.to_string()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(v["event"]["runs"], 1);
        assert_eq!(v["state"]["total_runs"], 1);
        // An odd single swaps ends; Harbour 2 faces the next ball.
        assert_eq!(v["state"]["striker"]["id"], json!(PlayerId::from_roster_slot(0, 1)));
        state_json = v["state"].to_string();

        // Five more legal balls close the over.
        for _ in 0..5 {
            let request = json!({"delivery": {"runs": 0}});
            let response = score_delivery_json(&state_json, &request.to_string()).unwrap();
            let v: serde_json::Value = serde_json::from_str(&response).unwrap();
            state_json = v["state"].to_string();
        }
        let state: MatchState = serde_json::from_str(&state_json).unwrap();
        assert_eq!(state.over_index, 1);
        assert_eq!(state.legal_balls_in_over, 0);
        assert!(state.bowler.is_none(), "over end clears the bowler slot");

        // Next ball without naming a bowler is refused.
        let request = json!({"delivery": {"runs": 4}});
        let err = score_delivery_json(&state_json, &request.to_string()).unwrap_err();
        assert!(matches!(err, ScoreError::SelectionRequired { .. }), "got {err}");

        // Naming one inline works.
        let request = json!({"next_bowler": "Valley 5", "delivery": {"runs": 4}});
        let response = score_delivery_json(&state_json, &request.to_string()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(v["state"]["total_runs"], 5);
    }

    #[test]
    fn missing_selection_is_reported_not_defaulted() {
        let state_json = new_match_json(&new_match_request()).unwrap();
        let request = json!({
            "next_batters": ["Harbour 1"],
            "delivery": {"runs": 0}
        });
        let err = score_delivery_json(&state_json, &request.to_string()).unwrap_err();
        assert!(matches!(err, ScoreError::SelectionRequired { .. }), "got {err}");
    }

    #[test]
    fn unknown_names_are_validation_errors() {
        let state_json = new_match_json(&new_match_request()).unwrap();
        let request = json!({
            "next_batters": ["Nobody Atall"],
            "delivery": {"runs": 0}
        });
        let err = score_delivery_json(&state_json, &request.to_string()).unwrap_err();
        assert!(matches!(err, ScoreError::Validation(_)), "got {err}");
    }

    #[test]
    fn second_innings_crosses_through_the_facade() {
        // A one-over match reaches the break quickly.
        let request = json!({
            "team_one": {"name": "Harbour CC", "players": roster("Harbour")},
            "team_two": {"name": "Valley XI", "players": roster("Valley")},
            "overs_limit": 1
        });
        let mut state_json = new_match_json(&request.to_string()).unwrap();

        let first = json!({
            "next_batters": ["Harbour 1", "Harbour 2"],
            "next_bowler": "Valley 4",
            "delivery": {"runs": 1}
        });
        let v: serde_json::Value =
            serde_json::from_str(&score_delivery_json(&state_json, &first.to_string()).unwrap())
                .unwrap();
        state_json = v["state"].to_string();
        for n in 0..5 {
            let request = json!({"delivery": {"runs": 0}});
            let response = score_delivery_json(&state_json, &request.to_string()).unwrap();
            let v: serde_json::Value = serde_json::from_str(&response).unwrap();
            if n == 4 {
                assert_eq!(v["transition"]["kind"], "innings_closed");
                assert_eq!(v["transition"]["reason"], "overs_completed");
            }
            state_json = v["state"].to_string();
        }

        let state: MatchState = serde_json::from_str(&state_json).unwrap();
        assert_eq!(state.phase, crate::models::MatchPhase::InningsBreak);
        assert_eq!(state.target_score, Some(2));

        state_json = start_second_innings_json(&state_json).unwrap();
        let state: MatchState = serde_json::from_str(&state_json).unwrap();
        assert_eq!(state.phase, crate::models::MatchPhase::InningsTwoLive);
        assert_eq!(state.batting_team, "Valley XI");

        // The chase: two from the first ball wins it.
        let chase = json!({
            "next_batters": ["Valley 1", "Valley 2"],
            "next_bowler": "Harbour 4",
            "delivery": {"runs": 2}
        });
        let v: serde_json::Value =
            serde_json::from_str(&score_delivery_json(&state_json, &chase.to_string()).unwrap())
                .unwrap();
        assert_eq!(v["transition"]["kind"], "match_completed");
        assert_eq!(
            v["transition"]["outcome"]["text"],
            "Valley XI won by 10 wickets"
        );
        assert_eq!(v["state"]["phase"], "match_complete");
    }

    #[test]
    fn scorecard_json_renders_the_live_innings() {
        let state_json = new_match_json(&new_match_request()).unwrap();
        let card_json = scorecard_json(&state_json).unwrap();
        let card: Scorecard = serde_json::from_str(&card_json).unwrap();
        assert_eq!(card.innings, 1);
        assert_eq!(card.batting_team, "Harbour CC");
        assert_eq!(card.yet_to_bat.len(), 11);
    }

    #[test]
    fn simulate_match_json_runs_to_a_result() {
        let request = json!({
            "schema_version": 1,
            "seed": 42,
            "team_one": {"name": "Harbour CC", "players": roster("Harbour")},
            "team_two": {"name": "Valley XI", "players": roster("Valley")},
            "overs_limit": 8
        })
        .to_string();

        let response_json = simulate_match_json(&request).unwrap();
        let response: serde_json::Value = serde_json::from_str(&response_json).unwrap();
        assert_eq!(response["schema_version"], 1);
        assert_eq!(response["seed"], 42);
        assert_eq!(response["innings"].as_array().unwrap().len(), 2);
        assert_eq!(response["scorecards"].as_array().unwrap().len(), 2);
        assert!(response["result"]["text"].as_str().unwrap().len() > 4);
        // Any completed match needs at least ten dismissals plus one ball.
        assert!(response["deliveries"].as_u64().unwrap() >= 11);
    }

    #[test]
    fn simulate_match_json_same_seed_same_bytes() {
        let request = json!({
            "schema_version": 1,
            "seed": 1234,
            "team_one": {"name": "Harbour CC", "players": roster("Harbour")},
            "team_two": {"name": "Valley XI", "players": roster("Valley")},
            "overs_limit": 5
        })
        .to_string();

        let a = simulate_match_json(&request).unwrap();
        let b = simulate_match_json(&request).unwrap();
        assert_eq!(a, b, "same request must produce identical bytes");
    }

    #[test]
    fn wrong_sized_roster_is_rejected() {
        let request = json!({
            "team_one": {"name": "A", "players": [{"name": "Only One"}]},
            "team_two": {"name": "B", "players": roster("B")},
            "overs_limit": 20
        });
        let err = new_match_json(&request.to_string()).unwrap_err();
        assert!(matches!(err, ScoreError::Validation(_)), "got {err}");
    }

    #[test]
    fn responses_validate_against_their_published_schemas() {
        let compile = |schema: schemars::schema::RootSchema| {
            let value = serde_json::to_value(&schema).unwrap();
            jsonschema::JSONSchema::compile(&value).expect("schema compiles")
        };

        // One scored ball.
        let state_json = new_match_json(&new_match_request()).unwrap();
        let request = json!({
            "next_batters": ["Harbour 1", "Harbour 2"],
            "next_bowler": "Valley 4",
            "delivery": {"runs": 4}
        });
        let response = score_delivery_json(&state_json, &request.to_string()).unwrap();
        let instance: serde_json::Value = serde_json::from_str(&response).unwrap();
        let schema = compile(schemars::schema_for!(ScoreDeliveryResponse));
        assert!(
            schema.is_valid(&instance),
            "score_delivery response drifted from its schema"
        );

        // One simulated match.
        let request = json!({
            "seed": 7,
            "team_one": {"name": "Harbour CC", "players": roster("Harbour")},
            "team_two": {"name": "Valley XI", "players": roster("Valley")},
            "overs_limit": 4
        })
        .to_string();
        let response = simulate_match_json(&request).unwrap();
        let instance: serde_json::Value = serde_json::from_str(&response).unwrap();
        let schema = compile(schemars::schema_for!(SimulateMatchResponse));
        assert!(
            schema.is_valid(&instance),
            "simulate_match response drifted from its schema"
        );
    }
}
