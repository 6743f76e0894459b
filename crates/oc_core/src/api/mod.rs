pub mod json;

pub use json::{
    new_match_json, score_delivery_json, scorecard_json, simulate_match_json,
    start_second_innings_json, NewMatchRequest, PlayerData, ScoreDeliveryRequest,
    ScoreDeliveryResponse, SimulateMatchRequest, SimulateMatchResponse, TeamData,
};
