pub mod events;
pub mod match_state;
pub mod player;
pub mod scorecard;
pub mod team;

pub use events::{
    BallEvent, DeliveryRequest, ExtraDetails, ExtraRequest, ExtraType, RunSource, WicketDetails,
    WicketRequest, WicketType,
};
pub use match_state::{
    BatterAtCrease, BowlerAtMark, CreaseRole, InningsSummary, MatchOutcome, MatchPhase,
    MatchState, ResultMargin, SelectionNeed, BALLS_PER_OVER, WICKETS_PER_INNINGS,
};
pub use player::{Player, PlayerId};
pub use scorecard::{
    BattingLine, BowlingLine, ChaseSummary, ExtrasBreakdown, FallOfWicket, PartnershipSummary,
    Scorecard, ScoreSummary,
};
pub use team::{Team, PLAYERS_PER_SIDE};
