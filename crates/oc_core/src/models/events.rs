use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::player::PlayerId;

/// How a batter was dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(test, derive(strum_macros::EnumIter))]
#[serde(rename_all = "snake_case")]
pub enum WicketType {
    Bowled,
    Caught,
    CaughtAndBowled,
    Lbw,
    RunOut,
    Stumped,
    HitWicket,
}

impl WicketType {
    /// Caught, run out and stumped name a fielder in the scorebook; the
    /// other kinds never do.
    pub fn requires_fielder(&self) -> bool {
        matches!(
            self,
            WicketType::Caught | WicketType::RunOut | WicketType::Stumped
        )
    }

    /// Whether the dismissal counts towards the bowler's wicket tally.
    pub fn credits_bowler(&self) -> bool {
        !matches!(self, WicketType::RunOut)
    }

    /// On a free hit only a run out can stand.
    pub fn allowed_on_free_hit(&self) -> bool {
        matches!(self, WicketType::RunOut)
    }

    /// Which dismissals are legal for a given delivery kind. A wide still
    /// permits the keeper-side dismissals; a no-ball permits only run out;
    /// byes and leg byes imply a completed run, so only run out fits.
    pub fn allowed_with_extra(&self, extra: Option<ExtraType>) -> bool {
        match extra {
            None => true,
            Some(ExtraType::Wide) => matches!(
                self,
                WicketType::RunOut | WicketType::Stumped | WicketType::HitWicket
            ),
            Some(ExtraType::NoBall) => matches!(self, WicketType::RunOut),
            Some(ExtraType::Bye) | Some(ExtraType::LegBye) => {
                matches!(self, WicketType::RunOut)
            }
        }
    }
}

/// The four extra kinds. Wides and no-balls are illegal deliveries and do
/// not count towards the over; byes and leg byes are legal deliveries whose
/// runs are simply not credited to the striker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(test, derive(strum_macros::EnumIter))]
#[serde(rename_all = "snake_case")]
pub enum ExtraType {
    Wide,
    NoBall,
    Bye,
    LegBye,
}

impl ExtraType {
    pub fn is_legal_delivery(&self) -> bool {
        matches!(self, ExtraType::Bye | ExtraType::LegBye)
    }

    /// Wides and no-balls carry a one-run penalty on top of anything run.
    pub fn penalty_runs(&self) -> u8 {
        match self {
            ExtraType::Wide | ExtraType::NoBall => 1,
            ExtraType::Bye | ExtraType::LegBye => 0,
        }
    }
}

/// Where the additional runs on a no-ball came from. Decides whether they
/// are credited to the striker or recorded as extras, and which parity rule
/// rotates the strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunSource {
    Bat,
    Bye,
    LegBye,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WicketDetails {
    pub kind: WicketType,
    /// The dismissed batter. Always the striker in this engine.
    pub batter: PlayerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fielder: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtraDetails {
    pub kind: ExtraType,
    /// Populated for no-balls with additional runs; `None` elsewhere since
    /// the kind already fixes the attribution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_source: Option<RunSource>,
}

/// One delivery as recorded in the match log. Events are append-only; the
/// only permitted removal is popping the newest one via undo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BallEvent {
    /// Monotonic sequence number across the whole match.
    pub seq: u64,
    pub innings: u8,
    /// 0-based index of the over this delivery belongs to.
    pub over: u8,
    /// Legal-ball slot within the over (1..=6). Illegal deliveries carry the
    /// slot of the legal ball they precede, capped at 6.
    pub ball_in_over: u8,
    pub striker: PlayerId,
    pub non_striker: PlayerId,
    pub bowler: PlayerId,
    /// Total credited to the batting side, penalties included.
    pub runs: u8,
    pub batter_runs: u8,
    pub extra_runs: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<ExtraDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wicket: Option<WicketDetails>,
    /// Whether this delivery counts towards the over.
    pub legal_delivery: bool,
    pub was_free_hit: bool,
    pub awarded_free_hit: bool,
    pub timestamp: DateTime<Utc>,
}

impl BallEvent {
    pub fn is_wicket(&self) -> bool {
        self.wicket.is_some()
    }

    pub fn extra_kind(&self) -> Option<ExtraType> {
        self.extra.as_ref().map(|e| e.kind)
    }

    /// Only legal deliveries count as balls faced; wides and no-balls do
    /// not add to the striker's ball count.
    pub fn counts_as_ball_faced(&self) -> bool {
        self.legal_delivery
    }

    /// Runs charged against the bowler's analysis: everything except byes
    /// and leg byes off a legal delivery. All no-ball runs are the bowler's.
    pub fn bowler_conceded(&self) -> u8 {
        match self.extra_kind() {
            Some(ExtraType::Bye) | Some(ExtraType::LegBye) => 0,
            _ => self.runs,
        }
    }

    /// Runs the batters physically ran (boundaries counting as run), the
    /// parity of which decides strike rotation. Penalty runs are awarded,
    /// not run, so they are excluded.
    pub fn rotation_runs(&self) -> u8 {
        match self.extra_kind() {
            None => self.batter_runs,
            Some(ExtraType::Bye) | Some(ExtraType::LegBye) => self.runs,
            Some(ExtraType::Wide) => self.runs.saturating_sub(1),
            Some(ExtraType::NoBall) => match self.extra.as_ref().and_then(|e| e.run_source) {
                Some(RunSource::Bat) | None => self.batter_runs,
                Some(RunSource::Bye) | Some(RunSource::LegBye) => self.runs.saturating_sub(1),
            },
        }
    }
}

/// Caller-side description of one delivery, handed to the scoring engine.
///
/// `runs` is what the batters ran or hit, excluding the automatic one-run
/// penalty for a wide or no-ball; the engine adds the penalty itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeliveryRequest {
    #[serde(default)]
    pub runs: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<ExtraRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wicket: Option<WicketRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtraRequest {
    pub kind: ExtraType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_source: Option<RunSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WicketRequest {
    pub kind: WicketType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fielder: Option<PlayerId>,
}

impl DeliveryRequest {
    /// A dot ball.
    pub fn dot() -> Self {
        Self::default()
    }

    /// A legal delivery with runs off the bat.
    pub fn runs(runs: u8) -> Self {
        DeliveryRequest {
            runs,
            ..Self::default()
        }
    }

    /// A wide, with `ran` completed runs on top of the penalty.
    pub fn wide(ran: u8) -> Self {
        DeliveryRequest {
            runs: ran,
            extra: Some(ExtraRequest {
                kind: ExtraType::Wide,
                run_source: None,
            }),
            ..Self::default()
        }
    }

    /// A no-ball, with `ran` additional runs from the given source.
    pub fn no_ball(ran: u8, source: RunSource) -> Self {
        DeliveryRequest {
            runs: ran,
            extra: Some(ExtraRequest {
                kind: ExtraType::NoBall,
                run_source: Some(source),
            }),
            ..Self::default()
        }
    }

    pub fn bye(ran: u8) -> Self {
        DeliveryRequest {
            runs: ran,
            extra: Some(ExtraRequest {
                kind: ExtraType::Bye,
                run_source: None,
            }),
            ..Self::default()
        }
    }

    pub fn leg_bye(ran: u8) -> Self {
        DeliveryRequest {
            runs: ran,
            extra: Some(ExtraRequest {
                kind: ExtraType::LegBye,
                run_source: None,
            }),
            ..Self::default()
        }
    }

    /// A dismissal without a fielder (bowled, lbw, hit wicket, c&b).
    pub fn wicket(kind: WicketType) -> Self {
        DeliveryRequest {
            wicket: Some(WicketRequest {
                kind,
                fielder: None,
            }),
            ..Self::default()
        }
    }

    pub fn with_wicket(mut self, kind: WicketType, fielder: Option<PlayerId>) -> Self {
        self.wicket = Some(WicketRequest { kind, fielder });
        self
    }

    pub fn with_fielder(mut self, fielder: PlayerId) -> Self {
        if let Some(w) = self.wicket.as_mut() {
            w.fielder = Some(fielder);
        }
        self
    }
}
