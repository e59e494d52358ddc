//! Match statistics DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::store::models::NewMatchStats;

/// Request body for `POST /metrics/match`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchStatsRequest {
    /// Unique match ID; repeated reports replace the previous one.
    pub match_id: String,
    /// Match mode (`solo` or `group`).
    pub mode: String,
    /// Vote rule (`majority`, `unanimous`, `first_to_x`).
    pub vote_rule: String,
    /// Number of participants.
    pub participants: i32,
    /// Restaurant cards presented.
    pub cards_presented: i32,
    /// Cards liked.
    pub cards_liked: i32,
    /// Seconds from start to decision, for completed matches.
    #[serde(default)]
    pub time_to_decision_seconds: Option<i32>,
    /// Provider location ID of the winning restaurant.
    #[serde(default)]
    pub result_restaurant_id: Option<String>,
    /// Whether the match reached a decision.
    pub completed: bool,
}

impl CreateMatchStatsRequest {
    /// Converts into an upsert payload.
    #[must_use]
    pub fn into_new_stats(self) -> NewMatchStats {
        NewMatchStats {
            match_id: self.match_id,
            mode: self.mode,
            vote_rule: self.vote_rule,
            participants: self.participants,
            cards_presented: self.cards_presented,
            cards_liked: self.cards_liked,
            time_to_decision_seconds: self.time_to_decision_seconds,
            result_restaurant_id: self.result_restaurant_id,
            completed: self.completed,
        }
    }
}

/// Response body for `POST /metrics/match` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchStatsRecordedResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// Match ID the stats were recorded under.
    pub match_id: String,
}
