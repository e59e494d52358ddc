//! Event ingestion DTOs.

use serde::Deserialize;
use serde_json::{Value, json};
use utoipa::ToSchema;

use crate::store::models::NewEvent;

/// One analytics event as produced by a client or server.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    /// Event type (e.g. `match_created`, `card_shown`).
    pub event_type: String,
    /// Client-generated session ID.
    pub session_id: String,
    /// User ID override; defaults to the authenticated caller.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Schemaless event payload.
    #[serde(default)]
    pub properties: Option<Value>,
    /// Idempotency key; retried submissions with the same key are
    /// ingested once.
    #[serde(default)]
    pub idempotency_key: Option<String>,
    /// Producer of the event (`native-app`, `web`, `server`).
    #[serde(default)]
    pub source: Option<String>,
}

impl EventDto {
    /// Converts into an insert payload. The payload's own user wins over
    /// the authenticated caller.
    #[must_use]
    pub fn into_new_event(self, caller: Option<&str>) -> NewEvent {
        NewEvent {
            user_id: self.user_id.or_else(|| caller.map(ToString::to_string)),
            session_id: self.session_id,
            event_type: self.event_type,
            properties: self.properties.unwrap_or_else(|| json!({})),
            source: self.source.unwrap_or_else(|| "native-app".to_string()),
            idempotency_key: self.idempotency_key,
        }
    }
}

/// Request body for `POST /metrics/events`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEventsRequest {
    /// Events to ingest.
    pub events: Vec<EventDto>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn payload_user_wins_over_caller() {
        let dto: EventDto = serde_json::from_value(json!({
            "eventType": "card_shown",
            "sessionId": "s-1",
            "userId": "payload-user",
        }))
        .unwrap();

        let event = dto.into_new_event(Some("caller-user"));
        assert_eq!(event.user_id.as_deref(), Some("payload-user"));
    }

    #[test]
    fn caller_fills_missing_user_and_defaults_apply() {
        let dto: EventDto = serde_json::from_value(json!({
            "eventType": "match_created",
            "sessionId": "s-2",
        }))
        .unwrap();

        let event = dto.into_new_event(Some("caller-user"));
        assert_eq!(event.user_id.as_deref(), Some("caller-user"));
        assert_eq!(event.source, "native-app");
        assert_eq!(event.properties, json!({}));
        assert!(event.idempotency_key.is_none());
    }
}
