//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the
//! API server for the well-being chat view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A chat message typed by the user.
    UserMessage { text: String },

    /// Starts the timed breathing exercise.
    StartBreathing,

    /// Cancels a breathing exercise that is underway.
    StopBreathing,

    /// Schedules a break on the user's calendar. The access token is the
    /// user's own OAuth token, passed through per call rather than held as
    /// server state.
    ScheduleBreak {
        summary: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        access_token: String,
    },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// One half of a breath cycle.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub enum BreathPhase {
    Inhale,
    Exhale,
}

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The assistant's reply to one user message. `is_error` marks a turn
    /// whose generation failed; it stays visible instead of being dropped.
    AssistantMessage {
        id: Uuid,
        text: String,
        timestamp: DateTime<Utc>,
        is_error: bool,
    },

    /// Sent when the latest user message scored as stressed, so the client
    /// can offer the breathing exercise.
    BreathingSuggested { score: f32, magnitude: f32 },

    /// One phase tick of the running breathing exercise.
    BreathingPhase {
        phase: BreathPhase,
        breath: usize,
        total: usize,
    },

    /// The breathing exercise ran to completion.
    BreathingEnded,

    /// A break was scheduled on the user's calendar.
    BreakScheduled { event_id: String },

    /// Reports a fatal error to the client, which should display an error message.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_user_message() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"user_message","text":"hello"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::UserMessage { text } if text == "hello"));
    }

    #[test]
    fn breathing_phase_serializes_with_snake_case_tags() {
        let msg = ServerMessage::BreathingPhase {
            phase: BreathPhase::Inhale,
            breath: 1,
            total: 5,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"breathing_phase""#));
        assert!(json.contains(r#""phase":"inhale""#));
    }
}
