//! services/api/src/web/chat_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! handling a single chat turn.

use crate::web::{
    protocol::ServerMessage,
    state::{AppState, ChatSessionState},
};
use axum::extract::ws::{Message, WebSocket};
use eduzen_core::domain::{ChatMessage, SentimentScore};
use eduzen_core::ports::{PortError, PortResult};
use futures::{stream::SplitSink, SinkExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// The reply shown when generation fails. The turn stays visible in the
/// transcript with its error flag set rather than being dropped.
const FALLBACK_REPLY: &str =
    "I'm having trouble responding right now. Could you please try again?";

/// The main asynchronous task for handling one user chat message: score its
/// sentiment, generate the assistant's reply, and append both sides of the
/// exchange to the connection's transcript.
pub async fn chat_turn(
    app_state: Arc<AppState>,
    session_state_lock: Arc<Mutex<ChatSessionState>>,
    ws_sender: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    user_text: String,
) -> PortResult<()> {
    info!("Chat turn started.");

    // Snapshot the history before this turn is appended, so the adapter can
    // replay prior turns without duplicating the latest message.
    let history = {
        let mut session = session_state_lock.lock().await;
        let history = session.transcript.clone();
        session
            .transcript
            .push(ChatMessage::from_user(user_text.clone()));
        history
    };

    // Sentiment is advisory only: any failure degrades to a neutral score
    // instead of blocking the turn.
    let sentiment = match app_state.sentiment.score(&user_text).await {
        Ok(score) => score,
        Err(e) => {
            warn!("Sentiment scoring degraded to neutral: {}", e);
            SentimentScore::neutral()
        }
    };

    let assistant_message = match app_state.chat.reply(&user_text, &history).await {
        Ok(reply_text) => ChatMessage::from_assistant(reply_text),
        Err(e) => {
            error!("Chat generation failed: {}", e);
            ChatMessage::assistant_error(FALLBACK_REPLY)
        }
    };

    {
        let mut session = session_state_lock.lock().await;
        session.transcript.push(assistant_message.clone());
    }

    let reply_msg = ServerMessage::AssistantMessage {
        id: assistant_message.id,
        text: assistant_message.text,
        timestamp: assistant_message.timestamp,
        is_error: assistant_message.is_error,
    };
    let reply_json = serde_json::to_string(&reply_msg).unwrap();
    if ws_sender
        .lock()
        .await
        .send(Message::Text(reply_json.into()))
        .await
        .is_err()
    {
        return Err(PortError::Unexpected(
            "Failed to send assistant message.".to_string(),
        ));
    }

    if sentiment.is_stressed() {
        info!(
            "Stressed message detected (score {}, magnitude {}). Suggesting a breathing exercise.",
            sentiment.score, sentiment.magnitude
        );
        let suggest_msg = ServerMessage::BreathingSuggested {
            score: sentiment.score,
            magnitude: sentiment.magnitude,
        };
        let suggest_json = serde_json::to_string(&suggest_msg).unwrap();
        if ws_sender
            .lock()
            .await
            .send(Message::Text(suggest_json.into()))
            .await
            .is_err()
        {
            warn!("Failed to send breathing suggestion. Client may have disconnected.");
        }
    }

    Ok(())
}
