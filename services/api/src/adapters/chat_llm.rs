//! services/api/src/adapters/chat_llm.rs
//!
//! This module contains the adapter for the well-being conversation LLM.
//! It implements the `ConversationService` port from the `core` crate.

const SYSTEM_INSTRUCTIONS: &str = "You are a helpful well-being assistant. Respond in plain text \
format without using markdown symbols like asterisks (**) for emphasis. Use simple paragraphs \
with line breaks for structure. Keep your responses concise, friendly, and easy to read.";

use crate::adapters::gemini::{GeminiClient, GeminiTurn};
use crate::config::ChatHistoryMode;
use async_trait::async_trait;
use eduzen_core::domain::{ChatMessage, Sender};
use eduzen_core::ports::{ConversationService, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ConversationService` using the Gemini endpoint.
///
/// The endpoint keeps no server-side session state. In `Stateless` mode only
/// the latest message is sent and the assistant has no memory of prior turns;
/// in `FullHistory` mode the accumulated transcript is replayed on every call.
#[derive(Clone)]
pub struct GeminiChatAdapter {
    client: GeminiClient,
    history_mode: ChatHistoryMode,
}

impl GeminiChatAdapter {
    /// Creates a new `GeminiChatAdapter`.
    pub fn new(client: GeminiClient, history_mode: ChatHistoryMode) -> Self {
        Self {
            client,
            history_mode,
        }
    }
}

/// Builds the turns forwarded to the endpoint for one reply.
fn turns_for(mode: ChatHistoryMode, user_text: &str, history: &[ChatMessage]) -> Vec<GeminiTurn> {
    let mut turns = match mode {
        ChatHistoryMode::Stateless => Vec::new(),
        // Error-marked messages are skipped so a failed turn is never
        // replayed as assistant speech.
        ChatHistoryMode::FullHistory => history
            .iter()
            .filter(|m| !m.is_error)
            .map(|m| match m.sender {
                Sender::User => GeminiTurn::user(m.text.clone()),
                Sender::Assistant => GeminiTurn::model(m.text.clone()),
            })
            .collect(),
    };
    turns.push(GeminiTurn::user(user_text));
    turns
}

//=========================================================================================
// `ConversationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ConversationService for GeminiChatAdapter {
    async fn reply(&self, user_text: &str, history: &[ChatMessage]) -> PortResult<String> {
        let turns = turns_for(self.history_mode, user_text, history);
        let reply = self
            .client
            .generate(SYSTEM_INSTRUCTIONS, &turns, false)
            .await?;
        Ok(reply.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript() -> Vec<ChatMessage> {
        vec![
            ChatMessage::from_user("I'm worried about my exam."),
            ChatMessage::from_assistant("That sounds stressful. What subject is it?"),
            ChatMessage::assistant_error("I'm having trouble responding right now."),
        ]
    }

    #[test]
    fn stateless_mode_sends_only_the_latest_message() {
        let turns = turns_for(ChatHistoryMode::Stateless, "It's biology.", &transcript());
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, "user");
        assert_eq!(turns[0].text, "It's biology.");
    }

    #[test]
    fn full_history_mode_replays_the_transcript_without_error_turns() {
        let turns = turns_for(ChatHistoryMode::FullHistory, "It's biology.", &transcript());
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].role, "user");
        assert_eq!(turns[1].role, "model");
        assert_eq!(turns[2].text, "It's biology.");
    }
}
