//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a chat WebSocket
//! connection. It owns the transcript state and delegates work to tasks.

use crate::web::{
    breathing_task::breathing_process,
    chat_task::chat_turn,
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, ChatSessionState},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use eduzen_core::domain::ChatMessage;
use eduzen_core::ports::GoogleAccess;
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const WELCOME_TEXT: &str = "Hi there! I'm your well-being assistant. Tell me how you're \
feeling today, and if you ever need a moment to reset, I can guide you through a quick \
breathing exercise.";

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New chat WebSocket connection established.");

    // The sender is wrapped in an Arc<Mutex<>> to allow for shared mutable access across tasks.
    let (sender, mut receiver) = socket.split();
    let ws_sender = Arc::new(Mutex::new(sender));
    let session_state_lock = Arc::new(Mutex::new(ChatSessionState::new()));

    // --- 1. Greeting ---
    let welcome = ChatMessage::from_assistant(WELCOME_TEXT);
    {
        let mut session = session_state_lock.lock().await;
        session.transcript.push(welcome.clone());
    }
    let welcome_msg = ServerMessage::AssistantMessage {
        id: welcome.id,
        text: welcome.text,
        timestamp: welcome.timestamp,
        is_error: false,
    };
    let welcome_json = serde_json::to_string(&welcome_msg).unwrap();
    if ws_sender
        .lock()
        .await
        .send(Message::Text(welcome_json.into()))
        .await
        .is_err()
    {
        error!("Failed to send welcome message.");
        return;
    }

    // --- 2. Main Message Loop ---
    let mut breathing_task_handle: Option<JoinHandle<()>> = None;

    loop {
        if let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_text_message(
                        text.to_string(),
                        &app_state,
                        &session_state_lock,
                        &ws_sender,
                        &mut breathing_task_handle,
                    )
                    .await;
                }
                Message::Close(_) => {
                    info!("Client sent close message.");
                    break;
                }
                _ => {}
            }
        } else {
            info!("Client disconnected.");
            break;
        }
    }

    // --- 3. Cleanup ---
    // The breathing task must not outlive the connection.
    {
        let session = session_state_lock.lock().await;
        session.breathing_token.cancel();
    }
    if let Some(handle) = breathing_task_handle {
        handle.abort();
    }
    info!("Chat WebSocket connection closed.");
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(
    text: String,
    app_state: &Arc<AppState>,
    session_state_lock: &Arc<Mutex<ChatSessionState>>,
    ws_sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    breathing_task_handle: &mut Option<JoinHandle<()>>,
) {
    match serde_json::from_str::<ClientMessage>(&text) {
        Ok(client_msg) => match client_msg {
            ClientMessage::UserMessage { text } => {
                if let Err(e) = chat_turn(
                    app_state.clone(),
                    session_state_lock.clone(),
                    ws_sender.clone(),
                    text,
                )
                .await
                {
                    error!("Error in chat turn: {:?}", e);
                }
            }
            ClientMessage::StartBreathing => {
                info!("StartBreathing message received.");
                let token = {
                    let mut session = session_state_lock.lock().await;
                    // Cancel any exercise already underway before starting over.
                    session.breathing_token.cancel();
                    session.breathing_token = CancellationToken::new();
                    session.breathing_token.clone()
                };
                if let Some(handle) = breathing_task_handle.take() {
                    handle.abort();
                }
                let task = {
                    let ws_sender = ws_sender.clone();
                    tokio::spawn(async move {
                        if let Err(e) = breathing_process(ws_sender, token).await {
                            error!("Breathing exercise failed: {:?}", e);
                        }
                    })
                };
                *breathing_task_handle = Some(task);
            }
            ClientMessage::StopBreathing => {
                info!("StopBreathing message received. Cancelling breathing task.");
                let session = session_state_lock.lock().await;
                session.breathing_token.cancel();
            }
            ClientMessage::ScheduleBreak {
                summary,
                start,
                end,
                access_token,
            } => {
                info!("ScheduleBreak message received.");
                let access = GoogleAccess { access_token };
                let reply = match app_state
                    .exporter
                    .schedule_event(&summary, start, end, &access)
                    .await
                {
                    Ok(event_id) => ServerMessage::BreakScheduled { event_id },
                    Err(e) => {
                        error!("Failed to schedule break: {}", e);
                        ServerMessage::Error {
                            message: "We couldn't schedule that break. Please check your \
                                      Google sign-in and try again."
                                .to_string(),
                        }
                    }
                };
                let reply_json = serde_json::to_string(&reply).unwrap();
                if ws_sender
                    .lock()
                    .await
                    .send(Message::Text(reply_json.into()))
                    .await
                    .is_err()
                {
                    warn!("Failed to send break scheduling result. Client may have disconnected.");
                }
            }
        },
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
        }
    }
}
