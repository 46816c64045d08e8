//! services/api/src/web/breathing_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! the timed breathing exercise.

use crate::web::protocol::{BreathPhase, ServerMessage};
use axum::extract::ws::{Message, WebSocket};
use eduzen_core::ports::{PortError, PortResult};
use futures::{stream::SplitSink, SinkExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Number of full breaths in one exercise.
pub const BREATH_COUNT: usize = 5;
/// Seconds per inhale or exhale phase.
pub const PHASE_SECONDS: u64 = 5;

/// The main asynchronous task for one breathing exercise.
///
/// This is a long-running task that alternates inhale and exhale phases on a
/// fixed cadence and streams each tick to the client. It is designed to be
/// gracefully cancelled via a `CancellationToken`, so that neither a client
/// disconnect nor a manual stop leaves a timer running.
pub async fn breathing_process(
    ws_sender: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    cancellation_token: CancellationToken,
) -> PortResult<()> {
    info!("Breathing exercise started.");

    for breath in 1..=BREATH_COUNT {
        for phase in [BreathPhase::Inhale, BreathPhase::Exhale] {
            let phase_msg = ServerMessage::BreathingPhase {
                phase,
                breath,
                total: BREATH_COUNT,
            };
            let phase_json = serde_json::to_string(&phase_msg).unwrap();
            if ws_sender
                .lock()
                .await
                .send(Message::Text(phase_json.into()))
                .await
                .is_err()
            {
                error!("Failed to send breathing phase to client. Ending exercise.");
                return Err(PortError::Unexpected(
                    "Failed to send breathing phase.".to_string(),
                ));
            }

            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("Breathing exercise cancelled.");
                    return Ok(());
                }
                _ = tokio::time::sleep(Duration::from_secs(PHASE_SECONDS)) => {}
            }
        }
    }

    info!("Breathing exercise finished.");
    let end_msg = ServerMessage::BreathingEnded;
    let end_json = serde_json::to_string(&end_msg).unwrap();
    if ws_sender
        .lock()
        .await
        .send(Message::Text(end_json.into()))
        .await
        .is_err()
    {
        error!("Failed to send BreathingEnded message.");
    }

    Ok(())
}
