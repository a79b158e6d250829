//! Manages the WebSocket connection lifecycle for a tutorial session.
//!
//! Each connection gets its own `SessionController`. Client messages become
//! controller events; controller outputs become server messages.

use super::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use anyhow::Result;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{Instrument, error, info, instrument, warn};
use tutor_core::controller::{ControllerHandle, Output, SessionController};

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Main handler for an individual WebSocket connection.
#[instrument(name = "ws_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id: u32 = rand::random();
    tracing::Span::current().record("session_id", session_id);
    info!("New WebSocket connection.");

    let (controller, handle, outputs) =
        SessionController::new(state.resolver.clone(), state.controller_config.clone());
    let controller_task = tokio::spawn(controller.run().in_current_span());

    let (socket_tx, socket_rx) = socket.split();
    if let Err(e) = run_session(socket_tx, socket_rx, &handle, outputs).await {
        error!(error = ?e, "Tutorial session terminated with error.");
    }

    handle.shutdown();
    if let Err(e) = controller_task.await {
        error!(error = ?e, "Session controller task failed.");
    }
    info!("WebSocket connection closed and session controller stopped.");
}

/// The main event loop for an active WebSocket session.
async fn run_session(
    mut socket_tx: SplitSink<WebSocket, Message>,
    mut socket_rx: SplitStream<WebSocket>,
    handle: &ControllerHandle,
    mut outputs: mpsc::Receiver<Output>,
) -> Result<()> {
    loop {
        tokio::select! {
            // Handle messages from the client WebSocket.
            msg_result = socket_rx.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(msg) => handle.dispatch(msg.into())?,
                            Err(e) => {
                                warn!(error = %e, "Ignoring malformed client message.");
                                send_msg(
                                    &mut socket_tx,
                                    ServerMessage::Error { message: format!("Invalid message: {}", e) },
                                )
                                .await?;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Client closed the connection.");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("Error receiving from client WebSocket: {:?}", e);
                        break;
                    }
                }
            },
            // Forward state snapshots and commands from the controller.
            Some(output) = outputs.recv() => {
                send_msg(&mut socket_tx, output.into()).await?;
            },
        }
    }
    Ok(())
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
