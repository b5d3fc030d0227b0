//! Per-subscriber session handling.

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::broker::SubscriberHandle;
use crate::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::server::AppState;

enum SessionFlow {
    Continue,
    Detached,
    TransportFailed,
}

/// Drive one duplex session from upgrade to teardown.
///
/// The first frame must be `Attach`; everything after that is a select loop
/// over broker pushes and client pulls. Any exit path deregisters the
/// session so a vanished client is evicted at the latest on the next
/// broadcast.
pub(crate) async fn handle_session(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let Some((user_id, workstation, application)) =
        await_attach(&mut sender, &mut receiver).await
    else {
        return;
    };

    let session_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.broker.attach(SubscriberHandle::new(session_id, tx));
    tracing::info!(
        session_id = %session_id,
        user_id = %user_id,
        workstation = %workstation,
        application = %application,
        "Subscriber session established"
    );

    if send_frame(&mut sender, &ServerMessage::Attached { session_id })
        .await
        .is_err()
    {
        state.broker.detach(session_id);
        return;
    }

    let mut detached = false;
    loop {
        tokio::select! {
            _ = state.shutdown.wait() => break,
            pushed = rx.recv() => match pushed {
                Some(view) => {
                    if send_frame(&mut sender, &ServerMessage::Update { view }).await.is_err() {
                        break;
                    }
                }
                // Evicted by the broker; nothing left to forward.
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(text.as_str()) {
                        Ok(message) => {
                            match handle_message(&mut sender, &state, session_id, message).await {
                                SessionFlow::Continue => {}
                                SessionFlow::Detached => {
                                    detached = true;
                                    break;
                                }
                                SessionFlow::TransportFailed => break,
                            }
                        }
                        Err(e) => {
                            let reply = ServerMessage::Error {
                                code: ErrorCode::BadRequest,
                                message: format!("malformed frame: {e}"),
                            };
                            if send_frame(&mut sender, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(session_id = %session_id, error = %e, "Session transport failed");
                    break;
                }
            }
        }
    }

    if !detached {
        state.broker.detach(session_id);
    }
}

/// Wait for the mandatory first frame. Returns `None` when the session ends
/// before a valid `Attach` arrives.
async fn await_attach(
    sender: &mut SplitSink<WebSocket, Message>,
    receiver: &mut SplitStream<WebSocket>,
) -> Option<(String, String, String)> {
    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(ClientMessage::Attach {
                        user_id,
                        workstation,
                        application,
                    }) => return Some((user_id, workstation, application)),
                    Ok(other) => {
                        tracing::warn!(?other, "Frame before attach rejected");
                        let reply = ServerMessage::Error {
                            code: ErrorCode::NotAttached,
                            message: "first frame must be attach".to_string(),
                        };
                        let _ = send_frame(sender, &reply).await;
                        return None;
                    }
                    Err(e) => {
                        let reply = ServerMessage::Error {
                            code: ErrorCode::BadRequest,
                            message: format!("malformed frame: {e}"),
                        };
                        let _ = send_frame(sender, &reply).await;
                        return None;
                    }
                }
            }
            Some(Ok(Message::Close(_))) | None => return None,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::debug!(error = %e, "Session failed before attach");
                return None;
            }
        }
    }
}

async fn handle_message(
    sender: &mut SplitSink<WebSocket, Message>,
    state: &AppState,
    session_id: Uuid,
    message: ClientMessage,
) -> SessionFlow {
    let reply = match message {
        ClientMessage::Attach { .. } => {
            // Idempotent: the registration stays in place.
            tracing::warn!(session_id = %session_id, "Duplicate attach on established session");
            ServerMessage::Attached { session_id }
        }
        ClientMessage::Detach => {
            state.broker.detach(session_id);
            let _ = send_frame(sender, &ServerMessage::Detached).await;
            return SessionFlow::Detached;
        }
        ClientMessage::GetAvailableCubeStatus => ServerMessage::CubeStatus {
            view: state.broker.next_view(),
        },
        ClientMessage::GetActiveReplica => ServerMessage::ActiveReplica {
            replica: state.broker.active_replica(),
        },
        ClientMessage::GetLoadStatus { slice, date } => match &state.load_status {
            Some(source) => match source.load_status(slice, date).await {
                Ok(rows) => ServerMessage::LoadStatus { rows },
                Err(e) => {
                    tracing::error!(session_id = %session_id, error = %e, "Load status query failed");
                    ServerMessage::Error {
                        code: ErrorCode::Unavailable,
                        message: "load status query failed".to_string(),
                    }
                }
            },
            None => ServerMessage::Error {
                code: ErrorCode::Unavailable,
                message: "no load status source configured".to_string(),
            },
        },
        ClientMessage::SendUsageRecord { record } => {
            // Fire-and-forget: no reply frame.
            state.usage.record(&record);
            return SessionFlow::Continue;
        }
    };

    if send_frame(sender, &reply).await.is_err() {
        SessionFlow::TransportFailed
    } else {
        SessionFlow::Continue
    }
}

async fn send_frame(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    match serde_json::to_string(message) {
        Ok(text) => sender.send(Message::Text(text.into())).await,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode frame");
            Ok(())
        }
    }
}
