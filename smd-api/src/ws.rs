//! WebSocket lifecycle event stream.
//!
//! `GET /hsm/v2/events` upgrades to a WebSocket and forwards every
//! [`LifecycleEvent`] published through the [`EventHub`] as a JSON text frame.
//! A client that falls behind the hub's buffer receives an error frame with
//! the number of skipped events and keeps streaming from the oldest retained
//! one.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use serde::Serialize;
use smd_events::{EventHub, LifecycleEvent};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::telemetry::metrics::metrics;

/// Control frame sent next to the event frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamNotice {
    Connected { subscribers: usize },
    Error { message: String },
}

pub async fn event_stream(ws: WebSocketUpgrade, State(hub): State<EventHub>) -> Response {
    info!("Event stream connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: EventHub) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = hub.subscribe();

    if let Some(m) = metrics() {
        m.stream_opened();
    }
    info!(subscribers = hub.subscriber_count(), "Event stream connected");

    let hello = StreamNotice::Connected {
        subscribers: hub.subscriber_count(),
    };
    if let Err(e) = send_json(&mut sender, &hello).await {
        error!(error = %e, "Failed to send connected notice");
        close_stream();
        return;
    }

    // Client frames are only watched for close or error
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Ok(Message::Text(text)) => {
                    debug!(len = text.len(), "Received text message (ignored)");
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if let Err(e) = send_event(&mut sender, &event).await {
                            error!(event_id = %event.id, error = %e, "Failed to send event, closing stream");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event stream client lagged, events were dropped");
                        let notice = StreamNotice::Error {
                            message: format!("Lagged: {} events dropped", skipped),
                        };
                        if let Err(e) = send_json(&mut sender, &notice).await {
                            error!(error = %e, "Failed to send lag notice");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Event hub closed");
                        break;
                    }
                }
            }

            _ = &mut recv_task => {
                debug!("Event stream client went away");
                break;
            }
        }
    }

    recv_task.abort();
    close_stream();
    info!("Event stream disconnected");
}

fn close_stream() {
    if let Some(m) = metrics() {
        m.stream_closed();
    }
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &LifecycleEvent,
) -> Result<(), axum::Error> {
    send_json(sender, event).await
}

async fn send_json<T: Serialize>(
    sender: &mut SplitSink<WebSocket, Message>,
    value: &T,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(value).map_err(|e| {
        error!(error = %e, "Failed to serialize stream frame");
        axum::Error::new(e)
    })?;
    sender.send(Message::Text(json)).await
}
