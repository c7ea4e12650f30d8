//! WebSocket handlers for the trade and book-update streams.
//!
//! Each connection subscribes to the relevant hub and forwards events as
//! JSON. A heartbeat ping keeps idle connections alive; a subscriber that
//! lags the broadcast simply skips the missed events.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::interval;
use tracing::{debug, warn};

use crate::types::{SnapshotResponse, StreamMessage, TradeMessage};
use crate::AppState;

const HEARTBEAT: Duration = Duration::from_secs(30);

pub async fn serve_trades(socket: WebSocket, state: AppState) {
    debug!("trade stream connected");
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.trade_hub.subscribe();
    let mut heartbeat = interval(HEARTBEAT);

    loop {
        tokio::select! {
            msg = receiver.next() => {
                if !handle_client_message(&mut sender, msg).await {
                    break;
                }
            }
            event = events.recv() => {
                match event {
                    Ok(trade) => {
                        let msg = StreamMessage::Trade(TradeMessage::from(trade));
                        if !send_json(&mut sender, &msg).await {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "trade subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!("trade stream closed");
}

pub async fn serve_book(socket: WebSocket, state: AppState) {
    debug!("book stream connected");
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.book_hub.subscribe();
    let mut heartbeat = interval(HEARTBEAT);

    // Initial snapshot so clients render before the first change.
    if let Ok(view) = state.book.snapshot().await {
        let msg = StreamMessage::Book(SnapshotResponse::from(view));
        if !send_json(&mut sender, &msg).await {
            return;
        }
    }

    loop {
        tokio::select! {
            msg = receiver.next() => {
                if !handle_client_message(&mut sender, msg).await {
                    break;
                }
            }
            event = events.recv() => {
                match event {
                    Ok(view) => {
                        let msg = StreamMessage::Book(SnapshotResponse::from(view));
                        if !send_json(&mut sender, &msg).await {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "book subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!("book stream closed");
}

/// Returns false when the connection should close.
async fn handle_client_message<S>(sender: &mut S, msg: Option<Result<Message, axum::Error>>) -> bool
where
    S: SinkExt<Message> + Unpin,
{
    match msg {
        Some(Ok(Message::Ping(data))) => {
            let _ = sender.send(Message::Pong(data)).await;
            true
        }
        Some(Ok(Message::Close(_))) | None => false,
        Some(Ok(_)) => true,
        Some(Err(err)) => {
            warn!(error = %err, "websocket receive failed");
            false
        }
    }
}

async fn send_json<S>(sender: &mut S, msg: &StreamMessage) -> bool
where
    S: SinkExt<Message> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json)).await.is_ok(),
        Err(err) => {
            warn!(error = %err, "failed to encode stream message");
            true
        }
    }
}
