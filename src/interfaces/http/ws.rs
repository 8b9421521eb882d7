use super::AppState;
use crate::domain::payment::PaymentStatus;
use crate::error::Result;
use crate::infrastructure::notification::{NotificationHub, Subscription};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use super::handlers::path;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use std::sync::Arc;

/// WebSocket handler for `GET /payments/pix/{id}/ws`.
///
/// The subscription is taken before the status check so an event published
/// in between is not missed.
pub async fn payment_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    id: std::result::Result<Path<u64>, PathRejection>,
) -> Result<Response> {
    let id = path(id)?;
    let subscription = state.hub.subscribe(id);

    let report = match state.lifecycle.get_status(id).await {
        Ok(report) => report,
        Err(e) => {
            state.hub.unsubscribe(&subscription);
            return Err(e);
        }
    };

    tracing::info!(
        payment_id = id,
        status = ?report.status,
        "WebSocket connection requested"
    );

    let hub = state.hub.clone();
    // Paid and expired payments will never publish again.
    if report.status != PaymentStatus::Pending {
        hub.unsubscribe(&subscription);
        return Ok(ws.on_upgrade(|mut socket| async move {
            let _ = socket.send(Message::Close(None)).await;
        }));
    }

    Ok(ws.on_upgrade(move |socket| forward_paid(socket, hub, subscription)))
}

/// Sends the paid event, if it arrives while the client is connected, then
/// closes the socket.
async fn forward_paid(
    mut socket: WebSocket,
    hub: Arc<NotificationHub>,
    mut subscription: Subscription,
) {
    let payment_id = subscription.payment_id();

    let event = tokio::select! {
        event = subscription.paid() => event,
        _ = wait_for_close(&mut socket) => {
            tracing::debug!(payment_id, "WebSocket closed by client");
            None
        }
    };
    hub.unsubscribe(&subscription);

    if let Some(event) = event {
        match serde_json::to_string(&event) {
            Ok(json) => {
                if socket.send(Message::Text(json)).await.is_err() {
                    tracing::debug!(payment_id, "WebSocket send failed");
                }
            }
            Err(e) => tracing::error!(payment_id, error = %e, "Failed to serialize event"),
        }
    }

    let _ = socket.send(Message::Close(None)).await;
}

async fn wait_for_close(socket: &mut WebSocket) {
    while let Some(Ok(message)) = socket.recv().await {
        if let Message::Close(_) = message {
            break;
        }
    }
}
