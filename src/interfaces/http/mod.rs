//! HTTP adapter over the payment lifecycle.
//!
//! Routes:
//! - `POST /payments/pix` creates a payment.
//! - `POST /payments/pix/confirmation` is the bank confirmation callback.
//! - `GET /payments/pix/{id}` returns the payment and its status.
//! - `GET /payments/pix/qr_code/{handle}` serves the generated code.
//! - `GET /payments/pix/{id}/ws` streams the one-shot "paid" event.

pub mod handlers;
pub mod ws;

use crate::application::lifecycle::PaymentLifecycle;
use crate::error::PaymentError;
use crate::infrastructure::notification::NotificationHub;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;

/// Handles shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<PaymentLifecycle>,
    pub hub: Arc<NotificationHub>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/payments/pix", post(handlers::create_payment))
        .route(
            "/payments/pix/confirmation",
            post(handlers::confirm_payment),
        )
        .route("/payments/pix/qr_code/:handle", get(handlers::qr_code))
        .route("/payments/pix/:id", get(handlers::payment_status))
        .route("/payments/pix/:id/ws", get(ws::payment_ws))
        .with_state(state)
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = match &self {
            PaymentError::InvalidRequest(_) | PaymentError::ValueMismatch => {
                StatusCode::BAD_REQUEST
            }
            PaymentError::NotFound | PaymentError::AlreadyPaid => StatusCode::NOT_FOUND,
            _ => {
                tracing::error!(error = %self, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            PaymentError::AlreadyPaid => PaymentError::NotFound.to_string(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
