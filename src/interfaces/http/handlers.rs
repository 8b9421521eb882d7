use super::AppState;
use crate::application::lifecycle::StatusReport;
use crate::domain::payment::{Payment, PaymentStatus};
use crate::error::{PaymentError, Result};
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use rust_decimal::Decimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    #[serde(default, alias = "bank_payment_id")]
    pub bank_reference: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

/// Wire form of a payment. `value` is written as a JSON number.
#[derive(Debug, Serialize)]
pub struct PaymentView {
    pub id: u64,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub value: Decimal,
    pub bank_reference: String,
    pub code_handle: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub paid: bool,
}

impl From<Payment> for PaymentView {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            value: payment.value.value(),
            bank_reference: payment.bank_reference,
            code_handle: payment.code_handle,
            created_at: payment.created_at,
            expires_at: payment.expires_at,
            paid: payment.paid,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusView {
    pub payment: PaymentView,
    pub status: PaymentStatus,
}

impl From<StatusReport> for StatusView {
    fn from(report: StatusReport) -> Self {
        Self {
            payment: report.payment.into(),
            status: report.status,
        }
    }
}

/// Reads a monetary value from JSON.
///
/// Accepts JSON numbers and numeric strings. `null` and absence both mean
/// "missing"; anything else is an invalid request.
pub fn parse_value(value: Option<&Value>) -> Result<Option<Decimal>> {
    let invalid = || PaymentError::InvalidRequest("Value must be numeric".to_string());
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => {
            let raw = number.to_string();
            raw.parse::<Decimal>()
                .or_else(|_| Decimal::from_scientific(&raw))
                .map(Some)
                .map_err(|_| invalid())
        }
        Some(Value::String(raw)) => raw.trim().parse::<Decimal>().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| PaymentError::InvalidRequest(rejection.body_text()))
}

pub(super) fn path<T>(segment: std::result::Result<Path<T>, PathRejection>) -> Result<T> {
    segment
        .map(|Path(value)| value)
        .map_err(|rejection| PaymentError::InvalidRequest(rejection.body_text()))
}

pub async fn create_payment(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PaymentView>)> {
    let request = body(payload)?;
    let value = parse_value(request.value.as_ref())?;
    let payment = state.lifecycle.create_payment(value).await?;
    Ok((StatusCode::CREATED, Json(payment.into())))
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ConfirmPaymentRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let request = body(payload)?;
    let value = parse_value(request.value.as_ref())?;
    let payment = state
        .lifecycle
        .confirm_payment(request.bank_reference.as_deref(), value)
        .await?;

    Ok(Json(json!({
        "message": "The payment has been confirmed",
        "id": payment.id,
    })))
}

pub async fn payment_status(
    State(state): State<AppState>,
    id: std::result::Result<Path<u64>, PathRejection>,
) -> Result<Json<StatusView>> {
    let id = path(id)?;
    Ok(Json(state.lifecycle.get_status(id).await?.into()))
}

pub async fn qr_code(
    State(state): State<AppState>,
    handle: std::result::Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse> {
    let handle = path(handle)?;
    let blob = state.lifecycle.load_code(&handle).await?;
    let content_type = if blob.starts_with(b"<?xml") || blob.starts_with(b"<svg") {
        "image/svg+xml"
    } else {
        "text/plain; charset=utf-8"
    };
    Ok(([(header::CONTENT_TYPE, content_type)], blob))
}
