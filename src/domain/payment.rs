use crate::error::PaymentError;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How long a payment stays confirmable after creation.
pub const PAYMENT_TTL_HOURS: i64 = 24;

/// Represents a positive monetary amount for a payment.
///
/// Wraps `rust_decimal::Decimal` so that a payment value can never be zero or
/// negative once constructed. Comparison is exact decimal equality, so
/// `100.0` and `100.00` are the same amount.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::InvalidRequest(
                "Value must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Query-time classification of a payment.
///
/// `Expired` is never stored: it is derived from `expires_at` whenever the
/// status is asked for.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Expired,
}

/// A payment request that has not been persisted yet.
#[derive(Debug, PartialEq, Clone)]
pub struct NewPayment {
    pub value: Amount,
    pub bank_reference: String,
    pub code_handle: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewPayment {
    /// Builds a pending payment created at `now`, expiring after the fixed window.
    pub fn new(
        value: Amount,
        bank_reference: String,
        code_handle: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            value,
            bank_reference,
            code_handle,
            created_at: now,
            expires_at: now + Duration::hours(PAYMENT_TTL_HOURS),
        }
    }

    /// Attaches the id assigned by the store.
    pub fn into_payment(self, id: u64) -> Payment {
        Payment {
            id,
            value: self.value,
            bank_reference: self.bank_reference,
            code_handle: self.code_handle,
            created_at: self.created_at,
            expires_at: self.expires_at,
            paid: false,
        }
    }
}

/// A persisted PIX payment.
///
/// Everything except `paid` is fixed at creation. `paid` only ever moves
/// from `false` to `true`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    /// Identifier assigned by the payment store.
    pub id: u64,
    /// Amount the payer has to transfer.
    pub value: Amount,
    /// Reference assigned by the bank side, unique across payments.
    pub bank_reference: String,
    /// Handle of the scannable code rendered for `bank_reference`.
    pub code_handle: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub paid: bool,
}

impl Payment {
    /// Classifies the payment at `now`. `Paid` wins over expiry once set.
    pub fn status_at(&self, now: DateTime<Utc>) -> PaymentStatus {
        if self.paid {
            PaymentStatus::Paid
        } else if now > self.expires_at {
            PaymentStatus::Expired
        } else {
            PaymentStatus::Pending
        }
    }

    /// Marks the payment as paid. Fails if it already was.
    pub fn mark_paid(&mut self) -> Result<(), PaymentError> {
        if self.paid {
            return Err(PaymentError::AlreadyPaid);
        }
        self.paid = true;
        Ok(())
    }
}
