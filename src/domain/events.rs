use serde::{Deserialize, Serialize};

/// Real-time notice that a payment was confirmed.
///
/// Carries nothing beyond the payment id; the record itself is always
/// available through the status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "paid")]
pub struct PaidEvent {
    pub payment_id: u64,
}
