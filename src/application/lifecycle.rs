use crate::domain::events::PaidEvent;
use crate::domain::payment::{Amount, NewPayment, Payment, PaymentStatus};
use crate::domain::ports::{Clock, CodeGeneratorBox, PaymentNotifier, PaymentStoreBox};
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

/// A payment together with its classification at query time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub payment: Payment,
    pub status: PaymentStatus,
}

/// Owns the payment state machine: `Pending -> Paid` or `Pending -> Expired`.
///
/// All collaborators are injected. The lifecycle itself holds no state and
/// can be shared between request handlers behind an `Arc`.
pub struct PaymentLifecycle {
    store: PaymentStoreBox,
    codes: CodeGeneratorBox,
    notifier: Arc<dyn PaymentNotifier>,
    clock: Arc<dyn Clock>,
}

impl PaymentLifecycle {
    /// Creates a new `PaymentLifecycle` instance.
    ///
    /// # Arguments
    ///
    /// * `store` - The store for payment records.
    /// * `codes` - The bank-side reference and QR code generator.
    /// * `notifier` - Receives the "paid" event of every confirmed payment.
    /// * `clock` - Source of the current time for creation and expiry.
    pub fn new(
        store: PaymentStoreBox,
        codes: CodeGeneratorBox,
        notifier: Arc<dyn PaymentNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            codes,
            notifier,
            clock,
        }
    }

    /// Opens a new pending payment for `value`.
    ///
    /// Nothing is stored unless the whole operation succeeds. If persisting
    /// fails after the code was generated, the code is discarded on a best
    /// effort basis.
    pub async fn create_payment(&self, value: Option<Decimal>) -> Result<Payment> {
        let value = value
            .ok_or_else(|| PaymentError::InvalidRequest("Missing value".to_string()))?;
        let value = Amount::new(value)?;

        let generated = self.codes.generate().await?;
        let record = NewPayment::new(
            value,
            generated.bank_reference,
            generated.code_handle,
            self.clock.now(),
        );

        let id = match self.store.insert(record.clone()).await {
            Ok(id) => id,
            Err(e) => {
                if let Err(discard_err) = self.codes.discard(&record.code_handle).await {
                    tracing::warn!(
                        code_handle = %record.code_handle,
                        error = %discard_err,
                        "Failed to discard code of unsaved payment"
                    );
                }
                return Err(e);
            }
        };

        let payment = record.into_payment(id);
        tracing::info!(
            payment_id = payment.id,
            bank_reference = %payment.bank_reference,
            value = %payment.value,
            "Created PIX payment"
        );
        Ok(payment)
    }

    /// Handles the bank callback asserting that `claimed_value` was paid for
    /// `bank_reference`.
    ///
    /// Paid and expired payments are reported as `NotFound`, the same as an
    /// unknown reference, so a replayed callback cannot confirm twice and a
    /// caller probing references learns nothing about their state.
    pub async fn confirm_payment(
        &self,
        bank_reference: Option<&str>,
        claimed_value: Option<Decimal>,
    ) -> Result<Payment> {
        let bank_reference = bank_reference
            .filter(|reference| !reference.is_empty())
            .ok_or_else(|| PaymentError::InvalidRequest("Missing bank reference".to_string()))?;
        let claimed_value = claimed_value
            .ok_or_else(|| PaymentError::InvalidRequest("Missing value".to_string()))?;

        let mut payment = self
            .store
            .get_by_bank_reference(bank_reference)
            .await?
            .ok_or(PaymentError::NotFound)?;

        if payment.status_at(self.clock.now()) != PaymentStatus::Pending {
            tracing::warn!(
                payment_id = payment.id,
                paid = payment.paid,
                "Rejected confirmation of a payment that is no longer pending"
            );
            return Err(PaymentError::NotFound);
        }

        if claimed_value != payment.value.value() {
            tracing::warn!(
                payment_id = payment.id,
                expected = %payment.value,
                claimed = %claimed_value,
                "Rejected confirmation with mismatched value"
            );
            return Err(PaymentError::ValueMismatch);
        }

        match self.store.mark_paid(payment.id).await {
            Ok(()) => {}
            Err(PaymentError::AlreadyPaid | PaymentError::NotFound) => {
                tracing::warn!(payment_id = payment.id, "Lost confirmation race");
                return Err(PaymentError::NotFound);
            }
            Err(e) => return Err(e),
        }
        payment.paid = true;

        tracing::info!(payment_id = payment.id, "Confirmed PIX payment");
        self.notifier.publish_paid(PaidEvent {
            payment_id: payment.id,
        });
        Ok(payment)
    }

    /// Returns the payment with its current classification.
    pub async fn get_status(&self, id: u64) -> Result<StatusReport> {
        let payment = self
            .store
            .get_by_id(id)
            .await?
            .ok_or(PaymentError::NotFound)?;
        let status = payment.status_at(self.clock.now());
        Ok(StatusReport { payment, status })
    }

    /// Returns the scannable encoding behind `code_handle`.
    pub async fn load_code(&self, code_handle: &str) -> Result<Vec<u8>> {
        self.codes
            .load(code_handle)
            .await?
            .ok_or(PaymentError::NotFound)
    }
}
