use super::events::PaidEvent;
use super::payment::{NewPayment, Payment};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persistence backend for payment records.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persists a new record and returns the id assigned to it.
    ///
    /// A duplicate bank reference is a `PersistenceError`; nothing is written.
    async fn insert(&self, payment: NewPayment) -> Result<u64>;
    async fn get_by_id(&self, id: u64) -> Result<Option<Payment>>;
    async fn get_by_bank_reference(&self, bank_reference: &str) -> Result<Option<Payment>>;
    /// Atomically flips `paid` from `false` to `true`.
    ///
    /// Exactly one of several concurrent callers succeeds; the others get
    /// `AlreadyPaid`. Unknown ids yield `NotFound`.
    async fn mark_paid(&self, id: u64) -> Result<()>;
}

/// A reference freshly issued by the bank side, with its rendered code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    pub bank_reference: String,
    pub code_handle: String,
}

/// Stand-in for the financial institution: issues references and keeps the
/// scannable encodings of them.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate(&self) -> Result<GeneratedCode>;
    /// Returns the encoding behind `code_handle`, if it exists.
    async fn load(&self, code_handle: &str) -> Result<Option<Vec<u8>>>;
    /// Removes an encoding whose payment was never persisted.
    async fn discard(&self, code_handle: &str) -> Result<()>;
}

/// Receives the one-shot "paid" transition of a payment.
///
/// Implementations must hand the event off without blocking the caller.
pub trait PaymentNotifier: Send + Sync {
    fn publish_paid(&self, event: PaidEvent);
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type CodeGeneratorBox = Box<dyn CodeGenerator>;
