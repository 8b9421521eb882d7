#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use pix_payments::application::lifecycle::PaymentLifecycle;
use pix_payments::domain::payment::{NewPayment, Payment};
use pix_payments::domain::ports::{Clock, CodeGenerator, GeneratedCode, PaymentStore};
use pix_payments::error::{PaymentError, Result};
use pix_payments::infrastructure::in_memory::{InMemoryCodeGenerator, InMemoryPaymentStore};
use pix_payments::infrastructure::notification::NotificationHub;
use std::sync::Arc;

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Everything a lifecycle test needs to poke at.
pub struct Fixture {
    pub lifecycle: Arc<PaymentLifecycle>,
    pub hub: Arc<NotificationHub>,
    pub store: InMemoryPaymentStore,
    pub codes: InMemoryCodeGenerator,
    pub clock: Arc<ManualClock>,
}

pub fn fixture() -> Fixture {
    let store = InMemoryPaymentStore::new();
    let codes = InMemoryCodeGenerator::new();
    let hub = Arc::new(NotificationHub::new());
    let clock = Arc::new(ManualClock::new());

    let lifecycle = PaymentLifecycle::new(
        Box::new(store.clone()),
        Box::new(codes.clone()),
        hub.clone(),
        clock.clone(),
    );

    Fixture {
        lifecycle: Arc::new(lifecycle),
        hub,
        store,
        codes,
        clock,
    }
}

/// A store whose inserts always fail, as a broken backend would.
pub struct FailingInsertStore;

#[async_trait]
impl PaymentStore for FailingInsertStore {
    async fn insert(&self, _payment: NewPayment) -> Result<u64> {
        Err(PaymentError::PersistenceError("disk full".to_string()))
    }

    async fn get_by_id(&self, _id: u64) -> Result<Option<Payment>> {
        Ok(None)
    }

    async fn get_by_bank_reference(&self, _bank_reference: &str) -> Result<Option<Payment>> {
        Ok(None)
    }

    async fn mark_paid(&self, _id: u64) -> Result<()> {
        Err(PaymentError::NotFound)
    }
}

/// A bank that is down.
pub struct UnavailableBank;

#[async_trait]
impl CodeGenerator for UnavailableBank {
    async fn generate(&self) -> Result<GeneratedCode> {
        Err(PaymentError::CodeGeneration("bank unavailable".to_string()))
    }

    async fn load(&self, _code_handle: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn discard(&self, _code_handle: &str) -> Result<()> {
        Ok(())
    }
}
