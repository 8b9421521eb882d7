use crate::domain::payment::{NewPayment, Payment};
use crate::domain::ports::{CodeGenerator, GeneratedCode, PaymentStore};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct PaymentTable {
    last_id: u64,
    payments: HashMap<u64, Payment>,
    by_bank_reference: HashMap<String, u64>,
}

/// A thread-safe in-memory store for payments.
///
/// Uses `Arc<RwLock<..>>` to allow shared concurrent access. Every mutation
/// runs under a single write guard, which makes `mark_paid` a proper
/// check-and-set.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    table: Arc<RwLock<PaymentTable>>,
}

impl InMemoryPaymentStore {
    /// Creates a new, empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: NewPayment) -> Result<u64> {
        let mut table = self.table.write().await;
        if table.by_bank_reference.contains_key(&payment.bank_reference) {
            return Err(PaymentError::PersistenceError(format!(
                "duplicate bank reference {}",
                payment.bank_reference
            )));
        }

        table.last_id += 1;
        let id = table.last_id;
        table
            .by_bank_reference
            .insert(payment.bank_reference.clone(), id);
        table.payments.insert(id, payment.into_payment(id));
        Ok(id)
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<Payment>> {
        let table = self.table.read().await;
        Ok(table.payments.get(&id).cloned())
    }

    async fn get_by_bank_reference(&self, bank_reference: &str) -> Result<Option<Payment>> {
        let table = self.table.read().await;
        Ok(table
            .by_bank_reference
            .get(bank_reference)
            .and_then(|id| table.payments.get(id))
            .cloned())
    }

    async fn mark_paid(&self, id: u64) -> Result<()> {
        let mut table = self.table.write().await;
        table
            .payments
            .get_mut(&id)
            .ok_or(PaymentError::NotFound)?
            .mark_paid()
    }
}

/// Issues UUID references and keeps their encodings in memory.
///
/// The encoding is the raw copy-and-paste payload rather than a rendered
/// image. Used by tests and when no codes directory is configured.
#[derive(Default, Clone)]
pub struct InMemoryCodeGenerator {
    codes: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryCodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.codes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.codes.read().await.is_empty()
    }
}

#[async_trait]
impl CodeGenerator for InMemoryCodeGenerator {
    async fn generate(&self) -> Result<GeneratedCode> {
        let bank_reference = Uuid::new_v4().to_string();
        let code_handle = format!("code_payment_{bank_reference}");
        let payload = format!("hash_payment_{bank_reference}");

        self.codes
            .write()
            .await
            .insert(code_handle.clone(), payload.into_bytes());

        Ok(GeneratedCode {
            bank_reference,
            code_handle,
        })
    }

    async fn load(&self, code_handle: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.codes.read().await.get(code_handle).cloned())
    }

    async fn discard(&self, code_handle: &str) -> Result<()> {
        self.codes.write().await.remove(code_handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::Amount;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn new_payment(bank_reference: &str) -> NewPayment {
        NewPayment::new(
            Amount::new(dec!(100.0)).unwrap(),
            bank_reference.to_string(),
            format!("code_payment_{bank_reference}"),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_in_memory_payment_store() {
        let store = InMemoryPaymentStore::new();

        let id = store.insert(new_payment("ref-a")).await.unwrap();
        assert_eq!(id, 1);
        let second = store.insert(new_payment("ref-b")).await.unwrap();
        assert_eq!(second, 2);

        let retrieved = store.get_by_id(1).await.unwrap().unwrap();
        assert_eq!(retrieved.bank_reference, "ref-a");
        assert!(!retrieved.paid);

        let by_ref = store.get_by_bank_reference("ref-b").await.unwrap().unwrap();
        assert_eq!(by_ref.id, 2);

        assert!(store.get_by_id(3).await.unwrap().is_none());
        assert!(store.get_by_bank_reference("ref-c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_rejects_duplicate_reference() {
        let store = InMemoryPaymentStore::new();
        store.insert(new_payment("ref-a")).await.unwrap();

        let result = store.insert(new_payment("ref-a")).await;
        assert!(matches!(result, Err(PaymentError::PersistenceError(_))));
        assert!(store.get_by_id(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_mark_paid() {
        let store = InMemoryPaymentStore::new();
        let id = store.insert(new_payment("ref-a")).await.unwrap();

        store.mark_paid(id).await.unwrap();
        assert!(store.get_by_id(id).await.unwrap().unwrap().paid);
        assert!(
            store
                .get_by_bank_reference("ref-a")
                .await
                .unwrap()
                .unwrap()
                .paid
        );

        assert!(matches!(
            store.mark_paid(id).await,
            Err(PaymentError::AlreadyPaid)
        ));
        assert!(matches!(
            store.mark_paid(99).await,
            Err(PaymentError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_in_memory_code_generator() {
        let codes = InMemoryCodeGenerator::new();
        let generated = codes.generate().await.unwrap();

        assert!(Uuid::parse_str(&generated.bank_reference).is_ok());
        let blob = codes.load(&generated.code_handle).await.unwrap().unwrap();
        assert_eq!(
            blob,
            format!("hash_payment_{}", generated.bank_reference).into_bytes()
        );

        codes.discard(&generated.code_handle).await.unwrap();
        assert!(codes.load(&generated.code_handle).await.unwrap().is_none());
        assert!(codes.is_empty().await);
    }
}
