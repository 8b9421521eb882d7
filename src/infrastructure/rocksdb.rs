use crate::domain::payment::{NewPayment, Payment};
use crate::domain::ports::PaymentStore;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing payment records keyed by id.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family mapping bank references to payment ids.
pub const CF_BANK_REFERENCES: &str = "bank_references";
/// Column Family for bookkeeping such as the id counter.
pub const CF_META: &str = "meta";

const LAST_ID_KEY: &[u8] = b"last_id";

/// A persistent payment store using RocksDB.
///
/// Records live in the `payments` column family as JSON, with a secondary
/// index from bank reference to id. Writes go through one `WriteBatch` each
/// and are serialized by `write_lock`, so `mark_paid` is a check-and-set and
/// a failed insert leaves nothing behind.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_PAYMENTS, CF_BANK_REFERENCES, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PaymentError::PersistenceError(format!("{} column family not found", name))
        })
    }

    fn read_payment(&self, id: u64) -> Result<Option<Payment>> {
        let cf = self.cf(CF_PAYMENTS)?;
        match self.db.get_cf(cf, id.to_be_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                PaymentError::PersistenceError(format!("Deserialization error: {}", e))
            }),
            None => Ok(None),
        }
    }

    fn read_id(&self, cf: &ColumnFamily, key: &[u8]) -> Result<Option<u64>> {
        match self.db.get_cf(cf, key)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    PaymentError::PersistenceError("Corrupted id entry".to_string())
                })?;
                Ok(Some(u64::from_be_bytes(raw)))
            }
            None => Ok(None),
        }
    }
}

fn encode(payment: &Payment) -> Result<Vec<u8>> {
    serde_json::to_vec(payment)
        .map_err(|e| PaymentError::PersistenceError(format!("Serialization error: {}", e)))
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn insert(&self, payment: NewPayment) -> Result<u64> {
        let _guard = self.write_lock.lock().await;

        let cf_payments = self.cf(CF_PAYMENTS)?;
        let cf_refs = self.cf(CF_BANK_REFERENCES)?;
        let cf_meta = self.cf(CF_META)?;

        let reference = payment.bank_reference.clone();
        if self.db.get_pinned_cf(cf_refs, reference.as_bytes())?.is_some() {
            return Err(PaymentError::PersistenceError(format!(
                "duplicate bank reference {}",
                reference
            )));
        }

        let id = self.read_id(cf_meta, LAST_ID_KEY)?.unwrap_or(0) + 1;
        let record = payment.into_payment(id);

        let mut batch = WriteBatch::default();
        batch.put_cf(cf_payments, id.to_be_bytes(), encode(&record)?);
        batch.put_cf(cf_refs, reference.as_bytes(), id.to_be_bytes());
        batch.put_cf(cf_meta, LAST_ID_KEY, id.to_be_bytes());
        self.db.write(batch)?;

        Ok(id)
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<Payment>> {
        self.read_payment(id)
    }

    async fn get_by_bank_reference(&self, bank_reference: &str) -> Result<Option<Payment>> {
        let cf_refs = self.cf(CF_BANK_REFERENCES)?;
        match self.read_id(cf_refs, bank_reference.as_bytes())? {
            Some(id) => self.read_payment(id),
            None => Ok(None),
        }
    }

    async fn mark_paid(&self, id: u64) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut payment = self.read_payment(id)?.ok_or(PaymentError::NotFound)?;
        payment.mark_paid()?;

        let cf = self.cf(CF_PAYMENTS)?;
        self.db.put_cf(cf, id.to_be_bytes(), encode(&payment)?)?;
        Ok(())
    }
}
