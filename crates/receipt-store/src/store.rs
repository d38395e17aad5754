//! # Receipt Store
//!
//! Key/value storage of processed receipts, keyed by `<namespace>:<id>`.
//!
//! Writes are last-writer-wins. Reads of an id that was never stored (or not
//! stored yet) return `NotFound`.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use receipt_core::{Receipt, ReceiptId};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Builds the storage key for a receipt.
///
/// ```rust
/// use receipt_core::ReceiptId;
/// use receipt_store::store_key;
///
/// let id: ReceiptId = "7fb1377b-b223-49d9-a31a-5a02701dd310".parse().unwrap();
/// assert_eq!(
///     store_key("receipts", &id),
///     "receipts:7fb1377b-b223-49d9-a31a-5a02701dd310"
/// );
/// ```
pub fn store_key(namespace: &str, id: &ReceiptId) -> String {
    format!("{namespace}:{id}")
}

// =============================================================================
// Trait
// =============================================================================

/// Persistent map from receipt id to receipt.
#[async_trait]
pub trait ReceiptStore: Send + Sync + fmt::Debug {
    /// Stores the receipt under its id, replacing any previous value.
    async fn put(&self, id: ReceiptId, receipt: &Receipt) -> StoreResult<()>;

    /// Loads the receipt stored under the id.
    ///
    /// ## Errors
    /// - `NotFound` if nothing is stored under the id
    /// - `StoreUnavailable` if the backend cannot be reached
    async fn get(&self, id: &ReceiptId) -> StoreResult<Receipt>;
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// Process-local store.
#[derive(Debug)]
pub struct MemoryStore {
    namespace: String,
    receipts: RwLock<HashMap<String, Receipt>>,
}

impl MemoryStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        MemoryStore {
            namespace: namespace.into(),
            receipts: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored receipts.
    pub async fn len(&self) -> usize {
        self.receipts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.receipts.read().await.is_empty()
    }
}

#[async_trait]
impl ReceiptStore for MemoryStore {
    async fn put(&self, id: ReceiptId, receipt: &Receipt) -> StoreResult<()> {
        let key = store_key(&self.namespace, &id);
        self.receipts.write().await.insert(key, receipt.clone());
        debug!(id = %id, "Receipt stored");
        Ok(())
    }

    async fn get(&self, id: &ReceiptId) -> StoreResult<Receipt> {
        let key = store_key(&self.namespace, id);
        self.receipts
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use receipt_core::Item;

    fn receipt(retailer: &str, total: &str) -> Receipt {
        Receipt {
            retailer: retailer.to_string(),
            purchase_date: chrono::NaiveDate::from_ymd_opt(2022, 3, 20).unwrap(),
            purchase_time: chrono::NaiveTime::from_hms_opt(14, 33, 0).unwrap(),
            items: vec![Item {
                short_description: "Gatorade".to_string(),
                price: total.to_string(),
            }],
            total: total.to_string(),
        }
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryStore::new("receipts");
        let id = ReceiptId::new();
        let r = receipt("Target", "2.25");

        store.put(id, &r).await.unwrap();

        assert_eq!(store.get(&id).await.unwrap(), r);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryStore::new("receipts");
        let id = ReceiptId::new();

        store.put(id, &receipt("Target", "2.25")).await.unwrap();
        store.put(id, &receipt("Walgreens", "9.00")).await.unwrap();

        assert_eq!(store.get(&id).await.unwrap().retailer, "Walgreens");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = MemoryStore::new("receipts");
        let err = store.get(&ReceiptId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(store.is_empty().await);
    }
}
