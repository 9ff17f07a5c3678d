use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::domain::order::{FieldUpdate, OrderId, OrderRecord};

use super::{ExactMatch, OrderStore, PageQuery, StoreCursor, StoreError};

/// In-memory order collection.
///
/// Backs the demo binary and the tests. Records keep insertion order, which
/// is the default order returned by `query_exact`.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    records: Arc<RwLock<Vec<OrderRecord>>>,
    stats: Arc<StoreStats>,
}

/// Call counters, so callers can assert a request was or was not issued.
#[derive(Debug, Default)]
pub struct StoreStats {
    queries: AtomicU64,
    exact_queries: AtomicU64,
    updates: AtomicU64,
}

impl StoreStats {
    pub fn queries(&self) -> u64 {
        self.queries.load(AtomicOrdering::SeqCst)
    }

    pub fn exact_queries(&self) -> u64 {
        self.exact_queries.load(AtomicOrdering::SeqCst)
    }

    pub fn updates(&self) -> u64 {
        self.updates.load(AtomicOrdering::SeqCst)
    }
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = OrderRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records.into_iter().collect())),
            stats: Arc::default(),
        }
    }

    pub fn insert(&self, record: OrderRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StoreError::Backend(format!("Failed to acquire write lock: {}", e)))?;
        records.push(record);
        Ok(())
    }

    pub fn get(&self, id: OrderId) -> Result<Option<OrderRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|e| StoreError::Backend(format!("Failed to acquire read lock: {}", e)))?;
        Ok(records.iter().find(|record| record.id == id).cloned())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }
}

fn sort_key(record: &OrderRecord) -> StoreCursor {
    StoreCursor::after(record)
}

/// Newest first; `Greater` means `a` comes after `b` in page order.
fn compare(a: &StoreCursor, b: &StoreCursor) -> Ordering {
    b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id))
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn query(&self, query: &PageQuery) -> Result<Vec<OrderRecord>, StoreError> {
        self.stats.queries.fetch_add(1, AtomicOrdering::SeqCst);

        let records = self
            .records
            .read()
            .map_err(|e| StoreError::Backend(format!("Failed to acquire read lock: {}", e)))?;

        let mut page: Vec<OrderRecord> = records
            .iter()
            .filter(|record| query.filters.iter().all(|filter| filter.matches(record)))
            .filter(|record| match &query.start_after {
                Some(cursor) => compare(&sort_key(record), cursor) == Ordering::Greater,
                None => true,
            })
            .cloned()
            .collect();

        page.sort_by(|a, b| compare(&sort_key(a), &sort_key(b)));
        page.truncate(query.limit);

        tracing::debug!(
            filters = query.filters.len(),
            continued = query.start_after.is_some(),
            returned = page.len(),
            "In-memory page query"
        );

        Ok(page)
    }

    async fn query_exact(&self, key: &ExactMatch) -> Result<Vec<OrderRecord>, StoreError> {
        self.stats.exact_queries.fetch_add(1, AtomicOrdering::SeqCst);

        let records = self
            .records
            .read()
            .map_err(|e| StoreError::Backend(format!("Failed to acquire read lock: {}", e)))?;

        Ok(records.iter().filter(|record| key.matches(record)).cloned().collect())
    }

    async fn update_fields(&self, id: OrderId, updates: &[FieldUpdate]) -> Result<(), StoreError> {
        self.stats.updates.fetch_add(1, AtomicOrdering::SeqCst);

        let mut records = self
            .records
            .write()
            .map_err(|e| StoreError::Backend(format!("Failed to acquire write lock: {}", e)))?;

        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(StoreError::RecordNotFound(id))?;

        record.apply_updates(updates);

        tracing::info!(
            order_id = %id,
            fields = ?updates.iter().map(FieldUpdate::field_name).collect::<Vec<_>>(),
            "✅ Updated order fields"
        );

        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
