use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::order::{FieldUpdate, InvoiceNumber, OrderId, OrderRecord, OrderStatus};
use crate::utils::IsTransient;

mod memory;

pub use memory::{InMemoryOrderStore, StoreStats};

// ============================================================================
// Order Store Boundary
// ============================================================================
//
// The document store holding order records lives outside this crate. This
// module describes only the three capabilities the listing engine and the
// invoice lookup consume:
//
// - `query`       filtered, sorted, cursor-continued page of records
// - `query_exact` every record whose field equals a value
// - `update_fields` field-level write against one record
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store rejected the request: {0}")]
    Backend(String),

    #[error("order record not found: {0}")]
    RecordNotFound(OrderId),
}

impl IsTransient for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Server-side predicate on an order field.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `status == value`
    StatusEquals(OrderStatus),
    /// `date >= value`
    DateAtLeast(DateTime<Utc>),
}

impl Filter {
    pub fn matches(&self, record: &OrderRecord) -> bool {
        match self {
            Filter::StatusEquals(status) => record.status == *status,
            Filter::DateAtLeast(bound) => record.date >= *bound,
        }
    }
}

/// Continuation handle: the `(date, id)` of the last record of a page.
///
/// `id` breaks ties between records sharing a timestamp so the position is
/// always total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCursor {
    pub date: DateTime<Utc>,
    pub id: OrderId,
}

impl StoreCursor {
    pub fn after(record: &OrderRecord) -> Self {
        Self {
            date: record.date,
            id: record.id,
        }
    }
}

/// Pages are always ordered by `(date, id)`, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub filters: Vec<Filter>,
    pub limit: usize,
    pub start_after: Option<StoreCursor>,
}

/// Field selector for exact-match lookups.
#[derive(Debug, Clone, PartialEq)]
pub enum ExactMatch {
    InvoiceNumber(InvoiceNumber),
}

impl ExactMatch {
    pub fn matches(&self, record: &OrderRecord) -> bool {
        match self {
            ExactMatch::InvoiceNumber(invoice) => record.invoice_number == *invoice,
        }
    }
}

/// The order collection as consumed by this crate.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// One page of records, newest first, starting after
    /// `query.start_after` when present.
    async fn query(&self, query: &PageQuery) -> Result<Vec<OrderRecord>, StoreError>;

    /// Every record matching `key`, in the store's default order.
    async fn query_exact(&self, key: &ExactMatch) -> Result<Vec<OrderRecord>, StoreError>;

    async fn update_fields(&self, id: OrderId, updates: &[FieldUpdate]) -> Result<(), StoreError>;
}
