use std::sync::Arc;

use serde::Deserialize;

use crate::clock::Clock;
use crate::domain::order::{
    FieldUpdate, InvoiceNumber, OrderError, OrderRecord, OrderStatus, RejectReason,
};
use crate::metrics::ConsoleMetrics;
use crate::store::{ExactMatch, OrderStore};
use crate::utils::{retry_on_transient, RetryConfig};

// ============================================================================
// Invoice Lookup & Delivery Transition
// ============================================================================
//
// Idle -> Searching -> Found | NotFound | Failed
// Found -> Transitioning -> Found (Delivered) | Found (unchanged, error set)
//
// The found record is this component's own copy. Marking it delivered does
// not touch any row held by the listing engine.
//
// ============================================================================

pub const DELIVERED_MESSAGE: &str = "Order has been marked as delivered!";

/// What to do when an invoice number matches more than one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Take the first record in the store's default order.
    #[default]
    FirstMatch,
    /// Refuse with `OrderError::DuplicateInvoice`.
    Reject,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub duplicate_policy: DuplicatePolicy,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum LookupState {
    #[default]
    Idle,
    Searching,
    Found(OrderRecord),
    /// A delivery write is in flight; holds the pre-transition record.
    ///
    /// Only left behind if a `mark_delivered` future is dropped before the
    /// write settles. Whether that write landed is unknown, so further
    /// transitions are refused until `reset` or a new `lookup` re-reads the
    /// order.
    Transitioning(OrderRecord),
    NotFound,
    Failed,
}

pub struct InvoiceLookup {
    store: Arc<dyn OrderStore>,
    config: LookupConfig,
    retry: RetryConfig,
    clock: Arc<dyn Clock>,
    metrics: Arc<ConsoleMetrics>,

    input: String,
    state: LookupState,
    error: Option<OrderError>,
    success_message: Option<&'static str>,
}

impl InvoiceLookup {
    pub fn new(
        store: Arc<dyn OrderStore>,
        config: LookupConfig,
        retry: RetryConfig,
        clock: Arc<dyn Clock>,
        metrics: Arc<ConsoleMetrics>,
    ) -> Self {
        Self {
            store,
            config,
            retry,
            clock,
            metrics,
            input: String::new(),
            state: LookupState::Idle,
            error: None,
            success_message: None,
        }
    }

    pub fn state(&self) -> &LookupState {
        &self.state
    }

    /// The displayed order, if any.
    pub fn order(&self) -> Option<&OrderRecord> {
        match &self.state {
            LookupState::Found(record) | LookupState::Transitioning(record) => Some(record),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&OrderError> {
        self.error.as_ref()
    }

    pub fn success_message(&self) -> Option<&str> {
        self.success_message
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Whether `mark_delivered` would be attempted.
    pub fn is_deliverable(&self) -> bool {
        matches!(&self.state, LookupState::Found(record) if !record.status.is_delivered())
    }

    /// Look up the identifier currently in the input box.
    pub async fn search(&mut self) -> Result<Option<&OrderRecord>, OrderError> {
        let identifier = self.input.clone();
        self.lookup(&identifier).await
    }

    /// Resolve one order by exact invoice number.
    ///
    /// A blank identifier is ignored: no request, no state change, `Ok(None)`.
    pub async fn lookup(&mut self, identifier: &str) -> Result<Option<&OrderRecord>, OrderError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            tracing::debug!("Ignoring lookup with empty invoice number");
            return Ok(None);
        }

        let invoice = InvoiceNumber::new(identifier);
        self.input = identifier.to_string();
        self.state = LookupState::Searching;
        self.error = None;
        self.success_message = None;

        tracing::info!(invoice = %invoice, "Looking up order");

        let store = Arc::clone(&self.store);
        let key = ExactMatch::InvoiceNumber(invoice.clone());
        let result = retry_on_transient(&self.retry, "lookup_invoice", |_attempt| {
            let store = Arc::clone(&store);
            let key = key.clone();
            async move { store.query_exact(&key).await }
        })
        .await
        .into_result();

        let selected = match result {
            Err(err) => Err(OrderError::FetchFailed(err)),
            Ok(matches) => self.select(&invoice, matches),
        };

        match selected {
            Ok(record) => {
                tracing::info!(
                    invoice = %invoice,
                    order_id = %record.id,
                    status = %record.status,
                    "Order found"
                );
                self.metrics.record_lookup("found");
                self.state = LookupState::Found(record);
                Ok(self.order())
            }
            Err(err) => {
                tracing::warn!(invoice = %invoice, error = %err, "Order lookup failed");
                self.metrics.record_lookup(err.kind());
                self.state = match err {
                    OrderError::NotFound(_) => LookupState::NotFound,
                    _ => LookupState::Failed,
                };
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn select(
        &self,
        invoice: &InvoiceNumber,
        mut matches: Vec<OrderRecord>,
    ) -> Result<OrderRecord, OrderError> {
        match matches.len() {
            0 => Err(OrderError::NotFound(invoice.clone())),
            1 => Ok(matches.remove(0)),
            count => match self.config.duplicate_policy {
                DuplicatePolicy::FirstMatch => {
                    tracing::warn!(
                        invoice = %invoice,
                        count = count,
                        "Invoice number is not unique, taking the first match"
                    );
                    Ok(matches.remove(0))
                }
                DuplicatePolicy::Reject => Err(OrderError::DuplicateInvoice {
                    invoice: invoice.clone(),
                    count,
                }),
            },
        }
    }

    /// Persist `Delivered` plus the delivery time for the found order, then
    /// mirror both fields into the displayed copy.
    ///
    /// Refused without contacting the store when nothing is found, the order
    /// is already delivered, or an earlier call was cancelled mid-write; in
    /// that case nothing changes. If the write fails
    /// the displayed order keeps its previous status and the error is kept.
    pub async fn mark_delivered(&mut self) -> Result<OrderRecord, OrderError> {
        let previous = match std::mem::take(&mut self.state) {
            LookupState::Found(record) if !record.status.is_delivered() => record,
            other => {
                let reason = match &other {
                    LookupState::Found(record) => RejectReason::AlreadyDelivered(record.status),
                    LookupState::Transitioning(_) => RejectReason::TransitionInProgress,
                    _ => RejectReason::NoOrderSelected,
                };
                self.state = other;
                tracing::debug!(reason = %reason, "Delivery transition refused");
                self.metrics.record_transition_failure("transition_rejected");
                return Err(OrderError::TransitionRejected(reason));
            }
        };

        self.state = LookupState::Transitioning(previous.clone());
        self.error = None;
        self.success_message = None;

        let delivered_at = self.clock.now();
        let updates = vec![
            FieldUpdate::Status(OrderStatus::Delivered),
            FieldUpdate::DeliveredAt(delivered_at),
        ];

        let store = Arc::clone(&self.store);
        let id = previous.id;
        let write = updates.clone();
        let result = retry_on_transient(&self.retry, "mark_delivered", |_attempt| {
            let store = Arc::clone(&store);
            let write = write.clone();
            async move { store.update_fields(id, &write).await }
        })
        .await
        .into_result();

        match result {
            Ok(()) => {
                let mut record = previous;
                record.apply_updates(&updates);
                tracing::info!(
                    order_id = %record.id,
                    invoice = %record.invoice_number,
                    delivered_at = %delivered_at,
                    "✅ Order marked as delivered"
                );
                self.metrics.deliveries_marked.inc();
                self.success_message = Some(DELIVERED_MESSAGE);
                self.state = LookupState::Found(record.clone());
                Ok(record)
            }
            Err(err) => {
                tracing::error!(order_id = %id, error = %err, "Failed to update order status");
                self.metrics.record_transition_failure("persistence_failed");
                let error = OrderError::PersistenceFailed(err);
                self.state = LookupState::Found(previous);
                self.error = Some(error.clone());
                Err(error)
            }
        }
    }

    /// Back to `Idle` with an empty input box. Also clears a `Transitioning`
    /// state left by a cancelled `mark_delivered`.
    pub fn reset(&mut self) {
        self.state = LookupState::Idle;
        self.error = None;
        self.success_message = None;
        self.input.clear();
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::domain::order::{Customer, LineItem, OrderId};
    use crate::store::{InMemoryOrderStore, PageQuery, StoreError};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 13, 5, 0).unwrap()
    }

    fn order(invoice: &str, status: OrderStatus) -> OrderRecord {
        OrderRecord::new(
            invoice,
            Utc.with_ymd_and_hms(2026, 10, 17, 12, 30, 0).unwrap(),
            Customer::new("Kiran", "kiran@campus.edu"),
            vec![LineItem::new("Veg Biryani", 90.0, 1)],
            0.05,
        )
        .with_status(status)
    }

    fn lookup_for(store: Arc<dyn OrderStore>, policy: DuplicatePolicy) -> InvoiceLookup {
        InvoiceLookup::new(
            store,
            LookupConfig { duplicate_policy: policy },
            RetryConfig::none(),
            Arc::new(FixedClock::new(now())),
            Arc::new(ConsoleMetrics::new().unwrap()),
        )
    }

    /// Reads succeed, writes always fail.
    struct ReadOnlyStore(InMemoryOrderStore);

    #[async_trait]
    impl OrderStore for ReadOnlyStore {
        async fn query(&self, query: &PageQuery) -> Result<Vec<OrderRecord>, StoreError> {
            self.0.query(query).await
        }

        async fn query_exact(&self, key: &ExactMatch) -> Result<Vec<OrderRecord>, StoreError> {
            self.0.query_exact(key).await
        }

        async fn update_fields(&self, _id: OrderId, _updates: &[FieldUpdate]) -> Result<(), StoreError> {
            Err(StoreError::Backend("permission denied".into()))
        }
    }

    /// Every call fails.
    struct DownStore;

    #[async_trait]
    impl OrderStore for DownStore {
        async fn query(&self, _query: &PageQuery) -> Result<Vec<OrderRecord>, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }

        async fn query_exact(&self, _key: &ExactMatch) -> Result<Vec<OrderRecord>, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }

        async fn update_fields(&self, _id: OrderId, _updates: &[FieldUpdate]) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_blank_identifier_is_a_no_op() {
        let store = InMemoryOrderStore::with_records(vec![order("INV-0001", OrderStatus::Pending)]);
        let mut lookup = lookup_for(Arc::new(store.clone()), DuplicatePolicy::FirstMatch);

        assert!(lookup.lookup("   ").await.unwrap().is_none());
        assert_eq!(lookup.state(), &LookupState::Idle);
        assert_eq!(store.stats().exact_queries(), 0);
    }

    #[tokio::test]
    async fn test_lookup_trims_and_finds() {
        let target = order("INV-0001", OrderStatus::Pending);
        let store = InMemoryOrderStore::with_records(vec![target.clone()]);
        let mut lookup = lookup_for(Arc::new(store), DuplicatePolicy::FirstMatch);

        lookup.set_input("  INV-0001 ");
        let found = lookup.search().await.unwrap().cloned();
        assert_eq!(found, Some(target.clone()));
        assert_eq!(lookup.state(), &LookupState::Found(target));
        assert_eq!(lookup.input(), "INV-0001");
        assert!(lookup.is_deliverable());
    }

    #[tokio::test]
    async fn test_miss_clears_previous_order() {
        let store = InMemoryOrderStore::with_records(vec![order("INV-0001", OrderStatus::Pending)]);
        let mut lookup = lookup_for(Arc::new(store), DuplicatePolicy::FirstMatch);

        lookup.lookup("INV-0001").await.unwrap();
        let err = lookup.lookup("INV-9999").await.unwrap_err();

        assert!(matches!(err, OrderError::NotFound(ref invoice) if invoice.as_str() == "INV-9999"));
        assert_eq!(lookup.state(), &LookupState::NotFound);
        assert!(lookup.order().is_none());
        assert!(lookup.error().is_some());
    }

    #[tokio::test]
    async fn test_fetch_failure_clears_previous_order() {
        let mut lookup = lookup_for(Arc::new(DownStore), DuplicatePolicy::FirstMatch);
        let err = lookup.lookup("INV-0001").await.unwrap_err();
        assert!(matches!(err, OrderError::FetchFailed(_)));
        assert_eq!(lookup.state(), &LookupState::Failed);
        assert!(lookup.order().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_first_match() {
        let first = order("INV-DUP", OrderStatus::Pending);
        let second = order("INV-DUP", OrderStatus::InTransit);
        let store = InMemoryOrderStore::with_records(vec![first.clone(), second]);
        let mut lookup = lookup_for(Arc::new(store), DuplicatePolicy::FirstMatch);

        let found = lookup.lookup("INV-DUP").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn test_duplicate_reject() {
        let store = InMemoryOrderStore::with_records(vec![
            order("INV-DUP", OrderStatus::Pending),
            order("INV-DUP", OrderStatus::Pending),
        ]);
        let mut lookup = lookup_for(Arc::new(store), DuplicatePolicy::Reject);

        let err = lookup.lookup("INV-DUP").await.unwrap_err();
        assert!(matches!(err, OrderError::DuplicateInvoice { count: 2, .. }));
        assert_eq!(lookup.state(), &LookupState::Failed);
    }

    #[tokio::test]
    async fn test_mark_delivered_persists_and_mirrors() {
        let target = order("INV-0001", OrderStatus::InTransit);
        let store = InMemoryOrderStore::with_records(vec![target.clone()]);
        let mut lookup = lookup_for(Arc::new(store.clone()), DuplicatePolicy::FirstMatch);

        lookup.lookup("INV-0001").await.unwrap();
        let updated = lookup.mark_delivered().await.unwrap().clone();

        assert_eq!(updated.status, OrderStatus::Delivered);
        assert_eq!(updated.delivered_at, Some(now()));
        assert_eq!(lookup.success_message(), Some(DELIVERED_MESSAGE));
        assert!(!lookup.is_deliverable());

        let stored = store.get(target.id).unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Delivered);
        assert_eq!(stored.delivered_at, Some(now()));
    }

    #[tokio::test]
    async fn test_mark_delivered_twice_is_rejected_without_write() {
        let store = InMemoryOrderStore::with_records(vec![order("INV-0001", OrderStatus::Pending)]);
        let mut lookup = lookup_for(Arc::new(store.clone()), DuplicatePolicy::FirstMatch);

        lookup.lookup("INV-0001").await.unwrap();
        lookup.mark_delivered().await.unwrap();
        assert_eq!(store.stats().updates(), 1);

        let before = lookup.state().clone();
        let err = lookup.mark_delivered().await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::TransitionRejected(RejectReason::AlreadyDelivered(OrderStatus::Delivered))
        ));
        assert_eq!(store.stats().updates(), 1);
        assert_eq!(lookup.state(), &before);
        assert_eq!(lookup.success_message(), Some(DELIVERED_MESSAGE));
    }

    #[tokio::test]
    async fn test_mark_delivered_without_order() {
        let store = InMemoryOrderStore::new();
        let mut lookup = lookup_for(Arc::new(store.clone()), DuplicatePolicy::FirstMatch);

        let err = lookup.mark_delivered().await.unwrap_err();
        assert!(matches!(err, OrderError::TransitionRejected(RejectReason::NoOrderSelected)));
        assert_eq!(lookup.state(), &LookupState::Idle);
        assert_eq!(store.stats().updates(), 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_previous_status() {
        let target = order("INV-0001", OrderStatus::InTransit);
        let store = ReadOnlyStore(InMemoryOrderStore::with_records(vec![target.clone()]));
        let mut lookup = lookup_for(Arc::new(store), DuplicatePolicy::FirstMatch);

        lookup.lookup("INV-0001").await.unwrap();
        let err = lookup.mark_delivered().await.unwrap_err();

        assert!(matches!(err, OrderError::PersistenceFailed(StoreError::Backend(_))));
        assert_eq!(lookup.state(), &LookupState::Found(target));
        assert!(lookup.success_message().is_none());
        assert!(matches!(lookup.error(), Some(OrderError::PersistenceFailed(_))));
        assert!(lookup.is_deliverable());
    }

    /// Reads succeed, writes never complete.
    struct StalledWriteStore(InMemoryOrderStore);

    #[async_trait]
    impl OrderStore for StalledWriteStore {
        async fn query(&self, query: &PageQuery) -> Result<Vec<OrderRecord>, StoreError> {
            self.0.query(query).await
        }

        async fn query_exact(&self, key: &ExactMatch) -> Result<Vec<OrderRecord>, StoreError> {
            self.0.query_exact(key).await
        }

        async fn update_fields(&self, _id: OrderId, _updates: &[FieldUpdate]) -> Result<(), StoreError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancelled_transition_recovers_through_reset() {
        let target = order("INV-0001", OrderStatus::InTransit);
        let store = StalledWriteStore(InMemoryOrderStore::with_records(vec![target.clone()]));
        let mut lookup = lookup_for(Arc::new(store), DuplicatePolicy::FirstMatch);

        lookup.lookup("INV-0001").await.unwrap();
        let cancelled =
            tokio::time::timeout(std::time::Duration::from_millis(20), lookup.mark_delivered()).await;
        assert!(cancelled.is_err());
        assert_eq!(lookup.state(), &LookupState::Transitioning(target.clone()));
        assert_eq!(lookup.order(), Some(&target));

        let err = lookup.mark_delivered().await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::TransitionRejected(RejectReason::TransitionInProgress)
        ));
        assert_eq!(lookup.state(), &LookupState::Transitioning(target.clone()));

        lookup.reset();
        assert_eq!(lookup.state(), &LookupState::Idle);

        lookup.lookup("INV-0001").await.unwrap();
        assert_eq!(lookup.state(), &LookupState::Found(target));
        assert!(lookup.is_deliverable());
    }

    #[tokio::test]
    async fn test_reset_returns_to_idle() {
        let store = InMemoryOrderStore::with_records(vec![order("INV-0001", OrderStatus::Pending)]);
        let mut lookup = lookup_for(Arc::new(store), DuplicatePolicy::FirstMatch);

        lookup.lookup("INV-0001").await.unwrap();
        lookup.mark_delivered().await.unwrap();
        lookup.reset();

        assert_eq!(lookup.state(), &LookupState::Idle);
        assert!(lookup.error().is_none());
        assert!(lookup.success_message().is_none());
        assert!(lookup.input().is_empty());
    }
}
