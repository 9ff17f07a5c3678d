use std::sync::Arc;

use crate::clock::Clock;
use crate::domain::order::{OrderError, OrderRecord};
use crate::metrics::ConsoleMetrics;
use crate::store::OrderStore;
use crate::utils::{retry_on_transient, RetryConfig};

use super::filters::{DateFilter, ListingFilters, StatusFilter};
use super::session::{FetchOutcome, FetchTicket, ListingConfig, ListingSession};

// ============================================================================
// Order Listing Engine
// ============================================================================
//
// Drives a `ListingSession` against the order store:
// filter/sort/cursor query -> page -> replace or append.
//
// Requests are issued one at a time: every operation takes `&mut self` and
// settles before returning.
//
// ============================================================================

pub struct OrderListing {
    store: Arc<dyn OrderStore>,
    session: ListingSession,
    config: ListingConfig,
    retry: RetryConfig,
    clock: Arc<dyn Clock>,
    metrics: Arc<ConsoleMetrics>,
}

impl OrderListing {
    pub fn new(
        store: Arc<dyn OrderStore>,
        config: ListingConfig,
        retry: RetryConfig,
        clock: Arc<dyn Clock>,
        metrics: Arc<ConsoleMetrics>,
    ) -> Self {
        Self {
            store,
            session: ListingSession::new(ListingFilters::default()),
            config,
            retry,
            clock,
            metrics,
        }
    }

    pub fn session(&self) -> &ListingSession {
        &self.session
    }

    pub fn config(&self) -> &ListingConfig {
        &self.config
    }

    /// Records currently shown, after any client-side narrowing.
    pub fn visible(&self) -> Vec<&OrderRecord> {
        self.session.visible()
    }

    /// Fetch a page. A fresh fetch replaces the accumulated set; a load-more
    /// appends to it.
    pub async fn fetch(&mut self, load_more: bool) -> Result<FetchOutcome, OrderError> {
        let now = self.clock.now();
        let Some(ticket) = self.session.begin_fetch(load_more, now, &self.config) else {
            tracing::debug!("No more orders to load");
            return Ok(FetchOutcome::Exhausted);
        };

        self.execute(ticket).await
    }

    /// Fetch the next page under the current filters.
    pub async fn load_more(&mut self) -> Result<FetchOutcome, OrderError> {
        self.fetch(true).await
    }

    /// Re-fetch page 1 under the current filters.
    pub async fn refresh(&mut self) -> Result<FetchOutcome, OrderError> {
        tracing::info!(status = %self.session.filters().status, "Refreshing order listing");
        self.session.reset_pagination();
        self.fetch(false).await
    }

    pub async fn change_status_filter(
        &mut self,
        status: StatusFilter,
    ) -> Result<FetchOutcome, OrderError> {
        tracing::info!(status = %status, "Status filter changed");
        self.session.set_status_filter(status);
        self.fetch(false).await
    }

    pub async fn change_date_filter(&mut self, date: DateFilter) -> Result<FetchOutcome, OrderError> {
        tracing::info!(date = ?date, "Date filter changed");
        self.session.set_date_filter(date);
        self.fetch(false).await
    }

    /// Narrow the already-fetched records. See [`ListingSession::client_search`].
    pub fn client_search(&mut self, text: &str) -> Vec<&OrderRecord> {
        self.session.client_search(text)
    }

    async fn execute(&mut self, ticket: FetchTicket) -> Result<FetchOutcome, OrderError> {
        let store = Arc::clone(&self.store);
        let query = ticket.query.clone();

        let result = retry_on_transient(&self.retry, "list_orders", |_attempt| {
            let store = Arc::clone(&store);
            let query = query.clone();
            async move { store.query(&query).await }
        })
        .await
        .into_result();

        if let Err(err) = &result {
            tracing::error!(error = %err, "Error fetching orders");
        }

        let outcome = self.session.complete_fetch(ticket, result, &self.config);
        match &outcome {
            Ok(FetchOutcome::Loaded { fetched, .. }) => {
                self.metrics.orders_fetched.inc_by(*fetched as u64);
            }
            Ok(FetchOutcome::Superseded) => self.metrics.stale_fetches_discarded.inc(),
            Ok(FetchOutcome::Exhausted) => {}
            Err(_) => self.metrics.fetch_failures.inc(),
        }
        outcome
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
