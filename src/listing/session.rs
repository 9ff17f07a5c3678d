use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::Deserialize;

use crate::domain::order::{OrderError, OrderRecord};
use crate::store::{PageQuery, StoreCursor, StoreError};

use super::filters::{DateFilter, ListingFilters, StatusFilter};

// ============================================================================
// Listing Session - filter, cursor and accumulated pages as one value
// ============================================================================
//
// A fetch is split in two: `begin_fetch` composes the query and hands out a
// ticket stamped with the session generation, `complete_fetch` applies the
// store's answer. Every `begin_fetch` bumps the generation, so an answer that
// arrives after a newer request was issued is dropped instead of overwriting
// fresher state.
//
// The cursor remembers the filters it was produced under. A continuation is
// only issued when those still match; otherwise the fetch replaces the
// accumulated set instead of appending to it.
//
// ============================================================================

/// When the listing decides there is nothing left to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Only an empty page ends the listing. Costs one extra round trip after
    /// the last partial page.
    #[default]
    EmptyPage,
    /// A page shorter than the page size ends the listing.
    ShortPage,
}

impl ExhaustionPolicy {
    fn has_more(self, batch_len: usize, page_size: usize) -> bool {
        match self {
            ExhaustionPolicy::EmptyPage => batch_len > 0,
            ExhaustionPolicy::ShortPage => batch_len >= page_size,
        }
    }
}

/// Knobs of the listing engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub page_size: usize,
    pub exhaustion: ExhaustionPolicy,
    /// Offset from UTC, in minutes, where the "today" window starts.
    pub utc_offset_minutes: i32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            exhaustion: ExhaustionPolicy::default(),
            utc_offset_minutes: 0,
        }
    }
}

impl ListingConfig {
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).unwrap_or(Utc.fix())
    }
}

/// Continuation point, bound to the filter combination that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PageCursor {
    pub filters: ListingFilters,
    pub position: StoreCursor,
}

/// An issued request. Hand it back to [`ListingSession::complete_fetch`].
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub generation: u64,
    pub load_more: bool,
    pub filters: ListingFilters,
    pub query: PageQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The store answered and the session now reflects it.
    Loaded { fetched: usize, appended: bool },
    /// `load_more` on an exhausted listing; nothing was requested.
    Exhausted,
    /// A newer request was issued before this answer arrived.
    Superseded,
}

#[derive(Debug, Clone, Default)]
pub struct ListingSession {
    filters: ListingFilters,
    cursor: Option<PageCursor>,
    has_more: bool,
    accumulated: Vec<OrderRecord>,
    search: Option<String>,
    generation: u64,
    loading: bool,
    last_error: Option<OrderError>,
}

impl ListingSession {
    pub fn new(filters: ListingFilters) -> Self {
        Self {
            filters,
            has_more: true,
            ..Self::default()
        }
    }

    pub fn filters(&self) -> ListingFilters {
        self.filters
    }

    pub fn cursor(&self) -> Option<&PageCursor> {
        self.cursor.as_ref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_error(&self) -> Option<&OrderError> {
        self.last_error.as_ref()
    }

    /// Every record fetched in this session, in fetch order.
    pub fn accumulated(&self) -> &[OrderRecord] {
        &self.accumulated
    }

    pub fn search_text(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Records shown to the admin: the accumulated set, narrowed by the
    /// client-side search when one is active.
    pub fn visible(&self) -> Vec<&OrderRecord> {
        match &self.search {
            Some(needle) => self
                .accumulated
                .iter()
                .filter(|record| record.matches_text(needle))
                .collect(),
            None => self.accumulated.iter().collect(),
        }
    }

    /// Narrow the visible records to those whose invoice number, customer
    /// name or customer email contains `text`, ignoring case.
    ///
    /// Only already-fetched records are searched. The store is not queried
    /// and pagination is untouched. Whitespace in `text` is matched as typed;
    /// only the empty string clears the narrowing.
    pub fn client_search(&mut self, text: &str) -> Vec<&OrderRecord> {
        self.search = if text.is_empty() { None } else { Some(text.to_lowercase()) };
        self.visible()
    }

    /// Forget the cursor and any narrowing; the next fetch starts from page 1.
    pub fn reset_pagination(&mut self) {
        self.cursor = None;
        self.has_more = true;
        self.search = None;
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        self.filters.status = status;
        self.reset_pagination();
    }

    pub fn set_date_filter(&mut self, date: DateFilter) {
        self.filters.date = date;
        self.reset_pagination();
    }

    /// Compose the next request.
    ///
    /// Returns `None` when `load_more` is asked of an exhausted listing. A
    /// `load_more` without a cursor valid for the current filters is issued
    /// as a fresh fetch.
    pub fn begin_fetch(
        &mut self,
        load_more: bool,
        now: DateTime<Utc>,
        config: &ListingConfig,
    ) -> Option<FetchTicket> {
        if load_more && !self.has_more {
            return None;
        }

        let continuation = match &self.cursor {
            Some(cursor) if load_more && cursor.filters == self.filters => Some(cursor.position.clone()),
            _ => None,
        };
        let load_more = continuation.is_some();

        self.generation += 1;
        self.loading = true;
        self.last_error = None;

        let query = PageQuery {
            filters: self.filters.to_store_filters(now, config.offset()),
            start_after: continuation,
            limit: config.page_size,
        };

        tracing::debug!(
            generation = self.generation,
            load_more = load_more,
            status = %self.filters.status,
            date = ?self.filters.date,
            "Composed order page query"
        );

        Some(FetchTicket {
            generation: self.generation,
            load_more,
            filters: self.filters,
            query,
        })
    }

    /// Apply the store's answer to a ticket.
    ///
    /// On failure the accumulated set, cursor and `has_more` are left as
    /// they were and the error is kept for display.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<OrderRecord>, StoreError>,
        config: &ListingConfig,
    ) -> Result<FetchOutcome, OrderError> {
        if ticket.generation != self.generation {
            tracing::warn!(
                ticket = ticket.generation,
                current = self.generation,
                "Discarding superseded order page"
            );
            return Ok(FetchOutcome::Superseded);
        }

        self.loading = false;

        let batch = match result {
            Ok(batch) => batch,
            Err(err) => {
                let error = OrderError::FetchFailed(err);
                self.last_error = Some(error.clone());
                return Err(error);
            }
        };

        let fetched = batch.len();
        self.has_more = config.exhaustion.has_more(fetched, config.page_size);
        if let Some(last) = batch.last() {
            self.cursor = Some(PageCursor {
                filters: ticket.filters,
                position: StoreCursor::after(last),
            });
        }

        if ticket.load_more {
            self.accumulated.extend(batch);
        } else {
            self.accumulated = batch;
        }

        tracing::info!(
            fetched = fetched,
            total = self.accumulated.len(),
            has_more = self.has_more,
            appended = ticket.load_more,
            "Order page applied"
        );

        Ok(FetchOutcome::Loaded {
            fetched,
            appended: ticket.load_more,
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
