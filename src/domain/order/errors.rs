use crate::store::StoreError;

use super::value_objects::{InvoiceNumber, OrderStatus};

// ============================================================================
// Order Retrieval & Transition Errors
// ============================================================================
//
// None of these are fatal. Each is scoped to the operation that raised it and
// is surfaced to the admin for a retry.
//
// ============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum OrderError {
    #[error("Failed to fetch order data: {0}")]
    FetchFailed(#[source] StoreError),

    #[error("No order found with invoice number {0}")]
    NotFound(InvoiceNumber),

    #[error("Invoice number {invoice} matches {count} orders")]
    DuplicateInvoice { invoice: InvoiceNumber, count: usize },

    #[error("Cannot mark as delivered: {0}")]
    TransitionRejected(RejectReason),

    #[error("Failed to update order status: {0}")]
    PersistenceFailed(#[source] StoreError),

    #[error("Unknown order status: {0:?}")]
    UnknownStatus(String),
}

/// Why a delivery transition was refused before reaching the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("no order is selected")]
    NoOrderSelected,

    #[error("order is already {0}")]
    AlreadyDelivered(OrderStatus),

    #[error("a status update is already in progress")]
    TransitionInProgress,
}

impl OrderError {
    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::FetchFailed(_) => "fetch_failed",
            OrderError::NotFound(_) => "not_found",
            OrderError::DuplicateInvoice { .. } => "duplicate_invoice",
            OrderError::TransitionRejected(_) => "transition_rejected",
            OrderError::PersistenceFailed(_) => "persistence_failed",
            OrderError::UnknownStatus(_) => "unknown_status",
        }
    }
}
