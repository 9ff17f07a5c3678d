use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::OrderError;
use super::value_objects::{Customer, InvoiceNumber, LineItem, OrderId, OrderStatus};

// ============================================================================
// Order Record - the persisted purchase as this crate sees it
// ============================================================================
//
// Created by checkout, outside this crate. Only `status` and `delivered_at`
// are ever written here, and only through `FieldUpdate`.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredOrderRecord")]
pub struct OrderRecord {
    pub id: OrderId,
    pub invoice_number: InvoiceNumber,
    pub date: DateTime<Utc>,

    pub status: OrderStatus,

    pub customer: Customer,
    #[serde(default)]
    pub items: Vec<LineItem>,

    #[serde(default)]
    pub subtotal: f64,
    /// Tax as a fraction of the subtotal (0.05 = 5%).
    #[serde(default)]
    pub tax: f64,
    #[serde(default)]
    pub total_amount: f64,

    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
}

/// A single field-level write against an order record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Status(OrderStatus),
    DeliveredAt(DateTime<Utc>),
}

impl FieldUpdate {
    pub fn field_name(&self) -> &'static str {
        match self {
            FieldUpdate::Status(_) => "status",
            FieldUpdate::DeliveredAt(_) => "deliveredAt",
        }
    }
}

impl OrderRecord {
    /// Build a record the way checkout would: totals derived from the items.
    pub fn new(
        invoice_number: impl Into<String>,
        date: DateTime<Utc>,
        customer: Customer,
        items: Vec<LineItem>,
        tax: f64,
    ) -> Self {
        let subtotal: f64 = items.iter().map(|item| item.subtotal).sum();
        Self {
            id: OrderId::new(),
            invoice_number: InvoiceNumber::new(invoice_number),
            date,
            status: OrderStatus::default(),
            customer,
            items,
            subtotal,
            tax,
            total_amount: subtotal + subtotal * tax,
            payment_id: None,
            delivered_at: None,
        }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    /// Apply field updates in order. Used by stores on write and by the
    /// lookup to mirror a successful write into its in-memory copy.
    pub fn apply_updates(&mut self, updates: &[FieldUpdate]) {
        for update in updates {
            match update {
                FieldUpdate::Status(status) => self.status = *status,
                FieldUpdate::DeliveredAt(at) => self.delivered_at = Some(*at),
            }
        }
    }

    /// Case-insensitive substring match over invoice number, customer name
    /// and customer email. `needle` must already be lowercase.
    pub fn matches_text(&self, needle: &str) -> bool {
        self.invoice_number.as_str().to_lowercase().contains(needle)
            || self.customer.name.to_lowercase().contains(needle)
            || self.customer.email.to_lowercase().contains(needle)
    }
}

/// An order document as stored upstream.
///
/// Checkout writes `deliveryStatus`; the scanner later adds `orderStatus`
/// next to it, so one document can carry both.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredOrderRecord {
    id: OrderId,
    invoice_number: InvoiceNumber,
    date: DateTime<Utc>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    delivery_status: Option<String>,
    #[serde(default)]
    order_status: Option<String>,
    customer: Customer,
    #[serde(default)]
    items: Vec<LineItem>,
    #[serde(default)]
    subtotal: f64,
    #[serde(default)]
    tax: f64,
    #[serde(default)]
    total_amount: f64,
    #[serde(default)]
    payment_id: Option<String>,
    #[serde(default)]
    delivered_at: Option<DateTime<Utc>>,
}

impl StoredOrderRecord {
    /// Precedence: `orderStatus` of Delivered, then `status`, then
    /// `deliveryStatus`, then any other `orderStatus`, then Pending.
    fn resolve_status(&self) -> Result<OrderStatus, OrderError> {
        let order_status = self.order_status.as_deref().map(OrderStatus::normalize).transpose()?;
        if order_status == Some(OrderStatus::Delivered) {
            return Ok(OrderStatus::Delivered);
        }

        if let Some(label) = self.status.as_deref().or(self.delivery_status.as_deref()) {
            return OrderStatus::normalize(label);
        }

        Ok(order_status.unwrap_or_default())
    }
}

impl TryFrom<StoredOrderRecord> for OrderRecord {
    type Error = OrderError;

    fn try_from(stored: StoredOrderRecord) -> Result<Self, Self::Error> {
        let status = stored.resolve_status()?;
        Ok(Self {
            id: stored.id,
            invoice_number: stored.invoice_number,
            date: stored.date,
            status,
            customer: stored.customer,
            items: stored.items,
            subtotal: stored.subtotal,
            tax: stored.tax,
            total_amount: stored.total_amount,
            payment_id: stored.payment_id,
            delivered_at: stored.delivered_at,
        })
    }
}
