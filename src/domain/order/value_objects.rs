use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OrderError;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Store-assigned identifier of an order record. Immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Human-facing invoice number (e.g. `INV-0001`), used as the lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceNumber(pub String);

impl InvoiceNumber {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle label of an order.
///
/// The listing view and the invoice scanner historically used two different
/// vocabularies (`Not Delivered`/`In Transit`/... and
/// `Pending`/`Processing`/...). Both are folded into this one enum at the
/// store boundary via [`OrderStatus::normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    #[serde(rename = "Not Delivered")]
    NotDelivered,
    #[serde(rename = "In Transit")]
    InTransit,
    Delivered,
    Cancelled,
}

/// Display tone used when rendering a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Positive,
    Progress,
    Negative,
    Waiting,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::NotDelivered,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::NotDelivered => "Not Delivered",
            OrderStatus::InTransit => "In Transit",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Map an upstream label onto the closed vocabulary.
    ///
    /// Matching is case-insensitive and whitespace-tolerant. Aliases seen in
    /// older records (`completed`, `in progress`, `failed`) are accepted.
    pub fn normalize(label: &str) -> Result<Self, OrderError> {
        let folded = label
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        match folded.as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "not delivered" => Ok(OrderStatus::NotDelivered),
            "in transit" | "in progress" => Ok(OrderStatus::InTransit),
            "delivered" | "completed" => Ok(OrderStatus::Delivered),
            "cancelled" | "canceled" | "failed" => Ok(OrderStatus::Cancelled),
            _ => Err(OrderError::UnknownStatus(label.to_string())),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }

    pub fn tone(&self) -> StatusTone {
        match self {
            OrderStatus::Delivered => StatusTone::Positive,
            OrderStatus::InTransit | OrderStatus::Processing => StatusTone::Progress,
            OrderStatus::Cancelled => StatusTone::Negative,
            OrderStatus::Pending | OrderStatus::NotDelivered => StatusTone::Waiting,
        }
    }

    /// Customer-facing explanation shown next to the status badge.
    pub fn customer_message(&self) -> &'static str {
        match self {
            OrderStatus::Pending | OrderStatus::NotDelivered | OrderStatus::Processing => {
                "Your order is being prepared."
            }
            OrderStatus::InTransit => "Your order is on the way.",
            OrderStatus::Delivered => "Your order has been delivered.",
            OrderStatus::Cancelled => "This order has been cancelled.",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

/// Contact details captured at checkout. Read-only to this crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub roll_number: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub semester: Option<String>,
}

impl Customer {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    pub subtotal: f64,
}

impl LineItem {
    pub fn new(name: impl Into<String>, price: f64, quantity: u32) -> Self {
        Self {
            name: name.into(),
            price,
            quantity,
            subtotal: price * f64::from(quantity),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
