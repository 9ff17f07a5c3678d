use chrono::{DateTime, Utc};

use super::record::OrderRecord;

// ============================================================================
// Invoice Summary - derived figures shown on the invoice detail panel
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceSummary {
    pub item_count: u32,
    pub subtotal: f64,
    /// Tax rate as a whole percentage (0.05 -> 5).
    pub tax_percent: u32,
    pub tax_amount: f64,
    pub total_amount: f64,
}

impl InvoiceSummary {
    pub fn of(record: &OrderRecord) -> Self {
        let tax_amount = if record.tax > 0.0 { record.subtotal * record.tax } else { 0.0 };

        Self {
            item_count: record.items.iter().map(|item| item.quantity).sum(),
            subtotal: record.subtotal,
            tax_percent: (record.tax * 100.0).round().max(0.0) as u32,
            tax_amount,
            total_amount: record.total_amount,
        }
    }
}

/// Render a monetary amount with two decimals and the rupee sign.
pub fn format_amount(amount: f64) -> String {
    format!("₹{:.2}", amount)
}

/// Render an optional timestamp, or `N/A` when absent.
pub fn format_timestamp(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => at.format("%b %-d, %Y %H:%M").to_string(),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Customer, LineItem};
    use chrono::TimeZone;

    #[test]
    fn test_summary_figures() {
        let record = OrderRecord::new(
            "INV-0007",
            Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).unwrap(),
            Customer::new("Meera", "meera@campus.edu"),
            vec![LineItem::new("Paneer Roll", 70.0, 2), LineItem::new("Lassi", 40.0, 1)],
            0.18,
        );

        let summary = InvoiceSummary::of(&record);
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.subtotal, 180.0);
        assert_eq!(summary.tax_percent, 18);
        assert!((summary.tax_amount - 32.4).abs() < 1e-9);
        assert_eq!(format_amount(summary.total_amount), "₹212.40");
    }

    #[test]
    fn test_zero_tax() {
        let record = OrderRecord::new(
            "INV-0008",
            Utc::now(),
            Customer::new("Meera", "meera@campus.edu"),
            vec![LineItem::new("Tea", 10.0, 1)],
            0.0,
        );
        let summary = InvoiceSummary::of(&record);
        assert_eq!(summary.tax_percent, 0);
        assert_eq!(summary.tax_amount, 0.0);
    }

    #[test]
    fn test_format_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).unwrap();
        assert_eq!(format_timestamp(Some(at)), "May 4, 2026 09:30");
        assert_eq!(format_timestamp(None), "N/A");
    }
}
