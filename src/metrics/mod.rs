use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

// ============================================================================
// Metrics Module - Prometheus metrics for the admin console
// ============================================================================
//
// Counts what the console asks of the order store:
// - Order pages fetched, failed, and discarded as superseded
// - Invoice lookups by outcome
// - Delivery transitions completed or refused
//
// Rendered in the Prometheus text format on demand.
// ============================================================================

pub struct ConsoleMetrics {
    registry: Registry,

    // Listing Metrics
    pub orders_fetched: IntCounter,
    pub fetch_failures: IntCounter,
    pub stale_fetches_discarded: IntCounter,

    // Lookup Metrics
    pub lookups: IntCounterVec,

    // Transition Metrics
    pub deliveries_marked: IntCounter,
    pub transition_failures: IntCounterVec,
}

impl ConsoleMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_fetched = IntCounter::new(
            "orders_fetched_total",
            "Total order records fetched by the listing",
        )?;
        registry.register(Box::new(orders_fetched.clone()))?;

        let fetch_failures = IntCounter::new(
            "order_fetch_failures_total",
            "Total order page fetches that failed",
        )?;
        registry.register(Box::new(fetch_failures.clone()))?;

        let stale_fetches_discarded = IntCounter::new(
            "stale_fetches_discarded_total",
            "Order pages dropped because a newer request superseded them",
        )?;
        registry.register(Box::new(stale_fetches_discarded.clone()))?;

        let lookups = IntCounterVec::new(
            Opts::new("order_lookups_total", "Invoice lookups by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(lookups.clone()))?;

        let deliveries_marked = IntCounter::new(
            "deliveries_marked_total",
            "Orders transitioned to Delivered",
        )?;
        registry.register(Box::new(deliveries_marked.clone()))?;

        let transition_failures = IntCounterVec::new(
            Opts::new(
                "delivery_transition_failures_total",
                "Delivery transitions refused or failed",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(transition_failures.clone()))?;

        Ok(Self {
            registry,
            orders_fetched,
            fetch_failures,
            stale_fetches_discarded,
            lookups,
            deliveries_marked,
            transition_failures,
        })
    }

    pub fn record_lookup(&self, outcome: &str) {
        self.lookups.with_label_values(&[outcome]).inc();
    }

    pub fn record_transition_failure(&self, reason: &str) {
        self.transition_failures.with_label_values(&[reason]).inc();
    }

    /// Encode every registered metric in the Prometheus text format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = ConsoleMetrics::new().unwrap();
        metrics.orders_fetched.inc_by(3);
        assert_eq!(metrics.orders_fetched.get(), 3);
    }

    #[test]
    fn test_record_lookup_by_outcome() {
        let metrics = ConsoleMetrics::new().unwrap();
        metrics.record_lookup("found");
        metrics.record_lookup("found");
        metrics.record_lookup("not_found");

        assert_eq!(metrics.lookups.with_label_values(&["found"]).get(), 2);
        assert_eq!(metrics.lookups.with_label_values(&["not_found"]).get(), 1);
    }

    #[test]
    fn test_render_text_format() {
        let metrics = ConsoleMetrics::new().unwrap();
        metrics.deliveries_marked.inc();
        metrics.record_transition_failure("transition_rejected");

        let text = metrics.render().unwrap();
        assert!(text.contains("deliveries_marked_total 1"));
        assert!(text.contains("delivery_transition_failures_total{reason=\"transition_rejected\"} 1"));
    }
}
