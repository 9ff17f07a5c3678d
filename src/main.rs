use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use campus_orders_admin::clock::{Clock, SystemClock};
use campus_orders_admin::config::ConsoleConfig;
use campus_orders_admin::domain::order::{
    format_amount, format_timestamp, Customer, InvoiceSummary, LineItem, OrderError, OrderRecord,
    OrderStatus,
};
use campus_orders_admin::listing::{DateFilter, OrderListing, StatusFilter};
use campus_orders_admin::lookup::InvoiceLookup;
use campus_orders_admin::metrics::ConsoleMetrics;
use campus_orders_admin::store::{InMemoryOrderStore, OrderStore};

const MENU: [(&str, f64); 4] = [
    ("Veg Thali", 80.0),
    ("Masala Dosa", 45.0),
    ("Paneer Roll", 60.0),
    ("Cold Coffee", 35.0),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConsoleConfig::load()?;

    // RUST_LOG wins over the configured filter.
    // Example: RUST_LOG=campus_orders_admin=trace cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    tracing::info!("🚀 Starting campus orders admin console demo");
    tracing::info!(
        page_size = config.listing.page_size,
        exhaustion = ?config.listing.exhaustion,
        duplicate_policy = ?config.lookup.duplicate_policy,
        "Configuration loaded"
    );

    // === 1. Seed an in-memory order store ===
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = InMemoryOrderStore::with_records(seed_orders(clock.now(), 24));
    tracing::info!(orders = store.len(), "Seeded order store");
    let store: Arc<dyn OrderStore> = Arc::new(store);

    let metrics = Arc::new(ConsoleMetrics::new()?);

    // === 2. Order listing ===
    let mut listing = OrderListing::new(
        Arc::clone(&store),
        config.listing.clone(),
        config.retry.clone(),
        Arc::clone(&clock),
        Arc::clone(&metrics),
    );

    listing.fetch(false).await?;
    while listing.session().has_more() {
        listing.load_more().await?;
    }
    tracing::info!(
        loaded = listing.session().accumulated().len(),
        "✅ Listing fully loaded"
    );

    listing
        .change_status_filter(StatusFilter::Only(OrderStatus::InTransit))
        .await?;
    listing.change_date_filter(DateFilter::Week).await?;
    tracing::info!(
        in_transit_this_week = listing.session().accumulated().len(),
        "Filters applied"
    );

    let hits = listing.client_search("student3").len();
    tracing::info!(hits, "Client search for \"student3\"");
    listing.client_search("");

    // === 3. Invoice lookup and delivery ===
    let mut lookup = InvoiceLookup::new(
        Arc::clone(&store),
        config.lookup.clone(),
        config.retry.clone(),
        Arc::clone(&clock),
        Arc::clone(&metrics),
    );

    lookup.set_input(" INV-0002 ");
    if let Some(order) = lookup.search().await? {
        let summary = InvoiceSummary::of(order);
        tracing::info!(
            invoice = %order.invoice_number,
            customer = %order.customer.name,
            status = %order.status,
            message = order.status.customer_message(),
            items = summary.item_count,
            total = %format_amount(summary.total_amount),
            "Invoice details"
        );
    }

    let delivered = lookup.mark_delivered().await?;
    tracing::info!(
        delivered_at = %format_timestamp(delivered.delivered_at),
        message = lookup.success_message().unwrap_or_default(),
        "Delivery recorded"
    );

    match lookup.mark_delivered().await {
        Err(OrderError::TransitionRejected(reason)) => {
            tracing::info!(reason = %reason, "Second delivery attempt refused as expected");
        }
        other => tracing::warn!(result = ?other.map(|r| r.status), "Unexpected transition result"),
    }

    if let Err(err) = lookup.lookup("INV-9999").await {
        tracing::info!(error = %err, "Lookup miss");
    }

    // === 4. Metrics snapshot ===
    println!("{}", metrics.render()?);

    tracing::info!("🎉 Demo complete!");
    Ok(())
}

fn seed_orders(now: chrono::DateTime<Utc>, count: usize) -> Vec<OrderRecord> {
    (0..count)
        .map(|i| {
            let (name, price) = MENU[i % MENU.len()];
            let status = match i % 3 {
                0 => OrderStatus::Delivered,
                1 => OrderStatus::InTransit,
                _ => OrderStatus::Pending,
            };
            let mut customer = Customer::new(
                format!("Student {}", i + 1),
                format!("student{}@campus.edu", i + 1),
            );
            customer.department = Some("CSE".to_string());

            let mut record = OrderRecord::new(
                format!("INV-{:04}", i + 1),
                now - Duration::hours(i as i64 * 9),
                customer,
                vec![LineItem::new(name, price, (i % 3 + 1) as u32)],
                0.05,
            )
            .with_status(status);
            if status.is_delivered() {
                record.delivered_at = Some(record.date + Duration::minutes(25));
            }
            record
        })
        .collect()
}
