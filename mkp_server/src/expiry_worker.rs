use log::*;
use mkp_engine::{db_types::Order, ReservationApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval`, the worker expires new orders whose reservation period has passed and releases lapsed
/// reservations, recomputing the catalog minimum price of every product whose availability changed.
pub fn start_expiry_worker(api: ReservationApi<SqliteDatabase>, interval: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("🕰️ Reservation expiry worker started");
        loop {
            timer.tick().await;
            trace!("🕰️ Running reservation expiry job");
            match api.expire_reservations().await {
                Ok(result) if result.is_empty() => {
                    trace!("🕰️ Nothing to expire");
                },
                Ok(result) => {
                    info!(
                        "🕰️ {} orders expired and {} reservations released. {} min prices changed",
                        result.expired_orders.len(),
                        result.released.len(),
                        result.price_changes.len()
                    );
                    debug!("🕰️ Expired orders: {}", order_list(&result.expired_orders));
                },
                Err(e) => {
                    error!("🕰️ Error running reservation expiry job: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] customer: {} seller: {}", o.id, o.customer_id, o.organization_id))
        .collect::<Vec<String>>()
        .join(", ")
}
