use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{NewReservation, PricedProductReservation},
    events::EventProducers,
    helpers::DEFAULT_RESERVATION_TTL,
    traits::{ExpiryResult, ReleaseResult, ReservationManagement, ReservationResult, StockError},
};

/// Holds stock against price offers for a limited time.
pub struct ReservationApi<B> {
    db: B,
    producers: EventProducers,
    ttl: Duration,
}

impl<B: Debug> Debug for ReservationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReservationApi ({:?}, ttl {})", self.db, self.ttl)
    }
}

impl<B> ReservationApi<B>
where B: ReservationManagement
{
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, ttl: DEFAULT_RESERVATION_TTL }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Reserves `count` units of an offer. Re-reserving under the same key replaces the quantity and extends the
    /// expiry.
    pub async fn reserve(&self, reservation: NewReservation) -> Result<ReservationResult, StockError> {
        let key = reservation.key.clone();
        let result = self.db.reserve_priced_product(reservation, self.ttl, Utc::now()).await?;
        debug!(
            "📦️ Reserved {} units for [{key}]. {} units remain available",
            result.reservation.quantity, result.available
        );
        if let Some(change) = &result.price_change {
            self.producers.publish_min_price_changes(std::slice::from_ref(change)).await;
        }
        Ok(result)
    }

    pub async fn release(&self, id: i64) -> Result<ReleaseResult, StockError> {
        let result = self.db.release_reservation(id, Utc::now()).await?;
        if let Some(change) = &result.price_change {
            self.producers.publish_min_price_changes(std::slice::from_ref(change)).await;
        }
        Ok(result)
    }

    pub async fn fetch_reservation(&self, id: i64) -> Result<Option<PricedProductReservation>, StockError> {
        self.db.fetch_reservation(id).await
    }

    pub async fn reservations_for_order(&self, order_id: i64) -> Result<Vec<PricedProductReservation>, StockError> {
        self.db.reservations_for_order(order_id).await
    }

    /// Runs the expiry sweep at the current time and notifies subscribers of expired orders and price changes.
    pub async fn expire_reservations(&self) -> Result<ExpiryResult, StockError> {
        let result = self.db.expire_reservations(Utc::now()).await?;
        self.producers.publish_order_annulled(&result.expired_orders).await;
        self.producers.publish_min_price_changes(&result.price_changes).await;
        Ok(result)
    }
}
