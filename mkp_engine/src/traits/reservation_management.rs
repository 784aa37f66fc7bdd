use chrono::{DateTime, Duration, Utc};

use crate::{
    db_types::{NewReservation, PricedProductReservation},
    traits::{
        data_objects::{ExpiryResult, ReleaseResult, ReservationResult},
        StockError,
    },
};

/// Time-boxed holds of quantity against price offers.
#[allow(async_fn_in_trait)]
pub trait ReservationManagement: Clone {
    /// Holds `count` units of the offer under the reservation key, for `ttl` from `now`.
    ///
    /// A reservation with the same key (absent ids compare equal) is updated in place: its quantity is replaced and
    /// its expiry reset, even if it had already lapsed. The check against available stock ignores the quantity the
    /// key already holds. Fails with [`StockError::InsufficientStock`] if the offer cannot cover the request.
    /// A key that names an order requires that order to exist and still be `New`.
    ///
    /// Concurrent calls against the same offer are serialized, so they can never jointly oversell it.
    async fn reserve_priced_product(
        &self,
        reservation: NewReservation,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<ReservationResult, StockError>;

    /// Deletes a reservation and recomputes the product's minimum price.
    async fn release_reservation(&self, id: i64, now: DateTime<Utc>) -> Result<ReleaseResult, StockError>;

    async fn fetch_reservation(&self, id: i64) -> Result<Option<PricedProductReservation>, StockError>;

    async fn reservations_for_order(&self, order_id: i64) -> Result<Vec<PricedProductReservation>, StockError>;

    /// Marks `New` orders that are past their expiry as `Expired`, deletes every reservation that has lapsed at `now`
    /// and recomputes the minimum price of every product involved. All in one transaction.
    async fn expire_reservations(&self, now: DateTime<Utc>) -> Result<ExpiryResult, StockError>;
}
