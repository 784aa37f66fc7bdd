use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{MinPriceChange, NewStockBalance, StockBalance},
    events::EventProducers,
    mkp_api::price_objects::{PriceQuery, ProductPrices},
    traits::{OfferAvailability, OfferUpdateResult, StockError, StockManagement},
};

/// Price offers and the minimum price shown in the catalog.
pub struct StockApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B: Debug> Debug for StockApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StockApi ({:?})", self.db)
    }
}

impl<B> StockApi<B>
where B: StockManagement
{
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    /// Publishes or replaces a seller's offer for a product at one of its warehouses.
    pub async fn upsert_offer(&self, offer: NewStockBalance) -> Result<OfferUpdateResult, StockError> {
        if offer.price.is_negative() {
            return Err(StockError::InvalidPrice(offer.price));
        }
        if offer.amount < 0 {
            return Err(StockError::InvalidAmount(offer.amount));
        }
        let result = self.db.upsert_stock_balance(offer, Utc::now()).await?;
        debug!("📦️ Offer #{} saved", result.offer.id);
        self.notify(result.price_change.as_ref()).await;
        Ok(result)
    }

    pub async fn fetch_offer(&self, id: i64) -> Result<Option<StockBalance>, StockError> {
        self.db.fetch_stock_balance(id).await
    }

    pub async fn offers_for_organization(&self, organization_id: i64) -> Result<Vec<OfferAvailability>, StockError> {
        self.db.offers_for_organization(organization_id, Utc::now()).await
    }

    /// Withdraws an offer. Fails while the offer has active reservations.
    pub async fn remove_offer(&self, id: i64) -> Result<OfferUpdateResult, StockError> {
        let result = self.db.remove_stock_balance(id, Utc::now()).await?;
        self.notify(result.price_change.as_ref()).await;
        Ok(result)
    }

    pub async fn update_product_min_price(&self, product_id: i64) -> Result<Option<MinPriceChange>, StockError> {
        let change = self.db.update_product_min_price(product_id, Utc::now()).await?;
        match &change {
            Some(c) => info!("📦️ Min price recomputed for {c}"),
            None => debug!("📦️ Min price of product #{product_id} is unchanged"),
        }
        self.notify(change.as_ref()).await;
        Ok(change)
    }

    /// The offers of a product, grouped by warehouse, cheapest available group first.
    pub async fn product_prices(&self, product_id: i64, query: PriceQuery) -> Result<ProductPrices, StockError> {
        let page = query.page.validated().map_err(StockError::InvalidQuery)?;
        let query = PriceQuery { page, ..query };
        let offers = self.db.offers_for_product(product_id, Utc::now()).await?;
        trace!("📦️ {} offers found for product #{product_id}", offers.len());
        Ok(ProductPrices::from_offers(product_id, offers, query))
    }

    async fn notify(&self, change: Option<&MinPriceChange>) {
        if let Some(change) = change {
            self.producers.publish_min_price_changes(std::slice::from_ref(change)).await;
        }
    }
}
