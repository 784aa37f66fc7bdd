//! Query and result types for catalog listings and the per-product price view.
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Money, StockBalance},
    traits::OfferAvailability,
};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_count")]
    pub count: i64,
}

fn default_count() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for Pagination {
    fn default() -> Self {
        Self { offset: 0, count: DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    pub fn new(offset: i64, count: i64) -> Self {
        Self { offset, count }
    }

    /// Rejects negative values and clamps `count` to [`MAX_PAGE_SIZE`].
    pub fn validated(self) -> Result<Self, String> {
        if self.offset < 0 {
            return Err(format!("offset cannot be negative ({})", self.offset));
        }
        if self.count < 0 {
            return Err(format!("count cannot be negative ({})", self.count));
        }
        Ok(Self { offset: self.offset, count: self.count.min(MAX_PAGE_SIZE) })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQueryFilter {
    /// Case-insensitive substring of the product name
    pub name: Option<String>,
    pub sku: Option<String>,
    /// Only products that currently have a minimum price, i.e. some available stock
    #[serde(default)]
    pub in_stock: bool,
}

impl ProductQueryFilter {
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_sku<S: Into<String>>(mut self, sku: S) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn in_stock(mut self) -> Self {
        self.in_stock = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.sku.is_none() && !self.in_stock
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuery {
    #[serde(default)]
    pub in_stock_only: bool,
    #[serde(flatten)]
    pub page: Pagination,
}

impl PriceQuery {
    pub fn in_stock_only(mut self) -> Self {
        self.in_stock_only = true;
        self
    }

    pub fn with_page(mut self, offset: i64, count: i64) -> Self {
        self.page = Pagination::new(offset, count);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedOffer {
    #[serde(flatten)]
    pub offer: StockBalance,
    pub reserved: i64,
    pub available: i64,
}

impl From<OfferAvailability> for PricedOffer {
    fn from(value: OfferAvailability) -> Self {
        Self { offer: value.offer, reserved: value.reserved, available: value.available }
    }
}

/// The offers of one product at one warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehousePrices {
    pub warehouse_id: i64,
    pub warehouse_name: String,
    pub organization_id: i64,
    pub min_price: Option<Money>,
    pub total_available: i64,
    pub offers: Vec<PricedOffer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPrices {
    pub product_id: i64,
    /// Minimum over every group, not just the returned page
    pub min_price: Option<Money>,
    pub total_groups: i64,
    pub offset: i64,
    pub count: i64,
    pub warehouses: Vec<WarehousePrices>,
}

impl ProductPrices {
    /// Groups the offers of a single product by warehouse and pages over the groups.
    pub fn from_offers(product_id: i64, offers: Vec<OfferAvailability>, query: PriceQuery) -> Self {
        let mut groups: Vec<WarehousePrices> = Vec::new();
        for offer in offers {
            if query.in_stock_only && offer.available <= 0 {
                continue;
            }
            let idx = match groups.iter().position(|g| g.warehouse_id == offer.offer.warehouse_id) {
                Some(i) => i,
                None => {
                    groups.push(WarehousePrices {
                        warehouse_id: offer.offer.warehouse_id,
                        warehouse_name: offer.warehouse_name.clone(),
                        organization_id: offer.offer.organization_id,
                        min_price: None,
                        total_available: 0,
                        offers: Vec::new(),
                    });
                    groups.len() - 1
                },
            };
            let group = &mut groups[idx];
            if offer.available > 0 {
                group.total_available += offer.available;
                group.min_price = Some(group.min_price.map_or(offer.offer.price, |p| p.min(offer.offer.price)));
            }
            group.offers.push(PricedOffer::from(offer));
        }
        for group in &mut groups {
            group.offers.sort_by_key(|o| (o.offer.price, o.offer.id));
        }
        groups.sort_by_key(|g| (g.min_price.is_none(), g.min_price, g.warehouse_id));
        let min_price = groups.iter().filter_map(|g| g.min_price).min();
        let total_groups = groups.len() as i64;
        let page = query.page;
        let warehouses =
            groups.into_iter().skip(page.offset.max(0) as usize).take(page.count.max(0) as usize).collect::<Vec<_>>();
        Self { product_id, min_price, total_groups, offset: page.offset, count: warehouses.len() as i64, warehouses }
    }
}
