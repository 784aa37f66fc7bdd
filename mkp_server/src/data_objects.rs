use chrono::{DateTime, Utc};
use mkp_engine::{
    db_types::{Money, NewOrder, NewOrderLine, NewStockBalance, NewWarehouse, OrderStatusType},
    order_objects::OrderQueryFilter,
    price_objects::{Pagination, PriceQuery, ProductQueryFilter, DEFAULT_PAGE_SIZE},
};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrganizationRequest {
    pub name: String,
}

/// A warehouse for the caller's own organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWarehouseRequest {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

impl NewWarehouseRequest {
    pub fn into_warehouse(self, organization_id: i64) -> NewWarehouse {
        NewWarehouse { organization_id, name: self.name, address: self.address }
    }
}

/// Creates or replaces the caller's offer of a product at one of their warehouses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferRequest {
    pub warehouse_id: i64,
    pub product_id: i64,
    pub price: Money,
    pub amount: i64,
}

impl OfferRequest {
    pub fn into_offer(self, organization_id: i64) -> NewStockBalance {
        NewStockBalance::new(organization_id, self.warehouse_id, self.product_id, self.price, self.amount)
    }
}

/// An order for the authenticated customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub order_request_id: Option<i64>,
    #[serde(default)]
    pub memo: Option<String>,
    pub lines: Vec<NewOrderLine>,
}

impl PlaceOrderRequest {
    pub fn into_order(self, customer_id: i64) -> NewOrder {
        NewOrder { customer_id, order_request_id: self.order_request_id, memo: self.memo, lines: self.lines }
    }
}

/// Query string of the catalog search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductSearchParams {
    pub name: Option<String>,
    pub sku: Option<String>,
    #[serde(default)]
    pub in_stock: bool,
    pub offset: Option<i64>,
    pub count: Option<i64>,
}

impl ProductSearchParams {
    pub fn into_query(self) -> (ProductQueryFilter, Pagination) {
        let page = page(self.offset, self.count);
        (ProductQueryFilter { name: self.name, sku: self.sku, in_stock: self.in_stock }, page)
    }
}

/// Query string of the price view of a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceParams {
    #[serde(default)]
    pub in_stock_only: bool,
    pub offset: Option<i64>,
    pub count: Option<i64>,
}

impl From<PriceParams> for PriceQuery {
    fn from(params: PriceParams) -> Self {
        PriceQuery { in_stock_only: params.in_stock_only, page: page(params.offset, params.count) }
    }
}

fn page(offset: Option<i64>, count: Option<i64>) -> Pagination {
    Pagination::new(offset.unwrap_or(0), count.unwrap_or(DEFAULT_PAGE_SIZE))
}

/// Query string of the order search. `status` is a comma separated list, e.g. `status=New,Expired`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderSearchParams {
    pub customer_id: Option<i64>,
    pub organization_id: Option<i64>,
    pub order_request_id: Option<i64>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

impl TryFrom<OrderSearchParams> for OrderQueryFilter {
    type Error = ServerError;

    fn try_from(params: OrderSearchParams) -> Result<Self, Self::Error> {
        let status = match params.status {
            Some(s) => Some(
                s.split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| s.trim().parse::<OrderStatusType>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| ServerError::ValidationError(e.to_string()))?,
            ),
            None => None,
        };
        Ok(OrderQueryFilter {
            customer_id: params.customer_id,
            organization_id: params.organization_id,
            order_request_id: params.order_request_id,
            since: params.since,
            until: params.until,
            status,
        })
    }
}
