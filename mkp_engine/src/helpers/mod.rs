mod sku;
mod timing;

pub use sku::{is_valid_sku, normalize_sku};
pub use timing::{expiry_from, DEFAULT_RESERVATION_TTL};
