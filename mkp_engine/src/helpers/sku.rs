use std::sync::OnceLock;

use regex::Regex;

fn sku_pattern() -> &'static Regex {
    static SKU: OnceLock<Regex> = OnceLock::new();
    SKU.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._\-]{0,63}$").expect("SKU pattern is a valid regex"))
}

/// SKUs are case-insensitive in the catalog, so they are stored upper-cased.
pub fn normalize_sku(sku: &str) -> String {
    sku.trim().to_ascii_uppercase()
}

pub fn is_valid_sku(sku: &str) -> bool {
    sku_pattern().is_match(sku)
}
