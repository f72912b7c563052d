//! Cache key layout.

/// Every product, ordered by id.
pub const ALL_PRODUCTS: &str = "products:all";

/// Active products only.
pub const ACTIVE_PRODUCTS: &str = "products:active";

/// A single product.
pub fn product(id: i64) -> String {
    format!("product:{id}")
}

/// Keys a mutation must invalidate. `id` is `None` for creates.
pub fn invalidated_by(id: Option<i64>) -> Vec<String> {
    let mut keys = vec![ALL_PRODUCTS.to_string(), ACTIVE_PRODUCTS.to_string()];
    if let Some(id) = id {
        keys.push(product(id));
    }
    keys
}
