//! Product records and input validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// Maximum product name length (characters).
pub const MAX_NAME_LEN: usize = 100;

/// A catalog product as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Store-generated identifier. Immutable.
    pub id: i64,
    pub name: String,
    pub price: f64,
    /// Whether the product is currently offered.
    pub activate: bool,
    pub created_at: DateTime<Utc>,
    /// Stamped by the store on every write.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    #[serde(default = "default_activate")]
    pub activate: bool,
}

fn default_activate() -> bool {
    true
}

/// Partial update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub activate: Option<bool>,
}

impl NewProduct {
    pub fn validate(&self) -> CatalogResult<()> {
        validate_name(&self.name)?;
        validate_price(self.price)
    }
}

impl ProductChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.price.is_none() && self.activate.is_none()
    }

    pub fn validate(&self) -> CatalogResult<()> {
        if self.is_empty() {
            return Err(CatalogError::invalid("update must change at least one field"));
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }

    /// Apply the changes to `product` in place.
    pub fn apply(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.trim().to_string();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(activate) = self.activate {
            product.activate = activate;
        }
    }
}

fn validate_name(name: &str) -> CatalogResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::invalid("product name is required"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(CatalogError::invalid(format!(
            "product name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_price(price: f64) -> CatalogResult<()> {
    if !price.is_finite() {
        return Err(CatalogError::invalid("price must be a valid number"));
    }
    if price <= 0.0 {
        return Err(CatalogError::invalid("price must be greater than 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;

    fn new_product(name: &str, price: f64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            price,
            activate: true,
        }
    }

    #[test]
    fn test_new_product_validation() {
        assert!(new_product("Monitor", 199.99).validate().is_ok());
        assert!(new_product("   ", 10.0).validate().is_err());
        assert!(new_product("Desk", 0.0).validate().is_err());
        assert!(new_product("Desk", -3.0).validate().is_err());
        assert!(new_product("Desk", f64::NAN).validate().is_err());
        assert!(new_product(&"x".repeat(MAX_NAME_LEN + 1), 1.0).validate().is_err());
    }

    #[test]
    fn test_validation_is_domain_error() {
        let err = new_product("", 1.0).validate().unwrap_err();
        assert!(matches!(err, CatalogError::Domain(DomainError::InvalidInput(_))));
    }

    #[test]
    fn test_changes_validation() {
        assert!(ProductChanges::default().validate().is_err());

        let price_only = ProductChanges {
            price: Some(19.99),
            ..Default::default()
        };
        assert!(price_only.validate().is_ok());

        let bad_name = ProductChanges {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(bad_name.validate().is_err());
    }

    #[test]
    fn test_apply_changes() {
        let now = Utc::now();
        let mut product = Product {
            id: 1,
            name: "X".into(),
            price: 9.99,
            activate: true,
            created_at: now,
            updated_at: now,
        };
        ProductChanges {
            price: Some(19.99),
            activate: Some(false),
            ..Default::default()
        }
        .apply(&mut product);

        assert_eq!(product.name, "X");
        assert_eq!(product.price, 19.99);
        assert!(!product.activate);
        assert_eq!(product.updated_at, now, "timestamps belong to the store");
    }

    #[test]
    fn test_timestamps_serialize_camel_case() {
        let now = Utc::now();
        let product = Product {
            id: 1,
            name: "X".into(),
            price: 9.99,
            activate: true,
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&product).unwrap();
        assert!(value["createdAt"].is_string());
        assert!(value["updatedAt"].is_string());
        let back: Product = serde_json::from_value(value).unwrap();
        assert_eq!(back, product);
    }

    #[test]
    fn test_activate_defaults_to_true() {
        let parsed: NewProduct = serde_json::from_str(r#"{"name":"Lamp","price":25.5}"#).unwrap();
        assert!(parsed.activate);
    }
}
