//! Typed catalog operations.
//!
//! Each variant carries exactly the arguments its shape needs, so binding
//! an operation to the product service is an exhaustive match rather than
//! runtime argument inspection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{keys, NewProduct, Product, ProductChanges};
use crate::error::{CatalogError, CatalogResult};

/// Breaker key for each operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationName {
    GetAllProducts,
    GetActiveProducts,
    GetProductById,
    CreateProduct,
    UpdateProduct,
    ToggleActivate,
}

impl OperationName {
    pub const ALL: [OperationName; 6] = [
        OperationName::GetAllProducts,
        OperationName::GetActiveProducts,
        OperationName::GetProductById,
        OperationName::CreateProduct,
        OperationName::UpdateProduct,
        OperationName::ToggleActivate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OperationName::GetAllProducts => "getAllProducts",
            OperationName::GetActiveProducts => "getActiveProducts",
            OperationName::GetProductById => "getProductById",
            OperationName::CreateProduct => "createProduct",
            OperationName::UpdateProduct => "updateProduct",
            OperationName::ToggleActivate => "toggleActivate",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog operation with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    // no arguments
    GetAllProducts,
    GetActiveProducts,
    // id only
    GetProductById { id: i64 },
    ToggleActivate { id: i64 },
    // id + payload
    UpdateProduct { id: i64, changes: ProductChanges },
    // payload only
    CreateProduct(NewProduct),
}

impl Operation {
    pub fn name(&self) -> OperationName {
        match self {
            Operation::GetAllProducts => OperationName::GetAllProducts,
            Operation::GetActiveProducts => OperationName::GetActiveProducts,
            Operation::GetProductById { .. } => OperationName::GetProductById,
            Operation::ToggleActivate { .. } => OperationName::ToggleActivate,
            Operation::UpdateProduct { .. } => OperationName::UpdateProduct,
            Operation::CreateProduct(_) => OperationName::CreateProduct,
        }
    }

    /// Cache key a read is served from; `None` for mutations.
    pub fn cache_key(&self) -> Option<String> {
        match self {
            Operation::GetAllProducts => Some(keys::ALL_PRODUCTS.to_string()),
            Operation::GetActiveProducts => Some(keys::ACTIVE_PRODUCTS.to_string()),
            Operation::GetProductById { id } => Some(keys::product(*id)),
            _ => None,
        }
    }

    /// Keys a successful mutation must invalidate; empty for reads.
    pub fn invalidates(&self) -> Vec<String> {
        match self {
            Operation::CreateProduct(_) => keys::invalidated_by(None),
            Operation::UpdateProduct { id, .. } | Operation::ToggleActivate { id } => {
                keys::invalidated_by(Some(*id))
            }
            _ => Vec::new(),
        }
    }
}

/// Successful result of an operation. Serialized untagged, so a cached
/// list or product reads back as the same variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperationOutput {
    Products(Vec<Product>),
    Product(Product),
}

impl OperationOutput {
    pub fn into_products(self) -> CatalogResult<Vec<Product>> {
        match self {
            OperationOutput::Products(products) => Ok(products),
            OperationOutput::Product(_) => Err(CatalogError::internal(
                "operation returned a single product where a list was expected",
            )),
        }
    }

    pub fn into_product(self) -> CatalogResult<Product> {
        match self {
            OperationOutput::Product(product) => Ok(product),
            OperationOutput::Products(_) => Err(CatalogError::internal(
                "operation returned a list where a single product was expected",
            )),
        }
    }
}
