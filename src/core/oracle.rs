//! Collateral prices.
//!
//! Prices are rays quoting one collateral unit in base-asset (debt) units.
//! How they are produced is outside the ledger.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::config::CollateralId;
use crate::error::{Error, Result};
use crate::utils::math::Ray;

/// Supplier of collateral prices in debt units
pub trait CollateralOracle {
    /// Price of one unit of `collateral`
    fn price(&self, collateral: &CollateralId) -> Result<Ray>;
}

/// Oracle with prices set by hand
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticPriceOracle {
    prices: BTreeMap<CollateralId, Ray>,
}

impl StaticPriceOracle {
    /// Create an oracle with no prices
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style price setter
    pub fn with_price(mut self, collateral: CollateralId, price: Ray) -> Self {
        self.set_price(collateral, price);
        self
    }

    /// Set or replace a price
    pub fn set_price(&mut self, collateral: CollateralId, price: Ray) {
        self.prices.insert(collateral, price);
    }
}

impl CollateralOracle for StaticPriceOracle {
    fn price(&self, collateral: &CollateralId) -> Result<Ray> {
        self.prices
            .get(collateral)
            .copied()
            .ok_or_else(|| Error::UnknownCollateral(collateral.to_string()))
    }
}
