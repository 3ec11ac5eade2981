//! Ledger configuration and parameters.
//!
//! Parameters are fixed when a ledger is created:
//! - Maturity horizon and fyToken supply limit
//! - The accepted collateral types and their minimum collateralization

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::constants::*;
use crate::utils::math::Ray;

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERAL IDENTIFIER
// ═══════════════════════════════════════════════════════════════════════════════

/// Name of a collateral type (e.g. `ETH-A`, `CHAI`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollateralId(String);

impl CollateralId {
    /// Create a collateral identifier
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Wrapped ether
    pub fn weth() -> Self {
        Self::new(WETH)
    }

    /// Savings-bearing chai
    pub fn chai() -> Self {
        Self::new(CHAI)
    }

    /// Identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollateralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERAL PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-collateral parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralParams {
    /// Collateral type
    pub id: CollateralId,
    /// Collateral value required per unit of present-value debt
    pub min_ratio: Ray,
}

impl CollateralParams {
    /// Create collateral parameters
    pub fn new(id: CollateralId, min_ratio: Ray) -> Self {
        Self { id, min_ratio }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Immutable ledger parameters (set at creation)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerParams {
    /// Furthest a new maturity may lie from creation time, in seconds
    pub max_maturity_horizon_secs: u64,

    /// Exclusive upper bound on each fyToken's total supply
    pub supply_limit: u128,

    /// Accepted collateral types
    pub collaterals: Vec<CollateralParams>,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            max_maturity_horizon_secs: MAX_MATURITY_HORIZON_SECS,
            supply_limit: SUPPLY_LIMIT,
            collaterals: vec![
                CollateralParams::new(CollateralId::weth(), Ray::from_raw(WETH_MIN_RATIO)),
                CollateralParams::new(CollateralId::chai(), Ray::from_raw(CHAI_MIN_RATIO)),
            ],
        }
    }
}

impl LedgerParams {
    /// Parameters with no collateral configured
    pub fn empty() -> Self {
        Self {
            collaterals: Vec::new(),
            ..Default::default()
        }
    }

    /// Add or replace a collateral type
    pub fn with_collateral(mut self, id: CollateralId, min_ratio: Ray) -> Self {
        self.collaterals.retain(|c| c.id != id);
        self.collaterals.push(CollateralParams::new(id, min_ratio));
        self
    }

    /// Override the maturity horizon
    pub fn with_horizon(mut self, secs: u64) -> Self {
        self.max_maturity_horizon_secs = secs;
        self
    }

    /// Override the supply limit
    pub fn with_supply_limit(mut self, limit: u128) -> Self {
        self.supply_limit = limit;
        self
    }

    /// Look up a collateral type
    pub fn collateral(&self, id: &CollateralId) -> Result<&CollateralParams> {
        self.collaterals
            .iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| Error::UnknownCollateral(id.to_string()))
    }

    /// Validate parameters are consistent
    pub fn validate(&self) -> Result<()> {
        if self.max_maturity_horizon_secs == 0 {
            return Err(Error::Config("maturity horizon must be positive".into()));
        }
        if self.supply_limit == 0 {
            return Err(Error::Config("supply limit must be positive".into()));
        }
        for (i, c) in self.collaterals.iter().enumerate() {
            if c.min_ratio.is_zero() {
                return Err(Error::Config(format!("collateral {} has a zero min_ratio", c.id)));
            }
            if self.collaterals[..i].iter().any(|prev| prev.id == c.id) {
                return Err(Error::Config(format!("collateral {} configured twice", c.id)));
            }
        }
        Ok(())
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let params: Self =
            serde_json::from_str(&content).map_err(|e| Error::Deserialization(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("{}: {}", parent.display(), e)))?;
        }

        std::fs::write(path, content).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}
