//! Position records.

use serde::{Deserialize, Serialize};

use crate::core::config::CollateralId;
use crate::utils::address::Address;

/// Key of a debt position
///
/// Field order sets the sort order, so all maturities of one
/// (collateral, user) pair are adjacent in an ordered map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionKey {
    /// Collateral type backing the debt
    pub collateral: CollateralId,
    /// Borrower
    pub user: Address,
    /// Maturity of the fyToken series borrowed
    pub maturity: u64,
}

impl PositionKey {
    /// Create a position key
    pub fn new(collateral: CollateralId, user: Address, maturity: u64) -> Self {
        Self {
            collateral,
            user,
            maturity,
        }
    }

    /// First key of a (collateral, user) pair
    pub(crate) fn first(collateral: &CollateralId, user: Address) -> Self {
        Self::new(collateral.clone(), user, 0)
    }

    /// Last key of a (collateral, user) pair
    pub(crate) fn last(collateral: &CollateralId, user: Address) -> Self {
        Self::new(collateral.clone(), user, u64::MAX)
    }
}

/// Snapshot of a user's position in one series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Collateral units posted for the collateral type (shared by all maturities)
    pub posted: u128,
    /// Face debt in fyToken units
    pub debt: u128,
}

impl Position {
    /// Check if the position holds neither collateral nor debt
    pub fn is_empty(&self) -> bool {
        self.posted == 0 && self.debt == 0
    }
}
