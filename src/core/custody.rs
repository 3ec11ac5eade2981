//! Custody of collateral and base asset.
//!
//! The ledger never holds funds itself. It instructs a [`CustodyLedger`]
//! to move collateral and base asset between users and the pooled reserve:
//! - *push* moves funds from a user into custody
//! - *pull* moves funds out of custody to a user
//!
//! [`InMemoryCustody`] is a complete implementation with per-user balances
//! and allowances granted to custody.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::config::CollateralId;
use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::math::{safe_add, safe_sub};

// ═══════════════════════════════════════════════════════════════════════════════
// CUSTODY TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Holder of pooled collateral and base asset
///
/// Each primitive either succeeds completely or fails with
/// [`Error::InsufficientFunds`] / [`Error::InsufficientAllowance`] and
/// leaves every balance unchanged.
pub trait CustodyLedger {
    /// Take `amount` collateral units from `from` into custody
    fn push_collateral(&mut self, collateral: &CollateralId, from: Address, amount: u128) -> Result<()>;

    /// Release `amount` collateral units from custody to `to`
    fn pull_collateral(&mut self, collateral: &CollateralId, to: Address, amount: u128) -> Result<()>;

    /// Take `amount` base asset units from `from` into custody
    fn push_base(&mut self, from: Address, amount: u128) -> Result<()>;

    /// Release `amount` base asset units from custody to `to`
    fn pull_base(&mut self, to: Address, amount: u128) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// ASSET
// ═══════════════════════════════════════════════════════════════════════════════

/// Asset held in custody
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Asset {
    /// The base asset fyTokens redeem into
    Base,
    /// A collateral type
    Collateral(CollateralId),
}

// ═══════════════════════════════════════════════════════════════════════════════
// IN-MEMORY CUSTODY
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory custody with wallet balances, allowances and reserves
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryCustody {
    /// Balances users hold outside custody
    wallets: BTreeMap<(Asset, Address), u128>,
    /// Amounts users allow custody to take
    allowances: BTreeMap<(Asset, Address), u128>,
    /// Pooled holdings of custody
    reserves: BTreeMap<Asset, u128>,
}

impl InMemoryCustody {
    /// Create empty custody
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit a user's wallet with freshly minted funds
    pub fn mint(&mut self, asset: Asset, to: Address, amount: u128) -> Result<()> {
        let balance = self.balance_of(&asset, &to);
        self.wallets.insert((asset, to), safe_add(balance, amount)?);
        Ok(())
    }

    /// Credit the reserve directly
    pub fn fund_reserve(&mut self, asset: Asset, amount: u128) -> Result<()> {
        let reserve = self.reserve_of(&asset);
        self.reserves.insert(asset, safe_add(reserve, amount)?);
        Ok(())
    }

    /// Set the amount custody may take from `owner`
    pub fn approve(&mut self, asset: Asset, owner: Address, amount: u128) {
        self.allowances.insert((asset, owner), amount);
    }

    /// Wallet balance of a user
    pub fn balance_of(&self, asset: &Asset, owner: &Address) -> u128 {
        self.wallets.get(&(asset.clone(), *owner)).copied().unwrap_or(0)
    }

    /// Remaining allowance of a user
    pub fn allowance_of(&self, asset: &Asset, owner: &Address) -> u128 {
        self.allowances.get(&(asset.clone(), *owner)).copied().unwrap_or(0)
    }

    /// Pooled holdings of custody
    pub fn reserve_of(&self, asset: &Asset) -> u128 {
        self.reserves.get(asset).copied().unwrap_or(0)
    }

    fn push(&mut self, asset: Asset, from: Address, amount: u128) -> Result<()> {
        let approved = self.allowance_of(&asset, &from);
        if approved < amount {
            return Err(Error::InsufficientAllowance {
                required: amount,
                approved,
            });
        }
        let available = self.balance_of(&asset, &from);
        if available < amount {
            return Err(Error::InsufficientFunds {
                required: amount,
                available,
            });
        }
        let reserve = safe_add(self.reserve_of(&asset), amount)?;

        self.allowances.insert((asset.clone(), from), approved - amount);
        self.wallets.insert((asset.clone(), from), available - amount);
        self.reserves.insert(asset, reserve);
        Ok(())
    }

    fn pull(&mut self, asset: Asset, to: Address, amount: u128) -> Result<()> {
        let available = self.reserve_of(&asset);
        if available < amount {
            return Err(Error::InsufficientFunds {
                required: amount,
                available,
            });
        }
        let balance = safe_add(self.balance_of(&asset, &to), amount)?;

        self.reserves.insert(asset.clone(), safe_sub(available, amount)?);
        self.wallets.insert((asset, to), balance);
        Ok(())
    }
}

impl CustodyLedger for InMemoryCustody {
    fn push_collateral(&mut self, collateral: &CollateralId, from: Address, amount: u128) -> Result<()> {
        self.push(Asset::Collateral(collateral.clone()), from, amount)
    }

    fn pull_collateral(&mut self, collateral: &CollateralId, to: Address, amount: u128) -> Result<()> {
        self.pull(Asset::Collateral(collateral.clone()), to, amount)
    }

    fn push_base(&mut self, from: Address, amount: u128) -> Result<()> {
        self.push(Asset::Base, from, amount)
    }

    fn pull_base(&mut self, to: Address, amount: u128) -> Result<()> {
        self.pull(Asset::Base, to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weth() -> Asset {
        Asset::Collateral(CollateralId::weth())
    }

    #[test]
    fn test_push_requires_allowance() {
        let mut custody = InMemoryCustody::new();
        let user = Address::derive("user");
        custody.mint(weth(), user, 100).unwrap();

        assert_eq!(
            custody.push_collateral(&CollateralId::weth(), user, 60),
            Err(Error::InsufficientAllowance { required: 60, approved: 0 })
        );

        custody.approve(weth(), user, 60);
        custody.push_collateral(&CollateralId::weth(), user, 60).unwrap();

        assert_eq!(custody.balance_of(&weth(), &user), 40);
        assert_eq!(custody.reserve_of(&weth()), 60);
        assert_eq!(custody.allowance_of(&weth(), &user), 0);
    }

    #[test]
    fn test_push_requires_funds() {
        let mut custody = InMemoryCustody::new();
        let user = Address::derive("user");
        custody.mint(Asset::Base, user, 10).unwrap();
        custody.approve(Asset::Base, user, 100);

        assert_eq!(
            custody.push_base(user, 11),
            Err(Error::InsufficientFunds { required: 11, available: 10 })
        );
        assert_eq!(custody.balance_of(&Asset::Base, &user), 10);
        assert_eq!(custody.allowance_of(&Asset::Base, &user), 100);
    }

    #[test]
    fn test_pull_from_reserve() {
        let mut custody = InMemoryCustody::new();
        let user = Address::derive("user");
        custody.fund_reserve(Asset::Base, 50).unwrap();

        assert!(custody.pull_base(user, 51).is_err());
        custody.pull_base(user, 50).unwrap();

        assert_eq!(custody.balance_of(&Asset::Base, &user), 50);
        assert_eq!(custody.reserve_of(&Asset::Base), 0);
    }

    #[test]
    fn test_assets_are_segregated() {
        let mut custody = InMemoryCustody::new();
        let user = Address::derive("user");
        custody.fund_reserve(Asset::Base, 50).unwrap();

        assert!(custody.pull_collateral(&CollateralId::weth(), user, 1).is_err());
        assert!(custody.pull_collateral(&CollateralId::chai(), user, 1).is_err());
    }
}
