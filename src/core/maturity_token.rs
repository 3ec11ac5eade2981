//! fyToken: a claim redeemable 1:1 for base asset after maturity.
//!
//! This module implements the per-maturity token:
//! - Balance tracking, minting, burning and transfers
//! - The one-way `Active -> Matured` transition that pins growth indices
//! - Redemption for base asset through custody
//! - Flash issuance guarded against re-entrant redemption
//! - Redemption delegation

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Deref, DerefMut};

use crate::core::config::LedgerParams;
use crate::core::custody::CustodyLedger;
use crate::core::growth::{GrowthIndexSource, GrowthState};
use crate::error::{Error, Result};
use crate::protocol::events::{EventLog, LedgerEvent};
use crate::utils::address::{Address, Hash};
use crate::utils::constants::*;
use crate::utils::math::*;

// ═══════════════════════════════════════════════════════════════════════════════
// FLASH ISSUANCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Callback target of [`MaturityToken::flash_issue`]
///
/// The receiver holds `amount` extra fyTokens for the duration of the call
/// and must leave at least `amount` in its balance when it returns.
pub trait FlashIssueReceiver {
    /// Called while the issued tokens are in the receiver's balance
    fn on_flash_issue(
        &mut self,
        token: &mut MaturityToken,
        receiver: Address,
        amount: u128,
        data: &[u8],
    ) -> Result<()>;
}

/// Holds the token's re-entrancy flag for as long as it lives
struct FlashLock<'a> {
    token: &'a mut MaturityToken,
}

impl<'a> FlashLock<'a> {
    fn acquire(token: &'a mut MaturityToken) -> Result<Self> {
        if token.locked {
            return Err(Error::Locked);
        }
        token.locked = true;
        Ok(Self { token })
    }
}

impl Deref for FlashLock<'_> {
    type Target = MaturityToken;

    fn deref(&self) -> &MaturityToken {
        self.token
    }
}

impl DerefMut for FlashLock<'_> {
    fn deref_mut(&mut self) -> &mut MaturityToken {
        self.token
    }
}

impl Drop for FlashLock<'_> {
    fn drop(&mut self) {
        self.token.locked = false;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MATURITY TOKEN
// ═══════════════════════════════════════════════════════════════════════════════

/// A fyToken series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaturityToken {
    /// Token name
    pub name: String,
    /// Token symbol
    pub symbol: String,
    /// Maturity timestamp
    maturity: u64,
    /// Pinned indices, once matured
    growth: GrowthState,
    /// Exclusive upper bound on total supply
    supply_limit: u128,
    /// Total supply in face units
    total_supply: u128,
    /// Balances by account
    balances: BTreeMap<Address, u128>,
    /// (owner, delegate) pairs allowed to redeem for the owner
    delegates: BTreeSet<(Address, Address)>,
    /// Set while a flash issuance is outstanding
    #[serde(skip)]
    locked: bool,
    /// Recent events
    events: EventLog,
}

impl MaturityToken {
    /// Create a series maturing at `maturity`, with default limits
    pub fn new(maturity: u64, now: u64) -> Result<Self> {
        Self::with_params(maturity, now, &LedgerParams::default())
    }

    /// Create a series using the horizon and supply limit of `params`
    pub fn with_params(maturity: u64, now: u64, params: &LedgerParams) -> Result<Self> {
        let horizon = now.saturating_add(params.max_maturity_horizon_secs);
        if maturity <= now || maturity > horizon {
            return Err(Error::InvalidMaturity {
                maturity,
                now,
                horizon,
            });
        }

        Ok(Self {
            name: format!("fyDai-{}", maturity),
            symbol: format!("fyDAI{}", maturity),
            maturity,
            growth: GrowthState::Active,
            supply_limit: params.supply_limit,
            total_supply: 0,
            balances: BTreeMap::new(),
            delegates: BTreeSet::new(),
            locked: false,
            events: EventLog::default(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MATURITY
    // ═══════════════════════════════════════════════════════════════════════════

    /// Maturity timestamp
    pub fn maturity(&self) -> u64 {
        self.maturity
    }

    /// Check if the series has matured
    pub fn is_mature(&self) -> bool {
        self.growth.is_matured()
    }

    /// Current growth state
    pub fn growth_state(&self) -> GrowthState {
        self.growth
    }

    /// Savings index pinned at maturity
    pub fn chi0(&self) -> Option<Ray> {
        self.growth.chi0()
    }

    /// Borrow-cost index pinned at maturity
    pub fn rate0(&self) -> Option<Ray> {
        self.growth.rate0()
    }

    /// Mature the series, pinning the current indices of `indices`
    pub fn mature(&mut self, now: u64, indices: &dyn GrowthIndexSource) -> Result<()> {
        if self.is_mature() {
            return Err(Error::AlreadyMature);
        }
        if now < self.maturity {
            return Err(Error::TooEarly {
                now,
                maturity: self.maturity,
            });
        }

        let growth = GrowthState::freeze(indices)?;
        if let GrowthState::Matured { chi0, rate0 } = growth {
            tracing::info!(maturity = self.maturity, %chi0, %rate0, "series matured");
            self.events.emit(LedgerEvent::Matured {
                maturity: self.maturity,
                chi0,
                rate0,
                timestamp: now,
            });
        }
        self.growth = growth;
        Ok(())
    }

    /// Savings growth since maturity (1.0 before maturity)
    pub fn savings_growth(&self, indices: &dyn GrowthIndexSource) -> Result<Ray> {
        self.growth.savings_growth(indices)
    }

    /// Borrow-cost growth since maturity (1.0 before maturity)
    pub fn borrow_cost_growth(&self, indices: &dyn GrowthIndexSource) -> Result<Ray> {
        self.growth.borrow_cost_growth(indices)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SUPPLY MANAGEMENT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Get total supply
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Exclusive upper bound on total supply
    pub fn supply_limit(&self) -> u128 {
        self.supply_limit
    }

    /// Get balance of an account
    pub fn balance_of(&self, owner: &Address) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    /// Mint new tokens
    pub(crate) fn mint(&mut self, to: Address, amount: u128) -> Result<()> {
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }

        let new_supply = safe_add(self.total_supply, amount)?;
        if new_supply >= self.supply_limit {
            return Err(Error::SupplyLimitExceeded {
                requested: new_supply,
                limit: self.supply_limit,
            });
        }
        let new_balance = safe_add(self.balance_of(&to), amount)?;

        self.balances.insert(to, new_balance);
        self.total_supply = new_supply;
        Ok(())
    }

    /// Burn tokens
    pub(crate) fn burn(&mut self, from: Address, amount: u128) -> Result<()> {
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }

        let current_balance = self.balance_of(&from);
        if current_balance < amount {
            return Err(Error::InsufficientBalance {
                required: amount,
                available: current_balance,
            });
        }

        let new_balance = current_balance - amount;
        if new_balance == 0 {
            self.balances.remove(&from);
        } else {
            self.balances.insert(from, new_balance);
        }
        self.total_supply = safe_sub(self.total_supply, amount)?;
        Ok(())
    }

    /// Transfer tokens between accounts
    pub fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<()> {
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }

        let from_balance = self.balance_of(&from);
        if from_balance < amount {
            return Err(Error::InsufficientBalance {
                required: amount,
                available: from_balance,
            });
        }

        if from == to {
            return Ok(());
        }

        let new_to_balance = safe_add(self.balance_of(&to), amount)?;
        let new_from_balance = from_balance - amount;
        if new_from_balance == 0 {
            self.balances.remove(&from);
        } else {
            self.balances.insert(from, new_from_balance);
        }
        self.balances.insert(to, new_to_balance);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REDEMPTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Burn `amount` of `holder`'s tokens and pay `amount × savings growth`
    /// base asset to `to`, rounded down. Returns the base amount paid.
    pub fn redeem(
        &mut self,
        caller: Address,
        holder: Address,
        to: Address,
        amount: u128,
        indices: &dyn GrowthIndexSource,
        custody: &mut dyn CustodyLedger,
    ) -> Result<u128> {
        if self.locked {
            return Err(Error::Locked);
        }
        if !self.is_mature() {
            return Err(Error::NotMature);
        }
        if caller != holder && !self.is_delegate(&holder, &caller) {
            return Err(Error::Unauthorized(format!(
                "{} is neither holder nor delegate of {}",
                caller.short(),
                holder.short()
            )));
        }
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }
        let available = self.balance_of(&holder);
        if available < amount {
            return Err(Error::InsufficientBalance {
                required: amount,
                available,
            });
        }

        let base = ratio_mul_floor(amount, self.savings_growth(indices)?)?;
        custody.pull_base(to, base)?;
        self.burn(holder, amount)?;

        tracing::info!(
            maturity = self.maturity,
            holder = %holder.short(),
            face = amount,
            base,
            "redeemed"
        );
        self.events.emit(LedgerEvent::Redeemed {
            maturity: self.maturity,
            holder,
            to,
            face: amount,
            base,
        });
        Ok(base)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FLASH ISSUANCE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Check if a flash issuance is outstanding
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Issue `amount` to `receiver`, run its callback, then burn `amount`
    /// back from it. Any failure leaves the token exactly as it was.
    pub fn flash_issue<R>(
        &mut self,
        receiver: Address,
        amount: u128,
        data: &[u8],
        callback: &mut R,
    ) -> Result<()>
    where
        R: FlashIssueReceiver + ?Sized,
    {
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }
        let requested = safe_add(self.total_supply, amount)?;
        if requested >= self.supply_limit {
            return Err(Error::SupplyLimitExceeded {
                requested,
                limit: self.supply_limit,
            });
        }

        let snapshot = self.clone();
        let outcome = {
            let mut guard = FlashLock::acquire(self)?;
            guard.mint(receiver, amount).and_then(|_| {
                callback.on_flash_issue(&mut guard, receiver, amount, data)?;
                if guard.total_supply() != requested {
                    return Err(Error::InvariantViolation(format!(
                        "supply moved from {} to {} during flash issuance",
                        requested,
                        guard.total_supply()
                    )));
                }
                let available = guard.balance_of(&receiver);
                if available < amount {
                    return Err(Error::FlashRepaymentShortfall {
                        required: amount,
                        available,
                    });
                }
                guard.burn(receiver, amount)
            })
        };

        if let Err(e) = outcome {
            tracing::debug!(maturity = self.maturity, error = %e, "flash issuance reverted");
            *self = snapshot;
            return Err(e);
        }

        tracing::debug!(maturity = self.maturity, receiver = %receiver.short(), amount, "flash issuance settled");
        self.events.emit(LedgerEvent::FlashIssued {
            maturity: self.maturity,
            receiver,
            amount,
        });
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DELEGATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Check if `delegate` may redeem on behalf of `owner`
    pub fn is_delegate(&self, owner: &Address, delegate: &Address) -> bool {
        self.delegates.contains(&(*owner, *delegate))
    }

    /// Allow `delegate` to redeem on behalf of `owner`
    pub fn add_delegate(&mut self, owner: Address, delegate: Address) -> Result<()> {
        if !self.delegates.insert((owner, delegate)) {
            return Err(Error::AlreadyDelegated {
                owner: owner.to_hex(),
                delegate: delegate.to_hex(),
            });
        }
        tracing::debug!(owner = %owner.short(), delegate = %delegate.short(), "delegate added");
        self.events.emit(LedgerEvent::Delegate {
            user: owner,
            delegate,
            enabled: true,
        });
        Ok(())
    }

    /// Revoke a delegate of `owner`
    pub fn revoke_delegate(&mut self, owner: Address, delegate: Address) -> Result<()> {
        if !self.delegates.remove(&(owner, delegate)) {
            return Err(Error::NotDelegated {
                owner: owner.to_hex(),
                delegate: delegate.to_hex(),
            });
        }
        tracing::debug!(owner = %owner.short(), delegate = %delegate.short(), "delegate revoked");
        self.events.emit(LedgerEvent::Delegate {
            user: owner,
            delegate,
            enabled: false,
        });
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Get number of token holders
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Verify supply invariant (total_supply == sum of all balances)
    pub fn verify_supply_invariant(&self) -> bool {
        self.balances
            .values()
            .try_fold(0u128, |acc, b| acc.checked_add(*b))
            .map_or(false, |sum| sum == self.total_supply)
    }

    /// Recent events
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Hash of supply, balances and growth state
    pub fn state_hash(&self) -> Hash {
        let mut data = Vec::new();
        data.extend_from_slice(&self.maturity.to_be_bytes());
        data.extend_from_slice(&self.total_supply.to_be_bytes());
        if let GrowthState::Matured { chi0, rate0 } = self.growth {
            data.extend_from_slice(&chi0.raw().to_be_bytes());
            data.extend_from_slice(&rate0.raw().to_be_bytes());
        }

        // BTreeMap iteration is ordered, so the digest is deterministic
        for (owner, balance) in &self.balances {
            data.extend_from_slice(owner.as_bytes());
            data.extend_from_slice(&balance.to_be_bytes());
        }

        Hash::sha256(&data)
    }
}
