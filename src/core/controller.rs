//! Collateralized debt positions across collateral types and maturities.
//!
//! The [`PositionLedger`] owns:
//! - Posted collateral per (collateral type, user)
//! - Face debt per (collateral type, user, maturity)
//! - The registered fyToken series
//!
//! Every call that can increase risk checks that collateral power covers
//! present-value debt across all of the user's open maturities for that
//! collateral type. Debt amounts round up, power and refunds round down.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::config::{CollateralId, LedgerParams};
use crate::core::custody::CustodyLedger;
use crate::core::growth::{GrowthIndexSource, GrowthState, ManualIndexSource};
use crate::core::maturity_token::MaturityToken;
use crate::core::oracle::CollateralOracle;
use crate::core::position::{Position, PositionKey};
use crate::error::{Error, Result};
use crate::protocol::events::{EventLog, LedgerEvent};
use crate::utils::address::{Address, Hash};
use crate::utils::math::*;

// ═══════════════════════════════════════════════════════════════════════════════
// CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// External collaborators a mutating call needs
pub struct LedgerContext<'a> {
    /// Savings and borrow-cost indices
    pub indices: &'a dyn GrowthIndexSource,
    /// Collateral prices in debt units
    pub oracle: &'a dyn CollateralOracle,
    /// Holder of collateral and base asset
    pub custody: &'a mut dyn CustodyLedger,
}

impl<'a> LedgerContext<'a> {
    /// Bundle collaborators for a call
    pub fn new(
        indices: &'a dyn GrowthIndexSource,
        oracle: &'a dyn CollateralOracle,
        custody: &'a mut dyn CustodyLedger,
    ) -> Self {
        Self {
            indices,
            oracle,
            custody,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// POSITION LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// The controller of all debt positions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionLedger {
    /// Immutable parameters
    params: LedgerParams,
    /// Registered series by maturity
    series: BTreeMap<u64, MaturityToken>,
    /// Posted collateral units
    posted: BTreeMap<(CollateralId, Address), u128>,
    /// Face debt; zero entries are removed
    debt: BTreeMap<PositionKey, u128>,
    /// Recent events
    events: EventLog,
}

impl PositionLedger {
    /// Create a ledger with no series
    pub fn new(params: LedgerParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            series: BTreeMap::new(),
            posted: BTreeMap::new(),
            debt: BTreeMap::new(),
            events: EventLog::default(),
        })
    }

    /// Ledger parameters
    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIES REGISTRY
    // ═══════════════════════════════════════════════════════════════════════════

    /// Register a fyToken series
    pub fn add_series(&mut self, token: MaturityToken) -> Result<()> {
        let maturity = token.maturity();
        if self.series.contains_key(&maturity) {
            return Err(Error::SeriesAlreadyExists(maturity));
        }
        tracing::info!(maturity, "series added");
        self.series.insert(maturity, token);
        Ok(())
    }

    /// Create and register a series maturing at `maturity`
    pub fn create_series(&mut self, maturity: u64, now: u64) -> Result<()> {
        if self.series.contains_key(&maturity) {
            return Err(Error::SeriesAlreadyExists(maturity));
        }
        let token = MaturityToken::with_params(maturity, now, &self.params)?;
        self.add_series(token)
    }

    /// Look up a series
    pub fn series(&self, maturity: u64) -> Result<&MaturityToken> {
        self.series.get(&maturity).ok_or(Error::UnknownSeries(maturity))
    }

    /// Look up a series for mutation
    pub fn series_mut(&mut self, maturity: u64) -> Result<&mut MaturityToken> {
        self.series.get_mut(&maturity).ok_or(Error::UnknownSeries(maturity))
    }

    /// Registered maturities in ascending order
    pub fn maturities(&self) -> Vec<u64> {
        self.series.keys().copied().collect()
    }

    /// Mature every series that is due and not yet matured.
    /// Returns the maturities matured by this call.
    ///
    /// The indices are read once, so every series matured together pins the
    /// same values and a failing source leaves all of them active.
    pub fn mature_all(&mut self, now: u64, indices: &dyn GrowthIndexSource) -> Result<Vec<u64>> {
        let due: Vec<u64> = self
            .series
            .iter()
            .filter(|(maturity, token)| !token.is_mature() && now >= **maturity)
            .map(|(maturity, _)| *maturity)
            .collect();
        if due.is_empty() {
            return Ok(due);
        }

        let pinned = match GrowthState::freeze(indices)? {
            GrowthState::Matured { chi0, rate0 } => ManualIndexSource::new(chi0, rate0),
            GrowthState::Active => {
                return Err(Error::InvariantViolation("index freeze left the series active".into()))
            }
        };
        for maturity in &due {
            self.series_mut(*maturity)?.mature(now, &pinned)?;
        }
        Ok(due)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Collateral units posted by `user`
    pub fn posted(&self, collateral: &CollateralId, user: &Address) -> u128 {
        self.posted
            .get(&(collateral.clone(), *user))
            .copied()
            .unwrap_or(0)
    }

    /// Face debt of `user` in one series
    pub fn debt_fy_dai(&self, collateral: &CollateralId, maturity: u64, user: &Address) -> u128 {
        self.debt
            .get(&PositionKey::new(collateral.clone(), *user, maturity))
            .copied()
            .unwrap_or(0)
    }

    /// Present-value debt of `user` in one series, rounded up
    pub fn debt_dai(
        &self,
        collateral: &CollateralId,
        maturity: u64,
        user: &Address,
        indices: &dyn GrowthIndexSource,
    ) -> Result<u128> {
        let series = self.series(maturity)?;
        let face = self.debt_fy_dai(collateral, maturity, user);
        if face == 0 {
            return Ok(0);
        }
        ratio_mul_ceil(face, series.borrow_cost_growth(indices)?)
    }

    /// Maturities in which `user` holds debt against `collateral`
    pub fn open_series(&self, collateral: &CollateralId, user: &Address) -> Vec<u64> {
        self.debt
            .range(PositionKey::first(collateral, *user)..=PositionKey::last(collateral, *user))
            .map(|(key, _)| key.maturity)
            .collect()
    }

    /// Present-value debt of `user` across all open maturities
    pub fn total_debt_dai(
        &self,
        collateral: &CollateralId,
        user: &Address,
        indices: &dyn GrowthIndexSource,
    ) -> Result<u128> {
        self.open_series(collateral, user)
            .into_iter()
            .try_fold(0u128, |total, maturity| {
                safe_add(total, self.debt_dai(collateral, maturity, user, indices)?)
            })
    }

    /// Collateral power of `user`: `floor(posted × price / min_ratio)`
    pub fn power_of(
        &self,
        collateral: &CollateralId,
        user: &Address,
        oracle: &dyn CollateralOracle,
    ) -> Result<u128> {
        self.power_for(collateral, self.posted(collateral, user), oracle)
    }

    /// Check that power covers present-value debt
    pub fn is_collateralized(
        &self,
        collateral: &CollateralId,
        user: &Address,
        indices: &dyn GrowthIndexSource,
        oracle: &dyn CollateralOracle,
    ) -> Result<bool> {
        Ok(self.power_of(collateral, user, oracle)? >= self.total_debt_dai(collateral, user, indices)?)
    }

    /// Minimum collateral units backing current debt, rounded up
    pub fn locked(
        &self,
        collateral: &CollateralId,
        user: &Address,
        indices: &dyn GrowthIndexSource,
        oracle: &dyn CollateralOracle,
    ) -> Result<u128> {
        let debt = self.total_debt_dai(collateral, user, indices)?;
        if debt == 0 {
            return Ok(0);
        }
        let min_ratio = self.params.collateral(collateral)?.min_ratio;
        let price = oracle.price(collateral)?;
        mul_div_ceil(debt, min_ratio.raw(), price.raw())
    }

    /// Posted collateral and face debt of `user` in one series
    pub fn position(&self, collateral: &CollateralId, maturity: u64, user: &Address) -> Position {
        Position {
            posted: self.posted(collateral, user),
            debt: self.debt_fy_dai(collateral, maturity, user),
        }
    }

    /// Recent events
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    fn power_for(&self, collateral: &CollateralId, units: u128, oracle: &dyn CollateralOracle) -> Result<u128> {
        let min_ratio = self.params.collateral(collateral)?.min_ratio;
        if units == 0 {
            return Ok(0);
        }
        let price = oracle.price(collateral)?;
        mul_div_floor(units, price.raw(), min_ratio.raw())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // COLLATERAL OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Move `amount` collateral from `from`'s wallet into `to`'s position
    pub fn post(
        &mut self,
        collateral: &CollateralId,
        from: Address,
        to: Address,
        amount: u128,
        ctx: &mut LedgerContext<'_>,
    ) -> Result<()> {
        self.params.collateral(collateral)?;
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }
        let new_posted = safe_add(self.posted(collateral, &to), amount)?;

        ctx.custody.push_collateral(collateral, from, amount)?;
        self.posted.insert((collateral.clone(), to), new_posted);

        tracing::info!(%collateral, user = %to.short(), amount, "collateral posted");
        self.events.emit(LedgerEvent::Posted {
            collateral: collateral.clone(),
            user: to,
            amount,
        });
        Ok(())
    }

    /// Move `amount` collateral from `from`'s position to `to`'s wallet.
    /// Fails if the remaining collateral no longer covers `from`'s debt.
    pub fn withdraw(
        &mut self,
        collateral: &CollateralId,
        from: Address,
        to: Address,
        amount: u128,
        ctx: &mut LedgerContext<'_>,
    ) -> Result<()> {
        self.params.collateral(collateral)?;
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }
        let posted = self.posted(collateral, &from);
        if posted < amount {
            return Err(Error::InsufficientCollateral {
                required: amount,
                available: posted,
            });
        }
        let remaining = posted - amount;

        let debt = self.total_debt_dai(collateral, &from, ctx.indices)?;
        let power = self.power_for(collateral, remaining, ctx.oracle)?;
        if power < debt {
            return Err(Error::InsufficientCollateral {
                required: debt,
                available: power,
            });
        }

        ctx.custody.pull_collateral(collateral, to, amount)?;
        if remaining == 0 {
            self.posted.remove(&(collateral.clone(), from));
        } else {
            self.posted.insert((collateral.clone(), from), remaining);
        }

        tracing::info!(%collateral, user = %from.short(), amount, "collateral withdrawn");
        self.events.emit(LedgerEvent::Withdrawn {
            collateral: collateral.clone(),
            user: from,
            amount,
        });
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DEBT OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Add `amount` face debt to `from` and mint `amount` fyTokens to `to`
    pub fn borrow(
        &mut self,
        collateral: &CollateralId,
        maturity: u64,
        from: Address,
        to: Address,
        amount: u128,
        ctx: &mut LedgerContext<'_>,
    ) -> Result<()> {
        self.params.collateral(collateral)?;
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }
        let growth = self.series(maturity)?.borrow_cost_growth(ctx.indices)?;

        let face = self.debt_fy_dai(collateral, maturity, &from);
        let new_face = safe_add(face, amount)?;
        let current = self.debt_dai(collateral, maturity, &from, ctx.indices)?;
        let others = safe_sub(self.total_debt_dai(collateral, &from, ctx.indices)?, current)?;
        let debt = safe_add(others, ratio_mul_ceil(new_face, growth)?)?;

        let power = self.power_of(collateral, &from, ctx.oracle)?;
        if debt > power {
            return Err(Error::DebtLimitExceeded { debt, power });
        }

        self.series_mut(maturity)?.mint(to, amount)?;
        self.debt
            .insert(PositionKey::new(collateral.clone(), from, maturity), new_face);

        tracing::info!(%collateral, maturity, user = %from.short(), amount, debt, power, "borrowed");
        self.events.emit(LedgerEvent::Borrowed {
            collateral: collateral.clone(),
            maturity,
            user: from,
            amount,
        });
        Ok(())
    }

    /// Burn up to `amount` of `from`'s fyTokens against `to`'s face debt.
    /// Returns the face amount repaid; any excess stays with `from`.
    pub fn repay_fy_dai(
        &mut self,
        collateral: &CollateralId,
        maturity: u64,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<u128> {
        self.params.collateral(collateral)?;
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }
        self.series(maturity)?;

        let face = self.debt_fy_dai(collateral, maturity, &to);
        let repaid = amount.min(face);
        if repaid == 0 {
            return Ok(0);
        }

        self.series_mut(maturity)?.burn(from, repaid)?;
        self.set_debt(collateral, maturity, to, face - repaid);

        tracing::info!(%collateral, maturity, user = %to.short(), face = repaid, "repaid in fyDai");
        self.events.emit(LedgerEvent::Repaid {
            collateral: collateral.clone(),
            maturity,
            user: to,
            face: repaid,
            paid: repaid,
        });
        Ok(repaid)
    }

    /// Repay `to`'s debt with up to `amount` base asset from `from`.
    /// Face debt falls by `floor(amount / borrow-cost growth)`, capped at
    /// the outstanding debt. Returns the base amount taken; when the debt
    /// is cleared only its present value is taken.
    pub fn repay_dai(
        &mut self,
        collateral: &CollateralId,
        maturity: u64,
        from: Address,
        to: Address,
        amount: u128,
        ctx: &mut LedgerContext<'_>,
    ) -> Result<u128> {
        self.params.collateral(collateral)?;
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }
        let growth = self.series(maturity)?.borrow_cost_growth(ctx.indices)?;

        let face = self.debt_fy_dai(collateral, maturity, &to);
        let reduction = ratio_div_floor(amount, growth)?.min(face);
        if reduction == 0 {
            return Ok(0);
        }
        let paid = if reduction == face {
            ratio_mul_ceil(face, growth)?
        } else {
            amount
        };

        ctx.custody.push_base(from, paid)?;
        self.set_debt(collateral, maturity, to, face - reduction);

        tracing::info!(%collateral, maturity, user = %to.short(), face = reduction, paid, "repaid in dai");
        self.events.emit(LedgerEvent::Repaid {
            collateral: collateral.clone(),
            maturity,
            user: to,
            face: reduction,
            paid,
        });
        Ok(paid)
    }

    fn set_debt(&mut self, collateral: &CollateralId, maturity: u64, user: Address, face: u128) {
        let key = PositionKey::new(collateral.clone(), user, maturity);
        if face == 0 {
            self.debt.remove(&key);
        } else {
            self.debt.insert(key, face);
        }
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

    /// Hash of positions and series states
    pub fn state_hash(&self) -> Hash {
        let mut data = Vec::new();

        for ((collateral, user), units) in &self.posted {
            data.extend_from_slice(collateral.as_str().as_bytes());
            data.extend_from_slice(user.as_bytes());
            data.extend_from_slice(&units.to_be_bytes());
        }
        for (key, face) in &self.debt {
            data.extend_from_slice(key.collateral.as_str().as_bytes());
            data.extend_from_slice(key.user.as_bytes());
            data.extend_from_slice(&key.maturity.to_be_bytes());
            data.extend_from_slice(&face.to_be_bytes());
        }
        for token in self.series.values() {
            data.extend_from_slice(token.state_hash().as_bytes());
        }

        Hash::sha256(&data)
    }
}
