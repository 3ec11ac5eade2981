//! Growth indices and the maturity freeze.
//!
//! A series tracks two external indices: the savings index (`chi`) and the
//! borrow-cost index (`rate`). Both are pinned when the series matures and
//! every later query reports growth relative to the pinned values.
//!
//! Rounding follows how each ratio is used:
//! - savings growth multiplies payouts, so it rounds down
//! - borrow-cost growth multiplies debt, so it rounds up

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::math::Ray;

// ═══════════════════════════════════════════════════════════════════════════════
// INDEX SOURCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Read-only supplier of the two growth indices
///
/// Both indices are rays anchored at 1.0 and must never decrease.
pub trait GrowthIndexSource {
    /// Current savings index (`chi`)
    fn savings_index(&self) -> Result<Ray>;

    /// Current borrow-cost index (`rate`)
    fn borrow_index(&self) -> Result<Ray>;
}

/// Index source with values set by hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualIndexSource {
    savings: Ray,
    borrow: Ray,
}

impl Default for ManualIndexSource {
    fn default() -> Self {
        Self::new(Ray::ONE, Ray::ONE)
    }
}

impl ManualIndexSource {
    /// Create a source reporting the given indices
    pub fn new(savings: Ray, borrow: Ray) -> Self {
        Self { savings, borrow }
    }

    /// Move the savings index
    pub fn set_savings(&mut self, index: Ray) {
        self.savings = index;
    }

    /// Move the borrow-cost index
    pub fn set_borrow(&mut self, index: Ray) {
        self.borrow = index;
    }
}

impl GrowthIndexSource for ManualIndexSource {
    fn savings_index(&self) -> Result<Ray> {
        Ok(self.savings)
    }

    fn borrow_index(&self) -> Result<Ray> {
        Ok(self.borrow)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GROWTH STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Maturity state of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrowthState {
    /// Not yet matured; no index is pinned
    Active,
    /// Matured; indices pinned at the moment of `mature()`
    Matured {
        /// Savings index at maturity
        chi0: Ray,
        /// Borrow-cost index at maturity
        rate0: Ray,
    },
}

impl Default for GrowthState {
    fn default() -> Self {
        GrowthState::Active
    }
}

impl GrowthState {
    /// Pin the current indices of `source`
    pub fn freeze(source: &dyn GrowthIndexSource) -> Result<Self> {
        let chi0 = source.savings_index()?;
        let rate0 = source.borrow_index()?;
        if chi0.is_zero() || rate0.is_zero() {
            return Err(Error::InvalidParameter {
                name: "growth index".into(),
                reason: format!("indices must be positive, got chi {} rate {}", chi0, rate0),
            });
        }
        Ok(GrowthState::Matured { chi0, rate0 })
    }

    /// Check if matured
    pub fn is_matured(&self) -> bool {
        matches!(self, GrowthState::Matured { .. })
    }

    /// Savings index pinned at maturity
    pub fn chi0(&self) -> Option<Ray> {
        match self {
            GrowthState::Active => None,
            GrowthState::Matured { chi0, .. } => Some(*chi0),
        }
    }

    /// Borrow-cost index pinned at maturity
    pub fn rate0(&self) -> Option<Ray> {
        match self {
            GrowthState::Active => None,
            GrowthState::Matured { rate0, .. } => Some(*rate0),
        }
    }

    /// Borrow-cost growth since maturity: `max(1, ceil(rate / rate0))`
    pub fn borrow_cost_growth(&self, source: &dyn GrowthIndexSource) -> Result<Ray> {
        match self {
            GrowthState::Active => Ok(Ray::ONE),
            GrowthState::Matured { rate0, .. } => {
                let growth = source.borrow_index()?.div_ceil(*rate0)?;
                Ok(growth.max(Ray::ONE))
            }
        }
    }

    /// Savings growth since maturity: `floor(chi / chi0)`, never above
    /// the borrow-cost growth
    pub fn savings_growth(&self, source: &dyn GrowthIndexSource) -> Result<Ray> {
        match self {
            GrowthState::Active => Ok(Ray::ONE),
            GrowthState::Matured { chi0, .. } => {
                let growth = source.savings_index()?.div_floor(*chi0)?;
                let ceiling = self.borrow_cost_growth(source)?;
                if growth > ceiling {
                    tracing::warn!(
                        "savings growth {} exceeds borrow-cost growth {}, clamping",
                        growth,
                        ceiling
                    );
                    return Ok(ceiling);
                }
                Ok(growth)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::RAY;
    use proptest::prelude::*;

    fn ray(numerator: u128, denominator: u128) -> Ray {
        Ray::from_ratio(numerator, denominator).unwrap()
    }

    #[test]
    fn test_active_growth_is_one() {
        let source = ManualIndexSource::new(ray(3, 2), ray(2, 1));
        let state = GrowthState::Active;
        assert_eq!(state.savings_growth(&source).unwrap(), Ray::ONE);
        assert_eq!(state.borrow_cost_growth(&source).unwrap(), Ray::ONE);
        assert_eq!(state.chi0(), None);
        assert_eq!(state.rate0(), None);
    }

    #[test]
    fn test_freeze_pins_current_indices() {
        let source = ManualIndexSource::new(ray(6, 5), ray(7, 5));
        let state = GrowthState::freeze(&source).unwrap();
        assert_eq!(state.chi0(), Some(ray(6, 5)));
        assert_eq!(state.rate0(), Some(ray(7, 5)));
    }

    #[test]
    fn test_freeze_rejects_zero_index() {
        let source = ManualIndexSource::new(Ray::ZERO, Ray::ONE);
        assert!(GrowthState::freeze(&source).is_err());
    }

    #[test]
    fn test_borrow_cost_growth_rounds_up() {
        let mut source = ManualIndexSource::new(Ray::ONE, Ray::from_integer(3).unwrap());
        let state = GrowthState::freeze(&source).unwrap();
        source.set_borrow(Ray::from_integer(4).unwrap());

        // 4 / 3 = 1.333..., rounded up in the last place
        let growth = state.borrow_cost_growth(&source).unwrap();
        assert_eq!(growth.raw(), 1_333_333_333_333_333_333_333_333_334);
    }

    #[test]
    fn test_savings_growth_rounds_down() {
        let mut source = ManualIndexSource::new(Ray::from_integer(3).unwrap(), Ray::ONE);
        let state = GrowthState::freeze(&source).unwrap();
        source.set_savings(Ray::from_integer(4).unwrap());
        source.set_borrow(Ray::from_integer(2).unwrap());

        let growth = state.savings_growth(&source).unwrap();
        assert_eq!(growth.raw(), 1_333_333_333_333_333_333_333_333_333);
    }

    #[test]
    fn test_borrow_cost_growth_floored_at_one() {
        let mut source = ManualIndexSource::new(Ray::ONE, ray(3, 2));
        let state = GrowthState::freeze(&source).unwrap();
        source.set_borrow(Ray::ONE);
        assert_eq!(state.borrow_cost_growth(&source).unwrap(), Ray::ONE);
    }

    #[test]
    fn test_savings_growth_clamped_to_borrow_cost() {
        let mut source = ManualIndexSource::default();
        let state = GrowthState::freeze(&source).unwrap();
        source.set_savings(ray(3, 2));

        assert_eq!(
            state.savings_growth(&source).unwrap(),
            state.borrow_cost_growth(&source).unwrap()
        );
    }

    #[test]
    fn test_savings_growth_below_borrow_cost_is_exact() {
        let mut source = ManualIndexSource::default();
        let state = GrowthState::freeze(&source).unwrap();
        source.set_savings(ray(3, 2));
        source.set_borrow(ray(8, 5));

        assert_eq!(state.savings_growth(&source).unwrap(), ray(3, 2));
    }

    proptest! {
        #[test]
        fn prop_savings_never_exceeds_borrow_cost(
            chi0 in RAY..(3 * RAY),
            rate0 in RAY..(3 * RAY),
            chi_step in 0u128..(2 * RAY),
            rate_step in 0u128..(2 * RAY),
        ) {
            let mut source = ManualIndexSource::new(Ray::from_raw(chi0), Ray::from_raw(rate0));
            let state = GrowthState::freeze(&source).unwrap();
            source.set_savings(Ray::from_raw(chi0 + chi_step));
            source.set_borrow(Ray::from_raw(rate0 + rate_step));

            let savings = state.savings_growth(&source).unwrap();
            let borrow = state.borrow_cost_growth(&source).unwrap();
            prop_assert!(savings <= borrow);
            prop_assert!(borrow >= Ray::ONE);
        }
    }
}
