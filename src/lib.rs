//! # fyDai Ledger
//!
//! A fixed-yield debt accounting engine. Maturity-dated claim tokens
//! (fyDai) redeem 1:1 for a base asset after maturity, and a position
//! ledger tracks collateralized borrowing of those claims across several
//! collateral types and maturities.
//!
//! ## Architecture
//!
//! - **Growth**: Savings and borrow-cost indices pinned at maturity
//! - **MaturityToken**: Per-maturity fyToken with redemption, flash issuance and delegation
//! - **PositionLedger**: Posted collateral and face debt with the `power >= debt` check
//! - **Collaborators**: Custody, index source and price oracle traits with in-memory implementations
//!
//! ## Rounding
//!
//! Amounts a user owes round up. Amounts a user holds or receives round down.
//!
//! ## Example
//!
//! ```rust,ignore
//! use fydai::prelude::*;
//!
//! let mut ledger = PositionLedger::new(LedgerParams::default())?;
//! ledger.create_series(maturity, now)?;
//!
//! let mut ctx = LedgerContext::new(&indices, &oracle, &mut custody);
//! ledger.post(&CollateralId::weth(), user, user, 100, &mut ctx)?;
//! ledger.borrow(&CollateralId::weth(), maturity, user, user, 50, &mut ctx)?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod core;
pub mod error;
pub mod protocol;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        config::{CollateralId, CollateralParams, LedgerParams},
        controller::{LedgerContext, PositionLedger},
        custody::{Asset, CustodyLedger, InMemoryCustody},
        growth::{GrowthIndexSource, GrowthState, ManualIndexSource},
        maturity_token::{FlashIssueReceiver, MaturityToken},
        oracle::{CollateralOracle, StaticPriceOracle},
        position::{Position, PositionKey},
    };
    pub use crate::error::{Error, Result};
    pub use crate::protocol::events::{EventLog, LedgerEvent};
    pub use crate::utils::{
        address::{Address, Hash},
        math::Ray,
    };
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Ledger name
pub const PROTOCOL_NAME: &str = "fyDai";
