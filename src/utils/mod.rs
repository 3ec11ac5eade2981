//! Utility modules for the fyDai ledger.
//!
//! This module contains shared utilities used across the ledger:
//! - Ray fixed-point arithmetic with explicit rounding
//! - Account addresses and state hashes
//! - Constants

pub mod address;
pub mod constants;
pub mod math;

pub use address::*;
pub use constants::*;
pub use math::*;
