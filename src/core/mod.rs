//! Core modules of the fyDai ledger.
//!
//! This module contains the fundamental building blocks:
//! - Configuration and ledger parameters
//! - Growth indices and the maturity freeze
//! - fyToken series (maturity tokens)
//! - Collateralized debt positions (the controller)
//! - Collaborator interfaces for custody and prices

pub mod config;
pub mod controller;
pub mod custody;
pub mod growth;
pub mod maturity_token;
pub mod oracle;
pub mod position;

pub use config::*;
pub use controller::*;
pub use custody::*;
pub use growth::*;
pub use maturity_token::*;
pub use oracle::*;
pub use position::*;
