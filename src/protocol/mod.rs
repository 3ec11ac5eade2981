//! Protocol-level notifications.
//!
//! - Events emitted on maturity, delegation and position changes

pub mod events;

pub use events::*;
