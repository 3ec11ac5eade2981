//! Ledger events for state change notifications.
//!
//! Events are emitted for every successful state change so that external
//! observers can follow maturities, delegation and position activity.

use serde::{Deserialize, Serialize};

use crate::core::config::CollateralId;
use crate::utils::address::Address;
use crate::utils::constants::MAX_EVENTS;
use crate::utils::math::Ray;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// All ledger event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    // fyToken Events
    /// A series matured and pinned its indices
    Matured {
        /// Maturity timestamp of the series
        maturity: u64,
        /// Savings index pinned at maturity
        chi0: Ray,
        /// Borrow-cost index pinned at maturity
        rate0: Ray,
        /// Timestamp of the `mature()` call
        timestamp: u64,
    },
    /// A delegate was added or revoked
    Delegate {
        /// Delegating account
        user: Address,
        /// Delegate account
        delegate: Address,
        /// True when added, false when revoked
        enabled: bool,
    },
    /// fyTokens were redeemed for base asset
    Redeemed {
        /// Maturity of the series
        maturity: u64,
        /// Account whose fyTokens were burned
        holder: Address,
        /// Account receiving the base asset
        to: Address,
        /// Face units burned
        face: u128,
        /// Base asset units paid out
        base: u128,
    },
    /// A flash issuance settled
    FlashIssued {
        /// Maturity of the series
        maturity: u64,
        /// Receiver of the temporary issuance
        receiver: Address,
        /// Face units issued and burned
        amount: u128,
    },

    // Position Events
    /// Collateral was posted
    Posted {
        /// Collateral type
        collateral: CollateralId,
        /// Account credited
        user: Address,
        /// Collateral units
        amount: u128,
    },
    /// Collateral was withdrawn
    Withdrawn {
        /// Collateral type
        collateral: CollateralId,
        /// Account debited
        user: Address,
        /// Collateral units
        amount: u128,
    },
    /// fyTokens were borrowed against collateral
    Borrowed {
        /// Collateral type
        collateral: CollateralId,
        /// Maturity of the series
        maturity: u64,
        /// Account taking the debt
        user: Address,
        /// Face units borrowed
        amount: u128,
    },
    /// Debt was repaid
    Repaid {
        /// Collateral type
        collateral: CollateralId,
        /// Maturity of the series
        maturity: u64,
        /// Account whose debt was reduced
        user: Address,
        /// Face debt removed
        face: u128,
        /// Base asset or fyToken units taken from the payer
        paid: u128,
    },
}

impl LedgerEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Matured { .. } => "Matured",
            Self::Delegate { .. } => "Delegate",
            Self::Redeemed { .. } => "Redeemed",
            Self::FlashIssued { .. } => "FlashIssued",
            Self::Posted { .. } => "Posted",
            Self::Withdrawn { .. } => "Withdrawn",
            Self::Borrowed { .. } => "Borrowed",
            Self::Repaid { .. } => "Repaid",
        }
    }

    /// Check if this event touches an account
    pub fn involves(&self, account: &Address) -> bool {
        match self {
            Self::Matured { .. } => false,
            Self::Delegate { user, delegate, .. } => user == account || delegate == account,
            Self::Redeemed { holder, to, .. } => holder == account || to == account,
            Self::FlashIssued { receiver, .. } => receiver == account,
            Self::Posted { user, .. }
            | Self::Withdrawn { user, .. }
            | Self::Borrowed { user, .. }
            | Self::Repaid { user, .. } => user == account,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Bounded in-memory event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<LedgerEvent>,
    max_events: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(MAX_EVENTS)
    }
}

impl EventLog {
    /// Create a log that keeps at most `max_events` entries
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    /// Append an event (with pruning)
    pub fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);

        if self.events.len() > self.max_events {
            self.events.drain(0..self.events.len() - self.max_events);
        }
    }

    /// Recent events, oldest first
    pub fn recent(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Most recent event
    pub fn last(&self) -> Option<&LedgerEvent> {
        self.events.last()
    }

    /// Events for a specific account
    pub fn for_account(&self, account: &Address) -> Vec<&LedgerEvent> {
        self.events.iter().filter(|e| e.involves(account)).collect()
    }

    /// Number of events retained
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
