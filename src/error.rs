//! Error types for the fyDai ledger.
//!
//! Every fallible operation in the crate reports one of these variants
//! synchronously. None of them are retried internally.

use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the fyDai ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Maturity Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Maturity is not strictly in the future or lies beyond the horizon
    #[error("Invalid maturity {maturity}: must be in ({now}, {horizon}]")]
    InvalidMaturity {
        /// Requested maturity timestamp
        maturity: u64,
        /// Timestamp at creation
        now: u64,
        /// Latest accepted maturity
        horizon: u64,
    },

    /// Operation requires a matured token
    #[error("fyToken is not mature")]
    NotMature,

    /// `mature()` was already called successfully
    #[error("fyToken is already mature")]
    AlreadyMature,

    /// `mature()` called before the maturity timestamp
    #[error("Too early to mature: now {now}, maturity {maturity}")]
    TooEarly {
        /// Current timestamp
        now: u64,
        /// Maturity timestamp
        maturity: u64,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Caller is neither the holder nor one of its delegates
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// Re-entrancy guard is held by a flash issuance
    #[error("fyToken is locked by an in-flight flash issuance")]
    Locked,

    /// Delegate already present for this owner
    #[error("{delegate} is already a delegate of {owner}")]
    AlreadyDelegated {
        /// Delegating account
        owner: String,
        /// Delegate account
        delegate: String,
    },

    /// Delegate not present for this owner
    #[error("{delegate} is not a delegate of {owner}")]
    NotDelegated {
        /// Delegating account
        owner: String,
        /// Delegate account
        delegate: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Supply Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Total supply would reach or exceed the limit
    #[error("Total supply limit exceeded: {requested} >= {limit}")]
    SupplyLimitExceeded {
        /// Supply after the issuance
        requested: u128,
        /// Exclusive supply limit
        limit: u128,
    },

    /// fyToken balance too low for a burn or transfer
    #[error("Insufficient fyToken balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Required amount
        required: u128,
        /// Available amount
        available: u128,
    },

    /// Flash issuance receiver did not return the issued amount
    #[error("Flash issuance not repaid: required {required}, returned {available}")]
    FlashRepaymentShortfall {
        /// Issued amount
        required: u128,
        /// Receiver balance at settlement
        available: u128,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Position Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Withdrawal would leave power below present-value debt
    #[error("Insufficient collateral: required {required}, available {available}")]
    InsufficientCollateral {
        /// Required amount
        required: u128,
        /// Available amount
        available: u128,
    },

    /// Borrow would take present-value debt above power
    #[error("Too much debt: debt {debt} exceeds power {power}")]
    DebtLimitExceeded {
        /// Present-value debt after the borrow
        debt: u128,
        /// Collateral power
        power: u128,
    },

    /// No series registered for this maturity
    #[error("Unknown series: {0}")]
    UnknownSeries(u64),

    /// Series already registered for this maturity
    #[error("Series already exists: {0}")]
    SeriesAlreadyExists(u64),

    /// Collateral type is not configured
    #[error("Unknown collateral: {0}")]
    UnknownCollateral(String),

    // ═══════════════════════════════════════════════════════════════════
    // Custody Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Custody balance too low
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Required amount
        required: u128,
        /// Available amount
        available: u128,
    },

    /// Custody allowance too low
    #[error("Insufficient allowance: required {required}, approved {approved}")]
    InsufficientAllowance {
        /// Required amount
        required: u128,
        /// Approved amount
        approved: u128,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Amount is zero
    #[error("Amount cannot be zero")]
    ZeroAmount,

    /// Overflow in calculation
    #[error("Arithmetic overflow in {operation}")]
    Overflow {
        /// Operation that overflowed
        operation: String,
    },

    /// Underflow in calculation
    #[error("Arithmetic underflow in {operation}")]
    Underflow {
        /// Operation that underflowed
        operation: String,
    },

    /// Division by zero
    #[error("Division by zero in {operation}")]
    DivisionByZero {
        /// Operation that divided by zero
        operation: String,
    },

    /// Invariant violation detected
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    // ═══════════════════════════════════════════════════════════════════
    // Configuration & Serialization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl Error {
    /// Returns true if the caller can succeed by changing inputs or waiting
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::TooEarly { .. }
                | Error::NotMature
                | Error::Locked
                | Error::InsufficientCollateral { .. }
                | Error::DebtLimitExceeded { .. }
                | Error::InsufficientFunds { .. }
                | Error::InsufficientAllowance { .. }
                | Error::InsufficientBalance { .. }
        )
    }

    /// Returns true if this is a critical error requiring immediate attention
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Error::InvariantViolation(_) | Error::Overflow { .. } | Error::Underflow { .. }
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Maturity errors: 1xxx
            Error::InvalidMaturity { .. } => 1001,
            Error::NotMature => 1002,
            Error::AlreadyMature => 1003,
            Error::TooEarly { .. } => 1004,

            // Authorization errors: 2xxx
            Error::Unauthorized(_) => 2001,
            Error::Locked => 2002,
            Error::AlreadyDelegated { .. } => 2003,
            Error::NotDelegated { .. } => 2004,

            // Supply errors: 3xxx
            Error::SupplyLimitExceeded { .. } => 3001,
            Error::InsufficientBalance { .. } => 3002,
            Error::FlashRepaymentShortfall { .. } => 3003,

            // Position errors: 4xxx
            Error::InsufficientCollateral { .. } => 4001,
            Error::DebtLimitExceeded { .. } => 4002,
            Error::UnknownSeries(_) => 4003,
            Error::SeriesAlreadyExists(_) => 4004,
            Error::UnknownCollateral(_) => 4005,

            // Custody errors: 5xxx
            Error::InsufficientFunds { .. } => 5001,
            Error::InsufficientAllowance { .. } => 5002,

            // Validation errors: 6xxx
            Error::InvalidParameter { .. } => 6001,
            Error::ZeroAmount => 6002,
            Error::Overflow { .. } => 6003,
            Error::Underflow { .. } => 6004,
            Error::DivisionByZero { .. } => 6005,
            Error::InvariantViolation(_) => 6006,

            // Configuration & serialization errors: 7xxx
            Error::Config(_) => 7001,
            Error::Serialization(_) => 7002,
            Error::Deserialization(_) => 7003,
        }
    }
}
