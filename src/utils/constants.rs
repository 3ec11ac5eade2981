//! Ledger constants.
//!
//! All protocol-wide constants are defined here for easy auditing.

// ═══════════════════════════════════════════════════════════════════════════════
// FIXED-POINT CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Ray scale factor (10^27), the unit of every growth index and ratio
pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;

/// Decimal places of a ray
pub const RAY_DECIMALS: u32 = 27;

// ═══════════════════════════════════════════════════════════════════════════════
// MATURITY CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Furthest a maturity may lie from creation time - 4 years in seconds
pub const MAX_MATURITY_HORIZON_SECS: u64 = 126_144_000;

/// Exclusive upper bound on fyToken total supply (2^112)
pub const SUPPLY_LIMIT: u128 = 1 << 112;

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERAL CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Collateral identifier for wrapped ether
pub const WETH: &str = "ETH-A";

/// Collateral identifier for savings-bearing chai
pub const CHAI: &str = "CHAI";

/// Minimum collateralization for volatile collateral - 150%
pub const WETH_MIN_RATIO: u128 = RAY / 2 * 3;

/// Minimum collateralization for savings-backed collateral - 100%
pub const CHAI_MIN_RATIO: u128 = RAY;

// ═══════════════════════════════════════════════════════════════════════════════
// MISC
// ═══════════════════════════════════════════════════════════════════════════════

/// Length of an account address in bytes
pub const ADDRESS_LENGTH: usize = 20;

/// Length of a state hash in bytes
pub const HASH_LENGTH: usize = 32;

/// Events kept in memory per component
pub const MAX_EVENTS: usize = 1000;
