//! Consensus-critical protocol parameters.
//!
//! These values must match across every node implementation. Changing any
//! of them is a network upgrade.

/// Entries kept per recently-gossiped set. Only 32-byte identifiers are
/// stored, so the sets stay small even at this size.
pub const RECENT_CACHE_SIZE: usize = 512;

/// Scaling factor between native-asset base units (8 decimals) and EVM
/// account balances (18 decimals).
pub const X2C_RATE: u64 = 1_000_000_000;

/// Gas charged per exported output.
pub const OUTPUT_GAS: u64 = 10_000;

/// Gas charged per byte of the signed transaction.
pub const TX_BYTES_GAS: u64 = 1;

/// Default flat transaction fee, in native-asset base units.
pub const DEFAULT_FLAT_FEE: u64 = 1_000_000;
