//! Core types for the Snowfall VM.
//!
//! This crate holds the pieces every other crate builds on: fixed-width
//! identifiers, the chain context handed to the VM at construction, the
//! network upgrade schedule, consensus-critical protocol parameters,
//! checked arithmetic, and recoverable secp256k1 signing with Ethereum-style
//! address derivation.

pub mod context;
pub mod crypto;
pub mod ids;
pub mod math;
pub mod params;
pub mod rules;

pub use context::ChainContext;
pub use ids::{Id, NodeId};
pub use math::MathError;
pub use rules::{Rules, ScheduleError, UpgradeSchedule};
