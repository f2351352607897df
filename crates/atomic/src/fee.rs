//! Dynamic fee computation.

use alloy_primitives::U256;
use snowfall_core::params::X2C_RATE;

use crate::error::TxError;

/// Fee for `gas` at `base_fee`, in native-asset base units.
///
/// `base_fee` is denominated in EVM wei (18 decimals); the result is in
/// native base units (8 decimals), so the wei total is divided by the
/// conversion rate, rounding up so fees never truncate to free.
pub fn dynamic_fee(gas: u64, base_fee: U256) -> Result<u64, TxError> {
    let total_wei = U256::from(gas)
        .checked_mul(base_fee)
        .ok_or(TxError::Overflow)?;

    let rate = U256::from(X2C_RATE);
    let (quotient, remainder) = total_wei.div_rem(rate);
    let fee = if remainder.is_zero() {
        quotient
    } else {
        quotient + U256::from(1u64)
    };

    u64::try_from(fee).map_err(|_| TxError::Overflow)
}
