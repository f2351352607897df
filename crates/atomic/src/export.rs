//! The EVM-side effect of an accepted export and the shared-memory write.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use snowfall_codec as codec;
use snowfall_core::params::X2C_RATE;
use snowfall_core::{ChainContext, Id};
use tracing::debug;

use crate::error::TxError;
use crate::shared_memory::{Batch, Element, PutRequests, SharedMemory, SharedMemoryError, Utxo};
use crate::state::StateDb;
use crate::tx::UnsignedExportTx;

impl UnsignedExportTx {
    /// Apply the EVM state mutation this export induces: debit every input
    /// and bump each spending account's nonce.
    ///
    /// Inputs are processed in transaction order. Each input's nonce must
    /// continue its address's sequence: the first input for an address
    /// matches the state nonce, every later input for that address matches
    /// the previous one plus one. The state nonce is written once per
    /// address after all inputs check out, as last observed plus one.
    pub fn evm_state_transfer<S: StateDb>(
        &self,
        ctx: &ChainContext,
        state: &mut S,
    ) -> Result<(), TxError> {
        let mut next_nonces: HashMap<Address, u64> = HashMap::new();

        for from in &self.inputs {
            if from.asset_id == ctx.native_asset_id {
                debug!(address = %from.address, amount = from.amount, "exporting native asset");
                // Native amounts are 8-decimal base units; scale to wei.
                let amount = U256::from(from.amount)
                    .checked_mul(U256::from(X2C_RATE))
                    .ok_or(TxError::Overflow)?;
                if state.balance(from.address) < amount {
                    return Err(TxError::InsufficientFunds {
                        address: from.address,
                        asset_id: from.asset_id,
                    });
                }
                state.sub_balance(from.address, amount);
            } else {
                debug!(
                    address = %from.address,
                    amount = from.amount,
                    asset_id = %from.asset_id,
                    "exporting multi-coin asset"
                );
                let amount = U256::from(from.amount);
                if state.multicoin_balance(from.address, from.asset_id) < amount {
                    return Err(TxError::InsufficientFunds {
                        address: from.address,
                        asset_id: from.asset_id,
                    });
                }
                state.sub_multicoin_balance(from.address, from.asset_id, amount);
            }

            let expected = match next_nonces.get(&from.address) {
                Some(next) => *next,
                None => state.nonce(from.address),
            };
            if expected != from.nonce {
                return Err(TxError::InvalidNonce {
                    address: from.address,
                    state: expected,
                    tx: from.nonce,
                });
            }
            next_nonces.insert(
                from.address,
                from.nonce.checked_add(1).ok_or(TxError::Overflow)?,
            );
        }

        for (address, nonce) in next_nonces {
            state.set_nonce(address, nonce);
        }
        Ok(())
    }

    /// Write this export's outputs to the destination chain's shared
    /// memory, under `batch` so the credit commits atomically with block
    /// acceptance.
    pub fn accept<M: SharedMemory + ?Sized>(
        &self,
        tx_id: Id,
        shared_memory: &M,
        batch: Batch,
    ) -> Result<(), SharedMemoryError> {
        let puts = self
            .exported_outputs
            .iter()
            .enumerate()
            .map(|(i, out)| {
                let utxo = Utxo::from_exported_output(tx_id, i as u32, out);
                Element {
                    key: utxo.input_id().as_bytes().to_vec(),
                    value: codec::to_bytes(&utxo),
                    traits: out
                        .output
                        .addresses
                        .iter()
                        .map(|addr| addr.as_slice().to_vec())
                        .collect(),
                }
            })
            .collect();

        shared_memory.apply(self.destination_chain, PutRequests { puts }, batch)
    }
}
