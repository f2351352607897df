//! Local export transaction construction.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use secp256k1::SecretKey;
use snowfall_atomic::{
    sort_inputs_and_signers, sort_transferable_outputs, EvmInput, StateDb, TransferOutput,
    TransferableOutput, Tx, UnsignedExportTx,
};
use snowfall_core::crypto::address_from_secret_key;
use snowfall_core::math::add64;
use snowfall_core::params::X2C_RATE;
use snowfall_core::Id;

use crate::vm::{Vm, VmError};

impl Vm {
    /// Build, sign, and statelessly verify an export of `amount` units of
    /// `asset_id` to `to` on the destination chain.
    ///
    /// The flat fee is always burned in the native asset; exports of other
    /// assets draw two sets of inputs. Inputs are selected greedily across
    /// `keys` at each account's current nonce.
    pub fn new_export_tx<S: StateDb>(
        &self,
        state: &S,
        asset_id: Id,
        amount: u64,
        to: Address,
        keys: &[SecretKey],
    ) -> Result<Tx, VmError> {
        let ctx = self.context();

        let (mut inputs, mut signers) = if asset_id == ctx.native_asset_id {
            let to_burn = add64(amount, ctx.flat_fee).map_err(snowfall_atomic::TxError::from)?;
            self.spendable_native(state, keys, to_burn)?
        } else {
            let (mut inputs, mut signers) = self.spendable_native(state, keys, ctx.flat_fee)?;
            let (asset_inputs, asset_signers) =
                self.spendable_multicoin(state, keys, asset_id, amount)?;
            inputs.extend(asset_inputs);
            signers.extend(asset_signers);
            (inputs, signers)
        };

        let mut exported_outputs = vec![TransferableOutput {
            asset_id,
            output: TransferOutput {
                amount,
                locktime: 0,
                threshold: 1,
                addresses: vec![to],
            },
        }];
        sort_transferable_outputs(&mut exported_outputs);
        sort_inputs_and_signers(&mut inputs, &mut signers);

        // An address spending through several inputs must continue its
        // nonce sequence across them, in input order. Assigned after the
        // sort; the (address, asset) ordering is unaffected by nonces.
        let mut per_address: HashMap<Address, u64> = HashMap::new();
        for input in &mut inputs {
            let offset = per_address.entry(input.address).or_insert(0);
            input.nonce = state
                .nonce(input.address)
                .checked_add(*offset)
                .ok_or(snowfall_atomic::TxError::Overflow)?;
            *offset += 1;
        }

        let unsigned = UnsignedExportTx {
            network_id: ctx.network_id,
            blockchain_id: ctx.chain_id,
            destination_chain: ctx.destination_chain_id,
            inputs,
            exported_outputs,
        };
        let tx = Tx::sign(unsigned, &signers)?;
        tx.unsigned
            .verify(ctx.destination_chain_id, ctx, &self.current_rules())?;
        Ok(tx)
    }

    /// Greedily gather native-asset inputs worth `total` base units.
    fn spendable_native<S: StateDb>(
        &self,
        state: &S,
        keys: &[SecretKey],
        total: u64,
    ) -> Result<(Vec<EvmInput>, Vec<SecretKey>), VmError> {
        let native = self.context().native_asset_id;
        let mut inputs = Vec::new();
        let mut signers = Vec::new();
        let mut remaining = total;

        for key in keys {
            if remaining == 0 {
                break;
            }
            let address = address_from_secret_key(key);
            // Wei balance floored to base units; dust below one base unit
            // cannot be exported.
            let balance =
                u64::try_from(state.balance(address) / U256::from(X2C_RATE)).unwrap_or(u64::MAX);
            if balance == 0 {
                continue;
            }
            let take = balance.min(remaining);
            inputs.push(EvmInput {
                address,
                amount: take,
                asset_id: native,
                nonce: state.nonce(address),
            });
            signers.push(*key);
            remaining -= take;
        }

        if remaining > 0 {
            return Err(VmError::InsufficientSpendableFunds);
        }
        Ok((inputs, signers))
    }

    /// Greedily gather `total` units of a non-native asset.
    fn spendable_multicoin<S: StateDb>(
        &self,
        state: &S,
        keys: &[SecretKey],
        asset_id: Id,
        total: u64,
    ) -> Result<(Vec<EvmInput>, Vec<SecretKey>), VmError> {
        let mut inputs = Vec::new();
        let mut signers = Vec::new();
        let mut remaining = total;

        for key in keys {
            if remaining == 0 {
                break;
            }
            let address = address_from_secret_key(key);
            let balance =
                u64::try_from(state.multicoin_balance(address, asset_id)).unwrap_or(u64::MAX);
            if balance == 0 {
                continue;
            }
            let take = balance.min(remaining);
            inputs.push(EvmInput {
                address,
                amount: take,
                asset_id,
                nonce: state.nonce(address),
            });
            signers.push(*key);
            remaining -= take;
        }

        if remaining > 0 {
            return Err(VmError::InsufficientSpendableFunds);
        }
        Ok((inputs, signers))
    }
}
