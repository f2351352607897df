//! Stateless and semantic verification of export transactions.
//!
//! `verify` is pure and deterministic; its result is part of consensus and
//! must agree bit-for-bit across implementations.

use alloy_primitives::{keccak256, U256};
use snowfall_core::crypto;
use snowfall_core::{ChainContext, Id, Rules};

use crate::error::TxError;
use crate::fee::dynamic_fee;
use crate::flow::FlowChecker;
use crate::input::inputs_sorted_and_unique;
use crate::output::transferable_outputs_sorted;
use crate::tx::{Tx, UnsignedExportTx};

impl UnsignedExportTx {
    /// Stateless well-formedness checks.
    pub fn verify(
        &self,
        destination_id: Id,
        ctx: &ChainContext,
        rules: &Rules,
    ) -> Result<(), TxError> {
        if self.destination_chain != destination_id {
            return Err(TxError::WrongChainId {
                expected: destination_id,
                actual: self.destination_chain,
            });
        }
        if self.exported_outputs.is_empty() {
            return Err(TxError::NoExportOutputs);
        }
        if self.network_id != ctx.network_id {
            return Err(TxError::WrongNetworkId {
                expected: ctx.network_id,
                actual: self.network_id,
            });
        }
        if self.blockchain_id != ctx.chain_id {
            return Err(TxError::WrongBlockchainId {
                expected: ctx.chain_id,
                actual: self.blockchain_id,
            });
        }

        for input in &self.inputs {
            input.verify()?;
        }
        for output in &self.exported_outputs {
            output.verify()?;
        }

        if !transferable_outputs_sorted(&self.exported_outputs) {
            return Err(TxError::OutputsNotSorted);
        }
        if rules.canonical_inputs && !inputs_sorted_and_unique(&self.inputs) {
            return Err(TxError::InputsNotSortedUnique);
        }

        Ok(())
    }

    /// Full validity: `verify` plus flow conservation and signature
    /// recovery against each input's address.
    ///
    /// `base_fee` is required once dynamic fee rules are active; before
    /// that the flat fee from the context applies.
    pub fn semantic_verify(
        &self,
        signed: &Tx,
        base_fee: Option<U256>,
        ctx: &ChainContext,
        rules: &Rules,
    ) -> Result<(), TxError> {
        self.verify(ctx.destination_chain_id, ctx, rules)?;

        let fee = if rules.dynamic_fee {
            let base_fee = base_fee.ok_or(TxError::MissingBaseFee)?;
            dynamic_fee(signed.gas()?, base_fee)?
        } else {
            ctx.flat_fee
        };

        let mut fc = FlowChecker::new();
        fc.produce(ctx.native_asset_id, fee)?;
        for output in &self.exported_outputs {
            fc.produce(output.asset_id, output.output.amount)?;
        }
        for input in &self.inputs {
            fc.consume(input.asset_id, input.amount)?;
        }
        fc.verify()?;

        if self.inputs.len() != signed.credentials.len() {
            return Err(TxError::SignatureInputsMismatch {
                inputs: self.inputs.len(),
                credentials: signed.credentials.len(),
            });
        }

        let digest = keccak256(signed.unsigned_bytes());
        for (i, (input, credential)) in
            self.inputs.iter().zip(&signed.credentials).enumerate()
        {
            credential.verify()?;
            let recovered = crypto::recover_address(digest, &credential.signature)
                .map_err(|_| TxError::PublicKeySignatureMismatch { input: i })?;
            if recovered != input.address {
                return Err(TxError::PublicKeySignatureMismatch { input: i });
            }
        }

        Ok(())
    }
}
