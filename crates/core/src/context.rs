//! Chain context handed to the VM at construction.

use crate::ids::Id;

/// Identifiers binding a VM instance to its chain and network.
///
/// Every field is fixed for the lifetime of the instance. Transactions
/// carry copies of `network_id` and `chain_id` and are rejected when they
/// disagree with the context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainContext {
    /// Id of the network this VM participates in.
    pub network_id: u32,
    /// Id of the blockchain this VM instance runs.
    pub chain_id: Id,
    /// Id of the chain that receives exported funds.
    pub destination_chain_id: Id,
    /// Asset id of the native token. Fees are paid in this asset.
    pub native_asset_id: Id,
    /// Flat transaction fee, in native-asset base units. Used until the
    /// dynamic-fee upgrade activates.
    pub flat_fee: u64,
}
