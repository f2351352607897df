//! Shared helpers for in-crate tests: deterministic signing keys and
//! fully-signed transactions.

use alloy_consensus::{SignableTransaction, TxEip1559, TxLegacy};
use alloy_primitives::{keccak256, Address, Bytes, PrimitiveSignature, TxKind, B256, U256};
use k256::ecdsa::{signature::hazmat::PrehashSigner, SigningKey, VerifyingKey};

use crate::envelope::{tx_type, TxEnvelope};

pub fn test_signing_key(seed: u8) -> SigningKey {
    // Any small repeated byte is a valid scalar.
    SigningKey::from_slice(&[seed; 32]).expect("valid key bytes")
}

pub fn signing_key_address(key: &SigningKey) -> Address {
    let verifying_key = VerifyingKey::from(key);
    let point = verifying_key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

pub fn sign_hash(key: &SigningKey, hash: B256) -> PrimitiveSignature {
    let (sig, recovery_id) = key.sign_prehash(hash.as_ref()).expect("sign");
    let r = U256::from_be_slice(&sig.r().to_bytes());
    let s = U256::from_be_slice(&sig.s().to_bytes());
    PrimitiveSignature::new(r, s, recovery_id.is_y_odd())
}

/// A signed legacy transfer with `input_len` bytes of calldata, so tests
/// can shape transaction sizes.
pub fn signed_legacy_tx(key: &SigningKey, nonce: u64, input_len: usize) -> TxEnvelope {
    let tx = TxLegacy {
        chain_id: Some(1),
        nonce,
        gas_price: 20_000_000_000,
        gas_limit: 21_000,
        to: TxKind::Call(Address::repeat_byte(0x42)),
        value: U256::from(1u64),
        input: Bytes::from(vec![0u8; input_len]),
    };
    let signature = sign_hash(key, tx.signature_hash());
    let signed = tx.into_signed(signature);

    let mut encoded = Vec::new();
    signed.rlp_encode(&mut encoded);
    TxEnvelope::decode(&encoded).expect("decode freshly signed tx")
}

pub fn signed_eip1559_tx(key: &SigningKey, nonce: u64) -> TxEnvelope {
    let tx = TxEip1559 {
        chain_id: 1,
        nonce,
        gas_limit: 21_000,
        max_fee_per_gas: 30_000_000_000,
        max_priority_fee_per_gas: 1_000_000_000,
        to: TxKind::Call(Address::repeat_byte(0x43)),
        value: U256::from(2u64),
        access_list: Default::default(),
        input: Bytes::new(),
    };
    let signature = sign_hash(key, tx.signature_hash());
    let signed = tx.into_signed(signature);

    let mut encoded = vec![tx_type::EIP1559];
    signed.rlp_encode(&mut encoded);
    TxEnvelope::decode(&encoded).expect("decode freshly signed tx")
}
