//! Recoverable secp256k1 signatures and Ethereum-style address derivation.
//!
//! Signatures are 65 bytes: the 64-byte compact form followed by a one-byte
//! recovery id. Addresses are the low 20 bytes of the Keccak-256 digest of
//! the uncompressed public key (without the 0x04 prefix).

use std::sync::OnceLock;

use alloy_primitives::{keccak256, Address, B256};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

/// Length of a recoverable signature: `r || s || v`.
pub const SIGNATURE_LEN: usize = 65;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid recovery id")]
    InvalidRecoveryId,
    #[error("malformed signature")]
    MalformedSignature,
    #[error("public key recovery failed")]
    RecoveryFailed,
}

fn secp() -> &'static Secp256k1<All> {
    static SECP: OnceLock<Secp256k1<All>> = OnceLock::new();
    SECP.get_or_init(Secp256k1::new)
}

/// Map a public key to its account address.
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    Address::from_slice(&hash[12..])
}

/// The address controlled by `secret_key`.
pub fn address_from_secret_key(secret_key: &SecretKey) -> Address {
    let public_key = PublicKey::from_secret_key(secp(), secret_key);
    public_key_to_address(&public_key)
}

/// Sign a 32-byte digest, producing a 65-byte recoverable signature.
pub fn sign_recoverable(digest: B256, secret_key: &SecretKey) -> [u8; SIGNATURE_LEN] {
    let msg = Message::from_digest_slice(digest.as_slice()).expect("digest is 32 bytes");
    let signature = secp().sign_ecdsa_recoverable(&msg, secret_key);
    let (recovery_id, compact) = signature.serialize_compact();

    let mut out = [0u8; SIGNATURE_LEN];
    out[..64].copy_from_slice(&compact);
    out[64] = recovery_id.to_i32() as u8;
    out
}

/// Recover the public key that produced `signature` over `digest`.
pub fn recover_public_key(
    digest: B256,
    signature: &[u8; SIGNATURE_LEN],
) -> Result<PublicKey, CryptoError> {
    let recovery_id =
        RecoveryId::from_i32(signature[64] as i32).map_err(|_| CryptoError::InvalidRecoveryId)?;
    let recoverable = RecoverableSignature::from_compact(&signature[..64], recovery_id)
        .map_err(|_| CryptoError::MalformedSignature)?;

    let msg = Message::from_digest_slice(digest.as_slice())
        .map_err(|_| CryptoError::MalformedSignature)?;
    secp()
        .recover_ecdsa(&msg, &recoverable)
        .map_err(|_| CryptoError::RecoveryFailed)
}

/// Recover the signing address for `signature` over `digest`.
pub fn recover_address(
    digest: B256,
    signature: &[u8; SIGNATURE_LEN],
) -> Result<Address, CryptoError> {
    Ok(public_key_to_address(&recover_public_key(digest, signature)?))
}
