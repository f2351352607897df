//! Input credentials.

use snowfall_codec::{CodecError, Decode, Encode, Packer, Unpacker};
use snowfall_core::crypto::SIGNATURE_LEN;

use crate::error::TxError;

/// Wire type id of a secp256k1 credential. Part of the canonical encoding.
pub const CREDENTIAL_TYPE_ID: u32 = 9;

/// The signature authorizing one input.
///
/// Each EVM input is controlled by a single account key, so a credential
/// carries exactly one recoverable signature; the wire form still encodes a
/// signature count for forward compatibility with multi-signature inputs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub signature: [u8; SIGNATURE_LEN],
}

impl Credential {
    pub fn verify(&self) -> Result<(), TxError> {
        if self.signature == [0u8; SIGNATURE_LEN] {
            return Err(TxError::EmptyCredential);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential({})", hex::encode(self.signature))
    }
}

impl Encode for Credential {
    fn encode(&self, packer: &mut Packer) {
        packer.pack_u32(CREDENTIAL_TYPE_ID);
        packer.pack_len(1);
        packer.pack_fixed(&self.signature);
    }
}

impl Decode for Credential {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        let type_id = unpacker.unpack_u32()?;
        if type_id != CREDENTIAL_TYPE_ID {
            return Err(CodecError::UnknownTypeId(type_id));
        }
        let count = unpacker.unpack_len()?;
        if count != 1 {
            return Err(CodecError::Malformed(
                "credential must hold exactly one signature",
            ));
        }
        Ok(Self {
            signature: unpacker.unpack_fixed::<SIGNATURE_LEN>()?,
        })
    }
}
