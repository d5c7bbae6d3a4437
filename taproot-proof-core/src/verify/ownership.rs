//! Ownership proofs: a signature by the asset's script key over a challenge,
//! proving control of the asset without a new transfer.

use bitcoin::hashes::{sha256t_hash_newtype, Hash, HashEngine};
use bitcoin::OutPoint;
use taproot_proof_types::asset::Asset;
use taproot_proof_types::proof::Proof;

use crate::{OpsError, TaprootOps};

/// Tag of the ownership message hash.
pub const OWNERSHIP_TAG: &str = "taproot-assets/ownership";
/// Length of a BIP-340 signature without sighash flag.
pub const SCHNORR_SIGNATURE_LEN: usize = 64;

sha256t_hash_newtype! {
    pub struct OwnershipTag = hash_str(OWNERSHIP_TAG);

    /// Tagged hash of an ownership message.
    #[hash_newtype(forward)]
    pub struct OwnershipHash(_);
}

/// Errors returned by ownership verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The challenge witness has no items.
    EmptyWitness,
    /// The first witness item is not a 64-byte signature.
    InvalidSignatureLength {
        /// Length of the first witness item.
        actual: usize,
    },
    /// Signature verification failed.
    Ops(OpsError),
}

impl From<OpsError> for Error {
    fn from(err: OpsError) -> Self {
        Self::Ops(err)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::EmptyWitness => write!(f, "challenge witness is empty"),
            Error::InvalidSignatureLength { actual } => write!(
                f,
                "challenge signature length {}, expected {}",
                actual, SCHNORR_SIGNATURE_LEN
            ),
            Error::Ops(err) => core::fmt::Display::fmt(err, f),
        }
    }
}

/// The message signed by an ownership proof:
/// `tagged_hash(asset_id ‖ xonly(script_key) ‖ outpoint ‖ challenge)`.
pub fn ownership_message(asset: &Asset, anchor: &OutPoint, challenge: &[u8; 32]) -> [u8; 32] {
    let mut engine = OwnershipHash::engine();
    engine.input(asset.id().as_byte_array());
    engine.input(&asset.script_key.x_only_bytes());
    engine.input(anchor.txid.as_byte_array());
    engine.input(&anchor.vout.to_be_bytes());
    engine.input(challenge);
    OwnershipHash::from_engine(engine).to_byte_array()
}

/// Verifies the proof's challenge witness, if present. An absent challenge
/// means the all-zero challenge.
pub fn verify_challenge_witness<O: TaprootOps>(
    ops: &O,
    proof: &Proof,
    challenge: Option<[u8; 32]>,
) -> Result<(), Error> {
    let Some(witness) = &proof.challenge_witness else {
        return Ok(());
    };

    let sig = witness.nth(0).ok_or(Error::EmptyWitness)?;
    if sig.len() != SCHNORR_SIGNATURE_LEN {
        return Err(Error::InvalidSignatureLength { actual: sig.len() });
    }

    let msg = ownership_message(
        &proof.asset,
        &proof.out_point(),
        &challenge.unwrap_or([0u8; 32]),
    );
    Ok(ops.verify_schnorr(&proof.asset.script_key, msg, sig)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::sha256;
    use bitcoin::Txid;
    use taproot_proof_types::asset::{AssetType, Genesis, SerializedKey};

    #[test]
    fn message_is_bip340_tagged() {
        let genesis = Genesis {
            first_prev_out: OutPoint::null(),
            tag: "owned".into(),
            meta_hash: sha256::Hash::all_zeros(),
            output_index: 0,
            asset_type: AssetType::Normal,
        };
        let mut key = [0x02u8; 33];
        key[1..].copy_from_slice(&[0x11; 32]);
        let asset = Asset::new(genesis, 1, SerializedKey { bytes: key }, None);
        let anchor = OutPoint {
            txid: Txid::from_byte_array([0x22; 32]),
            vout: 3,
        };
        let challenge = [0x33; 32];

        let tag = sha256::Hash::hash(OWNERSHIP_TAG.as_bytes());
        let mut engine = sha256::Hash::engine();
        engine.input(tag.as_byte_array());
        engine.input(tag.as_byte_array());
        engine.input(asset.id().as_byte_array());
        engine.input(&[0x11; 32]);
        engine.input(&[0x22; 32]);
        engine.input(&3u32.to_be_bytes());
        engine.input(&challenge);
        let expected = sha256::Hash::from_engine(engine).to_byte_array();

        assert_eq!(ownership_message(&asset, &anchor, &challenge), expected);
        assert_ne!(ownership_message(&asset, &anchor, &[0; 32]), expected);
    }
}
