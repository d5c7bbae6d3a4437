//! Host-side verification utilities backed by bitcoin/secp256k1.

use bitcoin::hashes::Hash;
use bitcoin::key::TapTweak;
use bitcoin::secp256k1::{self, schnorr, Message, PublicKey as SecpPublicKey, Scalar, Secp256k1};
use bitcoin::TapNodeHash;
use taproot_proof_core::verify::{self, group_key_reveal};
use taproot_proof_core::{
    AssetSnapshot, ChainVerifier, OpsError, TaprootOps, Verifiers, VerifyContext,
};
use taproot_proof_types::asset::{AssetId, GroupKeyReveal, SerializedKey};
use taproot_proof_types::proof::Proof;
use taproot_proof_types::File;

/// Taproot operations implemented with bitcoin/secp256k1 types.
#[derive(Debug)]
pub struct BitcoinTaprootOps {
    /// Secp256k1 context used for verification-only operations.
    secp: Secp256k1<secp256k1::VerifyOnly>,
}

impl BitcoinTaprootOps {
    /// Creates a new Taproot operations backend.
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::verification_only(),
        }
    }
}

impl Default for BitcoinTaprootOps {
    fn default() -> Self {
        Self::new()
    }
}

impl TaprootOps for BitcoinTaprootOps {
    type PubKey = SecpPublicKey;

    fn parse_group_key(&self, key: &SerializedKey) -> Result<Self::PubKey, OpsError> {
        SecpPublicKey::from_slice(&key.bytes).map_err(|_| OpsError::InvalidRawGroupKey)
    }

    fn parse_internal_key(&self, key: &SerializedKey) -> Result<Self::PubKey, OpsError> {
        SecpPublicKey::from_slice(&key.bytes).map_err(|_| OpsError::InvalidInternalKey)
    }

    /// Computes `pubkey + tweak·G`.
    fn add_tweak(&self, pubkey: &Self::PubKey, tweak: [u8; 32]) -> Result<Self::PubKey, OpsError> {
        let tweak = Scalar::from_be_bytes(tweak).map_err(|_| OpsError::AssetIdTweakOutOfRange)?;
        pubkey
            .add_exp_tweak(&self.secp, &tweak)
            .map_err(|_| OpsError::InvalidGroupKeyTweak)
    }

    /// BIP-341 output key. A missing root gives the key-spend-only tweak.
    fn taproot_output_key(
        &self,
        internal_key: &Self::PubKey,
        tapscript_root: Option<[u8; 32]>,
    ) -> Result<SerializedKey, OpsError> {
        let merkle_root = tapscript_root.map(TapNodeHash::from_byte_array);
        let (xonly_key, _) = internal_key.x_only_public_key();
        let (tweaked, parity) = xonly_key.tap_tweak(&self.secp, merkle_root);
        let output_key =
            SecpPublicKey::from_x_only_public_key(tweaked.to_x_only_public_key(), parity);

        Ok(SerializedKey::from(output_key))
    }

    fn verify_schnorr(
        &self,
        key: &SerializedKey,
        msg: [u8; 32],
        sig: &[u8],
    ) -> Result<(), OpsError> {
        let pubkey = SecpPublicKey::from_slice(&key.bytes).map_err(|_| OpsError::InvalidSigningKey)?;
        let (xonly_key, _) = pubkey.x_only_public_key();
        let sig = schnorr::Signature::from_slice(sig).map_err(|_| OpsError::MalformedSignature)?;
        self.secp
            .verify_schnorr(&sig, &Message::from_digest(msg), &xonly_key)
            .map_err(|_| OpsError::InvalidSignature)
    }
}

/// Verifies a single proof with the bitcoin backend.
pub fn verify_proof(
    proof: &Proof,
    prev: Option<&AssetSnapshot>,
    verifiers: Verifiers<'_>,
    ctx: VerifyContext<'_>,
) -> Result<AssetSnapshot, verify::Error> {
    let ops = BitcoinTaprootOps::new();
    ChainVerifier::new(&ops, verifiers, ctx).verify_proof(proof, prev)
}

/// Verifies a whole proof file with the bitcoin backend and returns the
/// snapshot of its last proof.
pub fn verify_file(
    file: &File,
    verifiers: Verifiers<'_>,
    ctx: VerifyContext<'_>,
) -> Result<AssetSnapshot, verify::Error> {
    let ops = BitcoinTaprootOps::new();
    ChainVerifier::new(&ops, verifiers, ctx).verify_file(file)
}

/// Derives the compressed group key bytes using the bitcoin backend.
pub fn group_pubkey_from_reveal(
    reveal: &GroupKeyReveal,
    asset_id: &AssetId,
) -> Result<SerializedKey, verify::Error> {
    let ops = BitcoinTaprootOps::new();
    group_key_reveal::group_pubkey_from_reveal(&ops, reveal, asset_id).map_err(verify::Error::from)
}
