//! Group key reveal verification logic.

use bitcoin::hashes::Hash;
use taproot_proof_types::asset::{AssetId, GroupKeyReveal, SerializedKey};
use taproot_proof_types::proof::Proof;

use crate::{OpsError, TaprootOps};

/// Errors returned by group key reveal verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Group key reveal is present but the asset has no group key.
    MissingGroupKey,
    /// Derived group key does not match the asset group key.
    GroupKeyMismatch,
    /// Taproot operation failed.
    Ops(OpsError),
}

impl From<OpsError> for Error {
    /// Converts an ops error into a group key reveal error.
    fn from(err: OpsError) -> Self {
        Self::Ops(err)
    }
}

impl core::fmt::Display for Error {
    /// Formats the error for display.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::MissingGroupKey => {
                write!(f, "group key reveal present but asset has no group key")
            }
            Error::GroupKeyMismatch => write!(f, "group key reveal mismatch"),
            Error::Ops(err) => core::fmt::Display::fmt(err, f),
        }
    }
}

/// Derives the group key committed to by a reveal:
/// `taproot_output_key(raw_key + asset_id·G, tapscript_root)`.
pub fn group_pubkey_from_reveal<O: TaprootOps>(
    ops: &O,
    reveal: &GroupKeyReveal,
    asset_id: &AssetId,
) -> Result<SerializedKey, Error> {
    let raw_pubkey = ops.parse_group_key(&reveal.raw_key)?;
    let internal_key = ops.add_tweak(&raw_pubkey, asset_id.to_byte_array())?;
    Ok(ops.taproot_output_key(&internal_key, reveal.tapscript_root)?)
}

/// Verifies that the proof's group key reveal, if any, derives the asset's
/// group key, and returns the derived key.
pub fn verify_group_key_reveal<O: TaprootOps>(
    ops: &O,
    proof: &Proof,
) -> Result<Option<SerializedKey>, Error> {
    let asset = &proof.asset;
    let Some(reveal) = proof.group_key_reveal.as_ref() else {
        return Ok(None);
    };
    let expected_key = asset.group_key.ok_or(Error::MissingGroupKey)?;

    let derived_key = group_pubkey_from_reveal(ops, reveal, &asset.id())?;
    if expected_key != derived_key {
        return Err(Error::GroupKeyMismatch);
    }

    Ok(Some(derived_key))
}
