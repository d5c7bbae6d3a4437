//! Genesis and meta reveal verification.

use taproot_proof_types::proof::Proof;

/// Errors returned by genesis reveal verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Genesis reveal is present for a non-genesis asset.
    NonGenesisAssetWithGenesisReveal,
    /// Meta reveal is present for a non-genesis asset.
    NonGenesisAssetWithMetaReveal,
    /// Genesis reveal is required for a genesis asset.
    GenesisRevealRequired,
    /// Genesis reveal prev out does not match the proof prev out.
    PrevOutMismatch,
    /// Genesis reveal declares a meta hash but no meta reveal is present.
    MetaRevealRequired,
    /// Genesis reveal meta hash does not match the meta reveal hash.
    MetaHashMismatch,
    /// Genesis reveal output index does not match the inclusion proof.
    OutputIndexMismatch,
    /// Genesis reveal asset ID does not match the asset.
    AssetIdMismatch,
}

impl core::fmt::Display for Error {
    /// Formats the error for display.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::NonGenesisAssetWithGenesisReveal => {
                write!(f, "non-genesis asset has genesis reveal")
            }
            Error::NonGenesisAssetWithMetaReveal => write!(f, "non-genesis asset has meta reveal"),
            Error::GenesisRevealRequired => write!(f, "genesis reveal required"),
            Error::PrevOutMismatch => write!(f, "genesis reveal prev out mismatch"),
            Error::MetaRevealRequired => write!(f, "meta reveal required"),
            Error::MetaHashMismatch => write!(f, "meta hash mismatch"),
            Error::OutputIndexMismatch => write!(f, "genesis reveal output index mismatch"),
            Error::AssetIdMismatch => write!(f, "genesis reveal asset id mismatch"),
        }
    }
}

/// Verifies genesis and meta reveal constraints for a proof.
///
/// Non-genesis proofs must carry neither reveal. Genesis proofs must carry a
/// genesis reveal that agrees with the proof's previous outpoint, the meta
/// reveal (if the reveal declares a meta hash), the inclusion output index and
/// finally the asset ID, checked in that order.
pub fn verify_genesis_reveal(proof: &Proof) -> Result<(), Error> {
    if !proof.asset.is_genesis() {
        if proof.genesis_reveal.is_some() {
            return Err(Error::NonGenesisAssetWithGenesisReveal);
        }
        if proof.meta_reveal.is_some() {
            return Err(Error::NonGenesisAssetWithMetaReveal);
        }
        return Ok(());
    }

    let reveal = proof
        .genesis_reveal
        .as_ref()
        .ok_or(Error::GenesisRevealRequired)?;

    if reveal.first_prev_out != proof.prev_out {
        return Err(Error::PrevOutMismatch);
    }

    match &proof.meta_reveal {
        None if reveal.has_meta_hash() => return Err(Error::MetaRevealRequired),
        None => {}
        Some(meta) => {
            if meta.meta_hash() != reveal.meta_hash {
                return Err(Error::MetaHashMismatch);
            }
        }
    }

    if reveal.output_index != proof.inclusion_proof.output_index {
        return Err(Error::OutputIndexMismatch);
    }

    if reveal.id() != proof.asset.id() {
        return Err(Error::AssetIdMismatch);
    }

    Ok(())
}
