//! Proof chain verification.
//!
//! A [`ChainVerifier`] checks one proof end to end and walks the embedded
//! provenance files of its inputs. Block header, transaction inclusion and
//! group legitimacy checks are delegated to caller supplied [`Verifiers`].

use alloc::boxed::Box;
use core::fmt;

use bitcoin::block::Header;
use bitcoin::secp256k1::PublicKey;
use bitcoin::{BlockHash, OutPoint, Transaction};
use taproot_proof_types::asset::{Asset, SerializedKey};
use taproot_proof_types::codec;
use taproot_proof_types::commitment::TapscriptPreimage;
use taproot_proof_types::meta::MetaReveal;
use taproot_proof_types::proof::{Proof, TxMerkleProof};
use taproot_proof_types::File;

use crate::verify::context::VerifyContext;
use crate::verify::taproot_proof::TapCommitment;
use crate::verify::{genesis, group_key_reveal, ownership, proof as proofs, tx, Result};
use crate::TaprootOps;

/// Error returned by an injected verifier. Kept boxed so callers can
/// downcast to their own error type.
pub type CallbackError = Box<dyn core::error::Error + Send + Sync>;

/// Checks that a block header is valid and sits at `height` on the accepted
/// chain.
pub trait HeaderVerifier {
    fn verify_header(&self, header: &Header, height: u32) -> core::result::Result<(), CallbackError>;
}

impl<F> HeaderVerifier for F
where
    F: Fn(&Header, u32) -> core::result::Result<(), CallbackError>,
{
    fn verify_header(&self, header: &Header, height: u32) -> core::result::Result<(), CallbackError> {
        self(header, height)
    }
}

/// Checks that a transaction is included in the block behind `header`.
pub trait MerkleVerifier {
    fn verify_merkle(
        &self,
        tx: &Transaction,
        proof: &TxMerkleProof,
        header: &Header,
    ) -> core::result::Result<(), CallbackError>;
}

impl<F> MerkleVerifier for F
where
    F: Fn(&Transaction, &TxMerkleProof, &Header) -> core::result::Result<(), CallbackError>,
{
    fn verify_merkle(
        &self,
        tx: &Transaction,
        proof: &TxMerkleProof,
        header: &Header,
    ) -> core::result::Result<(), CallbackError> {
        self(tx, proof, header)
    }
}

/// Checks that a group key was properly authorized.
pub trait GroupVerifier {
    fn verify_group(&self, group_key: &SerializedKey) -> core::result::Result<(), CallbackError>;
}

impl<F> GroupVerifier for F
where
    F: Fn(&SerializedKey) -> core::result::Result<(), CallbackError>,
{
    fn verify_group(&self, group_key: &SerializedKey) -> core::result::Result<(), CallbackError> {
        self(group_key)
    }
}

/// The external checks a chain verification run delegates.
#[derive(Clone, Copy)]
pub struct Verifiers<'a> {
    pub header: &'a dyn HeaderVerifier,
    pub merkle: &'a dyn MerkleVerifier,
    pub group: &'a dyn GroupVerifier,
}

impl fmt::Debug for Verifiers<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifiers").finish_non_exhaustive()
    }
}

/// Errors raised by the chain verifier itself.
#[derive(Debug)]
pub enum Error {
    /// The header verifier rejected the block header.
    HeaderRejected(CallbackError),
    /// The merkle verifier rejected the anchor transaction.
    MerkleRejected(CallbackError),
    /// The group verifier rejected the asset's group key.
    GroupRejected(CallbackError),
    /// Embedded provenance files nest deeper than allowed.
    DepthExceeded {
        /// Configured maximum depth.
        max: usize,
    },
    /// The run was cancelled.
    Cancelled,
    /// A file's first proof is not a genesis proof.
    FirstProofNotGenesis,
    /// A proof's previous outpoint is not where the preceding proof left
    /// the asset.
    PrevOutChainMismatch {
        /// Index of the proof within its file.
        index: usize,
    },
    /// A proof does not spend the asset produced by the preceding proof.
    UnreferencedPrevAsset {
        /// Index of the proof within its file.
        index: usize,
    },
    /// An additional input file ends in an asset the proof never spends.
    UnreferencedInput {
        /// Index of the additional input file.
        index: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::HeaderRejected(err) => write!(f, "header rejected: {}", err),
            Error::MerkleRejected(err) => write!(f, "merkle proof rejected: {}", err),
            Error::GroupRejected(err) => write!(f, "group key rejected: {}", err),
            Error::DepthExceeded { max } => {
                write!(f, "proof nesting exceeds maximum depth {}", max)
            }
            Error::Cancelled => write!(f, "verification cancelled"),
            Error::FirstProofNotGenesis => write!(f, "first proof in file is not a genesis proof"),
            Error::PrevOutChainMismatch { index } => {
                write!(f, "proof {} does not spend the previous proof's outpoint", index)
            }
            Error::UnreferencedPrevAsset { index } => {
                write!(f, "proof {} does not reference the previous asset", index)
            }
            Error::UnreferencedInput { index } => {
                write!(f, "additional input {} is not spent by the asset", index)
            }
        }
    }
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Error::HeaderRejected(err) | Error::MerkleRejected(err) | Error::GroupRejected(err) => {
                Some(err.as_ref())
            }
            _ => None,
        }
    }
}

/// The verified state of an asset at the end of a proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSnapshot {
    pub asset: Asset,
    /// Outpoint that holds the asset.
    pub out_point: OutPoint,
    pub anchor_block_hash: BlockHash,
    pub anchor_block_height: u32,
    pub anchor_tx: Transaction,
    pub output_index: u32,
    pub internal_key: PublicKey,
    /// Commitment reconstructed from the inclusion proof.
    pub tap_commitment: TapCommitment,
    pub tapscript_sibling: Option<TapscriptPreimage>,
    /// True if the asset is a split output rather than the split root.
    pub split_asset: bool,
    pub meta_reveal: Option<MetaReveal>,
}

/// Verifies proofs and proof files against a set of injected verifiers.
pub struct ChainVerifier<'a, O: TaprootOps> {
    ops: &'a O,
    verifiers: Verifiers<'a>,
    ctx: VerifyContext<'a>,
}

impl<'a, O: TaprootOps> ChainVerifier<'a, O> {
    pub fn new(ops: &'a O, verifiers: Verifiers<'a>, ctx: VerifyContext<'a>) -> Self {
        ChainVerifier {
            ops,
            verifiers,
            ctx,
        }
    }

    pub fn context(&self) -> &VerifyContext<'a> {
        &self.ctx
    }

    /// Verifies a single proof. `prev` is the snapshot left by the preceding
    /// proof of the same file, if any.
    pub fn verify_proof(&self, proof: &Proof, prev: Option<&AssetSnapshot>) -> Result<AssetSnapshot> {
        codec::transition(proof.version)?;
        if let Some(prev) = prev {
            check_chain_link(proof, prev, 0)?;
        }
        self.verify_proof_at(proof, 0)
    }

    /// Verifies every proof of a file in order and returns the snapshot of
    /// the last one.
    pub fn verify_file(&self, file: &File) -> Result<AssetSnapshot> {
        self.verify_file_at(file, 0)
    }

    fn verify_file_at(&self, file: &File, depth: usize) -> Result<AssetSnapshot> {
        codec::file_format(file.version())?;
        if file.is_empty() {
            return Err(taproot_proof_types::Error::EmptyFile.into());
        }

        let logger = &self.ctx.logger;
        logger.debug(format_args!(
            "verifying file with {} proofs at depth {}",
            file.num_proofs(),
            depth
        ));

        let mut prev: Option<AssetSnapshot> = None;
        for index in 0..file.num_proofs() {
            let proof = file.proof_at(index)?;
            logger.debug(format_args!("verifying file entry {}", index));

            if let Some(snapshot) = &prev {
                check_chain_link(&proof, snapshot, index)?;
            } else if !proof.asset.is_genesis() {
                return Err(Error::FirstProofNotGenesis.into());
            }

            prev = Some(self.verify_proof_at(&proof, depth)?);
        }

        prev.ok_or_else(|| taproot_proof_types::Error::EmptyFile.into())
    }

    fn verify_proof_at(&self, proof: &Proof, depth: usize) -> Result<AssetSnapshot> {
        let result = self.verify_stages(proof, depth);
        if let Err(err) = &result {
            self.ctx.logger.warn(format_args!(
                "proof for {} failed at depth {}: {}",
                proof.out_point(),
                depth,
                err
            ));
        }
        result
    }

    fn verify_stages(&self, proof: &Proof, depth: usize) -> Result<AssetSnapshot> {
        self.check_cancelled()?;
        let logger = &self.ctx.logger;

        codec::transition(proof.version)?;
        logger.debug(format_args!(
            "verifying proof v{} for asset {} at height {}",
            proof.version.0,
            proof.asset.id(),
            proof.block_height
        ));

        logger.trace(format_args!("checking genesis reveal"));
        genesis::verify_genesis_reveal(proof)?;

        logger.trace(format_args!("checking group key reveal"));
        let revealed_group = group_key_reveal::verify_group_key_reveal(self.ops, proof)?;

        logger.trace(format_args!("checking block header"));
        self.verifiers
            .header
            .verify_header(&proof.block_header, proof.block_height)
            .map_err(Error::HeaderRejected)?;

        logger.trace(format_args!("checking anchor transaction"));
        tx::verify_anchor_tx(proof)?;
        self.verifiers
            .merkle
            .verify_merkle(&proof.anchor_tx, &proof.tx_merkle_proof, &proof.block_header)
            .map_err(Error::MerkleRejected)?;

        logger.trace(format_args!("checking taproot proofs"));
        let tap_commitment = proofs::verify_proofs(self.ops, proof)?;

        if proof.challenge_witness.is_some() {
            logger.trace(format_args!("checking ownership witness"));
            ownership::verify_challenge_witness(self.ops, proof, self.ctx.challenge)?;
        }

        self.verify_additional_inputs(proof, depth)?;

        if let (Some(group_key), None) = (proof.asset.group_key, revealed_group) {
            logger.trace(format_args!("checking group key legitimacy"));
            self.verifiers
                .group
                .verify_group(&group_key)
                .map_err(Error::GroupRejected)?;
        }

        Ok(AssetSnapshot {
            asset: proof.asset.clone(),
            out_point: proof.out_point(),
            anchor_block_hash: proof.block_header.block_hash(),
            anchor_block_height: proof.block_height,
            anchor_tx: proof.anchor_tx.clone(),
            output_index: proof.inclusion_proof.output_index,
            internal_key: proof.inclusion_proof.internal_key,
            tap_commitment,
            tapscript_sibling: proof
                .inclusion_proof
                .commitment_proof()
                .and_then(|commitment| commitment.tap_sibling_preimage.clone()),
            split_asset: proof.asset.has_split_commitment_witness(),
            meta_reveal: proof.meta_reveal.clone(),
        })
    }

    /// Verifies each embedded input file and checks that its terminal asset
    /// is spent by this proof's asset.
    fn verify_additional_inputs(&self, proof: &Proof, depth: usize) -> Result<()> {
        if proof.additional_inputs.is_empty() {
            return Ok(());
        }

        let next_depth = depth + 1;
        if next_depth > self.ctx.max_depth {
            return Err(Error::DepthExceeded {
                max: self.ctx.max_depth,
            }
            .into());
        }

        let spender = spending_asset(&proof.asset);
        for (index, file) in proof.additional_inputs.iter().enumerate() {
            self.check_cancelled()?;
            self.ctx.logger.debug(format_args!(
                "descending into additional input {} at depth {}",
                index, next_depth
            ));

            let snapshot = self.verify_file_at(file, next_depth)?;
            if !spends(spender, &snapshot) {
                return Err(Error::UnreferencedInput { index }.into());
            }
        }

        Ok(())
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.ctx.cancel.is_cancelled() {
            return Err(Error::Cancelled.into());
        }
        Ok(())
    }
}

impl<O: TaprootOps> fmt::Debug for ChainVerifier<'_, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainVerifier")
            .field("verifiers", &self.verifiers)
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

/// Checks the link between a file entry and the snapshot before it.
fn check_chain_link(proof: &Proof, prev: &AssetSnapshot, index: usize) -> Result<()> {
    if proof.prev_out != prev.out_point {
        return Err(Error::PrevOutChainMismatch { index }.into());
    }
    if !proof.asset.is_genesis() && !spends(spending_asset(&proof.asset), prev) {
        return Err(Error::UnreferencedPrevAsset { index }.into());
    }
    Ok(())
}

/// Split outputs spend through the root asset of their split commitment.
fn spending_asset(asset: &Asset) -> &Asset {
    proofs::split_root_asset(asset).unwrap_or(asset)
}

/// Returns true if some prev id of `asset` names the snapshot's asset.
fn spends(asset: &Asset, snapshot: &AssetSnapshot) -> bool {
    asset.prev_witnesses.iter().any(|witness| {
        witness.prev_id.as_ref().is_some_and(|prev_id| {
            prev_id.out_point == snapshot.out_point
                && prev_id.script_key == snapshot.asset.script_key
        })
    })
}

impl MerkleVerifier for tx::TxMerkleProofVerifier {
    fn verify_merkle(
        &self,
        tx: &Transaction,
        proof: &TxMerkleProof,
        header: &Header,
    ) -> core::result::Result<(), CallbackError> {
        tx::verify_tx_merkle_proof(tx, proof, header).map_err(CallbackError::from)
    }
}
