//! Taproot proof verification helpers.
//!
//! A taproot proof binds an asset to one output of the anchor transaction.
//! The verifier rebuilds the output key the proof implies and compares it to
//! the key in the output's script. Commitment proofs derive two candidate
//! keys (the proof's own commitment version and its V0 downgrade) because the
//! leaf script format differs between them.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use bitcoin::hashes::{sha256::Hash as Sha256Hash, Hash, HashEngine};
use bitcoin::secp256k1::{PublicKey as SecpPublicKey, XOnlyPublicKey};
use bitcoin::taproot::{LeafVersion, TapNodeHash};
use bitcoin::{Script, ScriptBuf, Transaction};
use serde::{Deserialize, Serialize};
use taproot_proof_types::asset::{Asset, AssetVersion, SerializedKey};
use taproot_proof_types::commitment::{
    TapCommitmentVersion, TapscriptPreimage, TapscriptPreimageType,
};
use taproot_proof_types::mssmt::MssmtNode;
use taproot_proof_types::proof::{CommitmentProof, TaprootProof, TaprootProofKind, TapscriptProof};

use crate::verify::mssmt::{self, empty_leaf, mssmt_root, MssmtRoot};
use crate::{OpsError, TaprootOps};

/// Errors returned by taproot proof verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Taproot output index is invalid.
    InvalidTaprootOutputIndex {
        /// Index requested in the anchor transaction outputs.
        output_index: u32,
        /// Total number of outputs in the anchor transaction.
        output_count: usize,
    },
    /// Script pubkey is not a Taproot v1 witness program.
    InvalidTaprootWitnessProgram,
    /// Taproot output key bytes are invalid.
    InvalidTaprootOutputKey,
    /// An inclusion proof must carry a commitment proof.
    MissingCommitmentProof,
    /// Taproot proof is missing an asset proof.
    MissingAssetProof,
    /// Asset commitment exclusion carried an asset proof.
    UnexpectedAssetProof,
    /// Tapscript proof does not describe a supported tree shape.
    InvalidTapscriptProof,
    /// Taproot proof derived key does not match the anchor output.
    InvalidTaprootProof,
    /// Tapscript preimage is empty.
    EmptyTapscriptPreimage,
    /// Tapscript preimage length is invalid.
    InvalidTapscriptPreimageLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },
    /// Tapleaf script version is not supported.
    InvalidTapLeafScriptVersion,
    /// Tapleaf script length is invalid.
    InvalidTapLeafScriptLength,
    /// Tapscript preimage is a Taproot Asset commitment leaf.
    TapscriptPreimageIsTapCommitment,
    /// Asset script key is invalid.
    InvalidAssetScriptKey,
    /// Asset group key is invalid.
    InvalidAssetGroupKey,
    /// The asset leaf could not be encoded.
    InvalidAssetEncoding,
    /// MS-SMT root reconstruction failed.
    Mssmt(mssmt::Error),
    /// Taproot operation failed.
    Ops(OpsError),
}

impl From<OpsError> for Error {
    /// Converts an ops error into a taproot proof error.
    fn from(err: OpsError) -> Self {
        Self::Ops(err)
    }
}

impl From<mssmt::Error> for Error {
    fn from(err: mssmt::Error) -> Self {
        Self::Mssmt(err)
    }
}

impl core::fmt::Display for Error {
    /// Formats the error for display.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidTaprootOutputIndex {
                output_index,
                output_count,
            } => write!(
                f,
                "invalid taproot output index {} for {} outputs",
                output_index, output_count
            ),
            Error::InvalidTaprootWitnessProgram => {
                write!(f, "script pubkey is not a Taproot v1 witness program")
            }
            Error::InvalidTaprootOutputKey => write!(f, "invalid taproot output key"),
            Error::MissingCommitmentProof => write!(f, "missing commitment proof"),
            Error::MissingAssetProof => write!(f, "missing asset proof"),
            Error::UnexpectedAssetProof => {
                write!(f, "asset proof present in tap commitment exclusion")
            }
            Error::InvalidTapscriptProof => write!(f, "invalid tapscript proof"),
            Error::InvalidTaprootProof => write!(f, "invalid taproot proof"),
            Error::EmptyTapscriptPreimage => write!(f, "empty tapscript preimage"),
            Error::InvalidTapscriptPreimageLength { expected, actual } => write!(
                f,
                "invalid tapscript preimage length {}, expected {}",
                actual, expected
            ),
            Error::InvalidTapLeafScriptVersion => write!(f, "invalid tapleaf script version"),
            Error::InvalidTapLeafScriptLength => write!(f, "invalid tapleaf script length"),
            Error::TapscriptPreimageIsTapCommitment => {
                write!(f, "tapscript preimage is a taproot asset commitment")
            }
            Error::InvalidAssetScriptKey => write!(f, "invalid asset script key"),
            Error::InvalidAssetGroupKey => write!(f, "invalid asset group key"),
            Error::InvalidAssetEncoding => write!(f, "asset leaf could not be encoded"),
            Error::Mssmt(err) => core::fmt::Display::fmt(err, f),
            Error::Ops(err) => core::fmt::Display::fmt(err, f),
        }
    }
}

/// Length in bytes of a Taproot Asset commitment leaf script.
const TAPROOT_ASSET_COMMITMENT_SCRIPT_SIZE: usize = 1 + 32 + 32 + 8;
/// Marker tag for legacy Taproot Asset commitment leaves.
const TAPROOT_ASSETS_MARKER_TAG: &str = "taproot-assets";
/// Marker tag for V2 Taproot Asset commitment leaves.
const TAPROOT_ASSETS_V2_TAG: &str = "taproot-assets:194243";
/// Length in bytes of a TapBranch preimage without tag.
const TAP_BRANCH_PREIMAGE_LEN: usize = 64;
/// Maximum tapscript size accepted for leaf preimages.
const MAX_TAPLEAF_SCRIPT_SIZE: usize = 4_000_000;

/// Derived taproot output keys and the commitment each one came from.
pub type ProofCommitmentKeys = BTreeMap<SerializedKey, TapCommitment>;

/// Root of the per-output Taproot Asset commitment tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapCommitment {
    /// Taproot Asset commitment version.
    pub version: TapCommitmentVersion,
    /// Root hash of the TapCommitment MS-SMT.
    pub root_hash: [u8; 32],
    /// Root sum of the TapCommitment MS-SMT.
    pub root_sum: u64,
}

impl TapCommitment {
    /// Returns the tapscript leaf script for this commitment.
    pub fn tap_leaf_script(&self) -> Vec<u8> {
        let mut script = Vec::with_capacity(TAPROOT_ASSET_COMMITMENT_SCRIPT_SIZE);
        match self.version {
            TapCommitmentVersion::V0 | TapCommitmentVersion::V1 => {
                script.push(self.version as u8);
                script.extend_from_slice(&taproot_assets_marker());
            }
            TapCommitmentVersion::V2 => {
                script.extend_from_slice(&taproot_assets_v2_tag());
                script.push(self.version as u8);
            }
        }
        script.extend_from_slice(&self.root_hash);
        script.extend_from_slice(&self.root_sum.to_be_bytes());
        script
    }

    /// Returns the TapNodeHash for this commitment leaf.
    pub fn tap_leaf_hash(&self) -> TapNodeHash {
        let script = ScriptBuf::from_bytes(self.tap_leaf_script());
        TapNodeHash::from_script(script.as_script(), LeafVersion::TapScript)
    }

    /// Returns the tapscript root for this commitment and optional sibling.
    pub fn tapscript_root(&self, sibling: Option<&TapscriptPreimage>) -> Result<TapNodeHash, Error> {
        let commitment_hash = self.tap_leaf_hash();
        Ok(match sibling {
            Some(preimage) => {
                TapNodeHash::from_node_hashes(commitment_hash, tapscript_preimage_hash(preimage)?)
            }
            None => commitment_hash,
        })
    }

    fn downgrade(&self) -> TapCommitment {
        TapCommitment {
            version: TapCommitmentVersion::V0,
            root_hash: self.root_hash,
            root_sum: self.root_sum,
        }
    }
}

/// Extracts the taproot output key from an anchor transaction output.
pub fn extract_taproot_key(
    anchor_tx: &Transaction,
    output_index: u32,
) -> Result<XOnlyPublicKey, Error> {
    let output_count = anchor_tx.output.len();
    let output =
        anchor_tx
            .output
            .get(output_index as usize)
            .ok_or(Error::InvalidTaprootOutputIndex {
                output_index,
                output_count,
            })?;

    extract_taproot_key_from_script(output.script_pubkey.as_script())
}

/// Extracts the taproot output key from a script pubkey.
pub fn extract_taproot_key_from_script(script: &Script) -> Result<XOnlyPublicKey, Error> {
    if !script.is_p2tr() {
        return Err(Error::InvalidTaprootWitnessProgram);
    }

    XOnlyPublicKey::from_slice(&script.as_bytes()[2..34])
        .map_err(|_| Error::InvalidTaprootOutputKey)
}

/// Verifies a taproot proof against the anchor transaction output.
pub fn verify_taproot_proof<O: TaprootOps>(
    ops: &O,
    anchor_tx: &Transaction,
    proof: &TaprootProof,
    asset: &Asset,
    inclusion: bool,
) -> Result<(), Error> {
    verify_taproot_proof_with_commitment(ops, anchor_tx, proof, asset, inclusion).map(|_| ())
}

/// Verifies a taproot proof and returns the matched TapCommitment. Tapscript
/// exclusion proofs match no commitment and return `None`.
pub fn verify_taproot_proof_with_commitment<O: TaprootOps>(
    ops: &O,
    anchor_tx: &Transaction,
    proof: &TaprootProof,
    asset: &Asset,
    inclusion: bool,
) -> Result<Option<TapCommitment>, Error> {
    let expected_key = extract_taproot_key(anchor_tx, proof.output_index)?;
    let expected = expected_key.serialize();

    if inclusion {
        let derived = derive_by_asset_inclusion(ops, proof, asset)?;
        return matching_commitment(&expected, &derived).map(Some);
    }

    match &proof.kind {
        TaprootProofKind::Commitment(_) => {
            let derived = derive_by_asset_exclusion(ops, proof, asset)?;
            matching_commitment(&expected, &derived).map(Some)
        }
        TaprootProofKind::Tapscript(_) => {
            let derived = derive_by_tapscript_proof(ops, proof)?;
            if derived.x_only_bytes() == expected {
                Ok(None)
            } else {
                Err(Error::InvalidTaprootProof)
            }
        }
    }
}

fn matching_commitment(
    expected: &[u8; 32],
    derived: &ProofCommitmentKeys,
) -> Result<TapCommitment, Error> {
    derived
        .iter()
        .find(|(key, _)| key.x_only_bytes() == *expected)
        .map(|(_, commitment)| commitment.clone())
        .ok_or(Error::InvalidTaprootProof)
}

/// Derives the candidate output keys for a proof that `asset` is committed in
/// the proof's output. Any split commitment witness is stripped first.
pub fn derive_by_asset_inclusion<O: TaprootOps>(
    ops: &O,
    proof: &TaprootProof,
    asset: &Asset,
) -> Result<ProofCommitmentKeys, Error> {
    let TaprootProofKind::Commitment(commitment_proof) = &proof.kind else {
        return Err(Error::MissingCommitmentProof);
    };

    let asset = asset.without_split_commitment();
    let tap_commitment = derive_commitment_by_asset_inclusion(commitment_proof, &asset)?;
    derive_commitment_keys(
        ops,
        &tap_commitment,
        &SerializedKey::from(proof.internal_key),
        commitment_proof.tap_sibling_preimage.as_ref(),
    )
}

/// Derives the candidate output keys for a proof that `asset` is absent from
/// the proof's output.
pub fn derive_by_asset_exclusion<O: TaprootOps>(
    ops: &O,
    proof: &TaprootProof,
    asset: &Asset,
) -> Result<ProofCommitmentKeys, Error> {
    let TaprootProofKind::Commitment(commitment_proof) = &proof.kind else {
        return Err(Error::MissingCommitmentProof);
    };

    // Without an asset proof the whole asset commitment is absent.
    let tap_commitment = match commitment_proof.proof.asset_proof {
        None => derive_commitment_by_asset_commitment_exclusion(
            commitment_proof,
            tap_commitment_key(asset)?,
        )?,
        Some(_) => {
            derive_commitment_by_asset_exclusion(commitment_proof, asset_commitment_key(asset)?)?
        }
    };

    derive_commitment_keys(
        ops,
        &tap_commitment,
        &SerializedKey::from(proof.internal_key),
        commitment_proof.tap_sibling_preimage.as_ref(),
    )
}

/// Derives the output key for a tapscript proof, which shows the output
/// commits to no Taproot Asset tree at all.
pub fn derive_by_tapscript_proof<O: TaprootOps>(
    ops: &O,
    proof: &TaprootProof,
) -> Result<SerializedKey, Error> {
    let TaprootProofKind::Tapscript(tapscript_proof) = &proof.kind else {
        return Err(Error::InvalidTapscriptProof);
    };

    let internal_key = ops.parse_internal_key(&SerializedKey::from(proof.internal_key))?;
    let tapscript_root = tapscript_proof_root(tapscript_proof)?;
    Ok(ops.taproot_output_key(&internal_key, tapscript_root)?)
}

fn derive_commitment_keys<O: TaprootOps>(
    ops: &O,
    commitment: &TapCommitment,
    internal_key: &SerializedKey,
    sibling: Option<&TapscriptPreimage>,
) -> Result<ProofCommitmentKeys, Error> {
    let internal_key = ops.parse_internal_key(internal_key)?;
    let mut keys = ProofCommitmentKeys::new();
    for candidate in [commitment.clone(), commitment.downgrade()] {
        let root = candidate.tapscript_root(sibling)?;
        let key = ops.taproot_output_key(&internal_key, Some(root.to_byte_array()))?;
        keys.insert(key, candidate);
    }
    Ok(keys)
}

/// Tapscript root described by a tapscript proof, or `None` for a BIP-86
/// key-only output.
fn tapscript_proof_root(proof: &TapscriptProof) -> Result<Option<[u8; 32]>, Error> {
    let non_empty = |preimage: &Option<TapscriptPreimage>| {
        preimage
            .as_ref()
            .filter(|p| !p.sibling_preimage.is_empty())
            .cloned()
    };

    use TapscriptPreimageType::{BranchPreimage, LeafPreimage};
    match (non_empty(&proof.tap_preimage1), non_empty(&proof.tap_preimage2)) {
        (Some(left), Some(right)) => match (left.sibling_type, right.sibling_type) {
            (LeafPreimage, LeafPreimage)
            | (BranchPreimage, BranchPreimage)
            | (LeafPreimage, BranchPreimage) => {
                let left = tapscript_preimage_hash(&left)?;
                let right = tapscript_preimage_hash(&right)?;
                Ok(Some(TapNodeHash::from_node_hashes(left, right).to_byte_array()))
            }
            (BranchPreimage, LeafPreimage) => Err(Error::InvalidTapscriptProof),
        },
        (Some(leaf), None) if leaf.sibling_type == LeafPreimage => {
            Ok(Some(tapscript_preimage_hash(&leaf)?.to_byte_array()))
        }
        (None, None) if proof.bip86 => Ok(None),
        _ => Err(Error::InvalidTapscriptProof),
    }
}

/// Computes the tap hash for a tapscript preimage.
pub fn tapscript_preimage_hash(preimage: &TapscriptPreimage) -> Result<TapNodeHash, Error> {
    if preimage.sibling_preimage.is_empty() {
        return Err(Error::EmptyTapscriptPreimage);
    }

    match preimage.sibling_type {
        TapscriptPreimageType::LeafPreimage => {
            let (leaf_version, script) = decode_tapleaf_preimage(&preimage.sibling_preimage)?;
            if is_taproot_asset_commitment_script(script) {
                return Err(Error::TapscriptPreimageIsTapCommitment);
            }
            Ok(TapNodeHash::from_script(Script::from_bytes(script), leaf_version))
        }
        TapscriptPreimageType::BranchPreimage => {
            let actual = preimage.sibling_preimage.len();
            if actual != TAP_BRANCH_PREIMAGE_LEN {
                return Err(Error::InvalidTapscriptPreimageLength {
                    expected: TAP_BRANCH_PREIMAGE_LEN,
                    actual,
                });
            }

            let mut left = [0u8; 32];
            left.copy_from_slice(&preimage.sibling_preimage[..32]);
            let mut right = [0u8; 32];
            right.copy_from_slice(&preimage.sibling_preimage[32..]);

            Ok(TapNodeHash::from_node_hashes(
                TapNodeHash::from_byte_array(left),
                TapNodeHash::from_byte_array(right),
            ))
        }
    }
}

/// Splits a tapleaf preimage into its leaf version and script.
fn decode_tapleaf_preimage(preimage: &[u8]) -> Result<(LeafVersion, &[u8]), Error> {
    let (&version, rest) = preimage
        .split_first()
        .ok_or(Error::InvalidTapLeafScriptLength)?;

    let leaf_version =
        LeafVersion::from_consensus(version).map_err(|_| Error::InvalidTapLeafScriptVersion)?;
    if leaf_version != LeafVersion::TapScript {
        return Err(Error::InvalidTapLeafScriptVersion);
    }

    let (script_len, len_len) = decode_compact_size(rest)?;
    let script_len = usize::try_from(script_len).map_err(|_| Error::InvalidTapLeafScriptLength)?;
    let script = &rest[len_len..];
    if script.len() != script_len || script.is_empty() || script.len() >= MAX_TAPLEAF_SCRIPT_SIZE {
        return Err(Error::InvalidTapLeafScriptLength);
    }

    Ok((leaf_version, script))
}

/// Decodes a Bitcoin compact size integer from a byte slice.
fn decode_compact_size(bytes: &[u8]) -> Result<(u64, usize), Error> {
    let (&first, rest) = bytes
        .split_first()
        .ok_or(Error::InvalidTapLeafScriptLength)?;
    let width = match first {
        0..=0xFC => return Ok((first as u64, 1)),
        0xFD => 2,
        0xFE => 4,
        0xFF => 8,
    };
    let value = rest.get(..width).ok_or(Error::InvalidTapLeafScriptLength)?;
    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(value);
    Ok((u64::from_le_bytes(buf), 1 + width))
}

/// Returns true if the script matches the Taproot Asset commitment pattern.
pub fn is_taproot_asset_commitment_script(script: &[u8]) -> bool {
    if script.len() != TAPROOT_ASSET_COMMITMENT_SCRIPT_SIZE {
        return false;
    }

    match script[0] {
        v if v == TapCommitmentVersion::V0 as u8 || v == TapCommitmentVersion::V1 as u8 => {
            script[1..33] == taproot_assets_marker()
        }
        _ => script[..32] == taproot_assets_v2_tag(),
    }
}

fn taproot_assets_marker() -> [u8; 32] {
    Sha256Hash::hash(TAPROOT_ASSETS_MARKER_TAG.as_bytes()).to_byte_array()
}

fn taproot_assets_v2_tag() -> [u8; 32] {
    Sha256Hash::hash(TAPROOT_ASSETS_V2_TAG.as_bytes()).to_byte_array()
}

/// Rebuilds the TapCommitment from an asset leaf and both levels of proof.
fn derive_commitment_by_asset_inclusion(
    commitment_proof: &CommitmentProof,
    asset: &Asset,
) -> Result<TapCommitment, Error> {
    let leaf = asset.leaf_node().map_err(|_| Error::InvalidAssetEncoding)?;
    derive_commitment_from_asset_leaf(commitment_proof, asset_commitment_key(asset)?, leaf)
}

/// Rebuilds the TapCommitment with an empty leaf at the asset's position.
fn derive_commitment_by_asset_exclusion(
    commitment_proof: &CommitmentProof,
    asset_commitment_key: [u8; 32],
) -> Result<TapCommitment, Error> {
    derive_commitment_from_asset_leaf(commitment_proof, asset_commitment_key, empty_leaf())
}

fn derive_commitment_from_asset_leaf(
    commitment_proof: &CommitmentProof,
    asset_key: [u8; 32],
    leaf: MssmtNode,
) -> Result<TapCommitment, Error> {
    let asset_proof = commitment_proof
        .proof
        .asset_proof
        .as_ref()
        .ok_or(Error::MissingAssetProof)?;
    let taproot_asset_proof = &commitment_proof.proof.taproot_asset_proof;

    let asset_root = mssmt_root(asset_key, leaf, &asset_proof.proof)?;
    let commitment_leaf = asset_commitment_leaf(
        asset_proof.version,
        asset_commitment_root(asset_proof.tap_key, &asset_root),
        asset_root.root_sum,
    );
    let taproot_root = mssmt_root(
        asset_proof.tap_key,
        MssmtNode::leaf(&commitment_leaf, asset_root.root_sum),
        &taproot_asset_proof.proof,
    )?;

    Ok(TapCommitment {
        version: taproot_asset_proof.version,
        root_hash: taproot_root.root_hash,
        root_sum: taproot_root.root_sum,
    })
}

/// Rebuilds the TapCommitment with an empty leaf at the asset commitment's
/// position.
fn derive_commitment_by_asset_commitment_exclusion(
    commitment_proof: &CommitmentProof,
    tap_commitment_key: [u8; 32],
) -> Result<TapCommitment, Error> {
    if commitment_proof.proof.asset_proof.is_some() {
        return Err(Error::UnexpectedAssetProof);
    }
    let taproot_asset_proof = &commitment_proof.proof.taproot_asset_proof;
    let taproot_root = mssmt_root(tap_commitment_key, empty_leaf(), &taproot_asset_proof.proof)?;

    Ok(TapCommitment {
        version: taproot_asset_proof.version,
        root_hash: taproot_root.root_hash,
        root_sum: taproot_root.root_sum,
    })
}

/// Computes the asset commitment root hash from MS-SMT root data.
fn asset_commitment_root(tap_key: [u8; 32], root: &MssmtRoot) -> [u8; 32] {
    let mut engine = Sha256Hash::engine();
    engine.input(&tap_key);
    engine.input(&root.left_hash);
    engine.input(&root.right_hash);
    engine.input(&root.root_sum.to_be_bytes());
    Sha256Hash::from_engine(engine).to_byte_array()
}

/// Encodes an asset commitment leaf for insertion into the TapCommitment tree.
fn asset_commitment_leaf(version: AssetVersion, root_hash: [u8; 32], sum: u64) -> Vec<u8> {
    let mut leaf = Vec::with_capacity(1 + 32 + 8);
    leaf.push(version as u8);
    leaf.extend_from_slice(&root_hash);
    leaf.extend_from_slice(&sum.to_be_bytes());
    leaf
}

/// Key of the asset's commitment in the TapCommitment tree: the hashed group
/// key for grouped assets, the asset ID otherwise.
pub fn tap_commitment_key(asset: &Asset) -> Result<[u8; 32], Error> {
    match &asset.group_key {
        Some(group_key) => {
            let pubkey = SecpPublicKey::from_slice(&group_key.bytes)
                .map_err(|_| Error::InvalidAssetGroupKey)?;
            let (xonly, _) = pubkey.x_only_public_key();
            Ok(Sha256Hash::hash(&xonly.serialize()).to_byte_array())
        }
        None => Ok(asset.id().to_byte_array()),
    }
}

/// Key of the asset within its asset commitment.
pub fn asset_commitment_key(asset: &Asset) -> Result<[u8; 32], Error> {
    let script_key = SecpPublicKey::from_slice(&asset.script_key.bytes)
        .map_err(|_| Error::InvalidAssetScriptKey)?;
    let (xonly, _) = script_key.x_only_public_key();

    // Ungrouped assets can never be reissued, so the script key alone is unique.
    if asset.group_key.is_none() {
        return Ok(Sha256Hash::hash(&xonly.serialize()).to_byte_array());
    }

    let mut engine = Sha256Hash::engine();
    engine.input(asset.id().as_byte_array());
    engine.input(&xonly.serialize());
    Ok(Sha256Hash::from_engine(engine).to_byte_array())
}
