//! Proof-level verification helpers.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;

use bitcoin::consensus::encode::serialize;
use bitcoin::hashes::{sha256::Hash as Sha256Hash, Hash, HashEngine};
use bitcoin::secp256k1::{Scalar, Secp256k1, XOnlyPublicKey};
use bitcoin::taproot::TapTweakHash;
use bitcoin::{OutPoint, Transaction};
use taproot_proof_types::asset::{
    Asset, AssetType, AssetVersion, Genesis, PrevId, PrevWitness, SerializedKey,
};
use taproot_proof_types::codec;
use taproot_proof_types::commitment::{self, TapCommitmentVersion};
use taproot_proof_types::proof::{CommitmentProof, Proof, TaprootProof, TaprootProofKind};
use taproot_proof_types::tlv::UnknownOddTypes;

use crate::verify::taproot_proof::{self, TapCommitment};
use crate::TaprootOps;

/// Length in bytes of a compressed public key.
const COMPRESSED_KEY_LEN: usize = 33;
/// NUMS key used for burn key derivation.
const NUMS_COMPRESSED_KEY: [u8; COMPRESSED_KEY_LEN] = [
    0x02, 0x7c, 0x79, 0xb9, 0xb2, 0x6e, 0x46, 0x38, 0x95, 0xee, 0xf5, 0x67, 0x9d, 0x85, 0x58, 0x94,
    0x2c, 0x86, 0xc4, 0xad, 0x22, 0x33, 0xad, 0xef, 0x01, 0xbc, 0x3e, 0x6d, 0x54, 0x0b, 0x36, 0x53,
    0xfe,
];

/// Output index to the STXO script keys still unproven there.
type OutputStxoKeys = BTreeMap<u32, BTreeSet<SerializedKey>>;

/// Proof verification stage used for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofStage {
    /// Inclusion proof verification stage.
    Inclusion,
    /// Exclusion proof verification stage.
    Exclusion,
    /// Split root proof verification stage.
    SplitRoot,
    /// STXO proof verification stage.
    Stxo,
}

impl core::fmt::Display for ProofStage {
    /// Formats the stage for display.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProofStage::Inclusion => write!(f, "inclusion"),
            ProofStage::Exclusion => write!(f, "exclusion"),
            ProofStage::SplitRoot => write!(f, "split_root"),
            ProofStage::Stxo => write!(f, "stxo"),
        }
    }
}

/// Errors returned by proof verification helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Taproot proof verification failed at a specific stage.
    TaprootProof {
        /// Stage where verification failed.
        stage: ProofStage,
        /// Underlying taproot proof error.
        source: taproot_proof::Error,
    },
    /// The proof's transition version is not registered.
    UnknownVersion(u32),
    /// Split root proof is missing for a split commitment asset.
    MissingSplitRootProof,
    /// The split root asset itself carries a split commitment.
    NestedSplitRoot,
    /// A P2TR output other than the inclusion output has no exclusion proof.
    MissingExclusionProof {
        /// Output left uncovered.
        output_index: u32,
    },
    /// A transfer-root asset is missing required STXO proofs.
    MissingStxoProofs,
    /// Some spent inputs have no STXO proof for an output.
    MissingStxoInputProofs,
    /// A commitment proof is required but the proof is a tapscript proof.
    MissingCommitmentProof,
    /// An STXO proof names a script key that no spent input maps to.
    MissingStxoAsset {
        /// Script key that lacks a corresponding STXO asset.
        key: SerializedKey,
    },
    /// A witness is missing its PrevID.
    MissingPrevId,
    /// The NUMS key used for burn derivation is invalid.
    InvalidNumsKey,
    /// Tap tweak scalar for burn key derivation is invalid.
    InvalidBurnKeyTweak,
    /// Inclusion and exclusion proofs use incompatible commitment versions.
    MixedCommitmentVersions,
}

impl core::fmt::Display for Error {
    /// Formats the error for display.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::TaprootProof { stage, source } => {
                write!(f, "taproot proof {} error: {}", stage, source)
            }
            Error::UnknownVersion(version) => write!(f, "unknown version {}", version),
            Error::MissingSplitRootProof => write!(f, "missing split root proof"),
            Error::NestedSplitRoot => write!(f, "split root asset is itself a split"),
            Error::MissingExclusionProof { output_index } => {
                write!(f, "missing exclusion proof for output {}", output_index)
            }
            Error::MissingStxoProofs => write!(f, "missing STXO proofs"),
            Error::MissingStxoInputProofs => write!(f, "missing STXO input proofs"),
            Error::MissingCommitmentProof => write!(f, "missing commitment proof"),
            Error::MissingStxoAsset { key } => {
                write!(f, "missing STXO asset for key {:?}", key)
            }
            Error::MissingPrevId => write!(f, "witness missing PrevID"),
            Error::InvalidNumsKey => write!(f, "invalid NUMS key"),
            Error::InvalidBurnKeyTweak => write!(f, "invalid burn key tweak"),
            Error::MixedCommitmentVersions => write!(f, "mixed commitment versions"),
        }
    }
}

/// Verifies inclusion, split root and exclusion proofs for a state transition
/// proof and returns the commitment found in the inclusion output.
pub fn verify_proofs<O: TaprootOps>(ops: &O, proof: &Proof) -> Result<TapCommitment, Error> {
    let tap_commitment = verify_inclusion_proof(ops, proof)?;

    if proof.asset.has_split_commitment_witness() {
        verify_split_root_proof(ops, proof)?;
    }

    if let Some(version) = verify_exclusion_proofs(ops, proof)? {
        if !tap_commitment.version.compatible_with(version) {
            return Err(Error::MixedCommitmentVersions);
        }
    }

    Ok(tap_commitment)
}

/// Verifies the inclusion proof for the resulting asset, including the STXO
/// inclusion proofs of a transfer root.
pub fn verify_inclusion_proof<O: TaprootOps>(
    ops: &O,
    proof: &Proof,
) -> Result<TapCommitment, Error> {
    let commitment = taproot_proof::verify_taproot_proof_with_commitment(
        ops,
        &proof.anchor_tx,
        &proof.inclusion_proof,
        &proof.asset,
        true,
    )
    .map_err(|source| Error::TaprootProof {
        stage: ProofStage::Inclusion,
        source,
    })?
    .ok_or(Error::MissingCommitmentProof)?;

    let has_stxo_proofs = has_stxo_proofs(&proof.inclusion_proof);
    if requires_stxo_proofs(proof)? && !has_stxo_proofs {
        return Err(Error::MissingStxoProofs);
    }
    if !proof.asset.is_transfer_root() || !has_stxo_proofs {
        return Ok(commitment);
    }

    let (asset_map, stxo_keys) = collect_stxo_assets(&proof.asset)?;
    let mut outputs = OutputStxoKeys::new();
    outputs.insert(proof.inclusion_proof.output_index, stxo_keys);

    verify_stxo_proof_set(
        ops,
        &proof.anchor_tx,
        &proof.inclusion_proof,
        &asset_map,
        &mut outputs,
        true,
    )?;

    if !outputs.is_empty() {
        return Err(Error::MissingStxoInputProofs);
    }

    Ok(commitment)
}

/// Verifies the split root proof: the root asset of the split commitment
/// must be committed in the split root output.
pub fn verify_split_root_proof<O: TaprootOps>(ops: &O, proof: &Proof) -> Result<(), Error> {
    let split_proof = proof
        .split_root_proof
        .as_ref()
        .ok_or(Error::MissingSplitRootProof)?;
    let root_asset = split_root_asset(&proof.asset).ok_or(Error::MissingSplitRootProof)?;
    if root_asset.has_split_commitment_witness() {
        return Err(Error::NestedSplitRoot);
    }
    taproot_proof::verify_taproot_proof(ops, &proof.anchor_tx, split_proof, root_asset, true)
        .map_err(|source| Error::TaprootProof {
            stage: ProofStage::SplitRoot,
            source,
        })
}

/// Verifies that every P2TR output other than the inclusion output proves
/// the asset absent. Returns the commitment version shared by the exclusion
/// proofs, if any of them found a commitment.
pub fn verify_exclusion_proofs<O: TaprootOps>(
    ops: &O,
    proof: &Proof,
) -> Result<Option<TapCommitmentVersion>, Error> {
    let p2tr_outputs: BTreeSet<u32> = proof
        .anchor_tx
        .output
        .iter()
        .enumerate()
        .filter(|(_, output)| output.script_pubkey.is_p2tr())
        .map(|(idx, _)| idx as u32)
        .filter(|idx| *idx != proof.inclusion_proof.output_index)
        .collect();

    let mut uncovered = p2tr_outputs.clone();
    let mut versions = Vec::new();
    for exclusion_proof in &proof.exclusion_proofs {
        let derived = taproot_proof::verify_taproot_proof_with_commitment(
            ops,
            &proof.anchor_tx,
            exclusion_proof,
            &proof.asset,
            false,
        )
        .map_err(|source| Error::TaprootProof {
            stage: ProofStage::Exclusion,
            source,
        })?;

        uncovered.remove(&exclusion_proof.output_index);
        if let Some(commitment) = derived {
            versions.push(commitment.version);
        }
    }

    if let Some(&output_index) = uncovered.first() {
        return Err(Error::MissingExclusionProof { output_index });
    }

    let Some(&first) = versions.first() else {
        return Ok(None);
    };
    if versions.iter().any(|version| !first.compatible_with(*version)) {
        return Err(Error::MixedCommitmentVersions);
    }

    let has_stxo_proofs = proof.exclusion_proofs.iter().any(has_stxo_proofs);
    if requires_stxo_proofs(proof)? && !has_stxo_proofs {
        return Err(Error::MissingStxoProofs);
    }
    if proof.asset.is_transfer_root() && has_stxo_proofs {
        verify_stxo_exclusion_proofs(ops, proof, p2tr_outputs)?;
    }

    Ok(Some(first))
}

/// Every spent input must be proven absent from each committed output other
/// than the inclusion output.
fn verify_stxo_exclusion_proofs<O: TaprootOps>(
    ops: &O,
    proof: &Proof,
    p2tr_outputs: BTreeSet<u32>,
) -> Result<(), Error> {
    let (asset_map, stxo_keys) = collect_stxo_assets(&proof.asset)?;
    let mut outputs: OutputStxoKeys = p2tr_outputs
        .into_iter()
        .map(|idx| (idx, stxo_keys.clone()))
        .collect();

    for exclusion_proof in &proof.exclusion_proofs {
        if let TaprootProofKind::Tapscript(_) = exclusion_proof.kind {
            outputs.remove(&exclusion_proof.output_index);
            continue;
        }

        verify_stxo_proof_set(
            ops,
            &proof.anchor_tx,
            exclusion_proof,
            &asset_map,
            &mut outputs,
            false,
        )?;
    }

    if !outputs.is_empty() {
        return Err(Error::MissingStxoInputProofs);
    }

    Ok(())
}

/// Verifies the STXO proofs carried by `base_proof` and ticks off every key
/// they prove for the base proof's output.
fn verify_stxo_proof_set<O: TaprootOps>(
    ops: &O,
    anchor_tx: &Transaction,
    base_proof: &TaprootProof,
    asset_map: &BTreeMap<SerializedKey, Asset>,
    outputs: &mut OutputStxoKeys,
    inclusion: bool,
) -> Result<(), Error> {
    let base_commitment = base_proof
        .commitment_proof()
        .ok_or(Error::MissingCommitmentProof)?;

    for (key, stxo_proof) in &base_commitment.stxo_proofs {
        let stxo_asset = asset_map
            .get(key)
            .ok_or(Error::MissingStxoAsset { key: *key })?;
        let stxo_combined = make_stxo_proof(base_proof, base_commitment, stxo_proof);

        taproot_proof::verify_taproot_proof(ops, anchor_tx, &stxo_combined, stxo_asset, inclusion)
            .map_err(|source| Error::TaprootProof {
                stage: ProofStage::Stxo,
                source,
            })?;

        let out_idx = stxo_combined.output_index;
        if let Some(keys) = outputs.get_mut(&out_idx) {
            keys.remove(key);
            if keys.is_empty() {
                outputs.remove(&out_idx);
            }
        }
    }

    Ok(())
}

/// Places an STXO commitment proof in the base proof's output.
fn make_stxo_proof(
    base_proof: &TaprootProof,
    base_commitment: &CommitmentProof,
    stxo_proof: &commitment::Proof,
) -> TaprootProof {
    TaprootProof {
        output_index: base_proof.output_index,
        internal_key: base_proof.internal_key,
        kind: TaprootProofKind::Commitment(CommitmentProof {
            proof: stxo_proof.clone(),
            tap_sibling_preimage: base_commitment.tap_sibling_preimage.clone(),
            stxo_proofs: BTreeMap::new(),
        }),
        unknown_odd_types: base_proof.unknown_odd_types.clone(),
    }
}

fn has_stxo_proofs(proof: &TaprootProof) -> bool {
    proof
        .commitment_proof()
        .is_some_and(|commitment| !commitment.stxo_proofs.is_empty())
}

/// Returns true if the proof's transition version demands STXO proofs and
/// the asset is a transfer root.
fn requires_stxo_proofs(proof: &Proof) -> Result<bool, Error> {
    let registered =
        codec::transition(proof.version).map_err(|_| Error::UnknownVersion(proof.version.0))?;
    Ok(registered.requires_stxo_proofs && proof.asset.is_transfer_root())
}

/// Returns the root asset of a split commitment witness.
pub fn split_root_asset(asset: &Asset) -> Option<&Asset> {
    asset
        .prev_witnesses
        .first()?
        .split_commitment
        .as_ref()
        .map(|split| split.root_asset.as_ref())
}

/// Maps each spent input of a transfer root to the alt-leaf asset that
/// marks it spent.
fn collect_stxo_assets(
    asset: &Asset,
) -> Result<(BTreeMap<SerializedKey, Asset>, BTreeSet<SerializedKey>), Error> {
    let mut asset_map = BTreeMap::new();
    let mut keys = BTreeSet::new();
    if !asset.is_transfer_root() {
        return Ok((asset_map, keys));
    }

    for witness in &asset.prev_witnesses {
        let stxo_asset = make_spent_asset(witness)?;
        keys.insert(stxo_asset.script_key);
        asset_map.insert(stxo_asset.script_key, stxo_asset);
    }

    Ok((asset_map, keys))
}

fn make_spent_asset(witness: &PrevWitness) -> Result<Asset, Error> {
    let prev_id = witness.prev_id.as_ref().ok_or(Error::MissingPrevId)?;
    Ok(make_alt_leaf_asset(derive_burn_script_key(prev_id)?))
}

/// The minimal asset committed as an alt leaf for a spent input.
pub fn make_alt_leaf_asset(script_key: SerializedKey) -> Asset {
    Asset {
        version: AssetVersion::V0,
        genesis: Genesis {
            first_prev_out: OutPoint { txid: bitcoin::Txid::all_zeros(), vout: 0 },
            tag: String::new(),
            meta_hash: Sha256Hash::all_zeros(),
            output_index: 0,
            asset_type: AssetType::Normal,
        },
        amount: 0,
        lock_time: 0,
        relative_lock_time: 0,
        prev_witnesses: Vec::new(),
        split_commitment_root: None,
        script_version: 0,
        script_key,
        group_key: None,
        unknown_odd_types: UnknownOddTypes::new(),
    }
}

/// Derives the burn script key for a spent input: the NUMS key tap-tweaked
/// by the serialized PrevID.
pub fn derive_burn_script_key(prev_id: &PrevId) -> Result<SerializedKey, Error> {
    let nums_pubkey = bitcoin::secp256k1::PublicKey::from_slice(&NUMS_COMPRESSED_KEY)
        .map_err(|_| Error::InvalidNumsKey)?;
    let (nums_xonly, _) = nums_pubkey.x_only_public_key();

    let mut tweak_data = serialize(&prev_id.out_point);
    tweak_data.extend_from_slice(prev_id.asset_id.as_byte_array());
    tweak_data.extend_from_slice(&prev_id.script_key.x_only_bytes());

    let tweak = tap_tweak_scalar(nums_xonly, &tweak_data)?;
    let secp = Secp256k1::verification_only();
    let (tweaked, _) = nums_xonly
        .add_tweak(&secp, &tweak)
        .map_err(|_| Error::InvalidBurnKeyTweak)?;

    let mut bytes = [0u8; COMPRESSED_KEY_LEN];
    bytes[0] = 0x02;
    bytes[1..].copy_from_slice(&tweaked.serialize());
    Ok(SerializedKey { bytes })
}

fn tap_tweak_scalar(internal_key: XOnlyPublicKey, tweak_data: &[u8]) -> Result<Scalar, Error> {
    let mut eng = TapTweakHash::engine();
    eng.input(&internal_key.serialize());
    eng.input(tweak_data);
    let hash = TapTweakHash::from_engine(eng);
    Scalar::from_be_bytes(hash.to_byte_array()).map_err(|_| Error::InvalidBurnKeyTweak)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use bitcoin::Txid;

    fn prev_id(vout: u32) -> PrevId {
        PrevId {
            out_point: OutPoint {
                txid: Txid::from_byte_array([4u8; 32]),
                vout,
            },
            asset_id: Sha256Hash::from_byte_array([5u8; 32]),
            script_key: SerializedKey::from_slice(&NUMS_COMPRESSED_KEY).unwrap(),
        }
    }

    #[test]
    fn burn_keys_are_distinct_per_input() {
        let first = derive_burn_script_key(&prev_id(0)).unwrap();
        let second = derive_burn_script_key(&prev_id(1)).unwrap();
        assert_ne!(first, second);
        assert_eq!(first.bytes[0], 0x02);
        assert_eq!(first, derive_burn_script_key(&prev_id(0)).unwrap());
    }

    #[test]
    fn alt_leaf_asset_is_not_genesis() {
        let asset = make_alt_leaf_asset(SerializedKey::ZERO);
        assert!(asset.prev_witnesses.is_empty());
        assert!(!asset.is_genesis());
        assert!(!asset.is_transfer_root());
        assert!(asset.leaf_encoding().is_ok());
    }

    #[test]
    fn transfer_root_inputs_map_to_burn_keys() {
        let mut asset = make_alt_leaf_asset(SerializedKey::ZERO);
        asset.prev_witnesses = alloc::vec![
            PrevWitness {
                prev_id: Some(prev_id(0)),
                tx_witness: Default::default(),
                split_commitment: None,
            },
            PrevWitness {
                prev_id: Some(prev_id(1)),
                tx_witness: Default::default(),
                split_commitment: None,
            },
        ];
        let (map, keys) = collect_stxo_assets(&asset).unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys
            .iter()
            .all(|key| map.get(key).is_some_and(|a| a.script_key == *key)));

        asset.prev_witnesses[1].prev_id = None;
        assert_eq!(collect_stxo_assets(&asset), Err(Error::MissingPrevId));
    }
}
