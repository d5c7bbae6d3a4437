//! Fixture builder for integration tests: real keys, real P2TR anchors in
//! single transaction blocks, and a small sparse MS-SMT to commit assets.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Once};

use bitcoin::absolute::LockTime;
use bitcoin::block::{Header, Version as BlockVersion};
use bitcoin::hashes::{sha256::Hash as Sha256Hash, Hash, HashEngine};
use bitcoin::key::TweakedPublicKey;
use bitcoin::secp256k1::{Keypair, Message, Secp256k1, SecretKey, XOnlyPublicKey};
use bitcoin::transaction::Version as TxVersion;
use bitcoin::{
    Amount, BlockHash, CompactTarget, OutPoint, ScriptBuf, Sequence, Transaction, TxIn,
    TxMerkleNode, TxOut, Txid, Witness,
};
use log::{Level, Log, Metadata, Record};
use taproot_proof::core::verify::ownership::ownership_message;
use taproot_proof::core::verify::proof::{derive_burn_script_key, make_alt_leaf_asset};
use taproot_proof::core::verify::taproot_proof::{
    asset_commitment_key, tap_commitment_key, TapCommitment,
};
use taproot_proof::core::verify::tx::TxMerkleProofVerifier;
use taproot_proof::core::TaprootOps;
use taproot_proof::types::asset::{
    Asset, AssetType, AssetVersion, Genesis, GroupKeyReveal, PrevId, PrevWitness,
    SerializedKey, SplitCommitment,
};
use taproot_proof::types::codec::TransitionVersion;
use taproot_proof::types::commitment::{
    self, AssetProof, TapCommitmentVersion, TaprootAssetProof, TapscriptPreimage,
};
use taproot_proof::types::meta::{MetaReveal, MetaType};
use taproot_proof::types::mssmt::{bit_index, empty_tree, MssmtNode, MssmtProof, TREE_LEVELS};
use taproot_proof::types::proof::{
    CommitmentProof, Proof, TaprootProof, TaprootProofKind, TapscriptProof, TxMerkleProof,
};
use taproot_proof::verify::group_pubkey_from_reveal;
use taproot_proof::{BitcoinTaprootOps, CallbackError, Verifiers};

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

pub fn keypair(seed: u8) -> Keypair {
    let secp = Secp256k1::new();
    let mut secret = [0u8; 32];
    secret[31] = seed.max(1);
    secret[0] = 0x42;
    Keypair::from_secret_key(&secp, &SecretKey::from_slice(&secret).unwrap())
}

pub fn key_of(pair: &Keypair) -> SerializedKey {
    SerializedKey::from(pair.public_key())
}

pub fn accept_header(_: &Header, _: u32) -> Result<(), CallbackError> {
    Ok(())
}

pub fn accept_group(_: &SerializedKey) -> Result<(), CallbackError> {
    Ok(())
}

/// Verifiers that accept every header and group and walk the real merkle
/// path.
pub fn verifiers() -> Verifiers<'static> {
    Verifiers {
        header: &accept_header,
        merkle: &TxMerkleProofVerifier,
        group: &accept_group,
    }
}

/// A sparse MS-SMT over explicit leaves.
#[derive(Debug, Clone, Default)]
pub struct SparseTree {
    leaves: BTreeMap<[u8; 32], MssmtNode>,
}

type Leaf<'a> = (&'a [u8; 32], &'a MssmtNode);

impl SparseTree {
    pub fn insert(&mut self, key: [u8; 32], leaf: MssmtNode) {
        self.leaves.insert(key, leaf);
    }

    pub fn root(&self) -> MssmtNode {
        let empty = empty_tree();
        let leaves: Vec<Leaf<'_>> = self.leaves.iter().collect();
        subtree(0, &leaves, &empty)
    }

    /// The root's two children.
    pub fn children(&self) -> (MssmtNode, MssmtNode) {
        let empty = empty_tree();
        let (left, right): (Vec<Leaf<'_>>, Vec<Leaf<'_>>) = self
            .leaves
            .iter()
            .partition(|(key, _)| bit_index(0, key) == 0);
        (subtree(1, &left, &empty), subtree(1, &right, &empty))
    }

    /// Sibling path for `key`, present or not. Empty siblings are left as
    /// placeholders, the form a decoded proof has.
    pub fn proof(&self, key: &[u8; 32]) -> MssmtProof {
        let empty = empty_tree();
        let mut nodes = vec![MssmtNode::placeholder(); TREE_LEVELS];
        let mut current: Vec<Leaf<'_>> = self.leaves.iter().collect();
        for depth in 0..TREE_LEVELS {
            let bit = bit_index(depth, key);
            let (same, other): (Vec<Leaf<'_>>, Vec<Leaf<'_>>) = current
                .into_iter()
                .partition(|(leaf_key, _)| bit_index(depth, leaf_key) == bit);
            if !other.is_empty() {
                nodes[TREE_LEVELS - 1 - depth] = subtree(depth + 1, &other, &empty);
            }
            current = same;
        }
        MssmtProof { nodes }
    }
}

fn subtree(depth: usize, leaves: &[Leaf<'_>], empty: &[MssmtNode]) -> MssmtNode {
    match leaves {
        [] => empty[depth].clone(),
        [(_, leaf)] if depth == TREE_LEVELS => (*leaf).clone(),
        _ => {
            let (left, right): (Vec<Leaf<'_>>, Vec<Leaf<'_>>) = leaves
                .iter()
                .copied()
                .partition(|(key, _)| bit_index(depth, key) == 0);
            MssmtNode::branch(
                &subtree(depth + 1, &left, empty),
                &subtree(depth + 1, &right, empty),
            )
            .expect("sum overflow")
        }
    }
}

/// The asset commitments of one anchor output.
#[derive(Debug, Clone)]
pub struct OutputCommitment {
    pub version: TapCommitmentVersion,
    assets: BTreeMap<[u8; 32], (AssetVersion, SparseTree)>,
}

impl OutputCommitment {
    pub fn new(assets: &[&Asset]) -> Self {
        let mut commitment = OutputCommitment {
            version: TapCommitmentVersion::V2,
            assets: BTreeMap::new(),
        };
        for asset in assets {
            commitment.insert(asset);
        }
        commitment
    }

    pub fn insert(&mut self, asset: &Asset) {
        let tap_key = tap_commitment_key(asset).unwrap();
        let leaf = asset.without_split_commitment().leaf_node().unwrap();
        self.assets
            .entry(tap_key)
            .or_insert_with(|| (asset.version, SparseTree::default()))
            .1
            .insert(asset_commitment_key(asset).unwrap(), leaf);
    }

    fn tap_tree(&self) -> SparseTree {
        let mut tree = SparseTree::default();
        for (tap_key, (version, assets)) in &self.assets {
            tree.insert(*tap_key, asset_commitment_leaf(*version, *tap_key, assets));
        }
        tree
    }

    pub fn tap_commitment(&self) -> TapCommitment {
        let root = self.tap_tree().root();
        TapCommitment {
            version: self.version,
            root_hash: root.hash.to_byte_array(),
            root_sum: root.sum,
        }
    }

    /// Inclusion proof if `asset` is committed here, exclusion proof
    /// otherwise.
    pub fn proof_for(&self, asset: &Asset) -> commitment::Proof {
        let tap_key = tap_commitment_key(asset).unwrap();
        let asset_proof = self.assets.get(&tap_key).map(|(version, assets)| AssetProof {
            proof: assets.proof(&asset_commitment_key(asset).unwrap()),
            version: *version,
            tap_key,
            unknown_odd_types: Default::default(),
        });
        commitment::Proof {
            asset_proof,
            taproot_asset_proof: TaprootAssetProof {
                proof: self.tap_tree().proof(&tap_key),
                version: self.version,
                unknown_odd_types: Default::default(),
            },
            unknown_odd_types: Default::default(),
        }
    }
}

fn asset_commitment_leaf(version: AssetVersion, tap_key: [u8; 32], assets: &SparseTree) -> MssmtNode {
    let root = assets.root();
    let (left, right) = assets.children();
    let mut engine = Sha256Hash::engine();
    engine.input(&tap_key);
    engine.input(left.hash.as_byte_array());
    engine.input(right.hash.as_byte_array());
    engine.input(&root.sum.to_be_bytes());
    let root_hash = Sha256Hash::from_engine(engine);

    let mut leaf = vec![version as u8];
    leaf.extend_from_slice(root_hash.as_byte_array());
    leaf.extend_from_slice(&root.sum.to_be_bytes());
    MssmtNode::leaf(&leaf, root.sum)
}

/// One output of an anchor transaction.
#[derive(Debug, Clone)]
pub enum Output {
    Commitment {
        internal: Keypair,
        commitment: OutputCommitment,
        sibling: Option<TapscriptPreimage>,
    },
    Bip86 {
        internal: Keypair,
    },
    /// A non-taproot output that needs no exclusion proof.
    Plain,
}

impl Output {
    pub fn commitment(internal: Keypair, assets: &[&Asset]) -> Self {
        Output::Commitment {
            internal,
            commitment: OutputCommitment::new(assets),
            sibling: None,
        }
    }

    fn script_pubkey(&self) -> ScriptBuf {
        let ops = BitcoinTaprootOps::new();
        let output_key = match self {
            Output::Commitment {
                internal,
                commitment,
                sibling,
            } => {
                let root = commitment
                    .tap_commitment()
                    .tapscript_root(sibling.as_ref())
                    .unwrap();
                ops.taproot_output_key(&internal.public_key(), Some(root.to_byte_array()))
                    .unwrap()
            }
            Output::Bip86 { internal } => {
                ops.taproot_output_key(&internal.public_key(), None).unwrap()
            }
            Output::Plain => return ScriptBuf::from_bytes(vec![0x6a, 0x01, 0x00]),
        };
        let xonly = XOnlyPublicKey::from_slice(&output_key.x_only_bytes()).unwrap();
        ScriptBuf::new_p2tr_tweaked(TweakedPublicKey::dangerous_assume_tweaked(xonly))
    }

    /// Taproot proof for `asset` at this output. `None` for plain outputs.
    fn taproot_proof(&self, index: u32, asset: &Asset, stxo: &[Asset]) -> Option<TaprootProof> {
        let (internal_key, kind) = match self {
            Output::Commitment {
                internal,
                commitment,
                sibling,
            } => {
                let stxo_proofs = stxo
                    .iter()
                    .map(|alt| (alt.script_key, commitment.proof_for(alt)))
                    .collect();
                let kind = TaprootProofKind::Commitment(CommitmentProof {
                    proof: commitment.proof_for(asset),
                    tap_sibling_preimage: sibling.clone(),
                    stxo_proofs,
                });
                (internal.public_key(), kind)
            }
            Output::Bip86 { internal } => {
                let kind = TaprootProofKind::Tapscript(TapscriptProof {
                    tap_preimage1: None,
                    tap_preimage2: None,
                    bip86: true,
                    unknown_odd_types: Default::default(),
                });
                (internal.public_key(), kind)
            }
            Output::Plain => return None,
        };
        Some(TaprootProof {
            output_index: index,
            internal_key,
            kind,
            unknown_odd_types: Default::default(),
        })
    }
}

/// Anchor transaction spending `inputs`, mined alone in a block.
pub fn anchor(inputs: &[OutPoint], outputs: &[Output], height: u32) -> (Transaction, Header) {
    let tx = Transaction {
        version: TxVersion::TWO,
        lock_time: LockTime::ZERO,
        input: inputs
            .iter()
            .map(|previous_output| TxIn {
                previous_output: *previous_output,
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            })
            .collect(),
        output: outputs
            .iter()
            .map(|output| TxOut {
                value: Amount::from_sat(1_000),
                script_pubkey: output.script_pubkey(),
            })
            .collect(),
    };
    let header = Header {
        version: BlockVersion::TWO,
        prev_blockhash: BlockHash::all_zeros(),
        merkle_root: TxMerkleNode::from_byte_array(tx.compute_txid().to_byte_array()),
        time: 1_700_000_000 + height,
        bits: CompactTarget::from_consensus(0x207f_ffff),
        nonce: height,
    };
    (tx, header)
}

/// Everything needed to shape one transition.
pub struct Transition {
    pub version: TransitionVersion,
    pub prev_out: OutPoint,
    pub extra_inputs: Vec<OutPoint>,
    pub asset: Asset,
    pub outputs: Vec<Output>,
    pub output_index: u32,
    /// Output index and root asset of a split.
    pub split_root: Option<(u32, Asset)>,
    pub height: u32,
}

impl Transition {
    /// Builds the anchor and a proof with inclusion, exclusion, split root
    /// and STXO proofs as the asset needs them.
    pub fn build(self) -> Proof {
        let mut inputs = vec![self.prev_out];
        inputs.extend_from_slice(&self.extra_inputs);
        let (anchor_tx, block_header) = anchor(&inputs, &self.outputs, self.height);

        let stxo = match self.version {
            TransitionVersion::V1 if self.asset.is_transfer_root() => alt_leaves(&self.asset),
            _ => Vec::new(),
        };

        let mut inclusion_proof = None;
        let mut exclusion_proofs = Vec::new();
        for (index, output) in self.outputs.iter().enumerate() {
            let index = index as u32;
            let Some(proof) = output.taproot_proof(index, &self.asset, &stxo) else {
                continue;
            };
            if index == self.output_index {
                inclusion_proof = Some(proof);
            } else {
                exclusion_proofs.push(proof);
            }
        }

        let split_root_proof = self.split_root.as_ref().and_then(|(index, root)| {
            self.outputs[*index as usize].taproot_proof(*index, root, &[])
        });

        Proof {
            version: self.version,
            prev_out: self.prev_out,
            block_header,
            block_height: self.height,
            anchor_tx,
            tx_merkle_proof: TxMerkleProof::empty(),
            asset: self.asset,
            inclusion_proof: inclusion_proof.expect("inclusion output must be taproot"),
            exclusion_proofs,
            split_root_proof,
            meta_reveal: None,
            additional_inputs: Vec::new(),
            challenge_witness: None,
            genesis_reveal: None,
            group_key_reveal: None,
            unknown_odd_types: Default::default(),
        }
    }
}

/// The alt leaves marking each input of a transfer root as spent.
pub fn alt_leaves(asset: &Asset) -> Vec<Asset> {
    asset
        .prev_witnesses
        .iter()
        .filter_map(|witness| witness.prev_id.as_ref())
        .map(|prev_id| make_alt_leaf_asset(derive_burn_script_key(prev_id).unwrap()))
        .collect()
}

/// A proof together with the key that controls its asset.
#[derive(Debug, Clone)]
pub struct Hop {
    pub proof: Proof,
    pub script_key: Keypair,
}

impl Hop {
    pub fn prev_id(&self) -> PrevId {
        PrevId {
            out_point: self.proof.out_point(),
            asset_id: self.proof.asset.id(),
            script_key: self.proof.asset.script_key,
        }
    }
}

pub struct Mint {
    pub seed: u8,
    pub tag: String,
    pub amount: u64,
    pub meta: Option<MetaReveal>,
    pub grouped: bool,
    pub group_tapscript_root: Option<[u8; 32]>,
}

impl Default for Mint {
    fn default() -> Self {
        Mint {
            seed: 1,
            tag: "beefbux".to_string(),
            amount: 5_000,
            meta: Some(MetaReveal::new(MetaType::Opaque, b"some meta".to_vec())),
            grouped: false,
            group_tapscript_root: None,
        }
    }
}

impl Mint {
    pub fn build(self) -> Hop {
        let genesis_out = OutPoint {
            txid: Txid::from_byte_array([self.seed; 32]),
            vout: 1,
        };
        let meta_hash = self
            .meta
            .as_ref()
            .map_or_else(Sha256Hash::all_zeros, MetaReveal::meta_hash);
        let genesis = Genesis {
            first_prev_out: genesis_out,
            tag: self.tag,
            meta_hash,
            output_index: 0,
            asset_type: AssetType::Normal,
        };

        let script_key = keypair(self.seed.wrapping_mul(7).wrapping_add(1));
        let mut asset = Asset::new(genesis.clone(), self.amount, key_of(&script_key), None);

        let group_key_reveal = self.grouped.then(|| GroupKeyReveal {
            raw_key: key_of(&keypair(self.seed.wrapping_mul(7).wrapping_add(2))),
            tapscript_root: self.group_tapscript_root,
        });
        if let Some(reveal) = &group_key_reveal {
            asset.group_key = Some(group_pubkey_from_reveal(reveal, &asset.id()).unwrap());
        }

        let outputs = vec![
            Output::commitment(keypair(self.seed.wrapping_mul(7).wrapping_add(3)), &[&asset]),
            Output::Bip86 {
                internal: keypair(self.seed.wrapping_mul(7).wrapping_add(4)),
            },
        ];
        let mut proof = Transition {
            version: TransitionVersion::V0,
            prev_out: genesis_out,
            extra_inputs: Vec::new(),
            asset,
            outputs,
            output_index: 0,
            split_root: None,
            height: 100 + self.seed as u32,
        }
        .build();

        proof.genesis_reveal = Some(genesis);
        proof.meta_reveal = self.meta;
        proof.group_key_reveal = group_key_reveal;
        Hop { proof, script_key }
    }
}

/// The asset of `prev` moved whole to a new script key.
pub fn transfer(prev: &Hop, version: TransitionVersion, seed: u8) -> Hop {
    let script_key = keypair(seed);
    let mut asset = prev.proof.asset.clone();
    asset.prev_witnesses = vec![spend_witness(prev.prev_id())];
    asset.script_key = key_of(&script_key);

    let mut outputs = vec![
        Output::commitment(keypair(seed.wrapping_add(1)), &[&asset]),
        Output::Bip86 {
            internal: keypair(seed.wrapping_add(2)),
        },
    ];
    if version == TransitionVersion::V1 {
        if let Output::Commitment { commitment, .. } = &mut outputs[0] {
            for alt in alt_leaves(&asset) {
                commitment.insert(&alt);
            }
        }
    }

    let proof = Transition {
        version,
        prev_out: prev.proof.out_point(),
        extra_inputs: Vec::new(),
        asset,
        outputs,
        output_index: 0,
        split_root: None,
        height: prev.proof.block_height + 1,
    }
    .build();
    Hop { proof, script_key }
}

/// Moves the asset of `main` to a new script key while also spending the
/// asset of `extra` in the same anchor transaction. The caller embeds the
/// provenance of `extra` as an additional input.
pub fn merge(main: &Hop, extra: &Hop, seed: u8) -> Hop {
    let script_key = keypair(seed);
    let mut asset = main.proof.asset.clone();
    asset.prev_witnesses = vec![spend_witness(main.prev_id()), spend_witness(extra.prev_id())];
    asset.script_key = key_of(&script_key);
    asset.amount += extra.proof.asset.amount;

    let outputs = vec![
        Output::commitment(keypair(seed.wrapping_add(1)), &[&asset]),
        Output::Bip86 {
            internal: keypair(seed.wrapping_add(2)),
        },
    ];
    let proof = Transition {
        version: TransitionVersion::V0,
        prev_out: main.proof.out_point(),
        extra_inputs: vec![extra.proof.out_point()],
        asset,
        outputs,
        output_index: 0,
        split_root: None,
        height: main.proof.block_height.max(extra.proof.block_height) + 1,
    }
    .build();
    Hop { proof, script_key }
}

/// Splits the asset of `prev`: `amount` goes to a split output at index 0,
/// the rest stays with the split root at index 1.
pub fn split(prev: &Hop, amount: u64, seed: u8) -> (Hop, Asset) {
    let prev_id = prev.prev_id();

    let root_key = keypair(seed.wrapping_add(10));
    let mut root = prev.proof.asset.clone();
    root.prev_witnesses = vec![spend_witness(prev_id.clone())];
    root.script_key = key_of(&root_key);
    root.amount = prev.proof.asset.amount - amount;
    root.split_commitment_root = Some(MssmtNode::leaf(b"split tree", root.amount));

    let script_key = keypair(seed);
    let mut asset = prev.proof.asset.clone();
    asset.script_key = key_of(&script_key);
    asset.amount = amount;
    asset.prev_witnesses = vec![PrevWitness {
        prev_id: Some(prev_id),
        tx_witness: Witness::new(),
        split_commitment: Some(SplitCommitment {
            proof: MssmtProof::empty(),
            root_asset: Box::new(root.clone()),
        }),
    }];

    let outputs = vec![
        Output::commitment(keypair(seed.wrapping_add(1)), &[&asset]),
        Output::commitment(keypair(seed.wrapping_add(2)), &[&root]),
    ];
    let proof = Transition {
        version: TransitionVersion::V0,
        prev_out: prev.proof.out_point(),
        extra_inputs: Vec::new(),
        asset,
        outputs,
        output_index: 0,
        split_root: Some((1, root.clone())),
        height: prev.proof.block_height + 1,
    }
    .build();
    (Hop { proof, script_key }, root)
}

pub fn spend_witness(prev_id: PrevId) -> PrevWitness {
    PrevWitness {
        prev_id: Some(prev_id),
        tx_witness: Witness::from_slice(&[[0x01u8; 64]]),
        split_commitment: None,
    }
}

/// Signs the proof's ownership challenge with the asset's script key.
pub fn sign_ownership(hop: &mut Hop, challenge: [u8; 32]) {
    let secp = Secp256k1::new();
    let msg = ownership_message(&hop.proof.asset, &hop.proof.out_point(), &challenge);
    let sig = secp.sign_schnorr_no_aux_rand(&Message::from_digest(msg), &hop.script_key);
    hop.proof.challenge_witness = Some(Witness::from_slice(&[sig.serialize()]));
}

/// Records every log line it is handed.
#[derive(Default)]
pub struct CaptureLog {
    pub records: Mutex<Vec<(Level, String)>>,
}

impl CaptureLog {
    pub fn shared() -> Arc<CaptureLog> {
        Arc::new(CaptureLog::default())
    }

    pub fn lines(&self, level: Level) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, line)| line.clone())
            .collect()
    }
}

impl Log for CaptureLog {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.records
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}
