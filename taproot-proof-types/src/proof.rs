use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::ToString;
use alloc::vec::Vec;

use bitcoin::block::Header;
use bitcoin::consensus::encode;
use bitcoin::hashes::Hash;
use bitcoin::io::{Cursor, Read};
use bitcoin::secp256k1::PublicKey;
use bitcoin::{OutPoint, Transaction, TxMerkleNode, Witness};
use serde::{Deserialize, Serialize};

use crate::asset::{
    decode_out_point, decode_witness, encode_out_point, encode_witness, Asset, Genesis,
    GroupKeyReveal, SerializedKey,
};
use crate::codec::{self, TransitionVersion, PROOF_MAGIC};
use crate::commitment::{
    self, TapscriptPreimage, PROOF_ASSET_PROOF_TYPE, PROOF_TAPROOT_ASSET_PROOF_TYPE,
};
use crate::error::Error;
use crate::file::File;
use crate::meta::MetaReveal;
use crate::tlv::{
    encode_bigsize, encode_var_bytes, ensure_consumed, fixed_value, read_array, read_bigsize,
    read_to_end, read_var_bytes, Record, RecordSet, Stream, UnknownOddTypes, MAX_RECORD_SIZE,
};

/// Represents a full commitment proof for an asset. It can either prove inclusion or exclusion of
/// an asset within a Taproot Asset commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentProof {
    /// The underlying Merkle proof structure from the commitment module.
    /// Both share one TLV stream, so unknown odd types of the whole record
    /// are kept in `proof.unknown_odd_types`.
    pub proof: commitment::Proof,

    /// TapSiblingPreimage is an optional preimage of a tap node used to
    /// hash together with the Taproot Asset commitment leaf node to arrive
    /// at the tapscript root of the expected output.
    pub tap_sibling_preimage: Option<TapscriptPreimage>,

    /// Proofs that the spent inputs of a transfer were committed as
    /// tombstoned (STXO) alt leaves, keyed by the alt leaf script key.
    pub stxo_proofs: BTreeMap<SerializedKey, commitment::Proof>,
}

impl CommitmentProof {
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        let mut records = RecordSet::new();
        self.proof.put_records(&mut records)?;
        if let Some(preimage) = &self.tap_sibling_preimage {
            let mut value = Vec::new();
            preimage.encode(&mut value);
            records.put(COMMITMENT_PROOF_TAP_SIBLING_PREIMAGE_TYPE, value);
        }
        if !self.stxo_proofs.is_empty() {
            let mut value = Vec::new();
            encode_bigsize(self.stxo_proofs.len() as u64, &mut value);
            for (key, proof) in &self.stxo_proofs {
                value.extend_from_slice(&key.bytes);
                let mut bytes = Vec::new();
                proof.encode(&mut bytes)?;
                encode_var_bytes(&bytes, &mut value);
            }
            records.put(COMMITMENT_PROOF_STXO_PROOFS_TYPE, value);
        }
        records.write(out);
        Ok(())
    }

    pub fn decode_tlv<R: Read>(r: R) -> Result<Self, Error> {
        let mut stream = Stream::new(r);
        let mut asset_proof = None;
        let mut taproot_asset_proof = None;
        let mut tap_sibling_preimage = None;
        let mut stxo_proofs = BTreeMap::new();
        let mut unknown_odd_types = UnknownOddTypes::new();

        while let Some(record) = stream.next_record()? {
            match record.tlv_type().0 {
                PROOF_ASSET_PROOF_TYPE => {
                    asset_proof = Some(commitment::AssetProof::decode_tlv(record.value_reader())?);
                }
                PROOF_TAPROOT_ASSET_PROOF_TYPE => {
                    taproot_asset_proof = Some(commitment::TaprootAssetProof::decode_tlv(
                        record.value_reader(),
                    )?);
                }
                COMMITMENT_PROOF_TAP_SIBLING_PREIMAGE_TYPE => {
                    tap_sibling_preimage = Some(TapscriptPreimage::decode(record.value())?);
                }
                COMMITMENT_PROOF_STXO_PROOFS_TYPE => {
                    let mut cursor = record.value_reader();
                    let count = read_bigsize(&mut cursor)?;
                    for _ in 0..count {
                        let key = SerializedKey {
                            bytes: read_array(&mut cursor)?,
                        };
                        let bytes = read_var_bytes(&mut cursor, MAX_RECORD_SIZE)?;
                        let proof = commitment::Proof::decode_tlv(Cursor::new(bytes.as_slice()))?;
                        stxo_proofs.insert(key, proof);
                    }
                    ensure_consumed(&record, &cursor)?;
                }
                _ => record.retain_unknown(&mut unknown_odd_types)?,
            }
        }

        Ok(CommitmentProof {
            proof: commitment::Proof {
                asset_proof,
                taproot_asset_proof: taproot_asset_proof
                    .ok_or(Error::MissingTlvField("CommitmentProof.taproot_asset_proof"))?,
                unknown_odd_types,
            },
            tap_sibling_preimage,
            stxo_proofs,
        })
    }
}

/// TapscriptProof represents a proof of a Taproot output not including a
/// Taproot Asset commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapscriptProof {
    /// TapPreimage1 is the preimage for a TapNode at depth 0 or 1.
    pub tap_preimage1: Option<TapscriptPreimage>,

    /// TapPreimage2, if specified, is the pair preimage for TapPreimage1 at
    /// depth 1.
    pub tap_preimage2: Option<TapscriptPreimage>,

    /// Bip86 indicates this is a normal BIP-0086 wallet output.
    pub bip86: bool,

    pub unknown_odd_types: UnknownOddTypes,
}

impl TapscriptProof {
    pub fn encode(&self, out: &mut Vec<u8>) {
        let mut records = RecordSet::new();
        if let Some(preimage) = &self.tap_preimage1 {
            let mut value = Vec::new();
            preimage.encode(&mut value);
            records.put(TAPSCRIPT_PROOF_TAP_PREIMAGE1_TYPE, value);
        }
        if let Some(preimage) = &self.tap_preimage2 {
            let mut value = Vec::new();
            preimage.encode(&mut value);
            records.put(TAPSCRIPT_PROOF_TAP_PREIMAGE2_TYPE, value);
        }
        records.put(TAPSCRIPT_PROOF_BIP86_TYPE, alloc::vec![self.bip86 as u8]);
        records.put_unknown(&self.unknown_odd_types);
        records.write(out);
    }

    pub fn decode_tlv<R: Read>(r: R) -> Result<Self, Error> {
        let mut stream = Stream::new(r);
        let mut tap_preimage1 = None;
        let mut tap_preimage2 = None;
        let mut bip86 = None;
        let mut unknown_odd_types = UnknownOddTypes::new();

        while let Some(record) = stream.next_record()? {
            match record.tlv_type().0 {
                TAPSCRIPT_PROOF_TAP_PREIMAGE1_TYPE => {
                    tap_preimage1 = Some(TapscriptPreimage::decode(record.value())?);
                }
                TAPSCRIPT_PROOF_TAP_PREIMAGE2_TYPE => {
                    tap_preimage2 = Some(TapscriptPreimage::decode(record.value())?);
                }
                TAPSCRIPT_PROOF_BIP86_TYPE => {
                    let [byte] = fixed_value::<1>(&record)?;
                    bip86 = Some(byte != 0);
                }
                _ => record.retain_unknown(&mut unknown_odd_types)?,
            }
        }

        Ok(TapscriptProof {
            tap_preimage1,
            tap_preimage2,
            bip86: bip86.ok_or(Error::MissingTlvField("TapscriptProof.bip86"))?,
            unknown_odd_types,
        })
    }
}

/// How a taproot proof binds the output: through an asset commitment or by
/// revealing a tapscript tree that holds none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaprootProofKind {
    Commitment(CommitmentProof),
    Tapscript(TapscriptProof),
}

/// TaprootProof represents a proof that reveals the partial contents to a
/// tapscript tree within a taproot output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaprootProof {
    /// OutputIndex is the index of the output for which the proof applies.
    pub output_index: u32,

    /// InternalKey is the internal key of the taproot output at OutputIndex.
    pub internal_key: PublicKey,

    pub kind: TaprootProofKind,

    pub unknown_odd_types: UnknownOddTypes,
}

impl TaprootProof {
    pub fn commitment_proof(&self) -> Option<&CommitmentProof> {
        match &self.kind {
            TaprootProofKind::Commitment(proof) => Some(proof),
            TaprootProofKind::Tapscript(_) => None,
        }
    }

    pub fn tapscript_proof(&self) -> Option<&TapscriptProof> {
        match &self.kind {
            TaprootProofKind::Tapscript(proof) => Some(proof),
            TaprootProofKind::Commitment(_) => None,
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        let mut records = RecordSet::new();
        records.put(
            TAPROOT_PROOF_OUTPUT_INDEX_TYPE,
            self.output_index.to_be_bytes().to_vec(),
        );
        records.put(
            TAPROOT_PROOF_INTERNAL_KEY_TYPE,
            self.internal_key.serialize().to_vec(),
        );
        let mut value = Vec::new();
        match &self.kind {
            TaprootProofKind::Commitment(proof) => {
                proof.encode(&mut value)?;
                records.put(TAPROOT_PROOF_COMMITMENT_PROOF_TYPE, value);
            }
            TaprootProofKind::Tapscript(proof) => {
                proof.encode(&mut value);
                records.put(TAPROOT_PROOF_TAPSCRIPT_PROOF_TYPE, value);
            }
        }
        records.put_unknown(&self.unknown_odd_types);
        records.write(out);
        Ok(())
    }

    /// Decodes a TaprootProof from a TLV byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::decode_tlv(Cursor::new(bytes))
    }

    pub fn decode_tlv<R: Read>(r: R) -> Result<Self, Error> {
        let mut stream = Stream::new(r);
        let mut output_index = None;
        let mut internal_key = None;
        let mut commitment_proof = None;
        let mut tapscript_proof = None;
        let mut unknown_odd_types = UnknownOddTypes::new();

        while let Some(record) = stream.next_record()? {
            match record.tlv_type().0 {
                TAPROOT_PROOF_OUTPUT_INDEX_TYPE => {
                    output_index = Some(u32::from_be_bytes(fixed_value(&record)?));
                }
                TAPROOT_PROOF_INTERNAL_KEY_TYPE => {
                    let bytes: [u8; 33] = fixed_value(&record)?;
                    internal_key = Some(PublicKey::from_slice(&bytes).map_err(|e| {
                        Error::BitcoinSerialization(format!("invalid internal key: {}", e))
                    })?);
                }
                TAPROOT_PROOF_COMMITMENT_PROOF_TYPE => {
                    commitment_proof = Some(CommitmentProof::decode_tlv(record.value_reader())?);
                }
                TAPROOT_PROOF_TAPSCRIPT_PROOF_TYPE => {
                    tapscript_proof = Some(TapscriptProof::decode_tlv(record.value_reader())?);
                }
                _ => record.retain_unknown(&mut unknown_odd_types)?,
            }
        }

        let kind = match (commitment_proof, tapscript_proof) {
            (Some(proof), None) => TaprootProofKind::Commitment(proof),
            (None, Some(proof)) => TaprootProofKind::Tapscript(proof),
            _ => return Err(Error::InvalidTaprootProofVariant),
        };

        Ok(TaprootProof {
            output_index: output_index.ok_or(Error::MissingTlvField("TaprootProof.output_index"))?,
            internal_key: internal_key.ok_or(Error::MissingTlvField("TaprootProof.internal_key"))?,
            kind,
            unknown_odd_types,
        })
    }
}

/// A Merkle proof that a transaction is included in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxMerkleProof {
    /// The list of sibling hashes along the Merkle path from the transaction
    /// up to the root.
    pub nodes: Vec<TxMerkleNode>,

    /// Direction bits: `false` means the node is on the left, `true` means on the right.
    /// The bits correspond to entries in `nodes`.
    pub bits: Vec<bool>,
}

/// Upper bound on the depth of a block's transaction merkle tree.
const MERKLE_PROOF_MAX_NODES: u64 = 512;

impl TxMerkleProof {
    /// Proof for a block whose only transaction is the anchor transaction.
    pub fn empty() -> Self {
        TxMerkleProof {
            nodes: Vec::new(),
            bits: Vec::new(),
        }
    }

    /// Encodes the node count, the nodes, and the direction bits packed
    /// least significant bit first.
    pub fn encode(&self, out: &mut Vec<u8>) {
        encode_bigsize(self.nodes.len() as u64, out);
        for node in &self.nodes {
            out.extend_from_slice(node.as_byte_array());
        }

        let mut packed = alloc::vec![0u8; self.nodes.len().div_ceil(8)];
        for (idx, bit) in self.bits.iter().take(self.nodes.len()).enumerate() {
            if *bit {
                packed[idx / 8] |= 1 << (idx % 8);
            }
        }
        encode_var_bytes(&packed, out);
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self, Error> {
        let num_nodes = read_bigsize(r)?;
        if num_nodes > MERKLE_PROOF_MAX_NODES {
            return Err(Error::TlvStream(format!(
                "merkle proof has too many nodes: {}",
                num_nodes
            )));
        }

        let mut nodes = Vec::with_capacity(num_nodes as usize);
        for _ in 0..num_nodes {
            nodes.push(TxMerkleNode::from_byte_array(read_array(r)?));
        }

        let packed_len = num_nodes.div_ceil(8);
        let packed = read_var_bytes(r, packed_len)?;
        if packed.len() as u64 != packed_len {
            return Err(Error::TlvStream(format!(
                "merkle proof has {} bytes of direction bits for {} nodes",
                packed.len(),
                num_nodes
            )));
        }

        let bit_at = |idx: usize| (packed[idx / 8] >> (idx % 8)) & 1 == 1;
        if (nodes.len()..packed.len() * 8).any(bit_at) {
            return Err(Error::TlvStream(
                "merkle proof sets padding direction bits".to_string(),
            ));
        }
        let bits = (0..nodes.len()).map(bit_at).collect();

        Ok(TxMerkleProof { nodes, bits })
    }
}

/// One state transition of an asset, anchored in a bitcoin transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Transition version, resolved through the codec registry.
    pub version: TransitionVersion,

    /// The outpoint spent by the anchor transaction to carry the asset over
    /// from its previous location.
    pub prev_out: OutPoint,

    /// Header of the block that contains the anchor transaction.
    pub block_header: Header,

    pub block_height: u32,

    pub anchor_tx: Transaction,

    /// The merkle proof for AnchorTx used to prove its inclusion within
    /// BlockHeader.
    pub tx_merkle_proof: TxMerkleProof,

    /// The asset referenced in the proof. This is the resulting asset after its
    /// state transition.
    pub asset: Asset,

    /// The TaprootProof proving the new inclusion of the resulting asset
    /// within AnchorTx.
    pub inclusion_proof: TaprootProof,

    /// The set of TaprootProofs proving the exclusion of the resulting asset
    /// from all other Taproot outputs within AnchorTx.
    pub exclusion_proofs: Vec<TaprootProof>,

    /// An optional TaprootProof needed if this asset is the result of a split.
    /// SplitRootProof proves inclusion of the root asset of the split.
    pub split_root_proof: Option<TaprootProof>,

    /// The reveal meta data associated with the proof, if available.
    /// This field is optional and can only be specified if the asset
    /// above is a genesis asset.
    pub meta_reveal: Option<MetaReveal>,

    /// Full provenance of each additional asset input spent by the anchor
    /// transaction.
    pub additional_inputs: Vec<File>,

    /// ChallengeWitness is an optional witness that serves as an ownership
    /// proof for the asset: a signature by the script key over the ownership
    /// challenge.
    pub challenge_witness: Option<Witness>,

    /// GenesisReveal is an optional field that is the Genesis information for
    /// the asset. This is required for minting proofs and must be empty for
    /// non-minting proofs. This allows for derivation of the asset ID.
    pub genesis_reveal: Option<Genesis>,

    /// GroupKeyReveal is an optional field that includes the information needed
    /// to derive the tweaked group key. This field is mandatory for the group
    /// anchor (i.e., the initial minting tranche of an asset group). Subsequent
    /// minting tranches require only a valid signature for the previously revealed
    /// group key.
    pub group_key_reveal: Option<GroupKeyReveal>,

    pub unknown_odd_types: UnknownOddTypes,
}

impl Proof {
    /// The outpoint that holds the asset after this transition.
    pub fn out_point(&self) -> OutPoint {
        OutPoint {
            txid: self.anchor_tx.compute_txid(),
            vout: self.inclusion_proof.output_index,
        }
    }

    /// Encodes as `TAPP ‖ version ‖ TLV body`.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        let registered = codec::transition(self.version)?;
        codec::write_header(PROOF_MAGIC, self.version.0, out);
        registered.codec.encode_body(self, out)
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self, Error> {
        let bytes = read_to_end(r)?;
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let (version, body) = codec::split_header(bytes, PROOF_MAGIC)?;
        let version = TransitionVersion(version);
        let registered = codec::transition(version)?;
        registered.codec.decode_body(version, body)
    }
}

/// Writes the TLV body of a proof.
pub(crate) fn encode_records(proof: &Proof, out: &mut Vec<u8>) -> Result<(), Error> {
    let mut records = RecordSet::new();

    let mut value = Vec::with_capacity(36);
    encode_out_point(&proof.prev_out, &mut value);
    records.put(PROOF_PREV_OUT_TYPE, value);
    records.put(PROOF_BLOCK_HEADER_TYPE, encode::serialize(&proof.block_header));
    records.put(PROOF_ANCHOR_TX_TYPE, encode::serialize(&proof.anchor_tx));

    let mut value = Vec::new();
    proof.tx_merkle_proof.encode(&mut value);
    records.put(PROOF_TX_MERKLE_PROOF_TYPE, value);

    let mut value = Vec::new();
    proof.asset.encode(&mut value)?;
    records.put(PROOF_ASSET_LEAF_TYPE, value);

    let mut value = Vec::new();
    proof.inclusion_proof.encode(&mut value)?;
    records.put(PROOF_INCLUSION_PROOF_TYPE, value);

    if !proof.exclusion_proofs.is_empty() {
        let mut value = Vec::new();
        encode_bigsize(proof.exclusion_proofs.len() as u64, &mut value);
        for exclusion in &proof.exclusion_proofs {
            let mut bytes = Vec::new();
            exclusion.encode(&mut bytes)?;
            encode_var_bytes(&bytes, &mut value);
        }
        records.put(PROOF_EXCLUSION_PROOFS_TYPE, value);
    }
    if let Some(split_root) = &proof.split_root_proof {
        let mut value = Vec::new();
        split_root.encode(&mut value)?;
        records.put(PROOF_SPLIT_ROOT_PROOF_TYPE, value);
    }
    if let Some(meta) = &proof.meta_reveal {
        let mut value = Vec::new();
        meta.encode(&mut value);
        records.put(PROOF_META_REVEAL_TYPE, value);
    }
    if !proof.additional_inputs.is_empty() {
        let mut value = Vec::new();
        encode_bigsize(proof.additional_inputs.len() as u64, &mut value);
        for input in &proof.additional_inputs {
            encode_var_bytes(&input.to_bytes()?, &mut value);
        }
        records.put(PROOF_ADDITIONAL_INPUTS_TYPE, value);
    }
    if let Some(witness) = &proof.challenge_witness {
        let mut value = Vec::new();
        encode_witness(witness, &mut value);
        records.put(PROOF_CHALLENGE_WITNESS_TYPE, value);
    }
    records.put(
        PROOF_BLOCK_HEIGHT_TYPE,
        proof.block_height.to_be_bytes().to_vec(),
    );
    if let Some(genesis) = &proof.genesis_reveal {
        let mut value = Vec::new();
        genesis.encode(&mut value);
        records.put(PROOF_GENESIS_REVEAL_TYPE, value);
    }
    if let Some(reveal) = &proof.group_key_reveal {
        let mut value = Vec::new();
        reveal.encode(&mut value);
        records.put(PROOF_GROUP_KEY_REVEAL_TYPE, value);
    }
    records.put_unknown(&proof.unknown_odd_types);

    records.write(out);
    Ok(())
}

/// Reads the TLV body of a proof.
pub(crate) fn decode_records(version: TransitionVersion, body: &[u8]) -> Result<Proof, Error> {
    let mut stream = Stream::new(Cursor::new(body));

    let mut prev_out = None;
    let mut block_header = None;
    let mut block_height = None;
    let mut anchor_tx = None;
    let mut tx_merkle_proof = None;
    let mut asset = None;
    let mut inclusion_proof = None;
    let mut exclusion_proofs = Vec::new();
    let mut split_root_proof = None;
    let mut meta_reveal = None;
    let mut additional_inputs = Vec::new();
    let mut challenge_witness = None;
    let mut genesis_reveal = None;
    let mut group_key_reveal = None;
    let mut unknown_odd_types = UnknownOddTypes::new();

    while let Some(record) = stream.next_record()? {
        match record.tlv_type().0 {
            PROOF_PREV_OUT_TYPE => {
                let mut cursor = record.value_reader();
                prev_out = Some(decode_out_point(&mut cursor)?);
                ensure_consumed(&record, &cursor)?;
            }
            PROOF_BLOCK_HEADER_TYPE => block_header = Some(consensus_record::<Header>(&record)?),
            PROOF_ANCHOR_TX_TYPE => anchor_tx = Some(consensus_record::<Transaction>(&record)?),
            PROOF_TX_MERKLE_PROOF_TYPE => {
                let mut cursor = record.value_reader();
                tx_merkle_proof = Some(TxMerkleProof::decode(&mut cursor)?);
                ensure_consumed(&record, &cursor)?;
            }
            PROOF_ASSET_LEAF_TYPE => asset = Some(Asset::decode_tlv(record.value_reader())?),
            PROOF_INCLUSION_PROOF_TYPE => {
                inclusion_proof = Some(TaprootProof::decode_tlv(record.value_reader())?);
            }
            PROOF_EXCLUSION_PROOFS_TYPE => {
                let mut cursor = record.value_reader();
                let count = read_bigsize(&mut cursor)?;
                for _ in 0..count {
                    let bytes = read_var_bytes(&mut cursor, MAX_RECORD_SIZE)?;
                    exclusion_proofs.push(TaprootProof::from_bytes(&bytes)?);
                }
                ensure_consumed(&record, &cursor)?;
            }
            PROOF_SPLIT_ROOT_PROOF_TYPE => {
                split_root_proof = Some(TaprootProof::decode_tlv(record.value_reader())?);
            }
            PROOF_META_REVEAL_TYPE => {
                meta_reveal = Some(MetaReveal::decode_tlv(record.value_reader())?);
            }
            PROOF_ADDITIONAL_INPUTS_TYPE => {
                let mut cursor = record.value_reader();
                let count = read_bigsize(&mut cursor)?;
                for _ in 0..count {
                    let bytes = read_var_bytes(&mut cursor, MAX_RECORD_SIZE)?;
                    additional_inputs.push(File::from_bytes(&bytes)?);
                }
                ensure_consumed(&record, &cursor)?;
            }
            PROOF_CHALLENGE_WITNESS_TYPE => {
                let mut cursor = record.value_reader();
                challenge_witness = Some(decode_witness(&mut cursor)?);
                ensure_consumed(&record, &cursor)?;
            }
            PROOF_BLOCK_HEIGHT_TYPE => {
                block_height = Some(u32::from_be_bytes(fixed_value(&record)?));
            }
            PROOF_GENESIS_REVEAL_TYPE => {
                let mut cursor = record.value_reader();
                genesis_reveal = Some(Genesis::decode(&mut cursor)?);
                ensure_consumed(&record, &cursor)?;
            }
            PROOF_GROUP_KEY_REVEAL_TYPE => {
                group_key_reveal = Some(GroupKeyReveal::decode(record.value())?);
            }
            _ => record.retain_unknown(&mut unknown_odd_types)?,
        }
    }

    Ok(Proof {
        version,
        prev_out: prev_out.ok_or(Error::MissingTlvField("Proof.prev_out"))?,
        block_header: block_header.ok_or(Error::MissingTlvField("Proof.block_header"))?,
        block_height: block_height.ok_or(Error::MissingTlvField("Proof.block_height"))?,
        anchor_tx: anchor_tx.ok_or(Error::MissingTlvField("Proof.anchor_tx"))?,
        tx_merkle_proof: tx_merkle_proof.ok_or(Error::MissingTlvField("Proof.tx_merkle_proof"))?,
        asset: asset.ok_or(Error::MissingTlvField("Proof.asset"))?,
        inclusion_proof: inclusion_proof.ok_or(Error::MissingTlvField("Proof.inclusion_proof"))?,
        exclusion_proofs,
        split_root_proof,
        meta_reveal,
        additional_inputs,
        challenge_witness,
        genesis_reveal,
        group_key_reveal,
        unknown_odd_types,
    })
}

fn consensus_record<T: encode::Decodable>(record: &Record) -> Result<T, Error> {
    encode::deserialize(record.value()).map_err(|e| {
        Error::InvalidTlvValue(record.tlv_type().0, e.to_string())
    })
}

// TLV types of the proof body.
const PROOF_PREV_OUT_TYPE: u64 = 0;
const PROOF_BLOCK_HEADER_TYPE: u64 = 2;
const PROOF_ANCHOR_TX_TYPE: u64 = 4;
const PROOF_TX_MERKLE_PROOF_TYPE: u64 = 6;
const PROOF_ASSET_LEAF_TYPE: u64 = 8;
const PROOF_INCLUSION_PROOF_TYPE: u64 = 10;
const PROOF_EXCLUSION_PROOFS_TYPE: u64 = 13;
const PROOF_SPLIT_ROOT_PROOF_TYPE: u64 = 15;
const PROOF_META_REVEAL_TYPE: u64 = 17;
const PROOF_ADDITIONAL_INPUTS_TYPE: u64 = 19;
const PROOF_CHALLENGE_WITNESS_TYPE: u64 = 21;
const PROOF_BLOCK_HEIGHT_TYPE: u64 = 22;
const PROOF_GENESIS_REVEAL_TYPE: u64 = 23;
const PROOF_GROUP_KEY_REVEAL_TYPE: u64 = 25;

// For CommitmentProof, on top of the commitment::Proof records.
const COMMITMENT_PROOF_TAP_SIBLING_PREIMAGE_TYPE: u64 = 5;
const COMMITMENT_PROOF_STXO_PROOFS_TYPE: u64 = 7;

// For TapscriptProof
const TAPSCRIPT_PROOF_TAP_PREIMAGE1_TYPE: u64 = 1;
const TAPSCRIPT_PROOF_TAP_PREIMAGE2_TYPE: u64 = 3;
const TAPSCRIPT_PROOF_BIP86_TYPE: u64 = 4;

// For TaprootProof
const TAPROOT_PROOF_OUTPUT_INDEX_TYPE: u64 = 0;
const TAPROOT_PROOF_INTERNAL_KEY_TYPE: u64 = 2;
const TAPROOT_PROOF_COMMITMENT_PROOF_TYPE: u64 = 3;
const TAPROOT_PROOF_TAPSCRIPT_PROOF_TYPE: u64 = 5;

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::asset::{AssetType, SerializedKey};
    use crate::commitment::{TapCommitmentVersion, TaprootAssetProof};
    use crate::mssmt::MssmtProof;
    use bitcoin::absolute::LockTime;
    use bitcoin::block::Version;
    use bitcoin::hashes::sha256::Hash as Sha256Hash;
    use bitcoin::transaction::Version as TxVersion;
    use bitcoin::{Amount, BlockHash, CompactTarget, ScriptBuf, Sequence, TxIn, TxOut};

    const INTERNAL_KEY: &str =
        "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    fn internal_key() -> PublicKey {
        INTERNAL_KEY.parse().unwrap()
    }

    fn taproot_proof(kind: TaprootProofKind) -> TaprootProof {
        TaprootProof {
            output_index: 0,
            internal_key: internal_key(),
            kind,
            unknown_odd_types: UnknownOddTypes::new(),
        }
    }

    fn commitment_kind() -> TaprootProofKind {
        TaprootProofKind::Commitment(CommitmentProof {
            proof: commitment::Proof {
                asset_proof: None,
                taproot_asset_proof: TaprootAssetProof {
                    proof: MssmtProof::empty(),
                    version: TapCommitmentVersion::V2,
                    unknown_odd_types: UnknownOddTypes::new(),
                },
                unknown_odd_types: UnknownOddTypes::new(),
            },
            tap_sibling_preimage: None,
            stxo_proofs: BTreeMap::new(),
        })
    }

    fn sample_proof() -> Proof {
        let genesis = Genesis {
            first_prev_out: OutPoint::null(),
            tag: "sample".to_string(),
            meta_hash: Sha256Hash::all_zeros(),
            output_index: 0,
            asset_type: AssetType::Normal,
        };
        let script_key = SerializedKey::from(internal_key());
        let anchor_tx = Transaction {
            version: TxVersion::TWO,
            lock_time: LockTime::ZERO,
            input: alloc::vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: alloc::vec![TxOut {
                value: Amount::from_sat(1_000),
                script_pubkey: ScriptBuf::new(),
            }],
        };

        Proof {
            version: TransitionVersion::V0,
            prev_out: OutPoint::null(),
            block_header: Header {
                version: Version::TWO,
                prev_blockhash: BlockHash::all_zeros(),
                merkle_root: TxMerkleNode::all_zeros(),
                time: 1_700_000_000,
                bits: CompactTarget::from_consensus(0x207f_ffff),
                nonce: 7,
            },
            block_height: 144,
            anchor_tx,
            tx_merkle_proof: TxMerkleProof::empty(),
            asset: Asset::new(genesis.clone(), 10, script_key, None),
            inclusion_proof: taproot_proof(commitment_kind()),
            exclusion_proofs: Vec::new(),
            split_root_proof: None,
            meta_reveal: None,
            additional_inputs: Vec::new(),
            challenge_witness: None,
            genesis_reveal: Some(genesis),
            group_key_reveal: None,
            unknown_odd_types: UnknownOddTypes::new(),
        }
    }

    #[test]
    fn proof_encoding_is_framed() {
        let proof = sample_proof();
        let bytes = proof.to_bytes().unwrap();
        assert_eq!(&bytes[..4], b"TAPP");
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
        assert!(codec::is_single_proof(&bytes));

        let decoded = Proof::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, proof);
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn unknown_odd_fields_are_carried() {
        let mut proof = sample_proof();
        proof.unknown_odd_types.insert(31, alloc::vec![0xde, 0xad]);
        proof
            .exclusion_proofs
            .push(taproot_proof(TaprootProofKind::Tapscript(TapscriptProof {
                tap_preimage1: None,
                tap_preimage2: None,
                bip86: true,
                unknown_odd_types: UnknownOddTypes::new(),
            })));
        let bytes = proof.to_bytes().unwrap();
        assert_eq!(Proof::from_bytes(&bytes).unwrap(), proof);
    }

    #[test]
    fn unknown_version_rejected_before_fields() {
        let mut bytes = sample_proof().to_bytes().unwrap();
        bytes[4..8].copy_from_slice(&212u32.to_be_bytes());
        // Corrupt the body too: the version gate must fire first.
        bytes.truncate(12);
        assert!(matches!(
            Proof::from_bytes(&bytes),
            Err(Error::UnknownVersion(212))
        ));

        let mut proof = sample_proof();
        proof.version = TransitionVersion(212);
        assert!(matches!(proof.to_bytes(), Err(Error::UnknownVersion(212))));
    }

    #[test]
    fn unknown_even_field_rejected() {
        let mut bytes = sample_proof().to_bytes().unwrap();
        crate::tlv::encode_record(40, &[1], &mut bytes);
        assert!(matches!(
            Proof::from_bytes(&bytes),
            Err(Error::UnknownTlvType(40))
        ));
    }

    #[test]
    fn taproot_proof_requires_exactly_one_variant() {
        let proof = taproot_proof(commitment_kind());
        let mut bytes = Vec::new();
        proof.encode(&mut bytes).unwrap();

        let mut tapscript = Vec::new();
        TapscriptProof {
            tap_preimage1: None,
            tap_preimage2: None,
            bip86: true,
            unknown_odd_types: UnknownOddTypes::new(),
        }
        .encode(&mut tapscript);
        let mut both = bytes.clone();
        crate::tlv::encode_record(TAPROOT_PROOF_TAPSCRIPT_PROOF_TYPE, &tapscript, &mut both);
        assert!(matches!(
            TaprootProof::from_bytes(&both),
            Err(Error::InvalidTaprootProofVariant)
        ));

        let mut neither = Vec::new();
        crate::tlv::encode_record(TAPROOT_PROOF_OUTPUT_INDEX_TYPE, &[0, 0, 0, 0], &mut neither);
        crate::tlv::encode_record(
            TAPROOT_PROOF_INTERNAL_KEY_TYPE,
            &internal_key().serialize(),
            &mut neither,
        );
        assert!(matches!(
            TaprootProof::from_bytes(&neither),
            Err(Error::InvalidTaprootProofVariant)
        ));
    }

    #[test]
    fn tx_merkle_proof_bits_pack_lsb_first() {
        let proof = TxMerkleProof {
            nodes: alloc::vec![TxMerkleNode::all_zeros(); 9],
            bits: alloc::vec![true, false, false, false, false, false, false, false, true],
        };
        let mut bytes = Vec::new();
        proof.encode(&mut bytes);
        assert_eq!(&bytes[bytes.len() - 3..], &[2, 0x01, 0x01]);
        let decoded = TxMerkleProof::decode(&mut Cursor::new(bytes.as_slice())).unwrap();
        assert_eq!(decoded, proof);
    }

    #[test]
    fn tx_merkle_proof_bits_must_fill_their_bytes() {
        let nodes = alloc::vec![TxMerkleNode::all_zeros(); 9];
        let encoded = |packed: &[u8]| {
            let mut bytes = Vec::new();
            encode_bigsize(nodes.len() as u64, &mut bytes);
            for node in &nodes {
                bytes.extend_from_slice(node.as_byte_array());
            }
            encode_var_bytes(packed, &mut bytes);
            bytes
        };

        for packed in [Vec::new(), alloc::vec![0x01u8]] {
            let bytes = encoded(&packed);
            assert!(matches!(
                TxMerkleProof::decode(&mut Cursor::new(bytes.as_slice())),
                Err(Error::TlvStream(_))
            ));
        }

        // Bit 9 lies past the last node.
        let bytes = encoded(&[0x01, 0x03]);
        assert!(matches!(
            TxMerkleProof::decode(&mut Cursor::new(bytes.as_slice())),
            Err(Error::TlvStream(_))
        ));

        let bytes = encoded(&[0x01, 0x01]);
        let decoded = TxMerkleProof::decode(&mut Cursor::new(bytes.as_slice())).unwrap();
        assert_eq!(decoded.bits.len(), 9);
    }

    fn leaf_preimage(script: &[u8]) -> TapscriptPreimage {
        let mut preimage = alloc::vec![0xc0, script.len() as u8];
        preimage.extend_from_slice(script);
        TapscriptPreimage {
            sibling_preimage: preimage,
            sibling_type: crate::commitment::TapscriptPreimageType::LeafPreimage,
        }
    }

    fn populated_commitment() -> CommitmentProof {
        use crate::asset::AssetVersion;
        use crate::commitment::AssetProof;
        use crate::mssmt::{empty_tree, MssmtNode, TREE_LEVELS};

        let empty = empty_tree();
        let mut asset_mssmt = MssmtProof::empty();
        asset_mssmt.nodes[0] = MssmtNode::leaf(b"neighbour", 9);
        // A computed empty subtree, not the placeholder.
        asset_mssmt.nodes[1] = empty[TREE_LEVELS - 1].clone();
        let mut tap_mssmt = MssmtProof::empty();
        tap_mssmt.nodes[255] = MssmtNode::leaf(b"other asset", 40);

        let mut inner = commitment::Proof {
            asset_proof: Some(AssetProof {
                proof: asset_mssmt,
                version: AssetVersion::V1,
                tap_key: [4u8; 32],
                unknown_odd_types: [(5, alloc::vec![1])].into(),
            }),
            taproot_asset_proof: TaprootAssetProof {
                proof: tap_mssmt,
                version: TapCommitmentVersion::V2,
                unknown_odd_types: [(9, alloc::vec![2, 3])].into(),
            },
            unknown_odd_types: [(101, alloc::vec![7])].into(),
        };
        let stxo = commitment::Proof {
            asset_proof: None,
            taproot_asset_proof: inner.taproot_asset_proof.clone(),
            unknown_odd_types: [(11, alloc::vec![8])].into(),
        };
        inner.unknown_odd_types.insert(103, Vec::new());

        CommitmentProof {
            proof: inner,
            tap_sibling_preimage: Some(leaf_preimage(&[0x51])),
            stxo_proofs: [(SerializedKey::from(internal_key()), stxo)].into(),
        }
    }

    #[test]
    fn nested_commitment_fields_round_trip() {
        let commitment = populated_commitment();
        let mut bytes = Vec::new();
        commitment.encode(&mut bytes).unwrap();
        let decoded = CommitmentProof::decode_tlv(Cursor::new(bytes.as_slice())).unwrap();
        assert_eq!(decoded, commitment);

        let mut again = Vec::new();
        decoded.encode(&mut again).unwrap();
        assert_eq!(again, bytes);
    }

    #[test]
    fn populated_proof_round_trips() {
        let mut proof = sample_proof();
        let mut inclusion = taproot_proof(TaprootProofKind::Commitment(populated_commitment()));
        inclusion.unknown_odd_types.insert(7, alloc::vec![0xee]);
        proof.inclusion_proof = inclusion;
        proof.exclusion_proofs.push(TaprootProof {
            output_index: 1,
            internal_key: internal_key(),
            kind: TaprootProofKind::Tapscript(TapscriptProof {
                tap_preimage1: Some(leaf_preimage(&[0x51, 0x52])),
                tap_preimage2: Some(TapscriptPreimage {
                    sibling_preimage: alloc::vec![0x44; 64],
                    sibling_type: crate::commitment::TapscriptPreimageType::BranchPreimage,
                }),
                bip86: false,
                unknown_odd_types: [(33, alloc::vec![1, 2])].into(),
            }),
            unknown_odd_types: UnknownOddTypes::new(),
        });
        proof.split_root_proof = Some(taproot_proof(commitment_kind()));
        proof.tx_merkle_proof = TxMerkleProof {
            nodes: alloc::vec![TxMerkleNode::from_byte_array([0x0a; 32]); 3],
            bits: alloc::vec![true, false, true],
        };

        let bytes = proof.to_bytes().unwrap();
        let decoded = Proof::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, proof);
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn file_magic_is_not_a_proof() {
        let err = Proof::from_bytes(b"TAPF\x00\x00\x00\x00").unwrap_err();
        assert!(matches!(err, Error::InvalidMagic { expected } if expected == PROOF_MAGIC));
    }
}
