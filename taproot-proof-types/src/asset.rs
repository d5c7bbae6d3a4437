use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use bitcoin::hashes::sha256::Hash as Sha256Hash;
use bitcoin::hashes::{Hash, HashEngine};
use bitcoin::io::{Cursor, Read};
use bitcoin::{OutPoint, Txid, Witness};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;
use crate::mssmt::{MssmtNode, MssmtProof};
use crate::tlv::{
    encode_bigsize, encode_var_bytes, ensure_consumed, fixed_value, read_array, read_bigsize,
    read_u32, read_u8, read_var_bytes, RecordSet, Stream, UnknownOddTypes, MAX_RECORD_SIZE,
};

/// Identifier of an asset, derived from its genesis.
pub type AssetId = Sha256Hash;

/// Length of a compressed secp256k1 public key.
pub const SERIALIZED_KEY_LEN: usize = 33;

/// A compressed public key as it appears on the wire. Parsing into a curve
/// point is left to the verifier so malformed keys surface as verification
/// errors rather than decode errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerializedKey {
    pub bytes: [u8; SERIALIZED_KEY_LEN],
}

impl SerializedKey {
    pub const ZERO: SerializedKey = SerializedKey {
        bytes: [0u8; SERIALIZED_KEY_LEN],
    };

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let bytes = bytes.try_into().map_err(|_| {
            Error::BitcoinSerialization(format!("invalid serialized key length {}", bytes.len()))
        })?;
        Ok(SerializedKey { bytes })
    }

    /// Returns the x-only part of the key (the key without its parity byte).
    pub fn x_only_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.bytes[1..]);
        out
    }
}

impl From<bitcoin::secp256k1::PublicKey> for SerializedKey {
    fn from(key: bitcoin::secp256k1::PublicKey) -> Self {
        SerializedKey {
            bytes: key.serialize(),
        }
    }
}

impl Serialize for SerializedKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.bytes))
    }
}

impl<'de> Deserialize<'de> for SerializedKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(D::Error::custom)?;
        SerializedKey::from_slice(&bytes).map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
/// The version of the Taproot Asset.
pub enum AssetVersion {
    /// V0 is the default asset version. This version will include
    /// the witness vector in the leaf for a tap commitment.
    V0 = 0,
    /// V1 is the asset version that leaves out the witness vector
    /// from the MS-SMT leaf encoding.
    V1 = 1,
}

impl AssetVersion {
    pub(crate) fn from_u8(val: u8) -> Result<Self, Error> {
        match val {
            0 => Ok(AssetVersion::V0),
            1 => Ok(AssetVersion::V1),
            _ => Err(Error::InvalidTlvValue(
                ASSET_LEAF_VERSION,
                format!("unknown asset version: {}", val),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
/// The type of the asset.
pub enum AssetType {
    /// Indicates that an asset is capable of being split/merged, with each of the
    /// units being fungible, even across a key asset ID boundary (assuming the
    /// key group is the same).
    Normal = 0,
    /// Indicates that an asset is a collectible, meaning that each of the other
    /// items under the same key group are not fully fungible with each other.
    /// Collectibles also cannot be split or merged.
    Collectible = 1,
}

impl AssetType {
    pub(crate) fn from_u8(val: u8) -> Result<Self, Error> {
        match val {
            0 => Ok(AssetType::Normal),
            1 => Ok(AssetType::Collectible),
            _ => Err(Error::InvalidTlvValue(
                ASSET_LEAF_TYPE,
                format!("unknown asset type: {}", val),
            )),
        }
    }
}

/// Creation data of an asset. Never changes over the asset's lifetime.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Genesis {
    /// The first outpoint spent by the transaction that created the asset.
    pub first_prev_out: OutPoint,
    /// Human readable tag of the asset.
    pub tag: String,
    /// Hash of the meta reveal. All zero when the asset has no metadata.
    pub meta_hash: Sha256Hash,
    /// Index of the output carrying the asset commitment in the genesis
    /// transaction.
    pub output_index: u32,
    /// The type of the asset.
    pub asset_type: AssetType,
}

impl Genesis {
    /// Derives the asset ID.
    ///
    /// `sha256(txid ‖ vout ‖ sha256(tag) ‖ meta_hash ‖ output_index ‖ type)`
    pub fn id(&self) -> AssetId {
        let tag_hash = Sha256Hash::hash(self.tag.as_bytes());

        let mut engine = Sha256Hash::engine();
        engine.input(self.first_prev_out.txid.as_byte_array());
        engine.input(&self.first_prev_out.vout.to_be_bytes());
        engine.input(tag_hash.as_byte_array());
        engine.input(self.meta_hash.as_byte_array());
        engine.input(&self.output_index.to_be_bytes());
        engine.input(&[self.asset_type as u8]);
        Sha256Hash::from_engine(engine)
    }

    pub fn has_meta_hash(&self) -> bool {
        self.meta_hash != Sha256Hash::all_zeros()
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        encode_out_point(&self.first_prev_out, out);
        encode_var_bytes(self.tag.as_bytes(), out);
        out.extend_from_slice(self.meta_hash.as_byte_array());
        out.extend_from_slice(&self.output_index.to_be_bytes());
        out.push(self.asset_type as u8);
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self, Error> {
        let first_prev_out = decode_out_point(r)?;
        let tag = read_var_bytes(r, MAX_RECORD_SIZE)?;
        let tag = String::from_utf8(tag).map_err(|_| {
            Error::InvalidTlvValue(ASSET_LEAF_GENESIS, "genesis tag is not utf-8".to_string())
        })?;
        let meta_hash = Sha256Hash::from_byte_array(read_array(r)?);
        let output_index = read_u32(r)?;
        let asset_type = AssetType::from_u8(read_u8(r)?)?;

        Ok(Genesis {
            first_prev_out,
            tag,
            meta_hash,
            output_index,
            asset_type,
        })
    }
}

/// Identifies the asset input spent by a state transition.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PrevId {
    /// Anchor outpoint of the spent asset.
    pub out_point: OutPoint,
    /// ID of the spent asset.
    pub asset_id: AssetId,
    /// Script key of the spent asset.
    pub script_key: SerializedKey,
}

impl PrevId {
    /// The all-zero ID carried by genesis assets.
    pub fn zero() -> Self {
        PrevId {
            out_point: OutPoint {
                txid: Txid::all_zeros(),
                vout: 0,
            },
            asset_id: AssetId::all_zeros(),
            script_key: SerializedKey::ZERO,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == PrevId::zero()
    }

    fn encode(&self, out: &mut Vec<u8>) {
        encode_out_point(&self.out_point, out);
        out.extend_from_slice(self.asset_id.as_byte_array());
        out.extend_from_slice(&self.script_key.bytes);
    }

    fn decode<R: Read>(r: &mut R) -> Result<Self, Error> {
        Ok(PrevId {
            out_point: decode_out_point(r)?,
            asset_id: AssetId::from_byte_array(read_array(r)?),
            script_key: SerializedKey {
                bytes: read_array(r)?,
            },
        })
    }
}

/// Proof that a split output was committed to by the root asset of a split.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SplitCommitment {
    /// Proof of the split asset within the root asset's split commitment tree.
    pub proof: MssmtProof,
    /// The root asset of the split.
    pub root_asset: Box<Asset>,
}

/// A witness spending one asset input.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PrevWitness {
    pub prev_id: Option<PrevId>,
    pub tx_witness: Witness,
    pub split_commitment: Option<SplitCommitment>,
}

impl PrevWitness {
    /// The witness of a genesis asset.
    pub fn genesis() -> Self {
        PrevWitness {
            prev_id: Some(PrevId::zero()),
            tx_witness: Witness::new(),
            split_commitment: None,
        }
    }

    fn encode(&self, include_tx_witness: bool, out: &mut Vec<u8>) -> Result<(), Error> {
        let mut records = RecordSet::new();
        if let Some(prev_id) = &self.prev_id {
            let mut value = Vec::new();
            prev_id.encode(&mut value);
            records.put(WITNESS_PREV_ID, value);
        }
        if include_tx_witness && !self.tx_witness.is_empty() {
            let mut value = Vec::new();
            encode_witness(&self.tx_witness, &mut value);
            records.put(WITNESS_TX_WITNESS, value);
        }
        if let Some(split) = &self.split_commitment {
            let mut proof = Vec::new();
            split.proof.encode(&mut proof)?;
            let mut root = Vec::new();
            split.root_asset.encode(&mut root)?;

            let mut value = Vec::new();
            encode_var_bytes(&proof, &mut value);
            encode_var_bytes(&root, &mut value);
            records.put(WITNESS_SPLIT_COMMITMENT, value);
        }
        records.write(out);
        Ok(())
    }

    fn decode_tlv<R: Read>(r: R, nested: bool) -> Result<Self, Error> {
        let mut stream = Stream::new(r);
        let mut prev_id = None;
        let mut tx_witness = Witness::new();
        let mut split_commitment = None;

        while let Some(record) = stream.next_record()? {
            match record.tlv_type().0 {
                WITNESS_PREV_ID => {
                    let mut cursor = record.value_reader();
                    prev_id = Some(PrevId::decode(&mut cursor)?);
                    ensure_consumed(&record, &cursor)?;
                }
                WITNESS_TX_WITNESS => {
                    let mut cursor = record.value_reader();
                    tx_witness = decode_witness(&mut cursor)?;
                    ensure_consumed(&record, &cursor)?;
                }
                WITNESS_SPLIT_COMMITMENT => {
                    // A split root asset never carries a split commitment itself.
                    if nested {
                        return Err(Error::InvalidTlvValue(
                            WITNESS_SPLIT_COMMITMENT,
                            "nested split commitment".to_string(),
                        ));
                    }
                    let mut cursor = record.value_reader();
                    let proof = read_var_bytes(&mut cursor, MAX_RECORD_SIZE)?;
                    let root = read_var_bytes(&mut cursor, MAX_RECORD_SIZE)?;
                    ensure_consumed(&record, &cursor)?;

                    let mut proof_reader = Cursor::new(proof.as_slice());
                    let proof = MssmtProof::decode(&mut proof_reader)?;
                    let root_asset = Asset::decode_inner(Cursor::new(root.as_slice()), true)?;
                    split_commitment = Some(SplitCommitment {
                        proof,
                        root_asset: Box::new(root_asset),
                    });
                }
                // Witness records carry no odd extensions.
                other => return Err(Error::UnknownTlvType(other)),
            }
        }

        Ok(PrevWitness {
            prev_id,
            tx_witness,
            split_commitment,
        })
    }
}

/// The state of an asset after a transition.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub version: AssetVersion,
    pub genesis: Genesis,
    /// Units held. Always 1 for collectibles.
    pub amount: u64,
    pub lock_time: u64,
    pub relative_lock_time: u64,
    /// Witnesses for each asset input spent to create this state.
    pub prev_witnesses: Vec<PrevWitness>,
    /// Root of the split commitment tree, set on the root asset of a split.
    pub split_commitment_root: Option<MssmtNode>,
    pub script_version: u16,
    pub script_key: SerializedKey,
    /// The tweaked group key, if the asset belongs to a group.
    pub group_key: Option<SerializedKey>,
    pub unknown_odd_types: UnknownOddTypes,
}

impl Asset {
    /// Creates a freshly minted asset with a single genesis witness.
    pub fn new(
        genesis: Genesis,
        amount: u64,
        script_key: SerializedKey,
        group_key: Option<SerializedKey>,
    ) -> Self {
        Asset {
            version: AssetVersion::V0,
            genesis,
            amount,
            lock_time: 0,
            relative_lock_time: 0,
            prev_witnesses: alloc::vec![PrevWitness::genesis()],
            split_commitment_root: None,
            script_version: 0,
            script_key,
            group_key,
            unknown_odd_types: UnknownOddTypes::new(),
        }
    }

    pub fn id(&self) -> AssetId {
        self.genesis.id()
    }

    /// Returns true if this asset was created by a genesis transition: a
    /// single all-zero prev ID, no split commitment, and a tx witness only if
    /// the asset is grouped.
    pub fn is_genesis(&self) -> bool {
        let [witness] = self.prev_witnesses.as_slice() else {
            return false;
        };
        let zero_prev_id = witness.prev_id.as_ref().is_some_and(PrevId::is_zero);
        if !zero_prev_id || witness.split_commitment.is_some() {
            return false;
        }
        witness.tx_witness.is_empty() || self.group_key.is_some()
    }

    /// Returns true if the asset is a split output carrying a split
    /// commitment witness instead of a signature.
    pub fn has_split_commitment_witness(&self) -> bool {
        let [witness] = self.prev_witnesses.as_slice() else {
            return false;
        };
        witness.prev_id.is_some() && witness.tx_witness.is_empty() && witness.split_commitment.is_some()
    }

    /// Returns true if this asset spends inputs directly, as the root of a
    /// transfer.
    pub fn is_transfer_root(&self) -> bool {
        !self.prev_witnesses.is_empty() && !self.is_genesis() && !self.has_split_commitment_witness()
    }

    /// Returns the asset with any split commitment witness removed.
    pub fn without_split_commitment(&self) -> Asset {
        let mut asset = self.clone();
        if asset.has_split_commitment_witness() {
            asset.prev_witnesses[0].split_commitment = None;
        }
        asset
    }

    /// Bytes hashed into the asset's MS-SMT leaf. V1 assets leave tx
    /// witnesses out.
    pub fn leaf_encoding(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.encode_with(self.version == AssetVersion::V0, &mut out)?;
        Ok(out)
    }

    /// The MS-SMT leaf committing to this asset.
    pub fn leaf_node(&self) -> Result<MssmtNode, Error> {
        Ok(MssmtNode::leaf(&self.leaf_encoding()?, self.amount))
    }

    /// Full TLV encoding, including all witnesses.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        self.encode_with(true, out)
    }

    fn encode_with(&self, include_tx_witness: bool, out: &mut Vec<u8>) -> Result<(), Error> {
        let mut records = RecordSet::new();
        records.put(ASSET_LEAF_VERSION, alloc::vec![self.version as u8]);

        let mut genesis = Vec::new();
        self.genesis.encode(&mut genesis);
        records.put(ASSET_LEAF_GENESIS, genesis);
        records.put(ASSET_LEAF_TYPE, alloc::vec![self.genesis.asset_type as u8]);
        records.put(ASSET_LEAF_AMOUNT, bigsize_value(self.amount));

        if self.lock_time > 0 {
            records.put(ASSET_LEAF_LOCK_TIME, bigsize_value(self.lock_time));
        }
        if self.relative_lock_time > 0 {
            records.put(
                ASSET_LEAF_RELATIVE_LOCK_TIME,
                bigsize_value(self.relative_lock_time),
            );
        }
        if !self.prev_witnesses.is_empty() {
            let mut value = Vec::new();
            encode_bigsize(self.prev_witnesses.len() as u64, &mut value);
            for witness in &self.prev_witnesses {
                let mut bytes = Vec::new();
                witness.encode(include_tx_witness, &mut bytes)?;
                encode_var_bytes(&bytes, &mut value);
            }
            records.put(ASSET_LEAF_PREV_WITNESS, value);
        }
        if let Some(root) = &self.split_commitment_root {
            let mut value = Vec::with_capacity(40);
            value.extend_from_slice(root.hash.as_byte_array());
            value.extend_from_slice(&root.sum.to_be_bytes());
            records.put(ASSET_LEAF_SPLIT_COMMITMENT_ROOT, value);
        }
        records.put(
            ASSET_LEAF_SCRIPT_VERSION,
            self.script_version.to_be_bytes().to_vec(),
        );
        records.put(ASSET_LEAF_SCRIPT_KEY, self.script_key.bytes.to_vec());
        if let Some(group_key) = &self.group_key {
            records.put(ASSET_LEAF_GROUP_KEY, group_key.bytes.to_vec());
        }
        records.put_unknown(&self.unknown_odd_types);

        records.write(out);
        Ok(())
    }

    /// Decodes an asset from its TLV stream.
    pub fn decode_tlv<R: Read>(r: R) -> Result<Self, Error> {
        Self::decode_inner(r, false)
    }

    fn decode_inner<R: Read>(r: R, nested: bool) -> Result<Self, Error> {
        let mut stream = Stream::new(r);
        let mut version = None;
        let mut genesis: Option<Genesis> = None;
        let mut asset_type = None;
        let mut amount = None;
        let mut lock_time = 0;
        let mut relative_lock_time = 0;
        let mut prev_witnesses = Vec::new();
        let mut split_commitment_root = None;
        let mut script_version = None;
        let mut script_key = None;
        let mut group_key = None;
        let mut unknown_odd_types = UnknownOddTypes::new();

        while let Some(record) = stream.next_record()? {
            match record.tlv_type().0 {
                ASSET_LEAF_VERSION => {
                    let [byte] = fixed_value::<1>(&record)?;
                    version = Some(AssetVersion::from_u8(byte)?);
                }
                ASSET_LEAF_GENESIS => {
                    let mut cursor = record.value_reader();
                    genesis = Some(Genesis::decode(&mut cursor)?);
                    ensure_consumed(&record, &cursor)?;
                }
                ASSET_LEAF_TYPE => {
                    let [byte] = fixed_value::<1>(&record)?;
                    asset_type = Some(AssetType::from_u8(byte)?);
                }
                ASSET_LEAF_AMOUNT => amount = Some(bigsize_record(&record)?),
                ASSET_LEAF_LOCK_TIME => lock_time = bigsize_record(&record)?,
                ASSET_LEAF_RELATIVE_LOCK_TIME => relative_lock_time = bigsize_record(&record)?,
                ASSET_LEAF_PREV_WITNESS => {
                    let mut cursor = record.value_reader();
                    let count = read_bigsize(&mut cursor)?;
                    for _ in 0..count {
                        let bytes = read_var_bytes(&mut cursor, MAX_RECORD_SIZE)?;
                        prev_witnesses.push(PrevWitness::decode_tlv(
                            Cursor::new(bytes.as_slice()),
                            nested,
                        )?);
                    }
                    ensure_consumed(&record, &cursor)?;
                }
                ASSET_LEAF_SPLIT_COMMITMENT_ROOT => {
                    let bytes = fixed_value::<40>(&record)?;
                    let mut hash = [0u8; 32];
                    hash.copy_from_slice(&bytes[..32]);
                    let mut sum = [0u8; 8];
                    sum.copy_from_slice(&bytes[32..]);
                    split_commitment_root = Some(MssmtNode {
                        hash: Sha256Hash::from_byte_array(hash),
                        sum: u64::from_be_bytes(sum),
                    });
                }
                ASSET_LEAF_SCRIPT_VERSION => {
                    script_version = Some(u16::from_be_bytes(fixed_value(&record)?));
                }
                ASSET_LEAF_SCRIPT_KEY => {
                    script_key = Some(SerializedKey {
                        bytes: fixed_value(&record)?,
                    });
                }
                ASSET_LEAF_GROUP_KEY => {
                    group_key = Some(SerializedKey {
                        bytes: fixed_value(&record)?,
                    });
                }
                _ => record.retain_unknown(&mut unknown_odd_types)?,
            }
        }

        let genesis = genesis.ok_or(Error::MissingTlvField("Asset.genesis"))?;
        let asset_type = asset_type.ok_or(Error::MissingTlvField("Asset.type"))?;
        if asset_type != genesis.asset_type {
            return Err(Error::InvalidTlvValue(
                ASSET_LEAF_TYPE,
                "asset type does not match genesis".to_string(),
            ));
        }

        Ok(Asset {
            version: version.ok_or(Error::MissingTlvField("Asset.version"))?,
            genesis,
            amount: amount.ok_or(Error::MissingTlvField("Asset.amount"))?,
            lock_time,
            relative_lock_time,
            prev_witnesses,
            split_commitment_root,
            script_version: script_version.ok_or(Error::MissingTlvField("Asset.script_version"))?,
            script_key: script_key.ok_or(Error::MissingTlvField("Asset.script_key"))?,
            group_key,
            unknown_odd_types,
        })
    }
}

/// Disclosure of the untweaked group key and optional tapscript root.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct GroupKeyReveal {
    pub raw_key: SerializedKey,
    pub tapscript_root: Option<[u8; 32]>,
}

impl GroupKeyReveal {
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.raw_key.bytes);
        if let Some(root) = &self.tapscript_root {
            out.extend_from_slice(root);
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let (raw, root) = match bytes.len() {
            SERIALIZED_KEY_LEN => (bytes, None),
            len if len == SERIALIZED_KEY_LEN + 32 => {
                let (raw, root) = bytes.split_at(SERIALIZED_KEY_LEN);
                let mut tapscript_root = [0u8; 32];
                tapscript_root.copy_from_slice(root);
                (raw, Some(tapscript_root))
            }
            len => {
                return Err(Error::BitcoinSerialization(format!(
                    "invalid group key reveal length {}",
                    len
                )))
            }
        };

        Ok(GroupKeyReveal {
            raw_key: SerializedKey::from_slice(raw)?,
            tapscript_root: root,
        })
    }
}

pub(crate) fn encode_out_point(out_point: &OutPoint, out: &mut Vec<u8>) {
    out.extend_from_slice(out_point.txid.as_byte_array());
    out.extend_from_slice(&out_point.vout.to_be_bytes());
}

pub(crate) fn decode_out_point<R: Read>(r: &mut R) -> Result<OutPoint, Error> {
    Ok(OutPoint {
        txid: Txid::from_byte_array(read_array(r)?),
        vout: read_u32(r)?,
    })
}

pub(crate) fn encode_witness(witness: &Witness, out: &mut Vec<u8>) {
    encode_bigsize(witness.len() as u64, out);
    for item in witness.iter() {
        encode_var_bytes(item, out);
    }
}

pub(crate) fn decode_witness<R: Read>(r: &mut R) -> Result<Witness, Error> {
    let count = read_bigsize(r)?;
    let mut witness = Witness::new();
    for _ in 0..count {
        witness.push(read_var_bytes(r, MAX_RECORD_SIZE)?);
    }
    Ok(witness)
}

fn bigsize_value(value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    encode_bigsize(value, &mut out);
    out
}

fn bigsize_record(record: &crate::tlv::Record) -> Result<u64, Error> {
    let mut cursor = record.value_reader();
    let value = read_bigsize(&mut cursor)?;
    ensure_consumed(record, &cursor)?;
    Ok(value)
}

const ASSET_LEAF_VERSION: u64 = 0;
const ASSET_LEAF_GENESIS: u64 = 2;
const ASSET_LEAF_TYPE: u64 = 4;
const ASSET_LEAF_AMOUNT: u64 = 6;
const ASSET_LEAF_LOCK_TIME: u64 = 7;
const ASSET_LEAF_RELATIVE_LOCK_TIME: u64 = 9;
const ASSET_LEAF_PREV_WITNESS: u64 = 11;
const ASSET_LEAF_SPLIT_COMMITMENT_ROOT: u64 = 13;
const ASSET_LEAF_SCRIPT_VERSION: u64 = 14;
const ASSET_LEAF_SCRIPT_KEY: u64 = 16;
const ASSET_LEAF_GROUP_KEY: u64 = 17;

const WITNESS_PREV_ID: u64 = 1;
const WITNESS_TX_WITNESS: u64 = 3;
const WITNESS_SPLIT_COMMITMENT: u64 = 5;
