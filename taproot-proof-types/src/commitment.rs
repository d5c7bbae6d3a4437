use alloc::format;
use alloc::string::ToString;
use alloc::vec::Vec;

use bitcoin::io::{Cursor, Read};
use serde::{Deserialize, Serialize};

use crate::asset::AssetVersion;
use crate::error::Error;
use crate::mssmt::MssmtProof;
use crate::tlv::{ensure_consumed, fixed_value, RecordSet, Stream, UnknownOddTypes};

/// Denotes the structure of the Taproot Asset commitment MS-SMT and the procedure
/// for building a TapLeaf from a Taproot Asset commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum TapCommitmentVersion {
    /// Initial Taproot Asset Commitment version. Uses legacy TapLeaf format, ONLY commits to V0 assets.
    V0 = 0,
    /// Used by Taproot Asset Commitments that commit to V0 or V1 assets. Uses legacy TapLeaf format.
    V1 = 1,
    /// Used by Taproot Asset Commitments that commit to V0 or V1 assets. Uses V1 TapLeaf format.
    V2 = 2,
}

impl TapCommitmentVersion {
    pub(crate) fn from_u8(val: u8) -> Result<Self, Error> {
        match val {
            0 => Ok(TapCommitmentVersion::V0),
            1 => Ok(TapCommitmentVersion::V1),
            2 => Ok(TapCommitmentVersion::V2),
            _ => Err(Error::InvalidTlvValue(
                TAPROOT_ASSET_PROOF_VERSION_TYPE,
                format!("unknown tap commitment version: {}", val),
            )),
        }
    }

    /// Returns true if both versions use the same leaf format. V0 and V1
    /// share the legacy format, V2 stands alone.
    pub fn compatible_with(self, other: TapCommitmentVersion) -> bool {
        (self == TapCommitmentVersion::V2) == (other == TapCommitmentVersion::V2)
    }
}

/// Type of tapscript sibling preimage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TapscriptPreimageType {
    /// Pre-image that's a leaf script.
    LeafPreimage = 0,
    /// Pre-image that's a branch (64-bytes of two child pre-images).
    BranchPreimage = 1,
}

impl TapscriptPreimageType {
    pub(crate) fn from_u8(val: u8) -> Result<Self, Error> {
        match val {
            0 => Ok(TapscriptPreimageType::LeafPreimage),
            1 => Ok(TapscriptPreimageType::BranchPreimage),
            _ => Err(Error::TlvStream(format!(
                "unknown tapscript preimage type: {}",
                val
            ))),
        }
    }
}

/// Wraps a pre-image byte slice with a type byte that self identifies what type of pre-image it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapscriptPreimage {
    /// The pre-image itself. This will be 64 bytes if representing a TapBranch,
    /// or a leaf version, compact size length and script if representing a
    /// TapLeaf.
    pub sibling_preimage: Vec<u8>,
    /// The type of the pre-image.
    pub sibling_type: TapscriptPreimageType,
}

impl TapscriptPreimage {
    /// Encodes as one type byte followed by the raw preimage.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.sibling_type as u8);
        out.extend_from_slice(&self.sibling_preimage);
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let (&type_byte, preimage) = bytes
            .split_first()
            .ok_or_else(|| Error::TlvStream("empty tapscript preimage".to_string()))?;
        let sibling_type = TapscriptPreimageType::from_u8(type_byte)?;

        if sibling_type == TapscriptPreimageType::BranchPreimage && preimage.len() != 64 {
            return Err(Error::TlvStream(format!(
                "branch preimage must be 64 bytes, got {}",
                preimage.len()
            )));
        }

        Ok(TapscriptPreimage {
            sibling_preimage: preimage.to_vec(),
            sibling_type,
        })
    }
}

/// Proof used along with an asset leaf to arrive at the root of the AssetCommitment MS-SMT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetProof {
    /// The underlying MS-SMT proof.
    pub proof: MssmtProof,
    /// Max version of the assets committed.
    pub version: AssetVersion,
    /// Common identifier for all assets found within the AssetCommitment.
    /// Can be an asset ID or the hash of a group key.
    pub tap_key: [u8; 32],
    pub unknown_odd_types: UnknownOddTypes,
}

impl AssetProof {
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        let mut records = RecordSet::new();
        records.put(ASSET_PROOF_VERSION_TYPE, alloc::vec![self.version as u8]);
        records.put(ASSET_PROOF_TAP_KEY_TYPE, self.tap_key.to_vec());
        let mut proof = Vec::new();
        self.proof.encode(&mut proof)?;
        records.put(ASSET_PROOF_MSSMT_PROOF_TYPE, proof);
        records.put_unknown(&self.unknown_odd_types);
        records.write(out);
        Ok(())
    }

    pub fn decode_tlv<R: Read>(r: R) -> Result<Self, Error> {
        let mut stream = Stream::new(r);
        let mut mssmt_proof = None;
        let mut version = None;
        let mut tap_key = None;
        let mut unknown_odd_types = UnknownOddTypes::new();

        while let Some(record) = stream.next_record()? {
            match record.tlv_type().0 {
                ASSET_PROOF_VERSION_TYPE => {
                    let [byte] = fixed_value::<1>(&record)?;
                    version = Some(AssetVersion::from_u8(byte)?);
                }
                ASSET_PROOF_TAP_KEY_TYPE => tap_key = Some(fixed_value(&record)?),
                ASSET_PROOF_MSSMT_PROOF_TYPE => mssmt_proof = Some(decode_mssmt_record(&record)?),
                _ => record.retain_unknown(&mut unknown_odd_types)?,
            }
        }

        Ok(AssetProof {
            proof: mssmt_proof.ok_or(Error::MissingTlvField("AssetProof.proof"))?,
            version: version.ok_or(Error::MissingTlvField("AssetProof.version"))?,
            tap_key: tap_key.ok_or(Error::MissingTlvField("AssetProof.tap_key"))?,
            unknown_odd_types,
        })
    }
}

/// Proof used along with an asset commitment leaf to arrive at the root of the TapCommitment MS-SMT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaprootAssetProof {
    /// The underlying MS-SMT proof.
    pub proof: MssmtProof,
    /// Version of the TapCommitment used to create the proof.
    pub version: TapCommitmentVersion,
    pub unknown_odd_types: UnknownOddTypes,
}

impl TaprootAssetProof {
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        let mut records = RecordSet::new();
        records.put(
            TAPROOT_ASSET_PROOF_VERSION_TYPE,
            alloc::vec![self.version as u8],
        );
        let mut proof = Vec::new();
        self.proof.encode(&mut proof)?;
        records.put(TAPROOT_ASSET_PROOF_MSSMT_PROOF_TYPE, proof);
        records.put_unknown(&self.unknown_odd_types);
        records.write(out);
        Ok(())
    }

    pub fn decode_tlv<R: Read>(r: R) -> Result<Self, Error> {
        let mut stream = Stream::new(r);
        let mut mssmt_proof = None;
        let mut version = None;
        let mut unknown_odd_types = UnknownOddTypes::new();

        while let Some(record) = stream.next_record()? {
            match record.tlv_type().0 {
                TAPROOT_ASSET_PROOF_VERSION_TYPE => {
                    let [byte] = fixed_value::<1>(&record)?;
                    version = Some(TapCommitmentVersion::from_u8(byte)?);
                }
                TAPROOT_ASSET_PROOF_MSSMT_PROOF_TYPE => {
                    mssmt_proof = Some(decode_mssmt_record(&record)?)
                }
                _ => record.retain_unknown(&mut unknown_odd_types)?,
            }
        }

        Ok(TaprootAssetProof {
            proof: mssmt_proof.ok_or(Error::MissingTlvField("TaprootAssetProof.proof"))?,
            version: version.ok_or(Error::MissingTlvField("TaprootAssetProof.version"))?,
            unknown_odd_types,
        })
    }
}

/// Represents a full commitment proof for a particular `Asset`. It proves
/// that an asset does or does not exist within a Taproot Asset commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Proof used along with the asset to arrive at the root of the AssetCommitment MS-SMT.
    /// NOTE: This proof must be None if the asset commitment for this
    /// particular asset is not found within the Taproot Asset commitment.
    pub asset_proof: Option<AssetProof>,
    /// Proof used along with the asset commitment to arrive at the root of the TapCommitment
    /// MS-SMT.
    pub taproot_asset_proof: TaprootAssetProof,
    pub unknown_odd_types: UnknownOddTypes,
}

impl Proof {
    /// Adds the proof's records to a set shared with an enclosing structure.
    pub(crate) fn put_records(&self, records: &mut RecordSet) -> Result<(), Error> {
        if let Some(asset_proof) = &self.asset_proof {
            let mut value = Vec::new();
            asset_proof.encode(&mut value)?;
            records.put(PROOF_ASSET_PROOF_TYPE, value);
        }
        let mut value = Vec::new();
        self.taproot_asset_proof.encode(&mut value)?;
        records.put(PROOF_TAPROOT_ASSET_PROOF_TYPE, value);
        records.put_unknown(&self.unknown_odd_types);
        Ok(())
    }

    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        let mut records = RecordSet::new();
        self.put_records(&mut records)?;
        records.write(out);
        Ok(())
    }

    pub fn decode_tlv<R: Read>(r: R) -> Result<Self, Error> {
        let mut stream = Stream::new(r);
        let mut asset_proof = None;
        let mut taproot_asset_proof = None;
        let mut unknown_odd_types = UnknownOddTypes::new();

        while let Some(record) = stream.next_record()? {
            match record.tlv_type().0 {
                PROOF_ASSET_PROOF_TYPE => {
                    asset_proof = Some(AssetProof::decode_tlv(record.value_reader())?);
                }
                PROOF_TAPROOT_ASSET_PROOF_TYPE => {
                    taproot_asset_proof = Some(TaprootAssetProof::decode_tlv(record.value_reader())?);
                }
                _ => record.retain_unknown(&mut unknown_odd_types)?,
            }
        }

        Ok(Proof {
            asset_proof,
            taproot_asset_proof: taproot_asset_proof
                .ok_or(Error::MissingTlvField("Proof.taproot_asset_proof"))?,
            unknown_odd_types,
        })
    }
}

fn decode_mssmt_record(record: &crate::tlv::Record) -> Result<MssmtProof, Error> {
    let mut cursor: Cursor<&[u8]> = record.value_reader();
    let proof = MssmtProof::decode(&mut cursor)?;
    ensure_consumed(record, &cursor)?;
    Ok(proof)
}

// For commitment::Proof
pub(crate) const PROOF_ASSET_PROOF_TYPE: u64 = 0;
pub(crate) const PROOF_TAPROOT_ASSET_PROOF_TYPE: u64 = 2;

// For commitment::AssetProof
const ASSET_PROOF_VERSION_TYPE: u64 = 0;
const ASSET_PROOF_TAP_KEY_TYPE: u64 = 2;
const ASSET_PROOF_MSSMT_PROOF_TYPE: u64 = 4;

// For commitment::TaprootAssetProof
const TAPROOT_ASSET_PROOF_VERSION_TYPE: u64 = 0;
const TAPROOT_ASSET_PROOF_MSSMT_PROOF_TYPE: u64 = 2;
