//! Asset metadata disclosed alongside a genesis proof.

use alloc::format;
use alloc::vec::Vec;

use bitcoin::hashes::sha256::Hash as Sha256Hash;
use bitcoin::hashes::Hash;
use bitcoin::io::Read;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::tlv::{fixed_value, RecordSet, Stream, UnknownOddTypes};

/// Largest metadata blob accepted in a meta reveal.
pub const MAX_META_DATA_SIZE: usize = 1024 * 1024;

/// Interpretation of the revealed metadata bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetaType {
    Opaque,
    Json,
    /// A type this crate does not interpret. Kept so the hash still matches.
    Unknown(u8),
}

impl MetaType {
    pub fn to_u8(self) -> u8 {
        match self {
            MetaType::Opaque => 0,
            MetaType::Json => 1,
            MetaType::Unknown(value) => value,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => MetaType::Opaque,
            1 => MetaType::Json,
            other => MetaType::Unknown(other),
        }
    }
}

/// The preimage of an asset's meta hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaReveal {
    pub meta_type: MetaType,
    pub data: Vec<u8>,
    pub unknown_odd_types: UnknownOddTypes,
}

impl MetaReveal {
    pub fn new(meta_type: MetaType, data: Vec<u8>) -> Self {
        MetaReveal {
            meta_type,
            data,
            unknown_odd_types: UnknownOddTypes::new(),
        }
    }

    /// Hash committed to by the asset genesis: sha256 of the TLV encoding.
    pub fn meta_hash(&self) -> Sha256Hash {
        let mut bytes = Vec::new();
        self.encode(&mut bytes);
        Sha256Hash::hash(&bytes)
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        let mut records = RecordSet::new();
        records.put(META_TYPE, alloc::vec![self.meta_type.to_u8()]);
        records.put(META_DATA, self.data.clone());
        records.put_unknown(&self.unknown_odd_types);
        records.write(out);
    }

    pub fn decode_tlv<R: Read>(r: R) -> Result<Self, Error> {
        let mut stream = Stream::new(r);
        let mut meta_type = None;
        let mut data = None;
        let mut unknown_odd_types = UnknownOddTypes::new();

        while let Some(record) = stream.next_record()? {
            match record.tlv_type().0 {
                META_TYPE => {
                    let [byte] = fixed_value::<1>(&record)?;
                    meta_type = Some(MetaType::from_u8(byte));
                }
                META_DATA => {
                    if record.value().len() > MAX_META_DATA_SIZE {
                        return Err(Error::InvalidTlvValue(
                            META_DATA,
                            format!("meta data of {} bytes too large", record.value().len()),
                        ));
                    }
                    data = Some(record.into_value());
                }
                _ => record.retain_unknown(&mut unknown_odd_types)?,
            }
        }

        Ok(MetaReveal {
            meta_type: meta_type.ok_or(Error::MissingTlvField("MetaReveal.type"))?,
            data: data.ok_or(Error::MissingTlvField("MetaReveal.data"))?,
            unknown_odd_types,
        })
    }
}

const META_TYPE: u64 = 0;
const META_DATA: u64 = 2;
