use crate::alloc::string::String; // For no_std compatibility
use bitcoin::io::Error as BitcoinIoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(BitcoinIoError),

    #[error("TLV stream error: {0}")]
    TlvStream(String),

    #[error("Missing TLV field: {0}")]
    MissingTlvField(&'static str),

    #[error("Bitcoin serialization error: {0}")]
    BitcoinSerialization(String),

    #[error("Unknown even TLV type: {0}")]
    UnknownTlvType(u64),

    #[error("TLV type {0} out of order")]
    UnorderedTlvType(u64),

    #[error("Invalid TLV value for type {0}: {1}")]
    InvalidTlvValue(u64, String),

    #[error("TLV record too large: {length} bytes for type {tlv_type}")]
    RecordTooLarge { tlv_type: u64, length: u64 },

    #[error("non-canonical BigSize encoding")]
    NonCanonicalBigSize,

    #[error("invalid prefix magic bytes, expected {}", magic_str(.expected))]
    InvalidMagic { expected: [u8; 4] },

    #[error("unknown version: {0}")]
    UnknownVersion(u32),

    #[error("taproot proof must carry exactly one of commitment or tapscript proof")]
    InvalidTaprootProofVariant,

    #[error("proof checksum mismatch at index {index}")]
    ChecksumMismatch { index: usize },

    #[error("proof index {index} out of range for {count} proofs")]
    ProofIndexOutOfRange { index: usize, count: usize },

    #[error("proof file is empty")]
    EmptyFile,

    #[error("no matching proof found")]
    ProofNotFound,
}

impl Error {
    /// Returns true if the error is the shared unknown-version condition.
    pub fn is_unknown_version(&self) -> bool {
        matches!(self, Error::UnknownVersion(_))
    }
}

impl From<BitcoinIoError> for Error {
    fn from(err: BitcoinIoError) -> Self {
        Error::Io(err)
    }
}

fn magic_str(magic: &[u8; 4]) -> &str {
    core::str::from_utf8(magic).unwrap_or("????")
}
