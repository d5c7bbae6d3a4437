//! Stream framing and the version registry.
//!
//! Every encoded stream starts with a four byte magic followed by a big
//! endian `u32` version. The version is resolved against a static registry
//! before any field is read, so an unregistered version always surfaces as
//! [`Error::UnknownVersion`] no matter which entry point saw it.

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::file::{self, HashedProof};
use crate::proof::{self, Proof};

/// Magic prefix of a single encoded proof.
pub const PROOF_MAGIC: [u8; 4] = *b"TAPP";
/// Magic prefix of an encoded proof file.
pub const FILE_MAGIC: [u8; 4] = *b"TAPF";

/// Returns true if the bytes start with the single proof magic.
pub fn is_single_proof(bytes: &[u8]) -> bool {
    bytes.starts_with(&PROOF_MAGIC)
}

/// Returns true if the bytes start with the proof file magic.
pub fn is_proof_file(bytes: &[u8]) -> bool {
    bytes.starts_with(&FILE_MAGIC)
}

/// Version of a single state transition proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransitionVersion(pub u32);

impl TransitionVersion {
    pub const V0: TransitionVersion = TransitionVersion(0);
    /// Transfers must carry STXO proofs for every spent input.
    pub const V1: TransitionVersion = TransitionVersion(1);
}

/// Version of the proof file container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileVersion(pub u32);

impl FileVersion {
    pub const V0: FileVersion = FileVersion(0);
}

/// Encoding strategy for the body of a single proof (everything after the
/// magic and version).
pub trait ProofCodec {
    fn encode_body(&self, proof: &Proof, out: &mut Vec<u8>) -> Result<(), Error>;
    fn decode_body(&self, version: TransitionVersion, body: &[u8]) -> Result<Proof, Error>;
}

/// Encoding strategy for the entries of a proof file.
pub trait FileCodec {
    fn encode_entries(&self, entries: &[HashedProof], out: &mut Vec<u8>);
    fn decode_entries(&self, body: &[u8]) -> Result<Vec<HashedProof>, Error>;
}

/// TLV proof body shared by all registered transition versions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TlvProofCodec;

impl ProofCodec for TlvProofCodec {
    fn encode_body(&self, proof: &Proof, out: &mut Vec<u8>) -> Result<(), Error> {
        proof::encode_records(proof, out)
    }

    fn decode_body(&self, version: TransitionVersion, body: &[u8]) -> Result<Proof, Error> {
        proof::decode_records(version, body)
    }
}

/// Entry list with a running sha256 checksum per entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumFileCodec;

impl FileCodec for ChecksumFileCodec {
    fn encode_entries(&self, entries: &[HashedProof], out: &mut Vec<u8>) {
        file::encode_entries(entries, out)
    }

    fn decode_entries(&self, body: &[u8]) -> Result<Vec<HashedProof>, Error> {
        file::decode_entries(body)
    }
}

/// A registered proof version with its codec and verification rules.
pub struct TransitionSpec {
    pub version: TransitionVersion,
    /// Transfer roots must prove every spent input with an STXO proof.
    pub requires_stxo_proofs: bool,
    pub codec: &'static (dyn ProofCodec + Sync),
}

/// A registered file version with its codec.
pub struct FileSpec {
    pub version: FileVersion,
    pub codec: &'static (dyn FileCodec + Sync),
}

static TRANSITIONS: [TransitionSpec; 2] = [
    TransitionSpec {
        version: TransitionVersion::V0,
        requires_stxo_proofs: false,
        codec: &TlvProofCodec,
    },
    TransitionSpec {
        version: TransitionVersion::V1,
        requires_stxo_proofs: true,
        codec: &TlvProofCodec,
    },
];

static FILE_FORMATS: [FileSpec; 1] = [FileSpec {
    version: FileVersion::V0,
    codec: &ChecksumFileCodec,
}];

/// Looks up a transition version.
pub fn transition(version: TransitionVersion) -> Result<&'static TransitionSpec, Error> {
    TRANSITIONS
        .iter()
        .find(|spec| spec.version == version)
        .ok_or(Error::UnknownVersion(version.0))
}

/// Looks up a file version.
pub fn file_format(version: FileVersion) -> Result<&'static FileSpec, Error> {
    FILE_FORMATS
        .iter()
        .find(|spec| spec.version == version)
        .ok_or(Error::UnknownVersion(version.0))
}

/// Splits `magic ‖ version ‖ body`, rejecting a mismatching magic.
pub(crate) fn split_header(bytes: &[u8], magic: [u8; 4]) -> Result<(u32, &[u8]), Error> {
    if !bytes.starts_with(&magic) {
        return Err(Error::InvalidMagic { expected: magic });
    }
    let rest = &bytes[magic.len()..];
    if rest.len() < 4 {
        return Err(Error::TlvStream(alloc::format!(
            "stream too short for version: {} bytes",
            rest.len()
        )));
    }
    let (version, body) = rest.split_at(4);
    let mut buf = [0u8; 4];
    buf.copy_from_slice(version);
    Ok((u32::from_be_bytes(buf), body))
}

pub(crate) fn write_header(magic: [u8; 4], version: u32, out: &mut Vec<u8>) {
    out.extend_from_slice(&magic);
    out.extend_from_slice(&version.to_be_bytes());
}
