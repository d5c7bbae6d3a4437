//! The proof file: an append-only, checksummed list of encoded proofs.

use alloc::vec::Vec;

use bitcoin::hashes::sha256::Hash as Sha256Hash;
use bitcoin::hashes::{Hash, HashEngine};
use bitcoin::io::{Cursor, Read};
use serde::{Deserialize, Serialize};

use crate::codec::{self, FileSpec, FileVersion, FILE_MAGIC};
use crate::error::Error;
use crate::proof::Proof;
use crate::tlv::{
    encode_bigsize, encode_var_bytes, read_array, read_bigsize, read_to_end, read_var_bytes,
    MAX_RECORD_SIZE,
};

/// An encoded proof together with the running checksum of the file up to and
/// including it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashedProof {
    pub proof_bytes: Vec<u8>,
    /// `sha256(previous hash ‖ proof_bytes)`, starting from all zeros.
    pub hash: [u8; 32],
}

/// Ordered provenance of an asset, oldest proof first.
///
/// Entries can be appended or replaced in place but never removed. Every
/// operation that interprets entries checks the file version first and
/// fails with [`Error::UnknownVersion`] without touching the file if it is not
/// registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    version: FileVersion,
    proofs: Vec<HashedProof>,
}

impl File {
    /// Creates a file from proofs. Any version is accepted here so that files
    /// of unknown versions can still be represented.
    pub fn new(version: FileVersion, proofs: &[Proof]) -> Result<Self, Error> {
        let mut file = File {
            version,
            proofs: Vec::with_capacity(proofs.len()),
        };
        for proof in proofs {
            file.push_encoded(proof.to_bytes()?);
        }
        Ok(file)
    }

    pub fn version(&self) -> FileVersion {
        self.version
    }

    pub fn num_proofs(&self) -> usize {
        self.proofs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proofs.is_empty()
    }

    /// The raw entries with their checksums.
    pub fn entries(&self) -> &[HashedProof] {
        &self.proofs
    }

    fn check_version(&self) -> Result<&'static FileSpec, Error> {
        codec::file_format(self.version)
    }

    fn check_index(&self, index: usize) -> Result<(), Error> {
        if index >= self.proofs.len() {
            return Err(Error::ProofIndexOutOfRange {
                index,
                count: self.proofs.len(),
            });
        }
        Ok(())
    }

    fn last_index(&self) -> Result<usize, Error> {
        self.proofs.len().checked_sub(1).ok_or(Error::EmptyFile)
    }

    fn push_encoded(&mut self, proof_bytes: Vec<u8>) {
        let prev = self.proofs.last().map_or([0u8; 32], |p| p.hash);
        let hash = hash_proof(&prev, &proof_bytes);
        self.proofs.push(HashedProof { proof_bytes, hash });
    }

    /// Appends a proof to the end of the file.
    pub fn append_proof(&mut self, proof: &Proof) -> Result<(), Error> {
        self.check_version()?;
        let bytes = proof.to_bytes()?;
        self.push_encoded(bytes);
        Ok(())
    }

    /// Replaces the proof at `index`, leaving every other index in place.
    /// Checksums from `index` onwards are recomputed.
    pub fn replace_proof_at(&mut self, index: usize, proof: &Proof) -> Result<(), Error> {
        self.check_version()?;
        self.check_index(index)?;
        let bytes = proof.to_bytes()?;

        self.proofs[index].proof_bytes = bytes;
        let mut prev = match index {
            0 => [0u8; 32],
            _ => self.proofs[index - 1].hash,
        };
        for entry in &mut self.proofs[index..] {
            entry.hash = hash_proof(&prev, &entry.proof_bytes);
            prev = entry.hash;
        }
        Ok(())
    }

    pub fn replace_last_proof(&mut self, proof: &Proof) -> Result<(), Error> {
        self.check_version()?;
        let index = self.last_index()?;
        self.replace_proof_at(index, proof)
    }

    pub fn raw_proof_at(&self, index: usize) -> Result<&[u8], Error> {
        self.check_version()?;
        self.check_index(index)?;
        Ok(&self.proofs[index].proof_bytes)
    }

    pub fn proof_at(&self, index: usize) -> Result<Proof, Error> {
        Proof::from_bytes(self.raw_proof_at(index)?)
    }

    pub fn raw_last_proof(&self) -> Result<&[u8], Error> {
        self.check_version()?;
        let index = self.last_index()?;
        self.raw_proof_at(index)
    }

    pub fn last_proof(&self) -> Result<Proof, Error> {
        Proof::from_bytes(self.raw_last_proof()?)
    }

    /// Returns the first proof matching the predicate along with its index.
    pub fn locate_proof<F>(&self, mut predicate: F) -> Result<(usize, Proof), Error>
    where
        F: FnMut(&Proof) -> bool,
    {
        self.check_version()?;
        for (index, entry) in self.proofs.iter().enumerate() {
            let proof = Proof::from_bytes(&entry.proof_bytes)?;
            if predicate(&proof) {
                return Ok((index, proof));
            }
        }
        Err(Error::ProofNotFound)
    }

    /// Encodes as `TAPF ‖ version ‖ entries`.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        let spec = self.check_version()?;
        codec::write_header(FILE_MAGIC, self.version.0, out);
        spec.codec.encode_entries(&self.proofs, out);
        Ok(())
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
        let (version, body) = codec::split_header(bytes, FILE_MAGIC)?;
        let version = FileVersion(version);
        let spec = codec::file_format(version)?;
        let proofs = spec.codec.decode_entries(body)?;
        Ok(File { version, proofs })
    }
}

/// Running checksum of a proof file entry.
pub fn hash_proof(prev: &[u8; 32], proof_bytes: &[u8]) -> [u8; 32] {
    let mut engine = Sha256Hash::engine();
    engine.input(prev);
    engine.input(proof_bytes);
    Sha256Hash::from_engine(engine).to_byte_array()
}

pub(crate) fn encode_entries(entries: &[HashedProof], out: &mut Vec<u8>) {
    encode_bigsize(entries.len() as u64, out);
    for entry in entries {
        encode_var_bytes(&entry.proof_bytes, out);
        out.extend_from_slice(&entry.hash);
    }
}

pub(crate) fn decode_entries(body: &[u8]) -> Result<Vec<HashedProof>, Error> {
    let mut cursor = Cursor::new(body);
    let count = read_bigsize(&mut cursor)?;

    let mut proofs = Vec::new();
    let mut prev = [0u8; 32];
    for index in 0..count {
        let proof_bytes = read_var_bytes(&mut cursor, MAX_RECORD_SIZE)?;
        let hash: [u8; 32] = read_array(&mut cursor)?;
        if hash_proof(&prev, &proof_bytes) != hash {
            return Err(Error::ChecksumMismatch {
                index: index as usize,
            });
        }
        prev = hash;
        proofs.push(HashedProof { proof_bytes, hash });
    }

    if cursor.position() != body.len() as u64 {
        return Err(Error::TlvStream(alloc::format!(
            "{} trailing bytes after proof file entries",
            body.len() as u64 - cursor.position()
        )));
    }
    Ok(proofs)
}
