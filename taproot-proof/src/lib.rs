//! High-level API for Taproot Asset proofs.
//!
//! Re-exports the data model and the verification core, and adds a
//! bitcoin/secp256k1 backend, deadline based cancellation, environment
//! configuration and JSON test vectors.

/// Re-export of taproot-proof-core for backend implementations.
pub use taproot_proof_core as core;
/// Re-export of the proof data model and codec.
pub use taproot_proof_types as types;

pub use taproot_proof_core::{
    AssetSnapshot, CallbackError, ChainVerifier, GroupVerifier, HeaderVerifier, Logger,
    MerkleVerifier, Verifiers, VerifyContext,
};
pub use taproot_proof_types::{is_proof_file, is_single_proof, File, Proof};

/// Cancellation signals for verification runs.
pub mod cancel;
/// Verifier configuration.
pub mod config;
/// JSON test vector interchange.
pub mod vectors;
/// Host-side verification helpers backed by bitcoin/secp256k1.
pub mod verify;

pub use cancel::{CancelFlag, Deadline};
pub use config::VerifierConfig;
pub use verify::{verify_file, verify_proof, BitcoinTaprootOps};
