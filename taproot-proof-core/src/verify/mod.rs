//! Verification routines for Taproot Asset proofs.

/// Proof chain verification.
pub mod chain;
/// Cancellation and limits for a verification run.
pub mod context;
/// Genesis and meta reveal verification helpers.
pub mod genesis;
/// Group key reveal verification helpers.
pub mod group_key_reveal;
/// Explicit logger handle.
pub mod logger;
/// MS-SMT root reconstruction.
pub mod mssmt;
/// Ownership (challenge witness) verification.
pub mod ownership;
/// Proof verification helpers.
pub mod proof;
/// Taproot proof verification helpers.
pub mod taproot_proof;
/// Anchor transaction verification helpers.
pub mod tx;

/// Result type for verification helpers.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors returned by verification helpers.
#[derive(Debug)]
pub enum Error {
    /// The proof or one of its embedded files could not be decoded.
    Codec(taproot_proof_types::Error),
    /// Genesis or meta reveal verification failed.
    Genesis(genesis::Error),
    /// Group key reveal verification failed.
    GroupKeyReveal(group_key_reveal::Error),
    /// Ownership witness verification failed.
    Ownership(ownership::Error),
    /// Proof verification failed.
    Proof(proof::Error),
    /// Taproot proof verification failed.
    TaprootProof(taproot_proof::Error),
    /// Anchor transaction verification failed.
    Tx(tx::Error),
    /// Chain verification failed.
    Chain(chain::Error),
}

impl Error {
    /// Returns true if verification stopped on an unregistered version.
    pub fn is_unknown_version(&self) -> bool {
        match self {
            Error::Codec(err) => err.is_unknown_version(),
            Error::Proof(err) => matches!(err, proof::Error::UnknownVersion(_)),
            _ => false,
        }
    }
}

impl From<taproot_proof_types::Error> for Error {
    fn from(err: taproot_proof_types::Error) -> Self {
        Self::Codec(err)
    }
}

impl From<genesis::Error> for Error {
    fn from(err: genesis::Error) -> Self {
        Self::Genesis(err)
    }
}

impl From<group_key_reveal::Error> for Error {
    /// Converts a group key reveal error into a verification error.
    fn from(err: group_key_reveal::Error) -> Self {
        Self::GroupKeyReveal(err)
    }
}

impl From<ownership::Error> for Error {
    fn from(err: ownership::Error) -> Self {
        Self::Ownership(err)
    }
}

impl From<proof::Error> for Error {
    /// Converts a proof error into a verification error.
    fn from(err: proof::Error) -> Self {
        Self::Proof(err)
    }
}

impl From<taproot_proof::Error> for Error {
    /// Converts a taproot proof error into a verification error.
    fn from(err: taproot_proof::Error) -> Self {
        Self::TaprootProof(err)
    }
}

impl From<tx::Error> for Error {
    /// Converts a transaction error into a verification error.
    fn from(err: tx::Error) -> Self {
        Self::Tx(err)
    }
}

impl From<chain::Error> for Error {
    fn from(err: chain::Error) -> Self {
        Self::Chain(err)
    }
}

impl core::fmt::Display for Error {
    /// Formats the error for display.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Codec(err) => core::fmt::Display::fmt(err, f),
            Error::Genesis(err) => core::fmt::Display::fmt(err, f),
            Error::GroupKeyReveal(err) => core::fmt::Display::fmt(err, f),
            Error::Ownership(err) => core::fmt::Display::fmt(err, f),
            Error::Proof(err) => core::fmt::Display::fmt(err, f),
            Error::TaprootProof(err) => core::fmt::Display::fmt(err, f),
            Error::Tx(err) => core::fmt::Display::fmt(err, f),
            Error::Chain(err) => core::fmt::Display::fmt(err, f),
        }
    }
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Error::Codec(err) => Some(err),
            Error::Chain(err) => Some(err),
            _ => None,
        }
    }
}
