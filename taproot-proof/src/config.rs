//! Verifier configuration, from serde sources or the environment.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use taproot_proof_core::verify::context::DEFAULT_MAX_DEPTH;
use taproot_proof_core::{CancelSignal, Logger, VerifyContext};

use crate::cancel::Deadline;

pub const MAX_DEPTH_VAR: &str = "TAPROOF_MAX_DEPTH";
pub const TIMEOUT_MS_VAR: &str = "TAPROOF_TIMEOUT_MS";
pub const CHALLENGE_VAR: &str = "TAPROOF_CHALLENGE";

/// Limits applied to a verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Deepest allowed nesting of additional input files.
    pub max_depth: usize,
    /// Overall time budget, in milliseconds on the wire.
    #[serde(with = "timeout_ms")]
    pub timeout: Option<Duration>,
    /// Ownership challenge, hex on the wire.
    #[serde(with = "hex_challenge")]
    pub challenge: Option<[u8; 32]>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        VerifierConfig {
            max_depth: DEFAULT_MAX_DEPTH,
            timeout: None,
            challenge: None,
        }
    }
}

impl VerifierConfig {
    /// Reads the `TAPROOF_*` variables, keeping defaults for unset ones.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`VerifierConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = VerifierConfig::default();

        if let Some(value) = lookup(MAX_DEPTH_VAR) {
            config.max_depth = value
                .trim()
                .parse()
                .with_context(|| format!("invalid {MAX_DEPTH_VAR}: {value:?}"))?;
        }
        if let Some(value) = lookup(TIMEOUT_MS_VAR) {
            let millis: u64 = value
                .trim()
                .parse()
                .with_context(|| format!("invalid {TIMEOUT_MS_VAR}: {value:?}"))?;
            config.timeout = Some(Duration::from_millis(millis));
        }
        if let Some(value) = lookup(CHALLENGE_VAR) {
            let challenge =
                parse_challenge(&value).with_context(|| format!("invalid {CHALLENGE_VAR}"))?;
            config.challenge = Some(challenge);
        }

        Ok(config)
    }

    /// Deadline for a run starting now, if a timeout is configured.
    pub fn deadline(&self) -> Option<Deadline> {
        self.timeout.map(Deadline::after)
    }

    /// Builds the core verification context.
    pub fn context<'a>(&self, cancel: &'a dyn CancelSignal, logger: Logger) -> VerifyContext<'a> {
        let ctx = VerifyContext::new(cancel)
            .with_max_depth(self.max_depth)
            .with_logger(logger);
        match self.challenge {
            Some(challenge) => ctx.with_challenge(challenge),
            None => ctx,
        }
    }
}

/// Parses a 32-byte hex challenge.
pub fn parse_challenge(value: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(value.trim()).context("challenge is not hex")?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("challenge must be 32 bytes, got {len}"))
}

mod timeout_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        value
            .map(|timeout| timeout.as_millis() as u64)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

mod hex_challenge {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<[u8; 32]>, serializer: S) -> Result<S::Ok, S::Error> {
        value.map(hex::encode).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<[u8; 32]>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|value| super::parse_challenge(&value).map_err(D::Error::custom))
            .transpose()
    }
}
