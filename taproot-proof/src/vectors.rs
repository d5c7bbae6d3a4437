//! JSON test vectors pinning byte-level and error-level compatibility.
//!
//! A valid case holds a proof and its expected hex encoding. An error case
//! holds hex bytes that must fail to decode with the named error.

use std::fmt::Debug;
use std::fs;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use taproot_proof_types::{is_proof_file, File, Proof};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestVectors {
    #[serde(default)]
    pub valid_test_cases: Vec<ValidTestCase>,
    #[serde(default)]
    pub error_test_cases: Vec<ErrorTestCase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidTestCase {
    pub proof: Proof,
    /// Hex encoding of `proof`. Whitespace is ignored.
    pub expected: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorTestCase {
    /// Hex bytes of a proof or proof file.
    pub proof: String,
    /// Name of the expected decode error variant, e.g. `UnknownVersion`.
    pub error: String,
    #[serde(default)]
    pub comment: String,
}

impl ValidTestCase {
    /// Builds a case from a proof, filling in its current encoding.
    pub fn new(proof: Proof, comment: impl Into<String>) -> Result<Self> {
        let expected = hex::encode(proof.to_bytes()?);
        Ok(ValidTestCase {
            proof,
            expected,
            comment: comment.into(),
        })
    }
}

impl TestVectors {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Checks every case and fails on the first mismatch.
    pub fn check(&self) -> Result<()> {
        for (index, case) in self.valid_test_cases.iter().enumerate() {
            check_valid(case).with_context(|| {
                format!("valid case {index} ({}) failed", case.comment)
            })?;
        }
        for (index, case) in self.error_test_cases.iter().enumerate() {
            check_error(case).with_context(|| {
                format!("error case {index} ({}) failed", case.comment)
            })?;
        }
        Ok(())
    }
}

fn check_valid(case: &ValidTestCase) -> Result<()> {
    let expected = decode_hex(&case.expected)?;
    let encoded = case.proof.to_bytes()?;
    ensure!(
        encoded == expected,
        "encoding mismatch: got {}",
        hex::encode(&encoded)
    );

    let decoded = Proof::from_bytes(&expected)?;
    ensure!(decoded == case.proof, "decoded proof differs");
    Ok(())
}

fn check_error(case: &ErrorTestCase) -> Result<()> {
    let bytes = decode_hex(&case.proof)?;
    let result = if is_proof_file(&bytes) {
        File::from_bytes(&bytes).map(|_| ())
    } else {
        Proof::from_bytes(&bytes).map(|_| ())
    };

    match result {
        Ok(()) => bail!("expected {} but decoding succeeded", case.error),
        Err(err) => {
            let name = error_name(&err);
            ensure!(name == case.error, "expected {} but got {err}", case.error);
            Ok(())
        }
    }
}

fn decode_hex(value: &str) -> Result<Vec<u8>> {
    let stripped: String = value.split_whitespace().collect();
    hex::decode(stripped).context("invalid hex")
}

/// Variant name of an error, taken from its `Debug` form.
pub fn error_name<E: Debug>(err: &E) -> String {
    let debug = format!("{err:?}");
    debug
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .next()
        .unwrap_or_default()
        .to_string()
}
