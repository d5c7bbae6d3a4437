//! Anchor transaction verification helpers.

use bitcoin::block::Header;
use bitcoin::hashes::{sha256d::Hash as Sha256dHash, Hash};
use bitcoin::{OutPoint, Transaction, TxMerkleNode};
use taproot_proof_types::proof::{Proof, TxMerkleProof};
use thiserror::Error;

/// Errors returned by anchor transaction verification helpers.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The anchor transaction does not spend the claimed previous outpoint.
    #[error("anchor tx missing prev out")]
    AnchorTxMissingPrevOut,
    /// The merkle proof node and bit counts do not match.
    #[error("merkle proof shape mismatch: nodes={nodes}, bits={bits}")]
    InvalidMerkleProofShape {
        /// Number of merkle proof nodes.
        nodes: usize,
        /// Number of merkle proof bits.
        bits: usize,
    },
    /// The merkle proof does not match the expected root.
    #[error("invalid transaction merkle proof")]
    InvalidTxMerkleProof,
}

/// Trait for hashing Merkle node pairs.
pub trait MerkleHasher {
    /// Hashes a left/right node pair into its parent.
    fn hash_nodes(&self, left: [u8; 32], right: [u8; 32]) -> [u8; 32];
}

/// Bitcoin merkle hasher using double-SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitcoinMerkleHasher;

impl MerkleHasher for BitcoinMerkleHasher {
    /// Hashes a node pair with double-SHA-256.
    fn hash_nodes(&self, left: [u8; 32], right: [u8; 32]) -> [u8; 32] {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(&left);
        buf[32..].copy_from_slice(&right);
        Sha256dHash::hash(&buf).to_byte_array()
    }
}

/// Checks that the anchor transaction spends the proof's previous outpoint.
pub fn verify_anchor_tx(proof: &Proof) -> Result<(), Error> {
    if !tx_spends_prev_out(&proof.anchor_tx, &proof.prev_out) {
        return Err(Error::AnchorTxMissingPrevOut);
    }
    Ok(())
}

/// Verifies a merkle proof for the given transaction and the header's merkle
/// root.
pub fn verify_tx_merkle_proof(
    tx: &Transaction,
    proof: &TxMerkleProof,
    header: &Header,
) -> Result<(), Error> {
    verify_tx_merkle_proof_with_hasher(
        tx.compute_txid().to_byte_array(),
        &proof.nodes,
        &proof.bits,
        header.merkle_root,
        &BitcoinMerkleHasher,
    )
}

/// Verifies a merkle proof using a caller-provided node hasher. A set bit
/// means the running hash is the left operand.
pub fn verify_tx_merkle_proof_with_hasher<H: MerkleHasher>(
    txid: [u8; 32],
    nodes: &[TxMerkleNode],
    bits: &[bool],
    merkle_root: TxMerkleNode,
    hasher: &H,
) -> Result<(), Error> {
    if nodes.len() != bits.len() {
        return Err(Error::InvalidMerkleProofShape {
            nodes: nodes.len(),
            bits: bits.len(),
        });
    }

    let mut current = txid;
    for (node, is_right) in nodes.iter().zip(bits.iter()) {
        let node = node.to_byte_array();
        let (left, right) = if *is_right {
            (current, node)
        } else {
            (node, current)
        };
        current = hasher.hash_nodes(left, right);
    }

    if current == merkle_root.to_byte_array() {
        Ok(())
    } else {
        Err(Error::InvalidTxMerkleProof)
    }
}

/// Returns true if the transaction spends the specified outpoint.
pub fn tx_spends_prev_out(tx: &Transaction, prev_out: &OutPoint) -> bool {
    tx.input
        .iter()
        .any(|input| input.previous_output == *prev_out)
}

/// Default transaction-inclusion check: walks the proof's merkle path up to
/// the header's merkle root.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxMerkleProofVerifier;

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use alloc::vec;
    use bitcoin::hashes::sha256d;

    fn node(byte: u8) -> TxMerkleNode {
        TxMerkleNode::from_byte_array([byte; 32])
    }

    fn parent(left: [u8; 32], right: [u8; 32]) -> [u8; 32] {
        BitcoinMerkleHasher.hash_nodes(left, right)
    }

    #[test]
    fn single_tx_block_has_empty_path() {
        let txid = [7u8; 32];
        let root = TxMerkleNode::from_byte_array(txid);
        assert_eq!(
            verify_tx_merkle_proof_with_hasher(txid, &[], &[], root, &BitcoinMerkleHasher),
            Ok(())
        );
    }

    #[test]
    fn direction_bits_pick_operand_order() {
        let txid = [1u8; 32];
        let sibling = node(2);
        let left_root = parent(txid, [2u8; 32]);
        let right_root = parent([2u8; 32], txid);

        let check = |bit, root: [u8; 32]| {
            verify_tx_merkle_proof_with_hasher(
                txid,
                &[sibling],
                &[bit],
                TxMerkleNode::from_byte_array(root),
                &BitcoinMerkleHasher,
            )
        };
        assert_eq!(check(true, left_root), Ok(()));
        assert_eq!(check(false, right_root), Ok(()));
        assert_eq!(check(true, right_root), Err(Error::InvalidTxMerkleProof));
    }

    #[test]
    fn hasher_is_double_sha256() {
        let mut buf = [0u8; 64];
        buf[32..].fill(1);
        assert_eq!(
            parent([0u8; 32], [1u8; 32]),
            sha256d::Hash::hash(&buf).to_byte_array()
        );
    }

    #[test]
    fn shape_mismatch_reported() {
        assert_eq!(
            verify_tx_merkle_proof_with_hasher(
                [0u8; 32],
                &vec![node(1), node(2)],
                &[true],
                node(0),
                &BitcoinMerkleHasher,
            ),
            Err(Error::InvalidMerkleProofShape { nodes: 2, bits: 1 })
        );
    }
}
