//! MS-SMT root reconstruction from a leaf and its sibling path.

use alloc::vec::Vec;

use bitcoin::hashes::Hash;
use taproot_proof_types::mssmt::{bit_index, empty_tree, MssmtNode, MssmtProof, TREE_LEVELS};

/// Errors returned while walking an MS-SMT proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// MS-SMT proof length is invalid.
    InvalidProofLength {
        /// Expected proof length.
        expected: usize,
        /// Actual proof length.
        actual: usize,
    },
    /// MS-SMT sum overflowed while hashing.
    SumOverflow,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidProofLength { expected, actual } => write!(
                f,
                "invalid mssmt proof length {}, expected {}",
                actual, expected
            ),
            Error::SumOverflow => write!(f, "mssmt sum overflow"),
        }
    }
}

/// MS-SMT root data along with its immediate children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MssmtRoot {
    /// Root hash of the MS-SMT.
    pub root_hash: [u8; 32],
    /// Root sum of the MS-SMT.
    pub root_sum: u64,
    /// Root left child hash.
    pub left_hash: [u8; 32],
    /// Root right child hash.
    pub right_hash: [u8; 32],
}

/// Computes the root reached by placing `leaf` at `key` with the proof's
/// siblings.
pub fn mssmt_root(key: [u8; 32], leaf: MssmtNode, proof: &MssmtProof) -> Result<MssmtRoot, Error> {
    let nodes = expand_nodes(&proof.nodes)?;
    let mut current = leaf;
    let mut root_left = [0u8; 32];
    let mut root_right = [0u8; 32];

    for i in (0..TREE_LEVELS).rev() {
        let sibling = &nodes[TREE_LEVELS - 1 - i];
        let (left, right) = if bit_index(i, &key) == 0 {
            (&current, sibling)
        } else {
            (sibling, &current)
        };

        if i == 0 {
            root_left = left.hash.to_byte_array();
            root_right = right.hash.to_byte_array();
        }

        current = MssmtNode::branch(left, right).ok_or(Error::SumOverflow)?;
    }

    Ok(MssmtRoot {
        root_hash: current.hash.to_byte_array(),
        root_sum: current.sum,
        left_hash: root_left,
        right_hash: root_right,
    })
}

/// The leaf committed to an empty slot.
pub fn empty_leaf() -> MssmtNode {
    MssmtNode::leaf(&[], 0)
}

/// Replaces placeholder siblings with the empty subtree of matching height.
fn expand_nodes(nodes: &[MssmtNode]) -> Result<Vec<MssmtNode>, Error> {
    if nodes.len() != TREE_LEVELS {
        return Err(Error::InvalidProofLength {
            expected: TREE_LEVELS,
            actual: nodes.len(),
        });
    }

    let empty = empty_tree();
    Ok(nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| {
            if node.is_placeholder() {
                empty[TREE_LEVELS - idx].clone()
            } else {
                node.clone()
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn single_leaf_in_empty_tree() {
        let leaf = MssmtNode::leaf(b"value", 7);
        let root = mssmt_root([0u8; 32], leaf.clone(), &MssmtProof::empty()).unwrap();
        assert_eq!(root.root_sum, 7);

        // Key 0 goes left at every level, so the path is leaf-then-empties.
        let empty = empty_tree();
        let mut current = leaf;
        for depth in (0..TREE_LEVELS).rev() {
            current = MssmtNode::branch(&current, &empty[depth + 1]).unwrap();
        }
        assert_eq!(root.root_hash, current.hash.to_byte_array());
        assert_eq!(root.right_hash, empty[1].hash.to_byte_array());
    }

    #[test]
    fn empty_leaf_gives_empty_root() {
        let root = mssmt_root([0xab; 32], empty_leaf(), &MssmtProof::empty()).unwrap();
        assert_eq!(root.root_hash, empty_tree()[0].hash.to_byte_array());
        assert_eq!(root.root_sum, 0);
    }

    #[test]
    fn short_proof_rejected() {
        let proof = MssmtProof {
            nodes: alloc::vec![MssmtNode::placeholder(); 10],
        };
        assert_eq!(
            mssmt_root([0u8; 32], empty_leaf(), &proof),
            Err(Error::InvalidProofLength {
                expected: TREE_LEVELS,
                actual: 10
            })
        );
    }

    #[test]
    fn overflowing_sums_rejected() {
        let mut proof = MssmtProof::empty();
        proof.nodes[0] = MssmtNode::leaf(b"other", u64::MAX);
        let leaf = MssmtNode::leaf(b"value", 1);
        assert_eq!(
            mssmt_root([0u8; 32], leaf, &proof),
            Err(Error::SumOverflow)
        );
    }
}
