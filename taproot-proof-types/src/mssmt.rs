use crate::error::Error;
use crate::tlv::{read_array, read_u16, read_u64};
use alloc::{string::ToString, vec::Vec};
use bitcoin::hashes::{sha256::Hash as Sha256Hash, Hash, HashEngine};
use bitcoin::io::Read;
use serde::{Deserialize, Serialize};

/// Number of levels in an MS-SMT.
pub const TREE_LEVELS: usize = 256;

/// Represents a node in an MS-SMT (Merkle Sum Sparse Merkle Tree).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MssmtNode {
    /// The hash of the node.
    pub hash: Sha256Hash,
    /// The sum of the node.
    pub sum: u64,
}

impl MssmtNode {
    /// Builds a leaf node from a value and its sum.
    pub fn leaf(value: &[u8], sum: u64) -> Self {
        let mut engine = Sha256Hash::engine();
        engine.input(value);
        engine.input(&sum.to_be_bytes());
        MssmtNode {
            hash: Sha256Hash::from_engine(engine),
            sum,
        }
    }

    /// Builds a branch node, returning `None` if the sums overflow.
    pub fn branch(left: &MssmtNode, right: &MssmtNode) -> Option<Self> {
        let sum = left.sum.checked_add(right.sum)?;
        let mut engine = Sha256Hash::engine();
        engine.input(left.hash.as_byte_array());
        engine.input(right.hash.as_byte_array());
        engine.input(&sum.to_be_bytes());
        Some(MssmtNode {
            hash: Sha256Hash::from_engine(engine),
            sum,
        })
    }

    /// The all-zero node used in proofs to stand for an empty subtree.
    pub fn placeholder() -> Self {
        MssmtNode {
            hash: Sha256Hash::all_zeros(),
            sum: 0,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.sum == 0 && self.hash == Sha256Hash::all_zeros()
    }
}

/// Returns the empty-tree nodes indexed by depth: `[0]` is the empty root and
/// `[TREE_LEVELS]` the empty leaf.
pub fn empty_tree() -> Vec<MssmtNode> {
    let mut nodes = Vec::with_capacity(TREE_LEVELS + 1);
    nodes.push(MssmtNode::leaf(&[], 0));
    for _ in 0..TREE_LEVELS {
        let child = &nodes[nodes.len() - 1];
        // Empty subtrees have zero sums.
        let parent = MssmtNode::branch(child, child).unwrap_or_else(MssmtNode::placeholder);
        nodes.push(parent);
    }
    nodes.reverse();
    nodes
}

/// Returns the bit of `key` that selects the child at depth `idx`.
pub fn bit_index(idx: usize, key: &[u8; 32]) -> u8 {
    (key[idx / 8] >> (idx % 8)) & 1
}

/// Represents a merkle proof for a MS-SMT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MssmtProof {
    // Corresponds to mssmt.Proof
    /// Siblings ordered from the leaf upwards. Only
    /// [`MssmtNode::placeholder`] entries are compressed on the wire; any
    /// other node, including a computed empty subtree, is written as is.
    pub nodes: Vec<MssmtNode>,
}

impl MssmtProof {
    /// A proof in which every sibling is an empty subtree.
    pub fn empty() -> Self {
        MssmtProof {
            nodes: (0..TREE_LEVELS).map(|_| MssmtNode::placeholder()).collect(),
        }
    }

    /// Encodes the proof in compressed form.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        if self.nodes.len() != TREE_LEVELS {
            return Err(Error::InvalidTlvValue(
                0,
                alloc::format!("mssmt proof has {} nodes", self.nodes.len()),
            ));
        }

        // Only placeholders are compressed; a computed empty-subtree node is
        // kept explicit so it decodes to the same value.
        let mut bits = [0u8; TREE_LEVELS / 8];
        let mut explicit = Vec::new();
        for (idx, node) in self.nodes.iter().enumerate() {
            if node.is_placeholder() {
                bits[idx / 8] |= 1 << (idx % 8);
            } else {
                explicit.push(node);
            }
        }

        out.extend_from_slice(&(explicit.len() as u16).to_be_bytes());
        for node in explicit {
            out.extend_from_slice(node.hash.as_byte_array());
            out.extend_from_slice(&node.sum.to_be_bytes());
        }
        out.extend_from_slice(&bits);
        Ok(())
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self, Error> {
        // Decode the compressed MSSMT proof format:
        // - 2 bytes: number of nodes (uint16, big endian)
        // - For each node: 32 bytes hash + 8 bytes sum (uint64, big endian)
        // - Packed bits (32 bytes for 256 bits, LSB first, set = empty subtree)
        let num_nodes = read_u16(r)? as usize;
        if num_nodes > TREE_LEVELS {
            return Err(Error::InvalidTlvValue(
                0,
                "Too many explicit nodes for compressed proof".to_string(),
            ));
        }

        let mut explicit_nodes = Vec::with_capacity(num_nodes);
        for _ in 0..num_nodes {
            let hash = Sha256Hash::from_byte_array(read_array(r)?);
            let sum = read_u64(r)?;
            explicit_nodes.push(MssmtNode { hash, sum });
        }

        let packed_bits: [u8; TREE_LEVELS / 8] = read_array(r)?;
        let empty_bits = packed_bits.iter().map(|b| b.count_ones() as usize).sum::<usize>();
        if TREE_LEVELS - empty_bits != explicit_nodes.len() {
            return Err(Error::InvalidTlvValue(
                0,
                "Bit/node count mismatch: false bits != explicit nodes".to_string(),
            ));
        }

        let mut explicit_nodes = explicit_nodes.into_iter();
        let mut nodes = Vec::with_capacity(TREE_LEVELS);
        for idx in 0..TREE_LEVELS {
            if (packed_bits[idx / 8] >> (idx % 8)) & 1 == 1 {
                nodes.push(MssmtNode::placeholder());
            } else {
                // Count was checked against the bitmap above.
                let node = explicit_nodes.next().ok_or_else(|| {
                    Error::InvalidTlvValue(
                        0,
                        "Insufficient explicit nodes for compressed proof".to_string(),
                    )
                })?;
                nodes.push(node);
            }
        }

        Ok(MssmtProof { nodes })
    }
}
