//! Proofs are used to verify that a key has, or doesn't have, a given value and
//! sum in a tree with a known root.
//!
//! A proof is the list of sibling encodings from the leaf up to the root. Most
//! of them are placeholders in a sparse tree, so a proof can be compacted into
//! the non placeholder nodes and a bit mask of where the placeholders were.
//!
//! Proofs come from untrusted parties: every function here checks the shape of
//! a proof before looking at its content and never panics on malformed input.

use crate::{
    error::ProofError,
    node::{ComputedNode, Hasher, Leaf, Sum, DEFAULT_VALUE, LEAF_TAG, SUM_SIZE},
    path::{count_set_bits, get_path_bit, set_path_bit},
    spec::TreeSpec,
};

/// A merkle sum proof for a given key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SparseMerkleSumProof {
    /// `hash ‖ sum` of the siblings, from the leaf up to the root.
    pub side_nodes: Vec<Vec<u8>>,
    /// Record of the leaf found at the position of an absent key.
    pub non_membership_leaf_data: Option<Vec<u8>>,
    /// Record of the node whose encoding is the first side node.
    pub sibling_data: Option<Vec<u8>>,
}

/// A [`SparseMerkleSumProof`] without its placeholder side nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SparseCompactMerkleSumProof {
    /// The non placeholder side nodes, in order.
    pub side_nodes: Vec<Vec<u8>>,
    pub non_membership_leaf_data: Option<Vec<u8>>,
    /// Bit `i` is set if side node `i` of the full proof is a placeholder.
    pub bit_mask: Vec<u8>,
    /// Number of side nodes of the full proof.
    pub num_side_nodes: usize,
    pub sibling_data: Option<Vec<u8>>,
}

/// `(encoding, record)` of a node recomputed during a verification.
pub type ProofUpdate = (Vec<u8>, Vec<u8>);

fn sanity_check<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone>(
    proof: &SparseMerkleSumProof,
    spec: &TreeSpec<HASH_SIZE, H>,
) -> Result<(), ProofError> {
    let encoded_size = ComputedNode::<HASH_SIZE>::ENCODED_SIZE;
    if proof.side_nodes.len() > TreeSpec::<HASH_SIZE, H>::max_height()
        || proof.side_nodes.iter().any(|node| node.len() != encoded_size)
    {
        return Err(ProofError::BadProof);
    }
    if let Some(data) = &proof.non_membership_leaf_data {
        if data.len() < 1 + HASH_SIZE + SUM_SIZE || data[0] != LEAF_TAG {
            return Err(ProofError::BadProof);
        }
    }
    if let (Some(data), Some(first)) = (&proof.sibling_data, proof.side_nodes.first()) {
        if spec.hash_serialization(data)? != *first {
            return Err(ProofError::BadProof);
        }
    }
    Ok(())
}

fn sanity_check_compact<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone>(
    proof: &SparseCompactMerkleSumProof,
) -> Result<(), ProofError> {
    let num = proof.num_side_nodes;
    if num > TreeSpec::<HASH_SIZE, H>::max_height() || proof.bit_mask.len() != num.div_ceil(8) {
        return Err(ProofError::BadProof);
    }
    if (num..proof.bit_mask.len() * 8).any(|i| get_path_bit(&proof.bit_mask, i)) {
        return Err(ProofError::BadProof);
    }
    if proof.side_nodes.len() != num - count_set_bits(&proof.bit_mask) {
        return Err(ProofError::BadProof);
    }
    Ok(())
}

/// Verifies that `key` has `value` and `sum` in the tree with root `root`.
///
/// Passing [`DEFAULT_VALUE`] and a sum of `0` checks that `key` isn't in the
/// tree. Returns `Ok(false)` if the proof is well formed but doesn't match the
/// claim and an error if the proof is malformed.
pub fn verify_sum_proof<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone>(
    proof: &SparseMerkleSumProof,
    root: &[u8],
    key: &[u8],
    value: &[u8],
    sum: Sum,
    spec: &TreeSpec<HASH_SIZE, H>,
) -> Result<bool, ProofError> {
    verify_sum_proof_with_updates(proof, root, key, value, sum, spec).map(|(valid, _)| valid)
}

/// Same as [`verify_sum_proof`], also returns the nodes recomputed on the way
/// from the leaf to the root.
pub fn verify_sum_proof_with_updates<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone>(
    proof: &SparseMerkleSumProof,
    root: &[u8],
    key: &[u8],
    value: &[u8],
    sum: Sum,
    spec: &TreeSpec<HASH_SIZE, H>,
) -> Result<(bool, Vec<ProofUpdate>), ProofError> {
    sanity_check(proof, spec)?;
    let path = spec.path(key);
    let mut updates = Vec::with_capacity(proof.side_nodes.len() + 1);

    let mut current = if value == DEFAULT_VALUE {
        if sum != 0 {
            return Ok((false, updates));
        }
        match &proof.non_membership_leaf_data {
            None => spec.sum_placeholder(),
            Some(data) => {
                let leaf = Leaf::<HASH_SIZE, H>::parse(data).map_err(|_| ProofError::BadProof)?;
                if path.as_ref() == Some(leaf.path()) {
                    // the key is in the tree
                    return Err(ProofError::BadProof);
                }
                leaf.computed().to_bytes()
            }
        }
    } else {
        let Some(path) = &path else {
            return Ok((false, updates));
        };
        let (leaf, record) = spec.digest_sum_leaf(path, &spec.digest_value(value), sum);
        updates.push((leaf.to_bytes(), record));
        leaf.to_bytes()
    };

    let num_side_nodes = proof.side_nodes.len();
    if num_side_nodes > 0 {
        let Some(path) = &path else {
            return Ok((false, updates));
        };
        for (i, side_node) in proof.side_nodes.iter().enumerate() {
            let (node, record) = if get_path_bit(path, num_side_nodes - 1 - i) {
                spec.digest_sum_node(side_node, &current)?
            } else {
                spec.digest_sum_node(&current, side_node)?
            };
            current = node.to_bytes();
            updates.push((current.clone(), record));
        }
    }
    Ok((current == root, updates))
}

/// Decompacts `proof` and verifies it like [`verify_sum_proof`].
pub fn verify_compact_sum_proof<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone>(
    proof: &SparseCompactMerkleSumProof,
    root: &[u8],
    key: &[u8],
    value: &[u8],
    sum: Sum,
    spec: &TreeSpec<HASH_SIZE, H>,
) -> Result<bool, ProofError> {
    let proof = decompact_sum_proof(proof, spec)?;
    verify_sum_proof(&proof, root, key, value, sum, spec)
}

/// Removes the placeholders of `proof`.
pub fn compact_sum_proof<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone>(
    proof: &SparseMerkleSumProof,
    spec: &TreeSpec<HASH_SIZE, H>,
) -> Result<SparseCompactMerkleSumProof, ProofError> {
    sanity_check(proof, spec)?;
    let placeholder = spec.sum_placeholder();
    let mut bit_mask = vec![0; proof.side_nodes.len().div_ceil(8)];
    let mut side_nodes = Vec::new();
    for (i, node) in proof.side_nodes.iter().enumerate() {
        if *node == placeholder {
            set_path_bit(&mut bit_mask, i);
        } else {
            side_nodes.push(node.clone());
        }
    }
    Ok(SparseCompactMerkleSumProof {
        side_nodes,
        non_membership_leaf_data: proof.non_membership_leaf_data.clone(),
        bit_mask,
        num_side_nodes: proof.side_nodes.len(),
        sibling_data: proof.sibling_data.clone(),
    })
}

/// Puts the placeholders back into a compacted proof.
pub fn decompact_sum_proof<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone>(
    proof: &SparseCompactMerkleSumProof,
    spec: &TreeSpec<HASH_SIZE, H>,
) -> Result<SparseMerkleSumProof, ProofError> {
    sanity_check_compact::<HASH_SIZE, H>(proof)?;
    let placeholder = spec.sum_placeholder();
    let mut surviving = proof.side_nodes.iter();
    let side_nodes = (0..proof.num_side_nodes)
        .map(|i| {
            if get_path_bit(&proof.bit_mask, i) {
                Ok(placeholder.clone())
            } else {
                surviving.next().cloned().ok_or(ProofError::BadProof)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SparseMerkleSumProof {
        side_nodes,
        non_membership_leaf_data: proof.non_membership_leaf_data.clone(),
        sibling_data: proof.sibling_data.clone(),
    })
}

/// Reads the binary form of a compact proof.
struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], ProofError> {
        if self.data.len() < len {
            return Err(ProofError::BadProof);
        }
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Ok(head)
    }

    fn u16(&mut self) -> Result<u16, ProofError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32, ProofError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn optional(&mut self) -> Result<Option<Vec<u8>>, ProofError> {
        match self.take(1)?[0] {
            0 => Ok(None),
            1 => {
                let len = self.u32()? as usize;
                Ok(Some(self.take(len)?.to_vec()))
            }
            _ => Err(ProofError::BadProof),
        }
    }
}

fn write_optional(encoded: &mut Vec<u8>, data: &Option<Vec<u8>>) -> Result<(), ProofError> {
    match data {
        None => encoded.push(0),
        Some(data) => {
            let len = u32::try_from(data.len()).map_err(|_| ProofError::BadProof)?;
            encoded.push(1);
            encoded.extend_from_slice(&len.to_be_bytes());
            encoded.extend_from_slice(data);
        }
    }
    Ok(())
}

fn write_u16(encoded: &mut Vec<u8>, value: usize) -> Result<(), ProofError> {
    let value = u16::try_from(value).map_err(|_| ProofError::BadProof)?;
    encoded.extend_from_slice(&value.to_be_bytes());
    Ok(())
}

impl SparseCompactMerkleSumProof {
    /// Encodes the proof into bytes.
    ///
    /// Layout: number of side nodes (u16), number of stored side nodes (u16),
    /// the side nodes prefixed by their length (u16), the bit mask, then the
    /// leaf data and the sibling data as a presence byte followed by a
    /// length (u32) and the bytes.
    ///
    /// Returns [`ProofError::BadProof`] if a count or a length doesn't fit its
    /// field, or if the bit mask doesn't have `num_side_nodes` bits.
    pub fn encode(&self) -> Result<Vec<u8>, ProofError> {
        if self.bit_mask.len() != self.num_side_nodes.div_ceil(8) {
            return Err(ProofError::BadProof);
        }
        let mut encoded = Vec::new();
        write_u16(&mut encoded, self.num_side_nodes)?;
        write_u16(&mut encoded, self.side_nodes.len())?;
        for node in self.side_nodes.iter() {
            write_u16(&mut encoded, node.len())?;
            encoded.extend_from_slice(node);
        }
        encoded.extend_from_slice(&self.bit_mask);
        write_optional(&mut encoded, &self.non_membership_leaf_data)?;
        write_optional(&mut encoded, &self.sibling_data)?;
        Ok(encoded)
    }

    /// Decodes a proof from bytes. Truncated input or trailing bytes are a
    /// [`ProofError::BadProof`].
    pub fn decode(data: &[u8]) -> Result<Self, ProofError> {
        let mut reader = Reader { data };
        let num_side_nodes = reader.u16()? as usize;
        let stored = reader.u16()? as usize;
        if stored > num_side_nodes {
            return Err(ProofError::BadProof);
        }
        let mut side_nodes = Vec::with_capacity(stored);
        for _ in 0..stored {
            let len = reader.u16()? as usize;
            side_nodes.push(reader.take(len)?.to_vec());
        }
        let bit_mask = reader.take(num_side_nodes.div_ceil(8))?.to_vec();
        let non_membership_leaf_data = reader.optional()?;
        let sibling_data = reader.optional()?;
        if !reader.data.is_empty() {
            return Err(ProofError::BadProof);
        }
        Ok(Self {
            side_nodes,
            non_membership_leaf_data,
            bit_mask,
            num_side_nodes,
            sibling_data,
        })
    }
}
