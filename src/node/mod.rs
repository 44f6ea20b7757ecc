mod branch;
mod computed;
mod extension;
mod leaf;

use sha2::{Digest, Sha256};
use std::fmt::Debug;
use std::fmt::Display;
use std::sync::Arc;

pub use branch::Branch;
pub use computed::ComputedNode;
pub use extension::Extension;
pub use leaf::Leaf;

impl Hasher<32> for Sha256 {
    fn hash(data: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hasher.finalize().into()
    }
}

pub type Sum = u64;

/// Size in bytes of an encoded sum.
pub const SUM_SIZE: usize = std::mem::size_of::<Sum>();

/// Record prefix of a leaf.
pub const LEAF_TAG: u8 = 0;
/// Record prefix of a branch.
pub const BRANCH_TAG: u8 = 1;
/// Record prefix of an extension.
pub const EXTENSION_TAG: u8 = 2;

/// Value digest reported for absent keys and used to claim non-membership.
pub const DEFAULT_VALUE: &[u8] = &[];

/// Simple hash trait required to hash the nodes in the tree
///
/// # Type Parameters
/// * `HASH_SIZE` - The size of the hash digest in bytes
pub trait Hasher<const HASH_SIZE: usize> {
    fn hash(data: &[u8]) -> [u8; HASH_SIZE];
}

/// All possible nodes in the tree.
///
/// # Type Parameters
/// * `HASH_SIZE` - The size of the hash digest in bytes
/// * `H` - The hasher implementation used for this node
#[derive(Clone)]
pub enum Node<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> {
    /// An empty subtree
    Placeholder,
    /// A node only known by its encoding, its record is still in the database
    Stored(ComputedNode<HASH_SIZE>),
    /// A leaf node containing a path, a value digest and a sum
    Leaf(Leaf<HASH_SIZE, H>),
    /// A branch node with two children
    Branch(Branch<HASH_SIZE, H>),
    /// A run of single child branches
    Extension(Extension<HASH_SIZE, H>),
}

impl<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> Debug for Node<HASH_SIZE, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placeholder => write!(f, "Placeholder"),
            Self::Stored(computed) => write!(
                f,
                "Stored {{ sum: {}, hash: {:?} }}",
                computed.sum(),
                computed.hash()
            ),
            Self::Leaf(leaf) => write!(
                f,
                "Leaf {{ sum: {}, hash: {:?}, value: {:?} }}",
                leaf.sum(),
                leaf.hash(),
                leaf.value_hash()
            ),
            Self::Branch(branch) => write!(
                f,
                "Branch {{ sum: {}, hash: {:?} }}",
                branch.sum(),
                branch.hash()
            ),
            Self::Extension(extension) => write!(
                f,
                "Extension {{ bounds: {:?}, sum: {}, hash: {:?} }}",
                extension.bounds(),
                extension.sum(),
                extension.hash()
            ),
        }
    }
}

impl<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> Display for Node<HASH_SIZE, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placeholder => write!(f, "{}", ComputedNode::<HASH_SIZE>::placeholder()),
            Self::Stored(computed) => write!(f, "{}", computed),
            Self::Leaf(leaf) => write!(f, "{}", leaf),
            Self::Branch(branch) => write!(f, "{}", branch),
            Self::Extension(extension) => write!(f, "{}", extension),
        }
    }
}

impl<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> Node<HASH_SIZE, H> {
    /// Wraps a child encoding found in a record. Placeholders are recognized,
    /// anything else stays unresolved until it is needed.
    pub fn from_encoding(computed: ComputedNode<HASH_SIZE>) -> Arc<Self> {
        if computed.is_placeholder() {
            Arc::new(Self::Placeholder)
        } else {
            Arc::new(Self::Stored(computed))
        }
    }

    /// Returns the `hash ‖ sum` pair of the node. NO HASHING IS DONE HERE.
    pub fn computed(&self) -> ComputedNode<HASH_SIZE> {
        match self {
            Self::Placeholder => ComputedNode::placeholder(),
            Self::Stored(computed) => *computed,
            Self::Leaf(leaf) => leaf.computed(),
            Self::Branch(branch) => branch.computed(),
            Self::Extension(extension) => extension.computed(),
        }
    }

    /// Returns the hash of the node.
    pub fn hash(&self) -> [u8; HASH_SIZE] {
        self.computed().hash()
    }

    /// Returns the sum of the node.
    pub fn sum(&self) -> Sum {
        self.computed().sum()
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }

    /// Whether the record of this node is already in the database.
    pub fn is_persisted(&self) -> bool {
        match self {
            Self::Placeholder => false,
            Self::Stored(_) => true,
            Self::Leaf(leaf) => leaf.is_persisted(),
            Self::Branch(branch) => branch.is_persisted(),
            Self::Extension(extension) => extension.is_persisted(),
        }
    }

    /// Returns the database record of the node. Placeholders and stored
    /// references have no record to write.
    pub fn serialize(&self) -> Option<Vec<u8>> {
        match self {
            Self::Placeholder | Self::Stored(_) => None,
            Self::Leaf(leaf) => Some(leaf.serialize()),
            Self::Branch(branch) => Some(branch.serialize()),
            Self::Extension(extension) => Some(extension.serialize()),
        }
    }

    /// Parses a database record. The parsed node is marked as persisted and
    /// its children are left unresolved.
    pub fn parse(record: &[u8]) -> Result<Self, &'static str> {
        match record.first() {
            Some(&LEAF_TAG) => Leaf::parse(record).map(Self::Leaf),
            Some(&BRANCH_TAG) => Branch::parse(record).map(Self::Branch),
            Some(&EXTENSION_TAG) => Extension::parse(record).map(Self::Extension),
            Some(_) => Err("unknown node tag"),
            None => Err("empty record"),
        }
    }
}

/// Builds a leaf record: `LEAF_TAG ‖ path ‖ value_hash ‖ sum`.
pub(crate) fn encode_leaf(path: &[u8], value_hash: &[u8], sum: Sum) -> Vec<u8> {
    let mut record = Vec::with_capacity(1 + path.len() + value_hash.len() + SUM_SIZE);
    record.push(LEAF_TAG);
    record.extend_from_slice(path);
    record.extend_from_slice(value_hash);
    record.extend_from_slice(&sum.to_be_bytes());
    record
}

/// Builds a branch record: `BRANCH_TAG ‖ left ‖ right`.
pub(crate) fn encode_branch<const HASH_SIZE: usize>(
    left: &ComputedNode<HASH_SIZE>,
    right: &ComputedNode<HASH_SIZE>,
) -> Vec<u8> {
    let mut record = Vec::with_capacity(1 + 2 * ComputedNode::<HASH_SIZE>::ENCODED_SIZE);
    record.push(BRANCH_TAG);
    record.extend_from_slice(&left.to_bytes());
    record.extend_from_slice(&right.to_bytes());
    record
}

/// Hashes a branch record. The sum is supplied by the caller, which decides
/// how to handle overflows.
pub(crate) fn digest_branch<const HASH_SIZE: usize, H: Hasher<HASH_SIZE>>(
    left: &ComputedNode<HASH_SIZE>,
    right: &ComputedNode<HASH_SIZE>,
    sum: Sum,
) -> (ComputedNode<HASH_SIZE>, Vec<u8>) {
    let record = encode_branch(left, right);
    (ComputedNode::new(H::hash(&record), sum), record)
}

/// Reads the `hash ‖ sum` pair at `offset` of a record.
pub(crate) fn read_computed<const HASH_SIZE: usize>(
    record: &[u8],
    offset: usize,
) -> Option<ComputedNode<HASH_SIZE>> {
    record
        .get(offset..offset + ComputedNode::<HASH_SIZE>::ENCODED_SIZE)
        .and_then(ComputedNode::from_bytes)
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::{Branch, ComputedNode, Extension, Leaf, Node};
    use hex_literal::hex;
    use sha2::Sha256;

    #[test]
    fn test_placeholder_node() {
        let node = Node::<32, Sha256>::Placeholder;
        assert_eq!(node.hash(), [0; 32]);
        assert_eq!(node.sum(), 0);
        assert!(!node.is_persisted());
        assert!(node.serialize().is_none());
    }

    #[test]
    fn test_from_encoding() {
        assert!(Node::<32, Sha256>::from_encoding(ComputedNode::placeholder()).is_placeholder());
        let computed = ComputedNode::new(
            hex!("0101010101010101010101010101010101010101010101010101010101010101"),
            3,
        );
        let node = Node::<32, Sha256>::from_encoding(computed);
        assert!(matches!(*node, Node::Stored(stored) if stored == computed));
        assert!(node.is_persisted());
    }

    #[test]
    fn test_parse_serialized_nodes() {
        let leaf = Leaf::<32, Sha256>::new([1; 32], vec![1, 2, 3], 1);
        let other = Leaf::<32, Sha256>::new([2; 32], vec![4, 5, 6], 2);
        let branch = Branch::new(
            Arc::new(Node::Leaf(leaf.clone())),
            Arc::new(Node::Leaf(other)),
        )
        .unwrap();
        let extension = Extension::new([0; 32], 0, 6, Arc::new(Node::Branch(branch.clone())));
        for node in [
            Node::Leaf(leaf),
            Node::Branch(branch),
            Node::Extension(extension),
        ] {
            let parsed = Node::<32, Sha256>::parse(&node.serialize().unwrap()).unwrap();
            assert_eq!(parsed.computed(), node.computed());
            assert!(parsed.is_persisted());
            assert_eq!(parsed.serialize(), node.serialize());
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Node::<32, Sha256>::parse(&[]).is_err());
        assert!(Node::<32, Sha256>::parse(&[7, 1, 2]).is_err());
        assert!(Node::<32, Sha256>::parse(&[0; 10]).is_err());
        assert!(Node::<32, Sha256>::parse(&[1; 10]).is_err());
        assert!(Node::<32, Sha256>::parse(&[2; 10]).is_err());
    }

    #[test]
    fn test_node_display() {
        let leaf = Node::<32, Sha256>::Leaf(Leaf::new([0; 32], vec![1, 2, 3], 1));
        assert!(format!("{}", leaf).starts_with("Leaf { sum: 1, hash: "));
        assert_eq!(
            format!("{}", Node::<32, Sha256>::Placeholder),
            "Computed { sum: 0, hash: 0000000000000000000000000000000000000000000000000000000000000000 }"
        );
    }
}
