use std::fmt::Display;
use std::sync::Arc;

use super::{digest_branch, read_computed, ComputedNode, Hasher, Node, Sum, EXTENSION_TAG};
use crate::path::{clear_outside, first_diff_bit, get_path_bit};

/// An extension stands for a run of branches at depths `[start, end)` that all
/// have a placeholder on one side. It only keeps the bits of `path` inside the
/// run, every other bit is cleared.
///
/// The hash of an extension is the hash of the topmost branch of the run, so
/// proofs walking through it only ever see plain branches with placeholder
/// siblings.
#[derive(Clone)]
pub struct Extension<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> {
    path: [u8; HASH_SIZE],
    start: usize,
    end: usize,
    child: Arc<Node<HASH_SIZE, H>>,
    computed: ComputedNode<HASH_SIZE>,
    persisted: bool,
}

impl<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> Extension<HASH_SIZE, H> {
    /// Creates a new [`Extension`] covering the bits `[start, end)` of `path`.
    /// This function performs `end - start` hashes.
    pub fn new(
        mut path: [u8; HASH_SIZE],
        start: usize,
        end: usize,
        child: Arc<Node<HASH_SIZE, H>>,
    ) -> Self {
        debug_assert!(start < end && end <= HASH_SIZE * 8);
        clear_outside(&mut path, start, end);
        let computed = Self::fold(&path, start, end, child.computed());
        Self {
            path,
            start,
            end,
            child,
            computed,
            persisted: false,
        }
    }

    fn fold(
        path: &[u8; HASH_SIZE],
        start: usize,
        end: usize,
        child: ComputedNode<HASH_SIZE>,
    ) -> ComputedNode<HASH_SIZE> {
        let placeholder = ComputedNode::placeholder();
        (start..end).rev().fold(child, |current, depth| {
            let (node, _) = if get_path_bit(path, depth) {
                digest_branch::<HASH_SIZE, H>(&placeholder, &current, current.sum())
            } else {
                digest_branch::<HASH_SIZE, H>(&current, &placeholder, current.sum())
            };
            node
        })
    }

    /// Returns the hash of the node. NO HASHING IS DONE HERE.
    pub fn hash(&self) -> [u8; HASH_SIZE] {
        self.computed.hash()
    }

    pub fn sum(&self) -> Sum {
        self.computed.sum()
    }

    pub fn computed(&self) -> ComputedNode<HASH_SIZE> {
        self.computed
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Returns `(start, end)`.
    pub fn bounds(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn path(&self) -> &[u8; HASH_SIZE] {
        &self.path
    }

    pub fn child(&self) -> &Arc<Node<HASH_SIZE, H>> {
        &self.child
    }

    /// Returns the first depth of the run where `path` leaves the extension,
    /// or `None` if it follows the whole run.
    pub fn divergence(&self, path: &[u8]) -> Option<usize> {
        let depth = first_diff_bit(&self.path, path, self.start);
        (depth < self.end).then_some(depth)
    }

    /// Whether `path` follows the whole run.
    pub fn matches(&self, path: &[u8]) -> bool {
        self.divergence(path).is_none()
    }

    /// The node hanging right below the run at `depth`. It is the child itself
    /// at the last depth and a shorter extension otherwise.
    pub fn below(&self, depth: usize) -> Arc<Node<HASH_SIZE, H>> {
        if depth + 1 == self.end {
            self.child.clone()
        } else {
            Arc::new(Node::Extension(Self::new(
                self.path,
                depth + 1,
                self.end,
                self.child.clone(),
            )))
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut record =
            Vec::with_capacity(5 + HASH_SIZE + ComputedNode::<HASH_SIZE>::ENCODED_SIZE);
        record.push(EXTENSION_TAG);
        record.extend_from_slice(&(self.start as u16).to_be_bytes());
        record.extend_from_slice(&(self.end as u16).to_be_bytes());
        record.extend_from_slice(&self.path);
        record.extend_from_slice(&self.child.computed().to_bytes());
        record
    }

    pub(crate) fn parse(record: &[u8]) -> Result<Self, &'static str> {
        if record.len() != 5 + HASH_SIZE + ComputedNode::<HASH_SIZE>::ENCODED_SIZE
            || record[0] != EXTENSION_TAG
        {
            return Err("invalid extension record");
        }
        let start = u16::from_be_bytes([record[1], record[2]]) as usize;
        let end = u16::from_be_bytes([record[3], record[4]]) as usize;
        if start >= end || end > HASH_SIZE * 8 {
            return Err("invalid extension bounds");
        }
        let path: [u8; HASH_SIZE] = record[5..5 + HASH_SIZE]
            .try_into()
            .map_err(|_| "invalid extension path")?;
        let mut masked = path;
        clear_outside(&mut masked, start, end);
        if masked != path {
            return Err("extension path has bits outside of its bounds");
        }
        let child = read_computed::<HASH_SIZE>(record, 5 + HASH_SIZE)
            .ok_or("invalid extension child")?;
        if child.is_placeholder() {
            return Err("extension over an empty subtree");
        }
        let mut extension = Self::new(path, start, end, Node::from_encoding(child));
        extension.persisted = true;
        Ok(extension)
    }
}

impl<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> Display for Extension<HASH_SIZE, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Extension {{ start: {}, end: {}, sum: {}, hash: {} }}",
            self.start,
            self.end,
            self.sum(),
            hex::encode(self.hash().as_slice())
        )
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::Extension;
    use crate::node::{Branch, Leaf, Node};
    use sha2::Sha256;

    fn branch() -> Arc<Node<32, Sha256>> {
        let left = Arc::new(Node::Leaf(Leaf::new([0; 32], vec![1], 4)));
        let right = Arc::new(Node::Leaf(Leaf::new([1; 32], vec![2], 5)));
        Arc::new(Node::Branch(Branch::new(left, right).unwrap()))
    }

    #[test]
    fn test_extension_hashes_like_a_branch_chain() {
        let child = branch();
        let mut path = [0u8; 32];
        path[0] = 0b0100_0000;
        let extension = Extension::new(path, 0, 3, child.clone());

        // bit 2 is 0, bit 1 is 1, bit 0 is 0
        let placeholder = Arc::new(Node::<32, Sha256>::Placeholder);
        let depth2 = Arc::new(Node::Branch(
            Branch::new(child.clone(), placeholder.clone()).unwrap(),
        ));
        let depth1 = Arc::new(Node::Branch(
            Branch::new(placeholder.clone(), depth2).unwrap(),
        ));
        let depth0 = Branch::new(depth1, placeholder).unwrap();

        assert_eq!(extension.computed(), depth0.computed());
        assert_eq!(extension.sum(), 9);
    }

    #[test]
    fn test_extension_masks_its_path() {
        let extension = Extension::new([0xff; 32], 4, 12, branch());
        assert_eq!(extension.path()[0], 0x0f);
        assert_eq!(extension.path()[1], 0xf0);
        assert!(extension.path()[2..].iter().all(|byte| *byte == 0));
        assert_eq!(extension.bounds(), (4, 12));
        assert_eq!(extension.len(), 8);
    }

    #[test]
    fn test_extension_divergence() {
        let extension = Extension::new([0xff; 32], 4, 12, branch());
        assert!(extension.matches(&[0xff; 32]));
        let mut path = [0xff; 32];
        path[1] = 0b1011_1111;
        assert_eq!(extension.divergence(&path), Some(9));
        path[1] = 0xff;
        path[0] = 0b1110_1111;
        assert_eq!(extension.divergence(&path), None);
    }

    #[test]
    fn test_extension_below() {
        let child = branch();
        let extension = Extension::new([0xff; 32], 4, 12, child.clone());
        assert_eq!(extension.below(11).computed(), child.computed());
        let rest = extension.below(6);
        match &*rest {
            Node::Extension(rest) => assert_eq!(rest.bounds(), (7, 12)),
            _ => panic!("expected an extension"),
        }
    }

    #[test]
    fn test_extension_parse() {
        let extension = Extension::new([0xaa; 32], 3, 200, branch());
        let parsed = Extension::<32, Sha256>::parse(&extension.serialize()).unwrap();
        assert_eq!(parsed.computed(), extension.computed());
        assert_eq!(parsed.bounds(), (3, 200));
        assert!(parsed.is_persisted());
        assert!(matches!(**parsed.child(), Node::Stored(_)));
    }

    #[test]
    fn test_extension_parse_rejects_bad_bounds() {
        let mut record = Extension::new([0xaa; 32], 3, 200, branch()).serialize();
        record[3..5].copy_from_slice(&300u16.to_be_bytes());
        assert!(Extension::<32, Sha256>::parse(&record).is_err());

        let mut record = Extension::new([0xaa; 32], 3, 200, branch()).serialize();
        record[5] = 0xff;
        assert!(Extension::<32, Sha256>::parse(&record).is_err());
    }
}
