//! Keccak-based Merkle tree over registered issuers
//!
//! Canonical rules, shared by root computation, proof construction and
//! verification:
//!
//! - leaf = `keccak(0x00 || address || u32_be(len name) || name || u32_be(len entropy) || entropy)`
//! - node = `keccak(0x01 || left || right)`
//! - leaves are ordered by address bytes
//! - an odd level duplicates its last node
//! - the empty tree has the all-zero root
//!
//! The 0x00/0x01 prefixes keep a leaf from ever being reinterpreted as an
//! internal node.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::error::{AnchorError, Result};
use crate::types::{Address, Hash32, Issuer, RootHash};

/// Domain tag for leaf preimages
pub const LEAF_PREFIX: u8 = 0x00;

/// Domain tag for internal-node preimages
pub const NODE_PREFIX: u8 = 0x01;

fn finish(hasher: Keccak256) -> Hash32 {
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    Hash32::from_bytes(out)
}

fn update_prefixed(hasher: &mut Keccak256, field: &str) {
    hasher.update((field.len() as u32).to_be_bytes());
    hasher.update(field.as_bytes());
}

/// Leaf hash for one issuer
pub fn leaf_hash(issuer: &Issuer) -> Hash32 {
    let mut hasher = Keccak256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(issuer.address.as_bytes());
    update_prefixed(&mut hasher, &issuer.name);
    update_prefixed(&mut hasher, &issuer.entropy);
    finish(hasher)
}

/// Internal node hash
pub fn node_hash(left: &Hash32, right: &Hash32) -> Hash32 {
    let mut hasher = Keccak256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    finish(hasher)
}

/// One step of an inclusion proof
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    /// Sibling hash at this level
    pub sibling: Hash32,

    /// `true` when the sibling is concatenated on the left
    pub sibling_is_left: bool,
}

/// Inclusion proof for a single leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    /// Hash of the proven leaf
    pub leaf: Hash32,

    /// Steps from the leaf level up to (excluding) the root
    pub steps: Vec<ProofStep>,
}

impl InclusionProof {
    /// Sibling hashes, bottom-up
    pub fn siblings(&self) -> Vec<Hash32> {
        self.steps.iter().map(|s| s.sibling).collect()
    }

    /// Side bits, bottom-up (`true` = sibling on the left)
    pub fn side_bits(&self) -> Vec<bool> {
        self.steps.iter().map(|s| s.sibling_is_left).collect()
    }

    /// Fold the proof into the root it implies
    pub fn compute_root(&self) -> Hash32 {
        fold_steps(self.leaf, &self.steps)
    }

    /// Check the proof against an expected root
    pub fn verify(&self, root: &RootHash) -> bool {
        verify(&self.steps, &self.leaf, root)
    }
}

fn fold_steps(leaf: Hash32, steps: &[ProofStep]) -> Hash32 {
    steps.iter().fold(leaf, |current, step| {
        if step.sibling_is_left {
            node_hash(&step.sibling, &current)
        } else {
            node_hash(&current, &step.sibling)
        }
    })
}

/// Verify that `leaf` is included under `root` via `steps`
pub fn verify(steps: &[ProofStep], leaf: &Hash32, root: &RootHash) -> bool {
    fold_steps(*leaf, steps) == *root
}

/// Merkle tree over a snapshot of the issuer set
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// Addresses in leaf order
    addresses: Vec<Address>,

    /// Levels bottom-up; level 0 holds the leaf hashes
    levels: Vec<Vec<Hash32>>,
}

impl MerkleTree {
    /// Build a tree from an issuer snapshot
    ///
    /// Input order does not matter. Two issuers with the same address are
    /// an error: the snapshot is inconsistent.
    pub fn from_issuers(issuers: &[Issuer]) -> Result<Self> {
        let mut sorted: Vec<&Issuer> = issuers.iter().collect();
        sorted.sort_by(|a, b| a.address.cmp(&b.address));

        if let Some(pair) = sorted.windows(2).find(|w| w[0].address == w[1].address) {
            return Err(AnchorError::MerkleError(format!(
                "duplicate issuer address {}",
                pair[0].address
            )));
        }

        let addresses = sorted.iter().map(|i| i.address).collect();
        let leaves = sorted.iter().map(|i| leaf_hash(i)).collect();

        Ok(Self {
            addresses,
            levels: build_levels(leaves),
        })
    }

    /// Current root; all zeros for an empty tree
    pub fn root(&self) -> RootHash {
        self.levels
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or(Hash32::ZERO)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Leaf hashes in tree order
    pub fn leaves(&self) -> &[Hash32] {
        self.levels.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Leaf index of an address, if present
    pub fn index_of(&self, address: &Address) -> Option<usize> {
        self.addresses.binary_search(address).ok()
    }

    /// Inclusion proof for the leaf at `index`
    pub fn proof(&self, index: usize) -> Result<InclusionProof> {
        let leaves = self.leaves();
        let leaf = *leaves.get(index).ok_or(AnchorError::LeafOutOfBounds {
            index,
            len: leaves.len(),
        })?;

        let mut steps = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_idx = idx ^ 1;
            // Odd tail: the node was paired with itself
            let sibling = level.get(sibling_idx).copied().unwrap_or(level[idx]);
            steps.push(ProofStep {
                sibling,
                sibling_is_left: idx % 2 == 1,
            });
            idx /= 2;
        }

        Ok(InclusionProof { leaf, steps })
    }
}

fn build_levels(leaves: Vec<Hash32>) -> Vec<Vec<Hash32>> {
    if leaves.is_empty() {
        return Vec::new();
    }

    let mut levels = vec![leaves];
    while levels[levels.len() - 1].len() > 1 {
        let current = &levels[levels.len() - 1];
        let next = current
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => node_hash(left, right),
                [only] => node_hash(only, only),
                _ => unreachable!("chunks(2) yields one or two nodes"),
            })
            .collect();
        levels.push(next);
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(byte: u8, name: &str) -> Issuer {
        Issuer::new(Address::from_bytes([byte; 20]), name, format!("entropy-{}", byte))
    }

    #[test]
    fn test_empty_tree_has_zero_root() {
        let tree = MerkleTree::from_issuers(&[]).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.root(), Hash32::ZERO);
        assert!(tree.proof(0).is_err());
    }

    #[test]
    fn test_single_leaf_root_is_leaf() {
        let a = issuer(1, "Alpha University");
        let tree = MerkleTree::from_issuers(&[a.clone()]).unwrap();

        assert_eq!(tree.root(), leaf_hash(&a));
        let proof = tree.proof(0).unwrap();
        assert!(proof.steps.is_empty());
        assert!(proof.verify(&tree.root()));
    }

    #[test]
    fn test_two_leaves() {
        let a = issuer(1, "A");
        let b = issuer(2, "B");
        let tree = MerkleTree::from_issuers(&[b.clone(), a.clone()]).unwrap();

        assert_eq!(tree.root(), node_hash(&leaf_hash(&a), &leaf_hash(&b)));

        let proof_b = tree.proof(1).unwrap();
        assert_eq!(proof_b.steps.len(), 1);
        assert!(proof_b.steps[0].sibling_is_left);
        assert_eq!(proof_b.steps[0].sibling, leaf_hash(&a));
        assert!(proof_b.verify(&tree.root()));
    }

    #[test]
    fn test_odd_level_duplicates_last() {
        let (a, b, c) = (issuer(1, "A"), issuer(2, "B"), issuer(3, "C"));
        let tree = MerkleTree::from_issuers(&[a.clone(), b.clone(), c.clone()]).unwrap();

        let (la, lb, lc) = (leaf_hash(&a), leaf_hash(&b), leaf_hash(&c));
        let expected = node_hash(&node_hash(&la, &lb), &node_hash(&lc, &lc));
        assert_eq!(tree.root(), expected);

        let proof_c = tree.proof(2).unwrap();
        assert_eq!(proof_c.steps[0].sibling, lc);
        assert!(!proof_c.steps[0].sibling_is_left);
        assert!(proof_c.verify(&expected));
    }

    #[test]
    fn test_every_leaf_proves() {
        let issuers: Vec<Issuer> = (1..=7).map(|i| issuer(i, "X")).collect();
        let tree = MerkleTree::from_issuers(&issuers).unwrap();
        let root = tree.root();

        for i in 0..issuers.len() {
            assert!(tree.proof(i).unwrap().verify(&root), "leaf {} failed", i);
        }
    }

    #[test]
    fn test_duplicate_address_rejected() {
        let a = issuer(1, "A");
        let mut a2 = issuer(1, "A-renamed");
        a2.entropy = "other".into();

        let result = MerkleTree::from_issuers(&[a, a2]);
        assert!(matches!(result, Err(AnchorError::MerkleError(_))));
    }

    #[test]
    fn test_leaf_fields_are_length_delimited() {
        let addr = Address::from_bytes([9; 20]);
        let one = Issuer::new(addr, "ab", "c");
        let two = Issuer::new(addr, "a", "bc");
        assert_ne!(leaf_hash(&one), leaf_hash(&two));
    }

    #[test]
    fn test_leaf_is_not_a_node() {
        let a = issuer(1, "A");
        let b = issuer(2, "B");
        let node = node_hash(&leaf_hash(&a), &leaf_hash(&b));

        // A two-leaf root cannot be passed off as a leaf with an empty proof
        assert!(!verify(&[], &leaf_hash(&a), &node));
    }

    #[test]
    fn test_index_of() {
        let issuers = vec![issuer(5, "E"), issuer(1, "A"), issuer(3, "C")];
        let tree = MerkleTree::from_issuers(&issuers).unwrap();

        assert_eq!(tree.index_of(&Address::from_bytes([1; 20])), Some(0));
        assert_eq!(tree.index_of(&Address::from_bytes([5; 20])), Some(2));
        assert_eq!(tree.index_of(&Address::from_bytes([4; 20])), None);
    }
}
