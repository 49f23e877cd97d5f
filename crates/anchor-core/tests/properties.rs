//! Property-Based Tests for Merkle Registry Invariants
//!
//! These tests verify that the registry invariants hold for arbitrary issuer sets:
//! 1. SOUNDNESS: every member's proof folds back to the root
//! 2. TAMPER-SENSITIVITY: flipping any byte of a proof or leaf breaks verification
//! 3. DETERMINISM: the root ignores insertion order and tracks every canonical field
//!
//! Uses proptest for property-based testing with arbitrary inputs.

use proptest::prelude::*;
use anchor_core::{
    leaf_hash, merkle, Address, Hash32, Issuer, MerkleTree,
};

// =============================================================================
// Strategies
// =============================================================================

/// Issuer sets with unique addresses
fn arb_issuers(max: usize) -> impl Strategy<Value = Vec<Issuer>> {
    prop::collection::btree_map(
        prop::array::uniform20(any::<u8>()),
        ("[A-Za-z ]{1,24}", "[0-9a-f]{0,64}"),
        1..max,
    )
    .prop_map(|entries| {
        entries
            .into_iter()
            .map(|(addr, (name, entropy))| Issuer::new(Address::from_bytes(addr), name, entropy))
            .collect()
    })
}

fn flip(hash: &Hash32, byte: usize, mask: u8) -> Hash32 {
    let mut bytes = hash.to_bytes();
    bytes[byte % 32] ^= mask;
    Hash32::from_bytes(bytes)
}

// =============================================================================
// INVARIANT 1: SOUNDNESS
// =============================================================================

proptest! {
    /// Every issuer in the set has a proof that verifies against the root
    #[test]
    fn prop_every_member_proves(issuers in arb_issuers(40)) {
        let tree = MerkleTree::from_issuers(&issuers).unwrap();
        let root = tree.root();

        for issuer in &issuers {
            let index = tree.index_of(&issuer.address).unwrap();
            let proof = tree.proof(index).unwrap();

            prop_assert_eq!(proof.leaf, leaf_hash(issuer));
            prop_assert!(
                merkle::verify(&proof.steps, &leaf_hash(issuer), &root),
                "proof for {} must verify",
                issuer.address
            );
        }
    }

    /// Proof length is the tree depth for every leaf
    #[test]
    fn prop_proof_length_is_depth(issuers in arb_issuers(40)) {
        let tree = MerkleTree::from_issuers(&issuers).unwrap();
        let expected = (issuers.len() as f64).log2().ceil() as usize;

        for i in 0..issuers.len() {
            prop_assert_eq!(tree.proof(i).unwrap().steps.len(), expected);
        }
    }
}

// =============================================================================
// INVARIANT 2: TAMPER-SENSITIVITY
// =============================================================================

proptest! {
    /// Flipping any bit of any sibling hash breaks verification
    #[test]
    fn prop_tampered_sibling_fails(
        issuers in arb_issuers(20),
        pick in any::<prop::sample::Index>(),
        step_pick in any::<prop::sample::Index>(),
        byte in 0usize..32,
        mask in 1u8..=255,
    ) {
        prop_assume!(issuers.len() >= 2);

        let tree = MerkleTree::from_issuers(&issuers).unwrap();
        let mut proof = tree.proof(pick.index(issuers.len())).unwrap();

        let step = step_pick.index(proof.steps.len());
        proof.steps[step].sibling = flip(&proof.steps[step].sibling, byte, mask);

        prop_assert!(!proof.verify(&tree.root()), "tampered sibling must not verify");
    }

    /// Flipping any bit of the leaf breaks verification
    #[test]
    fn prop_tampered_leaf_fails(
        issuers in arb_issuers(20),
        pick in any::<prop::sample::Index>(),
        byte in 0usize..32,
        mask in 1u8..=255,
    ) {
        let tree = MerkleTree::from_issuers(&issuers).unwrap();
        let mut proof = tree.proof(pick.index(issuers.len())).unwrap();
        proof.leaf = flip(&proof.leaf, byte, mask);

        prop_assert!(!proof.verify(&tree.root()), "tampered leaf must not verify");
    }

    /// Flipping a side bit breaks verification unless both children were equal
    #[test]
    fn prop_flipped_side_bit_fails(
        issuers in arb_issuers(20),
        pick in any::<prop::sample::Index>(),
        step_pick in any::<prop::sample::Index>(),
    ) {
        prop_assume!(issuers.len() >= 2);

        let tree = MerkleTree::from_issuers(&issuers).unwrap();
        let mut proof = tree.proof(pick.index(issuers.len())).unwrap();
        let step = step_pick.index(proof.steps.len());

        // The duplicated tail of an odd level hashes identically either way
        let before = proof.clone();
        proof.steps[step].sibling_is_left = !proof.steps[step].sibling_is_left;
        let mut folded = before.leaf;
        for s in &before.steps[..step] {
            folded = if s.sibling_is_left {
                merkle::node_hash(&s.sibling, &folded)
            } else {
                merkle::node_hash(&folded, &s.sibling)
            };
        }
        prop_assume!(folded != before.steps[step].sibling);

        prop_assert!(!proof.verify(&tree.root()));
    }
}

// =============================================================================
// INVARIANT 3: DETERMINISM
// =============================================================================

proptest! {
    /// Root does not depend on insertion order
    #[test]
    fn prop_root_ignores_order(issuers in arb_issuers(30), seed in any::<u64>()) {
        let mut shuffled = issuers.clone();
        // Deterministic rotation + reversal driven by the seed
        let len = shuffled.len();
        shuffled.rotate_left((seed as usize) % len);
        if seed % 2 == 0 {
            shuffled.reverse();
        }

        let a = MerkleTree::from_issuers(&issuers).unwrap().root();
        let b = MerkleTree::from_issuers(&shuffled).unwrap().root();
        prop_assert_eq!(a, b);
    }

    /// Changing a name changes the root
    #[test]
    fn prop_root_tracks_name(issuers in arb_issuers(30), pick in any::<prop::sample::Index>()) {
        let before = MerkleTree::from_issuers(&issuers).unwrap().root();

        let mut changed = issuers.clone();
        let i = pick.index(changed.len());
        changed[i].name.push('!');

        let after = MerkleTree::from_issuers(&changed).unwrap().root();
        prop_assert_ne!(before, after);
    }

    /// Changing entropy changes the root
    #[test]
    fn prop_root_tracks_entropy(issuers in arb_issuers(30), pick in any::<prop::sample::Index>()) {
        let before = MerkleTree::from_issuers(&issuers).unwrap().root();

        let mut changed = issuers.clone();
        let i = pick.index(changed.len());
        changed[i].entropy.push('0');

        let after = MerkleTree::from_issuers(&changed).unwrap().root();
        prop_assert_ne!(before, after);
    }

    /// Adding an issuer changes the root
    #[test]
    fn prop_root_tracks_membership(issuers in arb_issuers(30)) {
        let before = MerkleTree::from_issuers(&issuers).unwrap().root();

        let mut extended = issuers.clone();
        let fresh = (0u8..=255)
            .map(|b| Address::from_bytes([b; 20]))
            .find(|a| issuers.iter().all(|i| i.address != *a))
            .unwrap();
        extended.push(Issuer::new(fresh, "Newcomer", "00"));

        let after = MerkleTree::from_issuers(&extended).unwrap().root();
        prop_assert_ne!(before, after);
    }
}
