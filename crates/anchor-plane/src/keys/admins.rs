//! Authorized administrator set
//!
//! Fixed at startup and immutable at runtime. Membership is by account
//! address; addresses compare case-insensitively because they are parsed to
//! raw bytes before comparison.

use std::collections::BTreeSet;
use tracing::info;

use anchor_core::Address;

/// The administrators allowed to approve a root
#[derive(Debug, Clone)]
pub struct AdminSet {
    admins: BTreeSet<Address>,
}

impl AdminSet {
    pub fn new(admins: impl IntoIterator<Item = Address>) -> Self {
        let admins: BTreeSet<Address> = admins.into_iter().collect();
        info!(count = admins.len(), "Admin set initialized");
        Self { admins }
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.admins.contains(address)
    }

    pub fn count(&self) -> usize {
        self.admins.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_ignores_case() {
        let admin: Address = "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23".parse().unwrap();
        let set = AdminSet::new(vec![admin]);

        let upper: Address = "0x2C7536E3605D9C16A7A3D7B1898E529396A65C23".parse().unwrap();
        assert!(set.contains(&admin));
        assert!(set.contains(&upper));
        assert!(!set.contains(&Address::from_bytes([1; 20])));
    }

    #[test]
    fn test_duplicates_collapse() {
        let a = Address::from_bytes([1; 20]);
        let set = AdminSet::new(vec![a, a, Address::from_bytes([2; 20])]);
        assert_eq!(set.count(), 2);
        assert!(set.contains(&a));
    }
}
