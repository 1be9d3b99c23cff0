//! Seam to the external registry that owns the traded lead records.
//!
//! The engine only needs to know that an asset exists, who holds it, and
//! that the holder can hand it to someone else. Token minting, royalties
//! and metadata live behind this trait.

use std::collections::HashMap;

use leadbid_types::{AccountId, AssetRef, LeadbidError, Result};

/// Ownership registry for listed assets.
pub trait AssetRegistry: Send {
    /// Current holder of the asset, or `None` if it is unknown.
    fn owner_of(&self, asset: &AssetRef) -> Option<AccountId>;

    /// Hand the asset from `caller` to `new_owner`.
    ///
    /// # Errors
    /// - `AssetNotFound` if the asset is unknown
    /// - `NotCustodian` if `caller` is not the current holder
    fn reassign(&mut self, asset: &AssetRef, caller: AccountId, new_owner: AccountId) -> Result<()>;
}

/// In-memory registry, used by tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryAssetRegistry {
    owners: HashMap<AssetRef, AccountId>,
}

impl InMemoryAssetRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new asset. Returns `false` (and changes nothing) if the
    /// asset is already registered.
    pub fn register(&mut self, asset: AssetRef, owner: AccountId) -> bool {
        if self.owners.contains_key(&asset) {
            return false;
        }
        self.owners.insert(asset, owner);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

impl AssetRegistry for InMemoryAssetRegistry {
    fn owner_of(&self, asset: &AssetRef) -> Option<AccountId> {
        self.owners.get(asset).copied()
    }

    fn reassign(&mut self, asset: &AssetRef, caller: AccountId, new_owner: AccountId) -> Result<()> {
        let owner = self
            .owners
            .get_mut(asset)
            .ok_or_else(|| LeadbidError::AssetNotFound(asset.clone()))?;
        if *owner != caller {
            return Err(LeadbidError::NotCustodian {
                caller,
                asset: asset.clone(),
            });
        }
        *owner = new_owner;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_reassign() {
        let mut reg = InMemoryAssetRegistry::new();
        let asset = AssetRef::new("lead-1");
        let alice = AccountId::new();
        let bob = AccountId::new();
        assert!(reg.register(asset.clone(), alice));
        assert!(!reg.register(asset.clone(), bob));
        reg.reassign(&asset, alice, bob).unwrap();
        assert_eq!(reg.owner_of(&asset), Some(bob));
    }

    #[test]
    fn only_holder_can_reassign() {
        let mut reg = InMemoryAssetRegistry::new();
        let asset = AssetRef::new("lead-1");
        let alice = AccountId::new();
        reg.register(asset.clone(), alice);
        let err = reg
            .reassign(&asset, AccountId::new(), AccountId::new())
            .unwrap_err();
        assert!(matches!(err, LeadbidError::NotCustodian { .. }));
        assert_eq!(reg.owner_of(&asset), Some(alice));
    }

    #[test]
    fn unknown_asset() {
        let mut reg = InMemoryAssetRegistry::new();
        let asset = AssetRef::new("ghost");
        assert_eq!(reg.owner_of(&asset), None);
        let err = reg
            .reassign(&asset, AccountId::new(), AccountId::new())
            .unwrap_err();
        assert!(matches!(err, LeadbidError::AssetNotFound(_)));
    }
}
