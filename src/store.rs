use crate::error::OwnershipError;
use crate::id::Identity;
use crate::ownership::Ownership;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What kind of object lives at an identity. Fixed at deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Plain access-controlled resource
    Resource,
    /// Resource that can also relay owner-gated calls onto other resources
    Administrator,
    /// Fungible token
    Token,
}

impl ObjectKind {
    pub fn is_administrable(&self) -> bool {
        matches!(self, ObjectKind::Resource | ObjectKind::Administrator)
    }
}

/// Kind-specific persisted data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectData {
    Administrable(Ownership),
    Token { total_supply: u128 },
}

/// An object deployed on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub id: Identity,
    pub kind: ObjectKind,
    pub creator: Identity,
    pub data: ObjectData,
}

impl StoredObject {
    pub fn ownership(&self) -> Option<&Ownership> {
        match &self.data {
            ObjectData::Administrable(ownership) => Some(ownership),
            ObjectData::Token { .. } => None,
        }
    }
}

/// Committed ledger state: an arena of objects indexed by identity, plus balances.
///
/// Only [`crate::journal::Journal::commit`] and deployment write here.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: Vec<StoredObject>,
    index: HashMap<Identity, usize>,
    /// (token, holder) -> amount
    token_balances: HashMap<(Identity, Identity), u128>,
    native_balances: HashMap<Identity, u128>,
    /// Deployments made by each creator so far
    nonces: HashMap<Identity, u64>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object: StoredObject) -> Result<(), OwnershipError> {
        if object.id.is_none() {
            return Err(OwnershipError::InvalidArgument(
                "cannot store an object at the none identity".to_string(),
            ));
        }
        if self.index.contains_key(&object.id) {
            return Err(OwnershipError::InvalidArgument(format!(
                "an object already exists at {}",
                object.id
            )));
        }
        self.index.insert(object.id, self.objects.len());
        self.objects.push(object);
        Ok(())
    }

    pub fn get(&self, id: &Identity) -> Option<&StoredObject> {
        self.index.get(id).map(|&slot| &self.objects[slot])
    }

    fn get_mut(&mut self, id: &Identity) -> Option<&mut StoredObject> {
        match self.index.get(id) {
            Some(&slot) => self.objects.get_mut(slot),
            None => None,
        }
    }

    pub fn contains(&self, id: &Identity) -> bool {
        self.index.contains_key(id)
    }

    pub fn kind_of(&self, id: &Identity) -> Option<ObjectKind> {
        self.get(id).map(|object| object.kind)
    }

    pub fn ownership(&self, id: &Identity) -> Result<Ownership, OwnershipError> {
        let object = self.get(id).ok_or(OwnershipError::NotFound(*id))?;
        object
            .ownership()
            .copied()
            .ok_or_else(|| OwnershipError::UnsupportedCall {
                target: *id,
                call: "ownership".to_string(),
            })
    }

    pub fn set_ownership(&mut self, id: &Identity, ownership: Ownership) -> Result<(), OwnershipError> {
        let object = self.get_mut(id).ok_or(OwnershipError::NotFound(*id))?;
        match &mut object.data {
            ObjectData::Administrable(current) => {
                *current = ownership;
                Ok(())
            }
            ObjectData::Token { .. } => Err(OwnershipError::UnsupportedCall {
                target: *id,
                call: "ownership".to_string(),
            }),
        }
    }

    pub fn token_balance(&self, token: &Identity, holder: &Identity) -> u128 {
        self.token_balances
            .get(&(*token, *holder))
            .copied()
            .unwrap_or(0)
    }

    pub fn set_token_balance(&mut self, token: Identity, holder: Identity, amount: u128) {
        if amount == 0 {
            self.token_balances.remove(&(token, holder));
        } else {
            self.token_balances.insert((token, holder), amount);
        }
    }

    pub fn native_balance(&self, holder: &Identity) -> u128 {
        self.native_balances.get(holder).copied().unwrap_or(0)
    }

    pub fn set_native_balance(&mut self, holder: Identity, amount: u128) {
        if amount == 0 {
            self.native_balances.remove(&holder);
        } else {
            self.native_balances.insert(holder, amount);
        }
    }

    /// Return the creator's current nonce and advance it
    pub fn next_nonce(&mut self, creator: &Identity) -> u64 {
        let nonce = self.nonces.entry(*creator).or_insert(0);
        let current = *nonce;
        *nonce += 1;
        current
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: Identity, owner: Identity) -> StoredObject {
        StoredObject {
            id,
            kind: ObjectKind::Resource,
            creator: owner,
            data: ObjectData::Administrable(Ownership::new(owner).unwrap()),
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut store = ObjectStore::new();
        let owner = Identity::principal("admin");
        let id = Identity::new([7; 32]);

        store.insert(resource(id, owner)).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.kind_of(&id), Some(ObjectKind::Resource));
        assert_eq!(store.ownership(&id).unwrap().owner(), owner);
        assert!(store.kind_of(&Identity::new([8; 32])).is_none());
    }

    #[test]
    fn test_duplicate_and_none_rejected() {
        let mut store = ObjectStore::new();
        let owner = Identity::principal("admin");
        let id = Identity::new([7; 32]);

        store.insert(resource(id, owner)).unwrap();
        assert!(store.insert(resource(id, owner)).is_err());
        assert!(store.insert(resource(Identity::NONE, owner)).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_token_has_no_ownership() {
        let mut store = ObjectStore::new();
        let id = Identity::new([3; 32]);
        store
            .insert(StoredObject {
                id,
                kind: ObjectKind::Token,
                creator: Identity::principal("admin"),
                data: ObjectData::Token { total_supply: 100 },
            })
            .unwrap();

        assert!(matches!(
            store.ownership(&id),
            Err(OwnershipError::UnsupportedCall { .. })
        ));
        assert!(matches!(
            store.ownership(&Identity::new([4; 32])),
            Err(OwnershipError::NotFound(_))
        ));
    }

    #[test]
    fn test_balances_default_to_zero() {
        let mut store = ObjectStore::new();
        let token = Identity::new([1; 32]);
        let holder = Identity::principal("admin");

        assert_eq!(store.token_balance(&token, &holder), 0);
        store.set_token_balance(token, holder, 50);
        assert_eq!(store.token_balance(&token, &holder), 50);
        store.set_token_balance(token, holder, 0);
        assert_eq!(store.token_balance(&token, &holder), 0);

        store.set_native_balance(holder, 9);
        assert_eq!(store.native_balance(&holder), 9);
    }

    #[test]
    fn test_nonces_advance_per_creator() {
        let mut store = ObjectStore::new();
        let a = Identity::principal("a");
        let b = Identity::principal("b");
        assert_eq!(store.next_nonce(&a), 0);
        assert_eq!(store.next_nonce(&a), 1);
        assert_eq!(store.next_nonce(&b), 0);
    }
}
