use crate::error::OwnershipError;
use crate::events::EventRecord;
use crate::id::Identity;
use crate::ownership::Ownership;
use crate::store::ObjectStore;
use std::collections::HashMap;

/// Buffered effects of one top-level invocation.
///
/// Reads fall through to the committed [`ObjectStore`]; writes stay here until
/// [`Journal::commit`]. Dropping a journal discards everything it holds.
#[derive(Debug, Default)]
pub struct Journal {
    ownership: HashMap<Identity, Ownership>,
    token_balances: HashMap<(Identity, Identity), u128>,
    native_balances: HashMap<Identity, u128>,
    events: Vec<EventRecord>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ownership(&self, store: &ObjectStore, id: &Identity) -> Result<Ownership, OwnershipError> {
        match self.ownership.get(id) {
            Some(ownership) => Ok(*ownership),
            None => store.ownership(id),
        }
    }

    pub fn set_ownership(&mut self, id: Identity, ownership: Ownership) {
        self.ownership.insert(id, ownership);
    }

    pub fn token_balance(&self, store: &ObjectStore, token: &Identity, holder: &Identity) -> u128 {
        match self.token_balances.get(&(*token, *holder)) {
            Some(amount) => *amount,
            None => store.token_balance(token, holder),
        }
    }

    pub fn set_token_balance(&mut self, token: Identity, holder: Identity, amount: u128) {
        self.token_balances.insert((token, holder), amount);
    }

    pub fn native_balance(&self, store: &ObjectStore, holder: &Identity) -> u128 {
        match self.native_balances.get(holder) {
            Some(amount) => *amount,
            None => store.native_balance(holder),
        }
    }

    pub fn set_native_balance(&mut self, holder: Identity, amount: u128) {
        self.native_balances.insert(holder, amount);
    }

    pub fn emit(&mut self, record: EventRecord) {
        self.events.push(record);
    }

    /// Events recorded so far, in causal order
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Number of buffered state writes (events excluded)
    pub fn pending_writes(&self) -> usize {
        self.ownership.len() + self.token_balances.len() + self.native_balances.len()
    }

    /// Apply every buffered write to the store and hand back the events.
    ///
    /// Ownership writes are validated before anything is applied, so a failure
    /// leaves the store untouched.
    pub fn commit(self, store: &mut ObjectStore) -> Result<Vec<EventRecord>, OwnershipError> {
        for id in self.ownership.keys() {
            store.ownership(id)?;
        }

        for (id, ownership) in self.ownership {
            store.set_ownership(&id, ownership)?;
        }
        for ((token, holder), amount) in self.token_balances {
            store.set_token_balance(token, holder, amount);
        }
        for (holder, amount) in self.native_balances {
            store.set_native_balance(holder, amount);
        }

        Ok(self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use crate::store::{ObjectData, ObjectKind, StoredObject};

    fn store_with_resource(id: Identity, owner: Identity) -> ObjectStore {
        let mut store = ObjectStore::new();
        store
            .insert(StoredObject {
                id,
                kind: ObjectKind::Resource,
                creator: owner,
                data: ObjectData::Administrable(Ownership::new(owner).unwrap()),
            })
            .unwrap();
        store
    }

    #[test]
    fn test_reads_fall_through_until_written() {
        let admin = Identity::principal("admin");
        let id = Identity::new([5; 32]);
        let store = store_with_resource(id, admin);
        let mut journal = Journal::new();

        assert_eq!(journal.ownership(&store, &id).unwrap().owner(), admin);

        let mut ownership = journal.ownership(&store, &id).unwrap();
        ownership.propose_transfer(admin, Identity::principal("newOwner")).unwrap();
        journal.set_ownership(id, ownership);

        assert_eq!(
            journal.ownership(&store, &id).unwrap().pending_owner(),
            Identity::principal("newOwner")
        );
        // Committed state is untouched
        assert_eq!(store.ownership(&id).unwrap().pending_owner(), Identity::NONE);
    }

    #[test]
    fn test_commit_applies_writes() {
        let admin = Identity::principal("admin");
        let id = Identity::new([5; 32]);
        let token = Identity::new([6; 32]);
        let mut store = store_with_resource(id, admin);
        let mut journal = Journal::new();

        journal.set_token_balance(token, admin, 40);
        journal.set_native_balance(id, 3);
        journal.emit(EventRecord {
            emitter: id,
            event: Event::CalledClaimOwnership { target: id },
        });
        assert_eq!(journal.pending_writes(), 2);

        let events = journal.commit(&mut store).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(store.token_balance(&token, &admin), 40);
        assert_eq!(store.native_balance(&id), 3);
    }

    #[test]
    fn test_dropped_journal_changes_nothing() {
        let admin = Identity::principal("admin");
        let id = Identity::new([5; 32]);
        let store = store_with_resource(id, admin);

        {
            let mut journal = Journal::new();
            journal.set_native_balance(admin, 100);
        }

        assert_eq!(store.native_balance(&admin), 0);
    }

    #[test]
    fn test_commit_of_unknown_object_fails_cleanly() {
        let admin = Identity::principal("admin");
        let id = Identity::new([5; 32]);
        let mut store = store_with_resource(id, admin);
        let mut journal = Journal::new();

        journal.set_native_balance(admin, 10);
        journal.set_ownership(Identity::new([9; 32]), Ownership::new(admin).unwrap());

        assert!(journal.commit(&mut store).is_err());
        assert_eq!(store.native_balance(&admin), 0);
    }
}
