//! Call stack and caller attribution for one top-level invocation

use log::debug;

use crate::error::OwnershipError;
use crate::events::{Event, EventRecord};
use crate::id::Identity;
use crate::journal::Journal;
use crate::ownership::Ownership;
use crate::store::{ObjectKind, ObjectStore};

/// One entry of the call stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Identity the callee observes as its caller
    pub caller: Identity,
    pub callee: Identity,
}

/// Execution context threaded through every operation.
///
/// Holds a read-only view of committed state and the [`Journal`] that buffers
/// every write made during the invocation.
pub struct CallContext<'a> {
    store: &'a ObjectStore,
    journal: Journal,
    stack: Vec<Frame>,
    max_depth: usize,
}

impl<'a> CallContext<'a> {
    pub fn new(store: &'a ObjectStore, max_depth: usize) -> Self {
        Self {
            store,
            journal: Journal::new(),
            stack: Vec::new(),
            max_depth,
        }
    }

    /// Run `f` as a call from `caller` into `callee`
    pub fn call<R, F>(&mut self, caller: Identity, callee: Identity, f: F) -> Result<R, OwnershipError>
    where
        F: FnOnce(&mut Self) -> Result<R, OwnershipError>,
    {
        if self.stack.len() >= self.max_depth {
            return Err(OwnershipError::CallDepthExceeded(self.max_depth));
        }
        self.stack.push(Frame { caller, callee });
        debug!("call depth {}: {} -> {}", self.stack.len(), caller, callee);

        let result = f(self);

        self.stack.pop();
        result
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.stack.last()
    }

    pub fn kind_of(&self, id: &Identity) -> Result<ObjectKind, OwnershipError> {
        self.store.kind_of(id).ok_or(OwnershipError::NotFound(*id))
    }

    pub fn contains(&self, id: &Identity) -> bool {
        self.store.contains(id)
    }

    pub fn ownership(&self, id: &Identity) -> Result<Ownership, OwnershipError> {
        self.journal.ownership(self.store, id)
    }

    pub fn set_ownership(&mut self, id: Identity, ownership: Ownership) {
        self.journal.set_ownership(id, ownership);
    }

    pub fn token_balance(&self, token: &Identity, holder: &Identity) -> u128 {
        self.journal.token_balance(self.store, token, holder)
    }

    pub fn set_token_balance(&mut self, token: Identity, holder: Identity, amount: u128) {
        self.journal.set_token_balance(token, holder, amount);
    }

    pub fn native_balance(&self, holder: &Identity) -> u128 {
        self.journal.native_balance(self.store, holder)
    }

    /// Move `amount` of native balance between two identities
    pub fn move_native(&mut self, from: Identity, to: Identity, amount: u128) -> Result<(), OwnershipError> {
        let from_balance = self.native_balance(&from);
        let remaining = from_balance.checked_sub(amount).ok_or_else(|| {
            OwnershipError::Rejected(format!(
                "{} holds {} native units, cannot send {}",
                from, from_balance, amount
            ))
        })?;
        self.journal.set_native_balance(from, remaining);

        let to_balance = self.native_balance(&to);
        let credited = to_balance.checked_add(amount).ok_or_else(|| {
            OwnershipError::Rejected(format!("native balance of {} would overflow", to))
        })?;
        self.journal.set_native_balance(to, credited);
        Ok(())
    }

    pub fn emit(&mut self, emitter: Identity, event: Event) {
        debug!("{} emitted {}", emitter, event.name());
        self.journal.emit(EventRecord { emitter, event });
    }

    pub fn events(&self) -> &[EventRecord] {
        self.journal.events()
    }

    pub fn into_journal(self) -> Journal {
        self.journal
    }
}
