use crate::error::OwnershipError;
use crate::events::Event;
use crate::id::Identity;
use serde::{Deserialize, Serialize};

/// Observable state of the two-step transfer protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnershipState {
    /// No transfer in flight
    Owned { owner: Identity },
    /// `pending` may claim; `owner` may still overwrite the proposal
    PendingTransfer { owner: Identity, pending: Identity },
}

/// Owner and pending owner of an administrable object.
///
/// Both resources and administrators embed one of these. It is mutated only
/// through [`Ownership::propose_transfer`] and [`Ownership::claim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    owner: Identity,
    pending_owner: Identity,
}

impl Ownership {
    /// Ownership of a freshly created object
    pub fn new(creator: Identity) -> Result<Self, OwnershipError> {
        if creator.is_none() {
            return Err(OwnershipError::InvalidArgument(
                "creator cannot be the none identity".to_string(),
            ));
        }
        Ok(Self {
            owner: creator,
            pending_owner: Identity::NONE,
        })
    }

    pub fn owner(&self) -> Identity {
        self.owner
    }

    pub fn pending_owner(&self) -> Identity {
        self.pending_owner
    }

    pub fn state(&self) -> OwnershipState {
        if self.pending_owner.is_none() {
            OwnershipState::Owned { owner: self.owner }
        } else {
            OwnershipState::PendingTransfer {
                owner: self.owner,
                pending: self.pending_owner,
            }
        }
    }

    /// Fail with `Unauthorized` unless `caller` is the current owner
    pub fn require_owner(&self, caller: Identity) -> Result<(), OwnershipError> {
        if caller != self.owner {
            return Err(OwnershipError::Unauthorized {
                caller,
                required: self.owner,
            });
        }
        Ok(())
    }

    /// Propose `new_owner`, replacing any earlier proposal
    pub fn propose_transfer(
        &mut self,
        caller: Identity,
        new_owner: Identity,
    ) -> Result<(), OwnershipError> {
        self.require_owner(caller)?;
        if new_owner.is_none() {
            return Err(OwnershipError::InvalidArgument(
                "new owner cannot be the none identity".to_string(),
            ));
        }
        self.pending_owner = new_owner;
        Ok(())
    }

    /// Complete a transfer. Only the pending owner may call this.
    pub fn claim(&mut self, caller: Identity) -> Result<Event, OwnershipError> {
        // NONE can never be a caller, so an empty proposal always fails here
        if self.pending_owner.is_none() || caller != self.pending_owner {
            return Err(OwnershipError::Unauthorized {
                caller,
                required: self.pending_owner,
            });
        }
        let previous_owner = self.owner;
        self.owner = self.pending_owner;
        self.pending_owner = Identity::NONE;
        Ok(Event::OwnershipTransferred {
            previous_owner,
            new_owner: self.owner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Identity {
        Identity::principal("admin")
    }

    fn new_owner() -> Identity {
        Identity::principal("newOwner")
    }

    fn non_owner() -> Identity {
        Identity::principal("nonOwner")
    }

    #[test]
    fn test_new_rejects_none_creator() {
        let err = Ownership::new(Identity::NONE).unwrap_err();
        assert!(matches!(err, OwnershipError::InvalidArgument(_)));
    }

    #[test]
    fn test_initial_state() {
        let ownership = Ownership::new(admin()).unwrap();
        assert_eq!(ownership.owner(), admin());
        assert_eq!(ownership.pending_owner(), Identity::NONE);
        assert_eq!(ownership.state(), OwnershipState::Owned { owner: admin() });
    }

    #[test]
    fn test_propose_by_non_owner_leaves_pending_unchanged() {
        let mut ownership = Ownership::new(admin()).unwrap();
        ownership.propose_transfer(admin(), new_owner()).unwrap();

        let err = ownership.propose_transfer(non_owner(), non_owner()).unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(ownership.pending_owner(), new_owner());
    }

    #[test]
    fn test_propose_none_is_invalid() {
        let mut ownership = Ownership::new(admin()).unwrap();
        let err = ownership.propose_transfer(admin(), Identity::NONE).unwrap_err();
        assert!(matches!(err, OwnershipError::InvalidArgument(_)));
        assert_eq!(ownership.pending_owner(), Identity::NONE);
    }

    #[test]
    fn test_proposal_overwrite() {
        let mut ownership = Ownership::new(admin()).unwrap();
        ownership.propose_transfer(admin(), new_owner()).unwrap();
        ownership.propose_transfer(admin(), non_owner()).unwrap();

        assert_eq!(
            ownership.state(),
            OwnershipState::PendingTransfer {
                owner: admin(),
                pending: non_owner()
            }
        );

        // The replaced proposal can no longer be claimed
        assert!(ownership.claim(new_owner()).unwrap_err().is_unauthorized());
    }

    #[test]
    fn test_claim() {
        let mut ownership = Ownership::new(admin()).unwrap();
        ownership.propose_transfer(admin(), new_owner()).unwrap();

        let event = ownership.claim(new_owner()).unwrap();
        assert_eq!(
            event,
            Event::OwnershipTransferred {
                previous_owner: admin(),
                new_owner: new_owner()
            }
        );
        assert_eq!(ownership.owner(), new_owner());
        assert_eq!(ownership.pending_owner(), Identity::NONE);

        // The old owner has lost its privileges
        assert!(ownership.propose_transfer(admin(), admin()).unwrap_err().is_unauthorized());
    }

    #[test]
    fn test_claim_without_proposal_fails() {
        let mut ownership = Ownership::new(admin()).unwrap();
        assert!(ownership.claim(admin()).unwrap_err().is_unauthorized());
        assert_eq!(ownership.owner(), admin());
    }

    #[test]
    fn test_claim_by_wrong_caller_fails() {
        let mut ownership = Ownership::new(admin()).unwrap();
        ownership.propose_transfer(admin(), new_owner()).unwrap();
        assert!(ownership.claim(non_owner()).unwrap_err().is_unauthorized());
        assert_eq!(ownership.pending_owner(), new_owner());
    }
}
