//! Delegated administration of other resources
//!
//! A [`DelegatedAdministrator`] is itself an administrable resource. Its owner
//! can relay the owner-gated operations onto any resource the administrator
//! owns: the target sees the administrator as its caller, so each resource
//! only ever deals with one owner identity while the actual authorization
//! happens one layer up.

use log::{debug, info};

use crate::context::CallContext;
use crate::error::OwnershipError;
use crate::events::Event;
use crate::id::Identity;
use crate::resource::{resolve, Administrable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelegatedAdministrator {
    id: Identity,
}

impl Administrable for DelegatedAdministrator {
    fn id(&self) -> Identity {
        self.id
    }
}

impl DelegatedAdministrator {
    pub fn at(id: Identity) -> Self {
        Self { id }
    }

    /// Propose `new_owner` on `target`, acting as the administrator
    pub fn relay_transfer_ownership(
        &self,
        ctx: &mut CallContext<'_>,
        caller: Identity,
        target: Identity,
        new_owner: Identity,
    ) -> Result<(), OwnershipError> {
        self.ownership(ctx)?.require_owner(caller)?;
        self.relay(ctx, target, |ctx, resource, this| {
            resource.propose_transfer(ctx, this, new_owner)
        })?;
        ctx.emit(self.id, Event::CalledTransferOwnership { target, new_owner });
        Ok(())
    }

    /// Claim `target` for the administrator.
    ///
    /// Succeeds only when the administrator is the target's pending owner. The
    /// target's `OwnershipTransferred` is recorded before `CalledClaimOwnership`.
    pub fn relay_claim_ownership(
        &self,
        ctx: &mut CallContext<'_>,
        caller: Identity,
        target: Identity,
    ) -> Result<(), OwnershipError> {
        self.ownership(ctx)?.require_owner(caller)?;
        self.relay(ctx, target, |ctx, resource, this| {
            resource.claim_ownership(ctx, this)
        })?;
        ctx.emit(self.id, Event::CalledClaimOwnership { target });
        info!("{} now owns {}", self.id, target);
        Ok(())
    }

    /// Sweep `target`'s balance of `token` into the administrator
    pub fn relay_reclaim_token(
        &self,
        ctx: &mut CallContext<'_>,
        caller: Identity,
        target: Identity,
        token: Identity,
    ) -> Result<(), OwnershipError> {
        self.ownership(ctx)?.require_owner(caller)?;
        self.relay(ctx, target, |ctx, resource, this| {
            resource.reclaim_token(ctx, this, token)
        })?;
        ctx.emit(self.id, Event::CalledReclaimToken { target, token });
        Ok(())
    }

    /// Sweep `target`'s native balance into the administrator
    pub fn relay_reclaim_ether(
        &self,
        ctx: &mut CallContext<'_>,
        caller: Identity,
        target: Identity,
    ) -> Result<(), OwnershipError> {
        self.ownership(ctx)?.require_owner(caller)?;
        self.relay(ctx, target, |ctx, resource, this| {
            resource.reclaim_ether(ctx, this)
        })?;
        ctx.emit(self.id, Event::CalledReclaimEther { target });
        Ok(())
    }

    /// Nested call into `target` with the administrator as caller.
    /// Any failure inside comes back as `ExternalCallFailure`.
    fn relay<F>(&self, ctx: &mut CallContext<'_>, target: Identity, op: F) -> Result<(), OwnershipError>
    where
        F: FnOnce(&mut CallContext<'_>, &dyn Administrable, Identity) -> Result<(), OwnershipError>,
    {
        let this = self.id;
        ctx.call(this, target, |ctx| {
            let resource = resolve(ctx, target)?;
            op(ctx, &*resource, this)
        })
        .map_err(|source| {
            debug!("relay from {} into {} failed: {}", this, target, source);
            OwnershipError::external(target, source)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ownership::Ownership;
    use crate::store::{ObjectData, ObjectKind, ObjectStore, StoredObject};

    fn admin() -> Identity {
        Identity::principal("admin")
    }

    fn non_owner() -> Identity {
        Identity::principal("nonOwner")
    }

    const ADMINISTRATOR: Identity = Identity::new([20; 32]);
    const RESOURCE: Identity = Identity::new([21; 32]);

    // Resource already owned by the administrator, administrator owned by `admin`
    fn setup() -> ObjectStore {
        let mut store = ObjectStore::new();
        store
            .insert(StoredObject {
                id: ADMINISTRATOR,
                kind: ObjectKind::Administrator,
                creator: admin(),
                data: ObjectData::Administrable(Ownership::new(admin()).unwrap()),
            })
            .unwrap();
        store
            .insert(StoredObject {
                id: RESOURCE,
                kind: ObjectKind::Resource,
                creator: admin(),
                data: ObjectData::Administrable(Ownership::new(ADMINISTRATOR).unwrap()),
            })
            .unwrap();
        store
    }

    #[test]
    fn test_relay_transfer_ownership() {
        let store = setup();
        let mut ctx = CallContext::new(&store, 8);
        let administrator = DelegatedAdministrator::at(ADMINISTRATOR);
        let new_owner = Identity::principal("newOwner");

        administrator
            .relay_transfer_ownership(&mut ctx, admin(), RESOURCE, new_owner)
            .unwrap();

        assert_eq!(ctx.ownership(&RESOURCE).unwrap().pending_owner(), new_owner);
        assert_eq!(ctx.events().len(), 1);
        assert_eq!(ctx.events()[0].emitter, ADMINISTRATOR);
        assert_eq!(
            ctx.events()[0].event,
            Event::CalledTransferOwnership {
                target: RESOURCE,
                new_owner
            }
        );
    }

    #[test]
    fn test_relay_by_non_owner_makes_no_nested_call() {
        let store = setup();
        let mut ctx = CallContext::new(&store, 8);
        let administrator = DelegatedAdministrator::at(ADMINISTRATOR);

        let err = administrator
            .relay_transfer_ownership(&mut ctx, non_owner(), RESOURCE, non_owner())
            .unwrap_err();

        // Rejected at the administrator, not wrapped as a nested failure
        assert!(err.is_unauthorized());
        assert_eq!(ctx.ownership(&RESOURCE).unwrap().pending_owner(), Identity::NONE);
        assert!(ctx.events().is_empty());
    }

    #[test]
    fn test_relay_transfer_none_fails_as_external() {
        let store = setup();
        let mut ctx = CallContext::new(&store, 8);
        let administrator = DelegatedAdministrator::at(ADMINISTRATOR);

        let err = administrator
            .relay_transfer_ownership(&mut ctx, admin(), RESOURCE, Identity::NONE)
            .unwrap_err();

        assert!(err.is_external());
        assert!(matches!(err.root_cause(), OwnershipError::InvalidArgument(_)));
        assert!(ctx.events().is_empty());
    }

    #[test]
    fn test_relay_claim_requires_pending_administrator() {
        let store = setup();
        let mut ctx = CallContext::new(&store, 8);
        let administrator = DelegatedAdministrator::at(ADMINISTRATOR);

        // The administrator already owns RESOURCE and nothing is pending
        let err = administrator
            .relay_claim_ownership(&mut ctx, admin(), RESOURCE)
            .unwrap_err();
        assert!(err.is_external());
        assert!(err.root_cause().is_unauthorized());
    }

    #[test]
    fn test_relay_into_unknown_target() {
        let store = setup();
        let mut ctx = CallContext::new(&store, 8);
        let administrator = DelegatedAdministrator::at(ADMINISTRATOR);
        let missing = Identity::new([77; 32]);

        let err = administrator
            .relay_reclaim_ether(&mut ctx, admin(), missing)
            .unwrap_err();
        assert!(matches!(
            err,
            OwnershipError::ExternalCallFailure { target, .. } if target == missing
        ));
    }

    #[test]
    fn test_relay_reclaim_ether_emits_one_event() {
        let store = setup();
        let mut ctx = CallContext::new(&store, 8);
        let administrator = DelegatedAdministrator::at(ADMINISTRATOR);

        administrator
            .relay_reclaim_ether(&mut ctx, admin(), RESOURCE)
            .unwrap();

        assert_eq!(ctx.events().len(), 1);
        assert_eq!(
            ctx.events()[0].event,
            Event::CalledReclaimEther { target: RESOURCE }
        );
    }

    #[test]
    fn test_administrator_is_itself_administrable() {
        let store = setup();
        let mut ctx = CallContext::new(&store, 8);
        let administrator = DelegatedAdministrator::at(ADMINISTRATOR);
        let successor = Identity::principal("successor");

        administrator
            .propose_transfer(&mut ctx, admin(), successor)
            .unwrap();
        administrator.claim_ownership(&mut ctx, successor).unwrap();

        assert_eq!(ctx.ownership(&ADMINISTRATOR).unwrap().owner(), successor);
        assert!(administrator
            .relay_reclaim_ether(&mut ctx, admin(), RESOURCE)
            .unwrap_err()
            .is_unauthorized());
    }
}
