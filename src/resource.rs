use log::debug;

use crate::admin::DelegatedAdministrator;
use crate::context::CallContext;
use crate::error::OwnershipError;
use crate::id::Identity;
use crate::ownership::Ownership;
use crate::store::ObjectKind;
use crate::token::{BasicToken, FungibleToken};

/// Capability interface shared by every owner-gated object.
///
/// Implementors only name the object they stand for; state lives in the
/// [`CallContext`], and every operation receives the caller it observes.
pub trait Administrable {
    fn id(&self) -> Identity;

    fn ownership(&self, ctx: &CallContext<'_>) -> Result<Ownership, OwnershipError> {
        ctx.ownership(&self.id())
    }

    /// Propose `new_owner` as the next owner. Owner only.
    fn propose_transfer(
        &self,
        ctx: &mut CallContext<'_>,
        caller: Identity,
        new_owner: Identity,
    ) -> Result<(), OwnershipError> {
        let mut ownership = self.ownership(ctx)?;
        ownership.propose_transfer(caller, new_owner)?;
        ctx.set_ownership(self.id(), ownership);
        debug!("{} proposed {} as owner of {}", caller, new_owner, self.id());
        Ok(())
    }

    /// Become the owner. Pending owner only.
    fn claim_ownership(&self, ctx: &mut CallContext<'_>, caller: Identity) -> Result<(), OwnershipError> {
        let mut ownership = self.ownership(ctx)?;
        let event = ownership.claim(caller)?;
        ctx.set_ownership(self.id(), ownership);
        ctx.emit(self.id(), event);
        Ok(())
    }

    /// Send this object's whole balance of `token` to the owner
    fn reclaim_token(
        &self,
        ctx: &mut CallContext<'_>,
        caller: Identity,
        token: Identity,
    ) -> Result<(), OwnershipError> {
        self.ownership(ctx)?.require_owner(caller)?;

        let this = self.id();
        ctx.call(this, token, |ctx| {
            let token = BasicToken::at(ctx, token)?;
            let amount = token.balance_of(ctx, this)?;
            token.transfer(ctx, this, caller, amount)
        })
        .map_err(|source| OwnershipError::external(token, source))
    }

    /// Send this object's whole native balance to the owner
    fn reclaim_ether(&self, ctx: &mut CallContext<'_>, caller: Identity) -> Result<(), OwnershipError> {
        self.ownership(ctx)?.require_owner(caller)?;

        let this = self.id();
        let amount = ctx.native_balance(&this);
        ctx.move_native(this, caller, amount)?;
        debug!("{} swept {} native units to {}", this, amount, caller);
        Ok(())
    }
}

/// A plain owner-gated resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessControlledResource {
    id: Identity,
}

impl AccessControlledResource {
    pub fn at(id: Identity) -> Self {
        Self { id }
    }
}

impl Administrable for AccessControlledResource {
    fn id(&self) -> Identity {
        self.id
    }
}

/// Handle to whatever administrable object is deployed at `id`
pub fn resolve(ctx: &CallContext<'_>, id: Identity) -> Result<Box<dyn Administrable>, OwnershipError> {
    match ctx.kind_of(&id)? {
        ObjectKind::Resource => Ok(Box::new(AccessControlledResource::at(id))),
        ObjectKind::Administrator => Ok(Box::new(DelegatedAdministrator::at(id))),
        ObjectKind::Token => Err(OwnershipError::UnsupportedCall {
            target: id,
            call: "administration".to_string(),
        }),
    }
}
