use log::debug;

use crate::context::CallContext;
use crate::error::OwnershipError;
use crate::id::Identity;
use crate::store::ObjectKind;

/// The fungible-token contract consumed by reclaim operations
pub trait FungibleToken {
    fn id(&self) -> Identity;

    /// Balance of `holder` as seen inside the current invocation
    fn balance_of(&self, ctx: &CallContext<'_>, holder: Identity) -> Result<u128, OwnershipError>;

    /// Move `amount` from `caller` to `to`
    fn transfer(
        &self,
        ctx: &mut CallContext<'_>,
        caller: Identity,
        to: Identity,
        amount: u128,
    ) -> Result<(), OwnershipError>;
}

/// Plain fixed-supply token stored on the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicToken {
    id: Identity,
}

impl BasicToken {
    /// Handle to the token deployed at `id`
    pub fn at(ctx: &CallContext<'_>, id: Identity) -> Result<Self, OwnershipError> {
        match ctx.kind_of(&id)? {
            ObjectKind::Token => Ok(Self { id }),
            _ => Err(OwnershipError::UnsupportedCall {
                target: id,
                call: "token".to_string(),
            }),
        }
    }
}

impl FungibleToken for BasicToken {
    fn id(&self) -> Identity {
        self.id
    }

    fn balance_of(&self, ctx: &CallContext<'_>, holder: Identity) -> Result<u128, OwnershipError> {
        Ok(ctx.token_balance(&self.id, &holder))
    }

    fn transfer(
        &self,
        ctx: &mut CallContext<'_>,
        caller: Identity,
        to: Identity,
        amount: u128,
    ) -> Result<(), OwnershipError> {
        if to.is_none() {
            return Err(OwnershipError::TokenTransfer(
                "cannot transfer to the none identity".to_string(),
            ));
        }

        let from_balance = ctx.token_balance(&self.id, &caller);
        let remaining = from_balance.checked_sub(amount).ok_or_else(|| {
            OwnershipError::TokenTransfer(format!(
                "{} holds {} of {}, cannot transfer {}",
                caller, from_balance, self.id, amount
            ))
        })?;
        ctx.set_token_balance(self.id, caller, remaining);

        let to_balance = ctx.token_balance(&self.id, &to);
        let credited = to_balance.checked_add(amount).ok_or_else(|| {
            OwnershipError::TokenTransfer(format!("balance of {} would overflow", to))
        })?;
        ctx.set_token_balance(self.id, to, credited);

        debug!("token {}: {} -> {} amount {}", self.id, caller, to, amount);
        Ok(())
    }
}
