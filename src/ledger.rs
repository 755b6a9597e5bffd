use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::admin::DelegatedAdministrator;
use crate::config::LedgerConfig;
use crate::context::CallContext;
use crate::error::OwnershipError;
use crate::events::{AuditLog, EventRecord, InvocationHash};
use crate::id::Identity;
use crate::ownership::{Ownership, OwnershipState};
use crate::resource::{resolve, Administrable};
use crate::store::{ObjectData, ObjectKind, ObjectStore, StoredObject};
use crate::token::{BasicToken, FungibleToken};
use crate::wal::{AuditSink, FileAuditLog};

/// An operation invoked on a target object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    ProposeTransfer { new_owner: Identity },
    ClaimOwnership,
    ReclaimToken { token: Identity },
    ReclaimEther,
    RelayTransferOwnership { target: Identity, new_owner: Identity },
    RelayClaimOwnership { target: Identity },
    RelayReclaimToken { target: Identity, token: Identity },
    RelayReclaimEther { target: Identity },
    /// Token transfer; the invocation target is the token
    TokenTransfer { to: Identity, amount: u128 },
    /// Plain native value transfer to the invocation target
    SendNative { amount: u128 },
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::ProposeTransfer { .. } => "proposeTransfer",
            Call::ClaimOwnership => "claimOwnership",
            Call::ReclaimToken { .. } => "reclaimToken",
            Call::ReclaimEther => "reclaimEther",
            Call::RelayTransferOwnership { .. } => "relayTransferOwnership",
            Call::RelayClaimOwnership { .. } => "relayClaimOwnership",
            Call::RelayReclaimToken { .. } => "relayReclaimToken",
            Call::RelayReclaimEther { .. } => "relayReclaimEther",
            Call::TokenTransfer { .. } => "transfer",
            Call::SendNative { .. } => "sendNative",
        }
    }
}

/// Record of a committed invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub invocation_hash: InvocationHash,
    pub caller: Identity,
    pub target: Identity,
    pub call: Call,
    /// Events in causal order: a callee's events precede its caller's
    pub events: Vec<EventRecord>,
    /// Unix timestamp (seconds) of the commit
    pub timestamp: i64,
}

impl Receipt {
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.iter().map(|record| record.event.name()).collect()
    }
}

/// In-process ledger: deploys objects and runs invocations atomically.
///
/// Each [`Ledger::execute`] runs the whole call chain against a journal and
/// commits it only if every nested call succeeded.
pub struct Ledger {
    config: LedgerConfig,
    store: ObjectStore,
    audit: AuditLog,
    sink: Option<Box<dyn AuditSink>>,
    receipts: HashMap<InvocationHash, Receipt>,
    /// Retained receipt hashes, oldest first
    receipt_order: VecDeque<InvocationHash>,
    invocations: u64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::from_parts(LedgerConfig::default(), None)
    }
}

impl Ledger {
    /// Create a ledger. Opens the audit log file if the config names one.
    pub fn new(config: LedgerConfig) -> Result<Self, OwnershipError> {
        config.validate()?;
        let sink: Option<Box<dyn AuditSink>> = match &config.audit_log_path {
            Some(path) => {
                let log = FileAuditLog::open(path)?;
                // A new ledger starts a new hash chain
                if !log.is_empty()? {
                    return Err(OwnershipError::Config(format!(
                        "audit log {} already contains entries",
                        path.display()
                    )));
                }
                Some(Box::new(log))
            }
            None => None,
        };
        Ok(Self::from_parts(config, sink))
    }

    /// Create a ledger that mirrors committed audit entries into `sink`
    pub fn with_sink(config: LedgerConfig, sink: Box<dyn AuditSink>) -> Result<Self, OwnershipError> {
        config.validate()?;
        if !sink.is_empty()? {
            return Err(OwnershipError::Config(
                "audit sink already contains entries".to_string(),
            ));
        }
        Ok(Self::from_parts(config, Some(sink)))
    }

    fn from_parts(config: LedgerConfig, sink: Option<Box<dyn AuditSink>>) -> Self {
        Self {
            config,
            store: ObjectStore::new(),
            audit: AuditLog::new(),
            sink,
            receipts: HashMap::new(),
            receipt_order: VecDeque::new(),
            invocations: 0,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ---- Deployment ----

    /// Deploy an access-controlled resource owned by `creator`
    pub fn deploy_resource(&mut self, creator: Identity) -> Result<Identity, OwnershipError> {
        let ownership = Ownership::new(creator)?;
        self.deploy(creator, ObjectKind::Resource, ObjectData::Administrable(ownership))
    }

    /// Deploy a delegated administrator owned by `creator`
    pub fn deploy_administrator(&mut self, creator: Identity) -> Result<Identity, OwnershipError> {
        let ownership = Ownership::new(creator)?;
        self.deploy(creator, ObjectKind::Administrator, ObjectData::Administrable(ownership))
    }

    /// Deploy a token whose whole `supply` starts with `initial_holder`
    pub fn deploy_token(
        &mut self,
        creator: Identity,
        initial_holder: Identity,
        supply: u128,
    ) -> Result<Identity, OwnershipError> {
        if initial_holder.is_none() {
            return Err(OwnershipError::InvalidArgument(
                "initial holder cannot be the none identity".to_string(),
            ));
        }
        let id = self.deploy(creator, ObjectKind::Token, ObjectData::Token { total_supply: supply })?;
        self.store.set_token_balance(id, initial_holder, supply);
        Ok(id)
    }

    fn deploy(
        &mut self,
        creator: Identity,
        kind: ObjectKind,
        data: ObjectData,
    ) -> Result<Identity, OwnershipError> {
        if creator.is_none() {
            return Err(OwnershipError::InvalidArgument(
                "creator cannot be the none identity".to_string(),
            ));
        }
        let nonce = self.store.next_nonce(&creator);
        let (id, _) = Identity::derive_object(&creator, nonce).ok_or_else(|| {
            OwnershipError::InvalidArgument(format!(
                "no object identity available for {} at nonce {}",
                creator, nonce
            ))
        })?;
        self.store.insert(StoredObject {
            id,
            kind,
            creator,
            data,
        })?;
        info!("{} deployed {:?} at {}", creator, kind, id);
        Ok(id)
    }

    // ---- Native balance setup ----

    /// Credit genesis native balance to a principal. Objects cannot be funded.
    pub fn fund(&mut self, holder: Identity, amount: u128) -> Result<(), OwnershipError> {
        if self.store.contains(&holder) {
            return Err(OwnershipError::Rejected(format!(
                "{} does not accept native deposits",
                holder
            )));
        }
        self.credit_native(holder, amount)
    }

    /// Push native balance onto any identity, bypassing deposit rules.
    ///
    /// This is how a resource ends up holding native balance it never asked for.
    pub fn force_native(&mut self, to: Identity, amount: u128) -> Result<(), OwnershipError> {
        self.credit_native(to, amount)?;
        debug!("forced {} native units onto {}", amount, to);
        Ok(())
    }

    fn credit_native(&mut self, to: Identity, amount: u128) -> Result<(), OwnershipError> {
        if to.is_none() {
            return Err(OwnershipError::InvalidArgument(
                "cannot credit the none identity".to_string(),
            ));
        }
        let balance = self
            .store
            .native_balance(&to)
            .checked_add(amount)
            .ok_or_else(|| OwnershipError::Rejected(format!("native balance of {} would overflow", to)))?;
        self.store.set_native_balance(to, balance);
        Ok(())
    }

    // ---- Invocation ----

    /// Run `call` on `target` on behalf of `caller`, all or nothing.
    ///
    /// On success every buffered write is applied and the events are appended
    /// to the audit log. On failure nothing changes.
    pub fn execute(
        &mut self,
        caller: Identity,
        target: Identity,
        call: Call,
    ) -> Result<Receipt, OwnershipError> {
        if caller.is_none() {
            return Err(OwnershipError::InvalidArgument(
                "the none identity cannot make calls".to_string(),
            ));
        }
        let invocation_hash = self.next_invocation_hash(caller, target, &call)?;
        let short_hash = hex::encode(&invocation_hash[..6]);
        debug!("invocation {}: {} calls {} on {}", short_hash, caller, call.name(), target);

        let mut ctx = CallContext::new(&self.store, self.config.max_call_depth);
        let outcome = ctx.call(caller, target, |ctx| dispatch(ctx, caller, target, &call));
        let journal = ctx.into_journal();

        if let Err(err) = outcome {
            warn!(
                "invocation {} aborted, discarding {} writes and {} events: {}",
                short_hash,
                journal.pending_writes(),
                journal.events().len(),
                err
            );
            return Err(err);
        }

        let timestamp = Utc::now().timestamp();
        let entries = self.audit.prepare(invocation_hash, journal.events(), timestamp)?;
        match &self.sink {
            Some(sink) if !entries.is_empty() => {
                if let Err(err) = sink.record_batch(&entries) {
                    warn!("invocation {} aborted, audit sink write failed: {}", short_hash, err);
                    return Err(err);
                }
            }
            _ => {}
        }

        let events = journal.commit(&mut self.store)?;
        self.audit.extend(entries)?;

        let receipt = Receipt {
            invocation_hash,
            caller,
            target,
            call,
            events,
            timestamp,
        };
        self.retain_receipt(receipt.clone());
        info!(
            "invocation {} committed: {} on {} with {} events",
            short_hash,
            receipt.call.name(),
            target,
            receipt.events.len()
        );
        Ok(receipt)
    }

    fn retain_receipt(&mut self, receipt: Receipt) {
        self.receipt_order.push_back(receipt.invocation_hash);
        self.receipts.insert(receipt.invocation_hash, receipt);

        if let Some(limit) = self.config.receipt_retention {
            while self.receipt_order.len() > limit {
                if let Some(oldest) = self.receipt_order.pop_front() {
                    self.receipts.remove(&oldest);
                }
            }
        }
    }

    fn next_invocation_hash(
        &mut self,
        caller: Identity,
        target: Identity,
        call: &Call,
    ) -> Result<InvocationHash, OwnershipError> {
        let nonce = self.invocations;
        self.invocations += 1;
        let bytes = bincode::serialize(&(nonce, caller, target, call))?;
        Ok(*blake3::hash(&bytes).as_bytes())
    }

    // ---- Views ----

    pub fn kind_of(&self, id: &Identity) -> Option<ObjectKind> {
        self.store.kind_of(id)
    }

    pub fn object(&self, id: &Identity) -> Option<&StoredObject> {
        self.store.get(id)
    }

    pub fn owner_of(&self, id: &Identity) -> Result<Identity, OwnershipError> {
        Ok(self.store.ownership(id)?.owner())
    }

    pub fn pending_owner_of(&self, id: &Identity) -> Result<Identity, OwnershipError> {
        Ok(self.store.ownership(id)?.pending_owner())
    }

    pub fn ownership_state(&self, id: &Identity) -> Result<OwnershipState, OwnershipError> {
        Ok(self.store.ownership(id)?.state())
    }

    pub fn token_balance(&self, token: &Identity, holder: &Identity) -> Result<u128, OwnershipError> {
        self.require_token(token)?;
        Ok(self.store.token_balance(token, holder))
    }

    pub fn token_total_supply(&self, token: &Identity) -> Result<u128, OwnershipError> {
        match self.require_token(token)?.data {
            ObjectData::Token { total_supply } => Ok(total_supply),
            ObjectData::Administrable(_) => Err(OwnershipError::UnsupportedCall {
                target: *token,
                call: "totalSupply".to_string(),
            }),
        }
    }

    fn require_token(&self, token: &Identity) -> Result<&StoredObject, OwnershipError> {
        let object = self.store.get(token).ok_or(OwnershipError::NotFound(*token))?;
        if object.kind != ObjectKind::Token {
            return Err(OwnershipError::UnsupportedCall {
                target: *token,
                call: "balanceOf".to_string(),
            });
        }
        Ok(object)
    }

    pub fn native_balance(&self, holder: &Identity) -> u128 {
        self.store.native_balance(holder)
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Receipt of a committed invocation, while it is still retained
    pub fn receipt(&self, invocation_hash: &InvocationHash) -> Option<&Receipt> {
        self.receipts.get(invocation_hash)
    }

    pub fn object_count(&self) -> usize {
        self.store.len()
    }
}

/// Route a top-level call to the operation the target's kind exposes
fn dispatch(
    ctx: &mut CallContext<'_>,
    caller: Identity,
    target: Identity,
    call: &Call,
) -> Result<(), OwnershipError> {
    if let Call::SendNative { amount } = call {
        if ctx.contains(&target) {
            return Err(OwnershipError::Rejected(format!(
                "{} does not accept native deposits",
                target
            )));
        }
        return ctx.move_native(caller, target, *amount);
    }

    let kind = ctx.kind_of(&target)?;
    match (kind, call) {
        (ObjectKind::Token, Call::TokenTransfer { to, amount }) => {
            BasicToken::at(ctx, target)?.transfer(ctx, caller, *to, *amount)
        }
        (ObjectKind::Administrator, Call::RelayTransferOwnership { target: resource, new_owner }) => {
            DelegatedAdministrator::at(target).relay_transfer_ownership(ctx, caller, *resource, *new_owner)
        }
        (ObjectKind::Administrator, Call::RelayClaimOwnership { target: resource }) => {
            DelegatedAdministrator::at(target).relay_claim_ownership(ctx, caller, *resource)
        }
        (ObjectKind::Administrator, Call::RelayReclaimToken { target: resource, token }) => {
            DelegatedAdministrator::at(target).relay_reclaim_token(ctx, caller, *resource, *token)
        }
        (ObjectKind::Administrator, Call::RelayReclaimEther { target: resource }) => {
            DelegatedAdministrator::at(target).relay_reclaim_ether(ctx, caller, *resource)
        }
        (kind, Call::ProposeTransfer { new_owner }) if kind.is_administrable() => {
            resolve(ctx, target)?.propose_transfer(ctx, caller, *new_owner)
        }
        (kind, Call::ClaimOwnership) if kind.is_administrable() => {
            resolve(ctx, target)?.claim_ownership(ctx, caller)
        }
        (kind, Call::ReclaimToken { token }) if kind.is_administrable() => {
            resolve(ctx, target)?.reclaim_token(ctx, caller, *token)
        }
        (kind, Call::ReclaimEther) if kind.is_administrable() => {
            resolve(ctx, target)?.reclaim_ether(ctx, caller)
        }
        _ => Err(OwnershipError::UnsupportedCall {
            target,
            call: call.name().to_string(),
        }),
    }
}
