use crate::error::OwnershipError;
use crate::id::Identity;
use serde::{Deserialize, Serialize};

/// Hash of a top-level invocation
pub type InvocationHash = [u8; 32];

/// Audit events emitted by resources and administrators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A pending owner claimed a resource
    OwnershipTransferred {
        previous_owner: Identity,
        new_owner: Identity,
    },
    /// An administrator proposed a new owner on a resource it owns
    CalledTransferOwnership { target: Identity, new_owner: Identity },
    /// An administrator claimed a resource
    CalledClaimOwnership { target: Identity },
    /// An administrator swept a token balance out of a resource
    CalledReclaimToken { target: Identity, token: Identity },
    /// An administrator swept the native balance out of a resource
    CalledReclaimEther { target: Identity },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::OwnershipTransferred { .. } => "OwnershipTransferred",
            Event::CalledTransferOwnership { .. } => "CalledTransferOwnership",
            Event::CalledClaimOwnership { .. } => "CalledClaimOwnership",
            Event::CalledReclaimToken { .. } => "CalledReclaimToken",
            Event::CalledReclaimEther { .. } => "CalledReclaimEther",
        }
    }
}

/// An event together with the object that emitted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub emitter: Identity,
    pub event: Event,
}

/// A committed entry of the audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position of this entry in the log, starting at 0
    pub sequence: u64,

    /// The invocation that emitted the event
    pub invocation_hash: InvocationHash,

    pub record: EventRecord,

    /// Hash of the previous entry (None for the first entry)
    pub prev_entry_hash: Option<[u8; 32]>,

    /// Unix timestamp (seconds) of the commit
    pub timestamp: i64,
}

impl AuditEntry {
    /// blake3 hash over the bincode encoding of this entry
    pub fn hash(&self) -> Result<[u8; 32], OwnershipError> {
        let bytes = bincode::serialize(self)?;
        Ok(*blake3::hash(&bytes).as_bytes())
    }
}

/// Append-only, hash-chained log of committed events
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
    last_hash: Option<[u8; 32]>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the entries for one invocation without appending them
    pub fn prepare(
        &self,
        invocation_hash: InvocationHash,
        records: &[EventRecord],
        timestamp: i64,
    ) -> Result<Vec<AuditEntry>, OwnershipError> {
        let mut prepared = Vec::with_capacity(records.len());
        let mut prev = self.last_hash;
        for record in records {
            let entry = AuditEntry {
                sequence: (self.entries.len() + prepared.len()) as u64,
                invocation_hash,
                record: record.clone(),
                prev_entry_hash: prev,
                timestamp,
            };
            prev = Some(entry.hash()?);
            prepared.push(entry);
        }
        Ok(prepared)
    }

    /// Append entries produced by [`AuditLog::prepare`]
    pub fn extend(&mut self, entries: Vec<AuditEntry>) -> Result<(), OwnershipError> {
        for entry in entries {
            if entry.sequence != self.entries.len() as u64 || entry.prev_entry_hash != self.last_hash {
                return Err(OwnershipError::InvalidArgument(format!(
                    "audit entry {} does not extend the log",
                    entry.sequence
                )));
            }
            self.last_hash = Some(entry.hash()?);
            self.entries.push(entry);
        }
        Ok(())
    }

    /// Append the events of one committed invocation, in order
    pub fn append(
        &mut self,
        invocation_hash: InvocationHash,
        records: &[EventRecord],
        timestamp: i64,
    ) -> Result<Vec<AuditEntry>, OwnershipError> {
        let entries = self.prepare(invocation_hash, records, timestamp)?;
        self.extend(entries.clone())?;
        Ok(entries)
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Events only, in committed order
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.entries.iter().map(|entry| &entry.record.event)
    }

    /// Check that every entry links to the hash of its predecessor
    pub fn verify_chain(&self) -> Result<bool, OwnershipError> {
        verify_entries(&self.entries)
    }
}

/// Check sequence numbers and hash links of a slice of entries
pub fn verify_entries(entries: &[AuditEntry]) -> Result<bool, OwnershipError> {
    let mut prev: Option<[u8; 32]> = None;
    for (index, entry) in entries.iter().enumerate() {
        if entry.sequence != index as u64 || entry.prev_entry_hash != prev {
            return Ok(false);
        }
        prev = Some(entry.hash()?);
    }
    Ok(true)
}
