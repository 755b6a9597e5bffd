pub mod admin;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod id;
pub mod journal;
pub mod ledger;
pub mod ownership;
pub mod resource;
pub mod store;
pub mod token;
pub mod wal;

// Re-export the main types for convenience
pub use admin::DelegatedAdministrator;
pub use config::{LedgerConfig, DEFAULT_MAX_CALL_DEPTH};
pub use context::{CallContext, Frame};
pub use error::OwnershipError;
pub use events::{verify_entries, AuditEntry, AuditLog, Event, EventRecord, InvocationHash};
pub use id::Identity;
pub use journal::Journal;
pub use ledger::{Call, Ledger, Receipt};
pub use ownership::{Ownership, OwnershipState};
pub use resource::{resolve, AccessControlledResource, Administrable};
pub use store::{ObjectData, ObjectKind, ObjectStore, StoredObject};
pub use token::{BasicToken, FungibleToken};
pub use wal::{AuditSink, FileAuditLog, InMemoryAuditSink, MAX_ENTRY_SIZE};
