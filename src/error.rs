use crate::id::Identity;
use std::io;
use thiserror::Error;

/// Represents all possible errors that can abort an invocation on the ledger
#[derive(Error, Debug)]
pub enum OwnershipError {
    /// The caller is not the principal the operation requires
    #[error("Unauthorized: {caller} is not {required}")]
    Unauthorized { caller: Identity, required: Identity },

    /// A supplied value is not acceptable, e.g. the NONE identity where a real one is required
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A nested call into another object did not succeed
    #[error("External call to {target} failed: {source}")]
    ExternalCallFailure {
        target: Identity,
        #[source]
        source: Box<OwnershipError>,
    },

    /// No object is deployed at this identity
    #[error("Not found: {0}")]
    NotFound(Identity),

    /// The target object does not expose this call
    #[error("Object {target} does not support {call}")]
    UnsupportedCall { target: Identity, call: String },

    /// A token transfer could not be performed
    #[error("Token transfer failed: {0}")]
    TokenTransfer(String),

    /// The recipient refuses the value being sent
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Nested calls went deeper than the configured limit
    #[error("Call depth exceeded: {0}")]
    CallDepthExceeded(usize),

    /// IO errors that occur when reading/writing the audit log or config
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A lock guarding shared state was poisoned
    #[error("Lock error: {0}")]
    Lock(String),

    /// Malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anyhow error wrapper for error context
    #[error(transparent)]
    Context(#[from] anyhow::Error),
}

impl OwnershipError {
    /// Wrap a failure that happened inside a nested call to `target`
    pub fn external(target: Identity, source: OwnershipError) -> Self {
        OwnershipError::ExternalCallFailure {
            target,
            source: Box::new(source),
        }
    }

    /// The innermost error, with every `ExternalCallFailure` layer stripped
    pub fn root_cause(&self) -> &OwnershipError {
        match self {
            OwnershipError::ExternalCallFailure { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, OwnershipError::Unauthorized { .. })
    }

    pub fn is_external(&self) -> bool {
        matches!(self, OwnershipError::ExternalCallFailure { .. })
    }
}

impl From<bincode::Error> for OwnershipError {
    fn from(err: bincode::Error) -> Self {
        OwnershipError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for OwnershipError {
    fn from(err: serde_json::Error) -> Self {
        OwnershipError::Config(err.to_string())
    }
}
