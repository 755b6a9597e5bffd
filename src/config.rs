use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::OwnershipError;

/// Default limit on nested calls per invocation
pub const DEFAULT_MAX_CALL_DEPTH: usize = 8;

fn default_max_call_depth() -> usize {
    DEFAULT_MAX_CALL_DEPTH
}

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Maximum depth of the call stack, counting the top-level call.
    /// An administrator sweeping a token needs 3.
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,

    /// When set, committed audit entries are also appended to this file
    #[serde(default)]
    pub audit_log_path: Option<PathBuf>,

    /// How many receipts the ledger keeps for lookup, newest first.
    /// `None` keeps the full history.
    #[serde(default)]
    pub receipt_retention: Option<usize>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            audit_log_path: None,
            receipt_retention: None,
        }
    }
}

impl LedgerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, OwnershipError> {
        let config: LedgerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, OwnershipError> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read ledger config {}", path.display()))?;
        Self::from_json_str(&contents)
    }

    pub fn with_audit_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.audit_log_path = Some(path.into());
        self
    }

    pub fn with_receipt_retention(mut self, receipts: usize) -> Self {
        self.receipt_retention = Some(receipts);
        self
    }

    pub fn validate(&self) -> Result<(), OwnershipError> {
        if self.max_call_depth == 0 {
            return Err(OwnershipError::Config(
                "max_call_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_from_empty_object() {
        let config = LedgerConfig::from_json_str("{}").unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.max_call_depth, DEFAULT_MAX_CALL_DEPTH);
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = LedgerConfig::from_json_str(r#"{"max_call_depth": 0}"#).unwrap_err();
        assert!(matches!(err, OwnershipError::Config(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = LedgerConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, OwnershipError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"max_call_depth": 3, "audit_log_path": "/tmp/audit.log"}}"#
        )
        .unwrap();

        let config = LedgerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_call_depth, 3);
        assert_eq!(config.audit_log_path, Some(PathBuf::from("/tmp/audit.log")));
    }

    #[test]
    fn test_missing_file_names_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("ledger.json");

        let err = LedgerConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, OwnershipError::Context(_)));
        assert!(err.to_string().contains("ledger.json"));
    }

    #[test]
    fn test_receipt_retention() {
        let config = LedgerConfig::from_json_str(r#"{"receipt_retention": 16}"#).unwrap();
        assert_eq!(config.receipt_retention, Some(16));
        assert_eq!(LedgerConfig::default().with_receipt_retention(16), config);
    }
}
