use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::OwnershipError;
use crate::events::{verify_entries, AuditEntry};

/// Largest serialized entry the reader accepts. A longer length prefix means the file is corrupt.
pub const MAX_ENTRY_SIZE: u64 = 1 << 20;

/// Durable destination for committed audit entries
pub trait AuditSink: Send + Sync {
    /// Record every entry of one invocation, or none of them
    fn record_batch(&self, entries: &[AuditEntry]) -> Result<(), OwnershipError>;

    /// Record one committed entry
    fn record(&self, entry: &AuditEntry) -> Result<(), OwnershipError> {
        self.record_batch(std::slice::from_ref(entry))
    }

    /// Get an iterator over all recorded entries, oldest first
    fn iterate_entries(&self) -> Box<dyn Iterator<Item = Result<AuditEntry, OwnershipError>> + '_>;

    /// True if nothing has been recorded yet
    fn is_empty(&self) -> Result<bool, OwnershipError> {
        match self.iterate_entries().next() {
            None => Ok(true),
            Some(Ok(_)) => Ok(false),
            Some(Err(e)) => Err(e),
        }
    }

    /// Read every entry back and check the hash chain
    fn verify(&self) -> Result<bool, OwnershipError> {
        let entries = self.iterate_entries().collect::<Result<Vec<_>, _>>()?;
        verify_entries(&entries)
    }
}

/// Audit sink kept in memory
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record_batch(&self, entries: &[AuditEntry]) -> Result<(), OwnershipError> {
        let mut recorded = self
            .entries
            .lock()
            .map_err(|e| OwnershipError::Lock(format!("in-memory audit sink: {}", e)))?;
        recorded.extend_from_slice(entries);
        Ok(())
    }

    fn iterate_entries(&self) -> Box<dyn Iterator<Item = Result<AuditEntry, OwnershipError>> + '_> {
        let entries = match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(e) => {
                return Box::new(std::iter::once(Err(OwnershipError::Lock(format!(
                    "in-memory audit sink: {}",
                    e
                )))))
            }
        };
        Box::new(entries.into_iter().map(Ok::<AuditEntry, OwnershipError>))
    }
}

/// Append-only audit log file of length-prefixed bincode records
pub struct FileAuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileAuditLog {
    /// Open (or create) the log at `path`, appending after existing records
    pub fn open(path: &Path) -> Result<Self, OwnershipError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileAuditLog {
    fn record_batch(&self, entries: &[AuditEntry]) -> Result<(), OwnershipError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut buffer = Vec::new();
        for entry in entries {
            let serialized = bincode::serialize(entry)?;
            buffer.extend_from_slice(&(serialized.len() as u64).to_le_bytes());
            buffer.extend_from_slice(&serialized);
        }

        let mut file = self
            .file
            .lock()
            .map_err(|e| OwnershipError::Lock(format!("audit log {}: {}", self.path.display(), e)))?;

        let start = file.metadata()?.len();
        let written = file.write_all(&buffer).and_then(|_| file.flush());
        if let Err(e) = written {
            // Cut off a partially written batch
            file.set_len(start)?;
            return Err(e.into());
        }

        Ok(())
    }

    fn iterate_entries(&self) -> Box<dyn Iterator<Item = Result<AuditEntry, OwnershipError>> + '_> {
        let opened = File::open(&self.path).and_then(|file| {
            let remaining = file.metadata()?.len();
            Ok((file, remaining))
        });
        match opened {
            Ok((file, remaining)) => Box::new(AuditEntryIterator {
                reader: BufReader::new(file),
                remaining,
                failed: false,
            }),
            Err(e) => Box::new(std::iter::once(Err(OwnershipError::from(e)))),
        }
    }

    fn is_empty(&self) -> Result<bool, OwnershipError> {
        Ok(std::fs::metadata(&self.path)?.len() == 0)
    }
}

/// Iterator over entries in an audit log file
struct AuditEntryIterator {
    reader: BufReader<File>,
    /// Bytes not yet consumed
    remaining: u64,
    /// Set after the first error; iteration stops there
    failed: bool,
}

impl AuditEntryIterator {
    fn fail(&mut self, err: OwnershipError) -> Option<Result<AuditEntry, OwnershipError>> {
        self.failed = true;
        Some(Err(err))
    }
}

impl Iterator for AuditEntryIterator {
    type Item = Result<AuditEntry, OwnershipError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == 0 {
            return None;
        }
        if self.remaining < 8 {
            let trailing = self.remaining;
            return self.fail(OwnershipError::Serialization(format!(
                "Corrupt audit log: {} trailing bytes",
                trailing
            )));
        }

        let mut len_buf = [0u8; 8];
        if let Err(e) = self.reader.read_exact(&mut len_buf) {
            return self.fail(e.into());
        }
        self.remaining -= 8;

        let entry_len = u64::from_le_bytes(len_buf);
        if entry_len > MAX_ENTRY_SIZE || entry_len > self.remaining {
            let remaining = self.remaining;
            return self.fail(OwnershipError::Serialization(format!(
                "Corrupt audit log: record of {} bytes with {} bytes left",
                entry_len, remaining
            )));
        }
        self.remaining -= entry_len;

        let mut entry_data = vec![0u8; entry_len as usize];
        if let Err(e) = self.reader.read_exact(&mut entry_data) {
            return self.fail(e.into());
        }

        match bincode::deserialize::<AuditEntry>(&entry_data) {
            Ok(entry) => Some(Ok(entry)),
            Err(e) => self.fail(e.into()),
        }
    }
}
