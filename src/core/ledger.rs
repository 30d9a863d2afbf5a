//! Append-only outcome ledger with file-based persistence.
//!
//! Rows are stored as newline-delimited JSON (JSONL), one file per logical
//! table. Every `put` appends; nothing is ever rewritten, so running the
//! same submission twice leaves two rows.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::domain::LedgerRecord;

/// Logical table holding one row per invocation
pub const LEDGER_TABLE: &str = "assignment-submissions";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode ledger row: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt ledger row at line {line}: {source}")]
    Corrupt {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Durable key-value ledger
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Append one row
    async fn put(&self, record: &LedgerRecord) -> Result<(), LedgerError>;

    /// All rows in write order
    async fn scan(&self) -> Result<Vec<LedgerRecord>, LedgerError>;

    /// Rows for one submission, oldest first
    async fn find(&self, submission_id: &str) -> Result<Vec<LedgerRecord>, LedgerError> {
        let rows = self.scan().await?;
        Ok(rows
            .into_iter()
            .filter(|r| r.submission_id == submission_id)
            .collect())
    }
}

/// JSONL file ledger
pub struct JsonlLedger {
    /// Path to the table file
    table_path: PathBuf,
}

impl JsonlLedger {
    /// Ledger rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            table_path: dir.as_ref().join(format!("{}.jsonl", LEDGER_TABLE)),
        }
    }

    pub fn table_path(&self) -> &Path {
        &self.table_path
    }

    fn io_error(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.table_path.clone(),
            source,
        }
    }
}

#[async_trait]
impl Ledger for JsonlLedger {
    async fn put(&self, record: &LedgerRecord) -> Result<(), LedgerError> {
        if let Some(parent) = self.table_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.table_path)
            .await
            .map_err(|e| self.io_error(e))?;

        // Single write per row so concurrent appenders do not interleave
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))?;

        Ok(())
    }

    async fn scan(&self) -> Result<Vec<LedgerRecord>, LedgerError> {
        if !self.table_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.table_path)
            .await
            .map_err(|e| self.io_error(e))?;

        let mut lines = BufReader::new(file).lines();
        let mut rows = Vec::new();
        let mut line_no = 0usize;

        while let Some(line) = lines.next_line().await.map_err(|e| self.io_error(e))? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let row = serde_json::from_str(&line).map_err(|source| LedgerError::Corrupt {
                line: line_no,
                source,
            })?;
            rows.push(row);
        }

        Ok(rows)
    }
}

/// Ledger kept in memory
#[derive(Default)]
pub struct MemoryLedger {
    rows: Mutex<Vec<LedgerRecord>>,
    unavailable: Option<String>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger that fails every operation
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Default::default()
        }
    }

    fn check(&self) -> Result<(), LedgerError> {
        match &self.unavailable {
            Some(reason) => Err(LedgerError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn put(&self, record: &LedgerRecord) -> Result<(), LedgerError> {
        self.check()?;
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<LedgerRecord>, LedgerError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}
