use crate::core::single_thread_pool::SingleThreadPool;
use crate::domain::ports::SendReceipt;
use crate::utils::error::{CrptError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One line of the receipt log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptEntry {
    pub index: usize,
    pub doc_id: String,
    pub status: Option<u16>,
    pub sent_at: Option<DateTime<Utc>>,
    pub body: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl ReceiptEntry {
    pub fn from_result(index: usize, doc_id: &str, result: &Result<SendReceipt>) -> Self {
        match result {
            Ok(receipt) => Self {
                index,
                doc_id: doc_id.to_string(),
                status: Some(receipt.status),
                sent_at: Some(receipt.sent_at),
                body: receipt.body.clone(),
                error: None,
            },
            Err(e) => Self {
                index,
                doc_id: doc_id.to_string(),
                status: match e {
                    CrptError::ApiStatusError { status, .. } => Some(*status),
                    _ => None,
                },
                sent_at: None,
                body: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Appends receipts as JSON lines. File writes happen on a dedicated worker
/// thread so callers on the async runtime never block on disk IO.
pub struct ReceiptLog {
    path: PathBuf,
    pool: SingleThreadPool,
    writer: Arc<Mutex<BufWriter<File>>>,
}

impl ReceiptLog {
    /// Creates the file, and any missing parent directories, off the runtime.
    pub async fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        tokio::task::spawn_blocking(move || Self::create_blocking(path)).await?
    }

    fn create_blocking(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(&path)?;
        let mut pool = SingleThreadPool::new("crpt-receipts");
        pool.start()?;

        tracing::debug!("Writing receipts to {}", path.display());

        Ok(Self {
            path,
            pool,
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    /// Queues one line. Each line is flushed once written, so the file
    /// reflects every receipt recorded so far.
    pub fn record(&self, entry: &ReceiptEntry) -> Result<()> {
        let line = serde_json::to_string(entry)?;
        let writer = self.writer.clone();
        let path = self.path.clone();

        self.pool.submit(move || {
            let mut writer = match writer.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
                tracing::warn!("Failed to write receipt to {}: {}", path.display(), e);
            }
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Waits for queued writes and flushes the file.
    pub async fn close(self) -> Result<PathBuf> {
        tokio::task::spawn_blocking(move || self.close_blocking()).await?
    }

    fn close_blocking(mut self) -> Result<PathBuf> {
        self.pool.stop()?;
        let mut writer = self.writer.lock().map_err(|_| CrptError::PoolError {
            message: "receipt writer lock poisoned".to_string(),
        })?;
        writer.flush()?;
        Ok(self.path.clone())
    }
}
