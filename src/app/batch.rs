use crate::core::client::CrptApi;
use crate::core::receipt_log::{ReceiptEntry, ReceiptLog};
use crate::core::{Document, DocumentSender};
use crate::utils::error::{CrptError, Result};
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct BatchSummary {
    pub sent: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub receipts_path: Option<PathBuf>,
    pub errors: Vec<CrptError>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// The error whose severity should decide the exit code.
    pub fn worst_error(&self) -> Option<&CrptError> {
        self.errors.iter().max_by_key(|e| e.severity())
    }
}

/// Sends `count` copies of `document` through `api`. When `receipts` is
/// given, each result is appended to that file as soon as it is known.
pub async fn send_batch<S: DocumentSender + 'static>(
    api: &CrptApi<S>,
    document: &Document,
    count: usize,
    receipts: Option<PathBuf>,
) -> Result<BatchSummary> {
    document.validate()?;

    let log = match receipts {
        Some(path) => Some(ReceiptLog::create(path).await?),
        None => None,
    };
    if let Some(log) = &log {
        tracing::info!("📁 Recording receipts in {}", log.path().display());
    }
    let start = Instant::now();

    tracing::info!(
        "🚀 Sending {} document(s), limit {} per {:?}",
        count,
        api.limiter().request_limit(),
        api.limiter().period()
    );

    let mut sent = 0;
    let mut record_error = None;

    let documents = (0..count).map(|_| document.clone());
    let results = api
        .create_documents_with(documents, |index, result| {
            if let Some(log) = &log {
                let entry = ReceiptEntry::from_result(index, &document.doc_id, result);
                if let Err(e) = log.record(&entry) {
                    record_error.get_or_insert(e);
                }
            }
            match result {
                Ok(receipt) => {
                    sent += 1;
                    tracing::debug!("Request {} accepted with status {}", index + 1, receipt.status);
                }
                Err(e) => tracing::warn!("Request {} failed: {}", index + 1, e),
            }
        })
        .await;
    let errors: Vec<CrptError> = results.into_iter().filter_map(|result| result.err()).collect();

    let receipts_path = match log {
        Some(log) => Some(log.close().await?),
        None => None,
    };
    if let Some(e) = record_error {
        return Err(e);
    }
    let elapsed = start.elapsed();

    tracing::info!(
        "📊 Sent {} of {} in {:?} ({} failed)",
        sent,
        count,
        elapsed,
        errors.len()
    );

    Ok(BatchSummary {
        sent,
        failed: errors.len(),
        elapsed,
        receipts_path,
        errors,
    })
}
