use crate::adapters::HttpDocumentSender;
use crate::core::rate_limiter::RateLimiter;
use crate::core::time_unit::TimeUnit;
use crate::domain::model::Document;
use crate::domain::ports::{ConfigProvider, DocumentSender, SendReceipt};
use crate::utils::error::Result;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DEFAULT_API_URL: &str = "https://ismp.crpt.ru/api/v3/lk/documents/create";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Thread-safe CRPT API client. Requests beyond `request_limit` per period
/// block until the next window opens; they are never rejected.
pub struct CrptApi<S: DocumentSender = HttpDocumentSender> {
    sender: Arc<S>,
    limiter: RateLimiter,
}

impl<S: DocumentSender> Clone for CrptApi<S> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            limiter: self.limiter.clone(),
        }
    }
}

impl CrptApi<HttpDocumentSender> {
    /// At most `request_limit` requests per `period_limit` `time_unit`s,
    /// sent to [`DEFAULT_API_URL`].
    pub fn new(request_limit: usize, period_limit: u64, time_unit: TimeUnit) -> Result<Self> {
        let sender = HttpDocumentSender::new(DEFAULT_API_URL, DEFAULT_TIMEOUT)?;
        let limiter = RateLimiter::new(request_limit, time_unit.to_duration(period_limit))?;
        Ok(Self::with_sender(sender, limiter))
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        let sender = HttpDocumentSender::new(config.api_endpoint(), config.timeout())?
            .with_headers(&config.headers())?
            .with_auth_token(config.auth_token().map(str::to_string));
        let limiter = RateLimiter::new(config.request_limit(), config.period())?;

        tracing::info!(
            "CRPT client ready: {} (limit {} per {:?})",
            config.api_endpoint(),
            config.request_limit(),
            config.period()
        );

        Ok(Self::with_sender(sender, limiter))
    }
}

impl<S: DocumentSender + 'static> CrptApi<S> {
    pub fn with_sender(sender: S, limiter: RateLimiter) -> Self {
        Self {
            sender: Arc::new(sender),
            limiter,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// Creates a document, waiting for a free slot in the rate window first.
    pub async fn create_document(&self, document: &Document) -> Result<SendReceipt> {
        self.limiter.acquire().await?;
        tracing::debug!(
            "Sending document {} ({} permits left in window)",
            document.doc_id,
            self.limiter.available_permits()
        );
        self.sender.send(document).await
    }

    /// Waits for a slot on the calling task, then performs the request in the
    /// background.
    pub async fn submit_document(
        &self,
        document: Document,
    ) -> Result<JoinHandle<Result<SendReceipt>>> {
        self.limiter.acquire().await?;
        tracing::debug!(
            "Submitting document {} ({} permits left in window)",
            document.doc_id,
            self.limiter.available_permits()
        );

        let sender = self.sender.clone();
        Ok(tokio::spawn(async move { sender.send(&document).await }))
    }

    /// Sends a batch concurrently under the rate limit. Results keep the
    /// order of `documents`.
    pub async fn create_documents<I>(&self, documents: I) -> Vec<Result<SendReceipt>>
    where
        I: IntoIterator<Item = Document>,
    {
        self.create_documents_with(documents, |_, _| {}).await
    }

    /// Like [`create_documents`](Self::create_documents), but hands each
    /// result to `on_result` as soon as it is known, in input order.
    ///
    /// Documents are pulled from `documents` lazily; at most `request_limit`
    /// requests are in flight at once.
    pub async fn create_documents_with<I, F>(
        &self,
        documents: I,
        mut on_result: F,
    ) -> Vec<Result<SendReceipt>>
    where
        I: IntoIterator<Item = Document>,
        F: FnMut(usize, &Result<SendReceipt>),
    {
        let max_in_flight = self.limiter.request_limit();
        let mut in_flight: VecDeque<JoinHandle<Result<SendReceipt>>> = VecDeque::new();
        let mut results = Vec::new();

        for document in documents {
            if in_flight.len() >= max_in_flight {
                if let Some(handle) = in_flight.pop_front() {
                    let result = finish(handle).await;
                    on_result(results.len(), &result);
                    results.push(result);
                }
            }

            let api = self.clone();
            in_flight.push_back(tokio::spawn(async move {
                api.create_document(&document).await
            }));
        }

        while let Some(handle) = in_flight.pop_front() {
            let result = finish(handle).await;
            on_result(results.len(), &result);
            results.push(result);
        }
        results
    }
}

async fn finish(handle: JoinHandle<Result<SendReceipt>>) -> Result<SendReceipt> {
    handle.await.unwrap_or_else(|e| Err(e.into()))
}
