use crate::domain::model::Document;
use crate::domain::ports::{DocumentSender, SendReceipt};
use crate::utils::error::{CrptError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

/// Delivers documents to the CRPT API with a JSON POST.
#[derive(Debug, Clone)]
pub struct HttpDocumentSender {
    client: Client,
    endpoint: String,
    headers: HeaderMap,
    auth_token: Option<String>,
}

impl HttpDocumentSender {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            headers: HeaderMap::new(),
            auth_token: None,
        })
    }

    pub fn with_headers(mut self, headers: &HashMap<String, String>) -> Result<Self> {
        for (key, value) in headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                CrptError::InvalidConfigValueError {
                    field: "headers".to_string(),
                    value: key.clone(),
                    reason: format!("Invalid header name: {}", e),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                CrptError::InvalidConfigValueError {
                    field: format!("headers.{}", key),
                    value: value.clone(),
                    reason: format!("Invalid header value: {}", e),
                }
            })?;
            self.headers.insert(name, value);
        }
        Ok(self)
    }

    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DocumentSender for HttpDocumentSender {
    async fn send(&self, document: &Document) -> Result<SendReceipt> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .json(document);

        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        tracing::debug!("📡 POST {} (doc_id={})", self.endpoint, document.doc_id);

        let response = request.send().await?;
        let status = response.status();
        let sent_at = chrono::Utc::now();
        let text = response.text().await?;

        tracing::debug!("📡 API response status: {}", status);

        if !status.is_success() {
            return Err(CrptError::ApiStatusError {
                status: status.as_u16(),
                body: text,
            });
        }

        // Non-JSON bodies are accepted but not kept.
        let body = if text.trim().is_empty() {
            None
        } else {
            serde_json::from_str(&text).ok()
        };

        Ok(SendReceipt {
            status: status.as_u16(),
            body,
            sent_at,
        })
    }
}
