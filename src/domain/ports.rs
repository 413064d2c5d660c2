use crate::domain::model::Document;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct SendReceipt {
    pub status: u16,
    pub body: Option<serde_json::Value>,
    pub sent_at: DateTime<Utc>,
}

#[async_trait]
pub trait DocumentSender: Send + Sync {
    async fn send(&self, document: &Document) -> Result<SendReceipt>;
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn request_limit(&self) -> usize;
    fn period(&self) -> Duration;
    fn timeout(&self) -> Duration;
    fn headers(&self) -> HashMap<String, String>;
    fn auth_token(&self) -> Option<&str>;
}
