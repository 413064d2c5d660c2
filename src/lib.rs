pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::HttpDocumentSender;
pub use crate::core::{
    client::CrptApi, rate_limiter::RateLimiter, single_thread_pool::SingleThreadPool,
    time_unit::TimeUnit,
};
pub use domain::model::{Description, Document, Product};
pub use domain::ports::{ConfigProvider, DocumentSender, SendReceipt};
pub use utils::error::{CrptError, Result};
