pub mod client;
pub mod rate_limiter;
pub mod receipt_log;
pub mod single_thread_pool;
pub mod time_unit;

pub use crate::domain::model::{Description, Document, Product};
pub use crate::domain::ports::{ConfigProvider, DocumentSender, SendReceipt};
pub use crate::utils::error::Result;
