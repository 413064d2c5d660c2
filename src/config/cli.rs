use crate::core::client::DEFAULT_API_URL;
use crate::core::time_unit::TimeUnit;
use crate::config::toml_config::RunConfig;
use crate::core::ConfigProvider;
use crate::utils::error::{CrptError, Result};
use crate::utils::validation::{self, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "crpt-api")]
#[command(about = "Rate-limited client for the CRPT document API")]
pub struct CliConfig {
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_endpoint: String,

    #[arg(long, default_value = "10", help = "Maximum requests per period")]
    pub request_limit: usize,

    #[arg(long, default_value = "1", help = "Length of the rate window")]
    pub period: u64,

    #[arg(long, value_enum, default_value = "seconds")]
    pub time_unit: TimeUnit,

    #[arg(long, default_value = "30")]
    pub timeout_seconds: u64,

    #[arg(long, help = "Bearer token for the API")]
    pub token: Option<String>,

    #[arg(long, help = "Extra header as KEY=VALUE; repeat for more")]
    pub headers: Vec<String>,

    #[arg(long, help = "Document JSON file; the built-in sample is used if omitted")]
    pub document: Option<String>,

    #[arg(long, help = "How many times to send the document [default: 1]")]
    pub count: Option<usize>,

    #[arg(long, help = "Write one JSON line per receipt to this file")]
    pub receipts: Option<String>,

    #[arg(long, help = "Load settings from a TOML file")]
    pub config: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

/// Splits `KEY=VALUE` pairs.
pub fn parse_headers(raw: &[String]) -> Result<HashMap<String, String>> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| CrptError::InvalidConfigValueError {
                    field: "headers".to_string(),
                    value: pair.clone(),
                    reason: "Expected KEY=VALUE".to_string(),
                })
        })
        .collect()
}

impl CliConfig {
    /// Run settings given on the command line win over those from a file.
    pub fn run_settings(&self, file: RunConfig) -> RunConfig {
        RunConfig {
            document: self.document.clone().or(file.document),
            count: self.count.or(file.count),
            receipts: self.receipts.clone().or(file.receipts),
        }
    }
}

impl ConfigProvider for CliConfig {
    fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    fn request_limit(&self) -> usize {
        self.request_limit
    }

    fn period(&self) -> Duration {
        self.time_unit.to_duration(self.period)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn headers(&self) -> HashMap<String, String> {
        // Malformed pairs are rejected by `validate`.
        parse_headers(&self.headers).unwrap_or_default()
    }

    fn auth_token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("api_endpoint", &self.api_endpoint)?;
        validation::validate_positive_number("request_limit", self.request_limit, 1)?;
        validation::validate_non_zero_duration("period", self.period())?;
        validation::validate_range("timeout_seconds", self.timeout_seconds, 1, 600)?;
        if let Some(count) = self.count {
            validation::validate_positive_number("count", count, 1)?;
        }
        parse_headers(&self.headers)?;

        if let Some(document) = &self.document {
            validation::validate_path("document", document)?;
        }
        if let Some(receipts) = &self.receipts {
            validation::validate_path("receipts", receipts)?;
        }
        if let Some(token) = &self.token {
            validation::validate_non_empty_string("token", token)?;
        }

        Ok(())
    }
}
