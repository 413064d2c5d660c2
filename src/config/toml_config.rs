use crate::core::client::{DEFAULT_API_URL, DEFAULT_TIMEOUT};
use crate::core::time_unit::TimeUnit;
use crate::core::ConfigProvider;
use crate::utils::error::{CrptError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub api: ApiConfig,
    pub rate_limit: RateLimitConfig,
    pub run: Option<RunConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub timeout_seconds: Option<u64>,
    pub token: Option<String>,
    pub headers: Option<HashMap<String, String>>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_seconds: None,
            token: None,
            headers: None,
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_API_URL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub request_limit: usize,
    pub period: u64,
    #[serde(default)]
    pub time_unit: TimeUnit,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    pub document: Option<String>,
    pub count: Option<usize>,
    pub receipts: Option<String>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CrptError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CrptError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value. Unset variables are left
    /// as-is and caught by `validate`.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CrptError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn run(&self) -> RunConfig {
        self.run.clone().unwrap_or_default()
    }
}

fn check_substituted(field: &str, value: &str) -> Result<()> {
    if value.contains("${") {
        return Err(CrptError::ConfigValidationError {
            field: field.to_string(),
            message: format!("Unresolved environment variable in '{}'", value),
        });
    }
    Ok(())
}

impl ConfigProvider for TomlConfig {
    fn api_endpoint(&self) -> &str {
        &self.api.endpoint
    }

    fn request_limit(&self) -> usize {
        self.rate_limit.request_limit
    }

    fn period(&self) -> Duration {
        self.rate_limit.time_unit.to_duration(self.rate_limit.period)
    }

    fn timeout(&self) -> Duration {
        self.api
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    fn headers(&self) -> HashMap<String, String> {
        self.api.headers.clone().unwrap_or_default()
    }

    fn auth_token(&self) -> Option<&str> {
        self.api.token.as_deref()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        check_substituted("api.endpoint", &self.api.endpoint)?;
        validation::validate_url("api.endpoint", &self.api.endpoint)?;

        if let Some(timeout) = self.api.timeout_seconds {
            validation::validate_range("api.timeout_seconds", timeout, 1, 600)?;
        }
        if let Some(token) = &self.api.token {
            check_substituted("api.token", token)?;
            validation::validate_non_empty_string("api.token", token)?;
        }
        if let Some(headers) = &self.api.headers {
            for (key, value) in headers {
                check_substituted(&format!("api.headers.{}", key), value)?;
            }
        }

        validation::validate_positive_number(
            "rate_limit.request_limit",
            self.rate_limit.request_limit,
            1,
        )?;
        validation::validate_non_zero_duration("rate_limit.period", self.period())?;

        let run = self.run();
        if let Some(document) = &run.document {
            validation::validate_path("run.document", document)?;
        }
        if let Some(count) = run.count {
            validation::validate_positive_number("run.count", count, 1)?;
        }
        if let Some(receipts) = &run.receipts {
            validation::validate_path("run.receipts", receipts)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_full_config() {
        let config = TomlConfig::from_toml_str(
            r#"
            [api]
            endpoint = "https://markirovka.demo.crpt.tech/api/v3/lk/documents/create"
            timeout_seconds = 15
            token = "abc"

            [api.headers]
            X-Client-Id = "warehouse-7"

            [rate_limit]
            request_limit = 20
            period = 500
            time_unit = "milliseconds"

            [run]
            count = 50
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.request_limit(), 20);
        assert_eq!(config.period(), Duration::from_millis(500));
        assert_eq!(config.timeout(), Duration::from_secs(15));
        assert_eq!(config.auth_token(), Some("abc"));
        assert_eq!(
            config.headers().get("X-Client-Id").map(String::as_str),
            Some("warehouse-7")
        );
        assert_eq!(config.run().count, Some(50));
    }

    #[test]
    fn test_defaults_for_optional_sections() {
        let config = TomlConfig::from_toml_str(
            r#"
            [rate_limit]
            request_limit = 10
            period = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.api_endpoint(), DEFAULT_API_URL);
        assert_eq!(config.period(), Duration::from_secs(1));
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert!(config.auth_token().is_none());
        assert!(config.run().document.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_substitutes_env_vars() {
        std::env::set_var("CRPT_API_TEST_TOKEN_SUBST", "from-env");
        let config = TomlConfig::from_toml_str(
            r#"
            [api]
            token = "${CRPT_API_TEST_TOKEN_SUBST}"

            [rate_limit]
            request_limit = 1
            period = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.auth_token(), Some("from-env"));
    }

    #[test]
    fn test_unresolved_env_var_fails_validation() {
        let config = TomlConfig::from_toml_str(
            r#"
            [api]
            token = "${CRPT_API_TEST_TOKEN_NEVER_SET}"

            [rate_limit]
            request_limit = 1
            period = 1
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.validate(),
            Err(CrptError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_limit() {
        let config = TomlConfig::from_toml_str(
            r#"
            [rate_limit]
            request_limit = 0
            period = 1
            "#,
        )
        .unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            TomlConfig::from_toml_str("rate_limit = ["),
            Err(CrptError::ConfigValidationError { .. })
        ));
    }
}
