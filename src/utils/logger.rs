use crate::utils::error::{CrptError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` wins; otherwise this crate logs at info, or debug when verbose.
fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "crpt_api=debug,info" } else { "crpt_api=info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn already_set(e: impl std::fmt::Display) -> CrptError {
    CrptError::ConfigError {
        message: format!("Failed to install logger: {}", e),
    }
}

pub fn init_cli_logger(verbose: bool) -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init()
        .map_err(already_set)
}

/// One JSON object per event, for log collectors.
pub fn init_json_logger() -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_names(true)
                .json(),
        )
        .try_init()
        .map_err(already_set)
}
