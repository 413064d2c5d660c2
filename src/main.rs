use clap::Parser;
use crpt_api::app::batch::send_batch;
use crpt_api::utils::error::ErrorSeverity;
use crpt_api::utils::{logger, validation::Validate};
use crpt_api::config::toml_config::RunConfig;
use crpt_api::{CliConfig, ConfigProvider, CrptApi, CrptError, Document, TomlConfig};
use std::path::PathBuf;

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(e: &CrptError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(e.severity()));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let logger = if cli.json_logs {
        logger::init_json_logger()
    } else {
        logger::init_cli_logger(cli.verbose)
    };
    if let Err(e) = logger {
        fail(&e);
    }

    tracing::info!("Starting crpt-api");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = cli.validate() {
        fail(&e);
    }

    // A TOML file replaces the connection and rate settings; run settings on
    // the command line still win.
    let (provider, run) =
        match &cli.config {
            Some(path) => {
                let toml = TomlConfig::from_file(path).unwrap_or_else(|e| fail(&e));
                if let Err(e) = toml.validate() {
                    fail(&e);
                }
                let run = cli.run_settings(toml.run());
                (Box::new(toml) as Box<dyn ConfigProvider>, run)
            }
            None => (
                Box::new(cli.clone()) as Box<dyn ConfigProvider>,
                cli.run_settings(RunConfig::default()),
            ),
        };
    let count = run.count.unwrap_or(1);

    let document = match &run.document {
        Some(path) => Document::from_file(path).unwrap_or_else(|e| fail(&e)),
        None => {
            tracing::info!("No document given, using the built-in sample");
            Document::sample()
        }
    };

    let api = CrptApi::from_config(provider.as_ref()).unwrap_or_else(|e| fail(&e));

    let summary = send_batch(&api, &document, count, run.receipts.map(PathBuf::from))
        .await
        .unwrap_or_else(|e| fail(&e));

    println!(
        "✅ Sent {} of {} document(s) in {:?}",
        summary.sent, count, summary.elapsed
    );
    if let Some(path) = &summary.receipts_path {
        println!("📁 Receipts saved to: {}", path.display());
    }

    if !summary.is_success() {
        eprintln!("⚠️  {} request(s) failed", summary.failed);
        if let Some(e) = summary.worst_error() {
            fail(e);
        }
    }

    Ok(())
}
