//! schemadiff binary
//!
//! Compares the schemas configured through the environment, writes the
//! `info` and `errors` documents and reports the verdict through the exit
//! status: 0 when the schemas match, 1 when they differ, 2 on failure.

use schemadiff::config::Settings;
use schemadiff::{compare_with, AppError, CompareOptions};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            match e.downcast_ref::<AppError>() {
                Some(app) => error!(code = app.code(), "{}", app),
                None => error!("{:#}", e),
            }
            ExitCode::from(2)
        }
    }
}

async fn run() -> anyhow::Result<bool> {
    let settings = Settings::load()?;
    info!("Configuration loaded successfully");

    let options = CompareOptions {
        schema: settings.sources.schema.clone(),
        max_pool_size: settings.sources.max_pool_size,
        ignore_tables: settings.ignore_tables.clone(),
    };

    let result = compare_with(
        &settings.sources.left_uri,
        &settings.sources.right_uri,
        &settings.ignores,
        &options,
    )
    .await?;

    result.dump_info(&settings.output.info_file)?;
    result.dump_errors(&settings.output.errors_file)?;
    info!(
        "Wrote {} and {}",
        settings.output.info_file.display(),
        settings.output.errors_file.display()
    );

    if result.is_match() {
        info!("Schemas match");
    } else {
        warn!(
            "Schemas differ: {} table(s) with element mismatches",
            result.errors.tables_data.len()
        );
    }

    Ok(result.is_match())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,schemadiff=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}
