//! couch-admin entry point

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use couch_admin::cli::Cli;
use couch_admin::{AdminConfig, ClusterAdministrator};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            e.print()?;
            return Ok(code);
        }
    };

    let mut config = match &cli.config {
        Some(path) => AdminConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AdminConfig::default(),
    };
    config.merge(cli.overrides());

    // Initialize logging
    let level = match config.log.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let operation = match cli.command.validate() {
        Ok(op) => op,
        Err(e) => {
            error!(kind = %e.kind(), "{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    info!(server = %config.server.host, user = %config.credentials.username, "Connecting");
    let admin = ClusterAdministrator::new(&config).context("building HTTP client")?;

    match admin.run(operation).await {
        Ok(output) => {
            print!("{}", output);
            if !output.ends_with('\n') {
                println!();
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(kind = %e.kind(), "{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
