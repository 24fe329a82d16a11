//! CLI command implementations

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crate::http_server::HttpServer;
use crate::observability::{log_event, log_event_with_fields, Event};
use crate::protocol::Gateway;
use crate::registry::DocumentStore;

use super::args::Command;
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{read_request, render_response, write_json, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Serve { config, port } => serve(&config, port),
        Command::Call { config } => call(&config),
        Command::Check { config } => check(&config),
    }
}

/// Initialize a new registry data directory
///
/// Creates `<data_dir>/regions`. Region logs are created on first open.
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;

    if config.is_initialized() {
        return Err(CliError::already_initialized());
    }

    let dir = config.regions_path();
    fs::create_dir_all(&dir).map_err(|e| {
        CliError::config_error(format!("Failed to create directory {:?}: {}", dir, e))
    })?;

    write_response(json!({"initialized": true, "data_dir": config.data_dir}))
}

/// Open the store and build the gateway over it
fn boot(config_path: &Path) -> CliResult<(Config, Gateway)> {
    log_event(Event::BootStart);

    let config = Config::load(config_path)?;
    log_event_with_fields(Event::ConfigLoaded, &[("data_dir", &config.data_dir)]);

    if !config.is_initialized() {
        return Err(CliError::not_initialized());
    }

    let store = DocumentStore::open(config.data_path())?;
    let gateway = Gateway::new(store)?;

    log_event(Event::BootComplete);
    Ok((config, gateway))
}

/// Serve the registry over HTTP until Ctrl-C
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let (config, gateway) = boot(config_path)?;

    let mut http_config = config.http.clone();
    if let Some(port) = port {
        http_config.port = port;
    }
    let server = HttpServer::new(http_config, Arc::new(gateway));

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Run one stdin request through both channels and print the envelope
pub fn call(config_path: &Path) -> CliResult<()> {
    let (_config, gateway) = boot(config_path)?;
    let request = read_request()?;
    let response = gateway.handle(&request);
    write_json(&render_response(&response))
}

/// Open the store (running the reconciler) and report
pub fn check(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    if !config.is_initialized() {
        return Err(CliError::not_initialized());
    }

    let (store, report) = DocumentStore::open_checked(config.data_path())?;

    write_response(json!({
        "clean": report.is_clean(),
        "reconcile": report,
        "regions": store.stats(),
    }))
}
