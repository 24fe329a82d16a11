//! CLI module for docregistry
//!
//! Provides command-line interface for:
//! - init: Create the data directory
//! - serve: Open the store and serve it over HTTP
//! - call: Run one request from stdin through the gateway
//! - check: Reconcile the store and print region counts

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{call, check, init, run, run_command, serve};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{parse_call_request, read_request, render_response, write_json, write_response};
