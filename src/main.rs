use std::env;

use clap::Parser;
use taskline::cli::commands::Cli;
use taskline::cli::handlers;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    let cli = Cli::parse();
    init_tracing(handlers::configured_log_filter(cli.project_dir.as_deref()));

    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so they never mix with command output.
fn init_tracing(configured: Option<String>) {
    let filter = EnvFilter::try_from_env("TASKLINE_LOG").unwrap_or_else(|_| {
        EnvFilter::try_new(configured.as_deref().unwrap_or("warn"))
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    });

    let format = env::var("TASKLINE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}
