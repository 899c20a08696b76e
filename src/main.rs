//! URL rewrite server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ RewriteLayer ──▶ axum Router ──▶ route rewrite ──▶ echo
//!                      (RuleSet)        (routes)      (current route)
//!                          ▲
//!                          │ swap
//!                   ConfigWatcher / SIGHUP
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use url_rewrite::config::{build_rule_set, load_config, ConfigWatcher, RewriteConfig};
use url_rewrite::http::RewriteServer;
use url_rewrite::lifecycle::{Shutdown, Signals};
use url_rewrite::observability::init_logging;

#[derive(Debug, Parser)]
#[command(name = "url-rewrite", version, about = "URL rewriting server")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Validate and compile the rules, print them, and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RewriteConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability)?;
    let logger = tracing::dispatcher::get_default(|d| d.clone());

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        rules = config.rules.len(),
        routes = config.routes.len(),
        "Configuration loaded"
    );

    let rules = build_rule_set(&config, Some(&logger))?;

    if cli.check {
        for rule in rules.rules() {
            let source = rule
                .route()
                .map(|r| r.pattern().to_string())
                .unwrap_or_else(|| "<current route>".to_string());
            println!(
                "{}: {} -> {} [{}]",
                rule.name(),
                source,
                rule.destination().as_str(),
                rule.methods()
            );
        }
        println!("{} rule(s) OK", rules.len());
        return Ok(());
    }

    let bind_address = config.listener.bind_address.clone();
    let server = RewriteServer::new(config, rules, Some(&logger))?;

    let shutdown = Shutdown::new();
    let signals = Signals::register()?;
    let _watcher = match &cli.config {
        Some(path) => {
            let handle = server.rules();
            let reloader = ConfigWatcher::new(path, handle.clone(), Some(logger.clone()));
            let sighup = ConfigWatcher::new(path, handle, Some(logger.clone()));
            tokio::spawn(signals.run(shutdown.clone(), move || match sighup.reload() {
                Ok(count) => tracing::info!(rules = count, "Rewrite rules reloaded"),
                Err(e) => tracing::error!(error = %e, "Failed to reload rewrite rules, keeping current set"),
            }));
            Some(reloader.run()?)
        }
        None => {
            tokio::spawn(signals.run(shutdown.clone(), || {
                tracing::warn!("No configuration file to reload");
            }));
            None
        }
    };

    let listener = TcpListener::bind(&bind_address).await?;
    server.run(listener, shutdown.signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
