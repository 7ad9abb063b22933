//! yapd - one terminal dashboard for several Pi-hole instances.
//!
//! Reads encrypted endpoint credentials, keeps a session per Pi-hole and
//! prints fleet-wide query statistics.

mod commands;
mod output;

use std::io;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// When set, logs are also written to a daily-rolling file in this directory
const LOG_DIR_ENV: &str = "YAPD_LOG_DIR";

#[derive(Debug, Parser)]
#[command(name = "yapd", version, about = "Aggregate statistics from several Pi-hole instances")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store the credential-store passphrase in the OS keychain
    Init,
    /// Manage configured Pi-hole endpoints
    Endpoint {
        #[command(subcommand)]
        action: EndpointAction,
    },
    /// Change dashboard settings
    Settings {
        /// Endpoint used to check the dashboard password with pi-hole auth
        #[arg(long)]
        main_url: Option<String>,
        /// Check the dashboard password against a Pi-hole instead of a yapd password
        #[arg(long)]
        use_pihole_auth: Option<bool>,
        /// Prompt for a new yapd dashboard password
        #[arg(long)]
        set_password: bool,
    },
    /// Unlock the dashboard with the shared password
    Unlock,
    /// Lock the dashboard and drop all cached sessions
    Logout {
        /// Also remove the credential-store passphrase from the OS keychain
        #[arg(long)]
        forget_passphrase: bool,
    },
    /// Show or change runtime settings
    Config {
        /// Per-request deadline for upstream calls
        #[arg(long)]
        request_timeout_secs: Option<u64>,
        /// Accept self-signed upstream certificates
        #[arg(long)]
        accept_invalid_certs: Option<bool>,
        /// How long an unlocked dashboard stays unlocked
        #[arg(long)]
        dashboard_unlock_hours: Option<i64>,
    },
    /// Log in to every endpoint and show the sessions
    Connect,
    /// Merged query summary
    Summary {
        #[arg(long)]
        json: bool,
    },
    /// Merged activity history
    History {
        #[arg(long)]
        json: bool,
    },
    /// Summary and history together
    Report {
        #[arg(long)]
        json: bool,
    },
    /// Fetch any FTL resource from one endpoint, e.g. `stats/top_clients`
    Get {
        /// Resource path below /api/
        path: String,
        /// Endpoint URL, as configured
        #[arg(long)]
        url: String,
    },
}

#[derive(Debug, Subcommand)]
enum EndpointAction {
    /// Add or replace an endpoint; prompts for its password
    Add { url: String },
    /// Remove an endpoint
    Remove { url: String },
    /// List configured endpoints
    List,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "yapd.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing();
    info!("yapd starting");

    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Init => commands::init(),
        Command::Endpoint { action } => match action {
            EndpointAction::Add { url } => commands::endpoint_add(&url),
            EndpointAction::Remove { url } => commands::endpoint_remove(&url),
            EndpointAction::List => commands::endpoint_list(),
        },
        Command::Settings {
            main_url,
            use_pihole_auth,
            set_password,
        } => commands::settings(main_url, use_pihole_auth, set_password),
        Command::Unlock => commands::unlock().await,
        Command::Logout { forget_passphrase } => commands::logout(forget_passphrase),
        Command::Config {
            request_timeout_secs,
            accept_invalid_certs,
            dashboard_unlock_hours,
        } => commands::config(request_timeout_secs, accept_invalid_certs, dashboard_unlock_hours),
        Command::Connect => commands::connect().await,
        Command::Summary { json } => commands::summary(json).await,
        Command::History { json } => commands::history(json).await,
        Command::Report { json } => commands::report(json).await,
        Command::Get { path, url } => commands::get(&url, &path).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_get() {
        let cli = Cli::try_parse_from(["yapd", "get", "stats/top_clients", "--url", "http://pi.hole"])
            .expect("parses");
        match cli.command {
            Command::Get { path, url } => {
                assert_eq!(path, "stats/top_clients");
                assert_eq!(url, "http://pi.hole");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_logout_and_config() {
        let cli = Cli::try_parse_from(["yapd", "logout", "--forget-passphrase"]).expect("parses");
        assert!(matches!(cli.command, Command::Logout { forget_passphrase: true }));

        let cli = Cli::try_parse_from(["yapd", "config", "--request-timeout-secs", "10"])
            .expect("parses");
        assert!(matches!(
            cli.command,
            Command::Config { request_timeout_secs: Some(10), accept_invalid_certs: None, dashboard_unlock_hours: None }
        ));
    }

    #[test]
    fn test_parse_settings() {
        let cli = Cli::try_parse_from(["yapd", "settings", "--use-pihole-auth", "true"])
            .expect("parses");
        assert!(matches!(
            cli.command,
            Command::Settings { use_pihole_auth: Some(true), set_password: false, main_url: None }
        ));
    }
}
