use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{ConsoleApi, ConsoleClient, SessionRole, StaticRole};
use shared::{domain::UserRole, error::ApiException};
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod shell;

use config::load_settings;
use shell::Shell;

#[derive(Parser, Debug)]
#[command(name = "metrics-console", about = "Browse console metrics from a terminal")]
struct Args {
    #[arg(long, default_value = "console.toml")]
    config: PathBuf,
    #[arg(long)]
    console_url: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long, env = "CONSOLE_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// Route to open first, e.g. `/metrics?filter=ada&cursor=abc123`.
    #[arg(long)]
    route: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config)?;
    if let Some(url) = args.console_url {
        settings.console_url = url;
    }
    if let Some(username) = args.username {
        settings.username = Some(username);
    }
    if let Some(route) = args.route {
        settings.start_route = route;
    }

    let mut client = ConsoleClient::new(
        &settings.console_url,
        Duration::from_secs(settings.request_timeout_secs),
    )?;

    let session: Arc<dyn SessionRole> = match (settings.username.as_deref(), args.password) {
        (Some(username), Some(password)) => {
            let session = client
                .authenticate(username, &password)
                .await
                .map_err(ApiException::from)
                .context("console sign-in failed")?;
            info!(username, role = ?session.role(), "signed in to console");
            Arc::new(session)
        }
        _ => {
            warn!("no console credentials supplied; browsing without a session");
            Arc::new(StaticRole(UserRole::Unknown))
        }
    };

    let api: Arc<dyn ConsoleApi> = Arc::new(client);
    Shell::new(api, session, &settings.start_route)
        .run(BufReader::new(tokio::io::stdin()), std::io::stdout())
        .await
}
