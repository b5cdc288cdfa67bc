//! Tracker hook service binary.
//!
//! Standalone HTTP service receiving GitHub push webhooks.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use notify::{IrcChannel, Notifier};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tracker_hook::{
    config::Config, server, AnnotationParser, BitlyShortener, PassthroughShortener,
    PivotalTrackerClient, ProjectRegistry, PushDispatcher, UrlShortener,
};

#[derive(Parser)]
#[command(name = "tracker-hook")]
#[command(about = "Announce pushed commits to IRC and update tracker stories")]
#[command(version)]
struct Cli {
    /// HTTP port (overrides TRACKER_HOOK_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Project file (overrides TRACKER_HOOK_PROJECTS)
    #[arg(short = 'c', long)]
    projects: Option<PathBuf>,

    /// Do not connect to IRC
    #[arg(long)]
    no_irc: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tracker_hook=info,notify=info")),
        )
        .init();

    let cli = Cli::parse();

    info!("Starting tracker hook...");

    // Load configuration
    let mut config = Config::default();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(projects) = cli.projects {
        config.projects_path = projects;
    }
    if cli.no_irc {
        config.irc = None;
    }

    let registry = match ProjectRegistry::load(&config.projects_path) {
        Ok(registry) => registry,
        Err(e) => {
            error!(
                error = %e,
                path = %config.projects_path.display(),
                "Failed to start up. Each project needs 'tracker_api_token' and 'tracker_project_id' set."
            );
            return Err(e).context("Failed to load project configuration");
        }
    };
    info!(projects = registry.len(), "Project configuration loaded");

    let notifier = match config.irc.clone() {
        Some(irc) => Notifier::with_channels(vec![Arc::new(IrcChannel::spawn(irc))]),
        None => {
            info!("IRC disabled - commits will not be announced");
            Notifier::disabled()
        }
    };

    info!(channels = notifier.channel_count(), "Notifier ready");

    let tracker = PivotalTrackerClient::new(config.http_timeout)
        .context("Failed to create tracker client")?
        .with_base_url(&config.tracker_api_url);

    let shortener: Arc<dyn UrlShortener> = if let Some(token) = &config.bitly_access_token {
        info!("Bitly URL shortening enabled");
        Arc::new(
            BitlyShortener::new(token, config.http_timeout)
                .context("Failed to create Bitly client")?
                .with_api_url(&config.bitly_api_url),
        )
    } else {
        info!("No BITLY_ACCESS_TOKEN configured - announcing full commit URLs");
        Arc::new(PassthroughShortener)
    };

    let dispatcher = PushDispatcher::new(
        Arc::new(registry),
        Arc::new(notifier),
        Arc::new(tracker),
        shortener,
    )
    .with_parser(AnnotationParser::new(&config.annotation_keyword));

    let state = server::AppState {
        dispatcher: Arc::new(dispatcher),
    };

    let addr = format!("0.0.0.0:{}", config.port);
    server::run_server(state, &addr)
        .await
        .context("Server error")?;

    info!("Tracker hook stopped");
    Ok(())
}
