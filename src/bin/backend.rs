#![forbid(unsafe_code)]

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use vidshare::{
    api::{AppState, build_router},
    config::{DEFAULT_CONFIG_PATH, MediaConfig, Overrides, RuntimeConfig, load_runtime_config_from},
    media::{LocalMediaHost, MediaHost, RemoteMediaHost},
    security::ensure_not_root,
    store::{Store, users},
};

const DEFAULT_LOG_FILTER: &str = "vidshare=info";

#[derive(Parser, Debug)]
#[command(author, version, about = "Video sharing backend API server.")]
struct Cli {
    #[arg(long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_PATH, help = "Path to the config file")]
    config: PathBuf,
    #[arg(long = "host", value_name = "ADDR", help = "Override the bind address")]
    host: Option<String>,
    #[arg(long = "port", value_name = "PORT", help = "Override the bind port")]
    port: Option<u16>,
    #[arg(
        long = "database",
        value_name = "PATH",
        help = "Override the SQLite database path"
    )]
    database: Option<PathBuf>,
    #[arg(long = "json-logs", help = "Emit logs as JSON lines")]
    json_logs: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Provision a user profile and print its id.
    AddUser {
        #[arg(long = "username", value_name = "NAME")]
        username: String,
        #[arg(long = "full-name", value_name = "NAME")]
        full_name: String,
        #[arg(long = "avatar", value_name = "URL")]
        avatar: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    ensure_not_root("backend")?;

    let overrides = Overrides {
        host: cli.host.clone(),
        port: cli.port,
        database_path: cli.database.clone(),
        json_logs: cli.json_logs,
    };
    let config = load_runtime_config_from(&cli.config, overrides)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    init_tracing(config.json_logs);

    let store = Store::open(&config.database_path)
        .with_context(|| format!("opening store at {}", config.database_path.display()))?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, store).await,
        Command::AddUser {
            username,
            full_name,
            avatar,
        } => {
            let user = users::insert(&store, &username, &full_name, avatar.as_deref())
                .map_err(|err| anyhow!("adding user {username}: {err}"))?;
            println!("{}", user.id);
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn serve(config: RuntimeConfig, store: Store) -> Result<()> {
    let (media, local_media): (Arc<dyn MediaHost>, Option<Arc<LocalMediaHost>>) =
        match &config.media {
            MediaConfig::Local {
                root,
                public_base_url,
            } => {
                let host = Arc::new(
                    LocalMediaHost::new(root.clone(), public_base_url.clone())
                        .context("initializing local media host")?,
                );
                tracing::info!(root = %root.display(), "serving media from local disk");
                (host.clone() as Arc<dyn MediaHost>, Some(host))
            }
            MediaConfig::Remote { endpoint } => {
                let host = RemoteMediaHost::new(endpoint.clone())
                    .context("initializing remote media host")?;
                tracing::info!(endpoint = %endpoint, "storing media on remote host");
                (Arc::new(host) as Arc<dyn MediaHost>, None)
            }
        };

    let state = AppState {
        store: Arc::new(store),
        media,
        local_media,
        max_limit: config.max_limit,
        max_upload_bytes: config.max_upload_bytes,
    };
    let app = build_router(state);

    let addr = SocketAddr::new(
        config
            .host
            .parse()
            .with_context(|| format!("parsing bind address {}", config.host))?,
        config.port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    tracing::info!(
        %addr,
        database = %config.database_path.display(),
        "API server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running API server")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install Ctrl+C handler");
    }
    tracing::info!("shutting down");
}
