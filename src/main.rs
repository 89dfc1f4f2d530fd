//! Article store server -- submission and moderation API over object
//! storage.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

/// Command-line arguments for the article store server.
#[derive(Parser, Debug)]
#[command(
    name = "articlestore",
    version,
    about = "Article submission and moderation API server"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "articlestore.example.yaml")]
    config: String,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = articlestore::config::load_config(&cli.config)?;

    // Initialize tracing / logging. RUST_LOG wins over the config level.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone()));
    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Loaded configuration from {}", cli.config);

    let bind_addr = cli
        .bind
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    // Initialize Prometheus metrics recorder and register metric descriptions.
    articlestore::metrics::init_metrics();
    articlestore::metrics::describe_metrics();

    if config.auth.api_key.is_none() {
        warn!("No API_KEY configured - write and admin operations are open (development mode)");
    }

    // Initialize the object storage backend.
    let store: Arc<dyn articlestore::storage::store::ObjectStore> =
        match config.storage.backend.as_str() {
            "memory" => {
                info!("In-memory storage backend initialized (volatile)");
                Arc::new(articlestore::storage::memory::MemoryStore::new())
            }
            "s3" => {
                let s3_config = config.storage.s3.as_ref().ok_or_else(|| {
                    anyhow::anyhow!(
                        "storage.backend is 's3' but storage.s3 config section is missing"
                    )
                })?;
                Arc::new(articlestore::storage::s3::S3Store::new(s3_config).await?)
            }
            _ => {
                let root = &config.storage.local.root_dir;
                let local = articlestore::storage::local::LocalStore::new(root)?;
                info!("Local storage backend initialized at {}", root);
                Arc::new(local)
            }
        };

    let state = Arc::new(articlestore::AppState {
        articles: articlestore::articles::ArticleStore::new(
            store,
            config.limits.max_article_size,
        ),
        rate_limiter: articlestore::ratelimit::RateLimiter::new(
            Duration::from_millis(config.limits.rate_limit_window_ms),
            config.limits.rate_limit_max_requests,
        ),
        config,
    });

    let app = articlestore::server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Article store listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Article store shut down");

    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C), then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}
