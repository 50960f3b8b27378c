//! towa HTTP API server.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use towa_api::{router, AppState, ServerConfig};
use towa_db::{log_pool_metrics, Database, FilesystemBackend, MemoryStore, PoolConfig};

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "towa_api=debug,towa_db=info,tower_http=debug";

/// Install the global subscriber.
///
/// | Variable | Meaning |
/// |----------|---------|
/// | `LOG_FORMAT` | `json` or `text` (default `text`) |
/// | `LOG_FILE` | write to a daily-rotated file instead of stdout |
/// | `LOG_ANSI` | force ANSI colors on or off |
/// | `RUST_LOG` | env filter |
///
/// The returned guard flushes the file writer and must outlive the server.
fn init_tracing() -> Option<WorkerGuard> {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| matches!(v.as_str(), "1" | "true"));
    let log_file = std::env::var("LOG_FILE").ok().map(PathBuf::from);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (writer, guard) = match &log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "towa-api.log".to_string());
            let (w, g) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
            (BoxMakeWriter::new(w), Some(g))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    // Files default to plain text; the console auto-detects.
    let ansi = ansi.unwrap_or(log_file.is_none());
    let fmt = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(ansi);
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt.json()).init();
    } else {
        registry.with(fmt).init();
    }

    info!(
        subsystem = "api",
        component = "startup",
        format = if json { "json" } else { "text" },
        destination = %log_file.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| "stdout".into()),
        "Logging initialized"
    );
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let config = ServerConfig::from_env();

    let blobs = FilesystemBackend::new(&config.storage_path);
    blobs.validate().await?;

    let mut state = match config.database_url.as_deref() {
        Some(url) => {
            let db = Database::connect_with_config(url, PoolConfig::from_env()).await?;
            db.migrate().await?;
            log_pool_metrics(db.pool());
            info!(
                subsystem = "api",
                component = "startup",
                backend = "postgres",
                storage_path = %config.storage_path,
                "Storage backends ready"
            );
            AppState::with_database(db, Arc::new(blobs))
        }
        None => {
            info!(
                subsystem = "api",
                component = "startup",
                backend = "memory",
                storage_path = %config.storage_path,
                "DATABASE_URL not set, indexing in memory"
            );
            let mut state = AppState::in_memory(Arc::new(MemoryStore::new()));
            state.content = Arc::new(blobs);
            state
        }
    };

    if config.rate_limit_enabled {
        state = state.with_rate_limit(config.rate_limit_requests, config.rate_limit_period_secs);
        info!(
            subsystem = "api",
            component = "startup",
            requests = config.rate_limit_requests,
            period_secs = config.rate_limit_period_secs,
            "Rate limiting enabled"
        );
    }

    let app = router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(subsystem = "api", component = "startup", %addr, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}
