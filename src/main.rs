use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use doc2pdf::config::settings::{AppConfig, DocumentStoreKind, StorageBackendKind};
use doc2pdf::infrastructure::db::pool;
use doc2pdf::infrastructure::engine::{ConversionEngine, SofficeEngine};
use doc2pdf::infrastructure::storage::{LocalStore, ObjectStore, S3Store};
use doc2pdf::modules::documents::repository::{
    DocumentRepository, MemoryDocumentRepository, PgDocumentRepository,
};
use doc2pdf::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting server...");

    let config = AppConfig::new().context("Failed to load configuration")?;

    let repo: Arc<dyn DocumentRepository> = match config.document_store {
        DocumentStoreKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres document store")?;
            let db = pool::connect_to_db(url).await.context("Failed to connect to database")?;
            pool::run_migrations(&db).await.context("Failed to run migrations")?;
            Arc::new(PgDocumentRepository::new(db))
        }
        DocumentStoreKind::Memory => {
            info!("Using in-memory document store");
            Arc::new(MemoryDocumentRepository::new())
        }
    };

    let store: Arc<dyn ObjectStore> = match config.storage_backend {
        StorageBackendKind::S3 => Arc::new(S3Store::new(&config.s3)),
        StorageBackendKind::Local => Arc::new(
            LocalStore::new(config.local_storage_path.clone())
                .await
                .context("Failed to prepare local storage")?,
        ),
    };

    let engine: Arc<dyn ConversionEngine> = Arc::new(SofficeEngine::new(
        config.soffice_bin.clone(),
        config.upload_temp_dir.join("engine"),
    ));

    let port = config.server_port;
    let state = AppState::new(config, repo, store, engine).context("Failed to build application state")?;
    let queue = state.queue.clone();
    let app = doc2pdf::app::create_app(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Draining conversion queue...");
    queue.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
