use shosplit::config::Config;
use shosplit::routes::{self, AppState};
use shosplit::services::storage::UploadStore;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::from_env();

    let store = UploadStore::new(config.upload_dir.clone());
    store.ensure_dir().await?;
    tracing::info!("Storing uploads in {}", store.dir().display());

    let app = routes::router(AppState { store }, config.max_upload_bytes);

    let listener = TcpListener::bind(config.addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
