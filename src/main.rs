use anyhow::Context;
use clap::Parser;
use drop_box::{Config, Storage, router};
use env_logger::Env;
use log::info;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Show info by default, overridable with RUST_LOG
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let config = Config::parse();

    let storage = Storage::open(&config.upload_dir).with_context(|| {
        format!(
            "failed to prepare storage directory {}",
            config.upload_dir.display()
        )
    })?;

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, router(storage))
        .await
        .context("server stopped")
}
