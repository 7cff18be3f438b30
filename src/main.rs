//! Service entry point.

use summonersheet::init::{AppStateOwned, Config};
use summonersheet::router;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    log::info!("listening on {}", listener.local_addr()?);

    let state = AppStateOwned::new(&config)?.leak();
    axum::serve(listener, router(state)).await?;
    Ok(())
}
