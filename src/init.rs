//! Configuration and shared application state.

use std::net::SocketAddr;

use riven::consts::{PlatformRoute, RegionalRoute};
use riven::reqwest::Client;
use riven::RiotApi;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::Error;
use crate::store::Store;

/// `AppState`. Static reference to [`AppStateOwned`] to avoid cloning in Axum.
pub type AppState = &'static AppStateOwned;

/// Service configuration, read from the environment (`.env` supported via
/// `dotenvy` in `main`).
#[derive(Debug)]
pub struct Config {
    /// Riot API key (`RGAPI_KEY`). Never exposed to callers.
    pub riot_api_key: SecretString,
    /// Base URL of the storage REST interface (`SUPABASE_URL`), e.g.
    /// `https://xyz.supabase.co/rest/v1`.
    pub supabase_url: Url,
    /// Storage service key (`SUPABASE_KEY`). Never exposed to callers.
    pub supabase_key: SecretString,
    /// Fallback `Access-Control-Allow-Origin` when the request has no usable
    /// `Origin` header (`ALLOWED_ORIGIN`).
    pub allowed_origin: String,
    /// Platform the dashboard serves (`RIOT_PLATFORM`, default `EUW1`). The
    /// regional route for account/match calls is derived from it.
    pub platform: PlatformRoute,
    /// Listen address (`BIND_ADDR`, default `127.0.0.1:8787`).
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Read the configuration from environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Ok(Self {
            riot_api_key: secret("RGAPI_KEY")?,
            supabase_url: Url::parse(&envvar("SUPABASE_URL")?)
                .map_err(|e| Error::Config(format!("invalid url in `SUPABASE_URL`: {}", e)))?,
            supabase_key: secret("SUPABASE_KEY")?,
            allowed_origin: std::env::var("ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_owned()),
            platform: match std::env::var("RIOT_PLATFORM") {
                Ok(value) => value
                    .parse()
                    .map_err(|e| Error::Config(format!("invalid `RIOT_PLATFORM`: {}", e)))?,
                Err(_) => PlatformRoute::EUW1,
            },
            bind_addr: match std::env::var("BIND_ADDR") {
                Ok(value) => value
                    .parse()
                    .map_err(|e| Error::Config(format!("invalid `BIND_ADDR`: {}", e)))?,
                Err(_) => SocketAddr::from(([127, 0, 0, 1], 8787)),
            },
        })
    }
}

/// State for the application, used as the Axum router state.
pub struct AppStateOwned {
    /// Riot API client; the only holder of the Riot credential.
    pub riot_api: RiotApi,
    /// Storage REST client; the only holder of the storage credential.
    pub store: Store,
    /// Platform route for summoner/league/mastery calls.
    pub platform: PlatformRoute,
    /// Regional route for account/match calls.
    pub route: RegionalRoute,
    /// Fallback CORS origin.
    pub allowed_origin: String,
}

impl AppStateOwned {
    /// Build the application state from the configuration.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let riot_api = RiotApi::new(config.riot_api_key.expose_secret().clone());
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("failed to build http client: {}", e)))?;
        let store = Store::new(
            client,
            config.supabase_url.clone(),
            config.supabase_key.clone(),
        );
        Ok(Self {
            riot_api,
            store,
            platform: config.platform,
            route: config.platform.to_regional(),
            allowed_origin: config.allowed_origin.clone(),
        })
    }

    /// Leak into the `&'static` reference the router and handlers use.
    pub fn leak(self) -> AppState {
        Box::leak(Box::new(self))
    }
}

/// Get a required env var.
fn envvar(name: &str) -> Result<String, Error> {
    std::env::var(name).map_err(|_| Error::Config(format!("missing env var `{}`", name)))
}

/// Get a required env secret.
fn secret(name: &str) -> Result<SecretString, Error> {
    envvar(name).map(Into::into)
}
