#![warn(missing_docs)]

//! SummonerSheet backend: a credential-hiding gateway over the Riot API plus
//! daily stat-snapshot synchronization into a PostgREST storage service.

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN, VARY,
};
use http::{Method, StatusCode};
use serde_json::json;

use crate::init::AppState;

pub mod db;
pub mod error;
pub mod init;
pub mod matches;
pub mod riot;
pub mod store;
pub mod sync;

/// Build the service router: the gateway surface plus the storage-backed
/// snapshot endpoints, wrapped in the cross-origin layer.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/account/by-riot-id", get(riot::account_by_riot_id))
        .route("/api/account/by-puuid", get(riot::account_by_puuid))
        .route("/api/lol/summoner/by-puuid", get(riot::summoner_by_puuid))
        .route("/api/lol/league/by-puuid", get(riot::league_by_puuid))
        .route(
            "/api/lol/champion-mastery/by-puuid",
            get(riot::mastery_by_puuid),
        )
        .route("/api/lol/match/ids", get(riot::match_ids))
        .route("/api/lol/match/by-id/:match_id", get(riot::match_by_id))
        .route("/api/lol/normal-stats", get(riot::normal_stats))
        .route("/api/db/players/sync", post(sync::sync_player_post))
        .route("/api/db/players/by-puuid", get(sync::player_by_puuid))
        .route(
            "/api/db/summoner-stats",
            post(sync::save_summoner_stats_post),
        )
        .route(
            "/api/db/summoner-stats/history",
            get(sync::summoner_stats_history),
        )
        .route("/api/db/rank-stats", post(sync::save_rank_stats_post))
        .route(
            "/api/db/champion-stats",
            post(sync::save_champion_stats_post),
        )
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state, cors))
        .with_state(state)
}

/// Unknown routes.
async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
}

/// Cross-origin layer: reflect the caller's `Origin` (falling back to the
/// configured one), answer preflights with headers only, and mark every
/// response `Vary: Origin`.
async fn cors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(ORIGIN)
        .and_then(|value| value.to_str().ok())
        .filter(|origin| *origin != "null")
        .map(str::to_owned)
        .unwrap_or_else(|| state.allowed_origin.clone());

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    if let Ok(origin) = HeaderValue::from_str(&origin) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(VARY, HeaderValue::from_static("Origin"));
    response
}
