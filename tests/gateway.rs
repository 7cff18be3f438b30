//! Router-level tests: the cross-origin surface, request validation, and
//! unknown-route handling. Nothing here reaches the network: every request is
//! rejected (or answered) before an upstream call would be made.

use axum::body::{to_bytes, Body};
use http::{header, Method, Request, StatusCode};
use riven::consts::{PlatformRoute, RegionalRoute};
use riven::reqwest::Client;
use riven::RiotApi;
use secrecy::SecretString;
use serde_json::{json, Value};
use summonersheet::init::{AppState, AppStateOwned};
use summonersheet::router;
use summonersheet::store::Store;
use tower::ServiceExt;
use url::Url;

const DEFAULT_ORIGIN: &str = "http://localhost:5173";

fn test_state() -> AppState {
    let store = Store::new(
        Client::new(),
        Url::parse("http://localhost:54321/rest/v1/").unwrap(),
        SecretString::new("service-key".to_owned()),
    );
    AppStateOwned {
        riot_api: RiotApi::new("RGAPI-test".to_owned()),
        store,
        platform: PlatformRoute::EUW1,
        route: RegionalRoute::EUROPE,
        allowed_origin: DEFAULT_ORIGIN.to_owned(),
    }
    .leak()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn preflight_short_circuits_with_headers_only() {
    let response = router(test_state())
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/account/by-riot-id")
                .header(header::ORIGIN, "https://example.github.io")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::NO_CONTENT, response.status());
    assert_eq!(
        "https://example.github.io",
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN]
    );
    assert_eq!("Origin", response.headers()[header::VARY]);
    let bytes = to_bytes(response.into_body(), 1024).await.unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn missing_origin_falls_back_to_configured_default() {
    let response = router(test_state())
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/lol/match/ids")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        DEFAULT_ORIGIN,
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN]
    );
}

#[tokio::test]
async fn unknown_route_is_404_with_cors_headers() {
    let response = router(test_state())
        .oneshot(
            Request::builder()
                .uri("/api/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::NOT_FOUND, response.status());
    assert_eq!(
        DEFAULT_ORIGIN,
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN]
    );
    let body = body_json(response).await;
    assert_eq!("not found", body["error"]);
}

#[tokio::test]
async fn identity_lookup_rejects_missing_handle_fields() {
    let response = router(test_state())
        .oneshot(
            Request::builder()
                .uri("/api/account/by-riot-id?name=Faker")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    let body = body_json(response).await;
    assert_eq!(json!(["tag"]), body["fields"]);
}

#[tokio::test]
async fn identity_lookup_treats_empty_values_as_missing() {
    let response = router(test_state())
        .oneshot(
            Request::builder()
                .uri("/api/account/by-riot-id?name=&tag=")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    let body = body_json(response).await;
    assert_eq!(json!(["name", "tag"]), body["fields"]);
}

#[tokio::test]
async fn player_sync_requires_game_name_and_tag_line() {
    let response = router(test_state())
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/db/players/sync")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    let body = body_json(response).await;
    assert_eq!(json!(["gameName", "tagLine"]), body["fields"]);
}

#[tokio::test]
async fn summoner_stats_save_requires_player_id() {
    let response = router(test_state())
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/db/summoner-stats")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"summonerLevel": 423}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    let body = body_json(response).await;
    assert_eq!(json!(["playerId"]), body["fields"]);
}

#[tokio::test]
async fn rank_save_accepts_single_object_shape() {
    // A single object (not an array) must parse; this one is then rejected for
    // the fields it lacks, before any storage call.
    let response = router(test_state())
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/db/rank-stats")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"playerId": 42, "wins": 7, "losses": 3}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    let body = body_json(response).await;
    assert_eq!(json!(["queueType"]), body["fields"]);
}

#[tokio::test]
async fn rank_save_validates_every_array_element() {
    let payload = json!([
        {"playerId": 42, "queueType": "RANKED_SOLO_5x5", "wins": 7, "losses": 3},
        {"playerId": 42, "queueType": "RANKED_FLEX_SR", "losses": 1}
    ]);
    let response = router(test_state())
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/db/rank-stats")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    let body = body_json(response).await;
    assert_eq!(json!(["wins"]), body["fields"]);
}

#[tokio::test]
async fn champion_save_names_all_missing_fields() {
    let response = router(test_state())
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/db/champion-stats")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"championLevel": 7}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    let body = body_json(response).await;
    assert_eq!(
        json!(["playerId", "championId", "championPoints"]),
        body["fields"]
    );
}

#[tokio::test]
async fn match_ids_requires_puuid() {
    let response = router(test_state())
        .oneshot(
            Request::builder()
                .uri("/api/lol/match/ids?count=5&queue=430")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    let body = body_json(response).await;
    assert_eq!(json!(["puuid"]), body["fields"]);
}
