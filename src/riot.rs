//! Credential-hiding gateway handlers over the Riot API.
//!
//! The Riot credential lives only in [`crate::init::AppStateOwned`]; callers
//! never send a credential and never see one. Responses are the upstream data
//! re-serialized through riven's typed models, so a shape mismatch fails here
//! instead of propagating silently. Upstream status codes pass through (a Riot
//! 404 is a 404 here); transport failures collapse to a generic 500.

use axum::extract::{Path, Query, State};
use axum::Json;
use riven::models::account_v1::Account;
use riven::models::champion_mastery_v4::ChampionMastery;
use riven::models::league_v4::LeagueEntry;
use riven::models::match_v5::Match;
use riven::models::summoner_v4::Summoner;

use crate::error::Error;
use crate::init::AppState;
use crate::matches::{self, RecentOutcome};

/// Drop empty or whitespace-only values so validation reports them as missing.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// `GET /api/account/by-riot-id` query.
#[derive(Debug, serde::Deserialize)]
pub struct RiotIdQuery {
    /// Riot ID game name.
    pub name: Option<String>,
    /// Riot ID tag line.
    pub tag: Option<String>,
}

/// `GET /api/account/by-riot-id`
///
/// Resolves a human-readable handle to the stable identity. Read-only and
/// idempotent; persistence is the synchronizer's job.
pub async fn account_by_riot_id(
    State(state): State<AppState>,
    Query(query): Query<RiotIdQuery>,
) -> Result<Json<Account>, Error> {
    match (non_empty(query.name), non_empty(query.tag)) {
        (Some(name), Some(tag)) => {
            let account = state
                .riot_api
                .account_v1()
                .get_by_riot_id(state.route, &name, &tag)
                .await?
                .ok_or(Error::NotFound)?;
            Ok(Json(account))
        }
        (name, tag) => {
            let mut fields = Vec::new();
            if name.is_none() {
                fields.push("name");
            }
            if tag.is_none() {
                fields.push("tag");
            }
            Err(Error::MissingFields(fields))
        }
    }
}

/// Query naming a player by PUUID.
#[derive(Debug, serde::Deserialize)]
pub struct PuuidQuery {
    /// Riot PUUID.
    pub puuid: Option<String>,
}

impl PuuidQuery {
    /// The PUUID, or a missing-fields rejection.
    pub fn require(self) -> Result<String, Error> {
        non_empty(self.puuid).ok_or(Error::MissingFields(vec!["puuid"]))
    }
}

/// `GET /api/account/by-puuid`
pub async fn account_by_puuid(
    State(state): State<AppState>,
    Query(query): Query<PuuidQuery>,
) -> Result<Json<Account>, Error> {
    let puuid = query.require()?;
    let account = state
        .riot_api
        .account_v1()
        .get_by_puuid(state.route, &puuid)
        .await?;
    Ok(Json(account))
}

/// `GET /api/lol/summoner/by-puuid`
pub async fn summoner_by_puuid(
    State(state): State<AppState>,
    Query(query): Query<PuuidQuery>,
) -> Result<Json<Summoner>, Error> {
    let puuid = query.require()?;
    let summoner = state
        .riot_api
        .summoner_v4()
        .get_by_puuid(state.platform, &puuid)
        .await?;
    Ok(Json(summoner))
}

/// `GET /api/lol/league/by-puuid`
///
/// League entries key on the encrypted summoner id upstream, so this resolves
/// the summoner first and then pulls its entries. An unranked player yields an
/// empty list, not an error.
pub async fn league_by_puuid(
    State(state): State<AppState>,
    Query(query): Query<PuuidQuery>,
) -> Result<Json<Vec<LeagueEntry>>, Error> {
    let puuid = query.require()?;
    let summoner = state
        .riot_api
        .summoner_v4()
        .get_by_puuid(state.platform, &puuid)
        .await?;
    let entries = state
        .riot_api
        .league_v4()
        .get_league_entries_for_summoner(state.platform, &summoner.id)
        .await?;
    Ok(Json(entries))
}

/// `GET /api/lol/champion-mastery/by-puuid`
pub async fn mastery_by_puuid(
    State(state): State<AppState>,
    Query(query): Query<PuuidQuery>,
) -> Result<Json<Vec<ChampionMastery>>, Error> {
    let puuid = query.require()?;
    let masteries = state
        .riot_api
        .champion_mastery_v4()
        .get_all_champion_masteries_by_puuid(state.platform, &puuid)
        .await?;
    Ok(Json(masteries))
}

/// `GET /api/lol/match/ids` query.
#[derive(Debug, serde::Deserialize)]
pub struct MatchIdsQuery {
    /// Riot PUUID.
    pub puuid: Option<String>,
    /// Window start offset; default 0.
    pub start: Option<i32>,
    /// Window size; default [`matches::DEFAULT_WINDOW`].
    pub count: Option<i32>,
    /// Optional numeric queue filter.
    pub queue: Option<u16>,
}

/// `GET /api/lol/match/ids`
pub async fn match_ids(
    State(state): State<AppState>,
    Query(query): Query<MatchIdsQuery>,
) -> Result<Json<Vec<String>>, Error> {
    let puuid = non_empty(query.puuid).ok_or(Error::MissingFields(vec!["puuid"]))?;
    let ids = state
        .riot_api
        .match_v5()
        .get_match_ids_by_puuid(
            state.route,
            &puuid,
            Some(query.count.unwrap_or(matches::DEFAULT_WINDOW)),
            None,
            query.queue.map(Into::into),
            None,
            Some(query.start.unwrap_or(0)),
            None,
        )
        .await?;
    Ok(Json(ids))
}

/// `GET /api/lol/match/by-id/:match_id`
pub async fn match_by_id(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<Match>, Error> {
    let detail = state
        .riot_api
        .match_v5()
        .get_match(state.route, &match_id)
        .await?
        .ok_or(Error::NotFound)?;
    Ok(Json(detail))
}

/// `GET /api/lol/normal-stats` query.
#[derive(Debug, serde::Deserialize)]
pub struct NormalStatsQuery {
    /// Riot PUUID.
    pub puuid: Option<String>,
    /// Optional numeric queue filter (e.g. 400 = normal draft).
    pub queue: Option<u16>,
    /// Window size; default [`matches::DEFAULT_WINDOW`].
    pub count: Option<i32>,
}

/// `GET /api/lol/normal-stats`
pub async fn normal_stats(
    State(state): State<AppState>,
    Query(query): Query<NormalStatsQuery>,
) -> Result<Json<RecentOutcome>, Error> {
    let puuid = non_empty(query.puuid).ok_or(Error::MissingFields(vec!["puuid"]))?;
    let outcome = matches::recent_outcome(
        &state.riot_api,
        state.route,
        &puuid,
        query.queue,
        query.count.unwrap_or(matches::DEFAULT_WINDOW),
    )
    .await?;
    Ok(Json(outcome))
}
