//! Snapshot synchronization: fetch-then-persist across the three stat
//! categories, each with its own daily-uniqueness grain and conflict target.
//!
//! The identity upsert runs first and must succeed: its surrogate `player_id`
//! is required input for every stat write. The three category syncs then run
//! concurrently and independently; a failure in one is logged and reported as
//! that category's outcome without aborting the others.

use std::cmp::Reverse;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use itertools::Itertools;
use riven::consts::{Champion, Division, QueueType, Tier};
use riven::models::account_v1::Account;
use riven::models::champion_mastery_v4::ChampionMastery;
use riven::models::summoner_v4::Summoner;
use serde_with::formats::PreferMany;
use serde_with::{serde_as, OneOrMany};

use crate::db;
use crate::error::Error;
use crate::init::AppState;
use crate::riot::{non_empty, PuuidQuery};
use crate::store::UpsertOutcome;

/// Bound on persisted champions per player per day.
pub const TOP_CHAMPIONS: usize = 3;

/// Sort descending by mastery points and keep the top [`TOP_CHAMPIONS`].
///
/// The sort is stable, so ties keep their input order: points are the only
/// ranking signal provided, tie order is documented as unspecified. Reducing an
/// already-reduced set returns it unchanged.
pub fn top_champions<T>(items: Vec<T>, points: impl Fn(&T) -> i32) -> Vec<T> {
    items
        .into_iter()
        .sorted_by_key(|item| Reverse(points(item)))
        .take(TOP_CHAMPIONS)
        .collect()
}

/// `POST /api/db/players/sync` body.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPlayerRequest {
    /// Riot ID game name.
    pub game_name: Option<String>,
    /// Riot ID tag line.
    pub tag_line: Option<String>,
}

/// Per-category result of a sync. Categories are reported independently and
/// never aggregated into an all-or-nothing result.
#[derive(Debug, serde::Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CategoryOutcome {
    /// Rows written.
    Saved {
        /// Number of rows in the stored representation.
        rows: usize,
    },
    /// Already recorded for this grain today via a benign uniqueness race.
    Duplicate,
    /// Fetch or persistence for this category failed; the others proceeded.
    Failed {
        /// What went wrong (also logged).
        message: String,
    },
}

impl CategoryOutcome {
    /// Collapse one category's result, logging failures instead of propagating
    /// them: persistence failing for one category must not fail the sync.
    fn of<T>(category: &str, result: Result<UpsertOutcome<Vec<T>>, Error>) -> Self {
        match result {
            Ok(UpsertOutcome::Stored(rows)) => Self::Saved { rows: rows.len() },
            Ok(UpsertOutcome::Duplicate) => Self::Duplicate,
            Err(err) => {
                log::warn!("{} snapshot sync failed: {}", category, err);
                Self::Failed {
                    message: err.to_string(),
                }
            }
        }
    }
}

/// Full report for one player sync.
#[derive(Debug, serde::Serialize)]
pub struct SyncReport {
    /// The upserted identity row, including the surrogate key.
    pub player: db::Player,
    /// Profile snapshot outcome.
    pub profile: CategoryOutcome,
    /// Rank snapshot outcome (one row per ranked queue).
    pub ranks: CategoryOutcome,
    /// Champion-mastery snapshot outcome (top champions only).
    pub mastery: CategoryOutcome,
}

/// `POST /api/db/players/sync`
pub async fn sync_player_post(
    State(state): State<AppState>,
    Json(body): Json<SyncPlayerRequest>,
) -> Result<Json<SyncReport>, Error> {
    match (non_empty(body.game_name), non_empty(body.tag_line)) {
        (Some(game_name), Some(tag_line)) => {
            Ok(Json(sync_player(state, &game_name, &tag_line).await?))
        }
        (game_name, tag_line) => {
            let mut fields = Vec::new();
            if game_name.is_none() {
                fields.push("gameName");
            }
            if tag_line.is_none() {
                fields.push("tagLine");
            }
            Err(Error::MissingFields(fields))
        }
    }
}

/// Resolve the identity, upsert it, then sync the three stat categories
/// concurrently.
pub async fn sync_player(
    state: AppState,
    game_name: &str,
    tag_line: &str,
) -> Result<SyncReport, Error> {
    let account = state
        .riot_api
        .account_v1()
        .get_by_riot_id(state.route, game_name, tag_line)
        .await?
        .ok_or(Error::NotFound)?;

    // Hard ordering dependency: stat writes need the surrogate id.
    let player = upsert_player(state, &account).await?;
    let today = Utc::now().date_naive();

    let (profile, ranks, mastery) = futures::join!(
        sync_profile(state, player.player_id, &player.puuid, today),
        sync_ranks(state, player.player_id, &player.puuid, today),
        sync_mastery(state, player.player_id, &player.puuid, today),
    );

    Ok(SyncReport {
        player,
        profile: CategoryOutcome::of("profile", profile),
        ranks: CategoryOutcome::of("rank", ranks),
        mastery: CategoryOutcome::of("mastery", mastery),
    })
}

/// Upsert the identity on the `puuid` conflict target and return the stored
/// row. Merge-duplicates keeps `player_id` stable while refreshing the mutable
/// name and tag.
async fn upsert_player(state: AppState, account: &Account) -> Result<db::Player, Error> {
    let row = db::NewPlayer {
        puuid: &account.puuid,
        game_name: account.game_name.as_deref().unwrap_or_default(),
        tag_line: account.tag_line.as_deref().unwrap_or_default(),
    };
    let outcome: UpsertOutcome<Vec<db::Player>> =
        state.store.upsert("players", "puuid", &[row]).await?;
    let UpsertOutcome::Stored(players) = outcome else {
        return Err(player_row_missing());
    };
    players.into_iter().next().ok_or_else(player_row_missing)
}

/// The identity upsert asked for the representation back; without it no stat
/// write can proceed.
fn player_row_missing() -> Error {
    Error::Store {
        status: http::StatusCode::INTERNAL_SERVER_ERROR,
        code: None,
        message: "player upsert returned no representation".to_owned(),
    }
}

async fn sync_profile(
    state: AppState,
    player_id: i64,
    puuid: &str,
    day: NaiveDate,
) -> Result<UpsertOutcome<Vec<db::SummonerStatSnapshot>>, Error> {
    let Summoner {
        summoner_level,
        profile_icon_id,
        ..
    } = state
        .riot_api
        .summoner_v4()
        .get_by_puuid(state.platform, puuid)
        .await?;
    let row = db::SummonerStatSnapshot {
        player_id,
        summoner_level: Some(summoner_level),
        profile_icon_id: Some(profile_icon_id),
        recorded_at: day,
    };
    state
        .store
        .upsert("summoner_stats", "player_id,recorded_at", &[row])
        .await
}

async fn sync_ranks(
    state: AppState,
    player_id: i64,
    puuid: &str,
    day: NaiveDate,
) -> Result<UpsertOutcome<Vec<db::RankStatSnapshot>>, Error> {
    // League entries key on the encrypted summoner id upstream.
    let summoner = state
        .riot_api
        .summoner_v4()
        .get_by_puuid(state.platform, puuid)
        .await?;
    let entries = state
        .riot_api
        .league_v4()
        .get_league_entries_for_summoner(state.platform, &summoner.id)
        .await?;
    // Unranked in every queue: nothing to record for the day.
    if entries.is_empty() {
        return Ok(UpsertOutcome::Stored(Vec::new()));
    }
    let rows = entries
        .into_iter()
        .map(|entry| {
            db::RankStatSnapshot::new(
                player_id,
                entry.queue_type,
                entry.tier,
                entry.rank,
                entry.wins,
                entry.losses,
                day,
            )
        })
        .collect::<Vec<_>>();
    state
        .store
        .upsert("rank_stats", "player_id,queue_type,recorded_at", &rows)
        .await
}

async fn sync_mastery(
    state: AppState,
    player_id: i64,
    puuid: &str,
    day: NaiveDate,
) -> Result<UpsertOutcome<Vec<db::ChampionStatSnapshot>>, Error> {
    let masteries = state
        .riot_api
        .champion_mastery_v4()
        .get_all_champion_masteries_by_puuid(state.platform, puuid)
        .await?;
    let rows = masteries
        .into_iter()
        .map(
            |ChampionMastery {
                 champion_id,
                 champion_points,
                 champion_level,
                 ..
             }| db::ChampionStatSnapshot {
                player_id,
                champion_id,
                champion_level,
                champion_points,
                recorded_at: day,
            },
        )
        .collect::<Vec<_>>();
    let rows = top_champions(rows, |row| row.champion_points);
    state
        .store
        .upsert("champion_stats", "player_id,champion_id,recorded_at", &rows)
        .await
}

/// Response for the explicit save endpoints.
#[derive(Debug, serde::Serialize)]
pub struct SaveResponse {
    /// `saved` or `duplicate`.
    pub status: &'static str,
    /// Rows in the stored representation (0 for `duplicate`).
    pub rows: usize,
}

impl SaveResponse {
    fn of<T>(outcome: UpsertOutcome<Vec<T>>) -> Self {
        match outcome {
            UpsertOutcome::Stored(rows) => Self {
                status: "saved",
                rows: rows.len(),
            },
            UpsertOutcome::Duplicate => Self {
                status: "duplicate",
                rows: 0,
            },
        }
    }
}

/// `POST /api/db/summoner-stats` body.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSummonerStatsRequest {
    /// FK of the player the snapshot belongs to.
    pub player_id: Option<i64>,
    /// Account level.
    pub summoner_level: Option<i64>,
    /// Profile icon.
    pub profile_icon_id: Option<i32>,
    /// Snapshot day; defaults to today.
    pub recorded_at: Option<NaiveDate>,
}

/// `POST /api/db/summoner-stats`
pub async fn save_summoner_stats_post(
    State(state): State<AppState>,
    Json(body): Json<SaveSummonerStatsRequest>,
) -> Result<Json<SaveResponse>, Error> {
    let Some(player_id) = body.player_id else {
        return Err(Error::MissingFields(vec!["playerId"]));
    };
    let row = db::SummonerStatSnapshot {
        player_id,
        summoner_level: body.summoner_level,
        profile_icon_id: body.profile_icon_id,
        recorded_at: body.recorded_at.unwrap_or_else(|| Utc::now().date_naive()),
    };
    let outcome: UpsertOutcome<Vec<db::SummonerStatSnapshot>> = state
        .store
        .upsert("summoner_stats", "player_id,recorded_at", &[row])
        .await?;
    Ok(Json(SaveResponse::of(outcome)))
}

/// One rank row in a `POST /api/db/rank-stats` body. `winrate` is not accepted
/// from the caller; it is derived on every write.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRankStatsRequest {
    /// FK of the player the snapshot belongs to.
    pub player_id: Option<i64>,
    /// e.g. `RANKED_SOLO_5x5`, `RANKED_FLEX_SR`, `RANKED_TFT`.
    pub queue_type: Option<QueueType>,
    /// Rank band; omit when unranked.
    pub tier: Option<Tier>,
    /// Sub-rank; omit when unranked.
    pub division: Option<Division>,
    /// Ranked wins.
    pub wins: Option<u32>,
    /// Ranked losses.
    pub losses: Option<u32>,
    /// Snapshot day; defaults to today.
    pub recorded_at: Option<NaiveDate>,
}

/// `POST /api/db/rank-stats` body: a single object or an array of them.
#[serde_as]
#[derive(Debug, serde::Deserialize)]
pub struct SaveRankStatsBody(
    /// The rows to persist.
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    pub Vec<SaveRankStatsRequest>,
);

/// `POST /api/db/rank-stats`
pub async fn save_rank_stats_post(
    State(state): State<AppState>,
    Json(SaveRankStatsBody(items)): Json<SaveRankStatsBody>,
) -> Result<Json<SaveResponse>, Error> {
    let today = Utc::now().date_naive();
    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        match (item.player_id, item.queue_type, item.wins, item.losses) {
            (Some(player_id), Some(queue_type), Some(wins), Some(losses)) => {
                rows.push(db::RankStatSnapshot::new(
                    player_id,
                    queue_type,
                    item.tier,
                    item.division,
                    wins as i32,
                    losses as i32,
                    item.recorded_at.unwrap_or(today),
                ));
            }
            (player_id, queue_type, wins, losses) => {
                let mut fields = Vec::new();
                if player_id.is_none() {
                    fields.push("playerId");
                }
                if queue_type.is_none() {
                    fields.push("queueType");
                }
                if wins.is_none() {
                    fields.push("wins");
                }
                if losses.is_none() {
                    fields.push("losses");
                }
                return Err(Error::MissingFields(fields));
            }
        }
    }
    let outcome: UpsertOutcome<Vec<db::RankStatSnapshot>> = state
        .store
        .upsert("rank_stats", "player_id,queue_type,recorded_at", &rows)
        .await?;
    Ok(Json(SaveResponse::of(outcome)))
}

/// One champion row in a `POST /api/db/champion-stats` body.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveChampionStatsRequest {
    /// FK of the player the snapshot belongs to.
    pub player_id: Option<i64>,
    /// Which champion (numeric id).
    pub champion_id: Option<Champion>,
    /// Mastery level.
    pub champion_level: Option<i32>,
    /// Mastery points.
    pub champion_points: Option<i32>,
    /// Snapshot day; defaults to today.
    pub recorded_at: Option<NaiveDate>,
}

/// `POST /api/db/champion-stats` body: a single object (treated as a
/// one-element list) or an array.
#[serde_as]
#[derive(Debug, serde::Deserialize)]
pub struct SaveChampionStatsBody(
    /// The rows to persist, reduced to the top champions before writing.
    #[serde_as(as = "OneOrMany<_, PreferMany>")]
    pub Vec<SaveChampionStatsRequest>,
);

/// `POST /api/db/champion-stats`
///
/// The top-N reduction runs here too: only the top [`TOP_CHAMPIONS`] by points
/// are ever written, bounding storage growth no matter how many champions the
/// caller submits.
pub async fn save_champion_stats_post(
    State(state): State<AppState>,
    Json(SaveChampionStatsBody(items)): Json<SaveChampionStatsBody>,
) -> Result<Json<SaveResponse>, Error> {
    let today = Utc::now().date_naive();
    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        match (
            item.player_id,
            item.champion_id,
            item.champion_level,
            item.champion_points,
        ) {
            (Some(player_id), Some(champion_id), Some(champion_level), Some(champion_points)) => {
                rows.push(db::ChampionStatSnapshot {
                    player_id,
                    champion_id,
                    champion_level,
                    champion_points,
                    recorded_at: item.recorded_at.unwrap_or(today),
                });
            }
            (player_id, champion_id, champion_level, champion_points) => {
                let mut fields = Vec::new();
                if player_id.is_none() {
                    fields.push("playerId");
                }
                if champion_id.is_none() {
                    fields.push("championId");
                }
                if champion_level.is_none() {
                    fields.push("championLevel");
                }
                if champion_points.is_none() {
                    fields.push("championPoints");
                }
                return Err(Error::MissingFields(fields));
            }
        }
    }
    let rows = top_champions(rows, |row| row.champion_points);
    let outcome: UpsertOutcome<Vec<db::ChampionStatSnapshot>> = state
        .store
        .upsert("champion_stats", "player_id,champion_id,recorded_at", &rows)
        .await?;
    Ok(Json(SaveResponse::of(outcome)))
}

/// `GET /api/db/players/by-puuid`
pub async fn player_by_puuid(
    State(state): State<AppState>,
    Query(query): Query<PuuidQuery>,
) -> Result<Json<db::Player>, Error> {
    let puuid = query.require()?;
    state
        .store
        .fetch_one("players", &[("puuid", puuid)])
        .await?
        .map(Json)
        .ok_or(Error::NotFound)
}

/// `GET /api/db/summoner-stats/history` query.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    /// FK of the player.
    pub player_id: Option<i64>,
    /// Max snapshots returned, newest first; default 50 (`1` gives the latest).
    pub limit: Option<u32>,
}

/// `GET /api/db/summoner-stats/history`
pub async fn summoner_stats_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<db::SummonerStatSnapshot>>, Error> {
    let Some(player_id) = query.player_id else {
        return Err(Error::MissingFields(vec!["playerId"]));
    };
    let rows = state
        .store
        .select(
            "summoner_stats",
            &[("player_id", player_id.to_string())],
            Some("recorded_at.desc"),
            Some(query.limit.unwrap_or(50)),
        )
        .await?;
    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use super::{top_champions, TOP_CHAMPIONS};

    fn points(&(_, points): &(i32, i32)) -> i32 {
        points
    }

    #[test]
    fn reduction_keeps_exactly_the_top_three_by_points() {
        let input = vec![(1, 500), (2, 9000), (3, 200), (4, 7000)];
        let top = top_champions(input, points);
        assert_eq!(vec![(2, 9000), (4, 7000), (1, 500)], top);
    }

    #[test]
    fn reduction_is_idempotent() {
        let reduced = top_champions(vec![(1, 500), (2, 9000), (3, 200), (4, 7000)], points);
        assert_eq!(reduced.clone(), top_champions(reduced, points));

        let small = vec![(7, 100)];
        assert_eq!(small.clone(), top_champions(small, points));
    }

    #[test]
    fn reduction_never_exceeds_the_bound() {
        let input = (0..20).map(|n| (n, n * 10)).collect::<Vec<_>>();
        assert_eq!(TOP_CHAMPIONS, top_champions(input, points).len());
    }

    #[test]
    fn ties_keep_input_order() {
        let input = vec![(1, 100), (2, 100), (3, 100), (4, 100)];
        assert_eq!(
            vec![(1, 100), (2, 100), (3, 100)],
            top_champions(input, points)
        );
    }
}
