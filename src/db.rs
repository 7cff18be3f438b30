//! Model structs corresponding to storage tables.

use chrono::NaiveDate;
use riven::consts::{Champion, Division, QueueType, Tier};

/// A tracked player, i.e. a Riot account.
///
/// `puuid` is the source of truth: `(game_name, tag_line)` pairs are not unique
/// over time (players rename), so name+tag is an entry point only.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Player {
    /// Surrogate PK, assigned by storage at first persistence. Stable across
    /// re-syncs of the same `puuid`.
    pub player_id: i64,
    /// Riot PUUID (player universally unique ID); globally unique, never
    /// reassigned.
    pub puuid: String,
    /// Riot ID game name (`game_name#tag_line`); mutable.
    pub game_name: String,
    /// Riot ID tag line (`game_name#tag_line`); mutable.
    pub tag_line: String,
}

/// Write half of [`Player`]: the upsert payload. `player_id` is omitted so the
/// storage engine assigns the surrogate key on first insert and keeps it on
/// conflict.
#[derive(Debug, serde::Serialize)]
pub struct NewPlayer<'a> {
    /// Conflict target of the identity upsert.
    pub puuid: &'a str,
    /// Current game name from the identity service.
    pub game_name: &'a str,
    /// Current tag line from the identity service.
    pub tag_line: &'a str,
}

/// One profile snapshot per `(player, day)`.
#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SummonerStatSnapshot {
    /// FK [`Player::player_id`].
    pub player_id: i64,
    /// Account level; `None` when the upstream omitted it.
    pub summoner_level: Option<i64>,
    /// Profile icon; `None` when the upstream omitted it.
    pub profile_icon_id: Option<i32>,
    /// Snapshot day. A date, not a timestamp: the daily-uniqueness grain.
    pub recorded_at: NaiveDate,
}

/// One rank snapshot per `(player, queue, day)`.
#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RankStatSnapshot {
    /// FK [`Player::player_id`].
    pub player_id: i64,
    /// Ranked queue (solo, flex, TFT, ...).
    pub queue_type: QueueType,
    /// Rank band; `None` = unranked.
    pub tier: Option<Tier>,
    /// Sub-rank within the tier; `None` = unranked.
    pub division: Option<Division>,
    /// Ranked wins this season.
    pub wins: i32,
    /// Ranked losses this season.
    pub losses: i32,
    /// Derived integer percentage; always recomputed from wins/losses on write,
    /// never stored out of sync with them.
    pub winrate: i32,
    /// Snapshot day.
    pub recorded_at: NaiveDate,
}

impl RankStatSnapshot {
    /// Shape a rank row, computing the winrate so the stored value can never
    /// disagree with `wins`/`losses`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        player_id: i64,
        queue_type: QueueType,
        tier: Option<Tier>,
        division: Option<Division>,
        wins: i32,
        losses: i32,
        recorded_at: NaiveDate,
    ) -> Self {
        Self {
            player_id,
            queue_type,
            tier,
            division,
            wins,
            losses,
            winrate: winrate(wins, losses),
            recorded_at,
        }
    }
}

/// One champion-mastery snapshot per `(player, champion, day)`. At most
/// [`crate::sync::TOP_CHAMPIONS`] rows per player per day by construction: the
/// top-N reduction runs before every persist.
#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChampionStatSnapshot {
    /// FK [`Player::player_id`].
    pub player_id: i64,
    /// Which champion.
    pub champion_id: Champion,
    /// Mastery level.
    pub champion_level: i32,
    /// Mastery points earned.
    pub champion_points: i32,
    /// Snapshot day.
    pub recorded_at: NaiveDate,
}

/// Integer winrate percentage, rounded half-up; 0 when no games were played.
pub fn winrate(wins: i32, losses: i32) -> i32 {
    let games = wins + losses;
    if games <= 0 {
        0
    } else {
        (100 * wins + games / 2) / games
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use riven::consts::{Division, QueueType, Tier};

    use super::{winrate, RankStatSnapshot};

    #[test]
    fn winrate_rounds_half_up() {
        assert_eq!(70, winrate(7, 3));
        assert_eq!(73, winrate(8, 3)); // 72.72...
        assert_eq!(67, winrate(2, 1)); // 66.66...
        assert_eq!(33, winrate(1, 2)); // 33.33...
        assert_eq!(50, winrate(1, 1));
        assert_eq!(100, winrate(5, 0));
    }

    #[test]
    fn winrate_is_zero_without_games() {
        assert_eq!(0, winrate(0, 0));
    }

    #[test]
    fn rank_row_always_carries_consistent_winrate() {
        let day = NaiveDate::from_ymd_opt(2025, 8, 25).unwrap();
        let row = RankStatSnapshot::new(
            42,
            QueueType::RANKED_SOLO_5x5,
            Some(Tier::GOLD),
            Some(Division::II),
            7,
            3,
            day,
        );
        assert_eq!(70, row.winrate);

        // Same day, refreshed counters: last write wins and the invariant holds.
        let row = RankStatSnapshot::new(
            42,
            QueueType::RANKED_SOLO_5x5,
            Some(Tier::GOLD),
            Some(Division::II),
            8,
            3,
            day,
        );
        assert_eq!(73, row.winrate);
    }

    #[test]
    fn unranked_row_serializes_null_tier() {
        let day = NaiveDate::from_ymd_opt(2025, 8, 25).unwrap();
        let row = RankStatSnapshot::new(7, QueueType::RANKED_FLEX_SR, None, None, 0, 0, day);
        let json = serde_json::to_value(&row).unwrap();
        assert!(json["tier"].is_null());
        assert!(json["division"].is_null());
        assert_eq!(0, json["winrate"]);
        assert_eq!("2025-08-25", json["recorded_at"]);
    }
}
