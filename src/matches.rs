//! Recent-match outcome aggregation.
//!
//! Stateless, invoked on demand: fetch a bounded window of recent match ids,
//! pull each match, and reduce to win/loss counters for one player.

use riven::consts::{Queue, RegionalRoute};
use riven::models::match_v5::Match;
use riven::RiotApi;

use crate::error::Error;

/// Default recent-match window size.
pub const DEFAULT_WINDOW: i32 = 5;

/// Win/loss tally over a bounded window of recent matches.
#[derive(Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentOutcome {
    /// Numeric queue id the tally was filtered to, if any.
    pub queue: Option<u16>,
    /// Matches the player won.
    pub wins: u32,
    /// Matches the player lost.
    pub losses: u32,
    /// `wins + losses`; skipped matches do not count.
    pub games: u32,
}

/// Fetch up to `window` recent match ids for `puuid` and tally wins/losses.
///
/// The queue filter is passed upstream and re-checked per match, a defense
/// against an upstream filter mismatch. A match whose detail fetch fails, or
/// where the player does not appear among the participants (identity changed,
/// or the payload is incomplete), is logged and skipped; it never aborts
/// aggregation of the remaining matches in the window.
pub async fn recent_outcome(
    riot_api: &RiotApi,
    route: RegionalRoute,
    puuid: &str,
    queue_id: Option<u16>,
    window: i32,
) -> Result<RecentOutcome, Error> {
    let queue = queue_id.map(Queue::from);
    let ids = riot_api
        .match_v5()
        .get_match_ids_by_puuid(route, puuid, Some(window), None, queue, None, Some(0), None)
        .await?;

    let mut results = Vec::with_capacity(ids.len());
    for match_id in &ids {
        let detail = match riot_api.match_v5().get_match(route, match_id).await {
            Ok(Some(detail)) => detail,
            Ok(None) => {
                log::warn!("match {} not found, skipping", match_id);
                continue;
            }
            Err(err) => {
                log::warn!("failed to fetch match {}, skipping: {}", match_id, err);
                continue;
            }
        };
        results.push(match_result(&detail, puuid, queue));
    }

    let (wins, losses) = tally(results);
    Ok(RecentOutcome {
        queue: queue_id,
        wins,
        losses,
        games: wins + losses,
    })
}

/// Whether `puuid` won the match. `None` when the match falls outside the
/// queue filter or the participant is missing; such matches count for nothing.
fn match_result(detail: &Match, puuid: &str, queue: Option<Queue>) -> Option<bool> {
    if queue.is_some_and(|queue| detail.info.queue_id != queue) {
        return None;
    }
    detail
        .info
        .participants
        .iter()
        .find(|participant| participant.puuid == puuid)
        .map(|participant| participant.win)
}

/// Fold per-match results into `(wins, losses)`, skipping `None` entries.
fn tally(results: impl IntoIterator<Item = Option<bool>>) -> (u32, u32) {
    results
        .into_iter()
        .flatten()
        .fold((0, 0), |(wins, losses), win| {
            if win {
                (wins + 1, losses)
            } else {
                (wins, losses + 1)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::tally;

    #[test]
    fn skipped_matches_count_for_nothing() {
        let (wins, losses) = tally([Some(true), None, Some(false), Some(true), None]);
        assert_eq!((2, 1), (wins, losses));
    }

    #[test]
    fn empty_window_yields_zero_games() {
        assert_eq!((0, 0), tally([]));
    }

    #[test]
    fn games_equals_wins_plus_losses() {
        let results = [Some(true), Some(false), None, Some(false), Some(false)];
        let skipped = results.iter().filter(|r| r.is_none()).count();
        let (wins, losses) = tally(results);
        assert_eq!(results.len(), (wins + losses) as usize + skipped);
    }
}
