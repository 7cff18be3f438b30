//! Storage REST (PostgREST) client.
//!
//! All writes are upserts scoped to explicit conflict-target column lists, so
//! concurrent synchronizations for the same player on the same day converge
//! (last write wins) instead of duplicating rows. No in-process locking:
//! correctness is delegated to the storage engine's uniqueness constraints.

use http::StatusCode;
use riven::reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::{bridge_status, Error};

/// Postgres unique-constraint violation. Reaching us outside the upsert's own
/// merge path (e.g. a race on another unique index) it means "already recorded
/// for this grain today" and is reported as success, not as an error.
const PG_UNIQUE_VIOLATION: &str = "23505";

/// PostgREST "JSON object requested, multiple (or no) rows returned": the
/// distinct zero-rows signal of a single-row fetch. Mapped to `None`, never to
/// an error.
const PGRST_NO_ROWS: &str = "PGRST116";

/// Tagged outcome of an upsert, so callers match on it instead of inspecting
/// and recovering from a constraint-violation exception.
#[derive(Debug)]
pub enum UpsertOutcome<T> {
    /// Rows written; carries the representation returned by the storage engine.
    Stored(T),
    /// Benign uniqueness race; the grain was already recorded today.
    Duplicate,
}

/// PostgREST error body.
#[derive(Debug, serde::Deserialize)]
struct PgrstError {
    code: Option<String>,
    message: Option<String>,
}

/// Client for the storage service's REST interface. The service key lives here
/// and only here.
pub struct Store {
    client: Client,
    base: Url,
    key: SecretString,
}

impl Store {
    /// Create a client for the PostgREST endpoint at `base`.
    pub fn new(client: Client, base: Url, key: SecretString) -> Self {
        Self { client, base, key }
    }

    /// Upsert `rows` into `table` with the given conflict-target column list.
    ///
    /// Sends `Prefer: resolution=merge-duplicates,return=representation`: on
    /// conflict the new values fully replace the row (last write wins for
    /// same-day re-syncs, not an accumulation), and the stored representation
    /// comes back. A unique violation surfacing through any other path is
    /// downgraded to [`UpsertOutcome::Duplicate`].
    pub async fn upsert<T, R>(
        &self,
        table: &str,
        on_conflict: &str,
        rows: &[T],
    ) -> Result<UpsertOutcome<Vec<R>>, Error>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let response = self
            .post(table)?
            .query(&[("on_conflict", on_conflict)])
            .header(
                "Prefer",
                "resolution=merge-duplicates,return=representation",
            )
            .json(&rows)
            .send()
            .await?;
        let status = bridge_status(response.status());
        if status.is_success() {
            return Ok(UpsertOutcome::Stored(response.json().await?));
        }
        let err = Self::error_of(status, response.text().await.unwrap_or_default());
        if err.store_code() == Some(PG_UNIQUE_VIOLATION) {
            Ok(UpsertOutcome::Duplicate)
        } else {
            Err(err)
        }
    }

    /// Select rows matching equality `filters`, with optional ordering (e.g.
    /// `recorded_at.desc`) and row limit.
    pub async fn select<R>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        order: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<R>, Error>
    where
        R: DeserializeOwned,
    {
        let mut query: Vec<(&str, String)> = vec![("select", "*".to_owned())];
        query.extend(
            filters
                .iter()
                .map(|(column, value)| (*column, format!("eq.{}", value))),
        );
        if let Some(order) = order {
            query.push(("order", order.to_owned()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        let response = self.get(table)?.query(&query).send().await?;
        let status = bridge_status(response.status());
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::error_of(
                status,
                response.text().await.unwrap_or_default(),
            ))
        }
    }

    /// Fetch exactly one row matching the equality `filters`, mapping the
    /// storage engine's distinct "no rows" signal to `None`.
    pub async fn fetch_one<R>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Option<R>, Error>
    where
        R: DeserializeOwned,
    {
        let query: Vec<(&str, String)> = filters
            .iter()
            .map(|(column, value)| (*column, format!("eq.{}", value)))
            .collect();
        let response = self
            .get(table)?
            .query(&query)
            .header("Accept", "application/vnd.pgrst.object+json")
            .send()
            .await?;
        let status = bridge_status(response.status());
        if status.is_success() {
            return Ok(Some(response.json().await?));
        }
        let err = Self::error_of(status, response.text().await.unwrap_or_default());
        if err.store_code() == Some(PGRST_NO_ROWS) {
            Ok(None)
        } else {
            Err(err)
        }
    }

    fn get(&self, table: &str) -> Result<RequestBuilder, Error> {
        Ok(self.auth(self.client.get(self.table_url(table)?)))
    }

    fn post(&self, table: &str) -> Result<RequestBuilder, Error> {
        Ok(self.auth(self.client.post(self.table_url(table)?)))
    }

    fn auth(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", self.key.expose_secret().as_str())
            .bearer_auth(self.key.expose_secret())
    }

    fn table_url(&self, table: &str) -> Result<Url, Error> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config("storage base url cannot be a base".to_owned()))?
            .pop_if_empty()
            .push(table);
        Ok(url)
    }

    /// Parse a PostgREST error body into [`Error::Store`]. Non-JSON bodies keep
    /// their raw text as the message.
    fn error_of(status: StatusCode, body: String) -> Error {
        match serde_json::from_str::<PgrstError>(&body) {
            Ok(parsed) => Error::Store {
                status,
                code: parsed.code,
                message: parsed.message.unwrap_or(body),
            },
            Err(_) => Error::Store {
                status,
                code: None,
                message: body,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use riven::reqwest::Client;
    use secrecy::SecretString;
    use url::Url;

    use super::{Store, PGRST_NO_ROWS, PG_UNIQUE_VIOLATION};

    fn store(base: &str) -> Store {
        Store::new(
            Client::new(),
            Url::parse(base).unwrap(),
            SecretString::new("service-key".to_owned()),
        )
    }

    #[test]
    fn unique_violation_is_classified_benign() {
        let body = r#"{"code":"23505","details":"Key (player_id, recorded_at)=(42, 2025-08-25) already exists.","hint":null,"message":"duplicate key value violates unique constraint \"summoner_stats_player_id_recorded_at_key\""}"#;
        let err = Store::error_of(StatusCode::CONFLICT, body.to_owned());
        assert_eq!(Some(PG_UNIQUE_VIOLATION), err.store_code());
    }

    #[test]
    fn no_rows_signal_is_distinct() {
        let body = r#"{"code":"PGRST116","details":"The result contains 0 rows","hint":null,"message":"JSON object requested, multiple (or no) rows returned"}"#;
        let err = Store::error_of(StatusCode::NOT_ACCEPTABLE, body.to_owned());
        assert_eq!(Some(PGRST_NO_ROWS), err.store_code());
    }

    #[test]
    fn non_json_error_body_keeps_raw_text() {
        let err = Store::error_of(StatusCode::BAD_GATEWAY, "upstream unavailable".to_owned());
        assert_eq!(None, err.store_code());
        assert!(err.to_string().contains("upstream unavailable"));
    }

    #[test]
    fn table_url_joins_with_and_without_trailing_slash() {
        let with = store("http://localhost:54321/rest/v1/");
        let without = store("http://localhost:54321/rest/v1");
        assert_eq!(
            "http://localhost:54321/rest/v1/players",
            with.table_url("players").unwrap().as_str()
        );
        assert_eq!(
            "http://localhost:54321/rest/v1/players",
            without.table_url("players").unwrap().as_str()
        );
    }
}
