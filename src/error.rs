//! Error helpers.

use axum::response::IntoResponse;
use axum::Json;
use http::StatusCode;
use serde_json::json;

/// Service error taxonomy.
///
/// Read-path "zero rows" signals become [`Error::NotFound`], never a storage
/// error; benign same-day duplicates never reach this type at all (they are a
/// [`crate::store::UpsertOutcome::Duplicate`], not an error).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Identity or stat lookup matched zero rows, or the upstream returned 404.
    #[error("not found")]
    NotFound,
    /// Required fields missing on a request; rejected before any upstream call.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    /// Riot API call failed; the upstream status code (if any) propagates.
    #[error("riot api error: {0}")]
    Riot(#[from] riven::RiotApiError),
    /// Transport-level failure reaching the storage service.
    #[error("storage transport error: {0}")]
    Transport(#[from] riven::reqwest::Error),
    /// Storage service returned an error status.
    #[error("storage error ({status}): {message}")]
    Store {
        /// HTTP status returned by the storage service.
        status: StatusCode,
        /// Postgres or PostgREST error code, when the body carried one.
        code: Option<String>,
        /// Storage error message.
        message: String,
    },
    /// Bad or missing configuration at startup.
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// The storage error code, if this is a storage error carrying one.
    pub fn store_code(&self) -> Option<&str> {
        match self {
            Error::Store {
                code: Some(code), ..
            } => Some(code),
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        match self {
            Error::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
            }
            Error::MissingFields(fields) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": format!("missing required fields: {}", fields.join(", ")),
                    "fields": fields,
                })),
            )
                .into_response(),
            Error::Riot(err) => match err.status_code().map(bridge_status) {
                Some(StatusCode::NOT_FOUND) => Error::NotFound.into_response(),
                Some(status) => (
                    status,
                    Json(json!({ "error": "upstream error", "message": err.to_string() })),
                )
                    .into_response(),
                None => proxy_error(err.to_string()),
            },
            Error::Transport(err) => proxy_error(err.to_string()),
            Error::Store {
                status,
                code,
                message,
            } => (
                status,
                Json(json!({ "error": "storage error", "code": code, "message": message })),
            )
                .into_response(),
            Error::Config(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message })),
            )
                .into_response(),
        }
    }
}

/// Generic 500 for transport failures; internal detail stays in the message
/// field only.
fn proxy_error(message: String) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "proxy error", "message": message })),
    )
        .into_response()
}

/// riven bundles reqwest 0.11, whose statuses are http 0.2 types; the response
/// layer speaks http 1.x. Every wire status fits both, so the fallback never
/// fires.
pub(crate) fn bridge_status(status: riven::reqwest::StatusCode) -> StatusCode {
    StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::bridge_status;

    #[test]
    fn upstream_statuses_map_onto_the_response_types() {
        assert_eq!(
            StatusCode::NOT_FOUND,
            bridge_status(riven::reqwest::StatusCode::NOT_FOUND)
        );
        assert_eq!(
            StatusCode::TOO_MANY_REQUESTS,
            bridge_status(riven::reqwest::StatusCode::TOO_MANY_REQUESTS)
        );
        // Non-standard codes survive the crossing unchanged.
        let nonstandard = riven::reqwest::StatusCode::from_u16(499).unwrap();
        assert_eq!(499, bridge_status(nonstandard).as_u16());
    }
}
