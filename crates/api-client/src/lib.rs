//! HTTP client for the laybridge lookup backend.
//!
//! The backend performs the actual term lookup, learning and unlearning; this
//! crate is the transport seam in front of it. Responses are handed straight
//! to `laybridge-core` for normalisation, so callers only ever see
//! [`laybridge_core::CanonicalResult`] values.
//!
//! Failure taxonomy:
//! - transport errors and non-success HTTP statuses surface as
//!   [`ApiError::Transport`] / [`ApiError::Status`]
//! - a success status whose body says `ok: false` (or is not JSON) is a
//!   logical failure, surfaced as [`ApiError::Rejected`] /
//!   [`ApiError::MalformedBody`]
//!
//! No failure is fatal; every operation is independently retryable.

pub mod sequence;

pub use sequence::{RequestTag, SequenceGuard};

use laybridge_core::{normalize, CanonicalResult, LookupParams, PreviewSelection};
use laybridge_types::NonEmptyText;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Errors returned by the lookup backend client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("{endpoint} rejected the request: {message}")]
    Rejected {
        endpoint: &'static str,
        message: String,
    },

    #[error("{endpoint} returned a body that is not JSON: {source}")]
    MalformedBody {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Type alias for Results that can fail with an [`ApiError`].
pub type ApiResult<T> = Result<T, ApiError>;

/// Body for `POST /api/commit_selection`.
///
/// Sends both the legacy (`code`/`display`) and the explicit
/// (`snomed_code`/`snomed_display`) key styles; the backend accepts either
/// and older deployments only know the legacy pair.
#[derive(Debug, Serialize)]
struct CommitSelectionBody<'a> {
    term: &'a str,
    code: &'a str,
    display: &'a str,
    lay_text: &'a str,
    snomed_code: &'a str,
    snomed_display: &'a str,
    dry_run: bool,
}

/// Body for `POST /api/unlearn`.
#[derive(Debug, Serialize)]
struct UnlearnBody<'a> {
    term: &'a str,
    keep_aliases: bool,
}

/// Blocking client for the lookup backend.
#[derive(Clone, Debug)]
pub struct LookupClient {
    base: String,
    http: reqwest::blocking::Client,
}

impl LookupClient {
    /// Create a client for the backend at `base` (e.g. `http://127.0.0.1:8000`).
    pub fn new(base: impl Into<String>) -> ApiResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|source| ApiError::Transport {
                endpoint: "client",
                source,
            })?;
        Ok(Self {
            base: base.into().trim_end_matches('/').to_owned(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// `GET /healthz` — backend liveness, for a status indicator.
    pub fn health(&self) -> ApiResult<bool> {
        const ENDPOINT: &str = "/healthz";
        let response = self
            .http
            .get(self.url(ENDPOINT))
            .send()
            .map_err(|source| ApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })?;
        let body = read_json_body(ENDPOINT, response)?;
        Ok(body.get("ok").and_then(Value::as_bool).unwrap_or(false))
    }

    /// `GET /lookup` — look a lay term up and normalise the answer.
    pub fn lookup(&self, term: &NonEmptyText, params: &LookupParams) -> ApiResult<CanonicalResult> {
        const ENDPOINT: &str = "/lookup";
        tracing::debug!(term = %term, "lookup");

        let mut query = params.query_pairs();
        query.push(("q", term.as_str().to_owned()));

        let response = self
            .http
            .get(self.url(ENDPOINT))
            .query(&query)
            .send()
            .map_err(|source| ApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })?;
        let body = read_json_body(ENDPOINT, response)?;
        Ok(normalize(&body, term.as_str()))
    }

    /// `POST /api/commit_selection` — persist the previewed code for `term`.
    ///
    /// On success the backend echoes a fresh lookup result, which is
    /// normalised and returned so the caller can reinstall it. With
    /// `dry_run` the backend validates without persisting.
    pub fn commit_selection(
        &self,
        term: &NonEmptyText,
        preview: &PreviewSelection,
        dry_run: bool,
    ) -> ApiResult<CanonicalResult> {
        const ENDPOINT: &str = "/api/commit_selection";
        tracing::debug!(term = %term, code = %preview.code, dry_run, "commit selection");

        let body = CommitSelectionBody {
            term: term.as_str(),
            code: preview.code.as_str(),
            display: &preview.display,
            lay_text: term.as_str(),
            snomed_code: preview.code.as_str(),
            snomed_display: &preview.display,
            dry_run,
        };
        let response = self
            .http
            .post(self.url(ENDPOINT))
            .json(&body)
            .send()
            .map_err(|source| ApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })?;
        let body = read_json_body(ENDPOINT, response)?;
        interpret_commit_body(ENDPOINT, term.as_str(), &body)
    }

    /// `POST /api/unlearn` — revoke the stored mapping for `term`.
    ///
    /// `keep_aliases` leaves the term's alias list in place (the default
    /// surface behaviour); pass `false` to drop the entry entirely.
    pub fn unlearn(&self, term: &NonEmptyText, keep_aliases: bool) -> ApiResult<()> {
        const ENDPOINT: &str = "/api/unlearn";
        tracing::debug!(term = %term, keep_aliases, "unlearn");

        let body = UnlearnBody {
            term: term.as_str(),
            keep_aliases,
        };
        let response = self
            .http
            .post(self.url(ENDPOINT))
            .json(&body)
            .send()
            .map_err(|source| ApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })?;

        // unlearn reports failure detail in the body even on non-2xx
        let status = response.status();
        let body: Value = match response.text() {
            Ok(text) => serde_json::from_str(&text).unwrap_or(Value::Null),
            Err(source) => {
                return Err(ApiError::Transport {
                    endpoint: ENDPOINT,
                    source,
                })
            }
        };
        interpret_unlearn_body(ENDPOINT, status.as_u16(), &body)
    }
}

/// Enforce a success status, then parse the body as JSON.
fn read_json_body(endpoint: &'static str, response: reqwest::blocking::Response) -> ApiResult<Value> {
    let status = response.status();
    let text = response.text().map_err(|source| ApiError::Transport {
        endpoint,
        source,
    })?;
    if !status.is_success() {
        return Err(ApiError::Status {
            endpoint,
            status: status.as_u16(),
            body: text,
        });
    }
    serde_json::from_str(&text).map_err(|source| ApiError::MalformedBody { endpoint, source })
}

/// Interpret a commit response body: `ok` must be true, and the embedded
/// `result` (a lookup-shaped payload) is normalised with `term` as fallback
/// text. A missing `result` degrades to an empty canonical result rather than
/// failing, matching the normaliser's tolerance elsewhere.
fn interpret_commit_body(
    endpoint: &'static str,
    term: &str,
    body: &Value,
) -> ApiResult<CanonicalResult> {
    if body.get("ok").and_then(Value::as_bool) != Some(true) {
        return Err(ApiError::Rejected {
            endpoint,
            message: failure_message(body, "commit failed"),
        });
    }
    let result = body.get("result").unwrap_or(&Value::Null);
    Ok(normalize(result, term))
}

/// Interpret an unlearn response: success requires a 2xx status and
/// `ok: true`; the failure message comes from `detail`, then `message`, then
/// the HTTP status.
fn interpret_unlearn_body(endpoint: &'static str, status: u16, body: &Value) -> ApiResult<()> {
    let ok = body.get("ok").and_then(Value::as_bool) == Some(true);
    if (200..300).contains(&status) && ok {
        return Ok(());
    }
    Err(ApiError::Rejected {
        endpoint,
        message: failure_message(body, &format!("unlearn failed ({status})")),
    })
}

fn failure_message(body: &Value, default: &str) -> String {
    for key in ["detail", "message"] {
        if let Some(message) = body.get(key).and_then(Value::as_str) {
            if !message.is_empty() {
                return message.to_owned();
            }
        }
    }
    default.to_owned()
}
