//! Shared HTTP plumbing for provider calls and page fetches.
//!
//! Every outbound call goes through a client built here, so the request
//! timeout and User-Agent policy are applied uniformly.

use crate::config::SearchConfig;
use crate::error::SearchError;
use rand::seq::SliceRandom;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Browser User-Agent strings, rotated per client.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

/// Build a [`reqwest::Client`] for provider and page requests.
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the client cannot be constructed.
pub fn build_client(config: &SearchConfig) -> Result<reqwest::Client, SearchError> {
    let ua = match config.user_agent {
        Some(ref custom) => custom.clone(),
        None => random_user_agent().to_owned(),
    };

    reqwest::Client::builder()
        .cookie_store(true)
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))
}

/// Select a random User-Agent string from the rotation list.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Map a transport failure, keeping timeouts distinguishable.
pub fn request_error(what: &str, err: &reqwest::Error) -> SearchError {
    if err.is_timeout() {
        SearchError::Timeout(format!("{what} request timed out"))
    } else {
        SearchError::Http(format!("{what} request failed: {err}"))
    }
}

/// Send `request` and decode a JSON body, labelling errors with `what`.
///
/// Non-success statuses are errors; the body is not inspected for them.
pub async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    what: &str,
) -> Result<T, SearchError> {
    let response = request
        .send()
        .await
        .map_err(|e| request_error(what, &e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SearchError::Http(format!("{what} returned HTTP {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| SearchError::Http(format!("{what} response read failed: {e}")))?;

    tracing::trace!(bytes = body.len(), what, "response received");

    serde_json::from_str(&body)
        .map_err(|e| SearchError::Parse(format!("{what} returned malformed JSON: {e}")))
}
