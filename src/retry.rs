//! Bounded retry with exponential backoff for outbound provider calls.
//!
//! Only transport failures and transient provider statuses are retried.
//! Parse and validation failures are never retried: a malformed response
//! will not get better by asking again.

use std::future::Future;
use std::time::Duration;

use reqwest::Response;
use reqwest::StatusCode;
use tracing::warn;

use crate::errors::IndoRagError;
use crate::errors::Result;

/// Maximum attempts per outbound call, including the first one.
pub const MAX_ATTEMPTS: u32 = 3;

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Send a request up to [`MAX_ATTEMPTS`] times, backing off exponentially
/// between attempts.
///
/// Returns the first response whose status is not transient; the caller still
/// has to check for client errors (4xx other than 429) and parse the body.
pub async fn send_with_retry<F, Fut>(what: &str, mut send: F) -> Result<Response>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<Response, reqwest::Error>>,
{
    let mut backoff = INITIAL_BACKOFF;
    let mut last_error = String::new();

    for attempt in 1..=MAX_ATTEMPTS {
        match send().await {
            Ok(response) if !is_transient(response.status()) => return Ok(response),
            Ok(response) => {
                last_error = format!("transient status {}", response.status());
            }
            Err(e) => {
                last_error = e.to_string();
            }
        }

        if attempt < MAX_ATTEMPTS {
            warn!(
                "{what} attempt {attempt}/{MAX_ATTEMPTS} failed ({last_error}), retrying in {:?}",
                backoff
            );
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }

    Err(IndoRagError::Http(format!(
        "{what} failed after {MAX_ATTEMPTS} attempts: {last_error}"
    )))
}
