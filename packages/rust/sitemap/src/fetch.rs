//! HTTP plumbing shared by sitemap discovery and the page crawler.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use sitedocs_shared::{Result, SiteDocsError};
use tracing::debug;
use url::Url;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Build a reqwest client with the crawler's settings.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(timeout)
        .build()
        .map_err(|e| SiteDocsError::network(format!("failed to build HTTP client: {e}")))
}

/// GET `url` and return the body as text.
///
/// Non-2xx statuses, oversized bodies, and transport errors become
/// [`SiteDocsError::Network`]; timeouts, connection failures, 5xx and 429
/// are marked transient.
pub async fn fetch_text(client: &Client, url: &Url, max_bytes: u64) -> Result<String> {
    debug!(%url, "GET");

    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| request_error(url, &e))?;

    let status = response.status();
    if !status.is_success() {
        let msg = format!("{url}: HTTP {status}");
        return Err(if is_transient_status(status) {
            SiteDocsError::transient(msg)
        } else {
            SiteDocsError::network(msg)
        });
    }

    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(SiteDocsError::network(format!(
                "{url}: response too large ({len} bytes, max {max_bytes})"
            )));
        }
    }

    let body = response
        .text()
        .await
        .map_err(|e| request_error(url, &e))?;

    if body.len() as u64 > max_bytes {
        return Err(SiteDocsError::network(format!(
            "{url}: response too large ({} bytes, max {max_bytes})",
            body.len()
        )));
    }

    Ok(body)
}

fn request_error(url: &Url, err: &reqwest::Error) -> SiteDocsError {
    let msg = format!("{url}: {err}");
    if err.is_timeout() || err.is_connect() || err.is_request() {
        SiteDocsError::transient(msg)
    } else {
        SiteDocsError::network(msg)
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses() {
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
        assert!(!is_transient_status(StatusCode::FORBIDDEN));
    }

    #[tokio::test]
    async fn fetch_text_classifies_statuses() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/gone"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/busy"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = build_client("sitedocs-test", Duration::from_secs(5)).unwrap();
        let base = Url::parse(&server.uri()).unwrap();

        let err = fetch_text(&client, &base.join("/gone").unwrap(), 1024)
            .await
            .unwrap_err();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("404"));

        let err = fetch_text(&client, &base.join("/busy").unwrap(), 1024)
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn fetch_text_enforces_size_limit() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/big"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("x".repeat(64)))
            .mount(&server)
            .await;

        let client = build_client("sitedocs-test", Duration::from_secs(5)).unwrap();
        let url = Url::parse(&server.uri()).unwrap().join("/big").unwrap();

        let err = fetch_text(&client, &url, 16).await.unwrap_err();
        assert!(err.to_string().contains("too large"));

        let body = fetch_text(&client, &url, 1024).await.unwrap();
        assert_eq!(body.len(), 64);
    }

    #[tokio::test]
    async fn timeout_is_transient() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/slow"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = build_client("sitedocs-test", Duration::from_millis(100)).unwrap();
        let url = Url::parse(&server.uri()).unwrap().join("/slow").unwrap();

        let err = fetch_text(&client, &url, 1024).await.unwrap_err();
        assert!(err.is_transient());
    }
}
