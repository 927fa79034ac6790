use std::{sync::Arc, time::Duration};

use bpl_common::OrderNumber;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER},
    Client,
    StatusCode,
};

use crate::accrual::{AccrualAuthority, AccrualClientError, AccrualReply, AccrualReport};

/// The hold applied when the authority throttles us without saying for how long.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);
/// The longest hold the authority can impose. Longer `Retry-After` values are clamped to this.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

/// An [`AccrualAuthority`] that talks to the accrual system over HTTP.
///
/// Every query is a single `GET {base_url}/api/orders/{number}`. The client never retries.
#[derive(Clone)]
pub struct AccrualHttpClient {
    base_url: String,
    timeout: Duration,
    client: Arc<Client>,
}

impl AccrualHttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AccrualClientError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AccrualClientError::Initialization(e.to_string()))?;
        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self { base_url, timeout, client: Arc::new(client) })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn url(&self, number: &OrderNumber) -> String {
        format!("{}/api/orders/{number}", self.base_url)
    }
}

impl AccrualAuthority for AccrualHttpClient {
    async fn query_order(&self, number: &OrderNumber) -> Result<AccrualReply, AccrualClientError> {
        let url = self.url(number);
        trace!("📡️ GET {url}");
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AccrualClientError::Timeout(self.timeout)
            } else {
                AccrualClientError::Transport(e.to_string())
            }
        })?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                AccrualClientError::Timeout(self.timeout)
            } else {
                AccrualClientError::Transport(e.to_string())
            }
        })?;
        let reply = interpret(status, &headers, &body);
        trace!("📡️ Authority replied {status} for order {number}: {reply:?}");
        Ok(reply)
    }
}

/// Maps a raw authority response onto an [`AccrualReply`].
pub fn interpret(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> AccrualReply {
    match status {
        StatusCode::OK => match serde_json::from_slice::<AccrualReport>(body) {
            Ok(report) => AccrualReply::Report(report),
            Err(e) => {
                let text = String::from_utf8_lossy(body);
                AccrualReply::Failure(format!("Could not decode authority report ({e}): {text}"))
            },
        },
        StatusCode::NO_CONTENT => AccrualReply::NoInformation,
        StatusCode::TOO_MANY_REQUESTS => AccrualReply::RateLimited(retry_after(headers)),
        StatusCode::INTERNAL_SERVER_ERROR => AccrualReply::Failure("Authority reported an internal error".into()),
        other => AccrualReply::Failure(format!("Unexpected authority response: {other}")),
    }
}

/// Reads the `Retry-After` header as a whole number of seconds, capped at [`MAX_RETRY_AFTER`].
fn retry_after(headers: &HeaderMap) -> Duration {
    let requested = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    match requested {
        Some(delay) if delay > MAX_RETRY_AFTER => {
            warn!("📡️ Authority asked us to back off for {delay:?}. Holding for {MAX_RETRY_AFTER:?} instead");
            MAX_RETRY_AFTER
        },
        Some(delay) => delay,
        None => {
            warn!("📡️ Authority throttled us without a usable Retry-After header. Holding for {DEFAULT_RETRY_AFTER:?}");
            DEFAULT_RETRY_AFTER
        },
    }
}

#[cfg(test)]
mod test {
    use bpl_common::Points;

    use super::*;
    use crate::accrual::AuthorityStatus;

    fn no_headers() -> HeaderMap {
        HeaderMap::new()
    }

    #[test]
    fn processed_report() {
        let body = br#"{"order": "12345678903", "status": "PROCESSED", "accrual": 500}"#;
        let reply = interpret(StatusCode::OK, &no_headers(), body);
        let AccrualReply::Report(report) = reply else { panic!("Expected a report, got {reply:?}") };
        assert_eq!(report.order, "12345678903");
        assert_eq!(report.status, AuthorityStatus::Processed);
        assert_eq!(report.accrual, Some(Points::from(500.0)));
    }

    #[test]
    fn report_without_accrual() {
        let body = br#"{"order": "12345678903", "status": "REGISTERED"}"#;
        match interpret(StatusCode::OK, &no_headers(), body) {
            AccrualReply::Report(r) => {
                assert_eq!(r.status, AuthorityStatus::Registered);
                assert!(r.accrual.is_none());
            },
            other => panic!("Expected a report, got {other:?}"),
        }
    }

    #[test]
    fn unknown_status_is_still_a_report() {
        let body = br#"{"order": "12345678903", "status": "ON_HOLD"}"#;
        match interpret(StatusCode::OK, &no_headers(), body) {
            AccrualReply::Report(r) => assert_eq!(r.status, AuthorityStatus::Unknown),
            other => panic!("Expected a report, got {other:?}"),
        }
    }

    #[test]
    fn garbage_body_is_a_failure() {
        let reply = interpret(StatusCode::OK, &no_headers(), b"<html>oops</html>");
        assert!(matches!(reply, AccrualReply::Failure(_)));
    }

    #[test]
    fn no_content() {
        assert_eq!(interpret(StatusCode::NO_CONTENT, &no_headers(), b""), AccrualReply::NoInformation);
    }

    #[test]
    fn rate_limited() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("60"));
        let body = b"No more than 10 requests per minute allowed";
        let reply = interpret(StatusCode::TOO_MANY_REQUESTS, &headers, body);
        assert_eq!(reply, AccrualReply::RateLimited(Duration::from_secs(60)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        let reply = interpret(StatusCode::TOO_MANY_REQUESTS, &headers, body);
        assert_eq!(reply, AccrualReply::RateLimited(Duration::from_secs(3)));
    }

    #[test]
    fn rate_limited_without_usable_header() {
        let reply = interpret(StatusCode::TOO_MANY_REQUESTS, &no_headers(), b"");
        assert_eq!(reply, AccrualReply::RateLimited(DEFAULT_RETRY_AFTER));

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        let reply = interpret(StatusCode::TOO_MANY_REQUESTS, &headers, b"");
        assert_eq!(reply, AccrualReply::RateLimited(DEFAULT_RETRY_AFTER));
    }

    #[test]
    fn huge_retry_after_is_capped() {
        let mut headers = HeaderMap::new();
        for value in ["86401", "99999999999999999", "18446744073709551615"] {
            headers.insert(RETRY_AFTER, HeaderValue::from_static(value));
            let reply = interpret(StatusCode::TOO_MANY_REQUESTS, &headers, b"");
            assert_eq!(reply, AccrualReply::RateLimited(MAX_RETRY_AFTER), "Retry-After: {value}");
        }
        headers.insert(RETRY_AFTER, HeaderValue::from_static("86400"));
        assert_eq!(interpret(StatusCode::TOO_MANY_REQUESTS, &headers, b""), AccrualReply::RateLimited(MAX_RETRY_AFTER));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("0"));
        assert_eq!(interpret(StatusCode::TOO_MANY_REQUESTS, &headers, b""), AccrualReply::RateLimited(Duration::ZERO));
    }

    #[test]
    fn server_errors() {
        assert!(matches!(interpret(StatusCode::INTERNAL_SERVER_ERROR, &no_headers(), b""), AccrualReply::Failure(_)));
        assert!(matches!(interpret(StatusCode::BAD_GATEWAY, &no_headers(), b""), AccrualReply::Failure(_)));
        assert!(matches!(interpret(StatusCode::NOT_FOUND, &no_headers(), b""), AccrualReply::Failure(_)));
    }

    #[test]
    fn trailing_slashes_are_trimmed() {
        let client = AccrualHttpClient::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        let number: OrderNumber = "12345678903".parse().unwrap();
        assert_eq!(client.url(&number), "http://localhost:8080/api/orders/12345678903");
    }
}
