//! Request executor.
//!
//! Builds and issues REST calls: path templating, query serialization,
//! auth injection, correlation ids, and the success/error envelope with
//! rate-limit metadata.

use crate::error::{ClientError, ClientResult};
use crate::http::{HttpClient, HttpRequest, HttpResponse, Method};
use crate::token::{acquire_with_retry, TokenProvider, TOKEN_MAX_ATTEMPTS};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

/// Domain tag used in API error messages.
const ERROR_DOMAIN: &str = "feeds";

/// A query parameter value.
///
/// Lists join with commas before URL encoding; timestamps render as
/// ISO-8601; JSON values are stringified; scalars pass through encoded.
#[derive(Debug, Clone)]
pub enum QueryValue {
    /// A string value.
    Str(String),
    /// An integer value.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// A list, joined with commas.
    List(Vec<String>),
    /// A timestamp, rendered as ISO-8601.
    Timestamp(DateTime<Utc>),
    /// An arbitrary JSON value, stringified.
    Json(serde_json::Value),
}

impl QueryValue {
    fn render(&self) -> String {
        match self {
            QueryValue::Str(s) => s.clone(),
            QueryValue::Int(n) => n.to_string(),
            QueryValue::Float(f) => f.to_string(),
            QueryValue::Bool(b) => b.to_string(),
            QueryValue::List(items) => items.join(","),
            QueryValue::Timestamp(t) => t.to_rfc3339(),
            QueryValue::Json(v) => v.to_string(),
        }
    }
}

/// Parsed rate-limit response headers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RateLimitInfo {
    /// Request quota for the current window.
    pub rate_limit: Option<u64>,
    /// Requests remaining in the current window.
    pub rate_limit_remaining: Option<u64>,
    /// When the window resets, derived from a Unix-epoch-seconds header.
    pub rate_limit_reset: Option<DateTime<Utc>>,
}

impl RateLimitInfo {
    fn from_headers(response: &HttpResponse) -> Self {
        let uint = |name: &str| response.header(name).and_then(|v| v.parse::<u64>().ok());
        Self {
            rate_limit: uint("x-ratelimit-limit"),
            rate_limit_remaining: uint("x-ratelimit-remaining"),
            rate_limit_reset: response
                .header("x-ratelimit-reset")
                .and_then(|v| v.parse::<i64>().ok())
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        }
    }
}

/// Metadata attached to every response, success or error.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponseMetadata {
    /// The correlation id sent with the request.
    pub client_request_id: String,
    /// Raw response headers.
    pub response_headers: Vec<(String, String)>,
    /// HTTP status code.
    pub response_code: u16,
    /// Parsed rate-limit headers.
    pub rate_limit: RateLimitInfo,
}

/// A decoded response body plus its metadata.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    /// The endpoint's decoded body.
    pub body: T,
    /// Correlation id, headers, status, rate limits.
    pub metadata: ResponseMetadata,
}

/// Best-effort shape of a server error body.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// Builds and issues HTTP calls against the feed service.
pub struct RequestExecutor {
    base_url: Url,
    api_key: String,
    client_id: String,
    token_provider: Arc<dyn TokenProvider>,
    http: Arc<dyn HttpClient>,
}

impl RequestExecutor {
    /// Creates an executor.
    ///
    /// `client_id` is the fixed identification string sent with every
    /// request (e.g. `"feedsync-rust-0.1.0"`).
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        client_id: impl Into<String>,
        token_provider: Arc<dyn TokenProvider>,
        http: Arc<dyn HttpClient>,
    ) -> ClientResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::unknown(format!("invalid base url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::unknown("base url cannot be a base"));
        }
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            client_id: client_id.into(),
            token_provider,
            http,
        })
    }

    /// Issues one request and decodes the response body as `T`.
    ///
    /// `path_template` uses `{name}` placeholders filled from
    /// `path_params`, each value percent-encoded as a path segment.
    pub fn send<B, T>(
        &self,
        method: Method,
        path_template: &str,
        path_params: &[(&str, &str)],
        query: &[(&str, QueryValue)],
        body: Option<&B>,
    ) -> ClientResult<ApiResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.build_url(path_template, path_params, query)?;

        // Token is acquired fresh immediately before sending.
        let token = acquire_with_retry(&*self.token_provider, TOKEN_MAX_ATTEMPTS)?;
        let client_request_id = uuid::Uuid::new_v4().to_string();

        let body_bytes = match body {
            Some(b) => Some(serde_json::to_vec(b)?),
            None => None,
        };

        let request = HttpRequest {
            method,
            url: url.to_string(),
            headers: vec![
                ("authorization".into(), format!("Bearer {token}")),
                ("x-auth-type".into(), "jwt".into()),
                ("content-type".into(), "application/json".into()),
                ("x-client-id".into(), self.client_id.clone()),
                ("accept-encoding".into(), "gzip".into()),
                ("x-client-request-id".into(), client_request_id.clone()),
            ],
            body: body_bytes,
        };

        tracing::debug!(
            method = method.as_str(),
            url = %url,
            request_id = %client_request_id,
            "sending request"
        );

        let response = self
            .http
            .execute(request)
            .map_err(|message| ClientError::Transport { message })?;

        let metadata = ResponseMetadata {
            client_request_id,
            response_headers: response.headers.clone(),
            response_code: response.status,
            rate_limit: RateLimitInfo::from_headers(&response),
        };

        if response.is_success() {
            let bytes: &[u8] = if response.body.is_empty() {
                b"null"
            } else {
                &response.body
            };
            let body = serde_json::from_slice(bytes)?;
            Ok(ApiResponse { body, metadata })
        } else {
            Err(self.api_error(&response, metadata))
        }
    }

    fn api_error(&self, response: &HttpResponse, metadata: ResponseMetadata) -> ClientError {
        let parsed: Option<ApiErrorBody> = serde_json::from_slice(&response.body).ok();
        let (code, server_message) = match parsed {
            Some(body) => (
                body.code.unwrap_or(response.status),
                body.message
                    .or(body.detail)
                    .unwrap_or_else(|| "request failed".to_owned()),
            ),
            None => (response.status, "request failed".to_owned()),
        };

        tracing::debug!(
            status = response.status,
            code,
            request_id = %metadata.client_request_id,
            "server reported error"
        );

        ClientError::Api {
            message: format!("{ERROR_DOMAIN} error code {code}: {server_message}"),
            code,
            metadata,
        }
    }

    fn build_url(
        &self,
        path_template: &str,
        path_params: &[(&str, &str)],
        query: &[(&str, QueryValue)],
    ) -> ClientResult<Url> {
        let mut url = self.base_url.clone();

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ClientError::unknown("base url cannot be a base"))?;
            segments.pop_if_empty();

            for segment in path_template.split('/').filter(|s| !s.is_empty()) {
                let value = match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    Some(name) => path_params
                        .iter()
                        .find(|(k, _)| *k == name)
                        .map(|(_, v)| *v)
                        .ok_or_else(|| {
                            ClientError::unknown(format!("missing path parameter: {name}"))
                        })?,
                    None => segment,
                };
                // `push` percent-encodes the segment.
                segments.push(value);
            }
        }

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api_key", &self.api_key);
            for (name, value) in query {
                pairs.append_pair(name, &value.render());
            }
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockHttpClient;
    use crate::token::StaticTokenProvider;
    use chrono::TimeZone;
    use feedsync_model::GetFeedResponse;

    fn executor(mock: Arc<MockHttpClient>) -> RequestExecutor {
        RequestExecutor::new(
            "https://api.example.com/v1",
            "key123",
            "feedsync-rust-0.1.0",
            Arc::new(StaticTokenProvider::new("tok")),
            mock,
        )
        .unwrap()
    }

    fn ok_feed_response() -> HttpResponse {
        HttpResponse::json(200, r#"{"activities": []}"#)
    }

    #[test]
    fn path_template_substitution_encodes_segments() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_response(ok_feed_response());
        let exec = executor(Arc::clone(&mock));

        let _resp: ApiResponse<GetFeedResponse> = exec
            .send(
                Method::Get,
                "feeds/{group}/{id}",
                &[("group", "user"), ("id", "jane doe")],
                &[],
                None::<&()>,
            )
            .unwrap();

        let url = &mock.requests()[0].url;
        assert!(url.starts_with("https://api.example.com/v1/feeds/user/jane%20doe?"));
    }

    #[test]
    fn missing_path_parameter_fails() {
        let mock = Arc::new(MockHttpClient::new());
        let exec = executor(mock);

        let result: ClientResult<ApiResponse<GetFeedResponse>> =
            exec.send(Method::Get, "feeds/{group}/{id}", &[("group", "user")], &[], None::<&()>);
        assert!(matches!(result, Err(ClientError::Unknown { .. })));
    }

    #[test]
    fn query_serialization_rules() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_response(ok_feed_response());
        let exec = executor(Arc::clone(&mock));

        let when = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let _resp: ApiResponse<GetFeedResponse> = exec
            .send(
                Method::Get,
                "feeds",
                &[],
                &[
                    ("ids", QueryValue::List(vec!["a".into(), "b".into()])),
                    ("since", QueryValue::Timestamp(when)),
                    ("limit", QueryValue::Int(10)),
                    ("watch", QueryValue::Bool(true)),
                    (
                        "filter",
                        QueryValue::Json(serde_json::json!({"kind": "like"})),
                    ),
                ],
                None::<&()>,
            )
            .unwrap();

        let url = &mock.requests()[0].url;
        // Lists join with commas, then URL-encode.
        assert!(url.contains("ids=a%2Cb"));
        // Timestamps are ISO-8601.
        assert!(url.contains("since=2024-05-01T12%3A00%3A00%2B00%3A00"));
        assert!(url.contains("limit=10"));
        assert!(url.contains("watch=true"));
        // JSON values stringify.
        assert!(url.contains("filter=%7B%22kind%22%3A%22like%22%7D"));
        // The api key rides along on every request.
        assert!(url.contains("api_key=key123"));
    }

    #[test]
    fn auth_and_identification_headers() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_response(ok_feed_response());
        mock.push_response(ok_feed_response());
        let exec = executor(Arc::clone(&mock));

        for _ in 0..2 {
            let _resp: ApiResponse<GetFeedResponse> =
                exec.send(Method::Get, "feeds", &[], &[], None::<&()>).unwrap();
        }

        let requests = mock.requests();
        let first = &requests[0];
        assert_eq!(first.header("authorization"), Some("Bearer tok"));
        assert_eq!(first.header("x-auth-type"), Some("jwt"));
        assert_eq!(first.header("content-type"), Some("application/json"));
        assert_eq!(first.header("x-client-id"), Some("feedsync-rust-0.1.0"));
        assert_eq!(first.header("accept-encoding"), Some("gzip"));

        // Correlation ids are fresh per request.
        let id0 = requests[0].header("x-client-request-id").unwrap();
        let id1 = requests[1].header("x-client-request-id").unwrap();
        assert_ne!(id0, id1);
    }

    #[test]
    fn success_metadata_includes_rate_limits() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_response(HttpResponse {
            status: 200,
            headers: vec![
                ("x-ratelimit-limit".into(), "60".into()),
                ("x-ratelimit-remaining".into(), "59".into()),
                ("x-ratelimit-reset".into(), "1714564800".into()),
            ],
            body: br#"{"activities": []}"#.to_vec(),
        });
        let exec = executor(mock);

        let resp: ApiResponse<GetFeedResponse> =
            exec.send(Method::Get, "feeds", &[], &[], None::<&()>).unwrap();

        assert_eq!(resp.metadata.response_code, 200);
        assert_eq!(resp.metadata.rate_limit.rate_limit, Some(60));
        assert_eq!(resp.metadata.rate_limit.rate_limit_remaining, Some(59));
        assert_eq!(
            resp.metadata.rate_limit.rate_limit_reset,
            DateTime::<Utc>::from_timestamp(1_714_564_800, 0)
        );
        assert!(!resp.metadata.client_request_id.is_empty());
    }

    #[test]
    fn transport_failure_maps_to_transport_error() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_transport_error("connection reset");
        let exec = executor(mock);

        let result: ClientResult<ApiResponse<GetFeedResponse>> =
            exec.send(Method::Get, "feeds", &[], &[], None::<&()>);
        match result {
            Err(ClientError::Transport { message }) => assert_eq!(message, "connection reset"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn server_error_carries_code_and_metadata() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_response(HttpResponse {
            status: 429,
            headers: vec![("x-ratelimit-remaining".into(), "0".into())],
            body: br#"{"code": 9, "message": "rate limited"}"#.to_vec(),
        });
        let exec = executor(mock);

        let result: ClientResult<ApiResponse<GetFeedResponse>> =
            exec.send(Method::Get, "feeds", &[], &[], None::<&()>);
        match result {
            Err(ClientError::Api {
                message,
                code,
                metadata,
            }) => {
                assert_eq!(message, "feeds error code 9: rate limited");
                assert_eq!(code, 9);
                assert_eq!(metadata.response_code, 429);
                assert_eq!(metadata.rate_limit.rate_limit_remaining, Some(0));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn error_code_falls_back_to_http_status() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_response(HttpResponse::json(503, "not json"));
        let exec = executor(mock);

        let result: ClientResult<ApiResponse<GetFeedResponse>> =
            exec.send(Method::Get, "feeds", &[], &[], None::<&()>);
        match result {
            Err(ClientError::Api { message, code, .. }) => {
                assert_eq!(code, 503);
                assert!(message.starts_with("feeds error code 503:"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn token_failures_exhaust_budget() {
        struct AlwaysFails;
        impl TokenProvider for AlwaysFails {
            fn acquire(&self) -> Result<String, String> {
                Err("no credentials".into())
            }
        }

        let mock = Arc::new(MockHttpClient::new());
        let exec = RequestExecutor::new(
            "https://api.example.com",
            "key",
            "cid",
            Arc::new(AlwaysFails),
            Arc::clone(&mock) as Arc<dyn HttpClient>,
        )
        .unwrap();

        let result: ClientResult<ApiResponse<GetFeedResponse>> =
            exec.send(Method::Get, "feeds", &[], &[], None::<&()>);
        assert!(matches!(
            result,
            Err(ClientError::TokenAcquisition { attempts: 3, .. })
        ));
        // The request was never sent.
        assert_eq!(mock.request_count(), 0);
    }
}
