use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, error, warn};
use url::Url;

use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::{ApiEndpoints, AppConfig};
use crate::infrastructure::response::{extract_detail, extract_function_error};
use crate::infrastructure::storage::{SessionStorage, TOKEN_KEY};

#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<JsonValue>,
    pub query: Vec<(String, String)>,
    /// Appended to the endpoint path, each one percent-encoded.
    pub segments: Vec<String>,
    /// Attach the stored bearer token. Off for the sign-in calls.
    pub authenticated: bool,
    /// Token to use instead of the stored one.
    pub bearer: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            query: Vec::new(),
            segments: Vec::new(),
            authenticated: true,
            bearer: None,
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: JsonValue) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn put(body: JsonValue) -> Self {
        Self {
            method: Method::PUT,
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn delete() -> Self {
        Self {
            method: Method::DELETE,
            ..Self::default()
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// JSON-over-HTTP client for the backend. One attempt per call, no timeout.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    endpoints: ApiEndpoints,
    storage: Arc<dyn SessionStorage>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        endpoints: ApiEndpoints,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            endpoints,
            storage,
        }
    }

    pub fn from_config(config: &AppConfig, storage: Arc<dyn SessionStorage>) -> Self {
        Self::new(config.api_base_url.clone(), config.endpoints.clone(), storage)
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `endpoint`. Absolute endpoints pass through untouched.
    pub fn api_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http") {
            return endpoint.to_string();
        }
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    fn build_url(&self, endpoint: &str, options: &RequestOptions) -> Result<Url> {
        let raw = self.api_url(endpoint);
        let mut url = Url::parse(&raw).map_err(|e| {
            AppError::ValidationError(format!("Invalid request URL '{}': {}", raw, e))
        })?;
        if !options.segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| AppError::ValidationError(format!("Invalid request URL '{}'", raw)))?
                .pop_if_empty()
                .extend(&options.segments);
        }
        if !options.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &options.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn bearer_token(&self, options: &RequestOptions) -> Option<String> {
        if let Some(token) = &options.bearer {
            return Some(token.clone());
        }
        if !options.authenticated {
            return None;
        }
        match self.storage.get(TOKEN_KEY) {
            Ok(token) => token.filter(|token| !token.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read stored token, sending request without it");
                None
            }
        }
    }

    /// Sends the request and returns the parsed body, or `None` for 204 and empty bodies.
    ///
    /// A failed response becomes `AppError::Http` carrying the server's `detail`.
    pub async fn send(&self, endpoint: &str, options: RequestOptions) -> Result<Option<JsonValue>> {
        self.send_with(endpoint, options, extract_detail).await
    }

    /// POSTs `body` to a remote function. A failure carries the error the function reported.
    pub async fn send_function(&self, url: &str, body: JsonValue) -> Result<Option<JsonValue>> {
        self.send_with(url, RequestOptions::post(body), extract_function_error)
            .await
    }

    async fn send_with(
        &self,
        endpoint: &str,
        options: RequestOptions,
        error_detail: fn(&str) -> Option<String>,
    ) -> Result<Option<JsonValue>> {
        let url = self.build_url(endpoint, &options)?;
        let mut builder = self.http.request(options.method.clone(), url.clone());

        if let Some(token) = self.bearer_token(&options) {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &options.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(serde_json::to_vec(body)?);
        }

        debug!(method = %options.method, url = %url, "API request");

        let response = builder.send().await.map_err(|e| {
            error!(error = %e, method = %options.method, url = %url, "API request failed");
            AppError::NetworkError(format!("Request failed: {}", e))
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::NetworkError(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let detail = error_detail(&text);
            warn!(
                status = status.as_u16(),
                method = %options.method,
                url = %url,
                detail = detail.as_deref().unwrap_or(""),
                "API error response"
            );
            return Err(AppError::Http {
                status: status.as_u16(),
                detail,
            });
        }

        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&text).map(Some).map_err(|e| {
            error!(error = %e, url = %url, "Malformed response body");
            AppError::ParseError(format!("Malformed response from {}: {}", url.path(), e))
        })
    }

    /// Sends the request and deserializes the body into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let value = self
            .send(endpoint, options)
            .await?
            .ok_or_else(|| AppError::ParseError(format!("Empty response from {}", endpoint)))?;
        serde_json::from_value(value).map_err(|e| {
            AppError::ParseError(format!("Unexpected response from {}: {}", endpoint, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::MemoryStorage;
    use crate::interfaces::mock_server::StubRoute;
    use crate::test_support::start_backend;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Item {
        id: String,
    }

    #[test]
    fn test_api_url_building() {
        let client = ApiClient::new(
            "http://127.0.0.1:8001/",
            ApiEndpoints::default(),
            Arc::new(MemoryStorage::default()),
        );
        assert_eq!(
            client.api_url("/api/v1/projects"),
            "http://127.0.0.1:8001/api/v1/projects"
        );
        assert_eq!(client.api_url("api/v1/x"), "http://127.0.0.1:8001/api/v1/x");
        assert_eq!(
            client.api_url("https://fn.example.com/run"),
            "https://fn.example.com/run"
        );
    }

    #[test]
    fn test_segments_are_percent_encoded() {
        let client = ApiClient::new(
            "http://127.0.0.1:8001",
            ApiEndpoints::default(),
            Arc::new(MemoryStorage::default()),
        );
        let url = client
            .build_url("/api/v1/projects/", &RequestOptions::get().segment("a/b?c d"))
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8001/api/v1/projects/a%2Fb%3Fc%20d");
    }

    #[tokio::test]
    async fn test_attaches_token_and_content_type() {
        let backend = start_backend(vec![StubRoute::json(
            "POST",
            "/api/v1/things",
            201,
            json!({"id": "x1"}),
        )])
        .await;
        backend.storage.set(TOKEN_KEY, "tok-123").unwrap();

        let item: Item = backend
            .client
            .request(
                "/api/v1/things",
                RequestOptions::post(json!({"name": "thing"})).query("project_id", "p 1"),
            )
            .await
            .unwrap();
        assert_eq!(item.id, "x1");

        let recorded = backend.server.requests_to("POST", "/api/v1/things");
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].header("authorization"), Some("Bearer tok-123"));
        assert_eq!(recorded[0].header("content-type"), Some("application/json"));
        assert_eq!(recorded[0].query.get("project_id").map(String::as_str), Some("p 1"));
        assert_eq!(recorded[0].json().unwrap(), json!({"name": "thing"}));
        backend.shutdown().await;
    }

    #[tokio::test]
    async fn test_omits_token_when_absent_or_anonymous() {
        let backend = start_backend(vec![StubRoute::json("GET", "/open", 200, json!([]))]).await;

        backend.client.send("/open", RequestOptions::get()).await.unwrap();
        backend.storage.set(TOKEN_KEY, "tok").unwrap();
        backend
            .client
            .send("/open", RequestOptions::get().anonymous())
            .await
            .unwrap();

        let recorded = backend.server.requests_to("GET", "/open");
        assert_eq!(recorded.len(), 2);
        assert!(recorded.iter().all(|req| req.header("authorization").is_none()));
        assert!(recorded[0].header("content-type").is_none());
        backend.shutdown().await;
    }

    #[tokio::test]
    async fn test_error_normalization() {
        let backend = start_backend(vec![
            StubRoute::json("GET", "/detail", 400, json!({"detail": "X"})),
            StubRoute::new("GET", "/html", 502, "<html>Bad Gateway</html>"),
            StubRoute::new("GET", "/garbled", 200, "{not json"),
            StubRoute::new("DELETE", "/gone", 204, ""),
            StubRoute::json("GET", "/message", 500, json!({"message": "boom", "error": "Server"})),
            StubRoute::json("GET", "/multiline", 422, json!({"detail": "Line one\n  Line  two"})),
        ])
        .await;

        let err = backend.client.send("/detail", RequestOptions::get()).await.unwrap_err();
        assert_eq!(
            err,
            AppError::Http {
                status: 400,
                detail: Some("X".to_string())
            }
        );
        assert_eq!(err.user_message("fallback"), "X");

        let err = backend.client.send("/html", RequestOptions::get()).await.unwrap_err();
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.user_message("fallback"), "fallback");

        let err = backend.client.send("/garbled", RequestOptions::get()).await.unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));

        let err = backend.client.send("/message", RequestOptions::get()).await.unwrap_err();
        assert_eq!(err, AppError::Http { status: 500, detail: None });
        assert_eq!(err.user_message("Failed to fetch projects"), "Failed to fetch projects");

        let err = backend.client.send("/multiline", RequestOptions::get()).await.unwrap_err();
        assert_eq!(err.user_message("fallback"), "Line one\n  Line  two");

        let body = backend.client.send("/gone", RequestOptions::delete()).await.unwrap();
        assert!(body.is_none());
        backend.shutdown().await;
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let client = ApiClient::new(
            "http://127.0.0.1:9",
            ApiEndpoints::default(),
            Arc::new(MemoryStorage::default()),
        );
        let err = client.send("/anything", RequestOptions::get()).await.unwrap_err();
        assert!(matches!(err, AppError::NetworkError(_)));
    }
}
