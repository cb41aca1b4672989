use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::domain::error::{AppError, Result};

/// Canned answer for one method and path, optionally narrowed by query pairs.
#[derive(Debug, Clone)]
pub struct StubRoute {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub status: u16,
    pub body: String,
    pub delay_ms: Option<u64>,
}

impl StubRoute {
    pub fn new(method: &str, path: &str, status: u16, body: impl Into<String>) -> Self {
        Self {
            method: method.trim().to_uppercase(),
            path: path.to_string(),
            query: Vec::new(),
            status,
            body: body.into(),
            delay_ms: None,
        }
    }

    pub fn json(method: &str, path: &str, status: u16, body: serde_json::Value) -> Self {
        Self::new(method, path, status, body.to_string())
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_lowercase(), value.to_string()));
        self
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }
}

/// A request as the stub saw it. Header and query keys are lower-cased.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }
}

#[derive(Clone)]
struct StubState {
    routes: Arc<Vec<StubRoute>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Stand-in backend on an ephemeral local port. Serves the most specific
/// matching route and records every request it receives.
pub struct StubServer {
    state: StubState,
    server: Mutex<Option<(ServerHandle, SocketAddr)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl StubServer {
    pub fn with_routes(routes: Vec<StubRoute>) -> Self {
        Self {
            state: StubState {
                routes: Arc::new(routes),
                requests: Arc::new(Mutex::new(Vec::new())),
            },
            server: Mutex::new(None),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.requests).clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        let normalized = normalize_path(path);
        self.requests()
            .into_iter()
            .filter(|req| {
                req.method.eq_ignore_ascii_case(method) && normalize_path(&req.path) == normalized
            })
            .collect()
    }

    pub fn clear_requests(&self) {
        lock(&self.state.requests).clear();
    }

    /// Base URL of the running stub, e.g. `http://127.0.0.1:41234`.
    pub fn base_url(&self) -> Option<String> {
        lock(&self.server)
            .as_ref()
            .map(|(_, addr)| format!("http://{}", addr))
    }

    pub async fn start(&self) -> Result<SocketAddr> {
        let mut server_guard = lock(&self.server);
        if server_guard.is_some() {
            return Err(AppError::ValidationError(
                "Stub server is already running.".to_string(),
            ));
        }

        let server_state = self.state.clone();
        let http_server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(server_state.clone()))
                .default_service(web::route().to(handle_stub_request))
        })
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .map_err(|err| AppError::Internal(format!("Failed to bind stub server: {}", err)))?;

        let addr = http_server
            .addrs()
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Stub server has no bound address.".to_string()))?;
        let server = http_server.run();
        *server_guard = Some((server.handle(), addr));
        tokio::spawn(server);

        info!(addr = %addr, "Stub server started");
        Ok(addr)
    }

    /// Graceful stop, forced after two seconds.
    pub async fn stop(&self) -> Result<()> {
        let handle = lock(&self.server).take();
        if let Some((handle, addr)) = handle {
            if timeout(Duration::from_secs(2), handle.stop(true)).await.is_err() {
                handle.stop(false).await;
                warn!(addr = %addr, "Stub server forced stop after timeout");
            }
        }
        Ok(())
    }
}

async fn handle_stub_request(
    req: HttpRequest,
    body: web::Bytes,
    data: web::Data<StubState>,
) -> HttpResponse {
    let method = req.method().as_str().to_uppercase();
    let path = req.path().to_string();
    let query = parse_query(req.query_string());

    lock(&data.requests).push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: query.clone(),
        headers: parse_headers(&req),
        body: String::from_utf8_lossy(&body).to_string(),
    });

    let best_match = data
        .routes
        .iter()
        .filter(|route| {
            route.method == method && normalize_path(&route.path) == normalize_path(&path)
        })
        .filter_map(|route| match_score(route, &query).map(|score| (route, score)))
        .fold(None::<(&StubRoute, usize)>, |best, (route, score)| match best {
            Some((_, best_score)) if score <= best_score => best,
            _ => Some((route, score)),
        });

    let Some((route, _)) = best_match else {
        return HttpResponse::NotFound().json(serde_json::json!({
            "error": "No mock route matched.",
            "method": method,
            "path": path
        }));
    };

    if let Some(delay_ms) = route.delay_ms.filter(|delay| *delay > 0) {
        sleep(Duration::from_millis(delay_ms)).await;
    }

    let status = actix_web::http::StatusCode::from_u16(route.status)
        .unwrap_or(actix_web::http::StatusCode::OK);
    let mut response = HttpResponse::build(status);
    if status == actix_web::http::StatusCode::NO_CONTENT {
        return response.finish();
    }

    let trimmed = route.body.trim_start();
    let content_type = if trimmed.starts_with('{') || trimmed.starts_with('[') {
        "application/json"
    } else {
        "text/plain"
    };
    response
        .append_header(("Content-Type", content_type))
        .body(route.body.clone())
}

/// Number of query rules satisfied, or `None` when one of them fails.
fn match_score(route: &StubRoute, query: &HashMap<String, String>) -> Option<usize> {
    route
        .query
        .iter()
        .all(|(key, value)| query.get(key) == Some(value))
        .then_some(route.query.len())
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed == "/" {
        return "/".to_string();
    }
    trimmed.trim_end_matches('/').to_string()
}

fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect()
}

fn parse_headers(req: &HttpRequest) -> HashMap<String, String> {
    req.headers()
        .iter()
        .filter_map(|(key, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (key.as_str().to_lowercase(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_match_score_prefers_specific_routes() {
        let generic = StubRoute::json("GET", "/api/v1/test-cases", 200, json!([]));
        let filtered = generic.clone().with_query("project_id", "p1");
        let mut query = HashMap::new();
        query.insert("project_id".to_string(), "p1".to_string());

        assert_eq!(match_score(&generic, &query), Some(0));
        assert_eq!(match_score(&filtered, &query), Some(1));
        assert_eq!(match_score(&filtered, &HashMap::new()), None);
    }

    #[test]
    fn test_path_normalization() {
        let route = StubRoute::new("get", "/api/v1/projects/", 200, "[]");
        assert_eq!(route.method, "GET");
        assert_eq!(normalize_path(&route.path), "/api/v1/projects");
        assert_eq!(normalize_path("/"), "/");
    }

    #[tokio::test]
    async fn test_serves_routes_and_records_requests() {
        let server = StubServer::with_routes(vec![
            StubRoute::json("POST", "/echo", 201, json!({"id": "e1"})),
            StubRoute::new("DELETE", "/echo/e1", 204, ""),
        ]);
        server.start().await.unwrap();
        assert!(server.start().await.is_err());

        let client = reqwest::Client::new();
        let base = server.base_url().unwrap();
        let created = client
            .post(format!("{}/echo", base))
            .header("X-Trace", "abc")
            .body(r#"{"name":"x"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(created.status().as_u16(), 201);
        assert_eq!(
            created.json::<serde_json::Value>().await.unwrap(),
            json!({"id": "e1"})
        );

        let deleted = client.delete(format!("{}/echo/e1", base)).send().await.unwrap();
        assert_eq!(deleted.status().as_u16(), 204);

        let missing = client.get(format!("{}/nope", base)).send().await.unwrap();
        assert_eq!(missing.status().as_u16(), 404);

        let recorded = server.requests_to("POST", "/echo");
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].header("x-trace"), Some("abc"));
        assert_eq!(recorded[0].json().unwrap()["name"], "x");
        assert_eq!(server.requests().len(), 3);

        server.stop().await.unwrap();
        assert!(server.base_url().is_none());
    }
}
