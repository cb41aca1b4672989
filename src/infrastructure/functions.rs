use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::info;

use crate::domain::error::{AppError, Result};
use crate::infrastructure::api_client::ApiClient;

pub const GENERATE_TESTS: &str = "ai-generate-tests";
pub const DEBUG_TESTS: &str = "ai-debug-tests";
pub const PRIORITIZE_TESTS: &str = "ai-prioritize-tests";
pub const EXECUTE_API_TEST: &str = "execute-api-test";
pub const EXECUTE_VISUAL_TEST: &str = "execute-visual-test";
pub const EXECUTE_PERFORMANCE_TEST: &str = "execute-performance-test";
pub const EXECUTE_SECURITY_TEST: &str = "execute-security-test";

/// Opaque remote-function channel used for AI assistance and test execution.
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke(&self, name: &str, body: JsonValue) -> Result<JsonValue>;
}

/// Invokes functions by POSTing JSON to `{functions_url}/{name}` with the session token.
pub struct HttpFunctionsClient {
    api: Arc<ApiClient>,
    functions_url: String,
}

impl HttpFunctionsClient {
    pub fn new(api: Arc<ApiClient>, functions_url: impl Into<String>) -> Self {
        Self {
            api,
            functions_url: functions_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn function_url(&self, name: &str) -> String {
        format!("{}/{}", self.functions_url, name.trim_matches('/'))
    }
}

#[async_trait]
impl FunctionInvoker for HttpFunctionsClient {
    async fn invoke(&self, name: &str, body: JsonValue) -> Result<JsonValue> {
        let url = self.function_url(name);
        info!(function = name, "Invoking function");
        self.api
            .send_function(&url, body)
            .await?
            .ok_or_else(|| AppError::ParseError(format!("Function {} returned no data", name)))
    }
}
