use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use validator::Validate;

use crate::application::use_cases::lifecycle::InFlight;
use crate::domain::error::{AppError, Result};
use crate::domain::execution::{
    ApiTestConfig, ApiTestResult, PerformanceConfig, PerformanceTestResult, ScanType,
    SecurityTestResult, Viewport, VisualTestResult,
};
use crate::domain::notification::{Notifier, Toast, ToastVariant};
use crate::domain::validation::not_blank;
use crate::infrastructure::functions::{
    FunctionInvoker, EXECUTE_API_TEST, EXECUTE_PERFORMANCE_TEST, EXECUTE_SECURITY_TEST,
    EXECUTE_VISUAL_TEST,
};

#[derive(Debug, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ApiTestRequest {
    #[validate(custom(function = "not_blank", message = "Select a test case"))]
    test_case_id: String,
    #[serde(skip)]
    #[validate(custom(function = "not_blank", message = "An endpoint is required"))]
    endpoint: String,
    config: ApiTestConfig,
}

#[derive(Debug, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
struct VisualTestRequest {
    #[validate(custom(function = "not_blank", message = "Select a test case"))]
    test_case_id: String,
    #[validate(url(message = "A valid URL is required"))]
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    viewport: Option<Viewport>,
}

#[derive(Debug, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
struct PerformanceTestRequest {
    #[validate(custom(function = "not_blank", message = "Select a test case"))]
    test_case_id: String,
    #[validate(url(message = "A valid URL is required"))]
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<PerformanceConfig>,
}

#[derive(Debug, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
struct SecurityTestRequest {
    #[validate(custom(function = "not_blank", message = "Select a test case"))]
    test_case_id: String,
    #[validate(url(message = "A valid URL is required"))]
    url: String,
    #[validate(length(min = 1, message = "Select at least one scan type"))]
    scan_types: Vec<ScanType>,
}

/// Triggers remote test execution. One flag covers all four test kinds.
pub struct TestRunner {
    invoker: Arc<dyn FunctionInvoker>,
    notifier: Arc<dyn Notifier>,
    executing: InFlight,
}

impl TestRunner {
    pub fn new(invoker: Arc<dyn FunctionInvoker>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            invoker,
            notifier,
            executing: InFlight::new(),
        }
    }

    pub fn is_executing(&self) -> bool {
        self.executing.is_active()
    }

    pub async fn execute_api_test(
        &self,
        test_case_id: &str,
        config: &ApiTestConfig,
    ) -> Result<ApiTestResult> {
        let request = ApiTestRequest {
            test_case_id: test_case_id.to_string(),
            endpoint: config.endpoint.clone(),
            config: config.clone(),
        };
        let result: ApiTestResult = self
            .run(EXECUTE_API_TEST, &request, "Failed to execute API test")
            .await?;

        let toast = if result.passed() {
            Toast::success("API Test Passed", "API test completed successfully")
        } else {
            let description = match (result.status_code, &result.error) {
                (_, Some(error)) => error.clone(),
                (Some(status), None) => format!(
                    "Expected status {}, received {}",
                    config.expected_status, status
                ),
                (None, None) => "API response did not match expectations".to_string(),
            };
            Toast::new("API Test Failed", description, ToastVariant::Destructive)
        };
        self.notifier.notify(toast);
        Ok(result)
    }

    pub async fn execute_visual_test(
        &self,
        test_case_id: &str,
        url: &str,
        viewport: Option<Viewport>,
    ) -> Result<VisualTestResult> {
        let request = VisualTestRequest {
            test_case_id: test_case_id.to_string(),
            url: url.trim().to_string(),
            viewport,
        };
        let result: VisualTestResult = self
            .run(EXECUTE_VISUAL_TEST, &request, "Failed to execute visual test")
            .await?;

        let toast = if result.result.success {
            Toast::success("Visual Test Passed", "Visual test completed successfully")
        } else {
            Toast::new(
                "Visual Test Failed",
                "Visual differences detected",
                ToastVariant::Destructive,
            )
        };
        self.notifier.notify(toast);
        Ok(result)
    }

    pub async fn execute_performance_test(
        &self,
        test_case_id: &str,
        url: &str,
        config: Option<&PerformanceConfig>,
    ) -> Result<PerformanceTestResult> {
        let request = PerformanceTestRequest {
            test_case_id: test_case_id.to_string(),
            url: url.trim().to_string(),
            config: config.cloned(),
        };
        let result: PerformanceTestResult = self
            .run(
                EXECUTE_PERFORMANCE_TEST,
                &request,
                "Failed to execute performance test",
            )
            .await?;

        self.notifier.notify(Toast::success(
            "Performance Test Completed",
            format!("Page load time: {}ms", result.metrics.page_load_time),
        ));
        Ok(result)
    }

    pub async fn execute_security_test(
        &self,
        test_case_id: &str,
        url: &str,
        scan_types: &[ScanType],
    ) -> Result<SecurityTestResult> {
        let request = SecurityTestRequest {
            test_case_id: test_case_id.to_string(),
            url: url.trim().to_string(),
            scan_types: scan_types.to_vec(),
        };
        let result: SecurityTestResult = self
            .run(EXECUTE_SECURITY_TEST, &request, "Failed to execute security test")
            .await?;

        let toast = if result.is_clean() {
            Toast::success("Security Test Passed", "No security vulnerabilities detected")
        } else {
            Toast::new(
                "Security Issues Found",
                format!("{} vulnerabilities found", result.summary.total_findings),
                ToastVariant::Destructive,
            )
        };
        self.notifier.notify(toast);
        Ok(result)
    }

    /// Validates, invokes and decodes. Failures raise an error toast.
    async fn run<B, T>(&self, function: &str, request: &B, fallback: &str) -> Result<T>
    where
        B: Serialize + Validate + Sync,
        T: DeserializeOwned,
    {
        let _flag = self.executing.start();
        let result: Result<T> = async {
            request.validate()?;
            let value = self
                .invoker
                .invoke(function, serde_json::to_value(request)?)
                .await?;
            serde_json::from_value(value).map_err(|e| {
                AppError::ParseError(format!("Unexpected {} response: {}", function, e))
            })
        }
        .await;

        match result {
            Ok(value) => {
                info!(function, "Test execution finished");
                Ok(value)
            }
            Err(e) => {
                let message = e.user_message(fallback);
                error!(error = %e, function, "{}", fallback);
                self.notifier.notify(Toast::error(message.clone()));
                Err(AppError::Request(message))
            }
        }
    }
}
