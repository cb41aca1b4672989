use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use validator::Validate;

use crate::application::use_cases::lifecycle::InFlight;
use crate::domain::ai::{
    AiAnalysis, DebugTestRequest, GenerateTestsRequest, GeneratedTestCase, GeneratedTestsPayload,
    PrioritizeTestsRequest,
};
use crate::domain::error::{AppError, Result};
use crate::domain::notification::{Notifier, Toast};
use crate::infrastructure::functions::{
    FunctionInvoker, DEBUG_TESTS, GENERATE_TESTS, PRIORITIZE_TESTS,
};

const GENERATE_FAILED: &str = "Failed to generate test cases";
const DEBUG_FAILED: &str = "Failed to debug test case";
const PRIORITIZE_FAILED: &str = "Failed to prioritize test cases";

/// AI generation and debugging actions, each raising a toast on completion.
pub struct AiAssistant {
    invoker: Arc<dyn FunctionInvoker>,
    notifier: Arc<dyn Notifier>,
    generating: InFlight,
    debugging: InFlight,
    prioritizing: InFlight,
}

impl AiAssistant {
    pub fn new(invoker: Arc<dyn FunctionInvoker>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            invoker,
            notifier,
            generating: InFlight::new(),
            debugging: InFlight::new(),
            prioritizing: InFlight::new(),
        }
    }

    pub fn is_generating(&self) -> bool {
        self.generating.is_active()
    }

    pub fn is_debugging(&self) -> bool {
        self.debugging.is_active()
    }

    pub fn is_prioritizing(&self) -> bool {
        self.prioritizing.is_active()
    }

    pub async fn generate_tests(
        &self,
        request: GenerateTestsRequest,
    ) -> Result<Vec<GeneratedTestCase>> {
        let _flag = self.generating.start();
        let result: Result<Vec<GeneratedTestCase>> = async {
            request.validate()?;
            let payload: GeneratedTestsPayload = self.call(GENERATE_TESTS, &request).await?;
            Ok(payload.into_cases())
        }
        .await;

        match result {
            Ok(cases) => {
                info!(
                    project_id = %request.project_id,
                    count = cases.len(),
                    "Generated test cases"
                );
                self.notifier
                    .notify(Toast::success("Success", "AI test cases generated successfully"));
                Ok(cases)
            }
            Err(e) => Err(self.fail(e, GENERATE_FAILED)),
        }
    }

    pub async fn debug_test(&self, request: DebugTestRequest) -> Result<AiAnalysis> {
        let _flag = self.debugging.start();
        let result: Result<AiAnalysis> = async {
            request.validate()?;
            self.call(DEBUG_TESTS, &request).await
        }
        .await;

        match result {
            Ok(analysis) => {
                info!(test_case_id = %request.test_case_id, "Debug analysis completed");
                self.notifier
                    .notify(Toast::success("Success", "AI debugging analysis completed"));
                Ok(analysis)
            }
            Err(e) => Err(self.fail(e, DEBUG_FAILED)),
        }
    }

    /// Returns the given ids reordered by suggested execution priority.
    pub async fn prioritize_tests(&self, test_case_ids: Vec<String>) -> Result<Vec<String>> {
        if test_case_ids.is_empty() {
            return Ok(Vec::new());
        }
        let _flag = self.prioritizing.start();
        let request = PrioritizeTestsRequest { test_case_ids };
        match self.call::<_, Vec<String>>(PRIORITIZE_TESTS, &request).await {
            Ok(ordered) => {
                self.notifier
                    .notify(Toast::success("Success", "Test cases prioritized"));
                Ok(ordered)
            }
            Err(e) => Err(self.fail(e, PRIORITIZE_FAILED)),
        }
    }

    async fn call<B: Serialize, T: DeserializeOwned>(&self, function: &str, body: &B) -> Result<T> {
        let value = self
            .invoker
            .invoke(function, serde_json::to_value(body)?)
            .await?;
        serde_json::from_value(value)
            .map_err(|e| AppError::ParseError(format!("Unexpected {} response: {}", function, e)))
    }

    fn fail(&self, err: AppError, fallback: &str) -> AppError {
        let message = err.user_message(fallback);
        error!(error = %err, "{}", fallback);
        self.notifier.notify(Toast::error(message.clone()));
        AppError::Request(message)
    }
}
