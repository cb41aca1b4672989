use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

use crate::domain::test_case::{NewTestCase, Priority, Status, TestStep, TestType};
use crate::domain::validation::{not_blank, null_as_default};

fn default_count() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTestsRequest {
    #[validate(custom(function = "not_blank", message = "Describe what should be tested"))]
    pub prompt: String,
    #[validate(custom(function = "not_blank", message = "Select a project"))]
    pub project_id: String,
    pub test_type: TestType,
    pub priority: Priority,
    #[validate(range(min = 1, max = 20, message = "Between 1 and 20 test cases can be generated"))]
    pub count: u32,
}

impl GenerateTestsRequest {
    pub fn new(prompt: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            project_id: project_id.into(),
            test_type: TestType::default(),
            priority: Priority::default(),
            count: default_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTestCase {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub test_type: TestType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, alias = "test_steps", deserialize_with = "null_as_default")]
    pub steps: Vec<TestStep>,
    #[serde(default)]
    pub expected_result: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeSet<String>,
}

impl GeneratedTestCase {
    /// Draft test case ready to be saved under `project_id`.
    pub fn into_new_test_case(self, project_id: impl Into<String>) -> NewTestCase {
        NewTestCase {
            title: self.title,
            description: self.description,
            project_id: project_id.into(),
            test_type: self.test_type,
            priority: self.priority,
            status: Status::Draft,
            steps: self.steps,
            expected_result: self.expected_result,
            assigned_to: None,
            tags: self.tags,
            ai_generated: true,
            self_healing_enabled: false,
        }
    }
}

/// The generator answers with either a bare list or a wrapped one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GeneratedTestsPayload {
    List(Vec<GeneratedTestCase>),
    Wrapped { test_cases: Vec<GeneratedTestCase> },
}

impl GeneratedTestsPayload {
    pub fn into_cases(self) -> Vec<GeneratedTestCase> {
        match self {
            GeneratedTestsPayload::List(cases) => cases,
            GeneratedTestsPayload::Wrapped { test_cases } => test_cases,
        }
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DebugTestRequest {
    #[validate(custom(function = "not_blank", message = "Select a test case"))]
    pub test_case_id: String,
    #[validate(custom(function = "not_blank", message = "Describe the failure"))]
    pub error_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub analysis: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritizeTestsRequest {
    pub test_case_ids: Vec<String>,
}
