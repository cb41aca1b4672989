use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use validator::Validate;

use crate::domain::validation::{not_blank, null_as_default};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    #[default]
    Functional,
    Api,
    Visual,
    Performance,
    Security,
    Integration,
    Unit,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Functional => "functional",
            TestType::Api => "api",
            TestType::Visual => "visual",
            TestType::Performance => "performance",
            TestType::Security => "security",
            TestType::Integration => "integration",
            TestType::Unit => "unit",
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

/// Lifecycle status shared by test cases and projects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Draft,
    Active,
    Inactive,
    Archived,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Draft => "draft",
            Status::Active => "active",
            Status::Inactive => "inactive",
            Status::Archived => "archived",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a test case. Accepts the backend's `description`/`expected_result` naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStep {
    #[serde(alias = "description")]
    pub action: String,
    #[serde(default, alias = "expected_result")]
    pub expected: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub project_id: String,
    #[serde(default)]
    pub test_type: TestType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,
    #[serde(default, alias = "test_steps", deserialize_with = "null_as_default")]
    pub steps: Vec<TestStep>,
    #[serde(default)]
    pub expected_result: Option<String>,
    #[serde(default)]
    pub actual_result: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub ai_generated: bool,
    #[serde(default)]
    pub self_healing_enabled: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Validate)]
pub struct NewTestCase {
    #[validate(custom(function = "not_blank", message = "Title is required"))]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[validate(custom(function = "not_blank", message = "Project is required"))]
    pub project_id: String,
    pub test_type: TestType,
    pub priority: Priority,
    pub status: Status,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<TestStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    pub ai_generated: bool,
    pub self_healing_enabled: bool,
}

impl NewTestCase {
    pub fn new(title: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            project_id: project_id.into(),
            ..Self::default()
        }
    }
}

/// Partial update. Only the fields that are set go over the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Validate)]
pub struct TestCasePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "not_blank", message = "Title is required"))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_type: Option<TestType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<TestStep>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_healing_enabled: Option<bool>,
}
