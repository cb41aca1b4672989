use serde::{Deserialize, Serialize};

use crate::domain::validation::null_as_default;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_test_cases: u64,
    #[serde(default)]
    pub pass_rate: f64,
    /// Seconds.
    #[serde(default)]
    pub average_execution_time: f64,
    #[serde(default)]
    pub active_test_runs: u64,
    #[serde(default)]
    pub total_executions: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recent_activity: Vec<ActivityEntry>,
}

impl DashboardStats {
    pub fn pass_rate_label(&self) -> String {
        format!("{:.1}%", self.pass_rate)
    }

    pub fn execution_time_label(&self) -> String {
        format!("{:.2}s", self.average_execution_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub target_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub user_name: String,
    pub created_at: String,
}
