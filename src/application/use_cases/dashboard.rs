use std::sync::Arc;
use tracing::error;

use crate::domain::dashboard::{ActivityEntry, DashboardStats};
use crate::domain::error::Result;
use crate::infrastructure::api_client::{ApiClient, RequestOptions};

const STATS_FAILED: &str = "Failed to load dashboard stats.";
const ACTIVITY_FAILED: &str = "Failed to load recent activity.";

pub struct DashboardUseCase {
    client: Arc<ApiClient>,
}

impl DashboardUseCase {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn stats(&self) -> Result<DashboardStats> {
        let endpoint = self.client.endpoints().dashboard_stats.clone();
        self.client
            .request(&endpoint, RequestOptions::get())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load dashboard stats");
                e.into_request(STATS_FAILED)
            })
    }

    /// Most recent activity first. `limit` is passed through to the backend.
    pub async fn activity(&self, limit: Option<u32>) -> Result<Vec<ActivityEntry>> {
        let endpoint = self.client.endpoints().dashboard_activity.clone();
        let mut options = RequestOptions::get();
        if let Some(limit) = limit {
            options = options.query("limit", limit.to_string());
        }
        let entries: Option<Vec<ActivityEntry>> = self
            .client
            .request(&endpoint, options)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load recent activity");
                e.into_request(ACTIVITY_FAILED)
            })?;
        Ok(entries.unwrap_or_default())
    }
}
