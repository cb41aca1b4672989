use crate::application::use_cases::resource::{Resource, ResourceStore};
use crate::domain::error::Result;
use crate::domain::test_case::{NewTestCase, Priority, Status, TestCase, TestCasePatch, TestType};
use crate::infrastructure::config::ApiEndpoints;

impl Resource for TestCase {
    type Input = NewTestCase;
    type Patch = TestCasePatch;

    const SINGULAR: &'static str = "test case";
    const PLURAL: &'static str = "test cases";

    fn endpoint(endpoints: &ApiEndpoints) -> &str {
        &endpoints.test_cases
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn list_query(parent_id: Option<&str>) -> Vec<(&'static str, String)> {
        parent_id
            .map(|project_id| vec![("project_id", project_id.to_string())])
            .unwrap_or_default()
    }

    fn in_scope(&self, parent_id: Option<&str>) -> bool {
        parent_id.map_or(true, |project_id| self.project_id == project_id)
    }
}

pub type TestCaseStore = ResourceStore<TestCase>;

impl ResourceStore<TestCase> {
    /// Narrows the list to one project, or lifts the filter with `None`.
    pub async fn set_project(&self, project_id: Option<String>) -> Result<()> {
        self.set_parent(project_id).await
    }

    pub fn filtered(&self, filter: &TestCaseFilter) -> Vec<TestCase> {
        self.items()
            .into_iter()
            .filter(|case| filter.matches(case))
            .collect()
    }
}

/// Search box and dropdown state of the test-case list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestCaseFilter {
    pub search: String,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub test_type: Option<TestType>,
}

impl TestCaseFilter {
    pub fn matches(&self, case: &TestCase) -> bool {
        let needle = self.search.trim().to_lowercase();
        let text_match = needle.is_empty()
            || case.title.to_lowercase().contains(&needle)
            || case
                .description
                .as_deref()
                .is_some_and(|description| description.to_lowercase().contains(&needle))
            || case.tags.iter().any(|tag| tag.to_lowercase().contains(&needle));

        text_match
            && self.status.map_or(true, |status| case.status == status)
            && self.priority.map_or(true, |priority| case.priority == priority)
            && self.test_type.map_or(true, |test_type| case.test_type == test_type)
    }
}

pub fn filter_test_cases<'a>(cases: &'a [TestCase], filter: &TestCaseFilter) -> Vec<&'a TestCase> {
    cases.iter().filter(|case| filter.matches(case)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::resource::Scope;
    use crate::domain::error::AppError;
    use crate::interfaces::mock_server::StubRoute;
    use crate::test_support::start_backend;
    use serde_json::json;

    const TEST_CASES: &str = "/api/v1/test-cases";

    fn case(id: &str, title: &str, project_id: &str) -> TestCase {
        serde_json::from_value(json!({"id": id, "title": title, "project_id": project_id})).unwrap()
    }

    #[tokio::test]
    async fn test_create_puts_echoed_case_first() {
        let backend = start_backend(vec![
            StubRoute::json(
                "GET",
                TEST_CASES,
                200,
                json!([{"id": "t0", "title": "Existing", "project_id": "p1"}]),
            ),
            StubRoute::json(
                "POST",
                TEST_CASES,
                201,
                json!({
                    "id": "t1",
                    "title": "Login works",
                    "project_id": "p1",
                    "test_type": "functional",
                    "priority": "medium",
                    "status": "draft",
                    "ai_generated": false,
                    "self_healing_enabled": false
                }),
            ),
        ])
        .await;
        let session = backend.sign_in_as("u1", "tok");
        let store = TestCaseStore::mount(
            backend.client.clone(),
            Scope::new(Some(session)).with_parent("p1"),
        )
        .await;

        store.create(NewTestCase::new("Login works", "p1")).await.unwrap();

        let items = store.items();
        assert_eq!(items[0].id, "t1");
        assert_eq!(items[0].title, "Login works");
        assert_eq!(items.iter().filter(|c| c.id == "t1").count(), 1);

        let body = backend.server.requests_to("POST", TEST_CASES)[0].json().unwrap();
        assert_eq!(
            body,
            json!({
                "title": "Login works",
                "project_id": "p1",
                "test_type": "functional",
                "priority": "medium",
                "status": "draft",
                "ai_generated": false,
                "self_healing_enabled": false,
                "created_by": "u1"
            })
        );
        backend.shutdown().await;
    }

    #[tokio::test]
    async fn test_created_case_outside_filter_stays_out_of_list() {
        let backend = start_backend(vec![
            StubRoute::json("GET", TEST_CASES, 200, json!([])),
            StubRoute::json(
                "POST",
                TEST_CASES,
                201,
                json!({"id": "t5", "title": "Elsewhere", "project_id": "p2"}),
            ),
        ])
        .await;
        let session = backend.sign_in_as("u1", "tok");
        let store = TestCaseStore::mount(
            backend.client.clone(),
            Scope::new(Some(session)).with_parent("p1"),
        )
        .await;

        store.create(NewTestCase::new("Elsewhere", "p2")).await.unwrap();
        assert!(store.is_empty());
        backend.shutdown().await;
    }

    #[tokio::test]
    async fn test_project_change_refetches_once() {
        let backend = start_backend(vec![
            StubRoute::json(
                "GET",
                TEST_CASES,
                200,
                json!([{"id": "t1", "title": "A", "project_id": "p1"}]),
            )
            .with_query("project_id", "p1"),
            StubRoute::json(
                "GET",
                TEST_CASES,
                200,
                json!([
                    {"id": "t7", "title": "B", "project_id": "p2"},
                    {"id": "t8", "title": "C", "project_id": "p2"}
                ]),
            )
            .with_query("project_id", "p2"),
        ])
        .await;
        let session = backend.sign_in_as("u1", "tok");
        let store = TestCaseStore::mount(
            backend.client.clone(),
            Scope::new(Some(session)).with_parent("p1"),
        )
        .await;
        assert_eq!(store.len(), 1);

        backend.server.clear_requests();
        store.set_project(Some("p2".to_string())).await.unwrap();

        let requests = backend.server.requests_to("GET", TEST_CASES);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].query.get("project_id").map(String::as_str), Some("p2"));
        let ids: Vec<String> = store.items().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["t7", "t8"]);
        backend.shutdown().await;
    }

    #[tokio::test]
    async fn test_superseded_fetch_does_not_overwrite_new_scope() {
        let backend = start_backend(vec![
            StubRoute::json(
                "GET",
                TEST_CASES,
                200,
                json!([{"id": "slow", "title": "Old", "project_id": "p1"}]),
            )
            .with_query("project_id", "p1")
            .with_delay(300),
            StubRoute::json(
                "GET",
                TEST_CASES,
                200,
                json!([{"id": "fast", "title": "New", "project_id": "p2"}]),
            )
            .with_query("project_id", "p2"),
        ])
        .await;
        let session = backend.sign_in_as("u1", "tok");
        let store = std::sync::Arc::new(TestCaseStore::new(
            backend.client.clone(),
            Scope::new(Some(session)).with_parent("p1"),
        ));

        let slow = {
            let store = store.clone();
            tokio::spawn(async move { store.refresh().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        store.set_project(Some("p2".to_string())).await.unwrap();

        assert_eq!(slow.await.unwrap().unwrap_err(), AppError::Cancelled);
        let ids: Vec<String> = store.items().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["fast"]);
        backend.shutdown().await;
    }

    #[test]
    fn test_filter_matches_search_and_dropdowns() {
        let mut login = case("t1", "Login works", "p1");
        login.tags.insert("Smoke".to_string());
        login.priority = Priority::High;
        let mut checkout = case("t2", "Checkout", "p1");
        checkout.description = Some("Pays with a saved card".to_string());
        checkout.status = Status::Active;
        let cases = vec![login, checkout];

        let by_tag = TestCaseFilter {
            search: "smoke".to_string(),
            ..TestCaseFilter::default()
        };
        assert_eq!(filter_test_cases(&cases, &by_tag)[0].id, "t1");

        let by_description = TestCaseFilter {
            search: " CARD ".to_string(),
            ..TestCaseFilter::default()
        };
        assert_eq!(filter_test_cases(&cases, &by_description)[0].id, "t2");

        let by_status = TestCaseFilter {
            status: Some(Status::Active),
            priority: Some(Priority::High),
            ..TestCaseFilter::default()
        };
        assert!(filter_test_cases(&cases, &by_status).is_empty());

        assert_eq!(filter_test_cases(&cases, &TestCaseFilter::default()).len(), 2);
    }
}
