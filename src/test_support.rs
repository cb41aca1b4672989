use std::sync::Arc;

use crate::domain::session::{Session, UserProfile};
use crate::infrastructure::api_client::ApiClient;
use crate::infrastructure::config::ApiEndpoints;
use crate::infrastructure::storage::{MemoryStorage, SessionStorage, TOKEN_KEY, USER_KEY};
use crate::interfaces::mock_server::{StubRoute, StubServer};

pub(crate) struct TestBackend {
    pub server: StubServer,
    pub storage: Arc<MemoryStorage>,
    pub client: Arc<ApiClient>,
}

impl TestBackend {
    /// Persists a session the way a successful sign-in would and returns it.
    pub fn sign_in_as(&self, user_id: &str, token: &str) -> Session {
        let user = UserProfile {
            id: user_id.to_string(),
            email: format!("{}@example.com", user_id),
            full_name: None,
        };
        self.storage.set(TOKEN_KEY, token).unwrap();
        self.storage
            .set(USER_KEY, &serde_json::to_string(&user).unwrap())
            .unwrap();
        Session::new(&user, token)
    }

    pub async fn shutdown(self) {
        self.server.stop().await.unwrap();
    }
}

pub(crate) async fn start_backend(routes: Vec<StubRoute>) -> TestBackend {
    let server = StubServer::with_routes(routes);
    server.start().await.unwrap();
    let base_url = server.base_url().unwrap();
    let storage = Arc::new(MemoryStorage::default());
    let client = Arc::new(ApiClient::new(
        base_url,
        ApiEndpoints::default(),
        storage.clone(),
    ));
    TestBackend {
        server,
        storage,
        client,
    }
}
