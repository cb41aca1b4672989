use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::application::use_cases::resource::Scope;
use crate::application::{
    AiAssistant, AuthStore, DashboardUseCase, ProjectStore, TestCaseStore, TestRunner,
};
use crate::domain::error::Result;
use crate::domain::notification::Notifier;
use crate::infrastructure::api_client::ApiClient;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::functions::{FunctionInvoker, HttpFunctionsClient};
use crate::infrastructure::storage::{build_storage, SessionStorage};
use crate::interfaces::notifications::NotificationCenter;

/// Shared services a UI shell needs. Stores are handed the current session
/// explicitly instead of reading it from ambient state.
pub struct AppContext {
    pub config: AppConfig,
    pub storage: Arc<dyn SessionStorage>,
    pub client: Arc<ApiClient>,
    pub auth: AuthStore,
    pub notifications: Arc<NotificationCenter>,
    invoker: Arc<dyn FunctionInvoker>,
}

impl AppContext {
    /// Loads configuration, installs logging and builds the context.
    pub fn load() -> Result<Self> {
        let config = AppConfig::load()?;
        init_tracing(&config.log_filter);
        let context = Self::from_config(config);
        info!(
            api_base_url = %context.config.api_base_url,
            authenticated = context.auth.is_authenticated(),
            "Client context ready"
        );
        Ok(context)
    }

    pub fn from_config(config: AppConfig) -> Self {
        let storage = build_storage(&config.storage);
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: AppConfig, storage: Arc<dyn SessionStorage>) -> Self {
        let client = Arc::new(ApiClient::from_config(&config, storage.clone()));
        let invoker: Arc<dyn FunctionInvoker> = Arc::new(HttpFunctionsClient::new(
            client.clone(),
            config.functions_base_url(),
        ));
        let auth = AuthStore::new(client.clone(), storage.clone());
        Self {
            config,
            storage,
            client,
            auth,
            notifications: Arc::new(NotificationCenter::new()),
            invoker,
        }
    }

    fn notifier(&self) -> Arc<dyn Notifier> {
        self.notifications.clone()
    }

    fn scope(&self) -> Scope {
        Scope::new(self.auth.session())
    }

    /// Project list for the signed-in user, fetched on creation.
    pub async fn projects(&self) -> ProjectStore {
        ProjectStore::mount(self.client.clone(), self.scope()).await
    }

    /// Test-case list, optionally narrowed to one project, fetched on creation.
    pub async fn test_cases(&self, project_id: Option<&str>) -> TestCaseStore {
        let mut scope = self.scope();
        scope.parent_id = project_id.map(str::to_string);
        TestCaseStore::mount(self.client.clone(), scope).await
    }

    pub fn dashboard(&self) -> DashboardUseCase {
        DashboardUseCase::new(self.client.clone())
    }

    pub fn ai_assistant(&self) -> AiAssistant {
        AiAssistant::new(self.invoker.clone(), self.notifier())
    }

    pub fn test_runner(&self) -> TestRunner {
        TestRunner::new(self.invoker.clone(), self.notifier())
    }
}

/// Installs the global `tracing` subscriber. Invalid filters fall back to `info`.
/// Later calls are no-ops.
pub fn init_tracing(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}
