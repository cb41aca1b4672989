use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info};
use validator::Validate;

use crate::application::use_cases::lifecycle::RequestToken;
use crate::domain::error::{AppError, Result};
use crate::domain::session::Session;
use crate::infrastructure::api_client::{ApiClient, RequestOptions};
use crate::infrastructure::config::ApiEndpoints;

/// A backend entity kept in a synchronized local list.
pub trait Resource: Clone + Send + Sync + DeserializeOwned + 'static {
    type Input: Serialize + Validate + Send + Sync;
    type Patch: Serialize + Validate + Send + Sync;

    /// Lower-case display names used in error messages.
    const SINGULAR: &'static str;
    const PLURAL: &'static str;

    fn endpoint(endpoints: &ApiEndpoints) -> &str;

    fn id(&self) -> &str;

    /// Query pairs that narrow the list to `parent_id`.
    fn list_query(_parent_id: Option<&str>) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Whether an entity belongs in the list fetched for `parent_id`.
    fn in_scope(&self, _parent_id: Option<&str>) -> bool {
        true
    }

    /// Body posted by `create`: the input plus the owner id unless already set.
    fn create_body(input: &Self::Input, session: &Session) -> Result<JsonValue> {
        let mut body = serde_json::to_value(input)?;
        if let JsonValue::Object(map) = &mut body {
            map.entry("created_by")
                .or_insert_with(|| JsonValue::String(session.user_id.clone()));
        }
        Ok(body)
    }
}

/// Identity inputs of a store. Any change triggers a full re-fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub session: Option<Session>,
    pub parent_id: Option<String>,
}

impl Scope {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            session,
            parent_id: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

struct ResourceState<R> {
    items: Vec<R>,
    pending: usize,
    error: Option<String>,
    scope: Scope,
    token: RequestToken,
}

struct LoadingGuard<'a, R> {
    state: &'a Mutex<ResourceState<R>>,
}

impl<R> Drop for LoadingGuard<'_, R> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.pending = state.pending.saturating_sub(1);
    }
}

/// Synchronized local list of one backend entity type.
///
/// Every operation raises the loading flag for its duration, stores a
/// display-ready message on failure, and only commits results while the
/// request token captured at call start is still live.
pub struct ResourceStore<R: Resource> {
    client: Arc<ApiClient>,
    state: Mutex<ResourceState<R>>,
}

impl<R: Resource> ResourceStore<R> {
    /// Creates an empty store. Call `refresh` (or use `mount`) for the first fetch.
    pub fn new(client: Arc<ApiClient>, scope: Scope) -> Self {
        Self {
            client,
            state: Mutex::new(ResourceState {
                items: Vec::new(),
                pending: 0,
                error: None,
                scope,
                token: RequestToken::new(),
            }),
        }
    }

    /// Creates the store and performs the initial fetch when a session is present.
    ///
    /// A failed first load is kept on the store (`error()`), ready for `refresh`.
    pub async fn mount(client: Arc<ApiClient>, scope: Scope) -> Self {
        let has_session = scope.session.is_some();
        let store = Self::new(client, scope);
        if has_session {
            let _ = store.refresh().await;
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, ResourceState<R>> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn start_loading(&self) -> LoadingGuard<'_, R> {
        self.lock().pending += 1;
        LoadingGuard { state: &self.state }
    }

    fn snapshot(&self) -> (RequestToken, Scope) {
        let state = self.lock();
        (state.token.clone(), state.scope.clone())
    }

    fn endpoint(&self) -> String {
        R::endpoint(self.client.endpoints()).to_string()
    }

    /// Addresses one entity by appending `id` as an encoded path segment.
    fn for_item(id: &str, options: RequestOptions) -> Result<RequestOptions> {
        if id.is_empty() {
            return Err(AppError::ValidationError(format!(
                "A {} id is required",
                R::SINGULAR
            )));
        }
        Ok(options.segment(id))
    }

    /// Records the failure (unless superseded) and returns the surfaced error.
    fn fail(&self, token: &RequestToken, err: AppError, fallback: &str) -> AppError {
        if err == AppError::Cancelled || err == AppError::Unauthenticated {
            return err;
        }
        let message = err.user_message(fallback);
        error!(error = %err, resource = R::PLURAL, "{}", fallback);
        let mut state = self.lock();
        if !token.is_cancelled() {
            state.error = Some(message.clone());
        }
        AppError::Request(message)
    }

    pub fn items(&self) -> Vec<R> {
        self.lock().items.clone()
    }

    pub fn find(&self, id: &str) -> Option<R> {
        self.lock().items.iter().find(|item| item.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().pending > 0
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn scope(&self) -> Scope {
        self.lock().scope.clone()
    }

    /// Replaces the local list with the server's list for the current scope.
    pub async fn refresh(&self) -> Result<Vec<R>> {
        let (token, scope) = self.snapshot();
        if scope.session.is_none() {
            return Err(AppError::Unauthenticated);
        }
        let fallback = format!("Failed to fetch {}", R::PLURAL);
        let _loading = self.start_loading();

        let options = R::list_query(scope.parent_id.as_deref())
            .into_iter()
            .fold(RequestOptions::get(), |options, (key, value)| {
                options.query(key, value)
            });

        let result: Result<Vec<R>> = async {
            match self.client.send(&self.endpoint(), options).await? {
                None | Some(JsonValue::Null) => Ok(Vec::new()),
                Some(value) => serde_json::from_value(value).map_err(|e| {
                    AppError::ParseError(format!("Unexpected {} list: {}", R::SINGULAR, e))
                }),
            }
        }
        .await;

        match result {
            Ok(items) => {
                let mut state = self.lock();
                if token.is_cancelled() {
                    debug!(resource = R::PLURAL, "Discarding superseded list response");
                    return Err(AppError::Cancelled);
                }
                state.items = items.clone();
                state.error = None;
                info!(resource = R::PLURAL, count = items.len(), "List refreshed");
                Ok(items)
            }
            Err(e) => Err(self.fail(&token, e, &fallback)),
        }
    }

    /// Alias of `refresh`.
    pub async fn list(&self) -> Result<Vec<R>> {
        self.refresh().await
    }

    /// Creates the entity and puts the server's copy at the front of the list.
    pub async fn create(&self, input: R::Input) -> Result<R> {
        let (token, scope) = self.snapshot();
        let session = scope.session.clone().ok_or(AppError::Unauthenticated)?;
        let fallback = format!("Failed to create {}", R::SINGULAR);
        let _loading = self.start_loading();

        let result: Result<R> = async {
            input.validate()?;
            let body = R::create_body(&input, &session)?;
            self.client
                .request(&self.endpoint(), RequestOptions::post(body))
                .await
        }
        .await;

        match result {
            Ok(entity) => {
                let mut state = self.lock();
                if !token.is_cancelled() {
                    state.error = None;
                    if entity.in_scope(scope.parent_id.as_deref()) {
                        state.items.retain(|item| item.id() != entity.id());
                        state.items.insert(0, entity.clone());
                    }
                }
                info!(resource = R::PLURAL, id = %entity.id(), "Created");
                Ok(entity)
            }
            Err(e) => Err(self.fail(&token, e, &fallback)),
        }
    }

    /// Sends a partial patch and replaces the matching entity by id.
    pub async fn update(&self, id: &str, patch: R::Patch) -> Result<R> {
        let id = id.trim();
        let (token, scope) = self.snapshot();
        if scope.session.is_none() {
            return Err(AppError::Unauthenticated);
        }
        let fallback = format!("Failed to update {}", R::SINGULAR);
        let _loading = self.start_loading();

        let result: Result<R> = async {
            patch.validate()?;
            let options = Self::for_item(id, RequestOptions::put(serde_json::to_value(&patch)?))?;
            self.client.request(&self.endpoint(), options).await
        }
        .await;

        match result {
            Ok(entity) => {
                let mut state = self.lock();
                if !token.is_cancelled() {
                    state.error = None;
                    if let Some(slot) = state.items.iter_mut().find(|item| item.id() == id) {
                        *slot = entity.clone();
                    }
                }
                info!(resource = R::PLURAL, id = %id, "Updated");
                Ok(entity)
            }
            Err(e) => Err(self.fail(&token, e, &fallback)),
        }
    }

    /// Deletes the entity and removes it from the list. 204 counts as success.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = id.trim();
        let (token, scope) = self.snapshot();
        if scope.session.is_none() {
            return Err(AppError::Unauthenticated);
        }
        let fallback = format!("Failed to delete {}", R::SINGULAR);
        let _loading = self.start_loading();

        let result: Result<()> = async {
            let options = Self::for_item(id, RequestOptions::delete())?;
            self.client.send(&self.endpoint(), options).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                let mut state = self.lock();
                if !token.is_cancelled() {
                    state.error = None;
                    state.items.retain(|item| item.id() != id);
                }
                info!(resource = R::PLURAL, id = %id, "Deleted");
                Ok(())
            }
            Err(e) => Err(self.fail(&token, e, &fallback)),
        }
    }

    /// Fetches one entity, refreshing its copy in the list when present.
    pub async fn get_by_id(&self, id: &str) -> Result<R> {
        let id = id.trim();
        let (token, scope) = self.snapshot();
        if scope.session.is_none() {
            return Err(AppError::Unauthenticated);
        }
        let fallback = format!("Failed to load {}", R::SINGULAR);
        let _loading = self.start_loading();

        let result: Result<R> = async {
            let options = Self::for_item(id, RequestOptions::get())?;
            self.client.request(&self.endpoint(), options).await
        }
        .await;

        match result {
            Ok(entity) => {
                let mut state = self.lock();
                if !token.is_cancelled() {
                    state.error = None;
                    if let Some(slot) = state.items.iter_mut().find(|item| item.id() == id) {
                        *slot = entity.clone();
                    }
                }
                Ok(entity)
            }
            Err(e) => Err(self.fail(&token, e, &fallback)),
        }
    }

    /// Switches scope. A changed scope supersedes in-flight requests and
    /// triggers one full re-fetch, or empties the list when signed out.
    pub async fn set_scope(&self, scope: Scope) -> Result<()> {
        {
            let mut state = self.lock();
            if state.scope == scope {
                return Ok(());
            }
            state.token.cancel();
            state.token = RequestToken::new();
            state.scope = scope;
            state.error = None;
            if state.scope.session.is_none() {
                state.items.clear();
                info!(resource = R::PLURAL, "Session cleared, list emptied");
                return Ok(());
            }
        }
        self.refresh().await.map(|_| ())
    }

    pub async fn set_session(&self, session: Option<Session>) -> Result<()> {
        let scope = Scope {
            session,
            ..self.scope()
        };
        self.set_scope(scope).await
    }

    pub async fn set_parent(&self, parent_id: Option<String>) -> Result<()> {
        let scope = Scope {
            parent_id,
            ..self.scope()
        };
        self.set_scope(scope).await
    }

    /// Stops committing results. Responses still in flight are dropped.
    pub fn close(&self) {
        self.lock().token.cancel();
    }
}
