use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};
use validator::Validate;

use crate::domain::error::{AppError, Result};
use crate::domain::session::{
    AuthResponse, AuthState, Credentials, Registration, Session, UserProfile,
};
use crate::infrastructure::api_client::{ApiClient, RequestOptions};
use crate::infrastructure::storage::{SessionStorage, TOKEN_KEY, USER_KEY};

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";

/// Holds the signed-in user and keeps durable storage in step with it.
pub struct AuthStore {
    client: Arc<ApiClient>,
    storage: Arc<dyn SessionStorage>,
    state: Mutex<AuthState>,
}

impl AuthStore {
    /// Restores a stored session without contacting the backend.
    pub fn new(client: Arc<ApiClient>, storage: Arc<dyn SessionStorage>) -> Self {
        let state = match restore_session(storage.as_ref()) {
            Some(session) => {
                info!(user_id = %session.user_id, "Restored stored session");
                AuthState::Authenticated(session)
            }
            None => AuthState::Anonymous,
        };
        Self {
            client,
            storage,
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_state(&self, state: AuthState) {
        *self.lock() = state;
    }

    pub fn state(&self) -> AuthState {
        self.lock().clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.lock().session().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let credentials = Credentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let previous = self.state();
        self.set_state(AuthState::Authenticating);

        match self.login(&credentials).await {
            Ok(session) => {
                info!(user_id = %session.user_id, "Signed in");
                self.set_state(AuthState::Authenticated(session.clone()));
                Ok(session)
            }
            Err(e) => {
                error!(error = %e, email = %credentials.email, "Sign-in failed");
                self.set_state(previous);
                Err(e.into_request(LOGIN_FAILED))
            }
        }
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<Session> {
        let registration = Registration {
            email: email.trim().to_string(),
            password: password.to_string(),
            full_name: full_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        };
        let previous = self.state();
        self.set_state(AuthState::Authenticating);

        match self.register(&registration).await {
            Ok(session) => {
                info!(user_id = %session.user_id, "Registered and signed in");
                self.set_state(AuthState::Authenticated(session.clone()));
                Ok(session)
            }
            Err(e) => {
                error!(error = %e, email = %registration.email, "Registration failed");
                self.set_state(previous);
                Err(e.into_request(REGISTRATION_FAILED))
            }
        }
    }

    /// Clears the stored session. Storage failures are logged, the state still resets.
    pub fn sign_out(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(error = %e, key, "Failed to clear stored session entry");
            }
        }
        self.set_state(AuthState::Anonymous);
        info!("Signed out");
    }

    /// Fetches the current user's profile with the stored token.
    pub async fn current_user(&self) -> Result<UserProfile> {
        if !self.is_authenticated() {
            return Err(AppError::Unauthenticated);
        }
        let endpoint = self.client.endpoints().me.clone();
        self.client
            .request(&endpoint, RequestOptions::get())
            .await
            .map_err(|e| e.into_request("Failed to load user"))
    }

    async fn login(&self, credentials: &Credentials) -> Result<Session> {
        credentials.validate()?;
        let endpoint = self.client.endpoints().login.clone();
        let response: AuthResponse = self
            .client
            .request(
                &endpoint,
                RequestOptions::post(serde_json::to_value(credentials)?).anonymous(),
            )
            .await?;
        self.establish(response).await
    }

    async fn register(&self, registration: &Registration) -> Result<Session> {
        registration.validate()?;
        let endpoint = self.client.endpoints().register.clone();
        let response: AuthResponse = self
            .client
            .request(
                &endpoint,
                RequestOptions::post(serde_json::to_value(registration)?).anonymous(),
            )
            .await?;

        if response.access_token.is_some() {
            return self.establish(response).await;
        }

        // Account created without a token; sign in with the same credentials.
        info!(email = %registration.email, "Registration returned no token, signing in");
        let credentials = Credentials {
            email: registration.email.clone(),
            password: registration.password.clone(),
        };
        self.login(&credentials).await
    }

    /// Resolves the profile for a token response and persists the session.
    async fn establish(&self, response: AuthResponse) -> Result<Session> {
        let token = response
            .access_token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                AppError::ParseError("Auth response carried no access token".to_string())
            })?;

        let profile = match response.profile() {
            Some(profile) => profile,
            None => {
                let endpoint = self.client.endpoints().me.clone();
                self.client
                    .request(&endpoint, RequestOptions::get().bearer(token.clone()))
                    .await?
            }
        };

        let session = Session::new(&profile, token);
        self.persist(&session, &profile)?;
        Ok(session)
    }

    /// Writes token then user. If the user write fails the previous token is put back,
    /// so storage keeps whichever session it held before.
    fn persist(&self, session: &Session, profile: &UserProfile) -> Result<()> {
        let user = serde_json::to_string(profile)?;
        let previous_token = self.storage.get(TOKEN_KEY)?;
        self.storage.set(TOKEN_KEY, &session.token)?;
        if let Err(e) = self.storage.set(USER_KEY, &user) {
            let restored = match &previous_token {
                Some(token) => self.storage.set(TOKEN_KEY, token),
                None => self.storage.remove(TOKEN_KEY),
            };
            if let Err(restore_err) = restored {
                warn!(error = %restore_err, "Failed to restore previous token");
            }
            return Err(e);
        }
        Ok(())
    }
}

fn restore_session(storage: &dyn SessionStorage) -> Option<Session> {
    let token = match storage.get(TOKEN_KEY) {
        Ok(Some(token)) if !token.trim().is_empty() => token,
        Ok(_) => return None,
        Err(e) => {
            warn!(error = %e, "Failed to read stored token");
            return None;
        }
    };
    let raw_user = match storage.get(USER_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "Failed to read stored user");
            return None;
        }
    };
    match serde_json::from_str::<UserProfile>(&raw_user) {
        Ok(user) => Some(Session::new(&user, token)),
        Err(e) => {
            warn!(error = %e, "Stored user is malformed, starting anonymous");
            None
        }
    }
}
