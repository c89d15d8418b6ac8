//! Domain operations for account access: emailed one-time codes, code
//! verification, profile fetch, and logout. Each operation maps the remote
//! response onto the credential store and the session state machine.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::credentials::Credential;
use crate::auth::session::{AuthState, SessionHandle, SessionWatcher};
use crate::models::UserProfile;

/// Acknowledgement of a code request. `bypass` marks non-production
/// environments where the server accepts a fixed verification code.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeRequest {
    pub email: String,
    #[serde(rename = "isNewUser")]
    pub is_new_user: Option<bool>,
    pub bypass: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    user: UserProfile,
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct MeData {
    user: UserProfile,
}

/// Auth operations over the gateway. Owns the session state machine; this
/// is the only component that writes to it.
pub struct AuthService {
    api: Arc<ApiClient>,
    session: SessionHandle,
}

impl AuthService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            session: SessionHandle::new(),
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn subscribe(&self) -> SessionWatcher {
        self.session.subscribe()
    }

    /// Resolve the initial `Loading` state from whatever survived the last
    /// run. A stored profile plus a stored pair is treated as authenticated
    /// without a network round trip; the first real request self-corrects a
    /// pair the server has since revoked.
    pub fn rehydrate(&self) {
        let store = self.api.store();
        match (store.user(), store.credential()) {
            (Some(user), Some(_)) => {
                info!(email = %user.email, "Session rehydrated from stored credentials");
                self.session.set_authenticated(user);
            }
            _ => {
                self.session.set_anonymous();
            }
        }
    }

    /// Ask the server to email a registration code to a new account.
    /// No local state changes; the code arrives out of band.
    pub async fn request_registration_code(
        &self,
        email: &str,
        name: &str,
        birth_year: i32,
        country_code: &str,
    ) -> Result<CodeRequest, ApiError> {
        let body = serde_json::json!({
            "email": email,
            "name": name,
            "birthYear": birth_year,
            "countryCode": country_code,
        });
        self.api.post("/auth/request-code", Some(&body), false).await
    }

    /// Ask the server to email a login code to an existing account.
    pub async fn request_login_code(&self, email: &str) -> Result<CodeRequest, ApiError> {
        let body = serde_json::json!({ "email": email });
        self.api.post("/auth/login", Some(&body), false).await
    }

    /// Exchange an emailed code for a token pair and profile. This is the
    /// only path from `Anonymous` to `Authenticated`.
    pub async fn verify_code(&self, email: &str, code: &str) -> Result<UserProfile, ApiError> {
        let body = serde_json::json!({ "email": email, "code": code });
        let verified: VerifyData = self.api.post("/auth/verify-code", Some(&body), false).await?;

        // Persist before reporting success: a session we could not store is
        // a session the next launch would not have
        let store = self.api.store();
        store.set_credential(&Credential {
            access_token: verified.access_token,
            refresh_token: verified.refresh_token,
        })?;
        store.set_user(&verified.user)?;

        info!(email = %verified.user.email, "Code verified, session established");
        self.session.set_authenticated(verified.user.clone());
        Ok(verified.user)
    }

    /// Fetch the current profile and refresh the cached copy. Does not
    /// change the authentication state on success; an `Unauthorized`
    /// outcome downgrades the session.
    pub async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        let me: MeData = match self.api.get("/auth/me", true).await {
            Ok(me) => me,
            Err(err) => return Err(self.downgrade_if_unauthorized(err).await),
        };

        self.api.store().set_user(&me.user)?;
        self.session.update_user(me.user.clone());
        Ok(me.user)
    }

    /// End the session. The remote call is best-effort; local credentials
    /// are cleared and the session reset regardless of its outcome.
    pub async fn logout(&self) {
        if let Err(err) = self
            .api
            .post::<(), serde_json::Value>("/auth/logout", None, true)
            .await
        {
            warn!(error = %err, "Remote logout failed, clearing local session anyway");
        }

        // clear_session waits out any in-flight refresh, so the clear is
        // always the last writer
        if let Err(err) = self.api.clear_session().await {
            warn!(error = %err, "Failed to clear stored credentials on logout");
        }
        self.session.set_anonymous();
        info!("Logged out");
    }

    /// An `Unauthorized` outcome means the refresh path already gave up on
    /// the stored pair; the visible session must follow it down.
    async fn downgrade_if_unauthorized(&self, err: ApiError) -> ApiError {
        if err.is_unauthorized() && self.session.state() == AuthState::Authenticated {
            if let Err(clear_err) = self.api.clear_session().await {
                warn!(error = %clear_err, "Failed to clear credentials during session downgrade");
            }
            self.session.set_anonymous();
        }
        err
    }
}
