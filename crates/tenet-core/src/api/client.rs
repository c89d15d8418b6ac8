//! HTTP gateway for the tenet REST API.
//!
//! `ApiClient` is the sole path for outbound requests. It owns bearer-token
//! attachment, the bounded request timeout, response-envelope decoding, and
//! the 401-triggered refresh-and-retry-once sequence. One instance exists
//! per running app and is shared by every service that talks to the server.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::auth::credentials::{Credential, CredentialStore, StoreError};

use super::ApiError;

/// Default HTTP request timeout in seconds.
/// 10s covers slow mobile links while failing fast enough for good UX.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Every response is wrapped in this envelope; a transport-level non-2xx is
/// treated the same as `status: "error"`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: EnvelopeStatus,
    data: Option<T>,
    message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EnvelopeStatus {
    Success,
    Error,
}

#[derive(Debug, Deserialize)]
struct RefreshData {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
}

/// API gateway for the tenet service.
///
/// Construct once per process and share behind an `Arc`; the refresh gate
/// only coordinates requests that go through the same instance.
pub struct ApiClient {
    http: Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
    // Held for the duration of a refresh, and by logout while clearing, so
    // at most one refresh is in flight and a clear is always the last writer
    refresh_gate: Mutex<()>,
}

impl ApiClient {
    /// Create the gateway with a bounded per-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ApiError> {
        // Every request carries a JSON content type, bodied or not
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self {
            http,
            base_url: normalize_base_url(base_url.into()),
            store,
            refresh_gate: Mutex::new(()),
        })
    }

    /// The credential store this gateway reads bearer tokens from.
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str, auth: bool) -> Result<T, ApiError> {
        self.request(Method::GET, endpoint, None::<&()>, auth).await
    }

    pub async fn post<T, B>(&self, endpoint: &str, body: Option<&B>, auth: bool) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, endpoint, body, auth).await
    }

    pub async fn put<T, B>(&self, endpoint: &str, body: Option<&B>, auth: bool) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, endpoint, body, auth).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str, auth: bool) -> Result<T, ApiError> {
        self.request(Method::DELETE, endpoint, None::<&()>, auth).await
    }

    /// Issue a request and decode its envelope.
    ///
    /// With `auth`, the stored access token is attached when present; a
    /// missing token sends the request unauthenticated and lets the server's
    /// 401 drive the recovery path. On a 401 the refresh procedure runs and
    /// the request is retried exactly once with the rotated token; if the
    /// refresh fails, the original 401 is surfaced as `Unauthorized`.
    pub async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        auth: bool,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let token = if auth { self.store.access_token() } else { None };
        let response = self
            .send(method.clone(), endpoint, body, token.as_deref())
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED && auth {
            debug!(endpoint, "Request rejected with 401, refreshing token pair");
            let fresh = match self.refresh_credential(token.as_deref()).await {
                Ok(fresh) => fresh,
                Err(err @ ApiError::Storage(_)) => return Err(err),
                Err(err) => {
                    debug!(endpoint, error = %err, "Refresh failed, surfacing the original 401");
                    return Err(ApiError::Unauthorized);
                }
            };
            let retried = self.send(method, endpoint, body, Some(fresh.as_str())).await?;
            return Self::decode(retried).await;
        }

        Self::decode(response).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self.http.request(method, &url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.map_err(ApiError::from_transport)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        let text = response.text().await.map_err(ApiError::from_transport)?;

        if !status.is_success() {
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&text)
                .ok()
                .and_then(|envelope| envelope.message);
            return Err(ApiError::from_status(status, message));
        }

        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|err| ApiError::Remote {
            status: status.as_u16(),
            message: format!("Invalid response envelope: {}", err),
        })?;

        match envelope.status {
            EnvelopeStatus::Error => Err(ApiError::from_status(status, envelope.message)),
            EnvelopeStatus::Success => match envelope.data {
                Some(data) => Ok(data),
                // Endpoints like logout succeed with an empty envelope; only
                // types that accept null (e.g. `()`) can absorb that
                None => serde_json::from_value(serde_json::Value::Null).map_err(|_| {
                    ApiError::Remote {
                        status: status.as_u16(),
                        message: "Response envelope is missing data".to_string(),
                    }
                }),
            },
        }
    }

    /// Exchange the refresh token for a rotated pair.
    ///
    /// At most one refresh is in flight per process. The first 401 through
    /// here performs the exchange; any request that 401s while it runs waits
    /// on the gate, then observes either the rotated pair (reused without a
    /// second exchange) or the cleared store (same failure outcome).
    async fn refresh_credential(&self, stale_access: Option<&str>) -> Result<String, ApiError> {
        let _gate = self.refresh_gate.lock().await;

        // A concurrent request may have finished the refresh while we waited
        // on the gate - reuse its result instead of spending the new refresh
        // token on a redundant exchange.
        if let Some(current) = self.store.access_token() {
            if Some(current.as_str()) != stale_access {
                debug!("Refresh already completed by a concurrent request");
                return Ok(current);
            }
        }

        let Some(credential) = self.store.credential() else {
            debug!("No refresh token stored, session is gone");
            return Err(ApiError::Unauthorized);
        };

        let body = serde_json::json!({ "refreshToken": credential.refresh_token });
        let outcome: Result<RefreshData, ApiError> = async {
            let response = self
                .send(Method::POST, "/auth/refresh", Some(&body), None)
                .await?;
            Self::decode(response).await
        }
        .await;

        match outcome {
            Ok(rotated) => {
                let rotated = Credential {
                    access_token: rotated.access_token,
                    refresh_token: rotated.refresh_token,
                };
                self.store.set_credential(&rotated)?;
                debug!("Token pair rotated");
                Ok(rotated.access_token)
            }
            Err(err) => {
                // The refresh token is spent or rejected; keeping the pair
                // around would repeat this failure on every future request
                warn!(error = %err, "Token refresh failed, clearing stored session");
                if let Err(clear_err) = self.store.clear() {
                    warn!(error = %clear_err, "Failed to clear credentials after refresh failure");
                }
                Err(err)
            }
        }
    }

    /// Remove all persisted credentials and the cached profile, sequenced
    /// after any in-flight refresh so the clear is the last writer.
    pub async fn clear_session(&self) -> Result<(), StoreError> {
        let _gate = self.refresh_gate.lock().await;
        self.store.clear()
    }
}

fn normalize_base_url(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}
