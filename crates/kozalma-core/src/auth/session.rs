//! OTP login, token refresh and profile lookup against the `/auth` endpoints.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::attempt::{validate_code, validate_identifier, Channel};
use super::{AuthError, CredentialStore};
use crate::models::UserProfile;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for request-code, verify-code and refresh
const AUTH_TIMEOUT_SECS: u64 = 10;

/// Timeout for `/auth/me`. Shorter because it gates app startup.
const ME_TIMEOUT_SECS: u64 = 5;

/// Cooldown used when the backend omits `cooldown_seconds`
pub const DEFAULT_COOLDOWN_SECS: u32 = 60;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct RequestCodeBody<'a> {
    channel: Channel,
    identifier: &'a str,
}

#[derive(Debug, Deserialize)]
struct RequestCodeResponse {
    #[serde(default = "default_cooldown")]
    cooldown_seconds: u32,
}

fn default_cooldown() -> u32 {
    DEFAULT_COOLDOWN_SECS
}

#[derive(Debug, Serialize)]
struct VerifyCodeBody<'a> {
    channel: Channel,
    identifier: &'a str,
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

// ============================================================================
// Session manager
// ============================================================================

/// Client for the passwordless auth endpoints.
/// Clone is cheap - the HTTP client, credential store and refresh lock are shared.
#[derive(Clone)]
pub struct AuthSessionManager {
    client: Client,
    base_url: String,
    credentials: CredentialStore,
    refresh_lock: Arc<Mutex<()>>,
    auth_timeout: Duration,
    me_timeout: Duration,
}

impl AuthSessionManager {
    pub fn new(base_url: impl Into<String>, credentials: CredentialStore) -> Result<Self, AuthError> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(base_url, client, credentials))
    }

    /// Build on an existing HTTP client, sharing its connection pool.
    pub fn with_client(
        base_url: impl Into<String>,
        client: Client,
        credentials: CredentialStore,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            refresh_lock: Arc::new(Mutex::new(())),
            auth_timeout: Duration::from_secs(AUTH_TIMEOUT_SECS),
            me_timeout: Duration::from_secs(ME_TIMEOUT_SECS),
        }
    }

    /// Override the auth-endpoint and `/auth/me` timeouts
    pub(crate) fn with_timeouts(mut self, auth: Duration, me: Duration) -> Self {
        self.auth_timeout = auth;
        self.me_timeout = me;
        self
    }

    pub fn http_client(&self) -> &Client {
        &self.client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Ask the backend to send a code. Returns the resend cooldown in seconds.
    pub async fn request_code(&self, channel: Channel, identifier: &str) -> Result<u32, AuthError> {
        let identifier = validate_identifier(channel, identifier)?;

        let response = self
            .client
            .post(self.url("/auth/request-code"))
            .json(&RequestCodeBody {
                channel,
                identifier: &identifier,
            })
            .timeout(self.auth_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, %channel, "Code request rejected");
            return Err(AuthError::from_request_code_status(status));
        }

        let text = response.text().await?;
        let cooldown = match serde_json::from_str::<RequestCodeResponse>(&text) {
            Ok(body) => body.cooldown_seconds,
            Err(e) => {
                warn!(error = %e, "Unreadable request-code response, using default cooldown");
                DEFAULT_COOLDOWN_SECS
            }
        };

        info!(%channel, cooldown, "Code requested");
        Ok(cooldown)
    }

    /// Exchange a code for a token pair and store it.
    /// On any failure the credential store is left untouched.
    pub async fn verify_code(
        &self,
        channel: Channel,
        identifier: &str,
        code: &str,
    ) -> Result<(), AuthError> {
        let identifier = validate_identifier(channel, identifier)?;
        validate_code(code)?;

        let response = self
            .client
            .post(self.url("/auth/verify-code"))
            .json(&VerifyCodeBody {
                channel,
                identifier: &identifier,
                code: code.trim(),
            })
            .timeout(self.auth_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, %channel, "Code verification rejected");
            return Err(AuthError::from_verify_code_status(status));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        self.credentials
            .save_tokens(&tokens.access_token, &tokens.refresh_token)?;
        info!(%channel, "Login successful");
        Ok(())
    }

    /// Rotate the token pair using the stored refresh token.
    ///
    /// Returns `false` instead of an error when no refresh token is stored,
    /// the call fails, or it times out.
    pub async fn refresh(&self) -> bool {
        let current = self.credentials.access_token();
        self.refresh_if_current(current.as_deref()).await
    }

    /// Rotate the pair after a request carrying access token `used` was
    /// rejected.
    ///
    /// Concurrent callers are serialized. If the stored access token is no
    /// longer `used` when the lock is acquired, the rotation done by another
    /// caller is reused and no network call is made.
    pub async fn refresh_if_current(&self, used: Option<&str>) -> bool {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.credentials.access_token() {
            if used != Some(current.as_str()) {
                debug!("Token pair already rotated by a concurrent refresh");
                return true;
            }
        }

        let Some(refresh_token) = self.credentials.refresh_token() else {
            debug!("No refresh token stored");
            return false;
        };

        let tokens = match self.exchange_refresh_token(&refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                return false;
            }
        };

        match self
            .credentials
            .save_tokens(&tokens.access_token, &tokens.refresh_token)
        {
            Ok(()) => {
                info!("Token pair refreshed");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to store refreshed tokens");
                false
            }
        }
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(self.url("/auth/refresh"))
            .json(&RefreshBody { refresh_token })
            .timeout(self.auth_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Other(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }

    /// Profile of the signed-in user, or `None` if there is no access token,
    /// the call fails, returns non-200 or times out.
    pub async fn me(&self) -> Option<UserProfile> {
        let Some(token) = self.credentials.access_token() else {
            debug!("No access token stored");
            return None;
        };

        let response = match self
            .client
            .get(self.url("/auth/me"))
            .bearer_auth(token)
            .timeout(self.me_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Profile request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "Profile request rejected");
            return None;
        }

        match response.json::<UserProfile>().await {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(error = %e, "Failed to parse profile");
                None
            }
        }
    }

    /// Startup gate: `me`, else one `refresh` followed by one more `me`.
    /// `None` means the user has to log in. Never refreshes twice.
    pub async fn restore_session(&self) -> Option<UserProfile> {
        if let Some(profile) = self.me().await {
            return Some(profile);
        }

        if !self.refresh().await {
            info!("No usable session, login required");
            return None;
        }

        let profile = self.me().await;
        if profile.is_none() {
            info!("Profile still unavailable after refresh, login required");
        }
        profile
    }

    pub fn logout(&self) {
        self.credentials.clear();
        info!("Logged out");
    }
}
