//! API client for the scan backend.
//!
//! This module provides the `ApiClient` struct for uploading captured images
//! to `/scan` and checking `/health`.

use std::future::Future;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use tracing::{debug, info, warn};

use super::{with_auth, ApiCallOutcome, ApiError};
use crate::auth::AuthSessionManager;
use crate::models::{ScanRequest, ScanResult};

// ============================================================================
// Constants
// ============================================================================

/// `/scan` runs detection, depth estimation and speech synthesis server side
const SCAN_TIMEOUT_SECS: u64 = 30;

const HEALTH_TIMEOUT_SECS: u64 = 5;

const IMAGE_MIME: &str = "image/jpeg";

/// Client for the scan backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: AuthSessionManager,
    scan_timeout: Duration,
    health_timeout: Duration,
}

impl ApiClient {
    /// Create a client that shares the session manager's connection pool and base URL.
    pub fn new(auth: AuthSessionManager) -> Self {
        Self {
            client: auth.http_client().clone(),
            base_url: auth.base_url().to_string(),
            auth,
            scan_timeout: Duration::from_secs(SCAN_TIMEOUT_SECS),
            health_timeout: Duration::from_secs(HEALTH_TIMEOUT_SECS),
        }
    }

    /// Override the `/scan` and `/health` timeouts
    pub(crate) fn with_timeouts(mut self, scan: Duration, health: Duration) -> Self {
        self.scan_timeout = scan;
        self.health_timeout = health;
        self
    }

    pub fn auth(&self) -> &AuthSessionManager {
        &self.auth
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Check if response is successful, returning a classified error if not.
    async fn check_response(response: reqwest::Response) -> ApiCallOutcome<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Run an authenticated call with a single refresh-and-retry on 401.
    /// `call` gets the bearer token it must send.
    pub async fn with_auth<T, F, Fut>(&self, call: F) -> ApiCallOutcome<T>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = ApiCallOutcome<T>>,
    {
        with_auth(&self.auth, call).await
    }

    /// Upload one image with the stored access token, if any.
    pub async fn scan(&self, request: &ScanRequest) -> ApiCallOutcome<ScanResult> {
        let token = self.auth.credentials().access_token();
        self.send_scan(request, token.as_deref()).await
    }

    async fn send_scan(
        &self,
        request: &ScanRequest,
        token: Option<&str>,
    ) -> ApiCallOutcome<ScanResult> {
        let image = Part::bytes(request.image.clone())
            .file_name(request.file_name.clone())
            .mime_str(IMAGE_MIME)?;

        let mut form = Form::new()
            .part("file", image)
            .text("lang", request.language.code())
            .text("tts_speed", request.tts_speed.to_string())
            .text("send_unknown", request.send_unknown.to_string());
        if let Some(ref session_id) = request.session_id {
            form = form.text("session_id", session_id.clone());
        }

        debug!(
            bytes = request.image.len(),
            lang = request.language.code(),
            "Uploading scan"
        );

        let response = Self::authorized(self.client.post(self.url("/scan")), token)
            .multipart(form)
            .timeout(self.scan_timeout)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let result: ScanResult = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

        info!(
            detections = result.detections.len(),
            is_unknown = result.is_unknown,
            has_audio = result.audio_base64.is_some(),
            "Scan completed"
        );
        Ok(result)
    }

    /// `scan` wrapped in the refresh-and-retry policy
    pub async fn scan_with_auth(&self, request: &ScanRequest) -> ApiCallOutcome<ScanResult> {
        self.with_auth(|token| async move { self.send_scan(request, token.as_deref()).await })
            .await
    }

    /// True only for a 200 within the health timeout
    pub async fn health(&self) -> bool {
        match self
            .client
            .get(self.url("/health"))
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(status = %response.status(), "Backend unhealthy");
                false
            }
            Err(e) => {
                warn!(error = %e, "Backend unreachable");
                false
            }
        }
    }
}
