//! Single refresh-and-retry around authenticated calls.

use std::future::Future;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{ApiCallOutcome, ApiError};
use crate::auth::AuthSessionManager;

/// What `with_auth` needs from the session layer.
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    /// Bearer token for the next request
    fn bearer_token(&self) -> Option<String>;

    /// Rotate the credential pair after a request carrying `used` was
    /// rejected. A pair already rotated away from `used` counts as success.
    /// `false` when no usable pair could be obtained.
    async fn refresh_after(&self, used: Option<String>) -> bool;

    /// Drop the stored credentials after an unrecoverable refresh failure.
    fn invalidate(&self);
}

#[async_trait]
impl SessionRefresher for AuthSessionManager {
    fn bearer_token(&self) -> Option<String> {
        self.credentials().access_token()
    }

    async fn refresh_after(&self, used: Option<String>) -> bool {
        self.refresh_if_current(used.as_deref()).await
    }

    fn invalidate(&self) {
        self.credentials().clear();
    }
}

/// Run `call` with the current bearer token; on `Unauthorized`, refresh once
/// and run it exactly once more with the token that is current then.
///
/// The refresh is keyed on the token the rejected request carried. A
/// rotation already completed by a concurrent caller counts as success, so
/// concurrent 401s share one network refresh.
/// - The retried call's outcome is returned as-is, including a second 401.
/// - If the refresh fails the credentials are cleared and the original
///   `Unauthorized` is returned.
/// - Any other failure is returned immediately without refreshing.
pub async fn with_auth<S, T, F, Fut>(session: &S, mut call: F) -> ApiCallOutcome<T>
where
    S: SessionRefresher + ?Sized,
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = ApiCallOutcome<T>>,
{
    let used = session.bearer_token();
    match call(used.clone()).await {
        Err(original @ ApiError::Unauthorized) => {
            debug!("Call unauthorized, refreshing credentials");
            if session.refresh_after(used).await {
                call(session.bearer_token()).await
            } else {
                warn!("Credential refresh failed, clearing stored tokens");
                session.invalidate();
                Err(original)
            }
        }
        outcome => outcome,
    }
}
