//! KozAlma core - the interaction and session layer of the scan-and-describe
//! assistant.
//!
//! This crate provides:
//! - `gesture`: tap disambiguation (speak vs activate) and edge-zone volume control
//! - `auth`: credential storage, OTP login and token refresh
//! - `api`: the scan/health client with single refresh-and-retry on expiry
//! - `assistant`: the capture, scan and describe flow with spoken fallbacks
//!
//! The speech engine, camera, audio output and secure storage are external
//! collaborators reached through the traits in `speech`, `device` and
//! `auth::credentials`.

pub mod api;
pub mod assistant;
pub mod auth;
pub mod config;
pub mod device;
pub mod gesture;
pub mod messages;
pub mod models;
pub mod settings;
pub mod speech;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{with_auth, ApiCallOutcome, ApiClient, ApiError, SessionRefresher};
pub use assistant::Assistant;
pub use auth::{
    AuthAttempt, AuthError, AuthSessionManager, Channel, CredentialPair, CredentialStore,
    ValidationError,
};
pub use config::Config;
pub use gesture::{EdgeZone, EdgeZoneVolumeController, TapDisambiguator, TapEvent};
pub use messages::{Language, Phrase};
pub use settings::{AppSettings, SettingsStore};
pub use speech::SpeechEngine;
