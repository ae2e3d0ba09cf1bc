//! Authentication module for the passwordless OTP login and token lifecycle.
//!
//! This module provides:
//! - `CredentialStore`: the access/refresh token pair over a `SecureStorage` backend
//! - `AuthAttempt`: local validation and resend cooldown for one login flow
//! - `AuthSessionManager`: request/verify code, refresh, profile and logout
//!
//! Tokens are kept in the OS keychain by default and survive restarts.

pub mod attempt;
pub mod credentials;
pub mod error;
pub mod session;

pub use attempt::{validate_code, validate_identifier, AuthAttempt, Channel, CooldownTimer};
pub use credentials::{
    CredentialPair, CredentialStore, KeyringStorage, MemoryStorage, SecureStorage,
};
pub use error::{AuthError, StorageError, ValidationError};
pub use session::AuthSessionManager;
