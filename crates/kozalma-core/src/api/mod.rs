//! REST client module for the scan backend.
//!
//! This module provides the `ApiClient` for the `/scan` and `/health`
//! endpoints and `with_auth`, the single refresh-and-retry wrapper every
//! authenticated call goes through.
//!
//! Authenticated calls carry the stored access token as a bearer credential
//! and report HTTP 401 as `ApiError::Unauthorized`.

pub mod authenticated;
pub mod client;
pub mod error;

pub use authenticated::{with_auth, SessionRefresher};
pub use client::ApiClient;
pub use error::{ApiCallOutcome, ApiError};
