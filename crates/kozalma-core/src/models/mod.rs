//! Data models for the scan backend.
//!
//! This module contains the typed request/response structures:
//!
//! - `ScanRequest`, `ScanResult`, `Detection`: the `/scan` exchange
//! - `UserProfile`: the `/auth/me` payload

pub mod profile;
pub mod scan;

pub use profile::UserProfile;
pub use scan::{Detection, Position, ScanRequest, ScanResult};
