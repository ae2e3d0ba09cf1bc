//! Hardware seams: camera, audio output and flashlight.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Device unavailable: {0}")]
    Unavailable(String),

    #[error("Playback failed: {0}")]
    Playback(String),
}

#[async_trait]
pub trait Camera: Send + Sync {
    /// Capture a still image. `None` when the camera could not produce one.
    async fn capture_image(&self) -> Option<Vec<u8>>;
}

#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Play encoded audio (MP3 from the backend) to completion.
    async fn play(&self, audio: &[u8]) -> Result<(), DeviceError>;
}

#[async_trait]
pub trait Flashlight: Send + Sync {
    async fn set_enabled(&self, enabled: bool) -> Result<(), DeviceError>;
}
