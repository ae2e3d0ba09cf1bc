//! Terminal stand-ins for the phone's speech engine, camera and speaker.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use kozalma_core::device::{AudioPlayer, Camera, DeviceError, Flashlight};
use kozalma_core::{Language, SpeechEngine};

/// Prints what would be spoken, tagged with the locale.
pub struct ConsoleSpeech;

impl SpeechEngine for ConsoleSpeech {
    fn speak(&self, text: &str, language: Language, _interrupt: bool) {
        println!("[{}] {}", language.locale(), text);
    }

    fn set_volume(&self, volume: f32) {
        debug!(volume, "Speech volume set");
    }

    fn set_rate(&self, rate: f32) {
        debug!(rate, "Speech rate set");
    }

    fn stop(&self) {
        debug!("Speech stopped");
    }
}

/// Serves an image file as the captured frame.
pub struct FileCamera {
    path: PathBuf,
}

impl FileCamera {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl Camera for FileCamera {
    async fn capture_image(&self) -> Option<Vec<u8>> {
        match std::fs::read(&self.path) {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => {
                warn!(path = %self.path.display(), "Image file is empty");
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cannot read image file");
                None
            }
        }
    }
}

/// Writes received speech audio to a file when asked to; otherwise reports
/// no audio output so the text is printed instead.
pub struct FilePlayer {
    out: Option<PathBuf>,
}

impl FilePlayer {
    pub fn new(out: Option<PathBuf>) -> Self {
        Self { out }
    }
}

#[async_trait]
impl AudioPlayer for FilePlayer {
    async fn play(&self, audio: &[u8]) -> Result<(), DeviceError> {
        let Some(ref path) = self.out else {
            return Err(DeviceError::Unavailable("no audio output".to_string()));
        };
        std::fs::write(path, audio).map_err(|e| DeviceError::Playback(e.to_string()))?;
        println!("Audio saved to {}", path.display());
        Ok(())
    }
}

/// A terminal has no torch
pub struct NoFlashlight;

#[async_trait]
impl Flashlight for NoFlashlight {
    async fn set_enabled(&self, _enabled: bool) -> Result<(), DeviceError> {
        Err(DeviceError::Unavailable("no flashlight".to_string()))
    }
}
