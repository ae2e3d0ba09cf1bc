use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::messages::Language;
use crate::settings::AppSettings;

/// Horizontal placement of a detection in the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: i64,
    pub class_name: String,
    /// Class name in the request language; empty when the backend has no translation
    #[serde(default)]
    pub class_name_localized: String,
    pub confidence: f32,
    /// `[x1, y1, x2, y2]` in pixels
    #[serde(default)]
    pub bbox: Vec<f32>,
    pub position: Position,
    /// Approximate distance in meters
    #[serde(default)]
    pub distance_m: Option<f32>,
}

impl Detection {
    pub fn display_name(&self) -> &str {
        if self.class_name_localized.is_empty() {
            &self.class_name
        } else {
            &self.class_name_localized
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(default)]
    pub lang: Option<String>,
    /// Description of the scene, already localized
    pub text: String,
    /// MP3 speech of `text`, base64 encoded
    #[serde(default)]
    pub audio_base64: Option<String>,
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub is_unknown: bool,
}

impl ScanResult {
    /// Decoded audio, or `None` when absent or not valid base64
    pub fn audio_bytes(&self) -> Option<Vec<u8>> {
        let encoded = self.audio_base64.as_deref().filter(|a| !a.is_empty())?;
        match BASE64.decode(encoded) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(error = %e, "Scan audio is not valid base64");
                None
            }
        }
    }

    pub fn language(&self) -> Option<Language> {
        self.lang.as_deref().and_then(Language::from_code)
    }
}

/// One image upload to `/scan`
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub image: Vec<u8>,
    pub file_name: String,
    pub language: Language,
    pub tts_speed: f32,
    pub send_unknown: bool,
    /// Groups stored unknown images on the backend
    pub session_id: Option<String>,
}

impl ScanRequest {
    pub fn new(image: Vec<u8>, settings: &AppSettings) -> Self {
        Self {
            image,
            file_name: "capture.jpg".to_string(),
            language: settings.language,
            tts_speed: settings.tts_speed,
            send_unknown: settings.send_unknown,
            session_id: None,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}
