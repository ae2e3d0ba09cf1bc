//! Capture, scan and describe.
//!
//! The `Assistant` ties the hardware seams to the scan backend and makes sure
//! every outcome, including every failure, ends in something the user hears.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::device::{AudioPlayer, Camera, Flashlight};
use crate::gesture::{TapDisambiguator, TapEvent};
use crate::messages::Phrase;
use crate::models::{ScanRequest, ScanResult};
use crate::settings::SettingsStore;
use crate::speech::SpeechEngine;

pub struct Assistant {
    api: ApiClient,
    settings: SettingsStore,
    speech: Arc<dyn SpeechEngine>,
    camera: Arc<dyn Camera>,
    player: Arc<dyn AudioPlayer>,
    flashlight: Option<Arc<dyn Flashlight>>,
    /// Cleared on shutdown; late responses are dropped silently
    alive: Arc<AtomicBool>,
    session_id: String,
}

impl Assistant {
    pub fn new(
        api: ApiClient,
        settings: SettingsStore,
        speech: Arc<dyn SpeechEngine>,
        camera: Arc<dyn Camera>,
        player: Arc<dyn AudioPlayer>,
    ) -> Self {
        let current = settings.get();
        speech.set_volume(current.volume);
        speech.set_rate(current.tts_speed);

        Self {
            api,
            settings,
            speech,
            camera,
            player,
            flashlight: None,
            alive: Arc::new(AtomicBool::new(true)),
            session_id: chrono::Utc::now().format("%Y%m%d-%H%M%S").to_string(),
        }
    }

    pub fn with_flashlight(mut self, flashlight: Arc<dyn Flashlight>) -> Self {
        self.flashlight = Some(flashlight);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn say(&self, phrase: Phrase) {
        self.speech.say(phrase, self.settings.language());
    }

    /// Capture one frame, send it for description and voice the answer.
    ///
    /// Returns the backend's result when one arrived while still alive.
    pub async fn scan_once(&self) -> Option<ScanResult> {
        if !self.is_alive() {
            return None;
        }
        self.say(Phrase::Scanning);

        let Some(image) = self.camera.capture_image().await else {
            warn!("Camera returned no image");
            if self.is_alive() {
                self.say(Phrase::CameraUnavailable);
            }
            return None;
        };

        let request =
            ScanRequest::new(image, &self.settings.get()).with_session_id(self.session_id.clone());
        let outcome = self.api.scan_with_auth(&request).await;

        if !self.is_alive() {
            debug!("Dropping scan outcome after shutdown");
            return None;
        }

        match outcome {
            Ok(result) => {
                self.announce(&result).await;
                Some(result)
            }
            Err(e) => {
                warn!(error = %e, "Scan failed");
                self.say(e.phrase());
                None
            }
        }
    }

    /// Play the backend's audio, falling back to local speech of the text.
    async fn announce(&self, result: &ScanResult) {
        let language = result.language().unwrap_or_else(|| self.settings.language());

        if let Some(audio) = result.audio_bytes() {
            match self.player.play(&audio).await {
                Ok(()) => return,
                Err(e) => warn!(error = %e, "Audio playback failed, speaking text"),
            }
        }

        if !self.is_alive() {
            return;
        }
        if result.text.trim().is_empty() {
            self.speech.say(Phrase::NothingRecognized, language);
        } else {
            self.speech.speak(&result.text, language, true);
        }
    }

    /// Flip the flashlight. Failures are spoken, never returned.
    pub async fn toggle_flashlight(&self) -> bool {
        let Some(ref flashlight) = self.flashlight else {
            self.say(Phrase::FlashlightUnavailable);
            return false;
        };

        let enable = !self.settings.get().flashlight;
        match flashlight.set_enabled(enable).await {
            Ok(()) => {
                self.settings.update(|s| s.flashlight = enable);
                self.say(if enable {
                    Phrase::FlashlightOn
                } else {
                    Phrase::FlashlightOff
                });
                true
            }
            Err(e) => {
                warn!(error = %e, "Flashlight toggle failed");
                self.say(Phrase::FlashlightUnavailable);
                false
            }
        }
    }

    /// The main control, labelled in the active language and relabelled on
    /// every language switch. Its events go to `events`.
    pub fn scan_button(
        &self,
        events: mpsc::UnboundedSender<TapEvent>,
        window: Duration,
    ) -> Arc<TapDisambiguator> {
        let mut current = self.settings.language();
        let button = Arc::new(
            TapDisambiguator::new(Phrase::ScanButton.text(current), events)
                .with_hint(Phrase::ScanButtonHint.text(current))
                .with_window(window),
        );

        let weak = Arc::downgrade(&button);
        let mut updates = self.settings.subscribe();
        tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let language = updates.borrow_and_update().language;
                if language == current {
                    continue;
                }
                let Some(button) = weak.upgrade() else {
                    break;
                };
                current = language;
                button.relabel(
                    Phrase::ScanButton.text(language),
                    Some(Phrase::ScanButtonHint.text(language).to_string()),
                );
                debug!(?language, "Scan button relabelled");
            }
        });

        button
    }

    /// Drive the main control from its tap events until the sender goes away
    /// or the assistant is shut down.
    pub async fn run_control(&self, mut events: mpsc::UnboundedReceiver<TapEvent>) {
        while let Some(event) = events.recv().await {
            if !self.is_alive() {
                break;
            }
            match event {
                TapEvent::Speak(text) => {
                    self.speech.speak(&text, self.settings.language(), true);
                }
                TapEvent::Activate => {
                    self.scan_once().await;
                }
            }
        }
        debug!("Control loop finished");
    }

    pub fn shutdown(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            info!("Assistant shutting down");
            self.speech.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::auth::{AuthSessionManager, CredentialStore};
    use crate::device::DeviceError;
    use crate::messages::Language;
    use crate::settings::AppSettings;
    use crate::testing::{http_client, MockResponse, MockServer, RecordingSpeech};

    struct FakeCamera(Option<Vec<u8>>);

    #[async_trait]
    impl Camera for FakeCamera {
        async fn capture_image(&self) -> Option<Vec<u8>> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct FakePlayer {
        fail: bool,
        played: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl AudioPlayer for FakePlayer {
        async fn play(&self, audio: &[u8]) -> Result<(), DeviceError> {
            if self.fail {
                return Err(DeviceError::Playback("no output".to_string()));
            }
            self.played.lock().unwrap().push(audio.to_vec());
            Ok(())
        }
    }

    struct FakeFlashlight {
        available: bool,
    }

    #[async_trait]
    impl Flashlight for FakeFlashlight {
        async fn set_enabled(&self, _enabled: bool) -> Result<(), DeviceError> {
            if self.available {
                Ok(())
            } else {
                Err(DeviceError::Unavailable("no torch".to_string()))
            }
        }
    }

    struct Harness {
        assistant: Assistant,
        speech: Arc<RecordingSpeech>,
        player: Arc<FakePlayer>,
        settings: SettingsStore,
    }

    fn harness(base_url: &str, image: Option<Vec<u8>>, player: FakePlayer) -> Harness {
        let auth = AuthSessionManager::with_client(base_url, http_client(), CredentialStore::in_memory());
        let speech = Arc::new(RecordingSpeech::default());
        let player = Arc::new(player);
        let settings = SettingsStore::new(AppSettings::default());
        let assistant = Assistant::new(
            ApiClient::new(auth),
            settings.clone(),
            speech.clone(),
            Arc::new(FakeCamera(image)),
            player.clone(),
        );
        Harness {
            assistant,
            speech,
            player,
            settings,
        }
    }

    fn scan_json(text: &str, audio: Option<&str>) -> String {
        serde_json::json!({
            "lang": "ru",
            "detections": [],
            "text": text,
            "audio_base64": audio,
            "is_unknown": false,
        })
        .to_string()
    }

    fn ru(phrase: Phrase) -> String {
        phrase.text(Language::Ru).to_string()
    }

    #[tokio::test]
    async fn test_applies_speech_settings_on_start() {
        let h = harness("http://127.0.0.1:9", None, FakePlayer::default());
        assert_eq!(h.speech.volume(), Some(0.8));
        assert!(h.assistant.is_alive());
    }

    #[tokio::test]
    async fn test_no_image_speaks_camera_unavailable() {
        let server = MockServer::start(|_| MockResponse::json(200, "{}")).await;
        let h = harness(&server.base_url, None, FakePlayer::default());

        assert!(h.assistant.scan_once().await.is_none());
        assert_eq!(
            h.speech.texts(),
            vec![ru(Phrase::Scanning), ru(Phrase::CameraUnavailable)]
        );
        assert_eq!(server.hits("/scan"), 0);
    }

    #[tokio::test]
    async fn test_plays_audio_when_present() {
        let body = scan_json("Стул слева", Some("SUQz"));
        let server = MockServer::start(move |req| {
            assert!(req.body_text().contains("name=\"session_id\""));
            MockResponse::json(200, &body)
        })
        .await;
        let h = harness(&server.base_url, Some(b"jpeg".to_vec()), FakePlayer::default());

        let result = h.assistant.scan_once().await.unwrap();
        assert_eq!(result.text, "Стул слева");
        assert_eq!(h.player.played.lock().unwrap().clone(), vec![b"ID3".to_vec()]);
        assert_eq!(h.speech.texts(), vec![ru(Phrase::Scanning)]);
    }

    #[tokio::test]
    async fn test_speaks_text_without_audio() {
        let body = scan_json("Стул слева", None);
        let server = MockServer::start(move |_| MockResponse::json(200, &body)).await;
        let h = harness(&server.base_url, Some(b"jpeg".to_vec()), FakePlayer::default());

        h.assistant.scan_once().await;
        assert_eq!(h.speech.last().unwrap(), "Стул слева");
        assert!(h.player.played.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_speaks_text_when_playback_fails() {
        let body = scan_json("Дверь прямо", Some("SUQz"));
        let server = MockServer::start(move |_| MockResponse::json(200, &body)).await;
        let player = FakePlayer {
            fail: true,
            ..Default::default()
        };
        let h = harness(&server.base_url, Some(b"jpeg".to_vec()), player);

        h.assistant.scan_once().await;
        assert_eq!(h.speech.last().unwrap(), "Дверь прямо");
    }

    #[tokio::test]
    async fn test_empty_text_speaks_nothing_recognized() {
        let body = scan_json("  ", None);
        let server = MockServer::start(move |_| MockResponse::json(200, &body)).await;
        let h = harness(&server.base_url, Some(b"jpeg".to_vec()), FakePlayer::default());

        h.assistant.scan_once().await;
        assert_eq!(h.speech.last().unwrap(), ru(Phrase::NothingRecognized));
    }

    #[tokio::test]
    async fn test_backend_failure_is_spoken() {
        let server = MockServer::start(|_| MockResponse::json(503, "{}")).await;
        let h = harness(&server.base_url, Some(b"jpeg".to_vec()), FakePlayer::default());
        h.settings.update(|s| s.language = Language::Kz);

        assert!(h.assistant.scan_once().await.is_none());
        assert_eq!(
            h.speech.last().unwrap(),
            Phrase::ServiceUnavailable.text(Language::Kz)
        );
    }

    #[tokio::test]
    async fn test_expired_session_is_spoken() {
        let server = MockServer::start(|_| MockResponse::json(401, "{}")).await;
        let h = harness(&server.base_url, Some(b"jpeg".to_vec()), FakePlayer::default());

        h.assistant.scan_once().await;
        assert_eq!(h.speech.last().unwrap(), ru(Phrase::SessionExpired));
    }

    #[tokio::test]
    async fn test_shutdown_silences_everything() {
        let server = MockServer::start(|_| MockResponse::json(200, "{}")).await;
        let h = harness(&server.base_url, Some(b"jpeg".to_vec()), FakePlayer::default());

        h.assistant.shutdown();
        h.assistant.shutdown();
        assert!(h.assistant.scan_once().await.is_none());
        assert!(h.speech.texts().is_empty());
        assert_eq!(h.speech.stop_count(), 1);
        assert_eq!(server.hits("/scan"), 0);
    }

    #[tokio::test]
    async fn test_toggle_flashlight() {
        let h = harness("http://127.0.0.1:9", None, FakePlayer::default());
        assert!(!h.assistant.toggle_flashlight().await);
        assert_eq!(h.speech.last().unwrap(), ru(Phrase::FlashlightUnavailable));

        let Harness {
            assistant,
            speech,
            settings,
            ..
        } = h;
        let assistant = assistant.with_flashlight(Arc::new(FakeFlashlight { available: true }));
        assert!(assistant.toggle_flashlight().await);
        assert!(settings.get().flashlight);
        assert_eq!(speech.last().unwrap(), ru(Phrase::FlashlightOn));

        assert!(assistant.toggle_flashlight().await);
        assert!(!settings.get().flashlight);
        assert_eq!(speech.last().unwrap(), ru(Phrase::FlashlightOff));
    }

    #[tokio::test]
    async fn test_flashlight_failure_is_spoken() {
        let h = harness("http://127.0.0.1:9", None, FakePlayer::default());
        let assistant = h
            .assistant
            .with_flashlight(Arc::new(FakeFlashlight { available: false }));

        assert!(!assistant.toggle_flashlight().await);
        assert!(!h.settings.get().flashlight);
        assert_eq!(h.speech.last().unwrap(), ru(Phrase::FlashlightUnavailable));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_button_follows_language_switch() {
        let h = harness("http://127.0.0.1:9", None, FakePlayer::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let button = h.assistant.scan_button(tx, Duration::from_millis(400));
        assert_eq!(
            button.spoken_text(),
            format!("{}. {}", ru(Phrase::ScanButton), ru(Phrase::ScanButtonHint))
        );

        h.settings.update(|s| s.language = Language::Kz);
        button.tap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        let kz = format!(
            "{}. {}",
            Phrase::ScanButton.text(Language::Kz),
            Phrase::ScanButtonHint.text(Language::Kz)
        );
        assert_eq!(button.spoken_text(), kz);

        // Dropping the button closes the channel once the queued event is read
        drop(button);
        h.assistant.run_control(rx).await;
        assert_eq!(h.speech.texts(), vec![kz]);
        assert_eq!(h.speech.last_language(), Some(Language::Kz));
    }

    #[tokio::test]
    async fn test_control_loop_speaks_and_scans() {
        let body = scan_json("Окно справа", None);
        let server = MockServer::start(move |_| MockResponse::json(200, &body)).await;
        let h = harness(&server.base_url, Some(b"jpeg".to_vec()), FakePlayer::default());

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(TapEvent::Speak("Сканировать".to_string())).unwrap();
        tx.send(TapEvent::Activate).unwrap();
        drop(tx);

        h.assistant.run_control(rx).await;
        assert_eq!(
            h.speech.texts(),
            vec![
                "Сканировать".to_string(),
                ru(Phrase::Scanning),
                "Окно справа".to_string()
            ]
        );
        assert_eq!(server.hits("/scan"), 1);
    }
}
