//! Observable application settings.
//!
//! `SettingsStore` is constructed once at startup and cloned into every
//! consumer. Subscribers are notified through a `tokio::sync::watch` channel
//! whenever a value actually changes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::messages::Language;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    pub language: Language,
    /// Speech rate multiplier, also sent to the backend as `tts_speed`
    pub tts_speed: f32,
    /// Output volume in `[0.0, 1.0]`
    pub volume: f32,
    /// Let the backend keep images it could not recognize
    pub send_unknown: bool,
    pub flashlight: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            language: Language::Ru,
            tts_speed: 1.0,
            volume: 0.8,
            send_unknown: false,
            flashlight: false,
        }
    }
}

/// Shared handle to the current settings.
/// Clone is cheap - all clones publish to the same channel.
#[derive(Clone)]
pub struct SettingsStore {
    tx: Arc<watch::Sender<AppSettings>>,
}

impl SettingsStore {
    pub fn new(initial: AppSettings) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Snapshot of the current settings
    pub fn get(&self) -> AppSettings {
        self.tx.borrow().clone()
    }

    pub fn language(&self) -> Language {
        self.tx.borrow().language
    }

    /// Apply `f` to the settings; subscribers are only woken if something changed.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut AppSettings),
    {
        self.tx.send_if_modified(|settings| {
            let before = settings.clone();
            f(settings);
            let changed = *settings != before;
            if changed {
                debug!(?settings, "Settings updated");
            }
            changed
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<AppSettings> {
        self.tx.subscribe()
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(AppSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_initial() {
        let store = SettingsStore::new(AppSettings {
            language: Language::Kz,
            ..Default::default()
        });
        assert_eq!(store.language(), Language::Kz);
        assert_eq!(store.get().tts_speed, 1.0);
    }

    #[test]
    fn test_clones_share_state() {
        let store = SettingsStore::default();
        let other = store.clone();
        other.update(|s| s.send_unknown = true);
        assert!(store.get().send_unknown);
    }

    #[tokio::test]
    async fn test_subscribers_notified_on_change() {
        let store = SettingsStore::default();
        let mut rx = store.subscribe();

        store.update(|s| s.language = Language::Kz);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().language, Language::Kz);
    }

    #[test]
    fn test_no_notification_without_change() {
        let store = SettingsStore::default();
        let rx = store.subscribe();

        store.update(|s| s.language = Language::Ru); // already Ru
        assert!(!rx.has_changed().unwrap());
    }
}
