//! Volume control through double taps on the screen edges.
//!
//! The left edge lowers the volume and the right edge raises it. A single tap
//! only explains what the zone does, so the user cannot change the volume by
//! brushing an edge.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::DEFAULT_DOUBLE_TAP_WINDOW;
use crate::messages::Phrase;
use crate::settings::SettingsStore;
use crate::speech::SpeechEngine;

// ============================================================================
// Constants
// ============================================================================

/// Volume change per double tap
pub const VOLUME_STEP: f32 = 0.1;

/// Share of the screen width covered by each edge zone
const EDGE_FRACTION: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeZone {
    Left,
    Right,
}

impl EdgeZone {
    fn index(self) -> usize {
        match self {
            EdgeZone::Left => 0,
            EdgeZone::Right => 1,
        }
    }

    fn delta(self) -> f32 {
        match self {
            EdgeZone::Left => -VOLUME_STEP,
            EdgeZone::Right => VOLUME_STEP,
        }
    }

    fn hint(self) -> Phrase {
        match self {
            EdgeZone::Left => Phrase::VolumeHintLeft,
            EdgeZone::Right => Phrase::VolumeHintRight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeOutcome {
    /// First tap: the zone hint was spoken
    Hint,
    /// `at_limit` is set when the step ran into a boundary and was clamped
    Adjusted { volume: f32, at_limit: bool },
}

/// Hit test for the two edge zones.
///
/// The zones are the outer strips of the screen below the header band.
#[derive(Debug, Clone, Copy)]
pub struct EdgeZoneLayout {
    pub width: f32,
    pub height: f32,
    pub header_height: f32,
}

impl EdgeZoneLayout {
    pub fn new(width: f32, height: f32, header_height: f32) -> Self {
        Self {
            width,
            height,
            header_height,
        }
    }

    pub fn zone_at(&self, x: f32, y: f32) -> Option<EdgeZone> {
        if y < self.header_height || y > self.height || x < 0.0 || x > self.width {
            return None;
        }
        let strip = self.width * EDGE_FRACTION;
        if x < strip {
            Some(EdgeZone::Left)
        } else if x > self.width - strip {
            Some(EdgeZone::Right)
        } else {
            None
        }
    }
}

/// Two independent double-tap detectors driving the shared volume setting.
pub struct EdgeZoneVolumeController {
    speech: Arc<dyn SpeechEngine>,
    settings: SettingsStore,
    window: Duration,
    last_tap: Mutex<[Option<Instant>; 2]>,
}

impl EdgeZoneVolumeController {
    pub fn new(speech: Arc<dyn SpeechEngine>, settings: SettingsStore) -> Self {
        Self {
            speech,
            settings,
            window: DEFAULT_DOUBLE_TAP_WINDOW,
            last_tap: Mutex::new([None, None]),
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn tap(&self, zone: EdgeZone) -> VolumeOutcome {
        self.tap_at(zone, Instant::now())
    }

    /// Handle a tap on `zone` that happened at `now`.
    pub fn tap_at(&self, zone: EdgeZone, now: Instant) -> VolumeOutcome {
        let is_double = {
            let mut last_tap = self
                .last_tap
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let slot = &mut last_tap[zone.index()];
            match *slot {
                Some(last) if now.saturating_duration_since(last) < self.window => {
                    *slot = None;
                    true
                }
                _ => {
                    *slot = Some(now);
                    false
                }
            }
        };

        let language = self.settings.language();
        if !is_double {
            self.speech.say(zone.hint(), language);
            return VolumeOutcome::Hint;
        }

        let (volume, at_limit) = step_volume(self.settings.get().volume, zone.delta());
        self.speech.set_volume(volume);
        self.settings.update(|s| s.volume = volume);

        let phrase = match (zone, at_limit) {
            (EdgeZone::Right, true) => Phrase::VolumeMax,
            (EdgeZone::Left, true) => Phrase::VolumeMin,
            (EdgeZone::Right, false) => Phrase::VolumeUp,
            (EdgeZone::Left, false) => Phrase::VolumeDown,
        };
        self.speech.say(phrase, language);

        debug!(?zone, volume, at_limit, "Volume changed");
        VolumeOutcome::Adjusted { volume, at_limit }
    }
}

/// Apply `delta`, rounded to hundredths and clamped to `[0.0, 1.0]`.
/// Reports whether the clamp engaged.
fn step_volume(current: f32, delta: f32) -> (f32, bool) {
    let stepped = ((current + delta) * 100.0).round() / 100.0;
    let volume = stepped.clamp(0.0, 1.0);
    (volume, stepped != volume)
}
