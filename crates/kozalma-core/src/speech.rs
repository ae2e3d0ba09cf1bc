//! Speech engine seam.
//!
//! The platform text-to-speech engine is an external collaborator; the core
//! only needs to hand it text, a locale and an interrupt flag.

use crate::messages::{Language, Phrase};

pub trait SpeechEngine: Send + Sync {
    /// Speak `text`. With `interrupt` set, anything currently being spoken is cut off.
    fn speak(&self, text: &str, language: Language, interrupt: bool);

    /// Output volume in `[0.0, 1.0]`
    fn set_volume(&self, volume: f32);

    /// Speech rate multiplier (1.0 = normal)
    fn set_rate(&self, rate: f32);

    fn stop(&self);

    /// Speak a catalog phrase, interrupting current speech.
    fn say(&self, phrase: Phrase, language: Language) {
        self.speak(phrase.text(language), language, true);
    }
}
