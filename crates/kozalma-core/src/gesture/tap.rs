//! Single tap speaks, double tap activates.
//!
//! Each interactive element owns one `TapDisambiguator`. The first tap arms a
//! timer for the double-tap window; a second tap inside the window cancels it
//! and activates the element, otherwise the timer fires and the element's
//! label is spoken.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::debug;

pub const DEFAULT_DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(400);

/// What a tap sequence resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapEvent {
    /// Announce the element
    Speak(String),
    /// Perform the element's action
    Activate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingState {
    Idle,
    AwaitingSecondTap,
}

struct GestureSession {
    label: String,
    hint: Option<String>,
    state: PendingState,
    /// Bumped whenever the scheduled task is superseded, so a timer that
    /// already woke up can tell it lost the race.
    generation: u64,
    task: Option<JoinHandle<()>>,
    /// Taps before this instant are the tail of an activated double tap
    ignore_until: Option<Instant>,
    torn_down: bool,
}

impl GestureSession {
    fn spoken_text(&self) -> String {
        match &self.hint {
            Some(hint) => format!("{}. {}", self.label, hint),
            None => self.label.clone(),
        }
    }

    fn cancel_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation = self.generation.wrapping_add(1);
    }
}

fn lock(session: &Mutex<GestureSession>) -> MutexGuard<'_, GestureSession> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct TapDisambiguator {
    window: Duration,
    events: mpsc::UnboundedSender<TapEvent>,
    session: Arc<Mutex<GestureSession>>,
}

impl TapDisambiguator {
    pub fn new(label: impl Into<String>, events: mpsc::UnboundedSender<TapEvent>) -> Self {
        Self {
            window: DEFAULT_DOUBLE_TAP_WINDOW,
            events,
            session: Arc::new(Mutex::new(GestureSession {
                label: label.into(),
                hint: None,
                state: PendingState::Idle,
                generation: 0,
                task: None,
                ignore_until: None,
                torn_down: false,
            })),
        }
    }

    pub fn with_hint(self, hint: impl Into<String>) -> Self {
        lock(&self.session).hint = Some(hint.into());
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// `"{label}. {hint}"`, or just the label
    pub fn spoken_text(&self) -> String {
        lock(&self.session).spoken_text()
    }

    /// Replace label and hint, e.g. after a language switch. A pending
    /// announcement speaks the new text.
    pub fn relabel(&self, label: impl Into<String>, hint: Option<String>) {
        let mut session = lock(&self.session);
        session.label = label.into();
        session.hint = hint;
    }

    pub fn state(&self) -> PendingState {
        lock(&self.session).state
    }

    /// Feed one raw tap. Must be called within a tokio runtime.
    pub fn tap(&self) {
        let now = Instant::now();
        let mut session = lock(&self.session);
        if session.torn_down {
            return;
        }

        match session.state {
            PendingState::Idle => {
                if let Some(until) = session.ignore_until {
                    if now < until {
                        debug!(label = %session.label, "Ignoring extra tap after activation");
                        return;
                    }
                    session.ignore_until = None;
                }

                session.cancel_task();
                session.state = PendingState::AwaitingSecondTap;
                session.ignore_until = Some(now + self.window);
                session.task = Some(self.schedule_speak(session.generation));
            }
            PendingState::AwaitingSecondTap => {
                session.cancel_task();
                session.state = PendingState::Idle;
                debug!(label = %session.label, "Double tap");
                let _ = self.events.send(TapEvent::Activate);
            }
        }
    }

    fn schedule_speak(&self, generation: u64) -> JoinHandle<()> {
        let shared = Arc::clone(&self.session);
        let events = self.events.clone();
        let window = self.window;

        tokio::spawn(async move {
            sleep(window).await;
            let text = {
                let mut session = lock(&shared);
                if session.torn_down
                    || session.generation != generation
                    || session.state != PendingState::AwaitingSecondTap
                {
                    return;
                }
                session.state = PendingState::Idle;
                session.task = None;
                session.ignore_until = None;
                session.spoken_text()
            };
            let _ = events.send(TapEvent::Speak(text));
        })
    }

    /// Cancel any pending announcement. No event is emitted afterwards.
    pub fn teardown(&self) {
        let mut session = lock(&self.session);
        session.torn_down = true;
        session.cancel_task();
        session.state = PendingState::Idle;
    }
}

impl Drop for TapDisambiguator {
    fn drop(&mut self) {
        self.teardown();
    }
}
