use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::ValidationError;

/// Length of a one-time passcode
pub const CODE_LENGTH: usize = 6;

/// Accepted digit count of a phone number, country code included
const MIN_PHONE_DIGITS: usize = 10;
const MAX_PHONE_DIGITS: usize = 15;

/// Backend identifier limit (`max_length=320`)
const MAX_IDENTIFIER_LENGTH: usize = 320;

/// Where the one-time passcode is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Phone,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Phone => "phone",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate and normalize an identifier for `channel`.
/// Returns the trimmed identifier; phone numbers keep only `+` and digits.
pub fn validate_identifier(channel: Channel, raw: &str) -> Result<String, ValidationError> {
    let identifier = raw.trim();
    if identifier.is_empty() {
        return Err(ValidationError::EmptyIdentifier);
    }

    match channel {
        Channel::Email => {
            if identifier.len() > MAX_IDENTIFIER_LENGTH || identifier.contains(char::is_whitespace) {
                return Err(ValidationError::InvalidEmail);
            }
            let (local, domain) = identifier
                .split_once('@')
                .ok_or(ValidationError::InvalidEmail)?;
            let domain_ok = domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@');
            if local.is_empty() || !domain_ok {
                return Err(ValidationError::InvalidEmail);
            }
            Ok(identifier.to_string())
        }
        Channel::Phone => {
            let (plus, rest) = match identifier.strip_prefix('+') {
                Some(rest) => ("+", rest),
                None => ("", identifier),
            };
            if rest
                .chars()
                .any(|c| !(c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')')))
            {
                return Err(ValidationError::InvalidPhone);
            }
            let digits: String = rest.chars().filter(|c| c.is_ascii_digit()).collect();
            if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len()) {
                return Err(ValidationError::InvalidPhone);
            }
            Ok(format!("{}{}", plus, digits))
        }
    }
}

/// A code must be exactly six ASCII digits.
pub fn validate_code(code: &str) -> Result<(), ValidationError> {
    let code = code.trim();
    if code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidCode)
    }
}

/// Countdown of the server-mandated wait before another code may be requested.
///
/// Ticks once per second on the tokio clock and publishes the remaining
/// seconds over a `watch` channel. Dropping the timer stops the countdown.
pub struct CooldownTimer {
    remaining: watch::Receiver<u32>,
    task: JoinHandle<()>,
}

impl CooldownTimer {
    /// Start counting down from `seconds`. Must be called within a tokio runtime.
    pub fn start(seconds: u32) -> Self {
        let (tx, rx) = watch::channel(seconds);
        let task = tokio::spawn(async move {
            let mut remaining = seconds;
            while remaining > 0 {
                tokio::time::sleep(Duration::from_secs(1)).await;
                remaining -= 1;
                if tx.send(remaining).is_err() {
                    break;
                }
            }
            debug!("Resend cooldown finished");
        });
        Self {
            remaining: rx,
            task,
        }
    }

    pub fn remaining(&self) -> u32 {
        *self.remaining.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.remaining.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }
}

impl Drop for CooldownTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// One run through the OTP screen: validated channel/identifier plus the
/// resend cooldown. Never persisted.
pub struct AuthAttempt {
    channel: Channel,
    identifier: String,
    cooldown: Option<CooldownTimer>,
}

impl AuthAttempt {
    pub fn new(channel: Channel, identifier: &str) -> Result<Self, ValidationError> {
        let identifier = validate_identifier(channel, identifier)?;
        Ok(Self {
            channel,
            identifier,
            cooldown: None,
        })
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Begin the resend countdown reported by the backend, replacing any running one.
    pub fn start_cooldown(&mut self, seconds: u32) {
        self.cooldown = Some(CooldownTimer::start(seconds));
    }

    pub fn cooldown_remaining_seconds(&self) -> u32 {
        self.cooldown.as_ref().map(CooldownTimer::remaining).unwrap_or(0)
    }

    /// Receiver for countdown updates, if a cooldown was started
    pub fn cooldown_updates(&self) -> Option<watch::Receiver<u32>> {
        self.cooldown.as_ref().map(CooldownTimer::subscribe)
    }

    /// Resend is disabled until the cooldown reaches zero
    pub fn can_resend(&self) -> bool {
        self.cooldown_remaining_seconds() == 0
    }
}
