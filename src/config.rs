//! Server configuration read from the environment

use crate::state_machine::state::DEFAULT_HANDOFF_DELAY;
use crate::voice::{PremiumVoiceConfig, SilentVoice, SpeakOptions};
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;

/// Settings applied to every call the manager starts
#[derive(Debug, Clone)]
pub struct CallConfig {
    pub handoff_delay: Duration,
    /// Provider used when a call does not name one
    pub voice_provider: String,
    pub premium: PremiumVoiceConfig,
    pub speak_options: SpeakOptions,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            handoff_delay: DEFAULT_HANDOFF_DELAY,
            voice_provider: SilentVoice::NAME.to_string(),
            premium: PremiumVoiceConfig::default(),
            speak_options: SpeakOptions::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub call: CallConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = CallConfig::default();

        let port = parsed(&lookup, "FLEETCALL_PORT").unwrap_or(DEFAULT_PORT);
        let handoff_delay = parsed::<u64>(&lookup, "FLEETCALL_HANDOFF_DELAY_MS")
            .map_or(defaults.handoff_delay, Duration::from_millis);
        let voice_provider = lookup("FLEETCALL_VOICE_PROVIDER")
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .unwrap_or(defaults.voice_provider);
        let rate = parsed::<f32>(&lookup, "FLEETCALL_SPEECH_RATE")
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(defaults.speak_options.rate);

        Self {
            port,
            call: CallConfig {
                handoff_delay,
                voice_provider,
                premium: PremiumVoiceConfig::from_lookup(&lookup),
                speak_options: SpeakOptions {
                    rate,
                    ..defaults.speak_options
                },
            },
        }
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let value = lookup(key)?;
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %value, "Ignoring unparseable setting");
            None
        }
    }
}
