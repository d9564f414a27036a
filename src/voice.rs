//! Voice provider abstraction
//!
//! A provider turns agent text into speech. The state machine only needs
//! four operations: speak, stop, list voices, select a voice.

mod error;
mod premium;
mod silent;

pub use error::VoiceError;
pub use premium::{PremiumVoice, PremiumVoiceConfig};
pub use silent::SilentVoice;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Playback options passed with every utterance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeakOptions {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for SpeakOptions {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

/// A voice a provider can speak with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
}

/// Synthesized audio for one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub media_type: String,
    pub data: Vec<u8>,
}

/// Common interface for speech providers
#[async_trait]
pub trait VoiceProvider: Send + Sync {
    /// Speak `text`. Returns the audio when the provider produces any.
    async fn speak(&self, text: &str, options: &SpeakOptions)
        -> Result<Option<AudioClip>, VoiceError>;

    /// Stop whatever is playing
    fn stop(&self);

    /// Voices this provider offers
    async fn voices(&self) -> Result<Vec<VoiceInfo>, VoiceError>;

    /// Select the voice used by later `speak` calls
    fn set_voice(&self, voice_id: &str) -> Result<(), VoiceError>;

    /// Provider name, for logs
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: VoiceProvider + ?Sized> VoiceProvider for Arc<T> {
    async fn speak(
        &self,
        text: &str,
        options: &SpeakOptions,
    ) -> Result<Option<AudioClip>, VoiceError> {
        (**self).speak(text, options).await
    }

    fn stop(&self) {
        (**self).stop();
    }

    async fn voices(&self) -> Result<Vec<VoiceInfo>, VoiceError> {
        (**self).voices().await
    }

    fn set_voice(&self, voice_id: &str) -> Result<(), VoiceError> {
        (**self).set_voice(voice_id)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Logging wrapper for voice providers
pub struct LoggingVoice {
    inner: Arc<dyn VoiceProvider>,
}

impl LoggingVoice {
    pub fn new(inner: Arc<dyn VoiceProvider>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl VoiceProvider for LoggingVoice {
    async fn speak(
        &self,
        text: &str,
        options: &SpeakOptions,
    ) -> Result<Option<AudioClip>, VoiceError> {
        let start = std::time::Instant::now();
        let result = self.inner.speak(text, options).await;
        let duration = start.elapsed();

        match &result {
            Ok(clip) => {
                tracing::debug!(
                    provider = %self.inner.name(),
                    duration_ms = %duration.as_millis(),
                    chars = text.len(),
                    audio_bytes = clip.as_ref().map_or(0, |c| c.data.len()),
                    "Speech synthesized"
                );
            }
            Err(e) => {
                tracing::warn!(
                    provider = %self.inner.name(),
                    duration_ms = %duration.as_millis(),
                    error = %e,
                    "Speech synthesis failed"
                );
            }
        }

        result
    }

    fn stop(&self) {
        self.inner.stop();
    }

    async fn voices(&self) -> Result<Vec<VoiceInfo>, VoiceError> {
        self.inner.voices().await
    }

    fn set_voice(&self, voice_id: &str) -> Result<(), VoiceError> {
        tracing::info!(provider = %self.inner.name(), voice_id, "Voice selected");
        self.inner.set_voice(voice_id)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Build the named provider, failing if it is unknown or not configured
pub fn build_provider(
    name: &str,
    premium: &PremiumVoiceConfig,
) -> Result<Arc<dyn VoiceProvider>, VoiceError> {
    let provider: Arc<dyn VoiceProvider> = match name {
        SilentVoice::NAME => Arc::new(SilentVoice::new()),
        PremiumVoice::NAME => Arc::new(PremiumVoice::new(premium.clone())?),
        other => return Err(VoiceError::Unsupported(other.to_string())),
    };
    Ok(Arc::new(LoggingVoice::new(provider)))
}
