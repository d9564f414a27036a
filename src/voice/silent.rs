//! Text-only provider: logs what would be said, plays nothing

use super::{AudioClip, SpeakOptions, VoiceError, VoiceInfo, VoiceProvider};
use async_trait::async_trait;

const TEXT_ONLY_VOICE: &str = "text-only";

#[derive(Debug, Default)]
pub struct SilentVoice;

impl SilentVoice {
    pub const NAME: &'static str = "silent";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VoiceProvider for SilentVoice {
    async fn speak(
        &self,
        text: &str,
        _options: &SpeakOptions,
    ) -> Result<Option<AudioClip>, VoiceError> {
        tracing::info!(text, "Agent says");
        Ok(None)
    }

    fn stop(&self) {}

    async fn voices(&self) -> Result<Vec<VoiceInfo>, VoiceError> {
        Ok(vec![VoiceInfo {
            id: TEXT_ONLY_VOICE.to_string(),
            name: "Text only".to_string(),
        }])
    }

    fn set_voice(&self, voice_id: &str) -> Result<(), VoiceError> {
        if voice_id == TEXT_ONLY_VOICE {
            Ok(())
        } else {
            Err(VoiceError::UnknownVoice(voice_id.to_string()))
        }
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}
