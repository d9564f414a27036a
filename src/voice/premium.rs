//! Premium text-to-speech over HTTP (ElevenLabs-compatible API)

use super::{AudioClip, SpeakOptions, VoiceError, VoiceInfo, VoiceProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io/v1";
const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
const DEFAULT_MODEL: &str = "eleven_turbo_v2";
const AUDIO_MEDIA_TYPE: &str = "audio/mpeg";

/// Connection settings for the premium voice API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PremiumVoiceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub voice_id: String,
    pub model: String,
}

impl Default for PremiumVoiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            voice_id: DEFAULT_VOICE_ID.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl PremiumVoiceConfig {
    /// Read settings through `lookup`, keeping defaults for anything unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: lookup("VOICE_API_URL").unwrap_or(defaults.base_url),
            api_key: lookup("VOICE_API_KEY").filter(|k| !k.is_empty()),
            voice_id: lookup("VOICE_ID").unwrap_or(defaults.voice_id),
            model: lookup("VOICE_MODEL").unwrap_or(defaults.model),
        }
    }
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    speed: f32,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    voices: Vec<ApiVoice>,
}

#[derive(Debug, Deserialize)]
struct ApiVoice {
    voice_id: String,
    name: String,
}

/// Premium voice provider
pub struct PremiumVoice {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    voice_id: RwLock<String>,
    /// Ids from the last `voices()` listing; empty until one succeeds
    known_voices: RwLock<Vec<String>>,
}

impl PremiumVoice {
    pub const NAME: &'static str = "premium";

    pub fn new(config: PremiumVoiceConfig) -> Result<Self, VoiceError> {
        let api_key = config
            .api_key
            .ok_or_else(|| VoiceError::Unavailable("VOICE_API_KEY is not set".to_string()))?;

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model,
            voice_id: RwLock::new(config.voice_id),
            known_voices: RwLock::new(Vec::new()),
        })
    }

    fn current_voice(&self) -> String {
        self.voice_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn synthesis_url(&self) -> String {
        format!("{}/text-to-speech/{}", self.base_url, self.current_voice())
    }

    fn synthesis_request<'a>(&'a self, text: &'a str, options: &SpeakOptions) -> SynthesisRequest<'a> {
        SynthesisRequest {
            text,
            model_id: &self.model,
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
                speed: options.rate,
            },
        }
    }
}

/// Turn a non-success response into an API error carrying the body text
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, VoiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(VoiceError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl VoiceProvider for PremiumVoice {
    async fn speak(
        &self,
        text: &str,
        options: &SpeakOptions,
    ) -> Result<Option<AudioClip>, VoiceError> {
        let response = self
            .client
            .post(self.synthesis_url())
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, AUDIO_MEDIA_TYPE)
            .json(&self.synthesis_request(text, options))
            .send()
            .await?;

        let data = check_status(response).await?.bytes().await?;
        Ok(Some(AudioClip {
            media_type: AUDIO_MEDIA_TYPE.to_string(),
            data: data.to_vec(),
        }))
    }

    fn stop(&self) {
        // Nothing plays server-side; in-flight requests are dropped by the caller
        tracing::debug!("Premium voice stop requested");
    }

    async fn voices(&self) -> Result<Vec<VoiceInfo>, VoiceError> {
        let response = self
            .client
            .get(format!("{}/voices", self.base_url))
            .header("xi-api-key", &self.api_key)
            .send()
            .await?;

        let body: VoicesResponse = check_status(response).await?.json().await?;
        let voices: Vec<VoiceInfo> = body
            .voices
            .into_iter()
            .map(|v| VoiceInfo {
                id: v.voice_id,
                name: v.name,
            })
            .collect();

        *self
            .known_voices
            .write()
            .unwrap_or_else(PoisonError::into_inner) = voices.iter().map(|v| v.id.clone()).collect();
        Ok(voices)
    }

    /// Checked against the last listing; before any listing every
    /// non-empty id is accepted and the API rejects bad ones at synthesis
    fn set_voice(&self, voice_id: &str) -> Result<(), VoiceError> {
        let voice_id = voice_id.trim();
        let rejected = {
            let known = self
                .known_voices
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            voice_id.is_empty() || (!known.is_empty() && !known.iter().any(|id| id == voice_id))
        };
        if rejected {
            return Err(VoiceError::UnknownVoice(voice_id.to_string()));
        }
        *self
            .voice_id
            .write()
            .unwrap_or_else(PoisonError::into_inner) = voice_id.to_string();
        Ok(())
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}
