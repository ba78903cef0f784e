use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variables prefixed with this override file values,
/// e.g. `LOQA_LIVE__BACKEND__API_KEY`.
pub const ENV_PREFIX: &str = "LOQA_LIVE";

const BASE_PROMPT: &str = "You are a proactive assistant that listens to the user's ongoing \
conversation. When you notice a topic you can help with, or an implicit need for information, \
offer short and useful content, search results or tool output. Be helpful without being \
intrusive and try to anticipate what the user needs.";

const WHISPERER_CUES: &str = "Only answer when you hear one of these verbal cues: \
\"Let me check\", \"Let me see\", \"What about\", \"Would it help\". When you hear a cue, run \
the lookup or tool right away and show the result without asking for confirmation. \
Respond with <silent> when you think no action is needed.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    pub generation: GenerationConfig,
    pub audio: AudioConfig,
    pub capture: CaptureConfig,
    pub assistant: AssistantConfig,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "loqa-live".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "127.0.0.1".to_string(),
            port: 3031,
        }
    }
}

/// Where the model backend lives and how to authenticate against it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// NATS server bridging to the model backend
    pub endpoint: String,

    /// Backend credential; may come from the environment only
    pub api_key: Option<String>,

    pub model: String,

    /// Subjects are `{subject_prefix}.{session_id}.client|server`
    pub subject_prefix: String,

    /// Tools executed by the backend itself (e.g. "googleSearch")
    pub builtin_tools: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "nats://localhost:4222".to_string(),
            api_key: None,
            model: "models/gemini-2.0-flash-live-001".to_string(),
            subject_prefix: "live".to_string(),
            builtin_tools: vec!["googleSearch".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub response_modalities: Vec<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.8,
            top_p: 0.95,
            top_k: 65,
            response_modalities: vec!["TEXT".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Playback rate of audio produced by the model
    pub sample_rate: u32,

    /// Rate of microphone PCM sent to the model
    pub capture_sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 27000,
            capture_sample_rate: 16000,
        }
    }
}

/// Camera and screen frame capture settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub frames_per_second: u32,

    /// Frames are resized to this width before encoding
    pub resize_width: u32,

    /// JPEG quality (0.0 to 1.0)
    pub quality: f32,

    /// "user" or "environment"
    pub facing_mode: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frames_per_second: 5,
            resize_width: 640,
            quality: 0.4,
            facing_mode: "environment".to_string(),
        }
    }
}

impl CaptureConfig {
    /// Period between two captured frames (`1000 / fps` ms)
    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.frames_per_second.max(1)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantMode {
    /// Stays silent until a verbal cue is heard
    #[default]
    Whisperer,
    /// Regular conversational assistant
    Live,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub mode: AssistantMode,

    /// Replaces the prompt derived from `mode` when set
    pub system_instructions: Option<String>,
}

impl AssistantConfig {
    pub fn system_instruction(&self) -> String {
        if let Some(custom) = self.system_instructions.as_deref() {
            if !custom.trim().is_empty() {
                return custom.to_string();
            }
        }

        match self.mode {
            AssistantMode::Live => BASE_PROMPT.to_string(),
            AssistantMode::Whisperer => format!("{} {}", BASE_PROMPT, WHISPERER_CUES),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Fixed session id; a random one is generated when absent
    pub id: Option<String>,

    /// Text sent right after `initialize()` so the model speaks first
    pub kickoff_prompt: Option<String>,
}

impl Config {
    /// Load from a config file (any format the `config` crate knows) plus
    /// `LOQA_LIVE__*` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }
}

/// Supplies the configuration in effect at `connect()` time
pub trait ConfigSource: Send + Sync {
    fn current(&self) -> Result<Config>;
}

impl ConfigSource for Config {
    fn current(&self) -> Result<Config> {
        Ok(self.clone())
    }
}

/// Re-reads the config file on every connect so edited settings apply
/// without restarting.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: String,
}

impl FileConfigSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for FileConfigSource {
    fn current(&self) -> Result<Config> {
        Config::load(&self.path)
    }
}
