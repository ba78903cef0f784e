use anyhow::{Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::TransportEvent;
use crate::config::Config;

// ============================================================================
// Shared content types
// ============================================================================

/// Base64 media payload with its MIME type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default)]
    pub parts: Vec<Part>,
}

// ============================================================================
// Client → backend
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub response_modalities: Vec<String>,
}

/// First message of every connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupMessage {
    pub model: String,
    pub generation_config: GenerationSettings,
    pub system_instruction: Content,
    pub tools: Vec<Value>,

    /// Read and stripped by the bridge before forwarding to the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl SetupMessage {
    /// Build the setup for `config`, merging client-side function
    /// declarations into a single `functionDeclarations` tool group.
    pub fn from_config(config: &Config, function_declarations: Vec<Value>) -> Self {
        let mut tools: Vec<Value> = config
            .backend
            .builtin_tools
            .iter()
            .map(|name| {
                let mut tool = Map::new();
                tool.insert(name.clone(), json!({}));
                Value::Object(tool)
            })
            .collect();

        if !function_declarations.is_empty() {
            tools.push(json!({ "functionDeclarations": function_declarations }));
        }

        Self {
            model: config.backend.model.clone(),
            generation_config: GenerationSettings {
                temperature: config.generation.temperature,
                top_p: config.generation.top_p,
                top_k: config.generation.top_k,
                response_modalities: config.generation.response_modalities.clone(),
            },
            system_instruction: Content {
                role: None,
                parts: vec![Part::text(config.assistant.system_instruction())],
            },
            tools,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<InlineData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub response: Value,
}

/// Answer to a tool call, correlated by id and name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub function_responses: Vec<FunctionResponse>,
}

/// Message published by the client. Serializes as `{"<variant>": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(SetupMessage),
    ClientContent(ClientContent),
    RealtimeInput(RealtimeInput),
    ToolResponse(ToolResponse),
}

impl ClientMessage {
    /// A complete user turn made of one text part
    pub fn text(text: &str) -> Self {
        ClientMessage::ClientContent(ClientContent {
            turns: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(text)],
            }],
            turn_complete: true,
        })
    }

    pub fn audio(pcm: &[u8], sample_rate: u32) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput {
            media_chunks: vec![InlineData {
                mime_type: format!("audio/pcm;rate={}", sample_rate),
                data: base64::engine::general_purpose::STANDARD.encode(pcm),
            }],
        })
    }

    pub fn image(jpeg_base64: &str) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput {
            media_chunks: vec![InlineData {
                mime_type: "image/jpeg".to_string(),
                data: jpeg_base64.to_string(),
            }],
        })
    }
}

// ============================================================================
// Backend → client
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_turn: Option<Content>,

    #[serde(default)]
    pub turn_complete: bool,

    #[serde(default)]
    pub interrupted: bool,
}

impl ServerContent {
    /// Content event made of plain text parts
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model_turn: Some(Content {
                role: Some("model".to_string()),
                parts: texts.into_iter().map(Part::text).collect(),
            }),
            ..Default::default()
        }
    }

    /// Non-empty text of every part that has some, in order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.model_turn
            .iter()
            .flat_map(|turn| turn.parts.iter())
            .filter_map(|part| part.text.as_deref())
            .filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_complete: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_content: Option<ServerContent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
}

impl ServerMessage {
    /// Split one backend message into session events.
    ///
    /// Audio parts become `Audio` events, the remaining parts one `Content`
    /// event; `Interrupted` and `TurnComplete` follow the content they
    /// arrived with.
    pub fn into_events(self) -> Result<Vec<TransportEvent>> {
        let mut events = Vec::new();

        if let Some(content) = self.server_content {
            if let Some(turn) = content.model_turn {
                let mut other_parts = Vec::new();

                for part in turn.parts {
                    match &part.inline_data {
                        Some(data) if data.mime_type.starts_with("audio/") => {
                            let pcm = base64::engine::general_purpose::STANDARD
                                .decode(&data.data)
                                .context("Failed to decode inline audio")?;
                            events.push(TransportEvent::Audio(pcm));
                        }
                        _ => other_parts.push(part),
                    }
                }

                if !other_parts.is_empty() {
                    events.push(TransportEvent::Content(ServerContent {
                        model_turn: Some(Content {
                            role: turn.role,
                            parts: other_parts,
                        }),
                        turn_complete: false,
                        interrupted: false,
                    }));
                }
            }

            if content.interrupted {
                events.push(TransportEvent::Interrupted);
            }
            if content.turn_complete {
                events.push(TransportEvent::TurnComplete);
            }
        }

        if let Some(call) = self.tool_call {
            events.push(TransportEvent::ToolCall(call));
        }

        Ok(events)
    }
}
