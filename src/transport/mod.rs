//! Connection to the model backend
//!
//! The session only talks to the backend through the [`Transport`] trait.
//! [`NatsTransport`] is the bundled adapter: it relays JSON messages over NATS
//! to a bridge process that holds the actual backend connection.

pub mod messages;
mod nats;

use anyhow::Result;
use tokio::sync::mpsc;

pub use messages::{
    ClientMessage, Content, FunctionCall, FunctionResponse, InlineData, Part, ServerContent,
    ServerMessage, SetupMessage, ToolCall, ToolResponse,
};
pub use nats::NatsTransport;

/// Event received from the backend, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Raw PCM audio produced by the model
    Audio(Vec<u8>),
    /// Model output carrying text parts
    Content(ServerContent),
    /// The model stopped because the user started speaking
    Interrupted,
    /// The model finished its turn
    TurnComplete,
    /// The model asks the client to run one or more tools
    ToolCall(ToolCall),
}

/// Everything a transport needs to open a backend session
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub session_id: String,
    pub endpoint: String,
    pub api_key: String,
    /// Sample rate of the PCM sent with `send_audio`
    pub capture_sample_rate: u32,
    pub setup: SetupMessage,
}

/// Wire connection to the model backend.
///
/// All methods take `&self` so capture tasks can send through a shared
/// `Arc<dyn Transport>` while the session keeps driving the connection.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Open the connection and send the setup message.
    ///
    /// Returns a channel receiver that yields backend events until the
    /// connection closes.
    async fn connect(&self, params: &ConnectParams) -> Result<mpsc::Receiver<TransportEvent>>;

    async fn disconnect(&self) -> Result<()>;

    async fn send_text(&self, text: &str) -> Result<()>;

    /// Send one buffer of 16-bit little-endian PCM
    async fn send_audio(&self, pcm: &[u8]) -> Result<()>;

    /// Send one base64-encoded JPEG frame
    async fn send_image(&self, jpeg_base64: &str) -> Result<()>;

    async fn send_tool_response(&self, response: &ToolResponse) -> Result<()>;

    /// Transport name for logging
    fn name(&self) -> &str;
}
