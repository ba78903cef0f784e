use anyhow::{bail, Context, Result};
use async_nats::Client;
use futures::stream::StreamExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::messages::{ClientMessage, ServerMessage, ToolResponse};
use super::{ConnectParams, Transport, TransportEvent};

/// An open bridge connection
struct Link {
    client: Client,
    session_id: String,
    outbound_subject: String,
    capture_sample_rate: u32,
    receiver_task: JoinHandle<()>,
}

/// Relays the session to the model backend through a NATS bridge.
///
/// Client messages are published on `{prefix}.{session_id}.client`;
/// backend messages are read from `{prefix}.{session_id}.server`.
pub struct NatsTransport {
    subject_prefix: String,
    link: Mutex<Option<Link>>,
}

impl NatsTransport {
    pub fn new(subject_prefix: impl Into<String>) -> Self {
        Self {
            subject_prefix: subject_prefix.into(),
            link: Mutex::new(None),
        }
    }

    fn subject(&self, session_id: &str, direction: &str) -> String {
        format!("{}.{}.{}", self.subject_prefix, session_id, direction)
    }

    async fn publish(&self, message: &ClientMessage) -> Result<()> {
        let (client, subject) = {
            let link = self.link.lock().await;
            match link.as_ref() {
                Some(link) => (link.client.clone(), link.outbound_subject.clone()),
                None => bail!("NATS transport is not connected"),
            }
        };

        let payload = serde_json::to_vec(message)?;

        client
            .publish(subject, payload.into())
            .await
            .context("Failed to publish client message")?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl Transport for NatsTransport {
    async fn connect(&self, params: &ConnectParams) -> Result<mpsc::Receiver<TransportEvent>> {
        let mut link = self.link.lock().await;
        if link.is_some() {
            bail!("NATS transport is already connected");
        }

        info!("Connecting to NATS at {}", params.endpoint);

        let client = async_nats::connect(params.endpoint.as_str())
            .await
            .context("Failed to connect to NATS")?;

        let inbound_subject = self.subject(&params.session_id, "server");
        let mut subscriber = client
            .subscribe(inbound_subject.clone())
            .await
            .context("Failed to subscribe to backend messages")?;

        info!("Subscribed to {}", inbound_subject);

        let (tx, rx) = mpsc::channel(100);
        let session_id = params.session_id.clone();

        let receiver_task = tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                let message = match serde_json::from_slice::<ServerMessage>(&msg.payload) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!("Failed to parse backend message: {}", e);
                        continue;
                    }
                };

                if message.setup_complete.is_some() {
                    info!("Backend setup complete for session {}", session_id);
                }

                match message.into_events() {
                    Ok(events) => {
                        for event in events {
                            if tx.send(event).await.is_err() {
                                debug!("Event receiver dropped, stopping NATS reader");
                                return;
                            }
                        }
                    }
                    Err(e) => error!("Failed to decode backend message: {:#}", e),
                }
            }

            info!("NATS subscription for session {} ended", session_id);
        });

        *link = Some(Link {
            client,
            session_id: params.session_id.clone(),
            outbound_subject: self.subject(&params.session_id, "client"),
            capture_sample_rate: params.capture_sample_rate,
            receiver_task,
        });
        drop(link);

        let mut setup = params.setup.clone();
        setup.api_key = Some(params.api_key.clone());
        if let Err(e) = self.publish(&ClientMessage::Setup(setup)).await {
            if let Err(close_err) = self.disconnect().await {
                warn!("Failed to close NATS link after setup error: {:#}", close_err);
            }
            return Err(e.context("Failed to send setup message"));
        }

        info!("Connected session {} through NATS", params.session_id);

        Ok(rx)
    }

    async fn disconnect(&self) -> Result<()> {
        let Some(link) = self.link.lock().await.take() else {
            return Ok(());
        };

        info!("Closing NATS link for session {}", link.session_id);

        link.receiver_task.abort();
        link.client
            .flush()
            .await
            .context("Failed to flush NATS connection")?;

        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        self.publish(&ClientMessage::text(text)).await
    }

    async fn send_audio(&self, pcm: &[u8]) -> Result<()> {
        let sample_rate = match self.link.lock().await.as_ref() {
            Some(link) => link.capture_sample_rate,
            None => bail!("NATS transport is not connected"),
        };
        self.publish(&ClientMessage::audio(pcm, sample_rate)).await
    }

    async fn send_image(&self, jpeg_base64: &str) -> Result<()> {
        self.publish(&ClientMessage::image(jpeg_base64)).await
    }

    async fn send_tool_response(&self, response: &ToolResponse) -> Result<()> {
        self.publish(&ClientMessage::ToolResponse(response.clone())).await
    }

    fn name(&self) -> &str {
        "NATS bridge"
    }
}
