use async_nats::{Client, ConnectErrorKind, ConnectOptions, Subscriber};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, StreamError};

/// Thin JSON-over-NATS wrapper shared by the control listener and the voice
/// gateway adapters
#[derive(Clone)]
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    /// Connect to NATS server
    ///
    /// A rejected token maps to `AuthenticationFailure`.
    pub async fn connect(url: &str, token: Option<&str>) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let options = match token {
            Some(token) => ConnectOptions::with_token(token.to_string()),
            None => ConnectOptions::new(),
        };

        let client = options.connect(url).await.map_err(|e| match e.kind() {
            ConnectErrorKind::Authentication | ConnectErrorKind::AuthorizationViolation => {
                StreamError::AuthenticationFailure(e.to_string())
            }
            _ => StreamError::Transport(format!("failed to connect to NATS: {}", e)),
        })?;

        info!("Connected to NATS successfully");

        Ok(Self { client })
    }

    /// Publish a JSON message
    pub async fn publish_json<T: Serialize>(&self, subject: String, message: &T) -> Result<()> {
        let payload = serde_json::to_vec(message)
            .map_err(|e| StreamError::Transport(format!("failed to encode message: {}", e)))?;

        self.client
            .publish(subject, payload.into())
            .await
            .map_err(|e| StreamError::Transport(format!("failed to publish: {}", e)))
    }

    /// Send a JSON request and decode the JSON response
    pub async fn request_json<Req, Resp>(&self, subject: String, request: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(request)
            .map_err(|e| StreamError::Transport(format!("failed to encode request: {}", e)))?;

        debug!("Request on {}", subject);
        let response = self
            .client
            .request(subject.clone(), payload.into())
            .await
            .map_err(|e| StreamError::Transport(format!("request on {} failed: {}", subject, e)))?;

        serde_json::from_slice(&response.payload)
            .map_err(|e| StreamError::Transport(format!("bad response on {}: {}", subject, e)))
    }

    /// Subscribe to a subject
    pub async fn subscribe(&self, subject: String) -> Result<Subscriber> {
        info!("Subscribing to {}", subject);

        self.client
            .subscribe(subject.clone())
            .await
            .map_err(|e| StreamError::Transport(format!("failed to subscribe to {}: {}", subject, e)))
    }
}
