use futures::stream::StreamExt;
use tracing::{info, warn};

use super::client::NatsClient;
use super::messages::{ControlMessage, ControlReply};
use crate::control::CommandRouter;
use crate::error::Result;

/// Receives operator commands on the control subject and publishes replies
pub struct ControlListener {
    client: NatsClient,
    subject: String,
    router: CommandRouter,
}

impl ControlListener {
    pub fn new(client: NatsClient, subject: impl Into<String>, router: CommandRouter) -> Self {
        Self {
            client,
            subject: subject.into(),
            router,
        }
    }

    /// Serve commands until the subscription ends
    pub async fn run(self) -> Result<()> {
        let mut messages = self.client.subscribe(self.subject.clone()).await?;
        info!("Control listener ready on {}", self.subject);

        while let Some(msg) = messages.next().await {
            let command = match serde_json::from_slice::<ControlMessage>(&msg.payload) {
                Ok(command) => command,
                Err(e) => {
                    warn!("Failed to parse control message: {}", e);
                    continue;
                }
            };

            let Some(text) = self.router.handle(&command.author, &command.text).await else {
                continue;
            };

            match msg.reply {
                Some(reply) => {
                    if let Err(e) = self
                        .client
                        .publish_json(reply.to_string(), &ControlReply { text })
                        .await
                    {
                        warn!("Failed to send control reply: {}", e);
                    }
                }
                None => warn!("Control message had no reply subject; reply dropped"),
            }
        }

        info!("Control subscription closed");
        Ok(())
    }
}
