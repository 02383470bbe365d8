use async_trait::async_trait;
use lapin::options::QueueDeclareOptions;
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties};
use std::time::Duration;

use super::{scoped, within, Backend, Probe, ProbeError};
use crate::configuration::{BrokerSettings, DEFAULT_PROBE_TIMEOUT};
use crate::models::BackendKind;

/// Queue declared as the broker's functional check.
pub const TEST_QUEUE: &str = "test_queue";

const REPLY_SUCCESS: u16 = 200;

/// Run lapin's tasks and sockets on the caller's tokio runtime.
fn connection_properties() -> ConnectionProperties {
    ConnectionProperties::default()
        .with_executor(tokio_executor_trait::Tokio::current())
        .with_reactor(tokio_reactor_trait::Tokio)
}

/// Opens a connection and a channel, then declares a queue. Declaring an
/// existing queue with the same durability is a no-op on the broker side; a
/// durability mismatch is rejected by the broker and reported as a check failure.
pub struct BrokerProbe {
    settings: BrokerSettings,
    queue: String,
    durable: bool,
    timeout: Duration,
}

pub struct BrokerSession {
    connection: Connection,
    channel: Channel,
}

impl BrokerProbe {
    pub fn new(settings: BrokerSettings) -> Self {
        Self {
            settings,
            queue: TEST_QUEUE.to_string(),
            durable: true,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_queue(mut self, queue: impl Into<String>, durable: bool) -> Self {
        self.queue = queue.into();
        self.durable = durable;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn close_connection(&self, connection: &Connection) {
        if !connection.status().connected() {
            return;
        }
        match tokio::time::timeout(self.timeout, connection.close(REPLY_SUCCESS, "OK")).await {
            Ok(Ok(())) => tracing::debug!("RabbitMQ connection closed"),
            Ok(Err(err)) => tracing::warn!("Closing RabbitMQ connection: {:?}", err),
            Err(_) => tracing::warn!("Closing RabbitMQ connection timed out"),
        }
    }
}

#[async_trait]
impl Backend for BrokerProbe {
    type Session = BrokerSession;

    #[tracing::instrument(name = "Connect to RabbitMQ", skip(self), fields(address = %self.settings.address()))]
    async fn connect(&self) -> Result<BrokerSession, ProbeError> {
        let uri = self.settings.connection_string()?;

        let connection = within(
            self.timeout,
            async {
                Connection::connect(&uri, connection_properties())
                    .await
                    .map_err(|err| ProbeError::ConnectFailure(err.to_string()))
            },
            ProbeError::ConnectFailure,
        )
        .await?;

        let channel = within(
            self.timeout,
            async {
                connection.create_channel().await.map_err(|err| {
                    ProbeError::ConnectFailure(format!("creating RabbitMQ channel {}", err))
                })
            },
            ProbeError::ConnectFailure,
        )
        .await;

        match channel {
            Ok(channel) => Ok(BrokerSession {
                connection,
                channel,
            }),
            Err(err) => {
                self.close_connection(&connection).await;
                Err(err)
            }
        }
    }

    #[tracing::instrument(name = "Declare RabbitMQ queue", skip(self, session), fields(queue = %self.queue, durable = self.durable))]
    async fn check(&self, session: &mut BrokerSession) -> Result<String, ProbeError> {
        let queue = within(
            self.timeout,
            async {
                session
                    .channel
                    .queue_declare(
                        &self.queue,
                        QueueDeclareOptions {
                            durable: self.durable,
                            ..QueueDeclareOptions::default()
                        },
                        FieldTable::default(),
                    )
                    .await
                    .map_err(|err| ProbeError::CheckFailure(err.to_string()))
            },
            ProbeError::CheckFailure,
        )
        .await?;

        Ok(format!(
            "queue {} declared ({} messages, {} consumers)",
            queue.name().as_str(),
            queue.message_count(),
            queue.consumer_count()
        ))
    }

    async fn release(&self, session: BrokerSession) {
        // A rejected declare leaves the channel closed by the broker already.
        if session.channel.status().connected() {
            match tokio::time::timeout(
                self.timeout,
                session.channel.close(REPLY_SUCCESS, "OK"),
            )
            .await
            {
                Ok(Ok(())) => tracing::debug!("RabbitMQ channel closed"),
                Ok(Err(err)) => tracing::warn!("Closing RabbitMQ channel: {:?}", err),
                Err(_) => tracing::warn!("Closing RabbitMQ channel timed out"),
            }
        }
        self.close_connection(&session.connection).await;
    }
}

#[async_trait]
impl Probe for BrokerProbe {
    fn kind(&self) -> BackendKind {
        BackendKind::Broker
    }

    fn target(&self) -> String {
        self.settings.address()
    }

    async fn execute(&self) -> Result<String, ProbeError> {
        scoped(self).await
    }
}
