//! Drivers connecting runtimes and issuers to a [`LocalBroker`].
//!
//! The runtime is Sans-IO; [`SimClient`] is the loop around it. It pulls
//! deliveries from the broker inbox, feeds them to
//! [`ClientRuntime::handle`], and executes the resulting actions. Rejected
//! inbound messages are logged and skipped so one hostile publisher cannot
//! stop a listener; store failures stop the pump.

use std::sync::Arc;

use e4_client::{
    ClientAction, ClientError, ClientEvent, ClientRuntime, ClientTarget, CommandIssuer, KeyStore,
    ProtectedCommand, Transport,
};
use e4_proto::{Command, CommandTag};

use crate::{
    SimEnv,
    broker::{BrokerClient, Delivery, LocalBroker},
};

/// Outcome of one [`SimClient::pump`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PumpReport {
    /// Commands applied, in arrival order
    pub applied: Vec<CommandTag>,
    /// Decrypted application messages as `(topic, plaintext)`
    pub delivered: Vec<(String, Vec<u8>)>,
    /// Inbound messages rejected and skipped
    pub rejected: usize,
}

/// Client runtime attached to a broker connection.
pub struct SimClient<S: KeyStore> {
    runtime: Arc<ClientRuntime<S, SimEnv>>,
    connection: BrokerClient,
}

impl<S: KeyStore> SimClient<S> {
    /// Connect `runtime` to `broker` and subscribe to its control topic.
    pub fn connect(
        runtime: Arc<ClientRuntime<S, SimEnv>>,
        broker: &LocalBroker,
    ) -> Result<Self, ClientError> {
        let connection = broker.connect();
        connection.subscribe(runtime.control_topic_path())?;

        tracing::debug!(
            client = %runtime.client_id(),
            control_topic = runtime.control_topic_path(),
            "client connected"
        );
        Ok(Self { runtime, connection })
    }

    /// The wrapped runtime.
    pub fn runtime(&self) -> &Arc<ClientRuntime<S, SimEnv>> {
        &self.runtime
    }

    /// The broker connection.
    pub fn connection(&self) -> &BrokerClient {
        &self.connection
    }

    /// Subscribe to an application topic.
    pub fn subscribe(&self, topic: &str) -> Result<(), ClientError> {
        Ok(self.connection.subscribe(topic)?)
    }

    /// Protect `plaintext` with the topic key and publish it.
    pub fn publish(&self, topic: &str, plaintext: &[u8]) -> Result<(), ClientError> {
        let event =
            ClientEvent::PublishMessage { topic: topic.to_string(), plaintext: plaintext.to_vec() };
        let actions = self.runtime.handle(event)?;
        self.execute(actions, &mut PumpReport::default())
    }

    /// Process every message currently in the inbox.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error (see [`ClientError::is_fatal`]). Messages
    /// after it stay queued.
    pub fn pump(&self) -> Result<PumpReport, ClientError> {
        let mut report = PumpReport::default();

        while let Some(Delivery { topic, payload }) = self.connection.poll() {
            let event = ClientEvent::MessageReceived { topic: topic.clone(), payload };

            match self.runtime.handle(event) {
                Ok(actions) => self.execute(actions, &mut report)?,
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    tracing::debug!(
                        client = %self.runtime.client_id(),
                        topic = %topic,
                        error = %error,
                        "skipping rejected message"
                    );
                    report.rejected += 1;
                },
            }
        }

        Ok(report)
    }

    fn execute(
        &self,
        actions: Vec<ClientAction>,
        report: &mut PumpReport,
    ) -> Result<(), ClientError> {
        for action in actions {
            match action {
                ClientAction::Publish { topic, payload } => {
                    self.connection.publish(&topic, &payload)?;
                },
                ClientAction::DeliverMessage { topic, plaintext } => {
                    report.delivered.push((topic, plaintext));
                },
                ClientAction::CommandApplied { command } => report.applied.push(command),
            }
        }
        Ok(())
    }
}

/// Administrator attached to a broker connection.
pub struct SimAdmin {
    issuer: CommandIssuer<SimEnv>,
    connection: BrokerClient,
}

impl SimAdmin {
    /// Administrator with a fresh X25519 keypair drawn from `env`.
    pub fn connect(env: SimEnv, broker: &LocalBroker) -> Self {
        Self::with_issuer(CommandIssuer::generate(env), broker)
    }

    /// Administrator using an existing issuer.
    pub fn with_issuer(issuer: CommandIssuer<SimEnv>, broker: &LocalBroker) -> Self {
        Self { issuer, connection: broker.connect() }
    }

    /// The underlying issuer.
    pub fn issuer(&self) -> &CommandIssuer<SimEnv> {
        &self.issuer
    }

    /// Protect `command` for `target` and publish it on the target's control
    /// topic.
    pub fn send(
        &self,
        command: &Command,
        target: &ClientTarget,
    ) -> Result<ProtectedCommand, ClientError> {
        let protected = self.issuer.protect(command, target)?;
        self.connection.publish(&protected.topic, &protected.payload)?;
        Ok(protected)
    }
}
