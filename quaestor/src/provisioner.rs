//! Provides the [`ChannelProvisioner`], which turns [`ConnectionParameters`] into a tonic
//! [`Channel`] to the discovery backend.

use crate::{ChannelProvider, ConnectionParameters, DiscoveryError};
use tokio::time::Duration;
use tonic::transport::{Channel, Endpoint};

/// How long the provisioner waits for an encrypted channel to become ready.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(5);

/// The provisioner's verdict on a channel it handed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Plaintext channels connect on first use and are not checked.
    NotChecked,
    /// The encrypted channel connected and completed its handshake in time.
    Ready,
    /// The encrypted channel could not be verified within the readiness timeout.
    /// It is still usable in principle, calls on it will retry the connection.
    Unverified { reason: String },
}

/// A [`Channel`] together with the [`Readiness`] established while provisioning it.
#[derive(Debug, Clone)]
pub struct ProvisionedChannel {
    channel: Channel,
    readiness: Readiness,
}

impl ProvisionedChannel {
    pub fn new(channel: Channel, readiness: Readiness) -> Self {
        Self { channel, readiness }
    }

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    /// `true` only for an encrypted channel that was verified ready.
    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn into_inner(self) -> Channel {
        self.channel
    }
}

impl From<ProvisionedChannel> for Channel {
    fn from(provisioned: ProvisionedChannel) -> Self {
        provisioned.channel
    }
}

/// Creates plaintext or encrypted channels to the discovery backend.
///
/// Without credentials the channel connects lazily on first use. With credentials the
/// provisioner waits up to the readiness timeout for the connection and TLS handshake.
/// A failed wait is logged and reported as [`Readiness::Unverified`], it does not fail
/// provisioning.
///
/// ```rust
/// #[tokio::main]
/// async fn main() {
///     use quaestor::{ChannelProvisioner, ConnectionParameters, Readiness};
///
///     let connection = ConnectionParameters::from_parts("localhost", 5150).unwrap();
///     let provisioned = ChannelProvisioner::new()
///         .provision(&connection)
///         .await
///         .expect("failed to provision channel");
///
///     assert_eq!(provisioned.readiness(), &Readiness::NotChecked);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ChannelProvisioner {
    readiness_timeout: Duration,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl Default for ChannelProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelProvisioner {
    pub fn new() -> Self {
        Self {
            readiness_timeout: DEFAULT_READINESS_TIMEOUT,
            timeout: None,
            connect_timeout: None,
        }
    }

    /// Set how long to wait for an encrypted channel to become ready.
    /// Default is 5 seconds.
    pub fn readiness_timeout(self, readiness_timeout: Duration) -> Self {
        Self {
            readiness_timeout,
            ..self
        }
    }

    /// Set a request timeout that will be applied to every call on the channel.
    pub fn timeout(self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self
        }
    }

    /// Set a connection timeout for the channel.
    ///
    /// Defaults to the overall request `timeout` if not set.
    pub fn connect_timeout(self, connect_timeout: Duration) -> Self {
        Self {
            connect_timeout: Some(connect_timeout),
            ..self
        }
    }

    /// Create a channel to the backend described by `connection`.
    ///
    /// Only fails if the endpoint itself cannot be constructed.
    #[tracing::instrument(level = "debug", skip(self, connection), fields(address = %connection.address()))]
    pub async fn provision(
        &self,
        connection: &ConnectionParameters,
    ) -> Result<ProvisionedChannel, DiscoveryError> {
        let endpoint = self.endpoint(connection)?;

        if connection.credentials().is_none() {
            tracing::debug!("creating plaintext channel");
            return Ok(ProvisionedChannel::new(
                endpoint.connect_lazy(),
                Readiness::NotChecked,
            ));
        }

        let reason = match tokio::time::timeout(self.readiness_timeout, endpoint.connect()).await {
            Ok(Ok(channel)) => {
                tracing::info!(
                    "successfully established secure channel to {}",
                    connection.host_name()
                );
                return Ok(ProvisionedChannel::new(channel, Readiness::Ready));
            }
            Ok(Err(err)) => format!("{:#}", anyhow::Error::from(err)),
            Err(_) => format!("timed out after {:?}", self.readiness_timeout),
        };

        tracing::error!(
            reason = %reason,
            "failed to establish secure channel to {}",
            connection.host_name()
        );

        Ok(ProvisionedChannel::new(
            endpoint.connect_lazy(),
            Readiness::Unverified { reason },
        ))
    }

    fn endpoint(&self, connection: &ConnectionParameters) -> Result<Endpoint, DiscoveryError> {
        let channel_error = |source: tonic::transport::Error| DiscoveryError::Channel {
            address: connection.address(),
            source,
        };

        let mut endpoint = Endpoint::from_shared(connection.uri()).map_err(channel_error)?;

        if let Some(timeout) = self.timeout {
            endpoint = endpoint.timeout(timeout);
        }

        if let Some(connect_timeout) = self.connect_timeout.or(self.timeout) {
            endpoint = endpoint.connect_timeout(connect_timeout);
        }

        if let Some(credentials) = connection.credentials() {
            endpoint = endpoint
                .tls_config(credentials.tls_config())
                .map_err(channel_error)?;
        }

        Ok(endpoint)
    }
}

#[async_trait::async_trait]
impl ChannelProvider for ChannelProvisioner {
    async fn provide_channel(
        &self,
        connection: &ConnectionParameters,
    ) -> Result<ProvisionedChannel, DiscoveryError> {
        self.provision(connection).await
    }
}
