//! Provides the [`ServiceDiscovery`] client and its builder.

use crate::{
    ChannelCredentials, ChannelProvider, ChannelProvisioner, ConnectionParameters, DiscoveryError,
    DiscoveryQuery, Readiness, ServiceLocations,
};
use quaestor_proto::pb::service_discovery_grpc_client::ServiceDiscoveryGrpcClient;
use quaestor_proto::pb::DiscoverServicesRequest;
use std::{convert::TryInto, fmt};
use tokio::time::Duration;

/// The two ways of asking the backend for locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// `DiscoverServices`: any healthy instances, in no particular order.
    Unordered,
    /// `DiscoverTopServices`: instances ranked by their reported load, best first.
    Ranked,
}

impl DiscoveryMode {
    /// Name of the remote method.
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Unordered => "DiscoverServices",
            Self::Ranked => "DiscoverTopServices",
        }
    }
}

impl fmt::Display for DiscoveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// Queries the Quaestor discovery backend for the locations of a service.
///
/// Every call obtains its own channel from the [`ChannelProvider`], by default a fresh one
/// from the [`ChannelProvisioner`], and shares nothing with other calls.
///
/// ```rust,no_run
/// #[tokio::main]
/// async fn main() {
///     use quaestor::ServiceDiscovery;
///
///     let discovery = ServiceDiscovery::builder(("localhost", 5150), "QualityVerificationGrpc")
///         .scope("example_cluster")
///         .max_count(3)
///         .build()
///         .expect("invalid discovery configuration");
///
///     for location in discovery.discover_services().await.expect("discovery failed") {
///         println!("{} at {}", location.service_name(), location.authority());
///     }
/// }
/// ```
#[derive(Debug)]
pub struct ServiceDiscovery<P = ChannelProvisioner> {
    connection: ConnectionParameters,
    defaults: DiscoveryQuery,
    provider: P,
    require_ready: bool,
}

impl ServiceDiscovery {
    /// Start configuring a [`ServiceDiscovery`] for the backend at `connection` -  e.g.
    /// `("my.loadbalancer", 5150)` - looking for `service_name` by default.
    pub fn builder<S>(
        connection: S,
        service_name: impl Into<String>,
    ) -> ServiceDiscoveryBuilder<ChannelProvisioner, S>
    where
        S: TryInto<ConnectionParameters>,
        S::Error: Into<anyhow::Error>,
    {
        ServiceDiscoveryBuilder::new(connection, service_name)
    }
}

impl<P: ChannelProvider + Send + Sync> ServiceDiscovery<P> {
    /// The connection parameters used for every call.
    pub fn connection(&self) -> &ConnectionParameters {
        &self.connection
    }

    /// The query used by [`discover_services`](Self::discover_services) and
    /// [`discover_top_services`](Self::discover_top_services).
    pub fn default_query(&self) -> &DiscoveryQuery {
        &self.defaults
    }

    /// Provide the locations of the default service, in no particular order.
    pub async fn discover_services(&self) -> Result<ServiceLocations, DiscoveryError> {
        self.discover(DiscoveryMode::Unordered, &self.defaults).await
    }

    /// Provide the locations matching `query`, in no particular order.
    pub async fn discover_services_for(
        &self,
        query: &DiscoveryQuery,
    ) -> Result<ServiceLocations, DiscoveryError> {
        self.discover(DiscoveryMode::Unordered, query).await
    }

    /// Provide the best locations of the default service based on the load reports of the
    /// instances, best first.
    ///
    /// The order is the backend's ranking and is kept exactly as received.
    pub async fn discover_top_services(&self) -> Result<ServiceLocations, DiscoveryError> {
        self.discover(DiscoveryMode::Ranked, &self.defaults).await
    }

    /// Provide the best locations matching `query`, best first.
    pub async fn discover_top_services_for(
        &self,
        query: &DiscoveryQuery,
    ) -> Result<ServiceLocations, DiscoveryError> {
        self.discover(DiscoveryMode::Ranked, query).await
    }

    #[tracing::instrument(
        level = "debug",
        skip(self, query),
        fields(service_name = %query.service_name(), scope = %query.scope(), max_count = query.max_count())
    )]
    async fn discover(
        &self,
        mode: DiscoveryMode,
        query: &DiscoveryQuery,
    ) -> Result<ServiceLocations, DiscoveryError> {
        let provisioned = self.provider.provide_channel(&self.connection).await?;

        if let Readiness::Unverified { reason } = provisioned.readiness() {
            if self.require_ready {
                return Err(DiscoveryError::ChannelNotReady {
                    address: self.connection.address(),
                    reason: reason.clone(),
                });
            }
            tracing::warn!("calling {} over an unverified channel", mode);
        }

        let mut client = ServiceDiscoveryGrpcClient::new(provisioned.into_inner());
        let request = DiscoverServicesRequest::from(query);

        let response = match mode {
            DiscoveryMode::Unordered => client.discover_services(request).await,
            DiscoveryMode::Ranked => client.discover_top_services(request).await,
        }
        .map_err(|source| DiscoveryError::Rpc {
            method: mode,
            source,
        })?;

        let locations = ServiceLocations::decode(response.into_inner())?;
        tracing::debug!("{} returned {} location(s)", mode, locations.len());

        Ok(locations)
    }
}

/// Builder to configure and create a [`ServiceDiscovery`].
pub struct ServiceDiscoveryBuilder<P, S> {
    connection: S,
    service_name: String,
    scope: String,
    max_count: u32,
    credentials: Option<ChannelCredentials>,
    require_ready: bool,
    provider: P,
}

impl<S> ServiceDiscoveryBuilder<ChannelProvisioner, S>
where
    S: TryInto<ConnectionParameters>,
    S::Error: Into<anyhow::Error>,
{
    /// Set the backend `connection` and the `service_name` to look for.
    pub fn new(connection: S, service_name: impl Into<String>) -> Self {
        Self {
            connection,
            service_name: service_name.into(),
            scope: String::new(),
            max_count: 1,
            credentials: None,
            require_ready: false,
            provider: ChannelProvisioner::new(),
        }
    }

    /// Set how long to wait for an encrypted channel to become ready.
    /// Default is 5 seconds.
    pub fn readiness_timeout(self, readiness_timeout: Duration) -> Self {
        Self {
            provider: self.provider.readiness_timeout(readiness_timeout),
            ..self
        }
    }

    /// Set a request timeout for discovery calls. There is none by default.
    pub fn timeout(self, timeout: Duration) -> Self {
        Self {
            provider: self.provider.timeout(timeout),
            ..self
        }
    }

    /// Set a connection timeout for discovery calls.
    ///
    /// Defaults to the overall request `timeout` if not set.
    pub fn connect_timeout(self, connect_timeout: Duration) -> Self {
        Self {
            provider: self.provider.connect_timeout(connect_timeout),
            ..self
        }
    }

    /// Set a custom [`ChannelProvider`], e.g. one that pools channels.
    ///
    /// The timeouts configured on this builder only apply to the default provisioner.
    pub fn channel_provider<T: ChannelProvider + Send + Sync>(
        self,
        provider: T,
    ) -> ServiceDiscoveryBuilder<T, S> {
        ServiceDiscoveryBuilder {
            connection: self.connection,
            service_name: self.service_name,
            scope: self.scope,
            max_count: self.max_count,
            credentials: self.credentials,
            require_ready: self.require_ready,
            provider,
        }
    }
}

impl<P, S> ServiceDiscoveryBuilder<P, S>
where
    P: ChannelProvider + Send + Sync,
    S: TryInto<ConnectionParameters>,
    S::Error: Into<anyhow::Error>,
{
    /// Restrict discovery to instances registered under `scope`. Default is the empty scope.
    pub fn scope(self, scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            ..self
        }
    }

    /// Set the maximum number of locations to ask for. Default is 1.
    pub fn max_count(self, max_count: u32) -> Self {
        Self { max_count, ..self }
    }

    /// Configure the channel to use TLS.
    pub fn with_tls(self, credentials: impl Into<ChannelCredentials>) -> Self {
        Self {
            credentials: Some(credentials.into()),
            ..self
        }
    }

    /// Fail discovery calls with [`DiscoveryError::ChannelNotReady`] instead of sending
    /// them over an encrypted channel that could not be verified ready.
    ///
    /// Default is `false`: the call is attempted and fails or succeeds on its own.
    pub fn require_ready(self, require_ready: bool) -> Self {
        Self {
            require_ready,
            ..self
        }
    }

    /// Construct a [`ServiceDiscovery`] from the builder. This does not contact the backend.
    pub fn build(self) -> Result<ServiceDiscovery<P>, anyhow::Error> {
        let mut connection: ConnectionParameters = self
            .connection
            .try_into()
            .map_err(Into::into)
            .map_err(|err: anyhow::Error| err.context("invalid backend address"))?;

        if let Some(credentials) = self.credentials {
            connection = connection.with_credentials(credentials);
        }

        let defaults = DiscoveryQuery::new(self.service_name)?
            .with_scope(self.scope)
            .with_max_count(self.max_count)?;

        Ok(ServiceDiscovery {
            connection,
            defaults,
            provider: self.provider,
            require_ready: self.require_ready,
        })
    }
}

const _: () = {
    const fn assert_is_send_sync<T: Send + Sync>() {}
    assert_is_send_sync::<ServiceDiscovery>();
    assert_is_send_sync::<ConnectionParameters>();
    assert_is_send_sync::<DiscoveryQuery>();
};
