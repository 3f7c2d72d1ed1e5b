//! Defines the interface that [`ServiceDiscovery`](crate::ServiceDiscovery) requires in order
//! to obtain a channel to the discovery backend.

use crate::{ConnectionParameters, DiscoveryError, ProvisionedChannel};

/// Interface that provides a channel for the given [`ConnectionParameters`].
///
/// [`ChannelProvisioner`](crate::ChannelProvisioner) builds a new channel on every call.
/// Implement this trait to reuse or pool channels across discovery calls.
#[async_trait::async_trait]
pub trait ChannelProvider {
    /// Return a channel to the backend described by `connection`.
    async fn provide_channel(
        &self,
        connection: &ConnectionParameters,
    ) -> Result<ProvisionedChannel, DiscoveryError>;
}
