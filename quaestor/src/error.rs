use crate::DiscoveryMode;

/// Errors returned by the discovery calls, one variant per failing stage.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The channel to the backend could not be constructed.
    #[error("failed to create channel to '{address}'")]
    Channel {
        address: String,
        #[source]
        source: tonic::transport::Error,
    },

    /// The encrypted channel did not become ready and the client requires it to.
    #[error("channel to '{address}' is not ready: {reason}")]
    ChannelNotReady { address: String, reason: String },

    /// The remote call failed, either in transport or on the server.
    #[error("{method} call failed")]
    Rpc {
        method: DiscoveryMode,
        #[source]
        source: tonic::Status,
    },

    /// An entry of the response is not a valid service location.
    #[error("malformed service location at index {index}")]
    Decode {
        index: usize,
        #[source]
        source: DecodeError,
    },
}

impl DiscoveryError {
    /// The gRPC status of a failed remote call.
    pub fn status(&self) -> Option<&tonic::Status> {
        match self {
            Self::Rpc { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Why a location entry of a discovery response was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("empty service name")]
    EmptyServiceName,
    #[error("empty host name")]
    EmptyHostName,
    #[error("port {0} is out of range")]
    PortOutOfRange(i32),
}
