use anyhow::Context;
use std::net::IpAddr;
use tonic::transport::{Certificate, ClientTlsConfig, Identity};

/// Defines how to reach the discovery backend: a `host_name`, a `port` and
/// optionally the [`ChannelCredentials`] used to secure the channel.
#[derive(Debug, Clone)]
pub struct ConnectionParameters {
    /// The host running the discovery backend.
    host_name: String,
    /// The port of the discovery backend.
    port: u16,
    /// Credentials for an encrypted channel, `None` for plaintext.
    credentials: Option<ChannelCredentials>,
}

impl ConnectionParameters {
    /// Create [`ConnectionParameters`] from a valid `host_name` and `port`.
    ///
    /// This function will fail if the `host_name` is neither a valid domain name nor an
    /// ip address, if it is empty or the bare DNS root, or if `port` is zero.
    pub fn from_parts<T: ToString>(host_name: T, port: u16) -> Result<Self, anyhow::Error> {
        let host_name = host_name.to_string();

        if host_name.parse::<IpAddr>().is_err() {
            let name = hickory_resolver::Name::from_ascii(&host_name)
                .map_err(anyhow::Error::from)
                .context("invalid 'host_name'")?;
            if host_name.is_empty() || name.is_root() {
                anyhow::bail!("invalid 'host_name': must name a host");
            }
        }

        if port == 0 {
            anyhow::bail!("invalid 'port': must be in the range 1-65535");
        }

        Ok(Self {
            host_name,
            port,
            credentials: None,
        })
    }

    /// Secure the channel to the backend with `credentials`.
    pub fn with_credentials(self, credentials: ChannelCredentials) -> Self {
        Self {
            credentials: Some(credentials),
            ..self
        }
    }

    /// Get the `host_name` part of the [`ConnectionParameters`].
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// Get the `port` part of the [`ConnectionParameters`].
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The credentials of the encrypted channel, if any.
    pub fn credentials(&self) -> Option<&ChannelCredentials> {
        self.credentials.as_ref()
    }

    /// `host:port`, with ipv6 literals in brackets.
    pub fn address(&self) -> String {
        match self.host_name.parse::<IpAddr>() {
            Ok(IpAddr::V6(ip)) => format!("[{}]:{}", ip, self.port),
            _ => format!("{}:{}", self.host_name, self.port),
        }
    }

    pub(crate) fn uri(&self) -> String {
        let scheme = if self.credentials.is_some() {
            "https"
        } else {
            "http"
        };
        format!("{}://{}", scheme, self.address())
    }
}

/// ```
/// let params = quaestor::ConnectionParameters::try_from(("localhost", 5150)).unwrap();
/// assert_eq!(params.host_name(), "localhost");
/// assert_eq!(params.port(), 5150);
/// assert!(params.credentials().is_none());
/// ```
impl TryFrom<(&str, u16)> for ConnectionParameters {
    type Error = anyhow::Error;

    fn try_from((host_name, port): (&str, u16)) -> Result<Self, Self::Error> {
        Self::from_parts(host_name, port)
    }
}

/// ```
/// let params = quaestor::ConnectionParameters::try_from((String::from("localhost"), 5150)).unwrap();
/// assert_eq!(params.host_name(), "localhost");
/// assert_eq!(params.port(), 5150);
/// ```
impl TryFrom<(String, u16)> for ConnectionParameters {
    type Error = anyhow::Error;

    fn try_from((host_name, port): (String, u16)) -> Result<Self, Self::Error> {
        Self::from_parts(host_name, port)
    }
}

/// TLS material for an encrypted and authenticated channel.
///
/// Their presence on [`ConnectionParameters`] selects the encrypted channel, including the
/// bounded readiness wait performed by the [`ChannelProvisioner`](crate::ChannelProvisioner).
#[derive(Debug, Clone)]
pub struct ChannelCredentials(ClientTlsConfig);

impl ChannelCredentials {
    /// Wrap an already configured tonic [`ClientTlsConfig`].
    pub fn new(tls_config: ClientTlsConfig) -> Self {
        Self(tls_config)
    }

    /// Trust the certificate authority given as PEM.
    pub fn from_ca_pem(ca_certificate: impl AsRef<[u8]>) -> Self {
        Self(ClientTlsConfig::new().ca_certificate(Certificate::from_pem(ca_certificate)))
    }

    /// Present a client certificate to backends that require mutual TLS.
    pub fn client_identity(self, certificate: impl AsRef<[u8]>, key: impl AsRef<[u8]>) -> Self {
        Self(self.0.identity(Identity::from_pem(certificate, key)))
    }

    /// Verify the backend certificate against `domain_name` instead of the host name.
    pub fn domain_name(self, domain_name: impl Into<String>) -> Self {
        Self(self.0.domain_name(domain_name))
    }

    pub(crate) fn tls_config(&self) -> ClientTlsConfig {
        self.0.clone()
    }
}

impl From<ClientTlsConfig> for ChannelCredentials {
    fn from(tls_config: ClientTlsConfig) -> Self {
        Self::new(tls_config)
    }
}
