use crate::{DecodeError, DiscoveryError};
use quaestor_proto::pb::{DiscoverServicesResponse, ServiceLocationMsg};
use std::fmt;

/// A discovered instance of a service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceLocation {
    service_name: String,
    host_name: String,
    port: u16,
    scope: String,
}

impl ServiceLocation {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The scope the instance is registered under, empty if the backend did not report one.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// `host_name:port`, ready to build an endpoint for the discovered service.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host_name, self.port)
    }
}

impl fmt::Display for ServiceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.service_name, self.host_name, self.port)
    }
}

impl TryFrom<ServiceLocationMsg> for ServiceLocation {
    type Error = DecodeError;

    fn try_from(msg: ServiceLocationMsg) -> Result<Self, Self::Error> {
        if msg.service_name.is_empty() {
            return Err(DecodeError::EmptyServiceName);
        }
        if msg.host_name.is_empty() {
            return Err(DecodeError::EmptyHostName);
        }
        let port = u16::try_from(msg.port)
            .ok()
            .filter(|port| *port != 0)
            .ok_or(DecodeError::PortOutOfRange(msg.port))?;

        Ok(Self {
            service_name: msg.service_name,
            host_name: msg.host_name,
            port,
            scope: msg.scope,
        })
    }
}

/// The locations returned by one discovery call, in the order the backend sent them.
///
/// The whole response is decoded before a [`ServiceLocations`] is handed out, so iterating
/// never fails. Issue a new call to enumerate again.
#[derive(Debug)]
pub struct ServiceLocations {
    inner: std::vec::IntoIter<ServiceLocation>,
}

impl ServiceLocations {
    pub(crate) fn decode(response: DiscoverServicesResponse) -> Result<Self, DiscoveryError> {
        let locations = response
            .service_locations
            .into_iter()
            .enumerate()
            .map(|(index, msg)| {
                ServiceLocation::try_from(msg)
                    .map_err(|source| DiscoveryError::Decode { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            inner: locations.into_iter(),
        })
    }
}

impl Iterator for ServiceLocations {
    type Item = ServiceLocation;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ServiceLocations {}
