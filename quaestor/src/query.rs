use quaestor_proto::pb::DiscoverServicesRequest;

/// Defines what to look for: a `service_name`, restricted to a `scope`, returning at most
/// `max_count` locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryQuery {
    service_name: String,
    scope: String,
    max_count: u32,
}

impl DiscoveryQuery {
    /// Largest `max_count` the wire request can carry.
    pub const MAX_COUNT_LIMIT: u32 = i32::MAX as u32;

    /// Query for `service_name` in the empty scope, returning a single location.
    ///
    /// Fails if `service_name` is empty.
    pub fn new(service_name: impl Into<String>) -> Result<Self, anyhow::Error> {
        let service_name = service_name.into();

        if service_name.is_empty() {
            anyhow::bail!("invalid 'service_name': must not be empty");
        }

        Ok(Self {
            service_name,
            scope: String::new(),
            max_count: 1,
        })
    }

    /// Restrict the query to instances registered under `scope`.
    pub fn with_scope(self, scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            ..self
        }
    }

    /// Set the upper bound on returned locations.
    ///
    /// Fails if `max_count` is zero or does not fit the wire request.
    pub fn with_max_count(self, max_count: u32) -> Result<Self, anyhow::Error> {
        if max_count == 0 || max_count > Self::MAX_COUNT_LIMIT {
            anyhow::bail!(
                "invalid 'max_count' {}: must be in the range 1-{}",
                max_count,
                Self::MAX_COUNT_LIMIT
            );
        }

        Ok(Self { max_count, ..self })
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn max_count(&self) -> u32 {
        self.max_count
    }
}

impl From<&DiscoveryQuery> for DiscoverServicesRequest {
    fn from(query: &DiscoveryQuery) -> Self {
        DiscoverServicesRequest {
            service_name: query.service_name.clone(),
            scope: query.scope.clone(),
            // Bounded by `MAX_COUNT_LIMIT` on construction.
            max_count: query.max_count as i32,
        }
    }
}
