//! `quaestor` is a tonic client for the Quaestor discovery backend, which keeps track of the
//! live instances of services and ranks them by their reported load.
//!
//! # Simple example
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() {
//!     use quaestor::ServiceDiscovery;
//!
//!     // Look for up to three instances of a service in the default (empty) scope.
//!     let discovery = ServiceDiscovery::builder(("my.loadbalancer", 5150), "QualityVerificationGrpc")
//!         .max_count(3)
//!         .build()
//!         .expect("invalid discovery configuration");
//!
//!     for location in discovery.discover_services().await.expect("discovery failed") {
//!         println!("{location}");
//!     }
//! }
//! ```
//!
//! # Ranked discovery
//!
//! [`discover_top_services`](ServiceDiscovery::discover_top_services) asks the backend to rank
//! the instances by load. The locations are returned best first and the client never
//! reorders them.
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() {
//!     use quaestor::{DiscoveryQuery, ServiceDiscovery};
//!
//!     let discovery = ServiceDiscovery::builder(("my.loadbalancer", 5150), "QualityVerificationGrpc")
//!         .build()
//!         .expect("invalid discovery configuration");
//!
//!     let best = discovery
//!         .discover_top_services()
//!         .await
//!         .expect("discovery failed")
//!         .next();
//!
//!     // A different service or scope can be queried with the same client.
//!     let query = DiscoveryQuery::new("ReportGrpc")
//!         .and_then(|query| query.with_scope("cluster-a").with_max_count(2))
//!         .expect("invalid query");
//!     let reports = discovery.discover_top_services_for(&query).await;
//! }
//! ```
//!
//! # Encrypted channels
//!
//! Passing [`ChannelCredentials`] selects a TLS channel. The channel is given a bounded
//! amount of time (5 seconds by default) to connect before the call is made. A channel that
//! does not become ready is logged and used anyway, unless
//! [`require_ready`](ServiceDiscoveryBuilder::require_ready) is set.
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() {
//!     use quaestor::{ChannelCredentials, ServiceDiscovery};
//!     use std::time::Duration;
//!
//!     let ca = std::fs::read("ca.pem").expect("failed to read ca certificate");
//!
//!     let discovery = ServiceDiscovery::builder(("my.loadbalancer", 5150), "QualityVerificationGrpc")
//!         .with_tls(ChannelCredentials::from_ca_pem(ca))
//!         .readiness_timeout(Duration::from_secs(2))
//!         .require_ready(true)
//!         .build()
//!         .expect("invalid discovery configuration");
//! }
//! ```
//!
//! # Internals
//! Every discovery call obtains a new channel from a [`ChannelProvider`], issues one unary
//! call and decodes the complete response before returning it as [`ServiceLocations`].
//! Nothing is cached between calls; plug in a custom [`ChannelProvider`] to reuse channels.

mod channel_provider;
mod connection;
mod discovery;
mod error;
mod location;
mod provisioner;
mod query;

pub use channel_provider::*;
pub use connection::*;
pub use discovery::*;
pub use error::*;
pub use location::*;
pub use provisioner::*;
pub use query::*;
