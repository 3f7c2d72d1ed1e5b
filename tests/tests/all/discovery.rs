use quaestor::{
    ChannelProvider, ChannelProvisioner, ConnectionParameters, DecodeError, DiscoveryError,
    DiscoveryMode, DiscoveryQuery, ProvisionedChannel, ServiceDiscovery, ServiceLocation,
};
use quaestor_proto::pb::DiscoverServicesRequest;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tests::stub_discovery::{location, RecordedRequest, StubDiscoveryBackend};
use tests::test_server::{closed_port, TestServer};
use tests::tls::TestTlsFixture;
use tonic::Code;

fn authorities(locations: impl Iterator<Item = ServiceLocation>) -> Vec<String> {
    locations.map(|location| location.authority()).collect()
}

#[tokio::test]
async fn discover_services_sends_the_query_and_returns_every_location() {
    // Arrange
    let backend = StubDiscoveryBackend::with_locations(vec![
        location("Quality", "10.0.0.1", 7000),
        location("Quality", "10.0.0.2", 7001),
    ]);
    let server = TestServer::start(backend.clone(), None).await;

    let discovery = ServiceDiscovery::builder(server.connection(), "Quality")
        .scope("cluster-a")
        .max_count(3)
        .build()
        .expect("valid configuration");

    // Act
    let locations: Vec<ServiceLocation> = discovery
        .discover_services()
        .await
        .expect("discovery succeeds")
        .collect();

    // Assert
    assert_eq!(locations.len(), 2);
    assert_eq!(locations[0].service_name(), "Quality");
    assert_eq!(locations[0].host_name(), "10.0.0.1");
    assert_eq!(locations[0].port(), 7000);
    assert_eq!(locations[1].to_string(), "Quality@10.0.0.2:7001");

    assert_eq!(
        backend.recorded_requests().await,
        vec![RecordedRequest {
            method: "DiscoverServices",
            request: DiscoverServicesRequest {
                service_name: "Quality".to_string(),
                scope: "cluster-a".to_string(),
                max_count: 3,
            },
        }]
    );
}

#[tokio::test]
async fn quality_in_cluster_a_yields_exactly_the_two_registered_instances() {
    let backend = StubDiscoveryBackend::with_locations(vec![
        location("Quality", "h1", 8080),
        location("Quality", "h2", 8081),
    ]);
    let server = TestServer::start(backend.clone(), None).await;

    let discovery = ServiceDiscovery::builder(server.connection(), "Quality")
        .scope("cluster-a")
        .max_count(3)
        .build()
        .unwrap();

    let locations: Vec<(String, String, u16)> = discovery
        .discover_services()
        .await
        .unwrap()
        .map(|location| {
            (
                location.service_name().to_string(),
                location.host_name().to_string(),
                location.port(),
            )
        })
        .collect();

    assert_eq!(
        locations,
        vec![
            ("Quality".to_string(), "h1".to_string(), 8080),
            ("Quality".to_string(), "h2".to_string(), 8081),
        ]
    );
    let requests = backend.recorded_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].request.service_name, "Quality");
    assert_eq!(requests[0].request.scope, "cluster-a");
    assert_eq!(requests[0].request.max_count, 3);
}

#[tokio::test]
async fn discover_top_services_keeps_the_backend_ranking() {
    let backend = StubDiscoveryBackend::with_locations(vec![
        location("Quality", "best", 7000),
        location("Quality", "good", 7000),
        location("Quality", "best", 7000),
        location("Quality", "worst", 7000),
    ])
    .ignoring_max_count();
    let server = TestServer::start(backend.clone(), None).await;

    let discovery = ServiceDiscovery::builder(server.connection(), "Quality")
        .max_count(2)
        .build()
        .unwrap();

    let locations = discovery.discover_top_services().await.unwrap();

    // The client neither truncates, deduplicates nor reorders.
    assert_eq!(
        authorities(locations),
        vec!["best:7000", "good:7000", "best:7000", "worst:7000"]
    );
    let requests = backend.recorded_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "DiscoverTopServices");
    assert_eq!(requests[0].request.max_count, 2);
}

#[tokio::test]
async fn a_capping_backend_returns_at_most_max_count() {
    let backend = StubDiscoveryBackend::with_locations(
        (1..=5)
            .map(|i| location("Quality", &format!("host-{i}"), 7000))
            .collect(),
    );
    let server = TestServer::start(backend, None).await;

    let discovery = ServiceDiscovery::builder(server.connection(), "Quality")
        .max_count(3)
        .build()
        .unwrap();

    let unordered = discovery.discover_services().await.unwrap();
    assert_eq!(unordered.len(), 3);

    let ranked = discovery.discover_top_services().await.unwrap();
    assert_eq!(
        authorities(ranked),
        vec!["host-1:7000", "host-2:7000", "host-3:7000"]
    );
}

#[tokio::test]
async fn no_known_instances_is_an_empty_result() {
    let server = TestServer::start(StubDiscoveryBackend::empty(), None).await;

    let discovery = ServiceDiscovery::builder(server.connection(), "Unknown")
        .build()
        .unwrap();

    assert_eq!(discovery.discover_services().await.unwrap().len(), 0);
    assert!(discovery.discover_top_services().await.unwrap().next().is_none());
}

#[tokio::test]
async fn an_explicit_query_overrides_the_defaults() {
    let backend = StubDiscoveryBackend::with_locations(vec![location("Report", "10.0.0.9", 80)]);
    let server = TestServer::start(backend.clone(), None).await;

    let discovery = ServiceDiscovery::builder(server.connection(), "Quality")
        .scope("cluster-a")
        .build()
        .unwrap();
    let query = DiscoveryQuery::new("Report")
        .and_then(|query| query.with_scope("cluster-b").with_max_count(7))
        .unwrap();

    let locations = discovery.discover_top_services_for(&query).await.unwrap();
    assert_eq!(authorities(locations), vec!["10.0.0.9:80"]);

    let requests = backend.recorded_requests().await;
    assert_eq!(
        requests[0].request,
        DiscoverServicesRequest {
            service_name: "Report".to_string(),
            scope: "cluster-b".to_string(),
            max_count: 7,
        }
    );
    // The defaults are untouched.
    assert_eq!(discovery.default_query().service_name(), "Quality");
}

#[tokio::test]
async fn backend_failures_keep_their_status() {
    let backend =
        StubDiscoveryBackend::empty().failing_with(Code::NotFound, "no such service: Quality");
    let server = TestServer::start(backend, None).await;

    let discovery = ServiceDiscovery::builder(server.connection(), "Quality")
        .build()
        .unwrap();

    let err = discovery.discover_top_services().await.unwrap_err();

    match &err {
        DiscoveryError::Rpc { method, source } => {
            assert_eq!(*method, DiscoveryMode::Ranked);
            assert_eq!(source.code(), Code::NotFound);
            assert_eq!(source.message(), "no such service: Quality");
        }
        other => panic!("expected an rpc error, got {other:?}"),
    }
    assert_eq!(err.status().map(|status| status.code()), Some(Code::NotFound));
    assert_eq!(err.to_string(), "DiscoverTopServices call failed");
}

#[tokio::test]
async fn a_malformed_entry_fails_the_whole_call() {
    let backend = StubDiscoveryBackend::with_locations(vec![
        location("Quality", "10.0.0.1", 7000),
        location("Quality", "10.0.0.2", 0),
        location("Quality", "10.0.0.3", 7000),
    ]);
    let server = TestServer::start(backend, None).await;

    let discovery = ServiceDiscovery::builder(server.connection(), "Quality")
        .max_count(10)
        .build()
        .unwrap();

    let err = discovery.discover_services().await.unwrap_err();

    match err {
        DiscoveryError::Decode { index, source } => {
            assert_eq!(index, 1);
            assert_eq!(source, DecodeError::PortOutOfRange(0));
        }
        other => panic!("expected a decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn an_unreachable_backend_is_an_rpc_error() {
    let discovery = ServiceDiscovery::builder(("127.0.0.1", closed_port().await), "Quality")
        .build()
        .unwrap();

    let err = discovery.discover_services().await.unwrap_err();

    match err {
        DiscoveryError::Rpc { method, source } => {
            assert_eq!(method, DiscoveryMode::Unordered);
            assert_eq!(source.code(), Code::Unavailable);
        }
        other => panic!("expected an rpc error, got {other:?}"),
    }
}

struct CountingProvider {
    inner: ChannelProvisioner,
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl ChannelProvider for CountingProvider {
    async fn provide_channel(
        &self,
        connection: &ConnectionParameters,
    ) -> Result<ProvisionedChannel, DiscoveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.provide_channel(connection).await
    }
}

#[tokio::test]
async fn every_call_obtains_its_own_channel() {
    let backend = StubDiscoveryBackend::with_locations(vec![location("Quality", "10.0.0.1", 7000)]);
    let server = TestServer::start(backend.clone(), None).await;
    let calls = Arc::new(AtomicUsize::new(0));

    let discovery = ServiceDiscovery::builder(server.connection(), "Quality")
        .channel_provider(CountingProvider {
            inner: ChannelProvisioner::new(),
            calls: Arc::clone(&calls),
        })
        .build()
        .unwrap();

    discovery.discover_services().await.unwrap();
    discovery.discover_top_services().await.unwrap();
    discovery.discover_services().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let methods: Vec<&str> = backend
        .recorded_requests()
        .await
        .into_iter()
        .map(|recorded| recorded.method)
        .collect();
    assert_eq!(
        methods,
        vec!["DiscoverServices", "DiscoverTopServices", "DiscoverServices"]
    );
}

#[tokio::test]
async fn discovery_works_over_tls() {
    let tls = TestTlsFixture::generate();
    let backend = StubDiscoveryBackend::with_locations(vec![location("Quality", "10.0.0.1", 7000)]);
    let server = TestServer::start(backend.clone(), Some(tls.server_tls_config())).await;

    let discovery = ServiceDiscovery::builder(server.connection(), "Quality")
        .with_tls(tls.client_credentials())
        .require_ready(true)
        .build()
        .unwrap();

    let locations = discovery.discover_top_services().await.unwrap();

    assert_eq!(authorities(locations), vec!["10.0.0.1:7000"]);
    assert_eq!(backend.recorded_requests().await.len(), 1);
}

#[tokio::test]
async fn an_untrusted_backend_is_rejected_when_readiness_is_required() {
    let server_tls = TestTlsFixture::generate();
    let other_ca = TestTlsFixture::generate();
    let backend = StubDiscoveryBackend::with_locations(vec![location("Quality", "10.0.0.1", 7000)]);
    let server = TestServer::start(backend.clone(), Some(server_tls.server_tls_config())).await;

    let discovery = ServiceDiscovery::builder(server.connection(), "Quality")
        .with_tls(other_ca.client_credentials())
        .require_ready(true)
        .build()
        .unwrap();

    let err = discovery.discover_services().await.unwrap_err();

    assert!(
        matches!(err, DiscoveryError::ChannelNotReady { .. }),
        "expected ChannelNotReady, got {err:?}"
    );
    assert!(backend.recorded_requests().await.is_empty());
}

#[tokio::test]
async fn an_untrusted_backend_fails_the_call_itself_by_default() {
    let server_tls = TestTlsFixture::generate();
    let other_ca = TestTlsFixture::generate();
    let server = TestServer::start(
        StubDiscoveryBackend::empty(),
        Some(server_tls.server_tls_config()),
    )
    .await;

    let discovery = ServiceDiscovery::builder(server.connection(), "Quality")
        .with_tls(other_ca.client_credentials())
        .build()
        .unwrap();

    let err = discovery.discover_services().await.unwrap_err();

    assert!(
        matches!(err, DiscoveryError::Rpc { .. }),
        "expected an rpc error, got {err:?}"
    );
}
