use quaestor::{ChannelCredentials, ServiceDiscovery};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let ca_path = std::env::args()
        .nth(1)
        .ok_or("usage: discover_tls <ca.pem> [service name]")?;
    let service_name = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "QualityVerificationGrpc".to_string());

    let credentials = ChannelCredentials::from_ca_pem(std::fs::read(ca_path)?);

    let discovery = ServiceDiscovery::builder(("localhost", 5150_u16), service_name)
        .with_tls(credentials)
        .readiness_timeout(std::time::Duration::from_secs(2))
        .max_count(3)
        .build()?;

    let locations = discovery.discover_top_services().await?;

    println!("RESPONSE={:?}", locations.collect::<Vec<_>>());

    Ok(())
}
