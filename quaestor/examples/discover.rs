use quaestor::ServiceDiscovery;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let service_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "QualityVerificationGrpc".to_string());

    let discovery = ServiceDiscovery::builder(("localhost", 5150_u16), service_name)
        .max_count(3)
        .timeout(std::time::Duration::from_secs(5))
        .build()?;

    for location in discovery.discover_services().await? {
        println!("DISCOVERED={}", location);
    }

    for (rank, location) in discovery.discover_top_services().await?.enumerate() {
        println!("RANKED #{}={}", rank + 1, location);
    }

    Ok(())
}
