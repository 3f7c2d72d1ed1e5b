//! Compile the Quaestor service discovery definition into the messages and the
//! gRPC client and server used by the client library and its tests.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/service_discovery.proto");

    tonic_prost_build::configure()
        .build_client(true)
        .build_server(true)
        .compile_protos(&["proto/service_discovery.proto"], &["proto/"])?;

    Ok(())
}
