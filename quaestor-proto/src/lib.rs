//! Protobuf messages and gRPC bindings for the `Quaestor.ServiceDiscovery.ServiceDiscoveryGrpc`
//! service, generated from `proto/service_discovery.proto`.

pub mod pb {
    tonic::include_proto!("quaestor.service_discovery");
}
