//! Builders to construct service components from configuration.

pub mod service_builder;

pub use service_builder::{
    build_admission, build_completion_sink, build_queue, build_rate_store, build_service,
    ServiceParts,
};
