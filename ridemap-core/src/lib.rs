//! Core types and coordination for loading one of two competing map SDKs exactly once per
//! process and sharing the result with every map consumer.

/// Bootstrap coordinator owning the load state.
pub mod coordinator;
/// Headless document acting as the resource host.
pub mod document;
/// The process-wide bootstrap instance.
pub mod global;
/// Injection and readiness helpers shared by provider loaders.
pub mod loader;
/// Domain models shared by all providers and consumers.
pub mod model;
/// Registry for plugging provider loaders into the coordinator.
pub mod plugin;
/// Traits describing the coordinator's collaborators.
pub mod ports;
/// HTTP settings source.
pub mod settings;
/// Listener registration for UI consumers.
pub mod subscription;

#[cfg(test)]
mod testing;

pub use coordinator::*;
pub use document::*;
pub use loader::*;
pub use model::*;
pub use plugin::*;
pub use ports::*;
pub use settings::*;
pub use subscription::*;
