//! Capability extension registry.
//!
//! The core declares typed slots on an [`ExtensionRegistryBuilder`], providers
//! fill them from explicit install steps, and [`ExtensionRegistryBuilder::freeze`]
//! hands the read-only [`ExtensionRegistry`] to the request-serving layer.

mod registry;
mod slot;

pub use registry::{
    ExtensionProvider, ExtensionRegistry, ExtensionRegistryBuilder, ProviderError, RegistryError,
};
pub use slot::{SlotHandle, SlotStatus};
