//! Core API-serving layer with startup-time capability extension.
//!
//! Startup order is owned by the binary's composition root:
//! logging, secrets gate, slot declaration, provider install, freeze, serve.

pub mod db;
pub mod dbtesting;
pub mod extension;
pub mod graphql;
pub mod logging;
pub mod secrets;
pub mod startup;

pub use extension::{
    ExtensionProvider, ExtensionRegistry, ExtensionRegistryBuilder, ProviderError, RegistryError,
    SlotHandle, SlotStatus,
};
pub use graphql::{ApiError, ApiRequest, ApiResponse, ApiRoot, CoreSlots, ProviderContext};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use secrets::{SecretStore, SecretsConfig, SecretsError, SecretsGate};
pub use startup::{start, BoxedProvider, StartupError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
