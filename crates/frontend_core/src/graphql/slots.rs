//! Extension slots owned by the API layer and what providers receive.

use super::graphs::GraphsResolver;
use super::threads::ThreadsResolver;
use crate::extension::{ExtensionRegistryBuilder, SlotHandle};
use crate::secrets::SecretStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const THREADS_SLOT: &str = "Threads";
pub const GRAPHS_SLOT: &str = "Graphs";

/// One typed accessor per declared slot.
#[derive(Debug, Clone, Copy)]
pub struct CoreSlots {
    pub threads: SlotHandle<dyn ThreadsResolver>,
    pub graphs: SlotHandle<dyn GraphsResolver>,
}

impl CoreSlots {
    /// Declares every API slot. Call once, before any provider installs.
    pub fn declare(builder: &mut ExtensionRegistryBuilder) -> Self {
        Self {
            threads: builder.declare_slot::<dyn ThreadsResolver>(THREADS_SLOT),
            graphs: builder.declare_slot::<dyn GraphsResolver>(GRAPHS_SLOT),
        }
    }
}

/// Startup inputs handed to providers.
///
/// Holding a [`SecretStore`] means the secrets gate already passed.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    secrets: Arc<SecretStore>,
    data_dir: Option<PathBuf>,
}

impl ProviderContext {
    pub fn new(secrets: Arc<SecretStore>) -> Self {
        Self {
            secrets,
            data_dir: None,
        }
    }

    /// Directory for provider-owned storage. `None` keeps storage in memory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn secrets(&self) -> &SecretStore {
        &self.secrets
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }
}
