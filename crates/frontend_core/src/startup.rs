//! Startup sequencing for the composition root.
//!
//! The gate runs before any provider is constructed; a gate failure returns
//! before provider code executes. Exiting the process stays with the caller.

use crate::extension::{ExtensionProvider, ExtensionRegistryBuilder, ProviderError, SlotStatus};
use crate::graphql::{ApiRoot, CoreSlots, ProviderContext};
use crate::secrets::{SecretsError, SecretsGate};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

pub type BoxedProvider = Box<dyn ExtensionProvider<CoreSlots>>;

#[derive(Debug)]
pub enum StartupError {
    Secrets(SecretsError),
    Provider(ProviderError),
}

impl Display for StartupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Secrets(err) => write!(f, "secrets gate failed: {err}"),
            Self::Provider(err) => write!(f, "provider install failed: {err}"),
        }
    }
}

impl Error for StartupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Secrets(err) => Some(err),
            Self::Provider(err) => Some(err),
        }
    }
}

impl From<SecretsError> for StartupError {
    fn from(value: SecretsError) -> Self {
        Self::Secrets(value)
    }
}

impl From<ProviderError> for StartupError {
    fn from(value: ProviderError) -> Self {
        Self::Provider(value)
    }
}

/// Runs the gate, declares slots, installs providers in list order, freezes.
///
/// `providers` is only called after the gate succeeds.
pub fn start<F>(
    gate: &SecretsGate,
    data_dir: Option<PathBuf>,
    providers: F,
) -> Result<ApiRoot, StartupError>
where
    F: FnOnce(&ProviderContext) -> Vec<BoxedProvider>,
{
    let secrets = gate.ensure_ready()?;
    let mut context = ProviderContext::new(secrets);
    if let Some(dir) = data_dir {
        context = context.with_data_dir(dir);
    }

    let mut builder = ExtensionRegistryBuilder::new();
    let slots = CoreSlots::declare(&mut builder);
    for provider in providers(&context) {
        builder.install(provider.as_ref(), &slots)?;
    }

    let registry = builder.freeze();
    for SlotStatus {
        name,
        capability,
        provider,
    } in registry.slots()
    {
        info!(
            "event=slot_status module=startup status={} slot={} capability={} provider={}",
            if provider.is_some() { "filled" } else { "absent" },
            name,
            capability,
            provider.unwrap_or("-")
        );
    }
    Ok(ApiRoot::new(Arc::new(registry), slots))
}
