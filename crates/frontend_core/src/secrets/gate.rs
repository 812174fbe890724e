//! One-shot readiness gate over key resolution.

use super::{load_store, SecretStore, SecretsConfig, SecretsError};
use log::{error, info, warn};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Instant;

type Readiness = Result<Arc<SecretStore>, SecretsError>;

static PROCESS_GATE: OnceCell<SecretsGate> = OnceCell::new();

/// Evaluates secret readiness once and remembers the outcome.
#[derive(Debug)]
pub struct SecretsGate {
    config: SecretsConfig,
    outcome: OnceCell<Readiness>,
}

impl SecretsGate {
    pub fn new(config: SecretsConfig) -> Self {
        Self {
            config,
            outcome: OnceCell::new(),
        }
    }

    /// Returns the cached outcome, evaluating it on the first call.
    pub fn ensure_ready(&self) -> Readiness {
        self.outcome.get_or_init(|| evaluate(&self.config)).clone()
    }

    /// `true` once the gate has been evaluated, regardless of outcome.
    pub fn is_evaluated(&self) -> bool {
        self.outcome.get().is_some()
    }

    pub fn config(&self) -> &SecretsConfig {
        &self.config
    }
}

fn evaluate(config: &SecretsConfig) -> Readiness {
    let started_at = Instant::now();
    match load_store(config) {
        Ok(store) => {
            info!(
                "event=secrets_init module=secrets status=ok duration_ms={} source={} fingerprint={}",
                started_at.elapsed().as_millis(),
                store.source(),
                store.fingerprint()
            );
            Ok(Arc::new(store))
        }
        Err(err) => {
            error!(
                "event=secrets_init module=secrets status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Initializes the process-wide gate.
///
/// The first caller's `config` wins; later callers with a different config
/// get the original outcome and a warning in the log.
pub fn init(config: SecretsConfig) -> Readiness {
    let gate = PROCESS_GATE.get_or_init(|| SecretsGate::new(config.clone()));
    if gate.config() != &config {
        warn!("event=secrets_init module=secrets status=ignored reason=already_configured");
    }
    gate.ensure_ready()
}

/// Process secret material after a successful [`init`].
pub fn process_store() -> Option<Arc<SecretStore>> {
    PROCESS_GATE
        .get()
        .and_then(|gate| gate.outcome.get())
        .and_then(|outcome| outcome.as_ref().ok())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::SecretsGate;
    use crate::secrets::{SecretsConfig, SecretsError};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use std::sync::Arc;

    #[test]
    fn success_is_cached_after_material_disappears() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("secret.key");
        std::fs::write(&path, STANDARD.encode([9u8; 32])).expect("write key");

        let gate = SecretsGate::new(SecretsConfig::from_key_file(&path));
        assert!(!gate.is_evaluated());
        let first = gate.ensure_ready().expect("gate should pass");

        std::fs::remove_file(&path).expect("remove key");
        let second = gate.ensure_ready().expect("cached success");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn failure_is_terminal_even_after_material_appears() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("secret.key");

        let gate = SecretsGate::new(SecretsConfig::from_key_file(&path));
        let err = gate.ensure_ready().expect_err("nothing provisioned yet");
        assert!(matches!(err, SecretsError::MissingKey { .. }));

        std::fs::write(&path, STANDARD.encode([9u8; 32])).expect("write key");
        let again = gate.ensure_ready().expect_err("no retry after failure");
        assert_eq!(again, err);
        assert!(gate.is_evaluated());
    }
}
