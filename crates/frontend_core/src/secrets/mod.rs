//! Secrets readiness gate and process secret material.
//!
//! # Responsibility
//! - Resolve the process encryption key from the environment or a key file.
//! - Evaluate readiness exactly once and cache the outcome, success or failure.
//!
//! # Invariants
//! - Key material is 32 bytes, held in a zeroizing wrapper, never logged.
//! - A failed gate is terminal; later calls observe the same failure.
//! - This module never exits the process; the composition root decides.
//!
//! # Access
//! Production code reaches the key only through the `ProviderContext` built
//! from [`SecretsGate::ensure_ready`]. The process-wide [`init`] /
//! [`process_store`] pair serves test bootstraps; the binary never calls it,
//! so [`process_store`] is `None` there.

mod gate;

pub use gate::{init, process_store, SecretsGate};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::{ExposeSecret, Secret};
use sha2::{Digest, Sha256};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::PathBuf;

/// Default environment variable holding the base64 encryption key.
pub const DEFAULT_SECRET_KEY_ENV: &str = "FRONTEND_SECRET_KEY";
/// Required decoded key length in bytes.
pub const SECRET_KEY_LEN: usize = 32;

/// Where the gate looks for secret material, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretsConfig {
    /// Environment variable consulted first. `None` skips the environment.
    pub key_env: Option<String>,
    /// Key file consulted when the variable is unset or blank.
    pub key_file: Option<PathBuf>,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            key_env: Some(DEFAULT_SECRET_KEY_ENV.to_string()),
            key_file: None,
        }
    }
}

impl SecretsConfig {
    /// Config that only reads `path`.
    pub fn from_key_file(path: impl Into<PathBuf>) -> Self {
        Self {
            key_env: None,
            key_file: Some(path.into()),
        }
    }
}

/// Where the active key came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Env(String),
    File(PathBuf),
}

impl Display for KeySource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Env(name) => write!(f, "env:{name}"),
            Self::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

/// Secret material available after a successful gate.
pub struct SecretStore {
    key: Secret<[u8; SECRET_KEY_LEN]>,
    source: KeySource,
}

impl SecretStore {
    /// Decodes a base64 key. Surrounding whitespace is ignored.
    pub fn from_base64(encoded: &str, source: KeySource) -> Result<Self, SecretsError> {
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|err| SecretsError::InvalidEncoding {
                source: source.to_string(),
                reason: err.to_string(),
            })?;
        let key: [u8; SECRET_KEY_LEN] =
            decoded
                .as_slice()
                .try_into()
                .map_err(|_| SecretsError::InvalidKeyLength {
                    source: source.to_string(),
                    actual: decoded.len(),
                })?;
        Ok(Self {
            key: Secret::new(key),
            source,
        })
    }

    /// Raw key bytes for consumers that encrypt or sign.
    pub fn encryption_key(&self) -> &[u8; SECRET_KEY_LEN] {
        self.key.expose_secret()
    }

    pub fn source(&self) -> &KeySource {
        &self.source
    }

    /// First 8 bytes of SHA-256(key), hex encoded. Safe to log.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.key.expose_secret());
        digest[..8].iter().map(|byte| format!("{byte:02x}")).collect()
    }
}

impl Debug for SecretStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStore")
            .field("source", &self.source)
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Diagnostic cause of a failed readiness gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretsError {
    /// Neither the environment variable nor the key file provided a key.
    MissingKey { checked: Vec<String> },
    Unreadable { path: PathBuf, reason: String },
    InvalidEncoding { source: String, reason: String },
    InvalidKeyLength { source: String, actual: usize },
}

impl Display for SecretsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingKey { checked } if checked.is_empty() => {
                write!(f, "no secret key source configured")
            }
            Self::MissingKey { checked } => {
                write!(f, "secret key not found (checked {})", checked.join(", "))
            }
            Self::Unreadable { path, reason } => {
                write!(f, "failed to read secret key file `{}`: {reason}", path.display())
            }
            Self::InvalidEncoding { source, reason } => {
                write!(f, "secret key from {source} is not valid base64: {reason}")
            }
            Self::InvalidKeyLength { source, actual } => write!(
                f,
                "secret key from {source} must decode to {SECRET_KEY_LEN} bytes, got {actual}"
            ),
        }
    }
}

impl Error for SecretsError {}

/// Resolves and validates key material per `config`.
pub(crate) fn load_store(config: &SecretsConfig) -> Result<SecretStore, SecretsError> {
    let mut checked = Vec::new();

    if let Some(name) = config.key_env.as_deref() {
        checked.push(format!("env:{name}"));
        if let Ok(value) = std::env::var(name) {
            if !value.trim().is_empty() {
                return SecretStore::from_base64(&value, KeySource::Env(name.to_string()));
            }
        }
    }

    if let Some(path) = config.key_file.as_ref() {
        checked.push(format!("file:{}", path.display()));
        match std::fs::read_to_string(path) {
            Ok(contents) if !contents.trim().is_empty() => {
                return SecretStore::from_base64(&contents, KeySource::File(path.clone()));
            }
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(SecretsError::Unreadable {
                    path: path.clone(),
                    reason: err.to_string(),
                })
            }
        }
    }

    Err(SecretsError::MissingKey { checked })
}
