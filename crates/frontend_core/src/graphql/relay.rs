//! Opaque node IDs: base64 of `Kind:local`.

use super::error::{ApiError, ApiResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub fn marshal_id(kind: &str, local: impl std::fmt::Display) -> String {
    STANDARD.encode(format!("{kind}:{local}"))
}

/// Returns the local part of `id` when it encodes a node of `kind`.
pub fn unmarshal_id(kind: &str, id: &str) -> ApiResult<String> {
    let invalid = || ApiError::InvalidArgument(format!("`{id}` is not a valid {kind} ID"));
    let decoded = STANDARD.decode(id.trim()).map_err(|_| invalid())?;
    let text = String::from_utf8(decoded).map_err(|_| invalid())?;
    match text.split_once(':') {
        Some((found, local)) if found == kind && !local.is_empty() => Ok(local.to_string()),
        _ => Err(invalid()),
    }
}
