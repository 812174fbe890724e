//! Resolver errors and their GraphQL response shape.

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error code reported when a capability slot has no provider.
pub const CODE_NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";
pub const CODE_NOT_FOUND: &str = "NOT_FOUND";
pub const CODE_INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
pub const CODE_INTERNAL: &str = "INTERNAL";

pub type ApiResult<T> = Result<T, ApiError>;

/// Resolver-level failure, rendered into the `errors` array of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The slot backing `field` was never filled. Not a fault.
    NotImplemented {
        field: &'static str,
        capability: &'static str,
    },
    NotFound(String),
    InvalidArgument(String),
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotImplemented { .. } => CODE_NOT_IMPLEMENTED,
            Self::NotFound(_) => CODE_NOT_FOUND,
            Self::InvalidArgument(_) => CODE_INVALID_ARGUMENT,
            Self::Internal(_) => CODE_INTERNAL,
        }
    }

    /// Wraps any storage or library error as `INTERNAL`.
    pub fn internal(err: impl Display) -> Self {
        Self::Internal(err.to_string())
    }

    pub(crate) fn into_graphql(self, field: &str) -> GraphqlError {
        let capability = match &self {
            Self::NotImplemented { capability, .. } => Some(*capability),
            _ => None,
        };
        GraphqlError {
            message: self.to_string(),
            path: if field.is_empty() {
                Vec::new()
            } else {
                vec![field.to_string()]
            },
            extensions: ErrorExtensions {
                code: self.code(),
                capability,
            },
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotImplemented { field, .. } => write!(f, "{field} is not implemented"),
            Self::NotFound(what) => write!(f, "{what} not found"),
            Self::InvalidArgument(reason) => write!(f, "invalid argument: {reason}"),
            Self::Internal(reason) => write!(f, "internal error: {reason}"),
        }
    }
}

impl Error for ApiError {}

/// One entry of the response `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphqlError {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
    pub extensions: ErrorExtensions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorExtensions {
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<&'static str>,
}
