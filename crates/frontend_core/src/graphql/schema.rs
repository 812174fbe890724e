//! Request routing over the frozen extension registry.
//!
//! Every operation resolves its slot at request time. An empty slot is
//! answered with a `NOT_IMPLEMENTED` error entry and a `null` field, never a
//! panic.

use super::error::{ApiError, ApiResult, GraphqlError};
use super::graphs::{CreateGraphInput, GraphsResolver};
use super::slots::{CoreSlots, GRAPHS_SLOT, THREADS_SLOT};
use super::threads::{CreateThreadInput, ThreadsArgs, ThreadsResolver};
use crate::extension::ExtensionRegistry;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

/// One API operation, tagged by `op`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ApiRequest {
    Threads(ThreadsArgs),
    Thread { id: String },
    CreateThread { input: CreateThreadInput },
    CloseThread { id: String },
    Graphs,
    Graph { id: String },
    CreateGraph { input: CreateGraphInput },
}

impl ApiRequest {
    /// Response field the operation resolves.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Threads(_) => "threads",
            Self::Thread { .. } => "thread",
            Self::CreateThread { .. } => "createThread",
            Self::CloseThread { .. } => "closeThread",
            Self::Graphs => "graphs",
            Self::Graph { .. } => "graph",
            Self::CreateGraph { .. } => "createGraph",
        }
    }
}

/// GraphQL response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub data: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphqlError>,
}

impl ApiResponse {
    fn ok(field: &str, value: Value) -> Self {
        let mut data = Map::new();
        data.insert(field.to_string(), value);
        Self {
            data: Value::Object(data),
            errors: Vec::new(),
        }
    }

    fn failed(field: &str, err: ApiError) -> Self {
        let mut data = Map::new();
        data.insert(field.to_string(), Value::Null);
        Self {
            data: Value::Object(data),
            errors: vec![err.into_graphql(field)],
        }
    }

    fn unparseable(err: serde_json::Error) -> Self {
        Self {
            data: Value::Null,
            errors: vec![ApiError::InvalidArgument(format!("malformed request: {err}"))
                .into_graphql("")],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Request-serving root. Cheap to clone; shares the frozen registry.
#[derive(Debug, Clone)]
pub struct ApiRoot {
    registry: Arc<ExtensionRegistry>,
    slots: CoreSlots,
}

impl ApiRoot {
    pub fn new(registry: Arc<ExtensionRegistry>, slots: CoreSlots) -> Self {
        Self { registry, slots }
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Parses and executes one JSON request.
    pub fn execute_json(&self, raw: &str) -> ApiResponse {
        match serde_json::from_str::<ApiRequest>(raw) {
            Ok(request) => self.execute(request),
            Err(err) => {
                warn!("event=api_execute module=graphql status=rejected error_code=malformed_request");
                ApiResponse::unparseable(err)
            }
        }
    }

    pub fn execute(&self, request: ApiRequest) -> ApiResponse {
        let started_at = Instant::now();
        let field = request.field();
        let result = self.resolve(request);

        match result {
            Ok(value) => {
                debug!(
                    "event=api_execute module=graphql status=ok field={} duration_ms={}",
                    field,
                    started_at.elapsed().as_millis()
                );
                ApiResponse::ok(field, value)
            }
            Err(err) => {
                debug!(
                    "event=api_execute module=graphql status=error field={} code={} duration_ms={}",
                    field,
                    err.code(),
                    started_at.elapsed().as_millis()
                );
                ApiResponse::failed(field, err)
            }
        }
    }

    fn resolve(&self, request: ApiRequest) -> ApiResult<Value> {
        let field = request.field();
        match request {
            ApiRequest::Threads(args) => to_value(self.threads(field)?.threads(&args)?),
            ApiRequest::Thread { id } => to_value(self.threads(field)?.thread(&id)?),
            ApiRequest::CreateThread { input } => {
                to_value(self.threads(field)?.create_thread(input)?)
            }
            ApiRequest::CloseThread { id } => to_value(self.threads(field)?.close_thread(&id)?),
            ApiRequest::Graphs => to_value(self.graphs(field)?.graphs()?),
            ApiRequest::Graph { id } => to_value(self.graphs(field)?.graph(&id)?),
            ApiRequest::CreateGraph { input } => {
                to_value(self.graphs(field)?.create_graph(input)?)
            }
        }
    }

    fn threads(&self, field: &'static str) -> ApiResult<Arc<dyn ThreadsResolver>> {
        self.registry
            .get(&self.slots.threads)
            .ok_or(ApiError::NotImplemented {
                field,
                capability: THREADS_SLOT,
            })
    }

    fn graphs(&self, field: &'static str) -> ApiResult<Arc<dyn GraphsResolver>> {
        self.registry
            .get(&self.slots.graphs)
            .ok_or(ApiError::NotImplemented {
                field,
                capability: GRAPHS_SLOT,
            })
    }
}

fn to_value(value: impl Serialize) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(ApiError::internal)
}
