//! In-memory `Graphs` provider.

use frontend_core::graphql::relay::{marshal_id, unmarshal_id};
use frontend_core::graphql::{ApiError, ApiResult, CreateGraphInput, Graph, GraphsResolver};
use frontend_core::{CoreSlots, ExtensionProvider, ExtensionRegistryBuilder, ProviderError};
use log::info;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

const PROVIDER_NAME: &str = "enterprise.graphs";
const NODE_KIND: &str = "Graph";
const MAX_NAME_CHARS: usize = 100;

/// Graph definitions kept for the process lifetime.
#[derive(Debug, Default)]
pub struct InMemoryGraphs {
    // Keyed by graph UUID.
    graphs: RwLock<BTreeMap<Uuid, Graph>>,
}

impl InMemoryGraphs {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_key(id: &str) -> ApiResult<Uuid> {
        let local = unmarshal_id(NODE_KIND, id)?;
        Uuid::parse_str(&local)
            .map_err(|_| ApiError::InvalidArgument(format!("`{id}` is not a valid {NODE_KIND} ID")))
    }
}

impl GraphsResolver for InMemoryGraphs {
    fn graphs(&self) -> ApiResult<Vec<Graph>> {
        let graphs = self
            .graphs
            .read()
            .map_err(|_| ApiError::Internal("graphs lock poisoned".to_string()))?;
        let mut all: Vec<Graph> = graphs.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    fn graph(&self, id: &str) -> ApiResult<Option<Graph>> {
        let key = Self::parse_key(id)?;
        let graphs = self
            .graphs
            .read()
            .map_err(|_| ApiError::Internal("graphs lock poisoned".to_string()))?;
        Ok(graphs.get(&key).cloned())
    }

    fn create_graph(&self, input: CreateGraphInput) -> ApiResult<Graph> {
        let name = input.name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
            return Err(ApiError::InvalidArgument(format!(
                "graph name must be 1..={MAX_NAME_CHARS} characters"
            )));
        }

        let mut graphs = self
            .graphs
            .write()
            .map_err(|_| ApiError::Internal("graphs lock poisoned".to_string()))?;
        if graphs.values().any(|graph| graph.name == name) {
            return Err(ApiError::InvalidArgument(format!(
                "graph name already in use: {name}"
            )));
        }

        let key = Uuid::new_v4();
        let graph = Graph {
            id: marshal_id(NODE_KIND, key),
            name: name.to_string(),
            description: input
                .description
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            spec: input.spec,
            url: format!("/graphs/{key}"),
            edit_url: format!("/graphs/{key}/edit"),
        };
        graphs.insert(key, graph.clone());
        info!("event=graph_create module=graphs status=ok graph_id={key}");
        Ok(graph)
    }
}

/// Fills the `Graphs` slot.
#[derive(Debug, Default)]
pub struct GraphsProvider;

impl ExtensionProvider<CoreSlots> for GraphsProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn install(
        &self,
        registry: &mut ExtensionRegistryBuilder,
        slots: &CoreSlots,
    ) -> Result<(), ProviderError> {
        registry.register(&slots.graphs, Arc::new(InMemoryGraphs::new()));
        Ok(())
    }
}
