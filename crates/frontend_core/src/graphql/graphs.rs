//! `Graphs` capability interface.

use super::error::ApiResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub spec: String,
    pub url: String,
    #[serde(rename = "editURL")]
    pub edit_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateGraphInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub spec: String,
}

pub trait GraphsResolver: Send + Sync {
    /// All graphs, ordered by name.
    fn graphs(&self) -> ApiResult<Vec<Graph>>;
    fn graph(&self, id: &str) -> ApiResult<Option<Graph>>;
    fn create_graph(&self, input: CreateGraphInput) -> ApiResult<Graph>;
}
