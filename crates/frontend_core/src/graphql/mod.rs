//! API-serving layer: capability interfaces, slots, and request routing.
//!
//! Enterprise-only capabilities (`Threads`, `Graphs`) are declared here as
//! traits and filled by providers at startup. Without a provider the
//! corresponding fields answer `NOT_IMPLEMENTED`.

mod error;
pub mod graphs;
pub mod relay;
mod schema;
mod slots;
pub mod threads;

pub use error::{
    ApiError, ApiResult, ErrorExtensions, GraphqlError, CODE_INTERNAL, CODE_INVALID_ARGUMENT,
    CODE_NOT_FOUND, CODE_NOT_IMPLEMENTED,
};
pub use graphs::{CreateGraphInput, Graph, GraphsResolver};
pub use schema::{ApiRequest, ApiResponse, ApiRoot};
pub use slots::{CoreSlots, ProviderContext, GRAPHS_SLOT, THREADS_SLOT};
pub use threads::{
    CreateThreadInput, PageInfo, Thread, ThreadConnection, ThreadState, ThreadsArgs,
    ThreadsResolver,
};
