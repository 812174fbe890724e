//! Enterprise capability providers for the core API layer.
//!
//! Each provider fills disjoint slots, so install order does not affect the
//! resulting registry. [`providers`] fixes the order anyway so startup logs
//! are stable.

pub mod graphs;
pub mod threads;

pub use graphs::{GraphsProvider, InMemoryGraphs};
pub use threads::{SqliteThreads, ThreadsProvider, THREADS_MIGRATIONS};

use frontend_core::{BoxedProvider, ProviderContext};

/// Enterprise providers in install order: threads, then graphs.
pub fn providers(context: &ProviderContext) -> Vec<BoxedProvider> {
    vec![
        Box::new(ThreadsProvider::new(context.clone())),
        Box::new(GraphsProvider),
    ]
}
