//! `Threads` capability interface.

use super::error::ApiResult;
use serde::{Deserialize, Serialize};

/// Page size used when a request omits `first`.
pub const DEFAULT_THREADS_PAGE: u32 = 20;
/// Largest accepted `first`.
pub const MAX_THREADS_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreadState {
    Open,
    Closed,
}

impl ThreadState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OPEN" => Some(Self::Open),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    /// Opaque node ID.
    pub id: String,
    /// Per-repository sequence number, starting at 1.
    pub number: i64,
    pub repository: String,
    pub title: String,
    pub state: ThreadState,
    pub created_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    /// ID of the last node on this page; pass it as `after` for the next one.
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadConnection {
    pub nodes: Vec<Thread>,
    pub total_count: u64,
    pub page_info: PageInfo,
}

/// Arguments of the `threads` query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadsArgs {
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub state: Option<ThreadState>,
    #[serde(default)]
    pub first: Option<u32>,
    /// Return only nodes after this node ID.
    #[serde(default)]
    pub after: Option<String>,
}

impl ThreadsArgs {
    /// `first` clamped to `1..=MAX_THREADS_PAGE`.
    pub fn page_size(&self) -> u32 {
        self.first
            .unwrap_or(DEFAULT_THREADS_PAGE)
            .clamp(1, MAX_THREADS_PAGE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateThreadInput {
    pub repository: String,
    pub title: String,
}

/// Resolver contributed by a provider for the `Threads` slot.
pub trait ThreadsResolver: Send + Sync {
    fn threads(&self, args: &ThreadsArgs) -> ApiResult<ThreadConnection>;
    fn thread(&self, id: &str) -> ApiResult<Option<Thread>>;
    fn create_thread(&self, input: CreateThreadInput) -> ApiResult<Thread>;
    /// Closing an already closed thread returns it unchanged.
    fn close_thread(&self, id: &str) -> ApiResult<Thread>;
}

#[cfg(test)]
mod tests {
    use super::{ThreadState, ThreadsArgs, MAX_THREADS_PAGE};

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(ThreadsArgs::default().page_size(), 20);
        let zero = ThreadsArgs {
            first: Some(0),
            ..ThreadsArgs::default()
        };
        assert_eq!(zero.page_size(), 1);
        let huge = ThreadsArgs {
            first: Some(10_000),
            ..ThreadsArgs::default()
        };
        assert_eq!(huge.page_size(), MAX_THREADS_PAGE);
    }

    #[test]
    fn state_round_trips_through_storage_string() {
        for state in [ThreadState::Open, ThreadState::Closed] {
            assert_eq!(ThreadState::parse(state.as_str()), Some(state));
        }
        assert_eq!(ThreadState::parse("open"), None);
    }
}
