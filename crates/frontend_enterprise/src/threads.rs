//! SQLite-backed `Threads` provider.
//!
//! # Invariants
//! - Thread numbers are sequential per repository, starting at 1.
//! - Node IDs are opaque `Thread:<rowid>` values.
//! - Closing is idempotent.

use frontend_core::db::{open_db, open_db_in_memory, DbError, Migration};
use frontend_core::graphql::relay::{marshal_id, unmarshal_id};
use frontend_core::graphql::{
    ApiError, ApiResult, CreateThreadInput, PageInfo, Thread, ThreadConnection, ThreadState,
    ThreadsArgs, ThreadsResolver,
};
use frontend_core::{
    CoreSlots, ExtensionProvider, ExtensionRegistryBuilder, ProviderContext, ProviderError,
};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

const PROVIDER_NAME: &str = "enterprise.threads";
const THREADS_DB_FILE_NAME: &str = "threads.sqlite3";
const NODE_KIND: &str = "Thread";
const MAX_TITLE_CHARS: usize = 200;

/// Schema owned by this provider.
pub const THREADS_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("../migrations/0001_threads.sql"),
}];

// host/owner/name style, e.g. `github.com/acme/api`.
static REPOSITORY_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*(/[A-Za-z0-9][A-Za-z0-9._-]*)+$")
        .expect("valid repository name regex")
});

const THREAD_COLUMNS: &str = "id, repository, number, title, state, created_at_ms";

/// Threads resolver over one SQLite connection.
pub struct SqliteThreads {
    conn: Mutex<Connection>,
}

impl SqliteThreads {
    /// Wraps a connection that already has [`THREADS_MIGRATIONS`] applied.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Opens storage under `ctx.data_dir()`, or in memory when unset.
    pub fn open(ctx: &ProviderContext) -> Result<Self, DbError> {
        let conn = match ctx.data_dir() {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                open_db(dir.join(THREADS_DB_FILE_NAME), THREADS_MIGRATIONS)?
            }
            None => open_db_in_memory(THREADS_MIGRATIONS)?,
        };
        Ok(Self::new(conn))
    }

    fn lock(&self) -> ApiResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ApiError::Internal("threads store lock poisoned".to_string()))
    }

    fn find_by_rowid(conn: &Connection, rowid: i64) -> ApiResult<Option<Thread>> {
        conn.query_row(
            &format!("SELECT {THREAD_COLUMNS} FROM threads WHERE id = ?1;"),
            params![rowid],
            map_thread,
        )
        .optional()
        .map_err(ApiError::internal)
    }
}

impl ThreadsResolver for SqliteThreads {
    fn threads(&self, args: &ThreadsArgs) -> ApiResult<ThreadConnection> {
        if let Some(repository) = args.repository.as_deref() {
            validate_repository(repository)?;
        }
        let repository = args.repository.as_deref().map(str::trim);
        let state = args.state.map(ThreadState::as_str);
        let after = args.after.as_deref().map(parse_rowid).transpose()?;
        let page_size = args.page_size();

        let conn = self.lock()?;
        let total_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM threads
                 WHERE (?1 IS NULL OR repository = ?1) AND (?2 IS NULL OR state = ?2);",
                params![repository, state],
                |row| row.get(0),
            )
            .map_err(ApiError::internal)?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {THREAD_COLUMNS} FROM threads
                 WHERE (?1 IS NULL OR repository = ?1) AND (?2 IS NULL OR state = ?2)
                   AND (?3 IS NULL OR id > ?3)
                 ORDER BY id ASC
                 LIMIT ?4;"
            ))
            .map_err(ApiError::internal)?;
        let mut nodes = stmt
            .query_map(
                params![repository, state, after, i64::from(page_size) + 1],
                map_thread,
            )
            .map_err(ApiError::internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(ApiError::internal)?;

        let has_next_page = nodes.len() > page_size as usize;
        nodes.truncate(page_size as usize);
        let end_cursor = nodes.last().map(|thread| thread.id.clone());
        Ok(ThreadConnection {
            nodes,
            total_count: u64::try_from(total_count).unwrap_or_default(),
            page_info: PageInfo {
                has_next_page,
                end_cursor,
            },
        })
    }

    fn thread(&self, id: &str) -> ApiResult<Option<Thread>> {
        let rowid = parse_rowid(id)?;
        let conn = self.lock()?;
        Self::find_by_rowid(&conn, rowid)
    }

    fn create_thread(&self, input: CreateThreadInput) -> ApiResult<Thread> {
        let repository = input.repository.trim();
        validate_repository(repository)?;
        let title = input.title.trim();
        if title.is_empty() {
            return Err(ApiError::InvalidArgument("title must not be empty".to_string()));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(ApiError::InvalidArgument(format!(
                "title must be at most {MAX_TITLE_CHARS} characters"
            )));
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(ApiError::internal)?;
        let number: i64 = tx
            .query_row(
                "SELECT COALESCE(MAX(number), 0) + 1 FROM threads WHERE repository = ?1;",
                params![repository],
                |row| row.get(0),
            )
            .map_err(ApiError::internal)?;
        tx.execute(
            "INSERT INTO threads (repository, number, title, state, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                repository,
                number,
                title,
                ThreadState::Open.as_str(),
                now_ms()
            ],
        )
        .map_err(ApiError::internal)?;
        let rowid = tx.last_insert_rowid();
        let thread = Self::find_by_rowid(&tx, rowid)?
            .ok_or_else(|| ApiError::Internal("inserted thread vanished".to_string()))?;
        tx.commit().map_err(ApiError::internal)?;

        info!(
            "event=thread_create module=threads status=ok number={} repository={}",
            thread.number, thread.repository
        );
        Ok(thread)
    }

    fn close_thread(&self, id: &str) -> ApiResult<Thread> {
        let rowid = parse_rowid(id)?;
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE threads SET state = ?1 WHERE id = ?2;",
                params![ThreadState::Closed.as_str(), rowid],
            )
            .map_err(ApiError::internal)?;
        if changed == 0 {
            return Err(ApiError::NotFound(format!("thread {id}")));
        }
        Self::find_by_rowid(&conn, rowid)?
            .ok_or_else(|| ApiError::NotFound(format!("thread {id}")))
    }
}

/// Fills the `Threads` slot.
pub struct ThreadsProvider {
    context: ProviderContext,
}

impl ThreadsProvider {
    pub fn new(context: ProviderContext) -> Self {
        Self { context }
    }
}

impl ExtensionProvider<CoreSlots> for ThreadsProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn install(
        &self,
        registry: &mut ExtensionRegistryBuilder,
        slots: &CoreSlots,
    ) -> Result<(), ProviderError> {
        let resolver = SqliteThreads::open(&self.context).map_err(|err| {
            ProviderError::with_source(PROVIDER_NAME, "failed to open threads storage", err)
        })?;
        registry.register(&slots.threads, Arc::new(resolver));
        Ok(())
    }
}

fn map_thread(row: &Row<'_>) -> rusqlite::Result<Thread> {
    let rowid: i64 = row.get(0)?;
    let state: String = row.get(4)?;
    let state = ThreadState::parse(&state).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown thread state `{state}`").into(),
        )
    })?;
    Ok(Thread {
        id: marshal_id(NODE_KIND, rowid),
        repository: row.get(1)?,
        number: row.get(2)?,
        title: row.get(3)?,
        state,
        created_at_ms: row.get(5)?,
    })
}

fn parse_rowid(id: &str) -> ApiResult<i64> {
    unmarshal_id(NODE_KIND, id)?
        .parse::<i64>()
        .map_err(|_| ApiError::InvalidArgument(format!("`{id}` is not a valid {NODE_KIND} ID")))
}

fn validate_repository(value: &str) -> ApiResult<()> {
    if REPOSITORY_NAME_RE.is_match(value.trim()) {
        Ok(())
    } else {
        Err(ApiError::InvalidArgument(format!(
            "repository name is invalid: {value}"
        )))
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{parse_rowid, validate_repository, SqliteThreads, THREADS_MIGRATIONS};
    use frontend_core::db::open_db_in_memory;
    use frontend_core::graphql::relay::marshal_id;
    use frontend_core::graphql::{
        ApiError, CreateThreadInput, ThreadState, ThreadsArgs, ThreadsResolver,
    };

    fn resolver() -> SqliteThreads {
        SqliteThreads::new(open_db_in_memory(THREADS_MIGRATIONS).expect("in-memory db"))
    }

    fn create(resolver: &SqliteThreads, repository: &str, title: &str) -> String {
        resolver
            .create_thread(CreateThreadInput {
                repository: repository.to_string(),
                title: title.to_string(),
            })
            .expect("create thread")
            .id
    }

    #[test]
    fn numbers_are_sequential_per_repository() {
        let threads = resolver();
        create(&threads, "github.com/acme/api", "one");
        create(&threads, "github.com/acme/web", "other repo");
        let second = create(&threads, "github.com/acme/api", "two");

        let thread = threads.thread(&second).expect("lookup").expect("exists");
        assert_eq!(thread.number, 2);
        assert_eq!(thread.state, ThreadState::Open);
    }

    #[test]
    fn paginates_and_filters() {
        let threads = resolver();
        for n in 0..5 {
            create(&threads, "github.com/acme/api", &format!("thread {n}"));
        }
        create(&threads, "github.com/acme/web", "elsewhere");

        let page = threads
            .threads(&ThreadsArgs {
                repository: Some("github.com/acme/api".to_string()),
                first: Some(2),
                ..ThreadsArgs::default()
            })
            .expect("page");
        assert_eq!(page.total_count, 5);
        assert_eq!(page.nodes.len(), 2);
        assert!(page.page_info.has_next_page);

        let all = threads.threads(&ThreadsArgs::default()).expect("all");
        assert_eq!(all.total_count, 6);
        assert!(!all.page_info.has_next_page);
    }

    #[test]
    fn after_cursor_walks_every_page() {
        let threads = resolver();
        let created: Vec<String> = (0..5)
            .map(|n| create(&threads, "github.com/acme/api", &format!("thread {n}")))
            .collect();

        let mut seen = Vec::new();
        let mut after = None;
        loop {
            let page = threads
                .threads(&ThreadsArgs {
                    first: Some(2),
                    after: after.clone(),
                    ..ThreadsArgs::default()
                })
                .expect("page");
            assert_eq!(page.total_count, 5);
            seen.extend(page.nodes.iter().map(|thread| thread.id.clone()));
            if !page.page_info.has_next_page {
                break;
            }
            after = page.page_info.end_cursor;
            assert!(after.is_some());
        }
        assert_eq!(seen, created);

        let past_end = threads
            .threads(&ThreadsArgs {
                after: created.last().cloned(),
                ..ThreadsArgs::default()
            })
            .expect("past end");
        assert!(past_end.nodes.is_empty());
        assert_eq!(past_end.page_info.end_cursor, None);

        let err = threads
            .threads(&ThreadsArgs {
                after: Some(marshal_id("Graph", 1)),
                ..ThreadsArgs::default()
            })
            .expect_err("foreign cursor");
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[test]
    fn close_is_idempotent_and_filterable() {
        let threads = resolver();
        let id = create(&threads, "github.com/acme/api", "to close");
        create(&threads, "github.com/acme/api", "stays open");

        assert_eq!(
            threads.close_thread(&id).expect("close").state,
            ThreadState::Closed
        );
        assert_eq!(
            threads.close_thread(&id).expect("close again").state,
            ThreadState::Closed
        );

        let closed = threads
            .threads(&ThreadsArgs {
                state: Some(ThreadState::Closed),
                ..ThreadsArgs::default()
            })
            .expect("closed");
        assert_eq!(closed.total_count, 1);
        assert_eq!(closed.nodes[0].id, id);
    }

    #[test]
    fn closing_unknown_thread_is_not_found() {
        let threads = resolver();
        let err = threads
            .close_thread(&marshal_id("Thread", 99))
            .expect_err("unknown");
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn rejects_invalid_input() {
        let threads = resolver();
        let err = threads
            .create_thread(CreateThreadInput {
                repository: "not a repo".to_string(),
                title: "x".to_string(),
            })
            .expect_err("bad repository");
        assert!(matches!(err, ApiError::InvalidArgument(_)));

        let err = threads
            .create_thread(CreateThreadInput {
                repository: "github.com/acme/api".to_string(),
                title: "   ".to_string(),
            })
            .expect_err("blank title");
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[test]
    fn repository_pattern_and_id_parsing() {
        assert!(validate_repository("github.com/acme/api").is_ok());
        assert!(validate_repository("acme/api").is_ok());
        assert!(validate_repository("api").is_err());
        assert!(validate_repository("/acme/api").is_err());

        assert_eq!(parse_rowid(&marshal_id("Thread", 7)).expect("rowid"), 7);
        assert!(parse_rowid(&marshal_id("Thread", "seven")).is_err());
        assert!(parse_rowid(&marshal_id("Graph", 7)).is_err());
    }
}
