//! Test database fixtures with a per-process name suffix.
//!
//! # Invariants
//! - The suffix is set at most once, before the first fixture is created.
//! - After the first fixture the suffix never changes; creating a fixture
//!   with no suffix set freezes it as empty.
//!
//! Test bootstrap code calls [`set_db_name_suffix`] (e.g. `"bgdb"`) so that
//! packages running in parallel never share a fixture database.

use crate::db::{open_db, DbError, Migration};
use log::info;
use once_cell::sync::OnceCell;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

static DB_NAME_SUFFIX: OnceCell<String> = OnceCell::new();
static FIXTURE_CREATED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuffixError {
    InvalidSuffix(String),
    AlreadySet { current: String },
    FixturesAlreadyCreated { current: String },
}

impl Display for SuffixError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSuffix(value) => write!(
                f,
                "database name suffix `{value}` must be non-empty [a-z0-9_]"
            ),
            Self::AlreadySet { current } => {
                write!(f, "database name suffix already set to `{current}`")
            }
            Self::FixturesAlreadyCreated { current } => write!(
                f,
                "fixtures already created with database name suffix `{current}`"
            ),
        }
    }
}

impl Error for SuffixError {}

/// Sets the process-wide fixture suffix.
pub fn set_db_name_suffix(value: &str) -> Result<(), SuffixError> {
    let value = value.trim();
    if value.is_empty()
        || !value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(SuffixError::InvalidSuffix(value.to_string()));
    }
    if FIXTURE_CREATED.load(Ordering::SeqCst) {
        return Err(SuffixError::FixturesAlreadyCreated {
            current: db_name_suffix().to_string(),
        });
    }

    DB_NAME_SUFFIX.set(value.to_string()).map_err(|_| {
        let current = db_name_suffix().to_string();
        if FIXTURE_CREATED.load(Ordering::SeqCst) {
            SuffixError::FixturesAlreadyCreated { current }
        } else {
            SuffixError::AlreadySet { current }
        }
    })?;
    info!("event=db_suffix_set module=dbtesting status=ok suffix={value}");
    Ok(())
}

/// Current suffix; empty when never set.
pub fn db_name_suffix() -> &'static str {
    DB_NAME_SUFFIX.get().map_or("", String::as_str)
}

/// `<base>-<suffix>`, or `<base>` when the suffix is empty.
pub fn fixture_db_name(base: &str) -> String {
    match db_name_suffix() {
        "" => base.to_string(),
        suffix => format!("{base}-{suffix}"),
    }
}

/// A migrated SQLite database created for one test.
#[derive(Debug)]
pub struct FixtureDb {
    pub name: String,
    pub path: PathBuf,
    pub conn: Connection,
}

/// Creates `<dir>/<fixture_db_name(base)>.sqlite3` and applies `migrations`.
///
/// An existing file at that path is replaced so every fixture starts empty.
pub fn create_fixture(
    dir: impl AsRef<Path>,
    base: &str,
    migrations: &[Migration],
) -> Result<FixtureDb, DbError> {
    // Flag before cell: a concurrent set that loses the cell must see the flag.
    FIXTURE_CREATED.store(true, Ordering::SeqCst);
    DB_NAME_SUFFIX.get_or_init(String::new);

    let name = fixture_db_name(base);
    let path = dir.as_ref().join(format!("{name}.sqlite3"));
    if path.exists() {
        std::fs::remove_file(&path)?;
    }

    let conn = open_db(&path, migrations)?;
    info!("event=fixture_create module=dbtesting status=ok name={name}");
    Ok(FixtureDb { name, path, conn })
}
