//! Background-package style bootstrap: fixed fixture suffix plus a secrets
//! gate that aborts the test process when it cannot initialize.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use frontend_core::db::Migration;
use frontend_core::dbtesting::{create_fixture, db_name_suffix, set_db_name_suffix, SuffixError};
use frontend_core::secrets::{self, SecretsConfig};
use once_cell::sync::Lazy;
use tempfile::TempDir;

const SCHEMA: &[Migration] = &[Migration {
    version: 1,
    sql: "CREATE TABLE jobs (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
}];

static BOOTSTRAP: Lazy<TempDir> = Lazy::new(|| {
    set_db_name_suffix("bgdb").expect("suffix is set once per process");

    let dir = tempfile::tempdir().expect("tempdir");
    let key_path = dir.path().join("secret.key");
    std::fs::write(&key_path, STANDARD.encode([42u8; 32])).expect("write key");
    if let Err(err) = secrets::init(SecretsConfig::from_key_file(&key_path)) {
        eprintln!("Failed to init secrets package: {err}");
        std::process::exit(1);
    }
    dir
});

#[test]
fn fixtures_incorporate_suffix() {
    let dir = &*BOOTSTRAP;
    let first = create_fixture(dir.path(), "frontend-test", SCHEMA).expect("first fixture");
    let second = create_fixture(dir.path(), "frontend-jobs", SCHEMA).expect("second fixture");

    assert_eq!(first.name, "frontend-test-bgdb");
    assert_eq!(second.name, "frontend-jobs-bgdb");
    assert!(first.path.ends_with("frontend-test-bgdb.sqlite3"));

    first
        .conn
        .execute("INSERT INTO jobs (name) VALUES ('reindex');", [])
        .expect("fixture is migrated");
}

#[test]
fn suffix_is_frozen_once_fixtures_exist() {
    let dir = &*BOOTSTRAP;
    create_fixture(dir.path(), "frontend-frozen", SCHEMA).expect("fixture");

    let err = set_db_name_suffix("otherdb").expect_err("late change must be rejected");
    assert_eq!(
        err,
        SuffixError::FixturesAlreadyCreated {
            current: "bgdb".to_string()
        }
    );
    assert_eq!(db_name_suffix(), "bgdb");
}

#[test]
fn secret_material_is_available_after_bootstrap() {
    Lazy::force(&BOOTSTRAP);
    let store = secrets::process_store().expect("gate passed during bootstrap");
    assert_eq!(store.encryption_key(), &[42u8; 32]);
}

#[test]
fn recreated_fixture_starts_empty() {
    let dir = &*BOOTSTRAP;
    let fixture = create_fixture(dir.path(), "frontend-reset", SCHEMA).expect("fixture");
    fixture
        .conn
        .execute("INSERT INTO jobs (name) VALUES ('stale');", [])
        .expect("insert");
    drop(fixture);

    let fresh = create_fixture(dir.path(), "frontend-reset", SCHEMA).expect("recreate");
    let count: i64 = fresh
        .conn
        .query_row("SELECT COUNT(*) FROM jobs;", [], |row| row.get(0))
        .expect("count");
    assert_eq!(count, 0);
}
