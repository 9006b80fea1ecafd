//! Executor and dialect behaviour against a real engine.
//!
//! SQLite has none of DM's catalog views, which makes it a convenient engine
//! for checking how catalog failures, DDL errors and identity insert
//! failures surface through the dialect.

use oxide_dm::prelude::*;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use tokio::sync::Mutex;

async fn create_test_pool() -> AnyPool {
    sqlx::any::install_default_drivers();
    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");
    pool.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
        .await
        .unwrap();
    pool.execute("INSERT INTO users (name) VALUES ('alice'), ('bob'), ('carol')")
        .await
        .unwrap();
    pool
}

#[tokio::test]
async fn test_executor_round_trip() {
    let pool = create_test_pool().await;

    let count = pool
        .query_count("SELECT COUNT(*) FROM users WHERE name = ?", &["bob"])
        .await
        .unwrap();
    assert_eq!(count, 1);

    let name = pool
        .query_string("SELECT name FROM users WHERE id = 1")
        .await
        .unwrap();
    assert_eq!(name.as_deref(), Some("alice"));

    let missing = pool
        .query_string("SELECT name FROM users WHERE id = 99")
        .await
        .unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn test_pagination_suffix_runs() {
    let pool = create_test_pool().await;
    let suffix = limit_and_offset_sql(Some(&1), Some(&"1")).unwrap();
    let sql = format!("SELECT name FROM users ORDER BY id{suffix}");

    let name = pool.query_string(&sql).await.unwrap();
    assert_eq!(name.as_deref(), Some("bob"));
}

#[tokio::test]
async fn test_catalog_failures_read_as_absent() {
    let dialect = DmDialect::new(create_test_pool().await);

    assert!(!dialect.has_table("MAIN.users").await);
    assert!(!dialect.has_column("MAIN.users", "name").await);
    assert!(!dialect.has_index("MAIN.users", "idx").await);
    assert!(!dialect.has_foreign_key("MAIN.users", "fk").await);

    // Unqualified names need the current schema, which SQLite cannot report.
    assert!(!dialect.has_table("users").await);
    assert!(dialect.current_database().await.is_err());
}

#[tokio::test]
async fn test_try_variants_surface_failures() {
    let dialect = DmDialect::new(create_test_pool().await);
    let catalog = dialect.catalog();

    assert!(matches!(
        catalog.try_has_table("MAIN.users").await,
        Err(DialectError::Database(_))
    ));
    assert!(matches!(
        catalog.try_has_foreign_key("MAIN.users", "fk").await,
        Err(DialectError::Database(_))
    ));
}

#[tokio::test]
async fn test_remove_index_is_schema_scoped() {
    let pool = create_test_pool().await;
    pool.execute("CREATE INDEX idx_users_name ON users (name)")
        .await
        .unwrap();
    let dialect = DmDialect::new(pool);

    dialect
        .remove_index("main.users", "idx_users_name")
        .await
        .unwrap();
    let remaining = dialect
        .db()
        .query_count(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?",
            &["idx_users_name"],
        )
        .await
        .unwrap();
    assert_eq!(remaining, 0);

    assert!(matches!(
        dialect.remove_index("main.users", "idx_users_name").await,
        Err(DialectError::Database(_))
    ));
}

#[tokio::test]
async fn test_modify_column_error_is_propagated() {
    let dialect = DmDialect::new(create_test_pool().await);
    let result = dialect
        .modify_column("\"users\"", "\"name\"", "VARCHAR(64)")
        .await;
    assert!(matches!(result, Err(DialectError::Database(_))));
}

#[tokio::test]
async fn test_insert_without_explicit_key_commits() {
    let pool = create_test_pool().await;
    let mut callbacks = CreateCallbacks::new();
    register_identity_insert_hooks(&mut callbacks);

    let id = FieldDescriptor::new("id", ColumnKind::Int64)
        .primary_key()
        .tag("AUTO_INCREMENT", "AUTO_INCREMENT");
    let mut scope = CreateScope::new(DM_DIALECT_NAME, "users", vec![id]);

    let tx: SharedTransaction = Mutex::new(pool.begin().await.unwrap());
    create_in_transaction(&callbacks, &mut scope, &tx, |db| async move {
        db.execute("INSERT INTO users (name) VALUES ('dave')").await
    })
    .await
    .unwrap();
    tx.into_inner().commit().await.unwrap();

    let count = pool
        .query_count("SELECT COUNT(*) FROM users WHERE name = ?", &["dave"])
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_identity_insert_failure_surfaces_through_insert() {
    let pool = create_test_pool().await;
    let mut callbacks = CreateCallbacks::new();
    register_identity_insert_hooks(&mut callbacks);

    let id = FieldDescriptor::new("id", ColumnKind::Int64)
        .primary_key()
        .tag("AUTO_INCREMENT", "AUTO_INCREMENT")
        .with_value();
    let mut scope = CreateScope::new(DM_DIALECT_NAME, "users", vec![id]);

    let tx: SharedTransaction = Mutex::new(pool.begin().await.unwrap());
    let result = create_in_transaction(&callbacks, &mut scope, &tx, |db| async move {
        db.execute("INSERT INTO users (id, name) VALUES (42, 'eve')").await
    })
    .await;
    assert!(matches!(result, Err(DialectError::Database(_))));
    assert!(scope.identity_insert().is_empty());
    tx.into_inner().rollback().await.unwrap();

    let count = pool
        .query_count("SELECT COUNT(*) FROM users WHERE id = ?", &["42"])
        .await
        .unwrap();
    assert_eq!(count, 0);
}
