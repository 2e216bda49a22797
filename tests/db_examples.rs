use angstrom::{project, ConnectionScope, Db, DbConfig, Error, FieldMapping, Params, Value};
use anyhow::Result;
use std::fs;
use tempfile::TempDir;

// Helper that lays out a SQL directory and a file-backed database in one temp dir
fn create_test_db() -> Result<(Db, TempDir)> {
    let dir = tempfile::tempdir()?;
    let sql_dir = dir.path().join("sql");
    fs::create_dir(&sql_dir)?;

    write_sql(&dir, "create_table.sql", r#"
        CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        );
        CREATE INDEX idx_users_name ON users(name);
    "#)?;
    write_sql(&dir, "insert.sql", "INSERT INTO users (id, name) VALUES (:id, :name)")?;
    write_sql(&dir, "insert_positional.sql", "INSERT INTO users (id, name) VALUES (?, ?)")?;
    write_sql(&dir, "select_all.sql", "SELECT id, name FROM users")?;
    write_sql(&dir, "select_by_id.sql", "SELECT id, name FROM users WHERE id = :id")?;
    write_sql(&dir, "count.sql", "SELECT count(*) AS n FROM users")?;

    let config = DbConfig::new(
        dir.path().join("app.db").to_string_lossy(),
        &sql_dir,
    );
    let db = Db::from_config(&config);
    db.execute_script("create_table.sql")?;
    Ok((db, dir))
}

fn write_sql(dir: &TempDir, name: &str, sql: &str) -> Result<()> {
    fs::write(dir.path().join("sql").join(name), sql)?;
    Ok(())
}

fn user(id: i64, name: &str) -> Params {
    Params::new().with_value("id", id).with_value("name", name)
}

fn count(db: &Db) -> Result<i64> {
    let rows = db.execute_query("count.sql", None, ConnectionScope::Private)?;
    Ok(rows[0].get_by_name("n").and_then(Value::as_integer).unwrap_or(-1))
}

#[test]
fn test_round_trip() -> Result<()> {
    let (db, _dir) = create_test_db()?;

    let changed =
        db.execute_many("insert.sql", [user(1, "a"), user(2, "b")], ConnectionScope::Private)?;
    assert_eq!(changed, 2);

    let rows = db.execute_query("select_all.sql", None, ConnectionScope::Private)?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get_by_name("id"), Some(&Value::Integer(1)));
    assert_eq!(rows[0].get_by_name("name"), Some(&Value::Text("a".into())));
    assert_eq!(rows[1].get(0), Some(&Value::Integer(2)));
    assert_eq!(rows[1].get(1), Some(&Value::Text("b".into())));

    let by_id = Params::new().with_value("id", 2);
    let one = db.execute_query("select_by_id.sql", Some(&by_id), ConnectionScope::Private)?;
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].get_by_name("name").and_then(Value::as_text), Some("b"));
    Ok(())
}

#[test]
fn test_positional_batch() -> Result<()> {
    let (db, _dir) = create_test_db()?;
    let sets = vec![Params::positional([Value::from(10), Value::from("x")])];
    db.execute_many("insert_positional.sql", &sets, ConnectionScope::Private)?;
    assert_eq!(count(&db)?, 1);
    Ok(())
}

#[test]
fn test_empty_batch_commits_nothing() -> Result<()> {
    let (db, _dir) = create_test_db()?;
    let changed = db.execute_many("insert.sql", Vec::<Params>::new(), ConnectionScope::Private)?;
    assert_eq!(changed, 0);
    assert_eq!(count(&db)?, 0);
    Ok(())
}

#[test]
fn test_duplicate_key_rolls_back_whole_batch() -> Result<()> {
    let (db, _dir) = create_test_db()?;

    let err = db
        .execute_many("insert.sql", [user(1, "a"), user(1, "dup")], ConnectionScope::Private)
        .unwrap_err();
    assert!(matches!(err, Error::Statement(_)));
    assert_eq!(count(&db)?, 0);
    Ok(())
}

#[test]
fn test_joined_transaction_commits_together() -> Result<()> {
    let (db, _dir) = create_test_db()?;

    let tx = db.start_transaction()?;
    db.execute_many("insert.sql", [user(1, "a")], tx.join())?;
    db.execute_many("insert.sql", [user(2, "b")], tx.join())?;
    let seen = db.execute_query("select_all.sql", None, tx.join())?;
    assert_eq!(seen.len(), 2);
    tx.commit()?;

    assert_eq!(count(&db)?, 2);
    Ok(())
}

#[test]
fn test_joined_transaction_rolls_back_together() -> Result<()> {
    let (db, _dir) = create_test_db()?;

    let tx = db.start_transaction()?;
    let result = tx.run(|conn| -> angstrom::Result<()> {
        db.execute_many("insert.sql", [user(1, "a")], ConnectionScope::Joined(conn))?;
        db.execute_many("insert.sql", [user(2, "a")], ConnectionScope::Joined(conn))?;
        Ok(())
    });
    assert!(matches!(result, Err(Error::Statement(_))));
    assert_eq!(count(&db)?, 0);
    Ok(())
}

#[test]
fn test_joined_call_does_not_commit_on_its_own() -> Result<()> {
    let (db, _dir) = create_test_db()?;
    {
        let tx = db.start_transaction()?;
        db.execute_many("insert.sql", [user(1, "a")], tx.join())?;
    }
    assert_eq!(count(&db)?, 0);
    Ok(())
}

fn table_exists(db: &Db, dir: &TempDir, table: &str) -> Result<bool> {
    write_sql(dir, "table_exists.sql", "SELECT name FROM sqlite_master WHERE name = :name")?;
    let params = Params::new().with_value("name", table);
    let rows = db.execute_query("table_exists.sql", Some(&params), ConnectionScope::Private)?;
    Ok(!rows.is_empty())
}

#[test]
fn test_failed_script_keeps_statements_before_the_error() -> Result<()> {
    let (db, dir) = create_test_db()?;
    write_sql(&dir, "broken.sql", "CREATE TABLE extra (x INTEGER); NOT VALID SQL;")?;

    // Scripts run in autocommit mode, so each statement before the error is durable.
    assert!(matches!(db.execute_script("broken.sql"), Err(Error::Statement(_))));
    assert!(table_exists(&db, &dir, "extra")?);
    Ok(())
}

#[test]
fn test_script_with_own_transaction() -> Result<()> {
    let (db, dir) = create_test_db()?;
    write_sql(&dir, "wrapped.sql", r#"
        BEGIN;
        CREATE TABLE a (x INTEGER);
        INSERT INTO a VALUES (1);
        COMMIT;
    "#)?;
    db.execute_script("wrapped.sql")?;
    assert!(table_exists(&db, &dir, "a")?);
    Ok(())
}

#[test]
fn test_script_leaving_transaction_open() -> Result<()> {
    let (db, dir) = create_test_db()?;
    write_sql(&dir, "open_ok.sql", "BEGIN; CREATE TABLE kept (x INTEGER);")?;
    write_sql(&dir, "open_bad.sql", "BEGIN; CREATE TABLE dropped (x INTEGER); NOT VALID SQL;")?;

    db.execute_script("open_ok.sql")?;
    assert!(table_exists(&db, &dir, "kept")?);

    assert!(matches!(db.execute_script("open_bad.sql"), Err(Error::Statement(_))));
    assert!(!table_exists(&db, &dir, "dropped")?);
    Ok(())
}

#[test]
fn test_script_with_stray_commit() -> Result<()> {
    let (db, dir) = create_test_db()?;
    write_sql(&dir, "stray.sql", "CREATE TABLE c (x INTEGER); COMMIT;")?;

    // The error comes from the script's own COMMIT; table c was already autocommitted.
    let err = db.execute_script("stray.sql").unwrap_err();
    assert!(err.to_string().contains("no transaction is active"));
    assert!(table_exists(&db, &dir, "c")?);
    Ok(())
}

#[test]
fn test_script_can_vacuum_and_switch_journal_mode() -> Result<()> {
    let (db, dir) = create_test_db()?;
    write_sql(&dir, "maintenance.sql", "CREATE TABLE b (x INTEGER); VACUUM;")?;
    write_sql(&dir, "wal.sql", "PRAGMA journal_mode = WAL;")?;
    write_sql(&dir, "journal_mode.sql", "PRAGMA journal_mode")?;

    db.execute_script("maintenance.sql")?;
    assert!(table_exists(&db, &dir, "b")?);

    db.execute_script("wal.sql")?;
    let rows = db.execute_query("journal_mode.sql", None, ConnectionScope::Private)?;
    assert_eq!(rows[0].get(0).and_then(Value::as_text), Some("wal"));
    Ok(())
}

#[test]
fn test_project_query_results() -> Result<()> {
    let (db, _dir) = create_test_db()?;
    let both = [user(1, "a"), user(2, "b")];
    db.execute_many("insert.sql", both, ConnectionScope::Private)?;

    let rows = db.execute_query("select_all.sql", None, ConnectionScope::Private)?;
    let mapping = FieldMapping::<String>::new()
        .with_field("user_id", "id")
        .with_field("login", "name");
    let records = project(&mapping, &rows)?;

    assert_eq!(
        serde_json::to_value(&records)?,
        serde_json::json!([
            { "user_id": 1, "login": "a" },
            { "user_id": 2, "login": "b" }
        ])
    );
    Ok(())
}
