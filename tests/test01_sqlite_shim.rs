#![cfg(feature = "sqlite")]

use serde_json::json;
use sql_shim::prelude::*;
use tempfile::TempDir;

async fn open_vendors(dir: &TempDir) -> Result<Shim, SqlShimError> {
    let path = dir.path().join("erp.db");
    let config = ShimConfig::new(format!("sqlite://{}", path.display()))?.with_max_connections(4);
    let shim = Shim::connect(config).await?;
    shim.exec(
        "CREATE TABLE vendors (
            id INTEGER PRIMARY KEY,
            company_id TEXT NOT NULL,
            name TEXT NOT NULL,
            gstin TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .await?;
    Ok(shim)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn all_get_and_run_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let shim = open_vendors(&dir).await?;

    let insert = shim.prepare("INSERT INTO vendors (company_id, name, gstin) VALUES (?, ?, ?)");
    let first = insert.run(&args!["c-1", "Ambuja Cement", "27AAACA1234F1Z5"]).await?;
    assert_eq!(first.rows_affected, 1);
    assert_eq!(first.last_inserted_id, Some(RowValues::Int(1)));
    insert.run(&args!["c-1", "Birla Steel", "29AAACB9876K1Z2"]).await?;
    insert.run(&args!["c-2", "Other Tenant", None::<String>]).await?;

    let rows = shim
        .prepare("SELECT id, name FROM vendors WHERE company_id = ? ORDER BY name")
        .all(&args!["c-1"])
        .await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("name"), Some(&RowValues::Text("Ambuja Cement".into())));
    assert_eq!(rows[1].get("id"), Some(&RowValues::Int(2)));

    let one = shim
        .prepare("SELECT name FROM vendors WHERE id = ?")
        .get(&args![2])
        .await?
        .expect("vendor 2 exists");
    assert_eq!(serde_json::to_value(&one)?, json!({"name": "Birla Steel"}));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn zero_rows_are_empty_not_errors() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let shim = open_vendors(&dir).await?;

    let stmt = shim.prepare("SELECT * FROM vendors WHERE company_id = ?");
    assert!(stmt.all(&args!["nobody"]).await?.is_empty());
    assert!(stmt.get(&args!["nobody"]).await?.is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn update_reports_true_affected_count() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let shim = open_vendors(&dir).await?;
    shim.exec(
        "INSERT INTO vendors (company_id, name) VALUES ('c-1', 'a'), ('c-1', 'b'), ('c-1', 'c'), ('c-2', 'd');",
    )
    .await?;

    let rename = shim.prepare("UPDATE vendors SET name = name || '!' WHERE company_id = ?");
    let none = rename.run(&args!["c-9"]).await?;
    assert_eq!(none, RunResult::affected(0));
    let three = rename.run(&args!["c-1"]).await?;
    assert_eq!(three.rows_affected, 3);
    assert_eq!(three.last_inserted_id, None);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_argument_is_stored_as_null() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let shim = open_vendors(&dir).await?;

    let gstin: Option<&str> = None;
    shim.prepare("INSERT INTO vendors (company_id, name, gstin) VALUES (?, ?, ?)")
        .run(&args!["c-1", "Cash Vendor", gstin])
        .await?;
    let row = shim
        .prepare("SELECT gstin, created_at FROM vendors WHERE name = ?")
        .get(&args!["Cash Vendor"])
        .await?
        .expect("row inserted");
    assert_eq!(row.get("gstin"), Some(&RowValues::Null));
    // the column default ran SQLite's own datetime('now')
    assert!(row.get("created_at").and_then(RowValues::as_timestamp).is_some());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn argument_count_mismatch_fails_before_io() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let shim = open_vendors(&dir).await?;

    // the table does not exist, so reaching the backend would produce a QueryError instead
    let stmt = shim.prepare("SELECT * FROM no_such_table WHERE a = ? AND b = ?");
    assert_eq!(stmt.slots(), 2);
    let err = stmt.all(&args![5]).await.unwrap_err();
    assert!(matches!(err, SqlShimError::ParameterError(_)), "{err}");
    let err = stmt.run(&args![5, "x", 6]).await.unwrap_err();
    assert!(matches!(err, SqlShimError::ParameterError(_)), "{err}");

    let oversized = shim.prepare("SELECT * FROM no_such_table WHERE a = ?99999999999999999999999");
    let err = oversized.get(&args![1]).await.unwrap_err();
    assert!(matches!(err, SqlShimError::ParameterError(_)), "{err}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn backend_errors_carry_the_template() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let shim = open_vendors(&dir).await?;

    let sql = "SELECT * FROM no_such_table WHERE id = ?";
    let err = shim.prepare(sql).all(&args![1]).await.unwrap_err();
    assert!(matches!(err, SqlShimError::QueryError { .. }));
    assert_eq!(err.template(), Some(sql));

    let sql = "INSERT INTO vendors (company_id) VALUES (?)";
    let err = shim.prepare(sql).run(&args!["c-1"]).await.unwrap_err();
    assert!(matches!(err, SqlShimError::ExecError { .. }));
    assert_eq!(err.template(), Some(sql));

    let err = shim.exec("CREATE TABLE vendors (id INTEGER);").await.unwrap_err();
    assert!(matches!(err, SqlShimError::ExecError { .. }));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn returning_clause_reports_the_new_id() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let shim = open_vendors(&dir).await?;
    shim.exec("INSERT INTO vendors (id, company_id, name) VALUES (41, 'c-1', 'seed');")
        .await?;

    let result = shim
        .prepare("INSERT INTO vendors (company_id, name) VALUES (?, ?) RETURNING id, name")
        .run(&args!["c-1", "Fresh"])
        .await?;
    assert_eq!(result.rows_affected, 1);
    assert_eq!(result.last_inserted_id, Some(RowValues::Int(42)));

    let deleted = shim
        .prepare("DELETE FROM vendors WHERE company_id = ? RETURNING name")
        .run(&args!["c-1"])
        .await?;
    assert_eq!(deleted.rows_affected, 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn markers_inside_literals_are_not_slots() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let shim = open_vendors(&dir).await?;
    shim.exec(
        "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT);
         INSERT INTO notes (body) VALUES ('why?'), ('because');",
    )
    .await?;

    let stmt = shim.prepare("SELECT id FROM notes WHERE body = 'why?' -- any ? here is a comment");
    assert_eq!(stmt.slots(), 0);
    assert_eq!(stmt.all(&args![]).await?.len(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sqlite_pools_do_not_rewrite() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let shim = open_vendors(&dir).await?;
    assert_eq!(shim.dialect(), Dialect::Sqlite);

    let sql = "SELECT datetime('now') AS now WHERE ? = 1";
    let stmt = shim.prepare(sql);
    assert_eq!(stmt.sql(), sql);
    let row = stmt.get(&args![1]).await?.expect("one row");
    assert!(row.get("now").and_then(RowValues::as_timestamp).is_some());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn memory_database_keeps_state_between_statements() -> Result<(), Box<dyn std::error::Error>> {
    let shim = Shim::connect(ShimConfig::new(":memory:")?).await?;
    shim.exec("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (7);").await?;
    let row = shim.prepare("SELECT v FROM t").get(&args![]).await?.expect("row");
    assert_eq!(row.get("v"), Some(&RowValues::Int(7)));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn get_returns_first_of_many_matches() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let shim = open_vendors(&dir).await?;
    let insert = shim.prepare("INSERT INTO vendors (company_id, name) VALUES (?, ?)");
    for name in ["Cera Tiles", "Asian Paints", "Bharat Forge"] {
        insert.run(&args!["c-1", name]).await?;
    }

    let first = shim
        .prepare("SELECT name FROM vendors WHERE company_id = ? ORDER BY name")
        .get(&args!["c-1"])
        .await?
        .expect("three vendors match");
    assert_eq!(first.get("name"), Some(&RowValues::Text("Asian Paints".into())));

    let mut tx = shim.begin().await?;
    let newest = tx.prepare("SELECT name FROM vendors ORDER BY id DESC");
    let row = tx.get(&newest, &args![]).await?.expect("rows exist");
    assert_eq!(row.get("name"), Some(&RowValues::Text("Bharat Forge".into())));
    tx.rollback().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_database_is_a_connection_error() -> Result<(), Box<dyn std::error::Error>> {
    let config = ShimConfig::new("sqlite:/nonexistent_dir_for_shim_tests/sub/erp.db")?
        .with_acquire_timeout(std::time::Duration::from_secs(2));
    let started = std::time::Instant::now();
    let err = Shim::connect(config).await.expect_err("directory does not exist");
    assert!(matches!(err, SqlShimError::ConnectionError(_)), "{err:?}");
    assert!(started.elapsed() < std::time::Duration::from_secs(2));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_background_connects_are_not_reported_as_exhaustion() -> Result<(), Box<dyn std::error::Error>> {
    let config = ShimConfig::new("sqlite:/nonexistent_dir_for_shim_tests/sub/erp.db")?
        .with_acquire_timeout(std::time::Duration::from_millis(500));
    let pool = sql_shim::pool::ShimPool::build(&config).await?;
    let err = pool.acquire().await.expect_err("directory does not exist");
    assert!(matches!(err, SqlShimError::ConnectionError(_)), "{err:?}");
    assert_eq!(pool.in_use(), 0);
    Ok(())
}
