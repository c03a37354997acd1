//! End-to-end tests for the streaming import path, reading from real files.

use std::fs;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use flatsync::{
    run_stream_import, CancelToken, ImportOptions, ImportProfile, ProgressInfo, ProgressStatus,
    Value,
};
use flatsync_core::DataStore;
use flatsync_sqlite::SqliteStore;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter("flatsync=debug")
        .try_init()
        .ok();
}

fn write_fixture(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_stream_import_from_file() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let store = SqliteStore::open_in_memory()?;
    let dir = tempfile::tempdir()?;
    let path = write_fixture(&dir, "people.csv", "id,name\n1,a\n2,b\n3,c\n4,d\n5,e\n");

    let snapshots: Arc<Mutex<Vec<ProgressInfo>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let snapshots = Arc::clone(&snapshots);
        move |progress: &ProgressInfo| snapshots.lock().unwrap().push(progress.clone())
    };

    let options = ImportOptions {
        table_name: Some("people".to_string()),
        create_table: true,
        batch_size: 2,
        progress: Some(Arc::new(sink)),
        ..Default::default()
    };
    let file = fs::File::open(&path)?;
    let result = run_stream_import(&store, BufReader::new(file), &options).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.rows_imported, 5);
    assert!(result.table_created);
    assert_eq!(result.message, "imported 5 streamed rows into people");

    let rows = store.all("SELECT id FROM people ORDER BY id", &[]).await?;
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[4].get("id"), Some(&Value::Integer(5)));

    // three batches (2+2+1) plus the terminal snapshot; mid-run snapshots
    // carry a zero total because the stream length is unknown
    let snapshots = snapshots.lock().unwrap();
    assert_eq!(snapshots.len(), 4);
    assert!(snapshots[..3]
        .iter()
        .all(|s| s.status == ProgressStatus::Processing && s.total_rows == 0 && s.percentage == 0));
    assert_eq!(
        snapshots[..3].iter().map(|s| s.processed_rows).collect::<Vec<_>>(),
        vec![2, 4, 5]
    );
    let last = &snapshots[3];
    assert_eq!(last.status, ProgressStatus::Completed);
    assert_eq!(last.total_rows, 5);
    assert_eq!(last.processed_rows, 5);
    assert_eq!(last.percentage, 100);
    Ok(())
}

#[tokio::test]
async fn test_cancellation_between_batches() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let store = SqliteStore::open_in_memory()?;
    let dir = tempfile::tempdir()?;
    let path = write_fixture(&dir, "people.csv", "id\n1\n2\n3\n4\n5\n6\n");

    let cancel = CancelToken::new();
    let last_snapshot: Arc<Mutex<Option<ProgressInfo>>> = Arc::new(Mutex::new(None));
    let sink = {
        let cancel = cancel.clone();
        let last_snapshot = Arc::clone(&last_snapshot);
        move |progress: &ProgressInfo| {
            // pull the plug as soon as the first batch lands
            cancel.cancel();
            *last_snapshot.lock().unwrap() = Some(progress.clone());
        }
    };

    let options = ImportOptions {
        table_name: Some("people".to_string()),
        create_table: true,
        batch_size: 2,
        progress: Some(Arc::new(sink)),
        cancel: Some(cancel),
        ..Default::default()
    };
    let file = fs::File::open(&path)?;
    let result = run_stream_import(&store, BufReader::new(file), &options).await;

    assert!(!result.success);
    assert_eq!(result.message, "operation cancelled");
    // only the first batch committed
    assert_eq!(result.rows_imported, 2);
    let n = store
        .get("SELECT COUNT(*) AS n FROM people", &[])
        .await?
        .unwrap()
        .get("n")
        .cloned();
    assert_eq!(n, Some(Value::Integer(2)));

    let last = last_snapshot.lock().unwrap().clone().expect("snapshot");
    assert_eq!(last.status, ProgressStatus::Error);
    assert_eq!(last.processed_rows, 2);
    assert_eq!(last.error.as_deref(), Some("operation cancelled"));
    Ok(())
}

#[tokio::test]
async fn test_stream_with_profile_mapping_and_rules() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let store = SqliteStore::open_in_memory()?;
    let dir = tempfile::tempdir()?;
    let data = write_fixture(
        &dir,
        "people.tsv",
        "pid\tfullName\tage\n1\tAlice\t34\n2\tBob\t999\n3\tCarol\t29\n",
    );
    let profile_path = write_fixture(
        &dir,
        "people.yaml",
        r#"
mapping:
  target_table: people
  column_mapping:
    pid: id
    fullName: name
validation:
  - column: age
    kind: range
    min: 0
    max: 150
"#,
    );

    let profile = ImportProfile::from_file(&profile_path)?;
    let options = ImportOptions {
        create_table: true,
        delimiter: b'\t',
        mapping: profile.mapping,
        validation: profile.validation,
        continue_on_error: true,
        ..Default::default()
    };
    let file = fs::File::open(&data)?;
    let result = run_stream_import(&store, BufReader::new(file), &options).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.rows_imported, 2);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].starts_with("row 2:"), "{}", result.warnings[0]);

    let rows = store.all("SELECT * FROM people ORDER BY id", &[]).await?;
    let columns: Vec<&str> = rows[0].columns().collect();
    assert_eq!(columns, vec!["id", "name", "age"]);
    assert_eq!(rows[1].get("name"), Some(&Value::Text("Carol".to_string())));
    Ok(())
}

#[tokio::test]
async fn test_stream_dry_run_counts_without_writing() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let store = SqliteStore::open_in_memory()?;
    let dir = tempfile::tempdir()?;
    let path = write_fixture(&dir, "people.csv", "id\n1\n2\n3\n");

    let options = ImportOptions {
        table_name: Some("people".to_string()),
        create_table: true,
        dry_run: true,
        ..Default::default()
    };
    let file = fs::File::open(&path)?;
    let result = run_stream_import(&store, BufReader::new(file), &options).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.rows_imported, 3);
    assert!(!result.table_created);
    assert_eq!(result.message, "dry run: validated 3 streamed rows for people");
    assert!(!store.table_exists("people").await?);
    Ok(())
}

#[tokio::test]
async fn test_stream_unique_rule_tracks_across_batches() -> Result<(), Box<dyn std::error::Error>>
{
    init_logging();
    let store = SqliteStore::open_in_memory()?;
    let dir = tempfile::tempdir()?;
    // the duplicate sits in a later batch than its first occurrence
    let path = write_fixture(&dir, "ids.csv", "id\n1\n2\n3\n1\n5\n");

    let options = ImportOptions {
        table_name: Some("ids".to_string()),
        create_table: true,
        batch_size: 2,
        validation: vec![flatsync::ValidationRule::unique("id")],
        continue_on_error: true,
        ..Default::default()
    };
    let file = fs::File::open(&path)?;
    let result = run_stream_import(&store, BufReader::new(file), &options).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.rows_imported, 4);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("duplicate value '1'"));
    Ok(())
}
