//! SQLite round trips through the public store, staging, and change-set APIs.

use basemark_core::changeset::ChangeSet;
use basemark_core::db::{self, SqliteStore};
use basemark_core::error::CoreError;
use basemark_core::staging::StagingIndex;
use basemark_core::store::{BaselineStore, DocumentStore, NewFile};
use basemark_core::types::{baseline_map, BaselineUpdate, FileId, Identity, ProjectId};

fn temp_db_path() -> String {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.keep().join("test.db");
    path.to_string_lossy().to_string()
}

fn owner() -> Identity {
    Identity::new("user_owner")
}

fn intruder() -> Identity {
    Identity::new("user_other")
}

async fn seeded(store: &SqliteStore) -> (ProjectId, FileId, FileId) {
    let project = store.create_project(&owner(), "demo").await.unwrap();
    let a = store
        .create_file(&owner(), &project.id, NewFile::text("a.rs", None, "fn a() {}\n"))
        .await
        .unwrap();
    let b = store
        .create_file(&owner(), &project.id, NewFile::text("b.rs", None, "fn b() {}\n"))
        .await
        .unwrap();
    (project.id, a.id, b.id)
}

#[tokio::test]
async fn open_db_applies_schema_in_wal_mode() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();

    let version: i64 = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(db.query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))?)
        })
        .await
        .unwrap();
    assert_eq!(version, 1, "schema_version should be 1");

    let journal: String = conn
        .call(|db| Ok::<_, rusqlite::Error>(db.query_row("PRAGMA journal_mode", [], |r| r.get(0))?))
        .await
        .unwrap();
    assert_eq!(journal, "wal", "journal_mode should be wal");

    let pk_columns: i64 = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(db.query_row(
                "SELECT COUNT(*) FROM pragma_table_info('file_baselines') WHERE pk > 0",
                [],
                |r| r.get(0),
            )?)
        })
        .await
        .unwrap();
    assert_eq!(pk_columns, 2, "file_baselines should have a composite PK");

    // Re-opening runs the migration again without error.
    db::open_db(&path).await.unwrap();
}

#[tokio::test]
async fn committed_files_drop_out_of_the_change_set() {
    let store = SqliteStore::open(&temp_db_path()).await.unwrap();
    let (project, a, b) = seeded(&store).await;

    let files = store.list_by_project(&owner(), &project).await.unwrap();
    let baselines = baseline_map(store.get_all(&owner(), &project).await.unwrap());
    let changes = ChangeSet::compute(&files, &baselines);
    assert_eq!(changes.len(), 2);

    let mut staging = StagingIndex::new();
    staging.toggle(&a);
    let committed = staging.commit(&store, &owner(), &project, &files, &baselines).await.unwrap();
    assert_eq!(committed, 1);

    let baselines = baseline_map(store.get_all(&owner(), &project).await.unwrap());
    let changes = ChangeSet::compute(&files, &baselines);
    assert!(!changes.contains(&a));
    assert!(changes.contains(&b));

    // Editing the committed file makes it Modified again.
    store.patch_content(&owner(), &a, "fn a() { todo!() }\n").await.unwrap();
    let files = store.list_by_project(&owner(), &project).await.unwrap();
    let changes = ChangeSet::compute(&files, &baselines);
    assert_eq!(changes.file_ids().cloned().collect::<Vec<_>>(), [a, b]);
}

#[tokio::test]
async fn upsert_keeps_one_row_per_file_with_a_shared_timestamp() {
    let store = SqliteStore::open(&temp_db_path()).await.unwrap();
    let (project, a, b) = seeded(&store).await;

    let batch = |ca: &str, cb: &str| {
        vec![
            BaselineUpdate { file_id: a.clone(), content: ca.into() },
            BaselineUpdate { file_id: b.clone(), content: cb.into() },
        ]
    };
    store.upsert_batch(&owner(), &project, batch("a1", "b1")).await.unwrap();
    store.upsert_batch(&owner(), &project, batch("a2", "b2")).await.unwrap();

    let rows = store.get_all(&owner(), &project).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].updated_at, rows[1].updated_at);
    let map = baseline_map(rows);
    assert_eq!(map[&a], "a2");
    assert_eq!(map[&b], "b2");
}

#[tokio::test]
async fn non_owners_read_nothing_and_cannot_write() {
    let store = SqliteStore::open(&temp_db_path()).await.unwrap();
    let (project, a, _) = seeded(&store).await;
    store
        .upsert_batch(&owner(), &project, vec![BaselineUpdate { file_id: a.clone(), content: "v1".into() }])
        .await
        .unwrap();

    assert!(store.get_all(&intruder(), &project).await.unwrap().is_empty());
    assert!(store.list_by_project(&intruder(), &project).await.unwrap().is_empty());
    assert!(store.get(&intruder(), &a).await.unwrap().is_none());

    let err = store
        .upsert_batch(&intruder(), &project, vec![BaselineUpdate { file_id: a.clone(), content: "evil".into() }])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized));
    let err = store.patch_content(&intruder(), &a, "evil").await.unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized));
    let err = store.create_file(&intruder(), &project, NewFile::text("c.rs", None, "")).await.unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized));
    assert_eq!(store.list_by_project(&owner(), &project).await.unwrap().len(), 2);

    let map = baseline_map(store.get_all(&owner(), &project).await.unwrap());
    assert_eq!(map[&a], "v1");
    assert_eq!(store.get(&owner(), &a).await.unwrap().unwrap().text(), "fn a() {}\n");
}

#[tokio::test]
async fn unknown_projects_and_files() {
    let store = SqliteStore::open(&temp_db_path()).await.unwrap();
    let missing = ProjectId::from("missing");
    assert!(store.get_all(&owner(), &missing).await.unwrap().is_empty());
    assert!(matches!(
        store.upsert_batch(&owner(), &missing, Vec::new()).await.unwrap_err(),
        CoreError::Unauthorized
    ));
    assert!(matches!(
        store.patch_content(&owner(), &FileId::from("nope"), "x").await.unwrap_err(),
        CoreError::FileNotFound(_)
    ));
    assert!(matches!(
        store.create_file(&owner(), &missing, NewFile::text("a.rs", None, "")).await.unwrap_err(),
        CoreError::ProjectNotFound(id) if id == missing
    ));
}

#[tokio::test]
async fn state_persists_across_connections() {
    let path = temp_db_path();
    let (project, a) = {
        let store = SqliteStore::open(&path).await.unwrap();
        let (project, a, _) = seeded(&store).await;
        store
            .upsert_batch(&owner(), &project, vec![BaselineUpdate { file_id: a.clone(), content: "kept".into() }])
            .await
            .unwrap();
        (project, a)
    };

    let store = SqliteStore::open(&path).await.unwrap();
    let found = store.find_project(&owner(), "demo").await.unwrap().unwrap();
    assert_eq!(found.id, project);
    assert!(store.find_project(&intruder(), "demo").await.unwrap().is_none());
    assert_eq!(baseline_map(store.get_all(&owner(), &project).await.unwrap())[&a], "kept");
    assert_eq!(store.list_by_project(&owner(), &project).await.unwrap().len(), 2);
}
