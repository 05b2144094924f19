/// DDL to create the schema_version tracking table.
///
/// Applied unconditionally on every DB open (before checking the version),
/// using `IF NOT EXISTS` so it is safe to run multiple times.
pub const SCHEMA_VERSION_DDL: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER NOT NULL
    ) STRICT;
";

/// DDL for the v1 schema.
///
/// - `projects`: the unit of ownership; `owner_id` is the identity subject.
/// - `files`: the document collection. `content` is NULL for folders and for
///   storage-backed (binary) files, which carry a `storage_id` instead.
/// - `file_baselines`: last-committed content, at most one row per
///   `(project_id, file_id)` thanks to the composite primary key.
///
/// Timestamps are Unix milliseconds.
pub const SCHEMA_V1_SQL: &str = "
    CREATE TABLE IF NOT EXISTS projects (
        id          TEXT    PRIMARY KEY,
        owner_id    TEXT    NOT NULL,
        name        TEXT    NOT NULL,
        created_at  INTEGER NOT NULL,
        UNIQUE (owner_id, name)
    ) STRICT;

    CREATE TABLE IF NOT EXISTS files (
        id          TEXT    PRIMARY KEY,
        project_id  TEXT    NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        parent_id   TEXT    REFERENCES files(id) ON DELETE CASCADE,
        name        TEXT    NOT NULL,
        kind        TEXT    NOT NULL CHECK(kind IN ('file', 'folder')),
        content     TEXT,
        storage_id  TEXT,
        updated_at  INTEGER NOT NULL
    ) STRICT;

    CREATE INDEX IF NOT EXISTS files_by_project ON files(project_id);

    CREATE TABLE IF NOT EXISTS file_baselines (
        project_id  TEXT    NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        file_id     TEXT    NOT NULL REFERENCES files(id) ON DELETE CASCADE,
        content     TEXT    NOT NULL,
        updated_at  INTEGER NOT NULL,
        PRIMARY KEY (project_id, file_id)
    ) STRICT;
";

/// Runs forward-only schema migration to the latest version.
///
/// Idempotent: creates `schema_version` if needed, reads the current version
/// (`0` when empty), and applies each missing step inside a `BEGIN IMMEDIATE`
/// transaction that also records the new version.
pub fn migrate(db: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    db.execute_batch(SCHEMA_VERSION_DDL)?;

    let version: i64 = db
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
        .unwrap_or(0);

    if version < 1 {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute_batch(SCHEMA_V1_SQL)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
        tx.commit()?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
