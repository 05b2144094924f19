use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::store::{BaselineStore, DocumentStore, NewFile};
use crate::types::{
    Baseline, BaselineUpdate, FileId, FileKind, FileRecord, Identity, Project, ProjectId,
};

/// Opens (or creates) the SQLite database at `path`, configures WAL mode,
/// and applies schema migrations via the `schema_version` table.
///
/// `busy_timeout` is set through the `Connection` method rather than a PRAGMA
/// string so it takes effect regardless of pragma caching.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the file cannot be opened, WAL configuration
/// fails, or schema DDL fails.
pub async fn open_db(path: &str) -> Result<Connection, tokio_rusqlite::Error> {
    let conn = Connection::open(path).await?;

    conn.call(|db| -> rusqlite::Result<()> {
        db.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        db.busy_timeout(Duration::from_secs(5))?;
        Ok(())
    })
    .await?;

    // Fold any WAL left over from a previous run back into the main file.
    conn.call(|db| -> rusqlite::Result<()> { db.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);") })
        .await?;

    conn.call(|db| -> rusqlite::Result<()> { crate::schema::migrate(db) }).await?;

    Ok(conn)
}

/// Returns the current Unix timestamp in milliseconds.
fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn project_owner(db: &rusqlite::Connection, project_id: &str) -> rusqlite::Result<Option<String>> {
    db.query_row("SELECT owner_id FROM projects WHERE id = ?1", [project_id], |r| r.get(0))
        .optional()
}

/// True when `subject` owns `project_id`. A missing project is not owned.
fn owns_project(db: &rusqlite::Connection, project_id: &str, subject: &str) -> rusqlite::Result<bool> {
    Ok(project_owner(db, project_id)?.as_deref() == Some(subject))
}

/// Owner of the project a file belongs to, or `None` for an unknown file.
fn file_owner(db: &rusqlite::Connection, file_id: &str) -> rusqlite::Result<Option<String>> {
    db.query_row(
        "SELECT p.owner_id FROM files f JOIN projects p ON p.id = f.project_id WHERE f.id = ?1",
        [file_id],
        |r| r.get(0),
    )
    .optional()
}

fn file_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<FileRecord> {
    let kind: String = r.get(4)?;
    Ok(FileRecord {
        id: FileId(r.get(0)?),
        project_id: ProjectId(r.get(1)?),
        parent_id: r.get::<_, Option<String>>(2)?.map(FileId),
        name: r.get(3)?,
        kind: FileKind::parse(&kind),
        content: r.get(5)?,
        storage_id: r.get(6)?,
    })
}

const FILE_COLUMNS: &str = "id, project_id, parent_id, name, kind, content, storage_id";

/// Outcome of a write that checks ownership inside its own transaction.
enum Guarded<T> {
    Done(T),
    Missing,
    Unauthorized,
}

/// The document and baseline collections backed by one SQLite database.
///
/// Cloning is cheap: clones share the same background connection thread.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens the database at `path` via [`open_db`].
    pub async fn open(path: &str) -> Result<Self> {
        Ok(Self { conn: open_db(path).await? })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl BaselineStore for SqliteStore {
    async fn get_all(&self, identity: &Identity, project: &ProjectId) -> Result<Vec<Baseline>> {
        let subject = identity.subject.clone();
        let project_id = project.0.clone();

        let rows = self
            .conn
            .call(move |db| -> rusqlite::Result<Option<Vec<Baseline>>> {
                if !owns_project(db, &project_id, &subject)? {
                    return Ok(None);
                }
                let mut stmt = db.prepare(
                    "SELECT file_id, content, updated_at FROM file_baselines WHERE project_id = ?1",
                )?;
                let rows = stmt
                    .query_map([&project_id], |r| {
                        Ok(Baseline { file_id: FileId(r.get(0)?), content: r.get(1)?, updated_at: r.get(2)? })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(Some(rows))
            })
            .await?;

        match rows {
            Some(rows) => Ok(rows),
            None => {
                debug!(%project, "baseline read by non-owner returned nothing");
                Ok(Vec::new())
            }
        }
    }

    /// Upserts inside one `BEGIN IMMEDIATE` transaction after the ownership
    /// check, so a rejected or failing batch leaves every baseline as it was.
    async fn upsert_batch(
        &self,
        identity: &Identity,
        project: &ProjectId,
        updates: Vec<BaselineUpdate>,
    ) -> Result<()> {
        let subject = identity.subject.clone();
        let project_id = project.0.clone();
        let count = updates.len();

        let owned = self
            .conn
            .call(move |db| -> rusqlite::Result<bool> {
                let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                if !owns_project(&tx, &project_id, &subject)? {
                    return Ok(false);
                }
                let now = now_millis();
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO file_baselines (project_id, file_id, content, updated_at)
                         VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(project_id, file_id)
                         DO UPDATE SET content = excluded.content,
                                       updated_at = excluded.updated_at",
                    )?;
                    for update in &updates {
                        stmt.execute(rusqlite::params![&project_id, &update.file_id.0, &update.content, now])?;
                    }
                }
                tx.commit()?;
                Ok(true)
            })
            .await?;

        if !owned {
            warn!(%project, "rejected baseline write from non-owner");
            return Err(CoreError::Unauthorized);
        }
        debug!(%project, count, "baselines upserted");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn create_project(&self, identity: &Identity, name: &str) -> Result<Project> {
        let project = Project {
            id: ProjectId::generate(),
            owner_id: identity.subject.clone(),
            name: name.to_owned(),
            created_at: now_millis(),
        };
        let row = project.clone();

        self.conn
            .call(move |db| -> rusqlite::Result<()> {
                db.execute(
                    "INSERT INTO projects (id, owner_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![&row.id.0, &row.owner_id, &row.name, row.created_at],
                )?;
                Ok(())
            })
            .await?;
        Ok(project)
    }

    async fn find_project(&self, identity: &Identity, name: &str) -> Result<Option<Project>> {
        let subject = identity.subject.clone();
        let name = name.to_owned();

        let project = self
            .conn
            .call(move |db| -> rusqlite::Result<Option<Project>> {
                db.query_row(
                    "SELECT id, owner_id, name, created_at FROM projects
                     WHERE owner_id = ?1 AND name = ?2",
                    rusqlite::params![&subject, &name],
                    |r| {
                        Ok(Project {
                            id: ProjectId(r.get(0)?),
                            owner_id: r.get(1)?,
                            name: r.get(2)?,
                            created_at: r.get(3)?,
                        })
                    },
                )
                .optional()
            })
            .await?;
        Ok(project)
    }

    async fn create_file(&self, identity: &Identity, project: &ProjectId, file: NewFile) -> Result<FileRecord> {
        let subject = identity.subject.clone();
        let record = FileRecord {
            id: FileId::generate(),
            project_id: project.clone(),
            name: file.name,
            parent_id: file.parent_id,
            kind: file.kind,
            content: file.content,
            storage_id: file.storage_id,
        };
        let row = record.clone();

        let outcome = self
            .conn
            .call(move |db| -> rusqlite::Result<Guarded<()>> {
                match project_owner(db, &row.project_id.0)? {
                    None => return Ok(Guarded::Missing),
                    Some(owner) if owner != subject => return Ok(Guarded::Unauthorized),
                    Some(_) => {}
                }
                db.execute(
                    "INSERT INTO files (id, project_id, parent_id, name, kind, content, storage_id, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    rusqlite::params![
                        &row.id.0,
                        &row.project_id.0,
                        row.parent_id.as_ref().map(|p| p.0.as_str()),
                        &row.name,
                        row.kind.as_str(),
                        row.content.as_deref(),
                        row.storage_id.as_deref(),
                        now_millis(),
                    ],
                )?;
                Ok(Guarded::Done(()))
            })
            .await?;

        match outcome {
            Guarded::Done(()) => Ok(record),
            Guarded::Missing => Err(CoreError::ProjectNotFound(project.clone())),
            Guarded::Unauthorized => Err(CoreError::Unauthorized),
        }
    }

    async fn list_by_project(&self, identity: &Identity, project: &ProjectId) -> Result<Vec<FileRecord>> {
        let subject = identity.subject.clone();
        let project_id = project.0.clone();

        let files = self
            .conn
            .call(move |db| -> rusqlite::Result<Vec<FileRecord>> {
                if !owns_project(db, &project_id, &subject)? {
                    return Ok(Vec::new());
                }
                let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE project_id = ?1 ORDER BY rowid");
                let mut stmt = db.prepare(&sql)?;
                let rows = stmt
                    .query_map([&project_id], file_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;
        Ok(files)
    }

    async fn get(&self, identity: &Identity, file: &FileId) -> Result<Option<FileRecord>> {
        let subject = identity.subject.clone();
        let file_id = file.0.clone();

        let record = self
            .conn
            .call(move |db| -> rusqlite::Result<Option<FileRecord>> {
                if file_owner(db, &file_id)?.as_deref() != Some(subject.as_str()) {
                    return Ok(None);
                }
                let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1");
                db.query_row(&sql, [&file_id], file_from_row).optional()
            })
            .await?;
        Ok(record)
    }

    async fn patch_content(&self, identity: &Identity, file: &FileId, content: &str) -> Result<()> {
        let subject = identity.subject.clone();
        let file_id = file.0.clone();
        let content = content.to_owned();

        let outcome = self
            .conn
            .call(move |db| -> rusqlite::Result<Guarded<()>> {
                let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                match file_owner(&tx, &file_id)? {
                    None => return Ok(Guarded::Missing),
                    Some(owner) if owner != subject => return Ok(Guarded::Unauthorized),
                    Some(_) => {}
                }
                tx.execute(
                    "UPDATE files SET content = ?1, updated_at = ?2 WHERE id = ?3",
                    rusqlite::params![&content, now_millis(), &file_id],
                )?;
                tx.commit()?;
                Ok(Guarded::Done(()))
            })
            .await?;

        match outcome {
            Guarded::Done(()) => Ok(()),
            Guarded::Missing => Err(CoreError::FileNotFound(file.clone())),
            Guarded::Unauthorized => Err(CoreError::Unauthorized),
        }
    }
}
