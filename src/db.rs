use crate::{
    ancestry::normalize,
    error::TranscodeError,
    properties::{Edge, EdgeId, NewEdge, Resource, ResourceId},
    store::{EdgeStore, ResourceStore},
};
use sqlx::{
    error::BoxDynError,
    migrate::{Migration as SqlxMigration, MigrationSource, MigrationType, Migrator},
    pool::PoolOptions,
    sqlite::{Sqlite, SqliteConnectOptions},
    Pool, QueryBuilder, Transaction,
};
use std::{collections::BTreeSet, future::Future, path::Path, pin::Pin, sync::Arc};
use tokio::sync::Mutex;

/// <https://www.sqlite.org/limits.html#max_variable_number>
pub const SQLITE_LIMIT_VARIABLE_NUMBER: usize = 32766;

// This is exactly what futures_core::BoxFuture<'static, T> expands to.
type MigrationFuture =
    Pin<Box<dyn Future<Output = Result<Vec<SqlxMigration>, BoxDynError>> + Send + 'static>>;

type SharedTransaction = Arc<Mutex<Option<Transaction<'static, Sqlite>>>>;

/// One transaction shared by a resource store and an edge store.
///
/// Both stores write through the same transaction, so a run is committed or rolled back as a
/// unit. Dropping the session without committing rolls back.
pub struct DbSession {
    tx: SharedTransaction,
}

impl DbSession {
    pub async fn begin(pool: &Pool<Sqlite>) -> Result<Self, TranscodeError> {
        let tx = pool.begin().await?;
        tracing::debug!("[DbSession] transaction opened");
        Ok(DbSession {
            tx: Arc::new(Mutex::new(Some(tx))),
        })
    }

    pub fn resources(&self) -> SqliteResourceStore {
        SqliteResourceStore {
            tx: self.tx.clone(),
        }
    }

    pub fn edges(&self) -> SqliteEdgeStore {
        SqliteEdgeStore {
            tx: self.tx.clone(),
        }
    }

    pub async fn commit(self) -> Result<(), TranscodeError> {
        let tx = self.tx.lock().await.take().ok_or_else(closed)?;
        tx.commit().await?;
        tracing::debug!("[DbSession] transaction committed");
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), TranscodeError> {
        let tx = self.tx.lock().await.take().ok_or_else(closed)?;
        tx.rollback().await?;
        tracing::debug!("[DbSession] transaction rolled back");
        Ok(())
    }
}

fn closed() -> TranscodeError {
    TranscodeError::StoreWrite("transaction already closed".to_string())
}

#[derive(Clone)]
pub struct SqliteResourceStore {
    tx: SharedTransaction,
}

impl SqliteResourceStore {
    /// Insert a resource row and return its id.
    pub async fn insert(
        &mut self,
        resource_type: &str,
        ancestry: Option<&str>,
    ) -> Result<ResourceId, TranscodeError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(closed)?;
        let result = sqlx::query("INSERT INTO resources (resource_type, ancestry) VALUES (?, ?)")
            .bind(resource_type)
            .bind(normalize(ancestry.map(str::to_string)))
            .execute(&mut **tx)
            .await?;
        Ok(ResourceId(result.last_insert_rowid()))
    }
}

impl ResourceStore for SqliteResourceStore {
    async fn find_resources(&self, resource_type: &str) -> Result<Vec<Resource>, TranscodeError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(closed)?;
        let rows = sqlx::query_as::<_, Resource>(
            "SELECT id, resource_type, ancestry FROM resources \
             WHERE resource_type = ? ORDER BY id",
        )
        .bind(resource_type)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| {
            tracing::error!("[SqliteResourceStore.find_resources] SQL error: {}", e);
            e
        })?;
        Ok(rows)
    }

    async fn get_resource(&self, id: ResourceId) -> Result<Resource, TranscodeError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(closed)?;
        sqlx::query_as::<_, Resource>(
            "SELECT id, resource_type, ancestry FROM resources WHERE id = ?",
        )
        .bind(id.get())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| TranscodeError::NotFound(id.label()))
    }

    async fn set_ancestry(
        &mut self,
        id: ResourceId,
        ancestry: Option<String>,
    ) -> Result<(), TranscodeError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(closed)?;
        let result = sqlx::query("UPDATE resources SET ancestry = ? WHERE id = ?")
            .bind(normalize(ancestry))
            .bind(id.get())
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                tracing::error!("[SqliteResourceStore.set_ancestry] SQL error: {}", e);
                e
            })?;
        if result.rows_affected() == 0 {
            return Err(TranscodeError::NotFound(id.label()));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct SqliteEdgeStore {
    tx: SharedTransaction,
}

impl EdgeStore for SqliteEdgeStore {
    async fn find_edges(
        &self,
        kind: &str,
        subject_type: &str,
    ) -> Result<Vec<Edge>, TranscodeError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(closed)?;
        let rows = sqlx::query_as::<_, Edge>(
            "SELECT id, relationship, resource_type, resource_id, ancestry FROM relationships \
             WHERE relationship = ? AND resource_type = ? ORDER BY id",
        )
        .bind(kind)
        .bind(subject_type)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| {
            tracing::error!("[SqliteEdgeStore.find_edges] SQL error: {}", e);
            e
        })?;
        Ok(rows)
    }

    async fn create_edge(&mut self, edge: NewEdge) -> Result<Edge, TranscodeError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(closed)?;
        let edge = NewEdge::new(edge.kind, edge.subject, edge.ancestry);
        let result = sqlx::query(
            "INSERT INTO relationships (relationship, resource_type, resource_id, ancestry) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(&edge.kind)
        .bind(&edge.subject.subject_type)
        .bind(edge.subject.subject_id.get())
        .bind(&edge.ancestry)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            tracing::error!("[SqliteEdgeStore.create_edge] SQL error: {}", e);
            e
        })?;
        Ok(edge.into_edge(EdgeId(result.last_insert_rowid())))
    }

    async fn delete_edges(&mut self, ids: &BTreeSet<EdgeId>) -> Result<(), TranscodeError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(closed)?;
        let ids = ids.iter().map(|id| id.get()).collect::<Vec<i64>>();
        for chunk in ids.chunks(SQLITE_LIMIT_VARIABLE_NUMBER) {
            let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM relationships WHERE id IN (");
            let mut separated = qb.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");
            qb.build().execute(&mut **tx).await?;
        }
        tracing::debug!("[SqliteEdgeStore.delete_edges] removed {} rows", ids.len());
        Ok(())
    }

    async fn count_edges(&self) -> Result<usize, TranscodeError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(closed)?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM relationships")
            .fetch_one(&mut **tx)
            .await?;
        Ok(count as usize)
    }
}

/// A migration definition.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
    pub kind: MigrationType,
}

#[derive(Debug, Clone)]
struct MigrationList(Vec<Migration>);

impl MigrationSource<'static> for MigrationList {
    fn resolve(self) -> MigrationFuture {
        Box::pin(async move {
            let mut migrations = Vec::new();
            for migration in self.0 {
                if matches!(migration.kind, MigrationType::ReversibleUp) {
                    migrations.push(SqlxMigration::new(
                        migration.version,
                        migration.description.into(),
                        migration.kind,
                        migration.sql.into(),
                        false,
                    ));
                }
            }
            Ok(migrations)
        })
    }
}

fn migrations() -> MigrationList {
    MigrationList(vec![Migration {
        version: 1,
        description: "create_resource_and_relationship_tables",
        sql: "\
        CREATE TABLE resources (id INTEGER PRIMARY KEY AUTOINCREMENT, resource_type TEXT NOT NULL, ancestry TEXT); \
        CREATE INDEX index_resources_on_resource_type ON resources (resource_type); \
        CREATE TABLE relationships (id INTEGER PRIMARY KEY AUTOINCREMENT, relationship TEXT NOT NULL, resource_type TEXT NOT NULL, resource_id INTEGER NOT NULL, ancestry TEXT); \
        CREATE INDEX index_relationships_on_kind ON relationships (relationship, resource_type);",
        kind: MigrationType::ReversibleUp,
    }])
}

/// Open (creating if missing) the SQLite file at `db_path` and bring its schema up to date.
pub async fn db_init(db_path: &Path) -> Result<Pool<Sqlite>, TranscodeError> {
    tracing::debug!("Initializing ancestry db from file: {:?}", db_path);
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(false)
        .create_if_missing(true);

    let pool = PoolOptions::<Sqlite>::new()
        .connect_with(options)
        .await?;

    let migrator = Migrator::new(migrations()).await?;
    migrator.run(&pool).await?;

    let resource_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resources")
        .fetch_one(&pool)
        .await?;
    let edge_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM relationships")
        .fetch_one(&pool)
        .await?;
    tracing::info!(
        "DB Connection initialized.\n \
         \tResource count:\t{}\n \
         \tRelationship count:\t{}",
        resource_count,
        edge_count
    );

    Ok(pool)
}
