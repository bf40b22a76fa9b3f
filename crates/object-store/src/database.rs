//! SQLite database for drive node records.

use std::path::Path;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow},
    Row,
};

use crate::error::Result;

/// A node row as stored in SQLite.
///
/// Identifiers are kept as their text form; timestamps are unix millis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRow {
    pub id: String,
    pub owner_id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub kind: String,
    pub size: i64,
    pub mime: Option<String>,
    pub blob_path: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl NodeRow {
    fn from_row(r: &SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            owner_id: r.get("owner_id"),
            parent_id: r.get("parent_id"),
            name: r.get("name"),
            kind: r.get("kind"),
            size: r.get("size"),
            mime: r.get("mime"),
            blob_path: r.get("blob_path"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }
    }
}

const NODE_COLUMNS: &str =
    "id, owner_id, parent_id, name, kind, size, mime, blob_path, created_at, updated_at";

/// SQLite database connection pool.
#[derive(Debug, Clone)]
pub struct NodeDatabase {
    pool: SqlitePool,
}

impl NodeDatabase {
    /// Create a new database connection from a file path.
    pub async fn new(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Create an in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .journal_mode(SqliteJournalMode::Wal);

        // a second connection would see a different empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Cheap round trip used by readiness checks.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Insert a new node record.
    pub async fn insert_node(&self, node: &NodeRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO nodes (id, owner_id, parent_id, name, kind, size, mime, blob_path, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&node.id)
        .bind(&node.owner_id)
        .bind(&node.parent_id)
        .bind(&node.name)
        .bind(&node.kind)
        .bind(node.size)
        .bind(&node.mime)
        .bind(&node.blob_path)
        .bind(node.created_at)
        .bind(node.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get a node by id, regardless of owner.
    pub async fn get_node(&self, id: &str) -> Result<Option<NodeRow>> {
        let row = sqlx::query(&format!("SELECT {NODE_COLUMNS} FROM nodes WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(NodeRow::from_row))
    }

    /// List the direct children of `parent_id` (NULL for the root) belonging
    /// to `owner_id`, oldest first.
    pub async fn list_children(
        &self,
        owner_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<NodeRow>> {
        // `IS` matches NULL against NULL, which `=` does not
        let rows = sqlx::query(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes WHERE owner_id = ? AND parent_id IS ? ORDER BY created_at ASC, id ASC"
        ))
        .bind(owner_id)
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(NodeRow::from_row).collect())
    }

    /// Delete a node record. Returns whether a row was removed.
    pub async fn delete_node(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Re-parent a node, matching on both id and owner.
    ///
    /// Returns false when no row matched, i.e. the node is missing or owned
    /// by someone else.
    pub async fn update_parent(
        &self,
        owner_id: &str,
        id: &str,
        parent_id: Option<&str>,
        updated_at: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE nodes SET parent_id = ?, updated_at = ?
            WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(parent_id)
        .bind(updated_at)
        .bind(id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
impl NodeDatabase {
    /// Count nodes for an owner.
    pub async fn count_nodes(&self, owner_id: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM nodes WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }
}
