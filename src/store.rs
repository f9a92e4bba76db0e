use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::canvas::{Edge, Node};

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(
                std::env::var("FLOWPAD_DB_PATH").unwrap_or_else(|_| "flowpad.db".to_string()),
            ),
        }
    }
}

/// SQLite-backed storage for named views. The editor never talks to the
/// store directly; hosts pull a save payload out of the editor and push
/// it here.
#[derive(Debug, Clone)]
pub struct ViewStore {
    pool: Pool<Sqlite>,
}

impl ViewStore {
    pub async fn open(config: StoreConfig) -> Result<Self> {
        let db_url = if config.path.is_absolute() {
            format!("sqlite:///{}", config.path.display())
        } else {
            format!("sqlite:{}", config.path.display())
        };
        let options = SqliteConnectOptions::from_str(&db_url)
            .context("Invalid SQLite database path")?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS views (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                nodes TEXT NOT NULL DEFAULT '[]',
                edges TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create views table")?;

        sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_views_updated ON views(updated_at DESC)"#)
            .execute(&self.pool)
            .await
            .context("Failed to create views_updated index")?;

        Ok(())
    }
}

/// One named, independently persisted diagram.
#[derive(Debug, Clone, Serialize)]
pub struct View {
    pub id: String,
    pub name: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewListItem {
    pub id: String,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ViewRow {
    id: String,
    name: String,
    nodes: String,
    edges: String,
    created_at: String,
    updated_at: String,
}

impl ViewRow {
    fn into_view(self) -> Result<View> {
        Ok(View {
            nodes: serde_json::from_str(&self.nodes)
                .with_context(|| format!("Corrupt node payload in view '{}'", self.id))?,
            edges: serde_json::from_str(&self.edges)
                .with_context(|| format!("Corrupt edge payload in view '{}'", self.id))?,
            id: self.id,
            name: self.name,
            created_at: self.created_at.parse().unwrap_or_else(|_| Utc::now()),
            updated_at: self.updated_at.parse().unwrap_or_else(|_| Utc::now()),
        })
    }
}

impl View {
    pub async fn create(pool: &SqlitePool, name: &str) -> Result<Self> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"INSERT INTO views (id, name, nodes, edges, created_at, updated_at)
               VALUES (?, ?, '[]', '[]', ?, ?)"#,
        )
        .bind(&id)
        .bind(name)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(pool)
        .await
        .context("Failed to create view")?;

        Ok(Self {
            id,
            name: name.to_string(),
            nodes: Vec::new(),
            edges: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Self>> {
        let row: Option<ViewRow> = sqlx::query_as(
            "SELECT id, name, nodes, edges, created_at, updated_at FROM views WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get view")?;

        row.map(ViewRow::into_view).transpose()
    }

    pub async fn list(pool: &SqlitePool) -> Result<Vec<ViewListItem>> {
        #[derive(sqlx::FromRow)]
        struct Row {
            id: String,
            name: String,
            updated_at: String,
        }

        let rows: Vec<Row> = sqlx::query_as(
            "SELECT id, name, updated_at FROM views ORDER BY updated_at DESC",
        )
        .fetch_all(pool)
        .await
        .context("Failed to list views")?;

        Ok(rows
            .into_iter()
            .map(|r| ViewListItem {
                id: r.id,
                name: r.name,
                updated_at: r.updated_at.parse().unwrap_or_else(|_| Utc::now()),
            })
            .collect())
    }

    /// Persists a settled canvas state into this view.
    pub async fn save_canvas(
        &self,
        pool: &SqlitePool,
        nodes: &[Node],
        edges: &[Edge],
    ) -> Result<Self> {
        let now = Utc::now();
        let node_json = serde_json::to_string(nodes).context("Failed to serialize nodes")?;
        let edge_json = serde_json::to_string(edges).context("Failed to serialize edges")?;

        sqlx::query("UPDATE views SET nodes = ?, edges = ?, updated_at = ? WHERE id = ?")
            .bind(&node_json)
            .bind(&edge_json)
            .bind(now.to_rfc3339())
            .bind(&self.id)
            .execute(pool)
            .await
            .context("Failed to save view")?;

        Ok(Self {
            nodes: nodes.to_vec(),
            edges: edges.to_vec(),
            updated_at: now,
            ..self.clone()
        })
    }

    pub async fn rename(&self, pool: &SqlitePool, name: &str) -> Result<Self> {
        let now = Utc::now();
        sqlx::query("UPDATE views SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(now.to_rfc3339())
            .bind(&self.id)
            .execute(pool)
            .await
            .context("Failed to rename view")?;

        Ok(Self {
            name: name.to_string(),
            updated_at: now,
            ..self.clone()
        })
    }

    pub async fn duplicate(&self, pool: &SqlitePool, new_name: Option<&str>) -> Result<Self> {
        let name = match new_name {
            Some(n) => n.to_string(),
            None => format!("{} (copy)", self.name),
        };
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let node_json = serde_json::to_string(&self.nodes).context("Failed to serialize nodes")?;
        let edge_json = serde_json::to_string(&self.edges).context("Failed to serialize edges")?;

        sqlx::query(
            r#"INSERT INTO views (id, name, nodes, edges, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(&name)
        .bind(&node_json)
        .bind(&edge_json)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(pool)
        .await
        .context("Failed to duplicate view")?;

        Ok(Self {
            id,
            name,
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn delete(&self, pool: &SqlitePool) -> Result<()> {
        sqlx::query("DELETE FROM views WHERE id = ?")
            .bind(&self.id)
            .execute(pool)
            .await
            .context("Failed to delete view")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Node, Point, ShapeKind};
    use tempfile::TempDir;

    async fn open_temp_store() -> (TempDir, ViewStore) {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig {
            path: temp_dir.path().join("test.db"),
        };
        let store = ViewStore::open(config).await.unwrap();
        (temp_dir, store)
    }

    #[tokio::test]
    async fn view_crud_round_trip() {
        let (_guard, store) = open_temp_store().await;
        let pool = store.pool();

        let view = View::create(pool, "architecture").await.unwrap();
        assert!(view.nodes.is_empty());

        let nodes = vec![Node::shape("db", ShapeKind::Cylinder, Point::new(40.0, 40.0))];
        let saved = view.save_canvas(pool, &nodes, &[]).await.unwrap();

        let reloaded = View::get_by_id(pool, &saved.id).await.unwrap().unwrap();
        assert_eq!(reloaded.nodes.len(), 1);
        assert_eq!(reloaded.nodes[0].label(), Some("db"));

        let renamed = reloaded.rename(pool, "architecture v2").await.unwrap();
        assert_eq!(renamed.name, "architecture v2");

        let copy = renamed.duplicate(pool, None).await.unwrap();
        assert_eq!(copy.name, "architecture v2 (copy)");
        assert_ne!(copy.id, renamed.id);
        assert_eq!(copy.nodes.len(), 1);

        let list = View::list(pool).await.unwrap();
        assert_eq!(list.len(), 2);

        copy.delete(pool).await.unwrap();
        renamed.delete(pool).await.unwrap();
        assert!(View::get_by_id(pool, &renamed.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_view_reads_back_none() {
        let (_guard, store) = open_temp_store().await;
        let found = View::get_by_id(store.pool(), "no-such-id").await.unwrap();
        assert!(found.is_none());
    }
}
