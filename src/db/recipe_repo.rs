use recipe_sync_core::models::now_millis;
use recipe_sync_core::{LocalStore, Recipe, StoreError, StoreResult, SyncStatus};
use sqlx::SqlitePool;

/// SQLite-backed [`LocalStore`].
#[derive(Debug, Clone)]
pub struct SqliteRecipeStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct RecipeRow {
    id: i64,
    title: String,
    content: String,
    timestamp: i64,
    sync_status: String,
}

impl TryFrom<RecipeRow> for Recipe {
    type Error = StoreError;

    fn try_from(row: RecipeRow) -> Result<Self, Self::Error> {
        let sync_status = row.sync_status.parse::<SyncStatus>().map_err(StoreError::backend)?;
        Ok(Recipe {
            id: Some(row.id),
            title: row.title,
            content: row.content,
            timestamp: row.timestamp,
            sync_status,
        })
    }
}

/// Sync bookkeeping kept next to each record.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SyncDetails {
    pub last_sync_at: Option<i64>,
    pub sync_error: Option<String>,
}

const SELECT_RECIPES: &str = "SELECT id, title, content, timestamp, sync_status FROM recipes";

impl SqliteRecipeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn sync_details(&self, id: i64) -> StoreResult<Option<SyncDetails>> {
        sqlx::query_as("SELECT last_sync_at, sync_error FROM recipes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)
    }
}

fn into_recipes(rows: Vec<RecipeRow>) -> StoreResult<Vec<Recipe>> {
    rows.into_iter().map(Recipe::try_from).collect()
}

impl LocalStore for SqliteRecipeStore {
    async fn get_all(&self) -> StoreResult<Vec<Recipe>> {
        let rows: Vec<RecipeRow> = sqlx::query_as(&format!("{} ORDER BY id", SELECT_RECIPES))
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        into_recipes(rows)
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<Recipe>> {
        let row: Option<RecipeRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_RECIPES))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        row.map(Recipe::try_from).transpose()
    }

    async fn insert(&self, recipe: &Recipe) -> StoreResult<i64> {
        let status = recipe.sync_status.as_str();

        let result = match recipe.id {
            Some(id) => sqlx::query(
                r#"
                INSERT INTO recipes (id, title, content, timestamp, sync_status)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    content = excluded.content,
                    timestamp = excluded.timestamp,
                    sync_status = excluded.sync_status,
                    sync_error = NULL
                "#,
            )
            .bind(id)
            .bind(&recipe.title)
            .bind(&recipe.content)
            .bind(recipe.timestamp)
            .bind(status)
            .execute(&self.pool)
            .await
            .map(|_| id),
            None => sqlx::query(
                "INSERT INTO recipes (title, content, timestamp, sync_status) VALUES (?, ?, ?, ?)",
            )
            .bind(&recipe.title)
            .bind(&recipe.content)
            .bind(recipe.timestamp)
            .bind(status)
            .execute(&self.pool)
            .await
            .map(|done| done.last_insert_rowid()),
        };

        let id = result.map_err(StoreError::backend)?;
        tracing::debug!("Stored recipe {} ({})", id, status);
        Ok(id)
    }

    async fn delete(&self, recipe: &Recipe) -> StoreResult<()> {
        let Some(id) = recipe.id else {
            return Ok(());
        };
        sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn update_sync_status(
        &self,
        id: i64,
        status: SyncStatus,
        synced_at: i64,
        error: Option<&str>,
    ) -> StoreResult<()> {
        let error = match status {
            SyncStatus::Error => error,
            _ => None,
        };
        let result = sqlx::query(
            "UPDATE recipes SET sync_status = ?, last_sync_at = ?, sync_error = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(synced_at)
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn get_by_sync_status(&self, status: SyncStatus) -> StoreResult<Vec<Recipe>> {
        let rows: Vec<RecipeRow> =
            sqlx::query_as(&format!("{} WHERE sync_status = ? ORDER BY id", SELECT_RECIPES))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(StoreError::backend)?;
        into_recipes(rows)
    }

    async fn add_tombstone(&self, id: i64) -> StoreResult<()> {
        sqlx::query("INSERT OR IGNORE INTO tombstones (recipe_id, deleted_at) VALUES (?, ?)")
            .bind(id)
            .bind(now_millis())
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn tombstones(&self) -> StoreResult<Vec<i64>> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT recipe_id FROM tombstones ORDER BY deleted_at, recipe_id")
                .fetch_all(&self.pool)
                .await
                .map_err(StoreError::backend)?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn remove_tombstone(&self, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM tombstones WHERE recipe_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }
}
