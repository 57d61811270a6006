use std::path::Path;

use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

use crate::{
    error::AppError,
    models::{NewTodo, Todo, TodoChanges},
    query::ListQuery,
};

const SELECT_TODO: &str = "SELECT id, title, description, status, due_date, priority, created_at, updated_at \
     FROM todos WHERE id = ?";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'todo',
    due_date TEXT,
    priority TEXT NOT NULL DEFAULT 'medium',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0
)";

/// Column additions for tables created by older versions. SQLite cannot add
/// a NOT NULL column without a default, so text columns without a natural
/// default get '' and are backfilled afterwards.
const LEGACY_COLUMNS: &[(&str, &str)] = &[
    ("title", "ALTER TABLE todos ADD COLUMN title TEXT NOT NULL DEFAULT ''"),
    ("description", "ALTER TABLE todos ADD COLUMN description TEXT"),
    ("status", "ALTER TABLE todos ADD COLUMN status TEXT NOT NULL DEFAULT 'todo'"),
    ("due_date", "ALTER TABLE todos ADD COLUMN due_date TEXT"),
    ("priority", "ALTER TABLE todos ADD COLUMN priority TEXT NOT NULL DEFAULT 'medium'"),
    ("created_at", "ALTER TABLE todos ADD COLUMN created_at TEXT NOT NULL DEFAULT ''"),
    ("updated_at", "ALTER TABLE todos ADD COLUMN updated_at TEXT NOT NULL DEFAULT ''"),
    ("completed", "ALTER TABLE todos ADD COLUMN completed INTEGER NOT NULL DEFAULT 0"),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_todos_status ON todos(status)",
    "CREATE INDEX IF NOT EXISTS idx_todos_priority ON todos(priority)",
    "CREATE INDEX IF NOT EXISTS idx_todos_created_at ON todos(created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_todos_due_date ON todos(due_date)",
];

/// Current UTC instant as RFC 3339 with microseconds and a `+00:00` offset.
pub fn utc_now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Handle to the todo database. Every operation checks out its own pooled
/// connection, which goes back to the pool when it is dropped.
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        tracing::debug!("opened database at {}", path.as_ref().display());
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the table and indexes if needed and brings legacy tables up
    /// to the current column set. Safe to run on every start.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(CREATE_TABLE).execute(&mut *tx).await?;

        let existing: Vec<String> = sqlx::query("PRAGMA table_info(todos)")
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(|row| row.try_get::<String, _>("name"))
            .collect::<Result<_, _>>()?;

        let mut added = Vec::new();
        for (name, ddl) in LEGACY_COLUMNS {
            if !existing.iter().any(|c| c == name) {
                sqlx::query(ddl).execute(&mut *tx).await?;
                tracing::info!("added missing column todos.{}", name);
                added.push(*name);
            }
        }

        // A row missing one timestamp copies the other; rows missing both get
        // the migration instant. Either way updated_at >= created_at.
        if added.contains(&"created_at") || added.contains(&"updated_at") {
            let now = utc_now_iso();
            let filled = sqlx::query(
                "UPDATE todos SET
                    created_at = CASE WHEN created_at = ''
                        THEN COALESCE(NULLIF(updated_at, ''), ?) ELSE created_at END,
                    updated_at = CASE WHEN updated_at = ''
                        THEN COALESCE(NULLIF(created_at, ''), ?) ELSE updated_at END
                WHERE created_at = '' OR updated_at = ''",
            )
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            tracing::info!("backfilled timestamps on {} legacy rows", filled);
        }

        // Upgraded tables must agree on status and the legacy completed flag.
        if added.contains(&"status") && !added.contains(&"completed") {
            let done = sqlx::query("UPDATE todos SET status = 'done' WHERE completed = 1")
                .execute(&mut *tx)
                .await?
                .rows_affected();
            tracing::info!("marked {} legacy completed rows as done", done);
        } else if added.contains(&"completed") {
            sqlx::query("UPDATE todos SET completed = 1 WHERE status = 'done'")
                .execute(&mut *tx)
                .await?;
        }

        for ddl in INDEXES {
            sqlx::query(ddl).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        tracing::info!("database schema is up to date");
        Ok(())
    }

    /// Inserts a todo stamped with `now` as both timestamps and returns the
    /// id SQLite assigned to it.
    pub async fn insert(&self, todo: &NewTodo, now: &str) -> Result<i64, AppError> {
        let mut conn = self.pool.acquire().await?;
        let id = sqlx::query(
            "INSERT INTO todos (title, description, status, due_date, priority, created_at, updated_at, completed)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.status.as_str())
        .bind(&todo.due_date)
        .bind(todo.priority.as_str())
        .bind(now)
        .bind(now)
        .bind(todo.status.completed_flag())
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    pub async fn ensure_exists(&self, id: i64) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("SELECT 1 FROM todos WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(AppError::todo_not_found)?;
        Ok(())
    }

    pub async fn fetch_by_id(&self, id: i64) -> Result<Todo, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_on(&mut conn, id)
            .await?
            .ok_or_else(AppError::todo_not_found)
    }

    /// Returns one page of matching todos and the count of all matches.
    /// Both statements share a connection but not a transaction.
    pub async fn list(&self, query: &ListQuery) -> Result<(Vec<Todo>, i64), AppError> {
        let mut conn = self.pool.acquire().await?;

        let total: i64 = query
            .count_query()
            .build_query_scalar::<i64>()
            .fetch_one(&mut *conn)
            .await?;

        let items = query
            .page_query()
            .build_query_as::<Todo>()
            .fetch_all(&mut *conn)
            .await?;

        Ok((items, total))
    }

    /// Applies only the fields present in `changes` and always refreshes
    /// `updated_at`. A status change also rewrites the legacy `completed`
    /// column in the same statement.
    pub async fn update_partial(
        &self,
        id: i64,
        changes: &TodoChanges,
        updated_at: &str,
    ) -> Result<Todo, AppError> {
        let mut conn = self.pool.acquire().await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE todos SET ");
        let mut set = qb.separated(", ");
        if let Some(title) = &changes.title {
            set.push("title = ").push_bind_unseparated(title.as_str());
        }
        if let Some(description) = &changes.description {
            set.push("description = ")
                .push_bind_unseparated(description.as_deref());
        }
        if let Some(status) = changes.status {
            set.push("status = ").push_bind_unseparated(status.as_str());
            set.push("completed = ")
                .push_bind_unseparated(status.completed_flag());
        }
        if let Some(due_date) = &changes.due_date {
            set.push("due_date = ").push_bind_unseparated(due_date.as_deref());
        }
        if let Some(priority) = changes.priority {
            set.push("priority = ").push_bind_unseparated(priority.as_str());
        }
        set.push("updated_at = ").push_bind_unseparated(updated_at);
        qb.push(" WHERE id = ").push_bind(id);

        let result = qb.build().execute(&mut *conn).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::todo_not_found());
        }

        fetch_on(&mut conn, id)
            .await?
            .ok_or_else(AppError::todo_not_found)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::todo_not_found());
        }
        Ok(())
    }
}

async fn fetch_on(conn: &mut SqliteConnection, id: i64) -> Result<Option<Todo>, sqlx::Error> {
    sqlx::query_as::<_, Todo>(SELECT_TODO)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}
