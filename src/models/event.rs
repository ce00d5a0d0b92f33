use sqlx::{FromRow, PgExecutor, PgPool};

#[derive(Debug, Clone, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub is_protected: bool,
    pub custom_boa_id: Option<i64>,
}

impl Event {
    pub fn has_custom_boa(&self) -> bool {
        self.custom_boa_id.is_some()
    }
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(
        "SELECT id, title, is_protected, custom_boa_id FROM events WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create(pool: &PgPool, title: &str, is_protected: bool) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO events (title, is_protected) VALUES ($1, $2) RETURNING id",
    )
    .bind(title)
    .bind(is_protected)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn is_manager(pool: &PgPool, event_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
    let (found,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM event_managers WHERE event_id = $1 AND user_id = $2)",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(found)
}

pub async fn add_manager(pool: &PgPool, event_id: i64, user_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO event_managers (event_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(event_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Current custom BOA file id, locking the event row until the surrounding
/// transaction ends.
pub async fn lock_custom_boa<'e, E: PgExecutor<'e>>(
    exec: E,
    event_id: i64,
) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(Option<i64>,)> =
        sqlx::query_as("SELECT custom_boa_id FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(exec)
            .await?;
    Ok(row.and_then(|r| r.0))
}

pub async fn set_custom_boa<'e, E: PgExecutor<'e>>(
    exec: E,
    event_id: i64,
    file_id: Option<i64>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE events SET custom_boa_id = $2 WHERE id = $1")
        .bind(event_id)
        .bind(file_id)
        .execute(exec)
        .await?;
    Ok(())
}
