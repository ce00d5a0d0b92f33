use sqlx::PgPool;

/// Grants management rights on every event.
pub const MANAGE_ALL_EVENTS: &str = "event.manage_all";

/// All permission codes held by a user, sorted.
pub async fn find_codes_by_user_id(pool: &PgPool, user_id: i64) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT code FROM user_permissions WHERE user_id = $1 ORDER BY code")
            .bind(user_id)
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

pub async fn grant(pool: &PgPool, user_id: i64, code: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_permissions (user_id, code) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(code)
    .execute(pool)
    .await?;
    Ok(())
}
