use serde_json::Value;
use sqlx::PgPool;

/// Days an audit row is kept before `cleanup_old_entries` removes it.
pub const RETENTION_DAYS: i32 = 365;

/// Record a mutation. Callers ignore the result: a failed audit write is
/// logged here and must not fail the request.
pub async fn log(
    pool: &PgPool,
    user_id: i64,
    action: &str,
    target_type: &str,
    target_id: i64,
    details: Value,
) -> Result<(), sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO audit_log (user_id, action, target_type, target_id, details) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(action)
    .bind(target_type)
    .bind(target_id)
    .bind(details.to_string())
    .execute(pool)
    .await;

    if let Err(e) = &result {
        log::warn!("Failed to write audit entry {action} for {target_type} {target_id}: {e}");
    }
    result.map(|_| ())
}

pub async fn cleanup_old_entries(pool: &PgPool) {
    let result = sqlx::query(
        "DELETE FROM audit_log WHERE created_at < now() - make_interval(days => $1)",
    )
    .bind(RETENTION_DAYS)
    .execute(pool)
    .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => {
            log::info!("Removed {} audit entries older than {RETENTION_DAYS} days", done.rows_affected());
        }
        Ok(_) => {}
        Err(e) => log::warn!("Audit cleanup failed: {e}"),
    }
}
