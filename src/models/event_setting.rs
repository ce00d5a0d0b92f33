//! Per-event key/value settings, grouped by module.
//!
//! Values are stored as JSON text so every module can keep its own typed
//! view on top (see `boa_settings`).

use serde_json::Value;
use sqlx::{PgExecutor, PgPool};
use std::collections::HashMap;

pub async fn get_all(
    pool: &PgPool,
    event_id: i64,
    module: &str,
) -> Result<HashMap<String, Value>, sqlx::Error> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT name, value FROM event_settings WHERE event_id = $1 AND module = $2",
    )
    .bind(event_id)
    .bind(module)
    .fetch_all(pool)
    .await?;

    let mut values = HashMap::with_capacity(rows.len());
    for (name, raw) in rows {
        match serde_json::from_str(&raw) {
            Ok(value) => {
                values.insert(name, value);
            }
            Err(e) => log::warn!("Ignoring unreadable setting {module}.{name} of event {event_id}: {e}"),
        }
    }
    Ok(values)
}

pub async fn get<'e, E: PgExecutor<'e>>(
    exec: E,
    event_id: i64,
    module: &str,
    name: &str,
) -> Result<Option<Value>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT value FROM event_settings WHERE event_id = $1 AND module = $2 AND name = $3",
    )
    .bind(event_id)
    .bind(module)
    .bind(name)
    .fetch_optional(exec)
    .await?;
    Ok(row.and_then(|(raw,)| serde_json::from_str(&raw).ok()))
}

/// Upsert several settings atomically.
pub async fn set_multi(
    pool: &PgPool,
    event_id: i64,
    module: &str,
    values: &[(&str, Value)],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for (name, value) in values {
        upsert(&mut *tx, event_id, module, name, value).await?;
    }
    tx.commit().await
}

pub async fn upsert<'e, E: PgExecutor<'e>>(
    exec: E,
    event_id: i64,
    module: &str,
    name: &str,
    value: &Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO event_settings (event_id, module, name, value) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (event_id, module, name) DO UPDATE SET value = EXCLUDED.value",
    )
    .bind(event_id)
    .bind(module)
    .bind(name)
    .bind(value.to_string())
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn set(
    pool: &PgPool,
    event_id: i64,
    module: &str,
    name: &str,
    value: Value,
) -> Result<(), sqlx::Error> {
    set_multi(pool, event_id, module, &[(name, value)]).await
}

pub async fn delete<'e, E: PgExecutor<'e>>(
    exec: E,
    event_id: i64,
    module: &str,
    names: &[&str],
) -> Result<(), sqlx::Error> {
    let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    sqlx::query(
        "DELETE FROM event_settings WHERE event_id = $1 AND module = $2 AND name = ANY($3)",
    )
    .bind(event_id)
    .bind(module)
    .bind(&names)
    .execute(exec)
    .await?;
    Ok(())
}
