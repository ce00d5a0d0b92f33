use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;

use super::event_setting;

pub const SETTINGS_MODULE: &str = "contributions";

#[derive(Debug, Clone, FromRow)]
pub struct Contribution {
    pub id: i64,
    pub friendly_id: i64,
    pub title: String,
    pub description: String,
    pub track_title: Option<String>,
    pub session_title: Option<String>,
    pub board_number: Option<String>,
    pub start_dt: Option<DateTime<Utc>>,
    pub submitter_name: Option<String>,
    pub submitter_email: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ContributionPerson {
    pub contribution_id: i64,
    pub name: String,
    pub affiliation: String,
    pub email: String,
    pub is_speaker: bool,
    pub is_author: bool,
}

/// A contribution with its persons, in display order.
#[derive(Debug, Clone)]
pub struct ContributionEntry {
    pub contribution: Contribution,
    pub persons: Vec<ContributionPerson>,
}

impl ContributionEntry {
    pub fn speakers(&self) -> impl Iterator<Item = &ContributionPerson> {
        self.persons.iter().filter(|p| p.is_speaker)
    }

    pub fn authors(&self) -> impl Iterator<Item = &ContributionPerson> {
        self.persons.iter().filter(|p| p.is_author)
    }
}

/// Whether the event's contributions are visible to the public.
pub async fn is_published(pool: &PgPool, event_id: i64) -> Result<bool, sqlx::Error> {
    let value = event_setting::get(pool, event_id, SETTINGS_MODULE, "published").await?;
    Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
}

pub async fn set_published(pool: &PgPool, event_id: i64, published: bool) -> Result<(), sqlx::Error> {
    event_setting::set(pool, event_id, SETTINGS_MODULE, "published", json!(published)).await
}

/// Load every contribution of an event together with its persons.
pub async fn find_entries_by_event(
    pool: &PgPool,
    event_id: i64,
) -> Result<Vec<ContributionEntry>, sqlx::Error> {
    let contributions = sqlx::query_as::<_, Contribution>(
        "SELECT id, friendly_id, title, description, track_title, session_title, board_number, \
                start_dt, submitter_name, submitter_email \
         FROM contributions WHERE event_id = $1 ORDER BY friendly_id",
    )
    .bind(event_id)
    .fetch_all(pool)
    .await?;

    let persons = sqlx::query_as::<_, ContributionPerson>(
        "SELECT p.contribution_id, p.name, p.affiliation, p.email, p.is_speaker, p.is_author \
         FROM contribution_persons p \
         JOIN contributions c ON c.id = p.contribution_id \
         WHERE c.event_id = $1 \
         ORDER BY p.contribution_id, p.display_order, p.id",
    )
    .bind(event_id)
    .fetch_all(pool)
    .await?;

    let mut by_contribution: HashMap<i64, Vec<ContributionPerson>> = HashMap::new();
    for person in persons {
        by_contribution.entry(person.contribution_id).or_default().push(person);
    }

    Ok(contributions
        .into_iter()
        .map(|contribution| ContributionEntry {
            persons: by_contribution.remove(&contribution.id).unwrap_or_default(),
            contribution,
        })
        .collect())
}

/// Input for `create`, used by seeding and tests.
#[derive(Debug, Clone, Default)]
pub struct NewContribution {
    pub friendly_id: i64,
    pub title: String,
    pub description: String,
    pub track_title: Option<String>,
    pub session_title: Option<String>,
    pub board_number: Option<String>,
    pub start_dt: Option<DateTime<Utc>>,
    pub submitter_name: Option<String>,
    pub submitter_email: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewPerson {
    pub name: String,
    pub affiliation: String,
    pub email: String,
    pub is_speaker: bool,
    pub is_author: bool,
}

pub async fn create(
    pool: &PgPool,
    event_id: i64,
    new: &NewContribution,
    persons: &[NewPerson],
) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO contributions (event_id, friendly_id, title, description, track_title, \
             session_title, board_number, start_dt, submitter_name, submitter_email) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
    )
    .bind(event_id)
    .bind(new.friendly_id)
    .bind(&new.title)
    .bind(&new.description)
    .bind(&new.track_title)
    .bind(&new.session_title)
    .bind(&new.board_number)
    .bind(new.start_dt)
    .bind(&new.submitter_name)
    .bind(&new.submitter_email)
    .fetch_one(&mut *tx)
    .await?;

    for (order, person) in persons.iter().enumerate() {
        sqlx::query(
            "INSERT INTO contribution_persons \
                 (contribution_id, name, affiliation, email, is_speaker, is_author, display_order) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id)
        .bind(&person.name)
        .bind(&person.affiliation)
        .bind(&person.email)
        .bind(person.is_speaker)
        .bind(person.is_author)
        .bind(order as i32)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(id)
}
