use serde_json::{Value, json};
use sqlx::{PgExecutor, PgPool};
use std::collections::HashMap;

use super::event_setting;

pub const MODULE: &str = "abstracts_book";

const CACHE_PATH: &str = "cache_path";
const CACHE_PATH_TEX: &str = "cache_path_tex";
const CACHE_GENERATION: &str = "cache_generation";

/// First key of the advisory lock serialising cache updates of one event.
const CACHE_LOCK_CLASS: i32 = 0x626f_61;

/// Upper bound for `min_lines_per_abstract`. The padding is a single TeX
/// dimension, which overflows past roughly 1200 lines.
pub const MAX_MIN_LINES_PER_ABSTRACT: u32 = 1000;

/// Order of the abstracts in the generated book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoaSortField {
    #[default]
    Id,
    Title,
    BoardNumber,
    SessionBoardNumber,
    SessionTitle,
    Speaker,
    Schedule,
    SessionScheduleBoard,
}

impl BoaSortField {
    pub const ALL: [BoaSortField; 8] = [
        BoaSortField::Id,
        BoaSortField::Title,
        BoaSortField::BoardNumber,
        BoaSortField::SessionBoardNumber,
        BoaSortField::SessionTitle,
        BoaSortField::Speaker,
        BoaSortField::Schedule,
        BoaSortField::SessionScheduleBoard,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BoaSortField::Id => "id",
            BoaSortField::Title => "title",
            BoaSortField::BoardNumber => "board_number",
            BoaSortField::SessionBoardNumber => "session_board_number",
            BoaSortField::SessionTitle => "session_title",
            BoaSortField::Speaker => "speaker",
            BoaSortField::Schedule => "schedule",
            BoaSortField::SessionScheduleBoard => "session_schedule_board",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BoaSortField::Id => "ID",
            BoaSortField::Title => "Title",
            BoaSortField::BoardNumber => "Board Number",
            BoaSortField::SessionBoardNumber => "Session title, board number",
            BoaSortField::SessionTitle => "Session title",
            BoaSortField::Speaker => "Presenter",
            BoaSortField::Schedule => "Schedule",
            BoaSortField::SessionScheduleBoard => "Session, schedule, board number",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == value)
    }
}

/// Whose contact details are printed as corresponding author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorrespondingAuthor {
    None,
    #[default]
    Submitter,
    Speakers,
}

impl CorrespondingAuthor {
    pub const ALL: [CorrespondingAuthor; 3] = [
        CorrespondingAuthor::None,
        CorrespondingAuthor::Submitter,
        CorrespondingAuthor::Speakers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CorrespondingAuthor::None => "none",
            CorrespondingAuthor::Submitter => "submitter",
            CorrespondingAuthor::Speakers => "speakers",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CorrespondingAuthor::None => "None",
            CorrespondingAuthor::Submitter => "Submitter",
            CorrespondingAuthor::Speakers => "Speakers",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == value)
    }
}

/// User-editable book of abstracts settings of one event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoaSettings {
    pub extra_text: String,
    pub min_lines_per_abstract: u32,
    pub sort_by: BoaSortField,
    pub corresponding_author: CorrespondingAuthor,
    pub show_abstract_ids: bool,
}

impl BoaSettings {
    /// Build from stored values; missing or unreadable entries keep their default.
    pub fn from_values(values: &HashMap<String, Value>) -> Self {
        let defaults = BoaSettings::default();
        BoaSettings {
            extra_text: values
                .get("extra_text")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or(defaults.extra_text),
            min_lines_per_abstract: values
                .get("min_lines_per_abstract")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(defaults.min_lines_per_abstract),
            sort_by: values
                .get("sort_by")
                .and_then(Value::as_str)
                .and_then(BoaSortField::parse)
                .unwrap_or(defaults.sort_by),
            corresponding_author: values
                .get("corresponding_author")
                .and_then(Value::as_str)
                .and_then(CorrespondingAuthor::parse)
                .unwrap_or(defaults.corresponding_author),
            show_abstract_ids: values
                .get("show_abstract_ids")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.show_abstract_ids),
        }
    }

    pub fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("extra_text", json!(self.extra_text)),
            ("min_lines_per_abstract", json!(self.min_lines_per_abstract)),
            ("sort_by", json!(self.sort_by.as_str())),
            ("corresponding_author", json!(self.corresponding_author.as_str())),
            ("show_abstract_ids", json!(self.show_abstract_ids)),
        ]
    }
}

pub async fn get_all(pool: &PgPool, event_id: i64) -> Result<BoaSettings, sqlx::Error> {
    let values = event_setting::get_all(pool, event_id, MODULE).await?;
    Ok(BoaSettings::from_values(&values))
}

pub async fn set_multi(pool: &PgPool, event_id: i64, settings: &BoaSettings) -> Result<(), sqlx::Error> {
    event_setting::set_multi(pool, event_id, MODULE, &settings.to_values()).await
}

/// File name of the cached PDF, relative to the cache directory.
pub async fn get_cache_path<'e, E: PgExecutor<'e>>(exec: E, event_id: i64) -> Result<Option<String>, sqlx::Error> {
    let value = event_setting::get(exec, event_id, MODULE, CACHE_PATH).await?;
    Ok(value.and_then(|v| v.as_str().map(String::from)))
}

pub async fn set_cache_path<'e, E: PgExecutor<'e>>(exec: E, event_id: i64, path: &str) -> Result<(), sqlx::Error> {
    event_setting::upsert(exec, event_id, MODULE, CACHE_PATH, &json!(path)).await
}

pub async fn delete_cache_paths<'e, E: PgExecutor<'e>>(exec: E, event_id: i64) -> Result<(), sqlx::Error> {
    event_setting::delete(exec, event_id, MODULE, &[CACHE_PATH, CACHE_PATH_TEX]).await
}

/// Serialise cache changes of one event until the surrounding transaction ends.
pub async fn lock_cache<'e, E: PgExecutor<'e>>(exec: E, event_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
        .bind(CACHE_LOCK_CLASS)
        .bind((event_id & 0x7fff_ffff) as i32)
        .execute(exec)
        .await?;
    Ok(())
}

/// Counter bumped every time the cache is invalidated. A PDF built from
/// generation `n` may only be recorded while the counter is still `n`.
pub async fn get_cache_generation<'e, E: PgExecutor<'e>>(exec: E, event_id: i64) -> Result<i64, sqlx::Error> {
    let value = event_setting::get(exec, event_id, MODULE, CACHE_GENERATION).await?;
    Ok(value.and_then(|v| v.as_i64()).unwrap_or(0))
}

pub async fn bump_cache_generation<'e, E: PgExecutor<'e>>(exec: E, event_id: i64) -> Result<i64, sqlx::Error> {
    let (generation,): (i64,) = sqlx::query_as(
        "INSERT INTO event_settings (event_id, module, name, value) VALUES ($1, $2, $3, '1') \
         ON CONFLICT (event_id, module, name) \
         DO UPDATE SET value = ((event_settings.value)::bigint + 1)::text \
         RETURNING value::bigint",
    )
    .bind(event_id)
    .bind(MODULE)
    .bind(CACHE_GENERATION)
    .fetch_one(exec)
    .await?;
    Ok(generation)
}
