use askama::Template;
use sqlx::PgPool;
use std::cmp::Ordering;

use super::tex::{escape_tex, paragraphs};
use crate::errors::AppError;
use crate::models::boa_settings::{
    self, BoaSettings, BoaSortField, CorrespondingAuthor, MAX_MIN_LINES_PER_ABSTRACT,
};
use crate::models::contribution::{self, ContributionEntry};
use crate::models::event::Event;

/// Everything needed to typeset the book of one event.
#[derive(Debug, Clone)]
pub struct AbstractBook {
    pub event_title: String,
    pub settings: BoaSettings,
    pub entries: Vec<ContributionEntry>,
}

#[derive(Template)]
#[template(path = "boa/book.tex", syntax = "tex", escape = "none")]
struct BookTemplate {
    title: String,
    extra_paragraphs: Vec<String>,
    entries: Vec<TexEntry>,
}

/// One abstract, already escaped for LaTeX.
struct TexEntry {
    heading: String,
    authors: String,
    meta: Vec<String>,
    paragraphs: Vec<String>,
    padding_lines: usize,
    corresponding: Option<String>,
}

impl AbstractBook {
    pub fn new(event_title: &str, settings: BoaSettings, mut entries: Vec<ContributionEntry>) -> Self {
        sort_entries(&mut entries, settings.sort_by);
        AbstractBook {
            event_title: event_title.to_string(),
            settings,
            entries,
        }
    }

    pub async fn load(pool: &PgPool, event: &Event) -> Result<Self, AppError> {
        let settings = boa_settings::get_all(pool, event.id).await?;
        let entries = contribution::find_entries_by_event(pool, event.id).await?;
        Ok(Self::new(&event.title, settings, entries))
    }

    pub fn render_tex(&self) -> Result<String, AppError> {
        let tmpl = BookTemplate {
            title: escape_tex(&self.event_title),
            extra_paragraphs: paragraphs(&self.settings.extra_text),
            entries: self.entries.iter().map(|e| self.tex_entry(e)).collect(),
        };
        Ok(tmpl.render()?)
    }

    fn tex_entry(&self, entry: &ContributionEntry) -> TexEntry {
        let c = &entry.contribution;
        let heading = if self.settings.show_abstract_ids {
            format!("\\#{} {}", c.friendly_id, escape_tex(&c.title))
        } else {
            escape_tex(&c.title)
        };

        let authors = entry
            .authors()
            .map(|p| {
                let name = escape_tex(&p.name);
                let name = if p.is_speaker { format!("\\underline{{{name}}}") } else { name };
                if p.affiliation.trim().is_empty() {
                    name
                } else {
                    format!("{name} ({})", escape_tex(p.affiliation.trim()))
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut meta = Vec::new();
        if let Some(track) = non_blank(&c.track_title) {
            meta.push(format!("\\textbf{{Track:}} {}", escape_tex(track)));
        }
        if let Some(session) = non_blank(&c.session_title) {
            meta.push(format!("\\textbf{{Session:}} {}", escape_tex(session)));
        }
        if let Some(board) = non_blank(&c.board_number) {
            meta.push(format!("\\textbf{{Board:}} {}", escape_tex(board)));
        }

        let body = paragraphs(&c.description);
        let line_count = c.description.lines().filter(|l| !l.trim().is_empty()).count();
        let min_lines = self.settings.min_lines_per_abstract.min(MAX_MIN_LINES_PER_ABSTRACT) as usize;
        let padding_lines = min_lines.saturating_sub(line_count);

        TexEntry {
            heading,
            authors,
            meta,
            paragraphs: body,
            padding_lines,
            corresponding: corresponding_contact(entry, self.settings.corresponding_author),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Escaped contact line for the corresponding author(s), if any.
fn corresponding_contact(entry: &ContributionEntry, who: CorrespondingAuthor) -> Option<String> {
    match who {
        CorrespondingAuthor::None => None,
        CorrespondingAuthor::Submitter => {
            let c = &entry.contribution;
            let email = non_blank(&c.submitter_email)?;
            Some(match non_blank(&c.submitter_name) {
                Some(name) => format!("{} ({})", escape_tex(name), escape_tex(email)),
                None => escape_tex(email),
            })
        }
        CorrespondingAuthor::Speakers => {
            let emails: Vec<String> = entry
                .speakers()
                .map(|p| p.email.trim())
                .filter(|e| !e.is_empty())
                .map(escape_tex)
                .collect();
            if emails.is_empty() { None } else { Some(emails.join(", ")) }
        }
    }
}

/// Board numbers compare numerically when they are numbers.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum BoardKey {
    Number(u64),
    Text(String),
}

fn board_key(entry: &ContributionEntry) -> Option<BoardKey> {
    let board = non_blank(&entry.contribution.board_number)?;
    Some(match board.parse::<u64>() {
        Ok(n) => BoardKey::Number(n),
        Err(_) => BoardKey::Text(board.to_lowercase()),
    })
}

fn session_key(entry: &ContributionEntry) -> Option<String> {
    non_blank(&entry.contribution.session_title).map(str::to_lowercase)
}

fn speaker_key(entry: &ContributionEntry) -> Option<String> {
    entry.speakers().next().map(|p| p.name.to_lowercase())
}

/// Missing values sort after present ones.
fn cmp_missing_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn sort_entries(entries: &mut [ContributionEntry], field: BoaSortField) {
    entries.sort_by(|a, b| {
        let title = || a.contribution.title.to_lowercase().cmp(&b.contribution.title.to_lowercase());
        let board = || cmp_missing_last(board_key(a), board_key(b));
        let session = || cmp_missing_last(session_key(a), session_key(b));
        let schedule = || cmp_missing_last(a.contribution.start_dt, b.contribution.start_dt);

        let primary = match field {
            BoaSortField::Id => Ordering::Equal,
            BoaSortField::Title => title(),
            BoaSortField::BoardNumber => board(),
            BoaSortField::SessionTitle => session().then_with(title),
            BoaSortField::Speaker => cmp_missing_last(speaker_key(a), speaker_key(b)),
            BoaSortField::Schedule => schedule(),
            BoaSortField::SessionBoardNumber => session().then_with(board),
            BoaSortField::SessionScheduleBoard => session().then_with(schedule).then_with(board),
        };
        primary.then_with(|| a.contribution.friendly_id.cmp(&b.contribution.friendly_id))
    });
}
