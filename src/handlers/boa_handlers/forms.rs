use serde::{Deserialize, Serialize};

use crate::models::boa_settings::{
    BoaSettings, BoaSortField, CorrespondingAuthor, MAX_MIN_LINES_PER_ABSTRACT,
};

/// Submitted settings form. All fields are kept as raw strings so an invalid
/// submission can be shown back to the user unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoaSettingsForm {
    #[serde(default)]
    pub extra_text: String,
    #[serde(default)]
    pub min_lines_per_abstract: String,
    #[serde(default)]
    pub sort_by: String,
    #[serde(default)]
    pub corresponding_author: String,
    pub show_abstract_ids: Option<String>,
    #[serde(default)]
    pub csrf_token: String,
}

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_lines_per_abstract: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corresponding_author: Option<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        *self == FieldErrors::default()
    }
}

impl BoaSettingsForm {
    /// Prefill from stored settings.
    pub fn from_settings(settings: &BoaSettings) -> Self {
        BoaSettingsForm {
            extra_text: settings.extra_text.clone(),
            min_lines_per_abstract: settings.min_lines_per_abstract.to_string(),
            sort_by: settings.sort_by.as_str().to_string(),
            corresponding_author: settings.corresponding_author.as_str().to_string(),
            show_abstract_ids: settings.show_abstract_ids.then(|| "1".to_string()),
            csrf_token: String::new(),
        }
    }

    /// Checkbox semantics: absent, empty or an explicit false value is unchecked.
    pub fn show_abstract_ids(&self) -> bool {
        match self.show_abstract_ids.as_deref().map(str::trim) {
            None | Some("") => false,
            Some(v) => !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "off" | "no"),
        }
    }

    pub fn validate(&self) -> Result<BoaSettings, FieldErrors> {
        let mut errors = FieldErrors::default();

        let min_lines = match self.min_lines_per_abstract.trim() {
            "" => Some(0),
            raw => match raw.parse::<u32>() {
                Ok(n) if n <= MAX_MIN_LINES_PER_ABSTRACT => Some(n),
                Ok(_) => {
                    errors.min_lines_per_abstract = Some(format!(
                        "Number must be less than or equal to {MAX_MIN_LINES_PER_ABSTRACT}."
                    ));
                    None
                }
                Err(_) => {
                    errors.min_lines_per_abstract =
                        Some("Number must be a whole number greater than or equal to 0.".to_string());
                    None
                }
            },
        };

        let sort_by = required_choice(&self.sort_by, BoaSortField::parse, &mut errors.sort_by);
        let corresponding_author = required_choice(
            &self.corresponding_author,
            CorrespondingAuthor::parse,
            &mut errors.corresponding_author,
        );

        match (min_lines, sort_by, corresponding_author) {
            (Some(min_lines_per_abstract), Some(sort_by), Some(corresponding_author)) if errors.is_empty() => {
                Ok(BoaSettings {
                    extra_text: self.extra_text.trim().to_string(),
                    min_lines_per_abstract,
                    sort_by,
                    corresponding_author,
                    show_abstract_ids: self.show_abstract_ids(),
                })
            }
            _ => Err(errors),
        }
    }
}

fn required_choice<T>(raw: &str, parse: fn(&str) -> Option<T>, error: &mut Option<String>) -> Option<T> {
    let raw = raw.trim();
    if raw.is_empty() {
        *error = Some("This field is required.".to_string());
        return None;
    }
    let parsed = parse(raw);
    if parsed.is_none() {
        *error = Some("Not a valid choice.".to_string());
    }
    parsed
}
