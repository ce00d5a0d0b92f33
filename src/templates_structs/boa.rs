use askama::Template;

use super::SelectOption;
use crate::handlers::boa_handlers::forms::{BoaSettingsForm, FieldErrors};
use crate::models::boa_settings::{BoaSortField, CorrespondingAuthor};

/// The settings form, rendered as an HTML fragment for the management dialog.
#[derive(Template)]
#[template(path = "boa/settings_form.html")]
pub struct BoaSettingsFormTemplate {
    pub action: String,
    pub csrf_token: String,
    pub form: BoaSettingsForm,
    pub errors: FieldErrors,
    pub sort_options: Vec<SelectOption>,
    pub author_options: Vec<SelectOption>,
    pub show_abstract_ids: bool,
}

impl BoaSettingsFormTemplate {
    pub fn new(action: String, csrf_token: String, form: BoaSettingsForm, errors: FieldErrors) -> Self {
        let sort_options = BoaSortField::ALL
            .into_iter()
            .map(|f| SelectOption {
                value: f.as_str(),
                label: f.label(),
                selected: form.sort_by == f.as_str(),
            })
            .collect();
        let author_options = CorrespondingAuthor::ALL
            .into_iter()
            .map(|c| SelectOption {
                value: c.as_str(),
                label: c.label(),
                selected: form.corresponding_author == c.as_str(),
            })
            .collect();
        let show_abstract_ids = form.show_abstract_ids();
        BoaSettingsFormTemplate {
            action,
            csrf_token,
            form,
            errors,
            sort_options,
            author_options,
            show_abstract_ids,
        }
    }
}
