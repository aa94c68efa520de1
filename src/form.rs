//! Form-submission emulation.
//!
//! The login exchange is driven through regular HTML forms. A browser would
//! carry every submittable input along; this module materialises a form from
//! a fetched page so individual fields can be filled, overridden, or have the
//! hidden csrf input injected before submission.

use std::sync::OnceLock;

use reqwest::Url;
use scraper::{Html, Selector};

use crate::error::ConnectorError;
use crate::token::HiddenField;

fn input_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("input").expect("invalid input selector"))
}

/// A form lifted out of a page, ready to be filled and submitted.
#[derive(Debug, Clone)]
pub struct PortalForm {
    action: Option<String>,
    fields: Vec<(String, String)>,
}

impl PortalForm {
    /// Find the form with `form_id` on the page and collect its submittable
    /// inputs. Returns `None` when the form is absent, which the login flow
    /// uses as a signal in its own right (e.g. "no challenge form" means the
    /// password was rejected upstream).
    pub fn select(page_text: &str, form_id: &str) -> Option<Self> {
        let document = Html::parse_document(page_text);
        let selector =
            Selector::parse(&format!("form#{form_id}")).expect("invalid form selector");
        let form = document.select(&selector).next()?;

        let mut fields = Vec::new();
        for input in form.select(input_selector()) {
            let element = input.value();
            let Some(name) = element.attr("name") else {
                continue;
            };
            let input_type = element.attr("type").unwrap_or("text").to_ascii_lowercase();
            match input_type.as_str() {
                "submit" | "button" | "reset" | "image" | "file" => continue,
                "checkbox" | "radio" => {
                    if element.attr("checked").is_some() {
                        fields.push((
                            name.to_string(),
                            element.attr("value").unwrap_or("on").to_string(),
                        ));
                    }
                }
                _ => {
                    fields.push((
                        name.to_string(),
                        element.attr("value").unwrap_or("").to_string(),
                    ));
                }
            }
        }

        Some(Self {
            action: form.value().attr("action").map(str::to_string),
            fields,
        })
    }

    /// Set a field, replacing any value the page supplied.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(field) = self.fields.iter_mut().find(|(n, _)| n == name) {
            field.1 = value;
        } else {
            self.fields.push((name.to_string(), value));
        }
    }

    /// Override the form's action path.
    pub fn set_action(&mut self, action: &str) {
        self.action = Some(action.to_string());
    }

    /// Inject the hidden csrf input, first in the field list like the page
    /// script does.
    pub fn insert_hidden(&mut self, field: &HiddenField) {
        self.fields
            .insert(0, (field.name.to_string(), field.value.clone()));
    }

    /// Resolve the action against the URL of the page the form came from.
    pub fn action_url(&self, page_url: &Url) -> Result<Url, ConnectorError> {
        match &self.action {
            Some(action) => page_url.join(action).map_err(|err| {
                ConnectorError::protocol(format!("unresolvable form action {action:?}: {err}"))
            }),
            // An action-less form posts back to the page itself.
            None => Ok(page_url.clone()),
        }
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}
