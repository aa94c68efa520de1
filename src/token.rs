//! Anti-forgery token extraction.
//!
//! The portal embeds a synchronization token in inline script on every page
//! and expects client-side code to copy it into each form before submit. A
//! real browser runs that script; this module mirrors its effect.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ConnectorError;

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"var sessionSynchronizationToken = "([^"]*)""#).expect("invalid token regex")
    })
}

/// Pull the synchronization token out of the page's inline script.
///
/// Absence means the markup changed or this is not the expected page; either
/// way the emulation cannot continue.
pub fn extract_token(page_text: &str) -> Result<String, ConnectorError> {
    token_re()
        .captures(page_text)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| {
            ConnectorError::protocol("no session synchronization token found in page script")
        })
}

/// The hidden `<input>` the portal's own script would append to a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenField {
    pub input_type: &'static str,
    pub name: &'static str,
    pub id: &'static str,
    pub value: String,
    pub default_value: String,
    pub readonly: bool,
}

/// Build the hidden csrf field for `token`, mirroring the page script's
/// attribute set exactly.
pub fn build_hidden_field(token: &str) -> HiddenField {
    HiddenField {
        input_type: "hidden",
        name: "csrfToken",
        id: "csrfToken",
        value: token.to_string(),
        default_value: token.to_string(),
        readonly: true,
    }
}
