//! Credential set for one cardholder.

use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use secrecy::SecretString;

/// Everything needed to drive the login exchange for one cardholder.
///
/// Immutable after construction and owned exclusively by one [`Connector`].
/// The security phrase is the shared secret the portal displays mid-login so
/// the client can authenticate the *server* before sending a password.
///
/// [`Connector`]: crate::connector::Connector
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: String,
    pub password: SecretString,
    pub security_phrase: String,
    pub security_answer: SecretString,
    /// Time zone the portal renders transaction timestamps in.
    pub time_zone: Tz,
}

impl Credentials {
    pub fn new(
        user_id: impl Into<String>,
        password: impl Into<String>,
        security_phrase: impl Into<String>,
        security_answer: impl Into<String>,
        time_zone: Tz,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            password: SecretString::from(password.into()),
            security_phrase: security_phrase.into(),
            security_answer: SecretString::from(security_answer.into()),
            time_zone,
        }
    }

    /// Parse an IANA zone name (e.g. `"Europe/London"`).
    pub fn parse_time_zone(name: &str) -> Result<Tz> {
        Tz::from_str(name.trim()).map_err(|_| anyhow!("unknown time zone: {name:?}"))
    }
}
