use thiserror::Error;

/// Classified failure raised by the connector.
///
/// Every known failure path maps to exactly one variant; nothing is raised
/// unclassified. `Connection` and `LoginInProgress` are transient and may be
/// retried by the caller; the credential rejections are terminal for the
/// supplied credentials; `Protocol` means the portal markup no longer matches
/// the one UI version this crate emulates.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Transport-level failure: DNS, timeout, TLS, or a non-2xx response.
    #[error("error connecting to the portal: {0}")]
    Connection(String),

    /// The user id was not recognised (no security phrase was displayed).
    #[error("portal did not recognise the user id")]
    BadUserId,

    /// The displayed security phrase did not match the expected one. This is
    /// the client's check that it is talking to the genuine site, so the
    /// password is never submitted after this failure.
    #[error("security phrase mismatch: {0}")]
    BadSecurityMessage(String),

    /// The portal rejected the password (no security challenge followed).
    #[error("portal rejected the password")]
    BadPassword,

    /// The portal rejected the security answer.
    #[error("portal rejected the security answer")]
    BadSecurityAnswer,

    /// Another login on the same session is already in flight.
    #[error("a login for this session is already in progress")]
    LoginInProgress,

    /// The session holds no live token, or the portal silently redirected an
    /// authorized request to its login page.
    #[error("not logged in")]
    LoggedOut,

    /// The page markup does not match the expected structure.
    #[error("unexpected page structure: {0}")]
    Protocol(String),
}

impl ConnectorError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Stable numeric code reported on the wire. The values predate this
    /// implementation and must not be renumbered.
    pub fn code(&self) -> u32 {
        match self {
            Self::BadPassword => 0,
            Self::BadUserId => 1,
            Self::BadSecurityMessage(_) => 2,
            Self::BadSecurityAnswer => 3,
            Self::LoginInProgress => 5,
            Self::LoggedOut => 9999,
            Self::Connection(_) => 28382,
            Self::Protocol(_) => 28400,
        }
    }

    /// Whether the caller may retry the same operation with the same inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::LoginInProgress)
    }
}

impl From<reqwest::Error> for ConnectorError {
    fn from(err: reqwest::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_are_stable() {
        assert_eq!(ConnectorError::BadPassword.code(), 0);
        assert_eq!(ConnectorError::BadUserId.code(), 1);
        assert_eq!(
            ConnectorError::BadSecurityMessage("nope".into()).code(),
            2
        );
        assert_eq!(ConnectorError::BadSecurityAnswer.code(), 3);
        assert_eq!(ConnectorError::LoginInProgress.code(), 5);
        assert_eq!(ConnectorError::LoggedOut.code(), 9999);
        assert_eq!(ConnectorError::connection("x").code(), 28382);
        assert_eq!(ConnectorError::protocol("x").code(), 28400);
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(ConnectorError::connection("timeout").is_retryable());
        assert!(ConnectorError::LoginInProgress.is_retryable());
        assert!(!ConnectorError::BadPassword.is_retryable());
        assert!(!ConnectorError::LoggedOut.is_retryable());
    }
}
