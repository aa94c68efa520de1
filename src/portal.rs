//! Everything pinned to the one portal UI version this crate emulates.
//!
//! The connector is a deliberately brittle emulation of a single, fixed
//! version of the cardholder site: when any of these paths, form ids, or
//! markers change upstream, extraction fails with a `Protocol` error rather
//! than guessing.

use reqwest::Url;

use crate::error::ConnectorError;

/// Browser identity presented on every request. The site was built long
/// before bot detection got clever; a desktop Chrome string keeps it happy.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.1) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/41.0.2228.0 Safari/537.36";

pub const PRODUCTION_BASE: &str = "https://cardholder.mastercardworldwide.com";

const HOME_PATH: &str = "/travelex/cardholder/cardHolderHome.view";
const LOGOUT_PATH: &str = "/travelex/cardholder/public/app/logout";
const VALIDATE_LOGIN_PATH: &str =
    "/travelex/cardholder/start/extAuth/app/registeredCardHolderPCFCheck";
const BALANCE_PATH: &str = "/travelex/cardholder/cardInfo.view?param=&dojo.preventCache=";
const TRANSACTIONS_PATH: &str =
    "/travelex/cardholder/currentActivity.view?param=&theme=plain&navId=6&dojo.preventCache=";

/// The password form must be re-pointed here before submission; the page's
/// own script does the same rewrite in a real browser.
pub const PKMS_LOGIN_PATH: &str = "/pkmslogin.form";

pub const USER_ID_FORM_ID: &str = "registercardholderLoginUseridForm";
pub const PASSWORD_FORM_ID: &str = "registercardholderLoginPasswordVerifyForm";
pub const SECURITY_FORM_ID: &str = "challengeForm";

pub const USER_ID_FIELD: &str = "userIdInput";
pub const PASSWORD_FIELD: &str = "password";
pub const SECURITY_ANSWER_FIELD: &str = "securityAnswer";
/// "Remember me" checkbox; always forced off before the challenge submit.
pub const AUTO_LOGIN_FIELD: &str = "autoLogonOption";

pub const SECURITY_PHRASE_CLASS: &str = "security_phrase_value";
pub const BALANCE_CLASS: &str = "balanceTotal";
pub const TRANSACTION_TABLE_ID: &str = "txtable1";
pub const CYCLE_SELECT_ID: &str = "prepaidCycle";

/// Href that only appears on pages served to an authenticated session.
pub const PROFILE_LINK_HREF: &str = "/travelex/cardholder/chProfile.view";

/// Pseudo-cycle identifier for the default (current) activity view.
pub const CURRENT_CYCLE: &str = "CURRENT";

/// Resolved portal URLs. Production by default; the base can be pointed at a
/// mock server in tests.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn production() -> Self {
        Self {
            // Hard-coded literal, cannot fail to parse.
            base: Url::parse(PRODUCTION_BASE).expect("invalid production base url"),
        }
    }

    pub fn with_base(base: Url) -> Self {
        Self { base }
    }

    fn join(&self, path: &str) -> Result<Url, ConnectorError> {
        self.base
            .join(path)
            .map_err(|err| ConnectorError::protocol(format!("bad portal url {path:?}: {err}")))
    }

    /// Landing page; also the page the session token is minted on.
    pub fn home(&self) -> Result<Url, ConnectorError> {
        self.join(HOME_PATH)
    }

    pub fn logout(&self) -> Result<Url, ConnectorError> {
        self.join(LOGOUT_PATH)
    }

    /// The follow-up GET the login exchange requires after the password and
    /// security-answer submissions; the submissions alone do not advance the
    /// server-side flow.
    pub fn validate_login(&self) -> Result<Url, ConnectorError> {
        self.join(VALIDATE_LOGIN_PATH)
    }

    pub fn balance(&self) -> Result<Url, ConnectorError> {
        self.join(BALANCE_PATH)
    }

    pub fn transactions(&self) -> Result<Url, ConnectorError> {
        self.join(TRANSACTIONS_PATH)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::production()
    }
}
