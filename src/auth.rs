//! The three-stage challenge/response login protocol.
//!
//! Each step is a typed function consuming the previous step's page state
//! and producing either the next state or a classified error, so the strict
//! sequential dependency between steps is visible in the signatures rather
//! than buried in branching on a mutable object.
//!
//! One easily-missed site behavior is preserved exactly: the token that
//! unlocks authorized pages for the rest of the session is the one minted on
//! the landing page (T1), not the last token seen during the exchange.

use secrecy::ExposeSecret;

use crate::credentials::Credentials;
use crate::error::ConnectorError;
use crate::fetch::{Page, PageFetcher};
use crate::form::PortalForm;
use crate::portal::{self, Endpoints};
use crate::scrape;
use crate::token::{build_hidden_field, extract_token};

/// Landing page with the session token (T1) already extracted.
struct LandingPage {
    page: Page,
    session_token: String,
}

/// Response to the user-id submission; carries the security phrase to check.
struct PhrasePage {
    page: Page,
}

/// A phrase page whose displayed phrase matched the expected one; only now
/// is it safe to send the password.
struct VerifiedPage {
    page: Page,
}

/// Page carrying the security-question challenge form.
struct ChallengePage {
    page: Page,
    form: PortalForm,
}

async fn open_landing(
    fetcher: &PageFetcher,
    endpoints: &Endpoints,
) -> Result<LandingPage, ConnectorError> {
    let page = fetcher.get(&endpoints.home()?).await?;
    let session_token = extract_token(&page.body)?;
    Ok(LandingPage {
        page,
        session_token,
    })
}

async fn submit_user_id(
    fetcher: &PageFetcher,
    credentials: &Credentials,
    landing: &LandingPage,
) -> Result<PhrasePage, ConnectorError> {
    let mut form = PortalForm::select(&landing.page.body, portal::USER_ID_FORM_ID)
        .ok_or_else(|| ConnectorError::protocol("no user-id form on landing page"))?;
    form.insert_hidden(&build_hidden_field(&landing.session_token));
    form.set(portal::USER_ID_FIELD, credentials.user_id.clone());

    tracing::debug!("submitting user id");
    let page = fetcher
        .post_form(&form.action_url(&landing.page.url)?, form.fields())
        .await?;
    Ok(PhrasePage { page })
}

/// The client's authentication of the *server*: the displayed phrase must
/// exactly match the shared secret before any password leaves the process.
fn verify_security_phrase(
    credentials: &Credentials,
    phrase_page: PhrasePage,
) -> Result<VerifiedPage, ConnectorError> {
    let displayed = scrape::security_phrase(&phrase_page.page.body).unwrap_or_default();
    if displayed.is_empty() {
        return Err(ConnectorError::BadUserId);
    }
    if displayed != credentials.security_phrase {
        tracing::debug!("security phrase mismatch, refusing to continue");
        return Err(ConnectorError::BadSecurityMessage(displayed));
    }
    tracing::debug!("security phrase verified");
    Ok(VerifiedPage {
        page: phrase_page.page,
    })
}

async fn submit_password(
    fetcher: &PageFetcher,
    endpoints: &Endpoints,
    credentials: &Credentials,
    verified: &VerifiedPage,
) -> Result<ChallengePage, ConnectorError> {
    let token = extract_token(&verified.page.body)?;
    let mut form = PortalForm::select(&verified.page.body, portal::PASSWORD_FORM_ID)
        .ok_or_else(|| ConnectorError::protocol("no password form on verified page"))?;
    form.set(portal::PASSWORD_FIELD, credentials.password.expose_secret());
    form.set_action(portal::PKMS_LOGIN_PATH);
    form.insert_hidden(&build_hidden_field(&token));

    tracing::debug!("submitting password");
    fetcher
        .post_form(&form.action_url(&verified.page.url)?, form.fields())
        .await?;

    // The submission alone does not advance the server-side flow; a
    // follow-up GET of the validation URL does.
    let page = fetcher.get(&endpoints.validate_login()?).await?;

    // No challenge form here means the password was rejected upstream.
    let form = PortalForm::select(&page.body, portal::SECURITY_FORM_ID)
        .ok_or(ConnectorError::BadPassword)?;
    Ok(ChallengePage { page, form })
}

async fn submit_security_answer(
    fetcher: &PageFetcher,
    endpoints: &Endpoints,
    credentials: &Credentials,
    challenge: ChallengePage,
) -> Result<Page, ConnectorError> {
    let token = extract_token(&challenge.page.body)?;
    let mut form = challenge.form;
    form.set(
        portal::SECURITY_ANSWER_FIELD,
        credentials.security_answer.expose_secret(),
    );
    form.insert_hidden(&build_hidden_field(&token));
    // Never trust the page's default for the remember-me option.
    form.set(portal::AUTO_LOGIN_FIELD, "false");

    tracing::debug!("submitting security answer");
    fetcher
        .post_form(&form.action_url(&challenge.page.url)?, form.fields())
        .await?;
    fetcher.get(&endpoints.validate_login()?).await
}

fn confirm_authenticated(page: &Page) -> Result<(), ConnectorError> {
    if scrape::has_profile_link(&page.body) {
        tracing::debug!("login successful");
        Ok(())
    } else {
        tracing::debug!("no authenticated profile link after challenge");
        Err(ConnectorError::BadSecurityAnswer)
    }
}

/// Run the whole exchange and return the session token (T1).
pub async fn run_login(
    fetcher: &PageFetcher,
    endpoints: &Endpoints,
    credentials: &Credentials,
) -> Result<String, ConnectorError> {
    let landing = open_landing(fetcher, endpoints).await?;
    let session_token = landing.session_token.clone();

    let phrase_page = submit_user_id(fetcher, credentials, &landing).await?;
    let verified = verify_security_phrase(credentials, phrase_page)?;
    let challenge = submit_password(fetcher, endpoints, credentials, &verified).await?;
    let final_page = submit_security_answer(fetcher, endpoints, credentials, challenge).await?;
    confirm_authenticated(&final_page)?;

    Ok(session_token)
}
