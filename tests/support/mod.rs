//! Shared page builders and mock-portal scaffolding.
//!
//! Builds the minimal HTML fragments each step of the login exchange and the
//! account pages need, and mounts a complete happy-path portal on a wiremock
//! server so individual tests only override the step they care about.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use cashpassport::{Connector, Credentials, Endpoints, FixtureStore};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USER_ID: &str = "cardholder1";
pub const PASSWORD: &str = "hunter2";
pub const PHRASE: &str = "correct horse";
pub const ANSWER: &str = "battery staple";

pub const HOME_PATH: &str = "/travelex/cardholder/cardHolderHome.view";
pub const LOGOUT_PATH: &str = "/travelex/cardholder/public/app/logout";
pub const PCF_CHECK_PATH: &str =
    "/travelex/cardholder/start/extAuth/app/registeredCardHolderPCFCheck";
pub const BALANCE_PATH: &str = "/travelex/cardholder/cardInfo.view";
pub const TRANSACTIONS_PATH: &str = "/travelex/cardholder/currentActivity.view";

fn token_script(token: &str) -> String {
    format!(r#"<script>var sessionSynchronizationToken = "{token}";</script>"#)
}

pub fn landing_page(token: &str) -> String {
    format!(
        r#"<html><body>{script}
        <form id="registercardholderLoginUseridForm" action="/step2">
            <input type="text" name="userIdInput" value="" />
            <input type="submit" name="go" value="Continue" />
        </form>
        </body></html>"#,
        script = token_script(token)
    )
}

pub fn phrase_page(token: &str, phrase: &str) -> String {
    format!(
        r#"<html><body>{script}
        <div class="security_phrase_value">{phrase}</div>
        <form id="registercardholderLoginPasswordVerifyForm" action="/ignored">
            <input type="password" name="password" value="" />
        </form>
        </body></html>"#,
        script = token_script(token)
    )
}

/// Phrase page for an unrecognised user: no phrase block at all.
pub fn anonymous_phrase_page(token: &str) -> String {
    format!(
        r#"<html><body>{script}
        <form id="registercardholderLoginPasswordVerifyForm" action="/ignored">
            <input type="password" name="password" value="" />
        </form>
        </body></html>"#,
        script = token_script(token)
    )
}

pub fn challenge_page(token: &str) -> String {
    format!(
        r#"<html><body>{script}
        <form id="challengeForm" action="/step4">
            <input type="password" name="securityAnswer" value="" />
            <input type="checkbox" name="autoLogonOption" value="true" checked />
        </form>
        </body></html>"#,
        script = token_script(token)
    )
}

pub fn authenticated_page() -> String {
    r#"<html><body>
        <a href="/travelex/cardholder/chProfile.view">My profile</a>
    </body></html>"#
        .to_string()
}

pub fn balance_page(amount: &str) -> String {
    format!(r#"<html><body><div class="balanceTotal">{amount}</div></body></html>"#)
}

pub fn transaction_row(datetime: &str, status: &str, type_place: &str, amount: &str) -> String {
    format!(
        "<tr><td>{datetime}</td><td>{status}</td><td></td>\
         <td>{type_place}</td><td>{amount}</td></tr>"
    )
}

pub fn transactions_page(cycles: &[&str], rows: &str) -> String {
    let options: String = cycles
        .iter()
        .map(|cycle| format!(r#"<option value="{cycle}">{cycle}</option>"#))
        .collect();
    format!(
        r#"<html><body>
        <select id="prepaidCycle"><option value="">Select</option>{options}</select>
        <table id="txtable1"><tbody>{rows}</tbody></table>
        </body></html>"#
    )
}

/// History page without the cycle widget, as served for a specific cycle.
pub fn cycle_page(rows: &str) -> String {
    format!(
        r#"<html><body>
        <table id="txtable1"><tbody>{rows}</tbody></table>
        </body></html>"#
    )
}

pub fn credentials() -> Credentials {
    Credentials::new(
        USER_ID,
        PASSWORD,
        PHRASE,
        ANSWER,
        chrono_tz::Europe::London,
    )
}

pub fn connector_for(server: &MockServer) -> Connector {
    let base = server.uri().parse().unwrap();
    let fixtures = FixtureStore::with_path(
        std::env::temp_dir().join(format!("cashpassport-test-{}", uuid::Uuid::new_v4().simple())),
    );
    Connector::new(credentials())
        .unwrap()
        .with_endpoints(Endpoints::with_base(base))
        .with_fixtures(fixtures)
}

/// Mount the whole happy-path login exchange. The session token minted on
/// the landing page is `T-ONE`; later pages mint `T-TWO` and `T-THREE`.
pub async fn mount_login_success(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(HOME_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(landing_page("T-ONE")))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/step2"))
        .and(body_string_contains("csrfToken=T-ONE"))
        .and(body_string_contains(format!("userIdInput={USER_ID}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(phrase_page("T-TWO", PHRASE)),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/pkmslogin.form"))
        .and(body_string_contains("csrfToken=T-TWO"))
        .and(body_string_contains(format!("password={PASSWORD}")))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;

    // First validation fetch serves the challenge, the second confirms the
    // authenticated session.
    Mock::given(method("GET"))
        .and(path(PCF_CHECK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(challenge_page("T-THREE")))
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(PCF_CHECK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(authenticated_page()))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/step4"))
        .and(body_string_contains("csrfToken=T-THREE"))
        .and(body_string_contains("autoLogonOption=false"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// Spin up a mock portal and hand back a connector already logged in to it.
pub async fn logged_in_connector(server: &MockServer) -> Connector {
    mount_login_success(server).await;
    let connector = connector_for(server);
    connector.login().await.unwrap();
    connector
}
