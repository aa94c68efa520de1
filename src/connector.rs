//! Session facade.
//!
//! One [`Connector`] owns one logged-in session: the cookie-bearing fetcher,
//! the session token, and the credential set. Operations on a session are
//! serialized behind a single mutex because the portal threads state through
//! cookies that later requests depend on; independent sessions share
//! nothing. A re-entrancy flag (not a queue) rejects a second login while
//! one is in flight.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use reqwest::Url;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::auth;
use crate::credentials::Credentials;
use crate::error::ConnectorError;
use crate::fetch::{Page, PageFetcher};
use crate::fixtures::FixtureStore;
use crate::portal::{self, Endpoints};
use crate::scrape;
use crate::transaction::Transaction;

/// Token handed out by the offline development mode instead of running the
/// network exchange.
const OFFLINE_TOKEN: &str = "DUMMY";

#[derive(Default)]
struct SessionState {
    fetcher: Option<PageFetcher>,
    token: Option<String>,
}

/// An emulated cardholder session against the portal.
pub struct Connector {
    credentials: Credentials,
    endpoints: Endpoints,
    fixtures: FixtureStore,
    offline: bool,
    login_in_flight: AtomicBool,
    state: Mutex<SessionState>,
}

impl Connector {
    pub fn new(credentials: Credentials) -> Result<Self> {
        Ok(Self {
            credentials,
            endpoints: Endpoints::production(),
            fixtures: FixtureStore::new()?,
            offline: false,
            login_in_flight: AtomicBool::new(false),
            state: Mutex::new(SessionState::default()),
        })
    }

    /// Point the connector at a different portal base URL (tests).
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Use a custom snapshot location instead of the cache directory.
    pub fn with_fixtures(mut self, fixtures: FixtureStore) -> Self {
        self.fixtures = fixtures;
        self
    }

    /// Offline development mode: login is bypassed and reads are served from
    /// the fixture store. A test seam, not a protocol variant.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.credentials.user_id
    }

    pub async fn is_logged_in(&self) -> bool {
        self.state.lock().await.token.is_some()
    }

    /// Drive the full login exchange, replacing any existing session.
    ///
    /// Fails immediately with `LoginInProgress` if another login on this
    /// session is already in flight.
    pub async fn login(&self) -> Result<(), ConnectorError> {
        if self.login_in_flight.swap(true, Ordering::SeqCst) {
            return Err(ConnectorError::LoginInProgress);
        }
        let result = self.login_inner().await;
        self.login_in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn login_inner(&self) -> Result<(), ConnectorError> {
        let mut state = self.state.lock().await;

        if self.offline {
            state.fetcher = None;
            state.token = Some(OFFLINE_TOKEN.to_string());
            return Ok(());
        }

        tracing::debug!(user_id = %self.credentials.user_id, "logging in");

        // Fresh client per attempt: the cookie jar must not carry state from
        // a previous session.
        let fetcher = PageFetcher::new()?;
        let token = auth::run_login(&fetcher, &self.endpoints, &self.credentials).await?;

        state.fetcher = Some(fetcher);
        state.token = Some(token);
        Ok(())
    }

    /// End the session. Idempotent: logging out of a logged-out session is a
    /// no-op success.
    pub async fn logout(&self) -> Result<(), ConnectorError> {
        let mut state = self.state.lock().await;
        if state.token.is_none() {
            return Ok(());
        }

        if !self.offline {
            if let Some(fetcher) = &state.fetcher {
                tracing::debug!(user_id = %self.credentials.user_id, "logging out");
                fetcher.get(&self.endpoints.logout()?).await?;
            }
        }
        state.token = None;
        state.fetcher = None;
        Ok(())
    }

    /// Fetch a page that requires authentication.
    ///
    /// The portal silently redirects stale sessions to a login page instead
    /// of returning an HTTP error, so the only reliable expiry signal is the
    /// response resolving to a different URL than requested; that drops the
    /// session and surfaces `LoggedOut`. Transport failures surface as
    /// `Connection` without invalidating the session.
    async fn authorized_page(
        state: &mut SessionState,
        url: Url,
        form: Option<&[(String, String)]>,
    ) -> Result<String, ConnectorError> {
        if let (Some(fetcher), Some(_)) = (&state.fetcher, &state.token) {
            let page: Page = match form {
                Some(fields) => fetcher.post_form(&url, fields).await?,
                None => fetcher.get(&url).await?,
            };
            if page.url == url {
                return Ok(page.body);
            }
            tracing::debug!(requested = %url, resolved = %page.url, "authorized page redirected");
        }

        state.token = None;
        state.fetcher = None;
        Err(ConnectorError::LoggedOut)
    }

    /// Current account balance.
    pub async fn balance(&self) -> Result<Decimal, ConnectorError> {
        let mut state = self.state.lock().await;
        state.token.as_ref().ok_or(ConnectorError::LoggedOut)?;

        let page = if self.offline {
            self.fixtures.load_balance_page().map_err(|err| {
                ConnectorError::connection(format!("no balance fixture: {err}"))
            })?
        } else {
            let url = self.endpoints.balance()?;
            let page = Self::authorized_page(&mut state, url, None).await?;
            self.snapshot(FixtureStore::store_balance_page, &page);
            page
        };

        scrape::parse_balance(&page)
    }

    /// Transaction history at or after `from_timestamp` (epoch seconds; 0
    /// means all history), ascending by timestamp.
    ///
    /// Starts from the current activity page; only when that page excluded
    /// nothing does the requested window possibly extend further back, in
    /// which case the billing cycles discovered on the same page are walked
    /// oldest history last, stopping at the first page containing an
    /// out-of-range transaction.
    pub async fn transactions(
        &self,
        from_timestamp: i64,
    ) -> Result<Vec<Transaction>, ConnectorError> {
        let mut state = self.state.lock().await;
        state.token.as_ref().ok_or(ConnectorError::LoggedOut)?;

        if self.offline {
            let page = self.fixtures.load_transactions_page().map_err(|err| {
                ConnectorError::connection(format!("no transactions fixture: {err}"))
            })?;
            let mut transactions: Vec<Transaction> =
                scrape::parse_transactions(&page, self.credentials.time_zone)?
                    .into_iter()
                    .filter(|tx| tx.timestamp >= from_timestamp)
                    .collect();
            transactions.sort_by_key(|tx| tx.timestamp);
            return Ok(transactions);
        }

        tracing::debug!(
            user_id = %self.credentials.user_id,
            from_timestamp,
            "retrieving transaction history"
        );

        let url = self.endpoints.transactions()?;
        let first_page = Self::authorized_page(&mut state, url.clone(), None).await?;
        self.snapshot(FixtureStore::store_transactions_page, &first_page);

        let parsed = scrape::parse_transactions(&first_page, self.credentials.time_zone)?;
        let mut collected: Vec<Transaction> = parsed
            .iter()
            .filter(|tx| tx.timestamp >= from_timestamp)
            .cloned()
            .collect();

        // An excluded transaction on the current page means the rest of the
        // history is already out of range; nothing further is fetched.
        if collected.len() == parsed.len() {
            for cycle in scrape::extract_cycle_identifiers(&first_page)? {
                tracing::debug!(cycle = cycle.as_str(), "fetching billing-cycle page");

                let token = state
                    .token
                    .clone()
                    .ok_or(ConnectorError::LoggedOut)?;
                let fields = cycle_form(&token, cycle.as_str());
                let page =
                    Self::authorized_page(&mut state, url.clone(), Some(&fields)).await?;

                let parsed = scrape::parse_transactions(&page, self.credentials.time_zone)?;
                let kept = parsed
                    .iter()
                    .filter(|tx| tx.timestamp >= from_timestamp)
                    .cloned()
                    .collect::<Vec<_>>();
                let exhausted = kept.len() != parsed.len();
                collected.extend(kept);
                if exhausted {
                    break;
                }
            }
        }

        collected.sort_by_key(|tx| tx.timestamp);
        Ok(collected)
    }

    fn snapshot(&self, store: fn(&FixtureStore, &str) -> std::io::Result<()>, page: &str) {
        if let Err(err) = store(&self.fixtures, page) {
            tracing::debug!(error = %err, "failed to snapshot fetched page");
        }
    }
}

/// Form body for a billing-cycle activity fetch. The session token minted at
/// login rides along as the csrf field.
fn cycle_form(token: &str, cycle: &str) -> Vec<(String, String)> {
    vec![
        ("csrfToken".to_string(), token.to_string()),
        (
            "current".to_string(),
            (cycle == portal::CURRENT_CYCLE).to_string(),
        ),
        ("acrossCycles".to_string(), "false".to_string()),
        ("theme".to_string(), "plain".to_string()),
        ("prepaidCycle".to_string(), cycle.to_string()),
    ]
}
