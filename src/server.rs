//! HTTP routing layer.
//!
//! Wraps a pool of [`Connector`] sessions behind a small JSON API keyed by
//! opaque session handles, so non-Rust clients can drive the portal without
//! speaking its scraping protocol. Portal errors cross the wire as their
//! stable numeric codes; a dead portal session invalidates the handle.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::connector::Connector;
use crate::credentials::Credentials;
use crate::error::ConnectorError;

/// Wire code for a missing, unknown, or invalidated session handle.
const INVALID_TOKEN_CODE: u32 = 20;

#[derive(Clone, Default)]
pub struct AppState {
    sessions: Arc<RwLock<HashMap<String, Arc<Connector>>>>,
}

pub fn router() -> Router {
    router_with_state(AppState::default())
}

pub fn router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/get-balance", get(get_balance))
        .route("/get-transactions", get(get_transactions))
        .route("/logout", post(logout))
        .with_state(state)
}

#[derive(Deserialize)]
struct LoginForm {
    user: Option<String>,
    pass: Option<String>,
    message: Option<String>,
    answer: Option<String>,
    zone: Option<String>,
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

#[derive(Deserialize)]
struct TransactionsQuery {
    token: Option<String>,
    #[serde(default)]
    from: i64,
}

fn invalid_token() -> Json<Value> {
    Json(json!({"error": "invalid token", "code": INVALID_TOKEN_CODE}))
}

fn connector_error(err: &ConnectorError) -> Json<Value> {
    Json(json!({
        "success": false,
        "error": err.to_string(),
        "code": err.code(),
    }))
}

async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Json<Value> {
    let missing = [
        (form.user.is_none(), "Must specify username"),
        (form.pass.is_none(), "Must specify password"),
        (form.message.is_none(), "Must specify secret message"),
        (form.answer.is_none(), "Must specify secret answer"),
        (form.zone.is_none(), "Must specify timezone"),
    ]
    .into_iter()
    .find_map(|(absent, message)| absent.then_some(message));
    if let Some(message) = missing {
        return Json(json!({"error": message}));
    }

    // All unwraps guarded by the presence check above.
    let zone = form.zone.unwrap();
    let time_zone = match Credentials::parse_time_zone(&zone) {
        Ok(tz) => tz,
        Err(err) => return Json(json!({"error": err.to_string()})),
    };
    let credentials = Credentials::new(
        form.user.unwrap(),
        form.pass.unwrap(),
        form.message.unwrap(),
        form.answer.unwrap(),
        time_zone,
    );

    let connector = match Connector::new(credentials) {
        Ok(connector) => Arc::new(connector),
        Err(err) => {
            return connector_error(&ConnectorError::connection(err.to_string()));
        }
    };

    if let Err(err) = connector.login().await {
        return connector_error(&err);
    }

    let handle = uuid::Uuid::new_v4().simple().to_string();
    tracing::info!(user_id = connector.user_id(), "session established");
    state
        .sessions
        .write()
        .await
        .insert(handle.clone(), connector);
    Json(json!({"success": true, "token": handle}))
}

async fn session(state: &AppState, token: Option<&str>) -> Option<(String, Arc<Connector>)> {
    let token = token?;
    let connector = state.sessions.read().await.get(token).cloned()?;
    Some((token.to_string(), connector))
}

/// The portal expires sessions on its own schedule; reads quietly re-login a
/// session that has gone stale rather than bouncing the client.
async fn revive_if_stale(connector: &Connector) {
    if !connector.is_logged_in().await {
        tracing::debug!(user_id = connector.user_id(), "session stale, re-logging in");
        if let Err(err) = connector.login().await {
            tracing::debug!(error = %err, "re-login failed");
        }
    }
}

async fn drop_session(state: &AppState, handle: &str) {
    state.sessions.write().await.remove(handle);
}

async fn get_balance(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Json<Value> {
    let Some((handle, connector)) = session(&state, query.token.as_deref()).await else {
        return invalid_token();
    };

    revive_if_stale(&connector).await;
    match connector.balance().await {
        Ok(balance) => Json(json!({"balance": balance})),
        Err(ConnectorError::LoggedOut) => {
            drop_session(&state, &handle).await;
            invalid_token()
        }
        Err(err) => connector_error(&err),
    }
}

async fn get_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>,
) -> Json<Value> {
    let Some((handle, connector)) = session(&state, query.token.as_deref()).await else {
        return invalid_token();
    };

    revive_if_stale(&connector).await;
    match connector.transactions(query.from).await {
        Ok(transactions) => Json(json!({"transactions": transactions})),
        Err(ConnectorError::LoggedOut) => {
            drop_session(&state, &handle).await;
            invalid_token()
        }
        Err(err) => connector_error(&err),
    }
}

async fn logout(State(state): State<AppState>, Query(query): Query<TokenQuery>) -> Json<Value> {
    let Some((handle, connector)) = session(&state, query.token.as_deref()).await else {
        return invalid_token();
    };

    if let Err(err) = connector.logout().await {
        tracing::debug!(error = %err, "portal logout failed, dropping handle anyway");
    }
    drop_session(&state, &handle).await;
    Json(json!({"success": true}))
}
