//! Connector for the Cashpassport prepaid-card cardholder portal.
//!
//! The portal has no API; this crate emulates a browser against one pinned
//! version of its web UI: the multi-step challenge/response login, the
//! balance and transaction-history pages, and the billing-cycle pagination
//! behind them. An optional JSON server (`server` feature) exposes the same
//! operations over HTTP.

pub mod auth;
pub mod connector;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod fixtures;
pub mod form;
pub mod portal;
pub mod scrape;
#[cfg(feature = "server")]
pub mod server;
pub mod token;
pub mod transaction;

pub use connector::Connector;
pub use credentials::Credentials;
pub use error::ConnectorError;
pub use fixtures::FixtureStore;
pub use portal::Endpoints;
pub use transaction::{CycleId, Transaction, TransactionKind};
