use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Transaction kind, classified from the free-text type string the portal
/// renders. Anything it doesn't recognise stays `Unknown`; that is a
/// data-quality event, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Purchase,
    Withdrawal,
    Unknown,
}

impl TransactionKind {
    pub fn classify(type_string: &str) -> Self {
        match type_string.to_lowercase().as_str() {
            "purchase" => Self::Purchase,
            "withdrawal" => Self::Withdrawal,
            raw => {
                if !raw.is_empty() {
                    tracing::warn!(kind = raw, "unknown transaction type");
                }
                Self::Unknown
            }
        }
    }
}

/// One scraped transaction row. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Seconds since epoch, UTC, after the unverified-timestamp correction.
    #[serde(rename = "ts")]
    pub timestamp: i64,
    /// Normalised place/description; `"N/A"` when the row carried none.
    pub place: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Cleared (`true`) vs pending (`false`).
    pub verified: bool,
}

/// Opaque billing-cycle identifier scraped from the cycle selector widget.
/// No meaning is assumed beyond "distinct cycle"; it is only replayed into a
/// later page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleId(pub String);

impl CycleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
