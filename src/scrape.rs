//! HTML-to-structured-data extraction.
//!
//! All parsing of the portal's styled-table markup lives here: transaction
//! history rows, the billing-cycle selector widget, the balance marker, and
//! the login-flow fragments (security phrase, authenticated-profile link).
//! Structural surprises are `Protocol` errors; an unknown transaction type is
//! only logged.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};

use crate::error::ConnectorError;
use crate::portal;
use crate::transaction::{CycleId, Transaction, TransactionKind};

fn table_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| {
        Selector::parse(&format!("table#{}", portal::TRANSACTION_TABLE_ID))
            .expect("invalid table selector")
    })
}

fn row_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("tbody tr").expect("invalid row selector"))
}

fn cell_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("td").expect("invalid cell selector"))
}

fn cycle_select_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| {
        Selector::parse(&format!("select#{}", portal::CYCLE_SELECT_ID))
            .expect("invalid cycle select selector")
    })
}

fn cycle_option_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| {
        Selector::parse(&format!("select#{} option", portal::CYCLE_SELECT_ID))
            .expect("invalid cycle option selector")
    })
}

fn balance_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| {
        Selector::parse(&format!("div.{}", portal::BALANCE_CLASS))
            .expect("invalid balance selector")
    })
}

fn phrase_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| {
        Selector::parse(&format!("div.{}", portal::SECURITY_PHRASE_CLASS))
            .expect("invalid phrase selector")
    })
}

fn profile_link_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| {
        Selector::parse(&format!(r#"a[href="{}"]"#, portal::PROFILE_LINK_HREF))
            .expect("invalid profile link selector")
    })
}

fn element_text(element: ElementRef) -> String {
    element.text().collect()
}

/// Date/time renderings observed on the one supported UI version.
const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
    "%b %d, %Y %I:%M:%S %p",
    "%b %d, %Y %I:%M %p",
];
const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d %b %Y", "%b %d, %Y"];

fn parse_portal_datetime(text: &str) -> Result<NaiveDateTime, ConnectorError> {
    let text = text.trim();
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(parsed);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(text, format) {
            return Ok(parsed.and_hms_opt(0, 0, 0).unwrap_or_default());
        }
    }
    Err(ConnectorError::protocol(format!(
        "unrecognised date/time text {text:?}"
    )))
}

/// Epoch seconds for a row, applying the portal's long-standing rendering
/// bug: unverified (pending) rows are rendered behind by exactly five hours
/// plus the zone's UTC offset, so the correction is added back rather than
/// "fixed" — matching the website's effective behavior bit for bit.
fn corrected_timestamp(
    local_time: NaiveDateTime,
    verified: bool,
    tz: Tz,
) -> Result<i64, ConnectorError> {
    let local = tz.from_local_datetime(&local_time).earliest().ok_or_else(|| {
        ConnectorError::protocol(format!("local time {local_time} does not exist in {tz}"))
    })?;
    let mut timestamp = local.timestamp();
    if !verified {
        let utc_offset = i64::from(local.offset().fix().local_minus_utc());
        timestamp += 5 * 3600 + utc_offset;
    }
    Ok(timestamp)
}

/// Split the combined type+place cell on the non-breaking space the portal
/// always renders after the transaction type.
///
/// Returns (type string, place). With no NBSP the row carries no place; with
/// one, the remainder is collapsed to single spaces with the trailing
/// `" more . . ."` suffix, commas, and any leading `"- "` marker removed. A
/// place that ends up empty is still emitted as such.
fn split_type_place(text: &str) -> (String, String) {
    let segments: Vec<&str> = text.split('\u{a0}').collect();
    if segments.len() < 2 {
        return (String::new(), "N/A".to_string());
    }

    let type_string: String = segments[0].split_whitespace().collect();
    let mut place = segments[1..]
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" more . . .", "")
        .replace(',', "");
    if place.starts_with('-') {
        place = place.get(2..).unwrap_or("").to_string();
    }
    (type_string, place)
}

/// Parse a money string of the form `"<number> <currency-code>"`: first
/// whitespace-delimited token, thousands separators stripped.
pub fn parse_money(text: &str) -> Result<Decimal, ConnectorError> {
    let token = text
        .split_whitespace()
        .next()
        .ok_or_else(|| ConnectorError::protocol("empty money string"))?;
    token.replace(',', "").parse::<Decimal>().map_err(|err| {
        ConnectorError::protocol(format!("unparseable money string {text:?}: {err}"))
    })
}

/// Parse every transaction row on a history page, in page order.
///
/// The site renders pending and cleared transactions as two separate tables
/// sharing one id; both are walked. Rows with fewer than five cells are
/// decoration and skipped. Ordering is left to the caller.
pub fn parse_transactions(page_text: &str, tz: Tz) -> Result<Vec<Transaction>, ConnectorError> {
    let document = Html::parse_document(page_text);
    let mut transactions = Vec::new();

    for table in document.select(table_selector()) {
        for row in table.select(row_selector()) {
            let cells: Vec<String> = row.select(cell_selector()).map(element_text).collect();
            if cells.len() < 5 {
                continue;
            }

            let verified = !cells[1].trim().eq_ignore_ascii_case("pending");
            let timestamp =
                corrected_timestamp(parse_portal_datetime(&cells[0])?, verified, tz)?;
            let (type_string, place) = split_type_place(&cells[3]);
            let kind = TransactionKind::classify(&type_string);
            let amount = parse_money(&cells[4])?;

            transactions.push(Transaction {
                timestamp,
                place,
                amount,
                kind,
                verified,
            });
        }
    }

    Ok(transactions)
}

/// Scan the cycle-selector widget for billing-cycle identifiers, in page
/// order, skipping placeholder options with an empty value.
pub fn extract_cycle_identifiers(page_text: &str) -> Result<Vec<CycleId>, ConnectorError> {
    let document = Html::parse_document(page_text);
    if document.select(cycle_select_selector()).next().is_none() {
        return Err(ConnectorError::protocol(
            "no billing-cycle selector on transactions page",
        ));
    }

    Ok(document
        .select(cycle_option_selector())
        .filter_map(|option| option.value().attr("value"))
        .filter(|value| !value.is_empty())
        .map(|value| CycleId(value.to_string()))
        .collect())
}

/// Pull the single monetary literal off the account-summary page.
pub fn parse_balance(page_text: &str) -> Result<Decimal, ConnectorError> {
    let document = Html::parse_document(page_text);
    let marker = document.select(balance_selector()).next().ok_or_else(|| {
        ConnectorError::protocol("no balance marker on account summary page")
    })?;
    parse_money(element_text(marker).trim())
}

/// The security phrase displayed mid-login, if the page carries one.
pub fn security_phrase(page_text: &str) -> Option<String> {
    let document = Html::parse_document(page_text);
    document
        .select(phrase_selector())
        .next()
        .map(|element| element_text(element).trim().to_string())
}

/// Whether the page carries the profile link only authenticated sessions see.
pub fn has_profile_link(page_text: &str) -> bool {
    let document = Html::parse_document(page_text);
    document.select(profile_link_selector()).next().is_some()
}
