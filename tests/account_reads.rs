//! Balance and transaction-history reads against a mock portal, including
//! the billing-cycle pagination walk and silent-redirect session expiry.

mod support;

use chrono::TimeZone;
use chrono_tz::Europe::London;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cashpassport::ConnectorError;

fn epoch(y: i32, m: u32, d: u32, h: u32) -> i64 {
    London.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap().timestamp()
}

#[tokio::test]
async fn balance_parses_off_the_account_summary_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(support::BALANCE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(support::balance_page("1,234.50 GBP")),
        )
        .mount(&server)
        .await;

    let connector = support::logged_in_connector(&server).await;
    let balance = connector.balance().await.unwrap();
    assert_eq!(balance, "1234.50".parse().unwrap());
}

#[tokio::test]
async fn reads_without_a_session_fail_as_logged_out() {
    let server = MockServer::start().await;
    let connector = support::connector_for(&server);

    assert!(matches!(
        connector.balance().await.unwrap_err(),
        ConnectorError::LoggedOut
    ));
    assert!(matches!(
        connector.transactions(0).await.unwrap_err(),
        ConnectorError::LoggedOut
    ));
}

#[tokio::test]
async fn excluded_transaction_on_current_page_stops_pagination() {
    let server = MockServer::start().await;

    let rows = [
        support::transaction_row(
            "15/01/2024 12:00",
            "Cleared",
            "Purchase\u{a0}Shop A",
            "3.50 GBP",
        ),
        support::transaction_row(
            "05/01/2024 09:00",
            "Cleared",
            "Purchase\u{a0}Shop B",
            "7.00 GBP",
        ),
    ]
    .concat();
    Mock::given(method("GET"))
        .and(path(support::TRANSACTIONS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(support::transactions_page(&["cycle-a"], &rows)),
        )
        .mount(&server)
        .await;
    // The excluded Jan 5 row proves the window is already exhausted, so no
    // cycle page may be fetched.
    Mock::given(method("POST"))
        .and(path(support::TRANSACTIONS_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let connector = support::logged_in_connector(&server).await;
    let transactions = connector.transactions(epoch(2024, 1, 10, 0)).await.unwrap();

    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].place, "Shop A");
    server.verify().await;
}

#[tokio::test]
async fn cycles_are_walked_until_the_first_out_of_range_page() {
    let server = MockServer::start().await;
    let from = epoch(2023, 12, 15, 0);

    let current_rows = support::transaction_row(
        "20/01/2024 12:00",
        "Cleared",
        "Purchase\u{a0}Current",
        "1.00 GBP",
    );
    Mock::given(method("GET"))
        .and(path(support::TRANSACTIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            support::transactions_page(&["cycle-a", "cycle-b", "cycle-c"], &current_rows),
        ))
        .mount(&server)
        .await;

    // Cycle fetches replay the landing token as the csrf field.
    let cycle_a_rows = support::transaction_row(
        "20/12/2023 10:00",
        "Cleared",
        "Purchase\u{a0}Cycle A",
        "2.00 GBP",
    );
    Mock::given(method("POST"))
        .and(path(support::TRANSACTIONS_PATH))
        .and(body_string_contains("csrfToken=T-ONE"))
        .and(body_string_contains("prepaidCycle=cycle-a"))
        .and(body_string_contains("current=false"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(support::cycle_page(&cycle_a_rows)),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Cycle B mixes one in-range and one out-of-range row; the walk keeps
    // the former and stops.
    let cycle_b_rows = [
        support::transaction_row(
            "16/12/2023 10:00",
            "Cleared",
            "Purchase\u{a0}Cycle B kept",
            "3.00 GBP",
        ),
        support::transaction_row(
            "10/12/2023 10:00",
            "Cleared",
            "Purchase\u{a0}Cycle B dropped",
            "4.00 GBP",
        ),
    ]
    .concat();
    Mock::given(method("POST"))
        .and(path(support::TRANSACTIONS_PATH))
        .and(body_string_contains("prepaidCycle=cycle-b"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(support::cycle_page(&cycle_b_rows)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(support::TRANSACTIONS_PATH))
        .and(body_string_contains("prepaidCycle=cycle-c"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let connector = support::logged_in_connector(&server).await;
    let transactions = connector.transactions(from).await.unwrap();

    let places: Vec<&str> = transactions.iter().map(|tx| tx.place.as_str()).collect();
    assert_eq!(places, vec!["Cycle B kept", "Cycle A", "Current"]);
    assert!(transactions
        .windows(2)
        .all(|w| w[0].timestamp <= w[1].timestamp));
    server.verify().await;
}

#[tokio::test]
async fn silent_redirect_drops_the_session_and_reports_logged_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(support::TRANSACTIONS_PATH))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", support::HOME_PATH),
        )
        .mount(&server)
        .await;

    let connector = support::logged_in_connector(&server).await;
    let err = connector.transactions(0).await.unwrap_err();
    assert!(matches!(err, ConnectorError::LoggedOut));
    assert!(!connector.is_logged_in().await);
}
