use std::time::Duration;

use bankcore_common::{AuthFailure, Currency, ErrorKind};
use bankcore_ledger::{LedgerStore, LedgerTx, MemoryLedgerStore, Page, StatementRequest};
use bankcore_server::{Bank, BankConfig, ErrorResponse};
use bankcore_token::{ClientMeta, TokenMakerKind};
use rust_decimal_macros::dec;
use tokio_test::{assert_err, assert_ok};

struct Harness {
    ledger: MemoryLedgerStore,
    bank: Bank,
}

fn config(maker: TokenMakerKind) -> BankConfig {
    let mut config = BankConfig::default();
    config.token.symmetric_key = "0123456789abcdef0123456789abcdef".to_string();
    config.token.maker = maker;
    config
}

fn harness(maker: TokenMakerKind) -> Harness {
    let (bank, ledger) = Bank::in_memory(&config(maker)).unwrap();
    Harness { ledger, bank }
}

fn client() -> ClientMeta {
    ClientMeta {
        user_agent: "integration".to_string(),
        client_ip: "127.0.0.1".to_string(),
    }
}

#[tokio::test]
async fn test_login_transfer_and_statement() {
    let h = harness(TokenMakerKind::Jwt);
    let login = assert_ok!(h.bank.login("alice", client()).await);
    let header = format!("Bearer {}", login.access_token);
    let alice = assert_ok!(h.bank.authorize(Some(&header)));
    assert_eq!(alice.username, "alice");

    let from = h.ledger.insert_account("alice", Currency::usd(), 1000).unwrap();
    let to = h.ledger.insert_account("bob", Currency::usd(), 500).unwrap();

    let result = assert_ok!(
        h.bank
            .execute_transfer(&alice, from.id, to.id, 300, "USD")
            .await
    );
    assert_eq!(result.from_account.balance, 700);
    assert_eq!(result.to_account.balance, 800);

    let request = StatementRequest {
        account_id: from.id,
        page: Page::new(1, 5).unwrap(),
        start_date: None,
        end_date: None,
    };
    let lines = assert_ok!(h.bank.account_statement(&alice, &request).await);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].signed_amount, -300);

    let accounts = assert_ok!(h.bank.list_accounts(&alice, 1, 5).await);
    assert_eq!(accounts.len(), 1);
    assert!(h.bank.list_accounts(&alice, 1, 50).await.is_err());
}

#[tokio::test]
async fn test_cross_currency_through_admin_rate() {
    let h = harness(TokenMakerKind::Sealed);
    let (admin_token, _) = h
        .bank
        .issue_access_token("admin", chrono::Duration::minutes(5))
        .unwrap();
    let admin = h.bank.verify_access_token(&admin_token).unwrap();
    let (alice_token, _) = h
        .bank
        .issue_access_token("alice", chrono::Duration::minutes(5))
        .unwrap();
    let alice = h.bank.verify_access_token(&alice_token).unwrap();

    let err = assert_err!(h.bank.create_exchange_rate(&alice, "USD", "KES", dec!(130)).await);
    assert_eq!(err.auth_failure(), Some(AuthFailure::NotAdministrator));

    let rate = assert_ok!(h.bank.create_exchange_rate(&admin, "USD", "KES", dec!(120)).await);
    assert_ok!(h.bank.update_exchange_rate(&admin, rate.id, dec!(130)).await);
    assert_eq!(
        assert_ok!(h.bank.get_exchange_rate("usd", "kes").await).rate,
        dec!(130)
    );

    let usd = h.ledger.insert_account("alice", Currency::usd(), 100).unwrap();
    let kes = h.ledger.insert_account("carol", Currency::kes(), 0).unwrap();
    let result = assert_ok!(h.bank.execute_transfer(&alice, usd.id, kes.id, 10, "USD").await);
    assert_eq!(result.from_account.balance, 90);
    assert_eq!(result.to_account.balance, 1300);
}

#[tokio::test]
async fn test_blocked_refresh_issues_nothing() {
    let h = harness(TokenMakerKind::Jwt);
    let login = h.bank.login("alice", client()).await.unwrap();
    let alice = h.bank.verify_access_token(&login.access_token).unwrap();

    assert_ok!(h.bank.renew_access_token(&login.refresh_token).await);
    assert_ok!(h.bank.revoke_session(&alice, login.session_id).await);

    let err = assert_err!(h.bank.renew_access_token(&login.refresh_token).await);
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(ErrorResponse::from(&err).error, "unauthorized");
}

#[tokio::test]
async fn test_transfer_from_foreign_account_is_unauthorized() {
    let h = harness(TokenMakerKind::Jwt);
    let (token, _) = h
        .bank
        .issue_access_token("mallory", chrono::Duration::minutes(5))
        .unwrap();
    let mallory = h.bank.verify_access_token(&token).unwrap();

    let victim = h.ledger.insert_account("alice", Currency::usd(), 1000).unwrap();
    let sink = h.ledger.insert_account("mallory", Currency::usd(), 0).unwrap();

    let err = assert_err!(
        h.bank
            .execute_transfer(&mallory, victim.id, sink.id, 1000, "USD")
            .await
    );
    assert_eq!(err.auth_failure(), Some(AuthFailure::NotOwner));
    assert_eq!(h.ledger.accounts()[0].balance, 1000);
}

#[tokio::test]
async fn test_stopped_bank_refuses_transfers() {
    let h = harness(TokenMakerKind::Jwt);
    let login = h.bank.login("alice", client()).await.unwrap();
    let alice = h.bank.verify_access_token(&login.access_token).unwrap();
    let from = h.ledger.insert_account("alice", Currency::usd(), 10).unwrap();
    let to = h.ledger.insert_account("bob", Currency::usd(), 0).unwrap();

    h.bank.stop();
    let err = assert_err!(h.bank.execute_transfer(&alice, from.id, to.id, 5, "USD").await);
    assert!(err.is_retryable());
    assert!(h.ledger.transfers().is_empty());
}

#[tokio::test]
async fn test_configured_lock_timeout_reaches_memory_ledger() {
    let mut config = config(TokenMakerKind::Jwt);
    config.transfer.lock_timeout = Duration::from_millis(20);
    config.transfer.max_retries = 0;
    let (bank, ledger) = Bank::in_memory(&config).unwrap();

    let (token, _) = bank
        .issue_access_token("alice", chrono::Duration::minutes(5))
        .unwrap();
    let alice = bank.verify_access_token(&token).unwrap();
    let from = ledger.insert_account("alice", Currency::usd(), 100).unwrap();
    let to = ledger.insert_account("bob", Currency::usd(), 0).unwrap();

    let mut holder = ledger.begin().await.unwrap();
    holder.get_account_for_update(to.id).await.unwrap();

    let started = tokio::time::Instant::now();
    let err = assert_err!(bank.execute_transfer(&alice, from.id, to.id, 10, "USD").await);
    assert_eq!(err.kind(), ErrorKind::Contention);
    assert!(started.elapsed() < Duration::from_secs(2));

    holder.rollback().await.unwrap();
    assert_ok!(bank.execute_transfer(&alice, from.id, to.id, 10, "USD").await);
}
