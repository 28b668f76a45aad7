//! Account management and statements for an authenticated owner.

use std::sync::Arc;

use bankcore_common::{AccountId, AuthFailure, BankError, Currency, Result};
use tracing::{info, instrument};

use crate::account::Account;
use crate::statement::{Page, StatementLine, StatementRequest};
use crate::store::LedgerStore;

/// Owner-scoped account operations.
pub struct AccountService {
    store: Arc<dyn LedgerStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Open an empty account in `currency` for `owner`.
    #[instrument(skip(self))]
    pub async fn create_account(&self, owner: &str, currency: &str) -> Result<Account> {
        let currency = Currency::parse(currency)?;
        let account = self.store.create_account(owner, &currency).await?;
        info!(account_id = %account.id, currency = %account.currency, "Account opened");
        Ok(account)
    }

    /// Fetch an account that `owner` holds.
    #[instrument(skip(self))]
    pub async fn get_account(&self, owner: &str, id: AccountId) -> Result<Account> {
        let account = self
            .store
            .get_account(id)
            .await?
            .ok_or(BankError::AccountNotFound(id))?;

        if !account.is_owned_by(owner) {
            return Err(AuthFailure::NotOwner.into());
        }
        Ok(account)
    }

    #[instrument(skip(self))]
    pub async fn list_accounts(&self, owner: &str, page: Page) -> Result<Vec<Account>> {
        self.store
            .list_accounts(owner, page.limit(), page.offset())
            .await
    }

    /// Transfers touching one of `owner`'s accounts, signed from its side.
    #[instrument(skip(self, request), fields(account_id = %request.account_id))]
    pub async fn account_statement(
        &self,
        owner: &str,
        request: &StatementRequest,
    ) -> Result<Vec<StatementLine>> {
        let filter = request.to_filter()?;
        self.get_account(owner, request.account_id).await?;

        let transfers = self.store.list_transfers(&filter).await?;
        Ok(transfers
            .into_iter()
            .filter_map(|t| StatementLine::for_account(t, request.account_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{TransferEngine, TransferRequest};
    use crate::memory::MemoryLedgerStore;
    use crate::TransferConfig;
    use bankcore_common::ErrorKind;
    use bankcore_fx::MemoryRateStore;
    use tokio_test::{assert_err, assert_ok};

    fn setup() -> (MemoryLedgerStore, AccountService) {
        let store = MemoryLedgerStore::new(Arc::new(MemoryRateStore::new()));
        let service = AccountService::new(Arc::new(store.clone()));
        (store, service)
    }

    #[tokio::test]
    async fn test_create_and_get_account() {
        let (_, service) = setup();
        let account = assert_ok!(service.create_account("alice", "usd").await);
        assert_eq!(account.balance, 0);
        assert_eq!(account.currency, Currency::usd());

        let fetched = assert_ok!(service.get_account("alice", account.id).await);
        assert_eq!(fetched, account);

        let err = assert_err!(service.get_account("bob", account.id).await);
        assert_eq!(err.auth_failure(), Some(AuthFailure::NotOwner));
    }

    #[tokio::test]
    async fn test_unsupported_currency() {
        let (_, service) = setup();
        let err = assert_err!(service.create_account("alice", "JPY").await);
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_list_accounts_pages() {
        let (_, service) = setup();
        for code in ["USD", "EUR", "KES", "GBP"] {
            assert_ok!(service.create_account("alice", code).await);
        }
        assert_ok!(service.create_account("bob", "USD").await);

        let page = Page::new(1, 5).unwrap();
        let accounts = assert_ok!(service.list_accounts("alice", page).await);
        assert_eq!(accounts.len(), 4);
        assert!(accounts.iter().all(|a| a.owner == "alice"));

        let page = Page::new(2, 5).unwrap();
        assert!(assert_ok!(service.list_accounts("alice", page).await).is_empty());
    }

    #[tokio::test]
    async fn test_statement_signs_amounts() {
        let (store, service) = setup();
        let a = store.insert_account("alice", Currency::usd(), 1000).unwrap();
        let b = store.insert_account("bob", Currency::usd(), 1000).unwrap();
        let engine = TransferEngine::new(Arc::new(store.clone()), TransferConfig::default());

        for (from, to, owner, amount) in [(a.id, b.id, "alice", 100), (b.id, a.id, "bob", 40)] {
            assert_ok!(
                engine
                    .execute(TransferRequest {
                        from_account_id: from,
                        to_account_id: to,
                        amount,
                        currency: Currency::usd(),
                        owner: owner.to_string(),
                    })
                    .await
            );
        }

        let request = StatementRequest {
            account_id: a.id,
            page: Page::new(1, 5).unwrap(),
            start_date: None,
            end_date: None,
        };
        let lines = assert_ok!(service.account_statement("alice", &request).await);
        let amounts: Vec<i64> = lines.iter().map(|l| l.signed_amount).collect();
        assert_eq!(amounts, vec![-100, 40]);

        let err = assert_err!(service.account_statement("bob", &request).await);
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }
}
