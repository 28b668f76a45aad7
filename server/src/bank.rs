//! Service facade.
//!
//! Each operation takes the caller's verified [`TokenPayload`] where
//! ownership or administrator rights matter. The API layer obtains that
//! payload from [`Bank::authorize`].

use std::sync::Arc;

use bankcore_common::{AccountId, BankError, Currency, ExchangeRateId, Result, SessionId};
use bankcore_fx::{ExchangeRate, ExchangeRateService, MemoryRateStore, PgRateStore, RateStore};
use bankcore_ledger::{
    Account, AccountService, LedgerStore, MemoryLedgerStore, Page, PgLedgerStore, StatementLine,
    StatementRequest, TransferEngine, TransferRequest, TransferResult,
};
use bankcore_token::{
    new_token_maker, ClientMeta, MemorySessionStore, PgSessionStore, Session, SessionAuthority,
    SessionStore, TokenPayload,
};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::config::BankConfig;
use crate::state::BankState;

/// Tokens handed out at login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginSession {
    pub session_id: SessionId,
    pub username: String,
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}

pub struct Bank {
    state: RwLock<BankState>,
    authority: SessionAuthority,
    engine: TransferEngine,
    accounts: AccountService,
    rates: ExchangeRateService,
    access_token_duration: Duration,
    refresh_token_duration: Duration,
}

impl Bank {
    /// Build the service over the given stores.
    ///
    /// The ledger store brings its own row lock timeout;
    /// `config.transfer.lock_timeout` only configures the stores built by
    /// [`Bank::with_postgres`] and [`Bank::in_memory`].
    pub fn new(
        config: &BankConfig,
        ledger: Arc<dyn LedgerStore>,
        rates: Arc<dyn RateStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        let maker = new_token_maker(config.token.maker, &config.token.symmetric_key)?;

        Ok(Self {
            state: RwLock::new(BankState::Running),
            authority: SessionAuthority::new(
                maker,
                sessions,
                config.token.access_token_duration,
            ),
            engine: TransferEngine::new(ledger.clone(), config.transfer.clone()),
            accounts: AccountService::new(ledger),
            rates: ExchangeRateService::new(rates, config.admin_username.clone()),
            access_token_duration: config.token.access_token_duration,
            refresh_token_duration: config.token.refresh_token_duration,
        })
    }

    /// Build the service over Postgres.
    pub fn with_postgres(config: &BankConfig, pool: PgPool) -> Result<Self> {
        Self::new(
            config,
            Arc::new(PgLedgerStore::new(pool.clone(), config.transfer.lock_timeout)),
            Arc::new(PgRateStore::new(pool.clone())),
            Arc::new(PgSessionStore::new(pool)),
        )
    }

    /// Build the service over fresh in-memory stores. The returned ledger
    /// handle shares state with the service.
    pub fn in_memory(config: &BankConfig) -> Result<(Self, MemoryLedgerStore)> {
        let rates = Arc::new(MemoryRateStore::new());
        let ledger =
            MemoryLedgerStore::new(rates.clone()).with_lock_timeout(config.transfer.lock_timeout);
        let bank = Self::new(
            config,
            Arc::new(ledger.clone()),
            rates,
            Arc::new(MemorySessionStore::new()),
        )?;
        Ok((bank, ledger))
    }

    pub fn state(&self) -> BankState {
        *self.state.read()
    }

    /// Stop accepting new requests.
    pub fn stop(&self) {
        *self.state.write() = BankState::ShuttingDown;
        info!("Bank stopped accepting requests");
    }

    fn ensure_running(&self) -> Result<()> {
        if !self.state().accepts_requests() {
            return Err(BankError::Contention("service is shutting down".to_string()));
        }
        Ok(())
    }

    // Sessions and tokens

    /// Issue an access token and a refresh session for a user whose
    /// credentials the caller has already checked.
    #[instrument(skip(self, client))]
    pub async fn login(&self, username: &str, client: ClientMeta) -> Result<LoginSession> {
        self.ensure_running()?;
        let (access_token, access) = self
            .authority
            .issue_access_token(username, self.access_token_duration)?;
        let refresh = self
            .authority
            .issue_refresh_session(username, self.refresh_token_duration, client)
            .await?;

        Ok(LoginSession {
            session_id: refresh.session_id,
            username: access.username,
            access_token,
            access_token_expires_at: access.expires_at,
            refresh_token: refresh.refresh_token,
            refresh_token_expires_at: refresh.expires_at,
        })
    }

    pub fn issue_access_token(&self, username: &str, duration: Duration) -> Result<(String, TokenPayload)> {
        self.authority.issue_access_token(username, duration)
    }

    pub async fn issue_refresh_session(
        &self,
        username: &str,
        duration: Duration,
        client: ClientMeta,
    ) -> Result<(String, SessionId)> {
        self.ensure_running()?;
        let issued = self
            .authority
            .issue_refresh_session(username, duration, client)
            .await?;
        Ok((issued.refresh_token, issued.session_id))
    }

    pub fn verify_access_token(&self, token: &str) -> Result<TokenPayload> {
        self.authority.verify_access_token(token)
    }

    /// Verify an `Authorization` header.
    pub fn authorize(&self, header: Option<&str>) -> Result<TokenPayload> {
        self.authority.authorize(header)
    }

    pub async fn renew_access_token(&self, refresh_token: &str) -> Result<(String, TokenPayload)> {
        self.ensure_running()?;
        self.authority.renew_access_token(refresh_token).await
    }

    pub async fn revoke_session(&self, caller: &TokenPayload, session_id: SessionId) -> Result<Session> {
        self.authority.revoke_session(&caller.username, session_id).await
    }

    // Transfers

    /// Move `amount` from one of the caller's accounts.
    #[instrument(skip(self, caller), fields(caller = %caller.username))]
    pub async fn execute_transfer(
        &self,
        caller: &TokenPayload,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
        currency: &str,
    ) -> Result<TransferResult> {
        self.ensure_running()?;
        let currency = Currency::parse(currency)?;

        self.engine
            .execute(TransferRequest {
                from_account_id,
                to_account_id,
                amount,
                currency,
                owner: caller.username.clone(),
            })
            .await
    }

    // Accounts

    pub async fn create_account(&self, caller: &TokenPayload, currency: &str) -> Result<Account> {
        self.ensure_running()?;
        self.accounts.create_account(&caller.username, currency).await
    }

    pub async fn get_account(&self, caller: &TokenPayload, id: AccountId) -> Result<Account> {
        self.accounts.get_account(&caller.username, id).await
    }

    pub async fn list_accounts(
        &self,
        caller: &TokenPayload,
        page_id: i64,
        page_size: i64,
    ) -> Result<Vec<Account>> {
        let page = Page::new(page_id, page_size)?;
        self.accounts.list_accounts(&caller.username, page).await
    }

    pub async fn account_statement(
        &self,
        caller: &TokenPayload,
        request: &StatementRequest,
    ) -> Result<Vec<StatementLine>> {
        self.accounts.account_statement(&caller.username, request).await
    }

    // Exchange rates

    pub async fn create_exchange_rate(
        &self,
        caller: &TokenPayload,
        base_currency: &str,
        target_currency: &str,
        rate: Decimal,
    ) -> Result<ExchangeRate> {
        self.ensure_running()?;
        self.rates
            .create_exchange_rate(&caller.username, base_currency, target_currency, rate)
            .await
    }

    pub async fn update_exchange_rate(
        &self,
        caller: &TokenPayload,
        id: ExchangeRateId,
        rate: Decimal,
    ) -> Result<ExchangeRate> {
        self.ensure_running()?;
        self.rates
            .update_exchange_rate(&caller.username, id, rate)
            .await
    }

    pub async fn get_exchange_rate(&self, base_currency: &str, target_currency: &str) -> Result<ExchangeRate> {
        self.rates.get_exchange_rate(base_currency, target_currency).await
    }

    pub async fn list_exchange_rates(&self) -> Result<Vec<ExchangeRate>> {
        self.rates.list_exchange_rates().await
    }
}
