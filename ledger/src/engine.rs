//! Transfer engine.
//!
//! Moves money between two accounts as one unit of work: both rows are
//! locked in `ordered_pair` order, the transfer and its two entries are
//! written, both balances are updated, and the unit commits or leaves no
//! trace. Contention before commit is retried with backoff; an unknown
//! commit outcome is surfaced as-is.

use std::sync::Arc;

use bankcore_common::{
    apply_delta, ensure_positive, AccountId, AuthFailure, BankError, Currency, CurrencyPair,
    ErrorKind, Result,
};
use bankcore_fx::convert;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::account::Account;
use crate::config::TransferConfig;
use crate::journal::{Entry, Transfer};
use crate::lock_order::ordered_pair;
use crate::store::{LedgerStore, LedgerTx, NewEntry, NewTransfer};

/// A request to move `amount` source units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    /// Amount debited from the source, in its minor units.
    pub amount: i64,
    /// Currency the caller believes the source account holds.
    pub currency: Currency,
    /// Authenticated caller; must own the source account.
    pub owner: String,
}

/// Every record a committed transfer created or updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub transfer: Transfer,
    pub from_entry: Entry,
    pub to_entry: Entry,
    pub from_account: Account,
    pub to_account: Account,
}

/// Executes transfers against a ledger store.
pub struct TransferEngine {
    store: Arc<dyn LedgerStore>,
    config: TransferConfig,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn LedgerStore>, config: TransferConfig) -> Self {
        Self { store, config }
    }

    /// Execute a transfer, retrying contention up to `max_retries` times.
    #[instrument(
        skip(self, request),
        fields(
            from = %request.from_account_id,
            to = %request.to_account_id,
            amount = request.amount
        )
    )]
    pub async fn execute(&self, request: TransferRequest) -> Result<TransferResult> {
        if request.from_account_id == request.to_account_id {
            return Err(BankError::SameAccount(request.from_account_id));
        }
        ensure_positive(request.amount)?;

        let mut retries = 0;
        loop {
            match self.attempt(&request).await {
                Ok(result) => {
                    info!(
                        transfer_id = %result.transfer.id,
                        credited = result.transfer.amount,
                        retries,
                        "Transfer committed"
                    );
                    return Ok(result);
                }
                Err(err) if err.is_retryable() && retries < self.config.max_retries => {
                    retries += 1;
                    let delay = self.config.backoff_for(retries);
                    warn!(
                        error = %err,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        "Transfer hit contention, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    match err.kind() {
                        ErrorKind::Indeterminate => error!(
                            error = %err,
                            owner = %request.owner,
                            "Transfer commit outcome unknown, reconciliation required"
                        ),
                        ErrorKind::Internal => error!(error = %err, "Transfer failed"),
                        _ => {}
                    }
                    return Err(err);
                }
            }
        }
    }

    async fn attempt(&self, request: &TransferRequest) -> Result<TransferResult> {
        let mut tx = self.store.begin().await?;

        match apply(tx.as_mut(), request).await {
            Ok(result) => {
                tx.commit().await?;
                Ok(result)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}

/// The writes of one transfer, inside an open unit of work.
async fn apply(tx: &mut dyn LedgerTx, request: &TransferRequest) -> Result<TransferResult> {
    let (first, second) = ordered_pair(request.from_account_id, request.to_account_id);
    let first_account = tx
        .get_account_for_update(first)
        .await?
        .ok_or(BankError::AccountNotFound(first))?;
    let second_account = tx
        .get_account_for_update(second)
        .await?
        .ok_or(BankError::AccountNotFound(second))?;

    let (from_account, to_account) = if first == request.from_account_id {
        (first_account, second_account)
    } else {
        (second_account, first_account)
    };

    if !from_account.is_owned_by(&request.owner) {
        return Err(AuthFailure::NotOwner.into());
    }
    if from_account.currency != request.currency {
        return Err(BankError::CurrencyMismatch {
            account: from_account.id,
            expected: from_account.currency.clone(),
            actual: request.currency.clone(),
        });
    }

    let (credited, rate) = credited_amount(tx, &from_account, &to_account, request.amount).await?;

    if !from_account.can_debit(request.amount) {
        return Err(BankError::InsufficientFunds {
            account: from_account.id,
            required: request.amount,
            available: from_account.balance,
        });
    }
    let from_balance = apply_delta(from_account.balance, -request.amount)?;
    let to_balance = apply_delta(to_account.balance, credited)?;

    let transfer = tx
        .create_transfer(NewTransfer {
            from_account_id: from_account.id,
            to_account_id: to_account.id,
            amount: credited,
            source_amount: request.amount,
            exchange_rate: rate,
        })
        .await?;
    let from_entry = tx
        .create_entry(NewEntry {
            account_id: from_account.id,
            transfer_id: transfer.id,
            amount: -request.amount,
        })
        .await?;
    let to_entry = tx
        .create_entry(NewEntry {
            account_id: to_account.id,
            transfer_id: transfer.id,
            amount: credited,
        })
        .await?;

    let from_account = tx.update_account_balance(from_account.id, from_balance).await?;
    let to_account = tx.update_account_balance(to_account.id, to_balance).await?;

    Ok(TransferResult {
        transfer,
        from_entry,
        to_entry,
        from_account,
        to_account,
    })
}

/// Amount credited to `to` and the rate applied, if any.
async fn credited_amount(
    tx: &mut dyn LedgerTx,
    from: &Account,
    to: &Account,
    amount: i64,
) -> Result<(i64, Option<Decimal>)> {
    if from.currency == to.currency {
        return Ok((amount, None));
    }

    let pair = CurrencyPair::new(from.currency.clone(), to.currency.clone())?;
    let rate = tx
        .get_exchange_rate(&pair)
        .await?
        .ok_or(BankError::ExchangeRateNotFound(pair))?;
    let conversion = convert(amount, &rate)?;

    Ok((conversion.converted_amount, Some(conversion.rate)))
}
