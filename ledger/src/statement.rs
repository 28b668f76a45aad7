//! Paging and account statements.

use bankcore_common::{AccountId, BankError, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::journal::Transfer;
use crate::store::TransferFilter;

pub const MIN_PAGE_SIZE: i64 = 5;
pub const MAX_PAGE_SIZE: i64 = 10;

/// One page of a listing. `page_id` starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPage")]
pub struct Page {
    pub page_id: i64,
    pub page_size: i64,
}

impl Page {
    pub fn new(page_id: i64, page_size: i64) -> Result<Self> {
        if page_id < 1 {
            return Err(BankError::validation("page_id must be at least 1", "page_id"));
        }
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(BankError::validation(
                format!("page_size must be between {MIN_PAGE_SIZE} and {MAX_PAGE_SIZE}"),
                "page_size",
            ));
        }
        (page_id - 1)
            .checked_mul(page_size)
            .ok_or_else(|| BankError::validation("page_id is out of range", "page_id"))?;
        Ok(Self { page_id, page_size })
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    /// Rows skipped before this page. `new` rejects pages whose offset
    /// would not fit in an `i64`.
    pub fn offset(&self) -> i64 {
        (self.page_id - 1).saturating_mul(self.page_size)
    }
}

#[derive(Deserialize)]
struct RawPage {
    page_id: i64,
    page_size: i64,
}

impl TryFrom<RawPage> for Page {
    type Error = BankError;

    fn try_from(raw: RawPage) -> Result<Self> {
        Page::new(raw.page_id, raw.page_size)
    }
}

/// Statement query for one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementRequest {
    pub account_id: AccountId,
    pub page: Page,
    /// First day included, UTC.
    pub start_date: Option<NaiveDate>,
    /// Last day included, UTC.
    pub end_date: Option<NaiveDate>,
}

impl StatementRequest {
    /// Check the date range and build the store filter.
    pub fn to_filter(&self) -> Result<TransferFilter> {
        let (created_from, created_until) = match (self.start_date, self.end_date) {
            (None, None) => (None, None),
            (Some(start), Some(end)) => {
                if start > end {
                    return Err(BankError::validation(
                        "start_date cannot be greater than end_date",
                        "start_date",
                    ));
                }
                (Some(start_of(start)?), Some(start_of(next_day(end)?)?))
            }
            _ => {
                return Err(BankError::validation(
                    "both start_date and end_date must be provided",
                    "end_date",
                ))
            }
        };

        Ok(TransferFilter {
            account_id: self.account_id,
            created_from,
            created_until,
            limit: self.page.limit(),
            offset: self.page.offset(),
        })
    }
}

fn next_day(date: NaiveDate) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(1))
        .ok_or_else(|| BankError::validation("end_date is out of range", "end_date"))
}

fn start_of(date: NaiveDate) -> Result<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| BankError::validation("date is out of range", "start_date"))
}

/// A transfer seen from one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLine {
    pub transfer: Transfer,
    /// Negative source amount when the account sent, positive credited
    /// amount when it received.
    pub signed_amount: i64,
}

impl StatementLine {
    pub fn for_account(transfer: Transfer, account_id: AccountId) -> Option<Self> {
        let signed_amount = transfer.signed_amount_for(account_id)?;
        Some(Self {
            transfer,
            signed_amount,
        })
    }
}
