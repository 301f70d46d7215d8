use std::collections::HashSet;

use thiserror::Error;
use time::{Date, Duration, OffsetDateTime};

use crate::models::{Account, Transaction};
use crate::remote::{RemoteClient, RemoteError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    /// The remote kept reporting an unreached total; treated as an internal
    /// failure rather than a remote payload.
    #[error("page limit of {0} exceeded before reaching the reported total")]
    PageLimitExceeded(u32),
}

/// Everything fetched for one date window. Accounts are deduplicated,
/// transactions are the concatenation of all pages.
#[derive(Debug, Default)]
pub struct FetchedWindow {
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
}

/// Cursor over the remote's paged window. `total` is -1 until the first
/// page reports the window's transaction count.
#[derive(Debug, Clone, Copy)]
struct PageCursor {
    offset: i64,
    limit: i64,
    total: i64,
}

impl PageCursor {
    fn new(limit: i64) -> Self {
        Self {
            offset: 0,
            limit,
            total: -1,
        }
    }

    fn exhausted(&self) -> bool {
        self.total >= 0 && self.offset >= self.total
    }

    fn advance(&mut self, total: i64) {
        self.total = total;
        self.offset += self.limit;
    }
}

/// Drives the remote across pages until every transaction in the window has
/// been retrieved. Pure fetch-and-accumulate: no persistence, and any remote
/// error aborts the whole run with no partial result.
///
/// Accounts are captured from the first page only. The remote repeats the
/// account list on every page of a window; we assume it is page-invariant
/// and discard the later copies. That assumption is unverified upstream and
/// is pinned by `test_later_pages_accounts_are_discarded` in the tests.
pub async fn fetch_all_transactions(
    remote: &dyn RemoteClient,
    access_token: &str,
    start_date: Date,
    end_date: Date,
    page_size: i64,
    max_pages: u32,
) -> Result<FetchedWindow, SyncError> {
    let mut cursor = PageCursor::new(page_size);
    let mut window = FetchedWindow::default();
    let mut pages: u32 = 0;

    tracing::debug!(%start_date, %end_date, page_size, "Starting transaction sync");

    while !cursor.exhausted() {
        if pages >= max_pages {
            return Err(SyncError::PageLimitExceeded(max_pages));
        }

        let page = remote
            .transactions_page(access_token, start_date, end_date, cursor.limit, cursor.offset)
            .await?;

        if cursor.total < 0 {
            window.accounts = dedup_accounts(page.accounts);
        }
        window.transactions.extend(page.transactions);

        cursor.advance(page.total_transactions);
        pages += 1;

        tracing::debug!(
            offset = cursor.offset,
            total = cursor.total,
            pages,
            "Fetched transactions page"
        );
    }

    Ok(window)
}

/// Full-history window: a fixed lookback from today.
pub fn full_history_window(lookback_days: i64) -> (Date, Date) {
    let end = OffsetDateTime::now_utc().date();
    let start = end.saturating_sub(Duration::days(lookback_days));
    (start, end)
}

fn dedup_accounts(accounts: Vec<Account>) -> Vec<Account> {
    let mut seen = HashSet::new();
    accounts
        .into_iter()
        .filter(|a| seen.insert(a.account_id.clone()))
        .collect()
}
