use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub mod account;
pub mod transaction;

pub use account::{Account, Balances};
pub use transaction::{Location, PaymentMeta, Transaction};

/// Link between one of our users and an item at the aggregation API.
/// Created on token exchange, read on every data request. Keyed by `uid`;
/// re-linking overwrites the previous record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub uid: String,
    pub access_token: String,
    pub item_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
}

impl Credential {
    pub fn new(uid: &str, access_token: &str, item_id: &str) -> Self {
        Self {
            uid: uid.to_string(),
            access_token: access_token.to_string(),
            item_id: item_id.to_string(),
            issued_at: OffsetDateTime::now_utc(),
        }
    }
}
