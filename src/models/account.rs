use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account as reported by the aggregation API, keyed by the remote
/// `account_id`. Stored verbatim and read back unchanged for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub name: String,
    #[serde(default)]
    pub official_name: Option<String>,
    #[serde(default)]
    pub mask: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub verification_status: Option<String>,
    #[serde(default)]
    pub balances: Balances,
}

/// Balance sub-record. Every field is nullable at the remote; absent and
/// zero must stay distinguishable all the way through CSV export.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Balances {
    #[serde(default)]
    pub available: Option<Decimal>,
    #[serde(default)]
    pub current: Option<Decimal>,
    #[serde(default)]
    pub limit: Option<Decimal>,
    #[serde(default)]
    pub iso_currency_code: Option<String>,
    #[serde(default)]
    pub unofficial_currency_code: Option<String>,
}
