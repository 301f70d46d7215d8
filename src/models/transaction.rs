use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

/// Transaction as reported by the aggregation API, keyed by the remote
/// `transaction_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub account_id: String,
    pub amount: Decimal,
    pub date: Date,
    #[serde(default)]
    pub authorized_date: Option<Date>,
    pub name: String,
    /// Ordered category path, most general first.
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub iso_currency_code: Option<String>,
    #[serde(default)]
    pub unofficial_currency_code: Option<String>,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub payment_meta: PaymentMeta,
    #[serde(default)]
    pub payment_channel: String,
    #[serde(default)]
    pub pending: bool,
    /// Informational link to the pending transaction this one settled,
    /// not an ownership edge.
    #[serde(default)]
    pub pending_transaction_id: Option<String>,
    #[serde(default)]
    pub account_owner: Option<String>,
    #[serde(default)]
    pub transaction_type: String,
    #[serde(default)]
    pub transaction_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub store_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PaymentMeta {
    #[serde(default)]
    pub by_order_of: Option<String>,
    #[serde(default)]
    pub payee: Option<String>,
    #[serde(default)]
    pub payer: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_processor: Option<String>,
    #[serde(default)]
    pub ppd_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub reference_number: Option<String>,
}
