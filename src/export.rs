use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{Account, Transaction};

/// Default field delimiter. Category paths and street addresses contain
/// natural commas, so the export uses a delimiter that cannot collide with
/// the data instead of CSV quoting.
pub const DEFAULT_DELIMITER: u8 = b'#';

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv flush failed: {0}")]
    Flush(String),
}

/// One exported column: header label plus an accessor that renders the
/// field as text. Nested sub-records are flattened by giving each of their
/// fields its own column.
pub struct Column<T> {
    pub header: &'static str,
    pub get: fn(&T) -> String,
}

/// Declared column order for a record kind. Column sets are fixed tables,
/// so header layout changes only when the table does.
pub type FieldSpec<T> = &'static [Column<T>];

/// Header line for a field spec, using the configured delimiter.
pub fn header<T>(spec: FieldSpec<T>, delimiter: u8) -> String {
    spec.iter()
        .map(|c| c.header)
        .collect::<Vec<_>>()
        .join(&(delimiter as char).to_string())
}

/// Projects records into CSV bytes: one header line, then one row per
/// record, every row exactly as wide as the spec. Missing optional fields
/// emit an empty string, never a null marker or a dropped column.
pub fn project<T>(records: &[T], spec: FieldSpec<T>, delimiter: u8) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(spec.iter().map(|c| c.header))?;
    for record in records {
        writer.write_record(spec.iter().map(|c| (c.get)(record)))?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.to_string()))
}

/// Content type advertised with the export, naming the delimiter in use.
pub fn content_type(delimiter: u8) -> String {
    format!("text/csv; delimiter={}", delimiter as char)
}

fn opt_str(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn opt_decimal(value: &Option<Decimal>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}

fn opt_float(value: &Option<f64>) -> String {
    value.map(|f| format!("{:.6}", f)).unwrap_or_default()
}

pub const ACCOUNT_FIELDS: FieldSpec<Account> = &[
    Column { header: "account_id", get: |a| a.account_id.clone() },
    Column { header: "available", get: |a| opt_decimal(&a.balances.available) },
    Column { header: "current", get: |a| opt_decimal(&a.balances.current) },
    Column { header: "limit", get: |a| opt_decimal(&a.balances.limit) },
    Column { header: "iso_currency_code", get: |a| opt_str(&a.balances.iso_currency_code) },
    Column { header: "unofficial_currency_code", get: |a| opt_str(&a.balances.unofficial_currency_code) },
    Column { header: "mask", get: |a| opt_str(&a.mask) },
    Column { header: "name", get: |a| a.name.clone() },
    Column { header: "official_name", get: |a| opt_str(&a.official_name) },
    Column { header: "subtype", get: |a| opt_str(&a.subtype) },
    Column { header: "type", get: |a| opt_str(&a.account_type) },
    Column { header: "verification_status", get: |a| opt_str(&a.verification_status) },
];

pub const TRANSACTION_FIELDS: FieldSpec<Transaction> = &[
    Column { header: "account_id", get: |t| t.account_id.clone() },
    Column { header: "amount", get: |t| t.amount.to_string() },
    Column { header: "iso_currency_code", get: |t| opt_str(&t.iso_currency_code) },
    Column { header: "unofficial_currency_code", get: |t| opt_str(&t.unofficial_currency_code) },
    Column { header: "category", get: |t| t.category.join(",") },
    Column { header: "category_id", get: |t| opt_str(&t.category_id) },
    Column { header: "date", get: |t| t.date.to_string() },
    Column { header: "authorized_date", get: |t| t.authorized_date.map(|d| d.to_string()).unwrap_or_default() },
    Column { header: "address", get: |t| opt_str(&t.location.address) },
    Column { header: "city", get: |t| opt_str(&t.location.city) },
    Column { header: "lat", get: |t| opt_float(&t.location.lat) },
    Column { header: "lon", get: |t| opt_float(&t.location.lon) },
    Column { header: "region", get: |t| opt_str(&t.location.region) },
    Column { header: "store_number", get: |t| opt_str(&t.location.store_number) },
    Column { header: "postal_code", get: |t| opt_str(&t.location.postal_code) },
    Column { header: "country", get: |t| opt_str(&t.location.country) },
    Column { header: "name", get: |t| t.name.clone() },
    Column { header: "by_order_of", get: |t| opt_str(&t.payment_meta.by_order_of) },
    Column { header: "payee", get: |t| opt_str(&t.payment_meta.payee) },
    Column { header: "payer", get: |t| opt_str(&t.payment_meta.payer) },
    Column { header: "payment_method", get: |t| opt_str(&t.payment_meta.payment_method) },
    Column { header: "payment_processor", get: |t| opt_str(&t.payment_meta.payment_processor) },
    Column { header: "ppd_id", get: |t| opt_str(&t.payment_meta.ppd_id) },
    Column { header: "reason", get: |t| opt_str(&t.payment_meta.reason) },
    Column { header: "reference_number", get: |t| opt_str(&t.payment_meta.reference_number) },
    Column { header: "payment_channel", get: |t| t.payment_channel.clone() },
    Column { header: "pending", get: |t| t.pending.to_string() },
    Column { header: "pending_transaction_id", get: |t| opt_str(&t.pending_transaction_id) },
    Column { header: "account_owner", get: |t| opt_str(&t.account_owner) },
    Column { header: "transaction_id", get: |t| t.transaction_id.clone() },
    Column { header: "transaction_type", get: |t| t.transaction_type.clone() },
    Column { header: "transaction_code", get: |t| opt_str(&t.transaction_code) },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Balances, Location, PaymentMeta};
    use rust_decimal_macros::dec;
    use time::macros::date;

    fn account(id: &str, available: Option<Decimal>) -> Account {
        Account {
            account_id: id.to_string(),
            name: "Checking".to_string(),
            official_name: None,
            mask: Some("1234".to_string()),
            subtype: Some("checking".to_string()),
            account_type: Some("depository".to_string()),
            verification_status: None,
            balances: Balances {
                available,
                current: Some(dec!(1203.42)),
                limit: None,
                iso_currency_code: Some("USD".to_string()),
                unofficial_currency_code: None,
            },
        }
    }

    fn transaction(id: &str) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            account_id: "acc-1".to_string(),
            amount: dec!(12.50),
            date: date!(2023 - 01 - 15),
            authorized_date: None,
            name: "COFFEE SHOP".to_string(),
            category: vec!["Food and Drink".to_string(), "Coffee".to_string()],
            category_id: None,
            iso_currency_code: Some("USD".to_string()),
            unofficial_currency_code: None,
            location: Location {
                address: Some("4 Privet Drive, Little Whinging".to_string()),
                ..Location::default()
            },
            payment_meta: PaymentMeta::default(),
            payment_channel: "in store".to_string(),
            pending: false,
            pending_transaction_id: None,
            account_owner: None,
            transaction_type: "place".to_string(),
            transaction_code: None,
        }
    }

    fn lines(bytes: Vec<u8>) -> Vec<String> {
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    #[test]
    fn test_row_count_is_records_plus_header() {
        let records = vec![transaction("t1"), transaction("t2"), transaction("t3")];
        let out = lines(project(&records, TRANSACTION_FIELDS, DEFAULT_DELIMITER).unwrap());
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_row_width_is_invariant() {
        let records = vec![
            account("a1", Some(dec!(100.00))),
            account("a2", None),
        ];
        let out = lines(project(&records, ACCOUNT_FIELDS, DEFAULT_DELIMITER).unwrap());

        let width = ACCOUNT_FIELDS.len();
        for line in &out {
            assert_eq!(
                line.split('#').count(),
                width,
                "every line must have exactly {} fields: {}",
                width,
                line
            );
        }
    }

    #[test]
    fn test_absent_balance_is_empty_not_zero() {
        let records = vec![account("a1", None), account("a2", Some(dec!(0)))];
        let out = lines(project(&records, ACCOUNT_FIELDS, DEFAULT_DELIMITER).unwrap());

        let absent: Vec<&str> = out[1].split('#').collect();
        let zero: Vec<&str> = out[2].split('#').collect();
        assert_eq!(absent[1], "", "absent available must export empty");
        assert_eq!(zero[1], "0", "zero available must export as 0");
    }

    #[test]
    fn test_category_commas_do_not_widen_rows() {
        let records = vec![transaction("t1")];
        let out = lines(project(&records, TRANSACTION_FIELDS, DEFAULT_DELIMITER).unwrap());

        let row: Vec<&str> = out[1].split('#').collect();
        assert_eq!(row.len(), TRANSACTION_FIELDS.len());
        assert_eq!(row[4], "Food and Drink,Coffee");
        assert_eq!(row[8], "4 Privet Drive, Little Whinging");
    }

    #[test]
    fn test_header_matches_spec_order() {
        let line = header(ACCOUNT_FIELDS, DEFAULT_DELIMITER);
        assert!(line.starts_with("account_id#available#current#limit#"));
        assert_eq!(line.split('#').count(), ACCOUNT_FIELDS.len());
    }

    #[test]
    fn test_content_type_names_delimiter() {
        assert_eq!(content_type(DEFAULT_DELIMITER), "text/csv; delimiter=#");
    }
}
