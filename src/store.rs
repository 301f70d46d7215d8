use std::{collections::BTreeMap, sync::RwLock};

use thiserror::Error;

use crate::models::{Account, Credential, Transaction};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Lookup miss, surfaced distinctly so callers can tell "link an account
    /// first" apart from a remote failure.
    #[error("no linked credential for user {0}")]
    CredentialNotFound(String),
    #[error("{0}")]
    Other(String),
}

/// Result of one bulk save. The two inserts are attempted independently; a
/// failure on one side never stops the other.
#[derive(Debug)]
pub struct SaveOutcome {
    pub accounts: Result<usize, StoreError>,
    pub transactions: Result<usize, StoreError>,
}

impl SaveOutcome {
    pub fn fully_ok(&self) -> bool {
        self.accounts.is_ok() && self.transactions.is_ok()
    }
}

/// Per-user partitioned persistence. Accounts and transactions live in
/// partitions named from the user id; bulk insert is append-only with no
/// dedup at this boundary, and reads return the whole partition in a stable
/// order callers must not depend on.
pub trait Store: Send + Sync {
    fn save_credential(&self, credential: Credential) -> Result<(), StoreError>;

    fn find_credential(&self, uid: &str) -> Result<Credential, StoreError>;

    fn save_for(
        &self,
        uid: &str,
        accounts: &[Account],
        transactions: &[Transaction],
    ) -> SaveOutcome;

    fn list_accounts_for(&self, uid: &str) -> Result<Vec<Account>, StoreError>;

    fn list_transactions_for(&self, uid: &str) -> Result<Vec<Transaction>, StoreError>;
}

fn partition_name(uid: &str, kind: &str) -> String {
    format!("{}_{}", uid, kind)
}

pub struct InMemoryStore {
    credentials: RwLock<BTreeMap<String, Credential>>,
    account_partitions: RwLock<BTreeMap<String, Vec<Account>>>,
    transaction_partitions: RwLock<BTreeMap<String, Vec<Transaction>>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            credentials: RwLock::new(BTreeMap::new()),
            account_partitions: RwLock::new(BTreeMap::new()),
            transaction_partitions: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Store for InMemoryStore {
    fn save_credential(&self, credential: Credential) -> Result<(), StoreError> {
        // Re-linking overwrites by uid; key uniqueness must hold.
        self.credentials
            .write()
            .unwrap()
            .insert(credential.uid.clone(), credential);
        Ok(())
    }

    fn find_credential(&self, uid: &str) -> Result<Credential, StoreError> {
        self.credentials
            .read()
            .unwrap()
            .get(uid)
            .cloned()
            .ok_or_else(|| StoreError::CredentialNotFound(uid.to_string()))
    }

    fn save_for(
        &self,
        uid: &str,
        accounts: &[Account],
        transactions: &[Transaction],
    ) -> SaveOutcome {
        let accounts_saved: Result<usize, StoreError> = {
            let mut partitions = self.account_partitions.write().unwrap();
            let partition = partitions
                .entry(partition_name(uid, "accounts"))
                .or_default();
            partition.extend_from_slice(accounts);
            Ok(accounts.len())
        };

        let transactions_saved: Result<usize, StoreError> = {
            let mut partitions = self.transaction_partitions.write().unwrap();
            let partition = partitions
                .entry(partition_name(uid, "transactions"))
                .or_default();
            partition.extend_from_slice(transactions);
            Ok(transactions.len())
        };

        tracing::debug!(
            uid,
            accounts = accounts.len(),
            transactions = transactions.len(),
            "Saved window to partitions"
        );

        SaveOutcome {
            accounts: accounts_saved,
            transactions: transactions_saved,
        }
    }

    fn list_accounts_for(&self, uid: &str) -> Result<Vec<Account>, StoreError> {
        Ok(self
            .account_partitions
            .read()
            .unwrap()
            .get(&partition_name(uid, "accounts"))
            .cloned()
            .unwrap_or_default())
    }

    fn list_transactions_for(&self, uid: &str) -> Result<Vec<Transaction>, StoreError> {
        Ok(self
            .transaction_partitions
            .read()
            .unwrap()
            .get(&partition_name(uid, "transactions"))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Balances;

    fn account(id: &str) -> Account {
        Account {
            account_id: id.to_string(),
            name: format!("Account {}", id),
            official_name: None,
            mask: None,
            subtype: None,
            account_type: None,
            verification_status: None,
            balances: Balances::default(),
        }
    }

    #[test]
    fn test_partitions_never_mix_users() {
        let store = InMemoryStore::new();
        store.save_for("alice", &[account("a1")], &[]);
        store.save_for("bob", &[account("b1"), account("b2")], &[]);

        let alice = store.list_accounts_for("alice").unwrap();
        let bob = store.list_accounts_for("bob").unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(bob.len(), 2);
        assert_eq!(alice[0].account_id, "a1");
    }

    #[test]
    fn test_bulk_insert_is_append_only() {
        let store = InMemoryStore::new();
        store.save_for("alice", &[account("a1")], &[]);
        store.save_for("alice", &[account("a1")], &[]);

        // No dedup at the store boundary; the caller owns that decision.
        assert_eq!(store.list_accounts_for("alice").unwrap().len(), 2);
    }

    #[test]
    fn test_credential_overwrite_by_uid() {
        let store = InMemoryStore::new();
        store
            .save_credential(Credential::new("alice", "tok-old", "item-1"))
            .unwrap();
        store
            .save_credential(Credential::new("alice", "tok-new", "item-2"))
            .unwrap();

        let cred = store.find_credential("alice").unwrap();
        assert_eq!(cred.access_token, "tok-new");
        assert_eq!(cred.item_id, "item-2");
    }

    #[test]
    fn test_missing_credential_is_distinct_error() {
        let store = InMemoryStore::new();
        match store.find_credential("nobody") {
            Err(StoreError::CredentialNotFound(uid)) => assert_eq!(uid, "nobody"),
            other => panic!("Expected CredentialNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_partition_reads_back_empty() {
        let store = InMemoryStore::new();
        assert!(store.list_transactions_for("alice").unwrap().is_empty());
    }
}
