//! The external KV-store contract the index core consumes.
//!
//! The store itself — persistence, replication, the real transaction
//! engine — is out of scope; this module only states the trait the rest of
//! the crate programs against, plus one in-memory implementation used by
//! tests (and by any caller happy to run without durability).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

/// Errors the KV layer can report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KvError {
    /// A key (or the key produced for a write) exceeded the store's limit.
    #[error("key of {len} bytes exceeds the maximum of {max} bytes")]
    KeyTooLarge {
        /// Offending key length.
        len: usize,
        /// Store-imposed maximum.
        max: usize,
    },
    /// The transaction's work function returned an error; the transaction
    /// was rolled back.
    #[error("transaction aborted: {0}")]
    Aborted(String),
}

/// A pointer into the ordered keyspace. Only the "first key at or after x"
/// selector is needed by this core; richer selectors (offsets, "first
/// greater than") are a store-specific extension point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelector {
    /// The first existing key `>= key`.
    FirstGreaterOrEqual(Vec<u8>),
}

impl KeySelector {
    /// The raw key this selector resolves relative to.
    pub fn reference_key(&self) -> &[u8] {
        match self {
            KeySelector::FirstGreaterOrEqual(k) => k,
        }
    }
}

/// Shape of a transaction: how long it may run and whether its reads are
/// isolated via snapshot semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionConfig {
    /// Whether reads observe a consistent snapshot rather than the latest
    /// committed value at read time.
    pub snapshot: bool,
    /// True for bulk/batch scans (longer allowed lifetime); false for the
    /// default short-lived strict transaction.
    pub batch: bool,
}

impl TransactionConfig {
    /// Short-lived, strict — the default for point reads/writes.
    pub const fn default_config() -> Self {
        TransactionConfig { snapshot: true, batch: false }
    }

    /// Longer-lived, for bulk scans (graph algorithms, index rebuilds).
    pub const fn batch() -> Self {
        TransactionConfig { snapshot: true, batch: true }
    }
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

/// One key-value pair as yielded by a range scan.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// A live transaction against the store.
///
/// `get_range` is the only read primitive the index core needs: a
/// single-pass, key-ordered, lazily-produced stream. Consumers may stop
/// pulling from the returned iterator at any time — no extra cleanup is
/// required beyond dropping it.
pub trait Transaction {
    /// Stream key-value pairs in `[begin, end)` key order.
    fn get_range<'a>(
        &'a self,
        begin: &KeySelector,
        end: &KeySelector,
        snapshot: bool,
    ) -> Box<dyn Iterator<Item = KvPair> + 'a>;

    /// Write a single key.
    fn set_value(&mut self, key: &[u8], value: &[u8]) -> Result<(), KvError>;

    /// Delete a single key.
    fn clear(&mut self, key: &[u8]) -> Result<(), KvError>;

    /// Delete every key in `[begin, end)`.
    fn clear_range(&mut self, begin: &[u8], end: &[u8]) -> Result<(), KvError>;
}

/// The store itself: acquires scoped transactions and guarantees their
/// release (commit on `Ok`, rollback on `Err`) on every exit path.
pub trait KvStore {
    /// The transaction type this store hands to `with_transaction`.
    type Txn<'a>: Transaction
    where
        Self: 'a;

    /// Run `f` against a fresh transaction. Commits on `Ok(_)`, rolls back
    /// on `Err(_)` or panic-unwind; the transaction is always released.
    fn with_transaction<F, T, E>(&self, config: TransactionConfig, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Txn<'_>) -> Result<T, E>,
        E: From<KvError>;

    /// Maximum key size this store will accept.
    fn max_key_size(&self) -> usize;
}

/// An ordered, in-process implementation of [`KvStore`] backed by a
/// `BTreeMap` behind a `parking_lot::RwLock`: a hash-ordered map cannot
/// support the ordered range scans this core requires.
#[derive(Clone)]
pub struct InMemoryStore {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
    max_key_size: usize,
}

impl InMemoryStore {
    /// A store with the default 10 KiB key-size ceiling.
    pub fn new() -> Self {
        Self::with_max_key_size(10 * 1024)
    }

    /// A store with an explicit key-size ceiling.
    pub fn with_max_key_size(max_key_size: usize) -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            max_key_size,
        }
    }

    /// Number of keys currently stored — test/debug helper.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// True if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-flight transaction over [`InMemoryStore`].
///
/// Writes are buffered in an overlay and only applied to the shared map on
/// commit; `get_range` merges the overlay over a snapshot taken when the
/// transaction started, so readers never see another transaction's
/// in-flight writes.
pub struct InMemoryTransaction<'a> {
    store: &'a InMemoryStore,
    snapshot: BTreeMap<Vec<u8>, Vec<u8>>,
    overlay: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    max_key_size: usize,
}

impl<'a> InMemoryTransaction<'a> {
    fn merged_view(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        let mut merged = self.snapshot.clone();
        for (k, v) in &self.overlay {
            match v {
                Some(value) => {
                    merged.insert(k.clone(), value.clone());
                }
                None => {
                    merged.remove(k);
                }
            }
        }
        merged
    }

    fn commit(self) {
        let mut guard = self.store.data.write();
        for (k, v) in self.overlay {
            match v {
                Some(value) => {
                    guard.insert(k, value);
                }
                None => {
                    guard.remove(&k);
                }
            }
        }
    }
}

impl<'a> Transaction for InMemoryTransaction<'a> {
    fn get_range<'b>(
        &'b self,
        begin: &KeySelector,
        end: &KeySelector,
        _snapshot: bool,
    ) -> Box<dyn Iterator<Item = KvPair> + 'b> {
        let begin_key = begin.reference_key().to_vec();
        let end_key = end.reference_key().to_vec();
        let merged = self.merged_view();
        let pairs: Vec<KvPair> = merged
            .range(begin_key..end_key)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Box::new(pairs.into_iter())
    }

    fn set_value(&mut self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        if key.len() > self.max_key_size {
            return Err(KvError::KeyTooLarge { len: key.len(), max: self.max_key_size });
        }
        self.overlay.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn clear(&mut self, key: &[u8]) -> Result<(), KvError> {
        self.overlay.insert(key.to_vec(), None);
        Ok(())
    }

    fn clear_range(&mut self, begin: &[u8], end: &[u8]) -> Result<(), KvError> {
        let keys_in_range: Vec<Vec<u8>> = self
            .merged_view()
            .range(begin.to_vec()..end.to_vec())
            .map(|(k, _)| k.clone())
            .collect();
        for k in keys_in_range {
            self.overlay.insert(k, None);
        }
        Ok(())
    }
}

impl KvStore for InMemoryStore {
    type Txn<'a> = InMemoryTransaction<'a>;

    fn with_transaction<F, T, E>(&self, _config: TransactionConfig, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Txn<'_>) -> Result<T, E>,
        E: From<KvError>,
    {
        let snapshot = self.data.read().clone();
        let mut txn = InMemoryTransaction {
            store: self,
            snapshot,
            overlay: BTreeMap::new(),
            max_key_size: self.max_key_size,
        };
        let result = f(&mut txn);
        match result {
            Ok(value) => {
                tracing::debug!(wrote = txn.overlay.len(), "transaction committed");
                txn.commit();
                Ok(value)
            }
            Err(err) => {
                tracing::debug!("transaction rolled back");
                drop(txn);
                Err(err)
            }
        }
    }

    fn max_key_size(&self) -> usize {
        self.max_key_size
    }
}

impl fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStore").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum TestError {
        Kv(KvError),
    }
    impl From<KvError> for TestError {
        fn from(e: KvError) -> Self {
            TestError::Kv(e)
        }
    }

    #[test]
    fn commit_persists_writes_ordered() {
        let store = InMemoryStore::new();
        store
            .with_transaction::<_, (), TestError>(TransactionConfig::default_config(), |txn| {
                txn.set_value(b"b", b"2")?;
                txn.set_value(b"a", b"1")?;
                txn.set_value(b"c", b"3")?;
                Ok(())
            })
            .unwrap();

        store
            .with_transaction::<_, (), TestError>(TransactionConfig::default_config(), |txn| {
                let items: Vec<_> = txn
                    .get_range(
                        &KeySelector::FirstGreaterOrEqual(vec![]),
                        &KeySelector::FirstGreaterOrEqual(vec![0xFF]),
                        true,
                    )
                    .collect();
                assert_eq!(items.len(), 3);
                assert_eq!(items[0].0, b"a");
                assert_eq!(items[1].0, b"b");
                assert_eq!(items[2].0, b"c");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn rollback_on_error_discards_writes() {
        let store = InMemoryStore::new();
        let result = store.with_transaction::<_, (), TestError>(
            TransactionConfig::default_config(),
            |txn| {
                txn.set_value(b"k", b"v")?;
                Err(TestError::Kv(KvError::Aborted("boom".into())))
            },
        );
        assert!(result.is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn oversized_key_is_rejected() {
        let store = InMemoryStore::with_max_key_size(4);
        let result = store.with_transaction::<_, (), TestError>(
            TransactionConfig::default_config(),
            |txn| {
                txn.set_value(b"too-long", b"v")?;
                Ok(())
            },
        );
        assert!(matches!(result, Err(TestError::Kv(KvError::KeyTooLarge { .. }))));
    }

    #[test]
    fn clear_range_removes_only_bounded_keys() {
        let store = InMemoryStore::new();
        store
            .with_transaction::<_, (), TestError>(TransactionConfig::default_config(), |txn| {
                txn.set_value(b"a", b"1")?;
                txn.set_value(b"m", b"2")?;
                txn.set_value(b"z", b"3")?;
                Ok(())
            })
            .unwrap();

        store
            .with_transaction::<_, (), TestError>(TransactionConfig::default_config(), |txn| {
                txn.clear_range(b"a", b"z")?;
                Ok(())
            })
            .unwrap();

        assert_eq!(store.len(), 1);
    }
}
