//! Ordered key-value codec, edge scanner, and graph index maintainer.
//!
//! This crate implements the graph index core over an
//! external transactional, range-ordered key-value store: [`codec`] packs
//! scalar tuples into order-preserving bytes, [`strategy`] names the key
//! orderings each indexing strategy maintains and picks the best one for a
//! query's bound shape, [`maintainer`] keeps those orderings consistent
//! under writes, and [`scanner`] reads them back out as a lazy edge stream.
//! [`kv`] states the store contract the rest of the crate programs against.

#![warn(missing_docs, rust_2018_idioms)]

mod codec;
mod kv;
mod maintainer;
mod scanner;
mod strategy;

pub use codec::{CodecError, Subspace};
pub use kv::{InMemoryStore, InMemoryTransaction, KeySelector, KvError, KvPair, KvStore, Transaction, TransactionConfig};
pub use maintainer::{GraphIndexMaintainer, IndexError};
pub use scanner::EdgeScanner;
pub use strategy::{IndexStrategy, Ordering, Role};
