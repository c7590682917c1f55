//! Lightweight test harness for cache integration tests.
//!
//! Provides in-process stand-ins for the external collaborators so the
//! fetch/freshness/replace protocol can be exercised without a remote
//! server. Pair [`MockRemoteStore`] with
//! [`crate::attrs::MemoryAttrCache`] and a tempdir-backed cache.

mod remote;

pub use remote::MockRemoteStore;
