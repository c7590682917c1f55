//! Local disk cache between a remote document store and file-handle callers.
//!
//! Every open of a remote path yields a [`SessionHandle`] backed by a
//! complete, locally materialized copy of the resource. The cache decides
//! cheaply whether an existing copy is still usable (a short freshness
//! window), revalidates it conditionally when not, swaps in new generations
//! without disturbing readers attached to old ones, and pushes modified
//! content back to the remote store on sync/release.
//!
//! Entry metadata lives in an embedded SQLite database; staged content lives
//! as plain files under the cache directory. Replacement relies on the
//! unlink-while-open guarantee of the underlying filesystem: a superseded
//! generation loses its directory entry but stays readable through any
//! descriptor already attached to it.

pub mod attrs;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handle;
mod resolver;
pub mod staging;
pub mod testkit;

pub use attrs::{AttrCache, MemoryAttrCache, SyntheticAttr};
pub use cache::FileCache;
pub use config::CacheConfig;
pub use db::{CacheEntry, MetadataDb};
pub use error::{FileCacheError, Result};
pub use handle::{AccessMode, SessionHandle};
