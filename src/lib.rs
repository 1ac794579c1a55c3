//! # Stash: Versioned, Size-Bounded, Persistent Key/Value Cache
//!
//! `stash` is a cache layered over a string-keyed persistence store such as a
//! browser's per-origin `localStorage`. It gives applications a domain-typed
//! `get`/`add`/`clear` surface while internally enforcing a declared byte
//! budget, evicting least-recently-used entries to make room, and migrating
//! entries across schema versions along a graph of user-supplied upgrades.
//!
//! This library has five main modules:
//!
//!    1. `store` defines the contract over the underlying string store and
//!       provides the in-memory and file-backed implementations of it.
//!    2. `codec` owns the key scheme, the size accounting and the JSON
//!       encodings of entry envelopes and cache metadata.
//!    3. `graph` finds the shortest chain of single-step upgrades between two
//!       schema versions.
//!    4. `cache` is the public facade, together with the eviction engine, the
//!       migrator and the metadata manager behind it.
//!    5. `clock` abstracts the wall clock, so that recency can be controlled
//!       in tests.
//!
//! No public operation returns an error. A cache is a cache: when the store is
//! unavailable or full beyond help, operations degrade to a miss or a no-op.

#[macro_use]
extern crate log;

pub mod store;
pub mod clock;
mod codec;
mod graph;
pub mod cache;

pub use cache::{Cache, CacheConfig, EvictionPolicy, Migration};
pub use clock::{Clock, ManualClock, SystemClock};
pub use store::file::FileStore;
pub use store::memory::MemoryStore;
pub use store::{StoreError, StringStore};
