use thiserror::Error;

pub mod file;
pub mod memory;

/// The two failures a string store may surface.
///
/// `Disabled` means the store is unavailable for the rest of the session
/// (private browsing mode, host policy, a broken file). Callers treat it as
/// "no work done". `QuotaExceeded` is raised by `set` alone and is the signal
/// that drives eviction.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    #[error("persistence store is unavailable in this session")]
    Disabled,

    #[error("write would exceed the store's byte quota")]
    QuotaExceeded,
}

/// Contract over a string-keyed persistence store, such as a browser's
/// per-origin `localStorage`.
///
/// Methods take `&self`: a store handle is shared between every cache that
/// lives on top of it, so implementations use interior mutability, the same
/// way a browser storage handle behaves.
///
/// Required of implementors:
///
///   - Keys are unique; `get` returns the exact string last `set`.
///   - `set` fails with `QuotaExceeded` iff the write would exceed the
///     store's budget; otherwise it succeeds durably.
///   - `keys` enumerates all keys currently present, in any order.
///   - Any operation may fail with `Disabled`.
pub trait StringStore {
    /// Fetch the value stored under `key`, or `None` if absent.
    fn get(&self, key : &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key : &str, value : &str) -> Result<(), StoreError>;

    /// Remove the value stored under `key`. Removing an absent key succeeds.
    fn remove(&self, key : &str) -> Result<(), StoreError>;

    /// Remove every key in the store, not just those of one cache.
    fn clear(&self) -> Result<(), StoreError>;

    /// List every key currently present, in no particular order.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}
