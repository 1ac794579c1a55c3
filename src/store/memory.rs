use std::cell::RefCell;
use std::collections::HashMap;

use super::{StoreError, StringStore};
use crate::codec;

/// An in-memory store, the reference implementation of the `StringStore`
/// contract and the backend the test suite runs against.
///
/// A quota may be imposed to imitate a browser's per-origin budget. The quota
/// is expressed in the same units the caches account in: sixteen bits per
/// UTF-16 code unit of every stored key and value. A store may also be
/// constructed in a disabled state, where every operation fails the way a
/// store in a locked-down host would.
pub struct MemoryStore {
    entries : RefCell<HashMap<String, String>>,
    quota_bits : Option<i64>,
    disabled : bool
}

impl MemoryStore {
    /// Construct an empty store with no quota.
    pub fn new() -> Self {
        MemoryStore {
            entries : RefCell::new(HashMap::new()),
            quota_bits : None,
            disabled : false
        }
    }

    /// Construct an empty store that rejects writes once the total size of
    /// all keys and values would exceed `quota_bits`.
    pub fn with_quota(quota_bits : i64) -> Self {
        MemoryStore {
            entries : RefCell::new(HashMap::new()),
            quota_bits : Some(quota_bits),
            disabled : false
        }
    }

    /// Construct a store on which every operation fails with `Disabled`.
    pub fn disabled() -> Self {
        MemoryStore {
            entries : RefCell::new(HashMap::new()),
            quota_bits : None,
            disabled : true
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total size of all stored keys and values, in bits.
    pub fn used_bits(&self) -> i64 {
        self.entries
            .borrow()
            .iter()
            .map(|(key, value)| codec::entry_bits(key, value))
            .sum()
    }

    fn guard(&self) -> Result<(), StoreError> {
        if self.disabled { Err(StoreError::Disabled) } else { Ok(()) }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl StringStore for MemoryStore {
    fn get(&self, key : &str) -> Result<Option<String>, StoreError> {
        self.guard()?;
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key : &str, value : &str) -> Result<(), StoreError> {
        self.guard()?;
        if let Some(quota) = self.quota_bits {
            let displaced = match self.entries.borrow().get(key) {
                Some(old) => codec::entry_bits(key, old),
                None => 0
            };
            let used_after = self.used_bits() - displaced + codec::entry_bits(key, value);
            if used_after > quota {
                return Err(StoreError::QuotaExceeded);
            }
        }
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key : &str) -> Result<(), StoreError> {
        self.guard()?;
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.guard()?;
        self.entries.borrow_mut().clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.guard()?;
        Ok(self.entries.borrow().keys().cloned().collect())
    }
}
