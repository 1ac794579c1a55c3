use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::clock::{Clock, SystemClock};
use crate::codec;
use crate::codec::{Envelope, QueueEntry};
use crate::store::StringStore;

mod crawler;
mod eviction;
mod metadata;
mod migrate;

/// How victims are chosen when the byte budget runs out. Only least-recently
/// used eviction is defined; the persisted policy tag leaves room for more.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvictionPolicy {
    Lru
}

impl EvictionPolicy {
    pub(crate) fn tag(self) -> &'static str {
        match self {
            EvictionPolicy::Lru => "LRU"
        }
    }
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        EvictionPolicy::Lru
    }
}

/// A single schema upgrade step from version `from` to version `to`.
///
/// The `upgrade` function receives the user key and the entry's intermediate
/// value as stored under the old version, and produces the value under the
/// new version. Returning `None` drops the entry instead of upgrading it.
pub struct Migration {
    pub from : u32,
    pub to : u32,
    upgrade : Box<dyn Fn(&str, Value) -> Option<Value>>
}

impl Migration {
    pub fn new<F>(from : u32, to : u32, upgrade : F) -> Self
    where F : Fn(&str, Value) -> Option<Value> + 'static {
        Migration {
            from,
            to,
            upgrade : Box::new(upgrade)
        }
    }

    pub(crate) fn apply(&self, user_key : &str, value : Value) -> Option<Value> {
        (self.upgrade)(user_key, value)
    }
}

/// Everything needed to construct a `Cache`.
///
/// `name` namespaces every key this cache touches in the shared store;
/// `version` is the schema version values are written at; `kilobytes` is the
/// byte budget (`8 * 1024 * kilobytes` bits of accounting). The `encode` and
/// `decode` transformers move between the caller's domain type and the JSON
/// intermediate that actually gets persisted.
pub struct CacheConfig<T>
where T : 'static {
    name : String,
    version : u32,
    kilobytes : i64,
    encode : Box<dyn Fn(&T) -> Value>,
    decode : Box<dyn Fn(&Value) -> Option<T>>,
    migrations : Vec<Migration>,
    policy : EvictionPolicy,
    overflow : Option<Box<dyn Fn(&str)>>
}

impl<T> CacheConfig<T>
where T : 'static {
    pub fn new<E, D>(name : &str, version : u32, kilobytes : i64, encode : E, decode : D) -> Self
    where E : Fn(&T) -> Value + 'static,
          D : Fn(&Value) -> Option<T> + 'static {
        CacheConfig {
            name : name.to_string(),
            version,
            kilobytes,
            encode : Box::new(encode),
            decode : Box::new(decode),
            migrations : Vec::new(),
            policy : EvictionPolicy::default(),
            overflow : None
        }
    }

    /// Declare the upgrade steps available for entries written at older
    /// versions.
    pub fn migrations(mut self, migrations : Vec<Migration>) -> Self {
        self.migrations = migrations;
        self
    }

    pub fn policy(mut self, policy : EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register a fire-and-forget hook, called with the raw key of any write
    /// that could not be accommodated even after eviction.
    pub fn overflow<F>(mut self, hook : F) -> Self
    where F : Fn(&str) + 'static {
        self.overflow = Some(Box::new(hook));
        self
    }
}

impl<T> CacheConfig<T>
where T : Serialize + DeserializeOwned + 'static {
    /// A config whose transformers are derived from the type's serde
    /// implementations. Values that cannot be represented as JSON encode as
    /// null and decode as a miss, consistent with the rest of the error
    /// model.
    pub fn serde(name : &str, version : u32, kilobytes : i64) -> Self {
        CacheConfig::new(
            name,
            version,
            kilobytes,
            |value : &T| serde_json::to_value(value).unwrap_or(Value::Null),
            |value : &Value| serde_json::from_value(value.clone()).ok()
        )
    }
}

/// The non-generic half of a cache: the identity, the budget, the upgrade
/// steps and the collaborators. The metadata manager, the eviction engine and
/// the migrator are all written against this, so they are compiled once
/// rather than once per domain type.
pub(crate) struct CacheCore {
    pub(crate) name : String,
    pub(crate) version : u32,
    pub(crate) max_bits : i64,
    pub(crate) policy : EvictionPolicy,
    pub(crate) migrations : Vec<Migration>,
    pub(crate) overflow : Option<Box<dyn Fn(&str)>>,
    pub(crate) store : Rc<dyn StringStore>,
    pub(crate) clock : Rc<dyn Clock>
}

impl CacheCore {
    /// Load metadata and bring the cache to the configured version, running
    /// migrations when the persisted version differs. A migration's outcome
    /// is persisted immediately: a later miss writes no metadata, and upgrade
    /// functions must never run twice over the same entry.
    pub(crate) fn ensure_version(&self) -> (i64, Vec<QueueEntry>) {
        let meta = self.load_metadata();
        if meta.version == self.version {
            (meta.bits, meta.equeue)
        }
        else {
            let (bits, equeue) = self.migrate(meta.version);
            self.persist_metadata(bits, equeue)
        }
    }

    pub(crate) fn report_overflow(&self, raw_key : &str) {
        if let Some(hook) = &self.overflow {
            hook(raw_key);
        }
    }

    /// Remove every key this cache owns, then reinitialize the metadata
    /// record at the configured version with a plain write. Individual
    /// failures are swallowed; a partially cleared cache self-heals through
    /// the usual decode-failure and rebuild paths.
    pub(crate) fn clear_all(&self) {
        let metadata_key = codec::metadata_key(&self.name);
        let prefix = codec::entry_prefix(&self.name);
        if let Ok(keys) = self.store.keys() {
            for key in keys {
                if key == metadata_key || key.starts_with(&prefix) {
                    let _ = self.store.remove(&key);
                }
            }
        }
        let empty = codec::encode_metadata(self.version, 0, &[], self.policy.tag());
        if let Err(err) = self.store.set(&metadata_key, &empty) {
            debug!("could not reinitialize metadata for cache {}: {}", self.name, err);
        }
    }
}

/// A versioned, size-bounded, persistent cache of values of type `T`.
///
/// Operations never fail observably. When the underlying store is disabled,
/// `get` misses and `add`/`clear` do nothing; when it is full, entries are
/// evicted oldest-first until the write fits or there is nothing left to
/// evict. Losing data is part of a cache's contract, so none of this is
/// surfaced to the caller.
pub struct Cache<T>
where T : 'static {
    core : CacheCore,
    encode : Box<dyn Fn(&T) -> Value>,
    decode : Box<dyn Fn(&Value) -> Option<T>>,
    usable : bool
}

impl<T> Cache<T>
where T : 'static {
    /// Build a cache over `store`, stamping entries with the wall clock.
    pub fn new(config : CacheConfig<T>, store : Rc<dyn StringStore>) -> Self {
        Cache::with_clock(config, store, Rc::new(SystemClock))
    }

    /// Build a cache with an explicit clock. Entry timestamps decide
    /// eviction order, so tests pass a `ManualClock` here.
    pub fn with_clock(config : CacheConfig<T>, store : Rc<dyn StringStore>, clock : Rc<dyn Clock>) -> Self {
        let usable = !config.name.is_empty() && !config.name.contains('#');
        if !usable {
            warn!("cache name {:?} cannot namespace keys; every operation will be a no-op", config.name);
        }
        Cache {
            core : CacheCore {
                name : config.name,
                version : config.version,
                max_bits : 8 * 1024 * config.kilobytes.max(0),
                policy : config.policy,
                migrations : config.migrations,
                overflow : config.overflow,
                store,
                clock
            },
            encode : config.encode,
            decode : config.decode,
            usable
        }
    }

    /// Look up `user_key`, refreshing its recency on a hit.
    ///
    /// A hit rewrites the entry's envelope with the current time through a
    /// plain store write: a lookup must never evict, so a failed touch only
    /// means the old timestamp stays. If the touched key sits in the eviction
    /// queue it is no longer a sensible victim and is dropped from it.
    pub fn get(&self, user_key : &str) -> Option<T> {
        if !self.usable || self.core.max_bits <= 0 {
            return None;
        }
        let (bits, mut equeue) = self.core.ensure_version();
        let qualified = codec::qualified_key(&self.core.name, user_key);
        let stored = match self.core.store.get(&qualified) {
            Ok(Some(text)) => text,
            _ => return None
        };
        let envelope = codec::decode_entry(&stored)?;
        let domain = (self.decode)(&envelope.v)?;
        let touched = codec::encode_entry(&Envelope { t : self.core.clock.now_ms(), v : envelope.v });
        if let Err(err) = self.core.store.set(&qualified, &touched) {
            debug!("recency of {} not refreshed: {}", qualified, err);
        }
        let queued = equeue.len();
        equeue.retain(|entry| entry.key != qualified);
        if equeue.len() != queued {
            self.core.persist_metadata(bits, equeue);
        }
        Some(domain)
    }

    /// Store `value` under `user_key`, evicting older entries as needed.
    ///
    /// A value too large to ever fit is not stored at all; any previous entry
    /// under the same key is removed so an outdated value cannot linger. The
    /// new key is not pushed into the eviction queue here; the queue is
    /// rebuilt from entry timestamps the next time the budget overflows.
    pub fn add(&self, user_key : &str, value : &T) {
        if !self.usable {
            return;
        }
        let (bits, equeue) = self.core.ensure_version();
        let qualified = codec::qualified_key(&self.core.name, user_key);
        let envelope = codec::encode_entry(&Envelope {
            t : self.core.clock.now_ms(),
            v : (self.encode)(value)
        });
        let entry_bits = codec::entry_bits(&qualified, &envelope);
        if entry_bits > self.core.max_bits {
            debug!("entry {} ({} bits) exceeds the whole budget of cache {}", qualified, entry_bits, self.core.name);
            let _ = self.core.store.remove(&qualified);
            self.core.report_overflow(&qualified);
            return;
        }
        let bits_diff = match self.core.store.get(&qualified) {
            Ok(Some(old)) => entry_bits - codec::entry_bits(&qualified, &old),
            _ => entry_bits
        };
        let (bits, equeue) = self.core.set_with_eviction(bits, equeue, bits_diff, &qualified, |_, _| envelope.clone());
        self.core.persist_metadata(bits, equeue);
    }

    /// Remove every entry of this cache and reset its metadata. Other caches
    /// sharing the store are untouched.
    pub fn clear(&self) {
        if !self.usable {
            return;
        }
        self.core.clear_all();
    }
}
