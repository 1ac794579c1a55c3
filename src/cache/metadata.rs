use super::CacheCore;
use crate::codec;
use crate::codec::{Metadata, QueueEntry};

impl CacheCore {
    /// Load this cache's metadata record. Absence, an undecodable record and
    /// a failing store all yield a fresh empty record at the configured
    /// version: the cache starts over rather than trusting bad accounting.
    pub(crate) fn load_metadata(&self) -> Metadata {
        let key = codec::metadata_key(&self.name);
        match self.store.get(&key) {
            Ok(Some(text)) => match codec::decode_metadata(&text) {
                Some(record) => record,
                None => {
                    warn!("metadata of cache {} is undecodable; starting from an empty record", self.name);
                    self.empty_metadata()
                }
            },
            Ok(None) => self.empty_metadata(),
            Err(err) => {
                debug!("metadata of cache {} unavailable: {}", self.name, err);
                self.empty_metadata()
            }
        }
    }

    fn empty_metadata(&self) -> Metadata {
        Metadata {
            version : self.version,
            bits : 0,
            equeue : Vec::new(),
            policy : self.policy.tag().to_string()
        }
    }

    /// Write the metadata record, at most `QUEUE_LIMIT` queue entries deep.
    ///
    /// The write goes through the eviction engine: a store too full to hold
    /// its own accounting frees up entry space the same way any other
    /// overflowing write does. The record is produced by a closure so that a
    /// retry after evictions writes the bits and queue as they stand then,
    /// not as they stood on the first attempt. If even eviction cannot make
    /// room, the engine reports `(0, [])` and that is what the caller keeps:
    /// accounting resets and the next overflow rebuilds from the store.
    pub(crate) fn persist_metadata(&self, bits : i64, equeue : Vec<QueueEntry>) -> (i64, Vec<QueueEntry>) {
        let key = codec::metadata_key(&self.name);
        let version = self.version;
        let policy = self.policy.tag();
        self.set_with_eviction(bits, equeue, 0, &key, |current_bits, current_queue| {
            codec::encode_metadata(version, current_bits, current_queue, policy)
        })
    }
}
