use std::collections::BTreeMap;

use super::crawler::crawl;
use super::CacheCore;
use crate::codec;
use crate::codec::QueueEntry;

impl CacheCore {
    /// Write `raw_key` under the byte budget, evicting queued entries until
    /// it fits.
    ///
    /// `bits_diff` is how much the write grows the cache's accounted size; a
    /// write that would land past `max_bits` is not even attempted. On any
    /// failed attempt the queue's head is evicted (its removal swallowed, its
    /// recorded size subtracted) and the write retried. An exhausted queue is
    /// rebuilt from the timestamps actually persisted in the store; if even
    /// the rebuilt queue is empty there is nothing left to free, so the write
    /// is dropped and the accounting reports an empty cache. That claim may
    /// be wrong, which is fine: the next overflow starts with another rebuild
    /// and sees whatever is really there.
    ///
    /// `make_value` produces the value for each attempt from the bits and
    /// queue as they stand after the evictions so far, so a metadata record
    /// written mid-retry describes the store it lands in.
    pub(crate) fn set_with_eviction<F>(
        &self,
        bits : i64,
        equeue : Vec<QueueEntry>,
        bits_diff : i64,
        raw_key : &str,
        make_value : F
    ) -> (i64, Vec<QueueEntry>)
    where F : Fn(i64, &[QueueEntry]) -> String {
        let mut bits = bits;
        let mut equeue = equeue;
        loop {
            if bits + bits_diff <= self.max_bits {
                let value = make_value(bits, &equeue);
                match self.store.set(raw_key, &value) {
                    Ok(()) => return (bits + bits_diff, equeue),
                    Err(err) => debug!("write of {} failed ({}); evicting to make room", raw_key, err)
                }
            }
            if equeue.is_empty() {
                equeue = self.rebuild_queue();
                if equeue.is_empty() {
                    warn!("nothing left to evict in cache {}; dropping the write of {}", self.name, raw_key);
                    self.report_overflow(raw_key);
                    return (0, Vec::new());
                }
                continue;
            }
            let victim = equeue.remove(0);
            debug!("evicting {} ({} bits) from cache {}", victim.key, victim.bits, self.name);
            let _ = self.store.remove(&victim.key);
            bits = (bits - victim.bits).max(0);
        }
    }

    /// Rebuild the eviction queue from the entries actually in the store,
    /// oldest timestamp first. Entries whose envelope no longer decodes are
    /// removed along the way. Two entries may share a timestamp; one of them
    /// ends up in the queue and the other waits for the next rebuild, which
    /// is inconsequential.
    pub(crate) fn rebuild_queue(&self) -> Vec<QueueEntry> {
        let mut undecodable : Vec<String> = Vec::new();
        let by_age = crawl(
            self.store.as_ref(),
            &self.name,
            BTreeMap::new(),
            |mut by_age : BTreeMap<i64, QueueEntry>, raw_key, raw_value| {
                match codec::decode_entry(raw_value) {
                    Some(envelope) => {
                        by_age.insert(envelope.t, QueueEntry {
                            key : raw_key.to_string(),
                            bits : codec::entry_bits(raw_key, raw_value)
                        });
                    }
                    None => undecodable.push(raw_key.to_string())
                }
                by_age
            }
        );
        for key in undecodable {
            debug!("removing undecodable entry {} from cache {}", key, self.name);
            let _ = self.store.remove(&key);
        }
        by_age.into_iter().map(|(_, entry)| entry).collect()
    }
}
