use itertools::Itertools;
use serde_json::Value;

use super::crawler::crawl;
use super::CacheCore;
use crate::codec;
use crate::codec::{Envelope, QueueEntry};
use crate::graph::VersionGraph;

/// An entry that survived its upgrade and waits to be written back.
struct Carried {
    t : i64,
    raw_key : String,
    value : Value
}

impl CacheCore {
    /// Bring every entry written at `old_version` up to the configured
    /// version.
    ///
    /// When no chain of upgrade steps connects the two versions the cache is
    /// cleared outright; stale-schema entries are worthless and the caller
    /// restamps the metadata. Otherwise all entries are crawled, upgraded
    /// (entries that fail to decode or whose upgrade declines are removed)
    /// and replayed into the store oldest first. Returns the bits and queue
    /// accumulated by the replay; the caller persists them.
    pub(crate) fn migrate(&self, old_version : u32) -> (i64, Vec<QueueEntry>) {
        let steps = match self.plan_upgrade(old_version) {
            Some(steps) => steps,
            None => {
                warn!(
                    "cache {} has no upgrade path from version {} to {}; clearing it",
                    self.name, old_version, self.version
                );
                self.clear_all();
                return (0, Vec::new());
            }
        };
        let prefix = codec::entry_prefix(&self.name);
        let (carried, doomed) = crawl(
            self.store.as_ref(),
            &self.name,
            (Vec::new(), Vec::new()),
            |(mut carried, mut doomed) : (Vec<Carried>, Vec<String>), raw_key, raw_value| {
                match codec::decode_entry(raw_value) {
                    Some(envelope) => {
                        let user_key = &raw_key[prefix.len()..];
                        match self.upgrade(&steps, user_key, envelope.v) {
                            Some(value) => carried.push(Carried {
                                t : envelope.t,
                                raw_key : raw_key.to_string(),
                                value
                            }),
                            None => doomed.push(raw_key.to_string())
                        }
                    }
                    None => doomed.push(raw_key.to_string())
                }
                (carried, doomed)
            }
        );
        for raw_key in doomed {
            let _ = self.store.remove(&raw_key);
        }
        self.replay(carried)
    }

    fn plan_upgrade(&self, old_version : u32) -> Option<Vec<usize>> {
        let edges = self.migrations.iter().map(|step| (step.from, step.to));
        VersionGraph::new(old_version, self.version, edges).shortest_path(old_version, self.version)
    }

    /// Chain the planned steps into one upgrade. Any step declining drops
    /// the whole entry.
    fn upgrade(&self, steps : &[usize], user_key : &str, value : Value) -> Option<Value> {
        let mut current = value;
        for &step in steps {
            current = self.migrations[step].apply(user_key, current)?;
        }
        Some(current)
    }

    /// Write upgraded entries back, oldest timestamp first, accumulating
    /// bits and prepending each written key onto the fresh queue. Once the
    /// next entry would cross the budget the replay stops and the remaining,
    /// newest entries are removed: they were never rewritten, so leaving
    /// them would strand pre-upgrade values the accounting knows nothing
    /// about. Preferring older entries under a tightened budget is
    /// deliberate; the entries were ordered by write time.
    fn replay(&self, carried : Vec<Carried>) -> (i64, Vec<QueueEntry>) {
        let mut bits : i64 = 0;
        let mut equeue : Vec<QueueEntry> = Vec::new();
        let mut budget_spent = false;
        for entry in carried.into_iter().sorted_by_key(|entry| entry.t) {
            if budget_spent {
                let _ = self.store.remove(&entry.raw_key);
                continue;
            }
            let text = codec::encode_entry(&Envelope { t : entry.t, v : entry.value });
            let entry_bits = codec::entry_bits(&entry.raw_key, &text);
            if bits + entry_bits > self.max_bits {
                budget_spent = true;
                let _ = self.store.remove(&entry.raw_key);
                continue;
            }
            match self.store.set(&entry.raw_key, &text) {
                Ok(()) => {
                    bits += entry_bits;
                    equeue.insert(0, QueueEntry { key : entry.raw_key, bits : entry_bits });
                }
                Err(err) => {
                    debug!("replay of {} failed ({}); dropping it and the newer remainder", entry.raw_key, err);
                    budget_spent = true;
                    let _ = self.store.remove(&entry.raw_key);
                }
            }
        }
        (bits, equeue)
    }
}
