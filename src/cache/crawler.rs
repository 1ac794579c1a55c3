use crate::codec;
use crate::store::StringStore;

/// Fold a `stepper` over every entry of the named cache.
///
/// All store keys are listed and those under the cache's entry prefix are
/// visited; the metadata key has no trailing `#` and so never matches. A key
/// whose value is missing or whose read fails is skipped, and a failing key
/// listing yields the initial accumulator: a crawl observes what it can and
/// never aborts.
pub(crate) fn crawl<A, F>(store : &dyn StringStore, name : &str, initial : A, mut stepper : F) -> A
where F : FnMut(A, &str, &str) -> A {
    let prefix = codec::entry_prefix(name);
    let keys = match store.keys() {
        Ok(keys) => keys,
        Err(err) => {
            debug!("cannot list keys for cache {}: {}", name, err);
            return initial;
        }
    };
    let mut accumulator = initial;
    for key in keys {
        if !key.starts_with(&prefix) {
            continue;
        }
        if let Ok(Some(value)) = store.get(&key) {
            accumulator = stepper(accumulator, &key, &value);
        }
    }
    accumulator
}

#[cfg(test)]
mod tests {
    #[allow(unused_imports)]
    use super::*;

    #[allow(unused_imports)]
    use spectral::prelude::*;

    use crate::store::memory::MemoryStore;

    #[test]
    fn visits_only_entries_of_the_named_cache() {
        let store = MemoryStore::new();
        store.set("#s", "metadata").unwrap();
        store.set("#s#a", "1").unwrap();
        store.set("#s#b", "2").unwrap();
        store.set("#other#a", "3").unwrap();
        store.set("unrelated", "4").unwrap();
        let mut seen = crawl(&store, "s", Vec::new(), |mut acc : Vec<String>, key, _| {
            acc.push(key.to_string());
            acc
        });
        seen.sort();
        asserting("exactly this cache's entries")
            .that(&seen)
            .is_equal_to(vec!["#s#a".to_string(), "#s#b".to_string()]);
    }

    #[test]
    fn sibling_cache_with_shared_name_prefix_is_not_visited() {
        let store = MemoryStore::new();
        store.set("#s#a", "1").unwrap();
        store.set("#salad#a", "2").unwrap();
        let seen = crawl(&store, "s", 0, |count, _, _| count + 1);
        asserting("the salad cache is someone else's").that(&seen).is_equal_to(1);
    }

    #[test]
    fn accumulates_through_the_stepper() {
        let store = MemoryStore::new();
        store.set("#s#a", "10").unwrap();
        store.set("#s#b", "32").unwrap();
        let total = crawl(&store, "s", 0i64, |sum, _, value| {
            sum + value.parse::<i64>().unwrap_or(0)
        });
        asserting("values folded").that(&total).is_equal_to(42);
    }

    #[test]
    fn disabled_store_yields_the_initial_accumulator() {
        let store = MemoryStore::disabled();
        let seen = crawl(&store, "s", 7, |count, _, _| count + 1);
        asserting("nothing visited").that(&seen).is_equal_to(7);
    }
}
