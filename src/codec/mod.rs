use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum number of eviction-queue entries written into a persisted
/// metadata record. The queue is a hint, not the truth; a short one keeps the
/// metadata record itself small while still covering the common case.
pub const QUEUE_LIMIT : usize = 20;

// ........................................................................
//      Key scheme
//
//  Everything a cache touches in the shared store lives under its name:
//
//      metadata record   "#<name>"
//      entry             "#<name>#<userKey>"
//
//  The metadata key carries no trailing '#', so filtering on the entry
//  prefix never picks it up.

pub fn metadata_key(name : &str) -> String {
    format!("#{}", name)
}

pub fn entry_prefix(name : &str) -> String {
    format!("#{}#", name)
}

pub fn qualified_key(name : &str, user_key : &str) -> String {
    format!("#{}#{}", name, user_key)
}

// ........................................................................
//      Size accounting

/// Length of a string in UTF-16 code units, which is what a browser host
/// reports as string length.
pub fn utf16_len(s : &str) -> usize {
    s.encode_utf16().count()
}

/// Size of a stored record in bits: sixteen per code unit of its raw key and
/// its raw value. An abstract proxy for the real byte cost, but one that
/// every session computes identically, so persisted totals stay comparable
/// across hosts.
pub fn entry_bits(raw_key : &str, raw_value : &str) -> i64 {
    16 * (utf16_len(raw_key) + utf16_len(raw_value)) as i64
}

// ........................................................................
//      Entry envelope

/// The wrapper stored at a qualified key: the moment the entry was last
/// touched and the caller's encoded value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Envelope {
    pub t : i64,
    pub v : Value
}

pub fn encode_entry(envelope : &Envelope) -> String {
    serde_json::to_string(envelope).expect("entry envelope serialization cannot fail")
}

/// Decode an entry envelope. Anything undecodable is reported as `None`; the
/// caller decides whether to skip or remove the record.
pub fn decode_entry(text : &str) -> Option<Envelope> {
    serde_json::from_str(text).ok()
}

// ........................................................................
//      Metadata record

/// One eviction candidate: a qualified key and the size it was carrying when
/// it entered the queue. Persisted as `{"k":...,"v":...}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QueueEntry {
    #[serde(rename = "k")]
    pub key : String,

    #[serde(rename = "v")]
    pub bits : i64
}

/// The per-cache record stored at the metadata key. Fields missing from a
/// persisted record take their defaults, and unknown fields are ignored, so
/// the layout can grow without breaking older data.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Metadata {
    #[serde(default)]
    pub version : u32,

    #[serde(default)]
    pub bits : i64,

    #[serde(default)]
    pub equeue : Vec<QueueEntry>,

    #[serde(default = "default_policy")]
    pub policy : String
}

fn default_policy() -> String {
    "LRU".to_string()
}

/// Encode a metadata record, trimming the queue to `QUEUE_LIMIT` entries.
pub fn encode_metadata(version : u32, bits : i64, equeue : &[QueueEntry], policy : &str) -> String {
    let record = Metadata {
        version,
        bits,
        equeue : equeue.iter().take(QUEUE_LIMIT).cloned().collect(),
        policy : policy.to_string()
    };
    serde_json::to_string(&record).expect("metadata serialization cannot fail")
}

/// Decode a metadata record, or `None` if the text is not a record at all.
pub fn decode_metadata(text : &str) -> Option<Metadata> {
    serde_json::from_str(text).ok()
}

#[cfg(test)]
mod tests {
    #[allow(unused_imports)]
    use super::*;

    #[allow(unused_imports)]
    use spectral::prelude::*;

    use serde_json::json;

    #[test]
    fn key_scheme_nests_entries_under_the_name() {
        asserting("metadata key").that(&metadata_key("s")).is_equal_to("#s".to_string());
        asserting("entry prefix").that(&entry_prefix("s")).is_equal_to("#s#".to_string());
        asserting("qualified key").that(&qualified_key("s", "a")).is_equal_to("#s#a".to_string());
        asserting("metadata key is outside the entry prefix")
            .that(&metadata_key("s").starts_with(&entry_prefix("s")))
            .is_equal_to(false);
    }

    #[test]
    fn sizes_count_utf16_code_units() {
        // Plain ASCII: one code unit per character.
        asserting("ascii").that(&entry_bits("ab", "cd")).is_equal_to(64);
        // U+1F600 is outside the BMP and costs two code units.
        asserting("surrogate pair").that(&utf16_len("\u{1F600}")).is_equal_to(2);
        asserting("astral entry").that(&entry_bits("k", "\u{1F600}")).is_equal_to(48);
    }

    #[test]
    fn envelope_round_trips() {
        let envelope = Envelope { t : 12345, v : json!({"x" : 1, "y" : [true, null]}) };
        let text = encode_entry(&envelope);
        asserting("fields in declared order").that(&text.starts_with("{\"t\":12345,\"v\":")).is_equal_to(true);
        asserting("round trip").that(&decode_entry(&text)).is_equal_to(Some(envelope));
    }

    #[test]
    fn undecodable_envelope_is_none() {
        asserting("not json").that(&decode_entry("garbage")).is_equal_to(None);
        asserting("missing timestamp").that(&decode_entry("{\"v\":1}")).is_equal_to(None);
    }

    #[test]
    fn metadata_round_trips_with_wire_field_names() {
        let queue = vec![QueueEntry { key : "#s#a".to_string(), bits : 160 }];
        let text = encode_metadata(3, 160, &queue, "LRU");
        asserting("queue entries use k/v names")
            .that(&text.contains("{\"k\":\"#s#a\",\"v\":160}"))
            .is_equal_to(true);
        let decoded = decode_metadata(&text).unwrap();
        asserting("version survives").that(&decoded.version).is_equal_to(3);
        asserting("bits survive").that(&decoded.bits).is_equal_to(160);
        asserting("queue survives").that(&decoded.equeue).is_equal_to(queue);
        asserting("policy survives").that(&decoded.policy).is_equal_to("LRU".to_string());
    }

    #[test]
    fn metadata_ignores_unknown_fields_and_defaults_missing_ones() {
        let decoded = decode_metadata("{\"version\":2,\"shiny\":true}").unwrap();
        asserting("version kept").that(&decoded.version).is_equal_to(2);
        asserting("bits defaulted").that(&decoded.bits).is_equal_to(0);
        asserting("queue defaulted").that(&decoded.equeue.len()).is_equal_to(0);
        asserting("policy defaulted").that(&decoded.policy).is_equal_to("LRU".to_string());
    }

    #[test]
    fn corrupt_metadata_is_none() {
        asserting("not a record").that(&decode_metadata("[1,2,3]")).is_equal_to(None);
        asserting("not json").that(&decode_metadata("###")).is_equal_to(None);
    }

    #[test]
    fn encode_metadata_caps_the_queue() {
        let queue : Vec<QueueEntry> = (0..30)
            .map(|i| QueueEntry { key : format!("#s#k{}", i), bits : 16 })
            .collect();
        let decoded = decode_metadata(&encode_metadata(1, 480, &queue, "LRU")).unwrap();
        asserting("only the first twenty persist").that(&decoded.equeue.len()).is_equal_to(QUEUE_LIMIT);
        asserting("the front of the queue survives")
            .that(&decoded.equeue[0].key)
            .is_equal_to("#s#k0".to_string());
    }
}
