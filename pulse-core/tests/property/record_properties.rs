use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use pulse_core::models::{CustomContent, EventPayload, EventRecord, IdentityStamp};
use pulse_core::wire::{canonicalize_fields, WireEvent};

fn custom(name: &str, key: &str, value: i64) -> EventPayload {
    let mut properties = serde_json::Map::new();
    properties.insert(key.to_string(), serde_json::json!(value));
    EventPayload::Custom(CustomContent {
        name: name.to_string(),
        properties,
    })
}

fn identity(anon: &str, session: &str) -> IdentityStamp {
    IdentityStamp {
        anonymous_id: anon.to_string(),
        session_id: session.to_string(),
        user_id: None,
    }
}

proptest! {
    #[test]
    fn idempotency_key_is_a_pure_function(
        name in "[a-z]{1,12}",
        key in "[a-z]{1,8}",
        value in any::<i64>(),
        anon in "[a-f0-9]{8}",
        session in "[a-f0-9]{8}",
        millis in 0i64..4_000_000_000_000,
        seq in any::<u64>(),
    ) {
        let ts = Utc.timestamp_millis_opt(millis).unwrap();
        let first = EventRecord::stamp(custom(&name, &key, value), identity(&anon, &session), 3, ts, seq).unwrap();
        let retry = EventRecord::stamp(custom(&name, &key, value), identity(&anon, &session), 3, ts, seq).unwrap();
        prop_assert_eq!(first.client_event_id(), retry.client_event_id());
    }

    #[test]
    fn distinct_sequences_never_collide(seq_a in any::<u64>(), seq_b in any::<u64>()) {
        prop_assume!(seq_a != seq_b);
        let ts = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let a = EventRecord::stamp(custom("e", "k", 1), identity("a", "s"), 1, ts, seq_a).unwrap();
        let b = EventRecord::stamp(custom("e", "k", 1), identity("a", "s"), 1, ts, seq_b).unwrap();
        prop_assert_ne!(a.client_event_id(), b.client_event_id());
    }

    #[test]
    fn wire_form_survives_alias_parsing(seq in any::<u64>()) {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let record = EventRecord::stamp(custom("e", "k", 2), identity("a", "s"), 9, ts, seq).unwrap();
        let wire = record.to_wire(true).unwrap();
        let parsed = WireEvent::from_value(serde_json::to_value(&wire).unwrap()).unwrap();
        prop_assert_eq!(parsed, wire);
    }

    #[test]
    fn canonicalization_is_idempotent(anon in "[a-z]{1,6}", alias in "[a-z]{1,6}") {
        let mut map = serde_json::Map::new();
        map.insert("anonymous_id".into(), serde_json::json!(anon.clone()));
        map.insert("anonymousId".into(), serde_json::json!(alias));
        canonicalize_fields(&mut map);
        let once = map.clone();
        canonicalize_fields(&mut map);
        prop_assert_eq!(&once, &map);
        prop_assert_eq!(map.get("anonymous_id"), Some(&serde_json::json!(anon)));
        prop_assert!(!map.contains_key("anonymousId"));
    }
}
