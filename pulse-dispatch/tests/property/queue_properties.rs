//! Property tests for the event queue: order, bound, and requeue placement.

use chrono::Utc;
use proptest::prelude::*;
use pulse_core::models::{CustomContent, EventPayload, EventRecord, IdentityStamp};
use pulse_dispatch::{EventQueue, QueuedRecord};

fn record(n: u64) -> QueuedRecord {
    let payload = EventPayload::Custom(CustomContent {
        name: n.to_string(),
        properties: Default::default(),
    });
    let identity = IdentityStamp {
        anonymous_id: "a".into(),
        session_id: "s".into(),
        user_id: None,
    };
    QueuedRecord::new(EventRecord::stamp(payload, identity, 1, Utc::now(), n).unwrap())
}

fn seq(q: &QueuedRecord) -> u64 {
    match q.record.payload() {
        EventPayload::Custom(c) => c.name.parse().unwrap(),
        _ => unreachable!(),
    }
}

proptest! {
    /// Draining in arbitrary chunks yields exactly the retained suffix, in order.
    #[test]
    fn prop_drain_order_and_bound(
        count in 0u64..200,
        bound in 1usize..64,
        chunks in proptest::collection::vec(1usize..20, 1..40),
    ) {
        let mut q = EventQueue::new(bound);
        for n in 0..count {
            q.enqueue(record(n));
            prop_assert!(q.size() <= bound);
        }

        let retained = (count as usize).min(bound);
        prop_assert_eq!(q.dropped(), count - retained as u64);

        let mut drained = Vec::new();
        for chunk in chunks {
            let got = q.drain(chunk);
            prop_assert!(got.len() <= chunk);
            drained.extend(got.iter().map(seq));
        }
        drained.extend(q.drain(usize::MAX).iter().map(seq));

        let expected: Vec<u64> = (count - retained as u64..count).collect();
        prop_assert_eq!(drained, expected);
    }

    /// Requeued records come back out first, in their original order.
    #[test]
    fn prop_requeue_front_precedes_newer(taken in 1u64..20, newer in 0u64..20) {
        let mut q = EventQueue::new(1000);
        for n in 0..taken {
            q.enqueue(record(n));
        }
        let batch = q.drain(taken as usize);
        for n in taken..taken + newer {
            q.enqueue(record(n));
        }
        q.requeue_front(batch);

        let order: Vec<u64> = q.drain(usize::MAX).iter().map(seq).collect();
        prop_assert_eq!(order, (0..taken + newer).collect::<Vec<_>>());
    }
}
