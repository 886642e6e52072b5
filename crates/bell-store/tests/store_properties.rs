//! Feed store properties
//!
//! Exercises the ordering, idempotence and derived-count guarantees of the
//! store over arbitrary operation sequences.

use bell_model::{NotificationId, NotificationRecord};
use bell_store::{FeedSnapshot, NotificationStore};
use bell_test_utils::{record, unread};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Prepend(u64, bool),
    MarkRead(u64),
    MarkAllRead,
    Remove(u64),
    Replace(Vec<(u64, bool)>),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..20, any::<bool>()).prop_map(|(id, read)| Op::Prepend(id, read)),
        (0u64..20).prop_map(Op::MarkRead),
        Just(Op::MarkAllRead),
        (0u64..20).prop_map(Op::Remove),
        prop::collection::vec((0u64..20, any::<bool>()), 0..8).prop_map(Op::Replace),
    ]
}

fn apply(store: &mut NotificationStore, op: &Op) {
    match op {
        Op::Prepend(id, read) => {
            store.prepend(record(*id).with_read(*read));
        }
        Op::MarkRead(id) => {
            store.mark_read(NotificationId(*id));
        }
        Op::MarkAllRead => {
            store.mark_all_read();
        }
        Op::Remove(id) => {
            store.remove(NotificationId(*id));
        }
        Op::Replace(items) => {
            store.replace_all(items.iter().map(|(id, read)| record(*id).with_read(*read)));
        }
    }
}

fn raw_ids(snapshot: &FeedSnapshot) -> Vec<u64> {
    snapshot.ids().into_iter().map(NotificationId::get).collect()
}

#[test]
fn scenario_fetch_push_read_delete() {
    let mut store = NotificationStore::new();
    store.replace_all(vec![unread(1), record(2).with_read(true)]);

    store.prepend(unread(3));
    assert_eq!(raw_ids(&store.snapshot()), vec![3, 1, 2]);
    assert_eq!(store.snapshot().unread_count(), 2);

    store.mark_read(NotificationId(1));
    assert_eq!(raw_ids(&store.snapshot()), vec![3, 1, 2]);
    assert_eq!(store.snapshot().unread_count(), 1);

    store.remove(NotificationId(2));
    assert_eq!(raw_ids(&store.snapshot()), vec![3, 1]);
    assert_eq!(store.snapshot().unread_count(), 1);
}

#[test]
fn replace_all_with_empty_clears_feed() {
    let mut store = NotificationStore::new();
    store.replace_all(vec![unread(1), unread(2)]);

    store.replace_all(Vec::<NotificationRecord>::new());

    assert!(store.snapshot().is_empty());
    assert_eq!(store.snapshot().unread_count(), 0);
}

#[test]
fn subscribers_see_every_change() {
    let mut store = NotificationStore::new();
    let mut rx = store.subscribe();

    store.prepend(unread(1));
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().len(), 1);

    store.mark_read(NotificationId(1));
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().unread_count(), 0);

    store.remove(NotificationId(42));
    assert!(!rx.has_changed().unwrap());
}

proptest! {
    #[test]
    fn prop_prepend_order_is_reversed(n in 0usize..40) {
        let mut store = NotificationStore::new();
        for id in 0..n as u64 {
            store.prepend(unread(id));
        }
        let expected: Vec<u64> = (0..n as u64).rev().collect();
        prop_assert_eq!(raw_ids(&store.snapshot()), expected);
    }

    #[test]
    fn prop_mark_read_is_idempotent(
        items in prop::collection::vec((0u64..10, any::<bool>()), 0..10),
        target in 0u64..12,
    ) {
        let mut once = NotificationStore::new();
        let mut twice = NotificationStore::new();
        let records: Vec<_> = items.iter().map(|(id, read)| record(*id).with_read(*read)).collect();
        once.replace_all(records.clone());
        twice.replace_all(records);

        once.mark_read(NotificationId(target));
        twice.mark_read(NotificationId(target));
        twice.mark_read(NotificationId(target));

        let (once, twice) = (once.snapshot(), twice.snapshot());
        prop_assert_eq!(once.records(), twice.records());
    }

    #[test]
    fn prop_missing_id_is_noop(
        ids in prop::collection::btree_set(0u64..50, 0..10),
        missing in 50u64..100,
    ) {
        let mut store = NotificationStore::new();
        store.replace_all(ids.iter().map(|id| unread(*id)));
        let before = store.snapshot();

        store.mark_read(NotificationId(missing));
        store.remove(NotificationId(missing));

        prop_assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn prop_unread_count_is_derived(ops in prop::collection::vec(op(), 0..40)) {
        let mut store = NotificationStore::new();
        let mut rx = store.subscribe();
        for op in &ops {
            apply(&mut store, op);
            let snapshot = rx.borrow_and_update().clone();
            let counted = snapshot.iter().filter(|r| !r.read).count();
            prop_assert_eq!(snapshot.unread_count(), counted);
            prop_assert_eq!(store.unread_count(), counted);
        }
    }

    #[test]
    fn prop_ids_stay_unique(ops in prop::collection::vec(op(), 0..40)) {
        let mut store = NotificationStore::new();
        for op in &ops {
            apply(&mut store, op);
            let mut ids = raw_ids(&store.snapshot());
            let len = ids.len();
            ids.sort_unstable();
            ids.dedup();
            prop_assert_eq!(ids.len(), len);
        }
    }

    #[test]
    fn prop_replace_all_is_total(
        prior in prop::collection::vec(op(), 0..20),
        ids in prop::collection::btree_set(0u64..50, 0..10),
    ) {
        let mut store = NotificationStore::new();
        for op in &prior {
            apply(&mut store, op);
        }
        let replacement: Vec<NotificationRecord> = ids.iter().rev().map(|id| unread(*id)).collect();

        store.replace_all(replacement.clone());

        let snapshot = store.snapshot();
        prop_assert_eq!(snapshot.records(), replacement.as_slice());
    }
}
