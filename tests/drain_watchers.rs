// tests/drain_watchers.rs
//
// Fan-out of pending sets to drain callers.

use scrolld::engine::DrainWatchers;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_slow_subscriber_sees_only_the_latest_pending_set() {
    let watchers = DrainWatchers::new();
    let (_, mut rx) = watchers.subscribe();

    // Nobody reads in between; none of these sends may block.
    watchers.broadcast(&names(&["A", "B", "C"]));
    watchers.broadcast(&names(&["A", "B"]));
    watchers.broadcast(&names(&["A"]));

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), names(&["A"]));
    assert!(!rx.has_changed().unwrap());
}

#[tokio::test]
async fn test_broadcast_reaches_every_subscriber() {
    let watchers = DrainWatchers::new();
    let mut receivers: Vec<_> = (0..4).map(|_| watchers.subscribe()).collect();
    assert_eq!(watchers.len(), 4);

    watchers.broadcast(&names(&["start"]));
    for (_, rx) in receivers.iter_mut() {
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), names(&["start"]));
    }

    let (first, _) = receivers.remove(0);
    watchers.unsubscribe(first);
    assert_eq!(watchers.len(), 3);
}

#[tokio::test]
async fn test_close_all_ends_current_and_later_subscribers() {
    let watchers = DrainWatchers::new();
    let (_, mut before) = watchers.subscribe();

    watchers.close_all();
    assert!(watchers.is_closed());
    assert!(watchers.is_empty());
    assert!(before.changed().await.is_err());

    let (_, mut after) = watchers.subscribe();
    assert!(watchers.is_empty());
    assert!(after.changed().await.is_err());
}
