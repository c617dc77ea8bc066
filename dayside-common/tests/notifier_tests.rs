//! Notifier delivery semantics
//!
//! Covers filtered delivery, the wildcard, self-unsubscription by
//! returning `Ok(false)`, isolation of erroring subscribers, and the
//! single-shot `wait_for` future.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dayside_common::events::Notifier;
use dayside_common::Error;

#[test]
fn named_subscription_only_sees_its_events() {
    let notifier: Notifier<i32> = Notifier::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let seen_cb = Arc::clone(&seen);
    notifier.subscribe("update_title", move |event, payload: &i32| {
        seen_cb.lock().unwrap().push((event.to_string(), *payload));
        Ok(true)
    });

    notifier.notify("update_title", &1);
    notifier.notify("update_topic", &2);
    notifier.notify("update_title", &3);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![("update_title".to_string(), 1), ("update_title".to_string(), 3)]
    );
}

#[test]
fn wildcard_subscription_sees_everything() {
    let notifier: Notifier<i32> = Notifier::new();
    let count = Arc::new(AtomicUsize::new(0));

    let count_cb = Arc::clone(&count);
    notifier.subscribe("any", move |_, _: &i32| {
        count_cb.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    });

    notifier.notify("update_title", &1);
    notifier.notify("update_topic", &2);
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn returning_false_unsubscribes() {
    let notifier: Notifier<i32> = Notifier::new();
    let count = Arc::new(AtomicUsize::new(0));

    let count_cb = Arc::clone(&count);
    notifier.subscribe("any", move |_, _: &i32| {
        count_cb.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    });

    assert!(!notifier.notify("update_title", &1));
    notifier.notify("update_title", &2);

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(notifier.subscriber_count(), 0);
}

#[test]
fn erroring_subscriber_does_not_block_later_ones() {
    let notifier: Notifier<i32> = Notifier::new();
    let reached = Arc::new(AtomicUsize::new(0));

    notifier.subscribe("any", |_, _: &i32| {
        Err(Error::Internal("listener broke".to_string()))
    });
    let reached_cb = Arc::clone(&reached);
    notifier.subscribe("any", move |_, _: &i32| {
        reached_cb.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    });

    assert!(notifier.notify("update_title", &1));
    assert_eq!(reached.load(Ordering::SeqCst), 1);
    // The erroring subscriber is retained.
    assert_eq!(notifier.subscriber_count(), 2);
}

#[test]
fn explicit_unsubscribe_removes_one_subscription() {
    let notifier: Notifier<i32> = Notifier::new();
    let id = notifier.subscribe("any", |_, _: &i32| Ok(true));
    notifier.subscribe("any", |_, _: &i32| Ok(true));

    assert!(notifier.unsubscribe(id));
    assert!(!notifier.unsubscribe(id));
    assert_eq!(notifier.subscriber_count(), 1);
}

#[test]
fn callback_can_unsubscribe_a_later_subscription_mid_delivery() {
    let notifier: Arc<Notifier<i32>> = Arc::new(Notifier::new());
    let target_id = Arc::new(Mutex::new(None));
    let fired = Arc::new(AtomicUsize::new(0));

    let notifier_cb = Arc::clone(&notifier);
    let target_cb = Arc::clone(&target_id);
    notifier.subscribe("any", move |_, _: &i32| {
        if let Some(id) = *target_cb.lock().unwrap() {
            assert!(notifier_cb.unsubscribe(id));
        }
        Ok(true)
    });

    let fired_cb = Arc::clone(&fired);
    let id = notifier.subscribe("any", move |_, _: &i32| {
        fired_cb.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    });
    *target_id.lock().unwrap() = Some(id);

    // The first callback removes the second before its turn comes.
    notifier.notify("update_title", &1);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert_eq!(notifier.subscriber_count(), 1);

    notifier.notify("update_title", &2);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert!(!notifier.unsubscribe(id));
}

#[test]
fn notify_reports_remaining_subscribers() {
    let notifier: Notifier<i32> = Notifier::new();
    assert!(!notifier.notify("update_title", &1));

    notifier.subscribe("any", |_, _: &i32| Ok(true));
    assert!(notifier.notify("update_title", &1));
}

#[tokio::test]
async fn wait_for_resolves_with_first_matching_payload() {
    let notifier: Notifier<String> = Notifier::new();
    let pending = notifier.wait_for("update_title");

    notifier.notify("update_topic", &"wrong event".to_string());
    notifier.notify("update_title", &"first".to_string());
    notifier.notify("update_title", &"second".to_string());

    assert_eq!(pending.await.unwrap(), "first");
    // The single-shot subscription removed itself on first delivery.
    assert_eq!(notifier.subscriber_count(), 0);
}
