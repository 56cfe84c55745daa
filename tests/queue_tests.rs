use std::sync::Arc;

use notify_service::models::notification::{NotificationRequest, NotificationType, Priority};
use notify_service::queue::PriorityNotificationQueue;

fn request(priority: Priority, body: &str) -> NotificationRequest {
    NotificationRequest::new(
        NotificationType::Email,
        "nurse@hospital.test",
        "subject",
        body,
        priority,
    )
}

/// Test: a higher-priority message enqueued later is dequeued first
#[test]
fn test_higher_priority_dequeued_first() {
    let queue = PriorityNotificationQueue::new();

    queue.enqueue(request(Priority::Normal, "first"));
    queue.enqueue(request(Priority::Critical, "second"));

    let dequeued = queue.try_dequeue().expect("queue should not be empty");
    assert_eq!(dequeued.body, "second");
}

/// Test: equal-priority messages keep their enqueue order
#[test]
fn test_fifo_within_priority_level() {
    let queue = PriorityNotificationQueue::new();

    for i in 0..5 {
        queue.enqueue(request(Priority::High, &format!("msg_{i}")));
    }

    for i in 0..5 {
        let dequeued = queue.try_dequeue().expect("queue should not be empty");
        assert_eq!(dequeued.body, format!("msg_{i}"));
    }
}

/// Test: the low/critical/normal scenario drains as critical, normal, low
#[test]
fn test_mixed_priority_drain_order() {
    let queue = PriorityNotificationQueue::new();

    queue.enqueue(request(Priority::Low, "a"));
    queue.enqueue(request(Priority::Critical, "b"));
    queue.enqueue(request(Priority::Normal, "c"));

    let order: Vec<String> = std::iter::from_fn(|| queue.try_dequeue())
        .map(|r| r.body)
        .collect();

    assert_eq!(order, vec!["b", "c", "a"]);
}

/// Test: dequeue on an empty queue is a non-blocking miss
#[test]
fn test_empty_queue_poll_returns_none() {
    let queue = PriorityNotificationQueue::new();

    assert!(queue.try_dequeue().is_none());
    assert!(queue.is_empty());
}

/// Test: count tracks enqueues minus dequeues
#[test]
fn test_count_after_enqueues_and_dequeues() {
    let queue = PriorityNotificationQueue::new();

    for i in 0..10 {
        queue.enqueue(request(Priority::Normal, &format!("msg_{i}")));
    }
    assert_eq!(queue.len(), 10);

    for _ in 0..4 {
        queue.try_dequeue();
    }
    assert_eq!(queue.len(), 6);
}

/// Test: concurrent producers never lose messages
#[tokio::test]
async fn test_concurrent_producers() {
    let queue = Arc::new(PriorityNotificationQueue::new());
    let mut handles = Vec::new();

    for producer in 0..8 {
        let queue = Arc::clone(&queue);
        handles.push(tokio::spawn(async move {
            for i in 0..50 {
                let priority = match i % 3 {
                    0 => Priority::Low,
                    1 => Priority::Normal,
                    _ => Priority::Critical,
                };
                queue.enqueue(request(priority, &format!("p{producer}_m{i}")));
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(queue.len(), 8 * 50);

    let mut drained = 0;
    while queue.try_dequeue().is_some() {
        drained += 1;
    }
    assert_eq!(drained, 8 * 50);
}

/// Test: priority ordering holds across all four tiers
#[test]
fn test_all_tiers_strictly_ordered() {
    let queue = PriorityNotificationQueue::new();

    queue.enqueue(request(Priority::Normal, "normal"));
    queue.enqueue(request(Priority::Low, "low"));
    queue.enqueue(request(Priority::High, "high"));
    queue.enqueue(request(Priority::Critical, "critical"));

    let order: Vec<String> = std::iter::from_fn(|| queue.try_dequeue())
        .map(|r| r.body)
        .collect();

    assert_eq!(order, vec!["critical", "high", "normal", "low"]);
}
