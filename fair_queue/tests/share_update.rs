//! S5 — updating a resident class's shares takes effect on its next
//! dispatched request without requiring the class to leave and rejoin.

mod support;

use ticket::Ticket;

#[test]
fn raising_shares_increases_future_dispatch_frequency() {
    let mut q = support::unthrottled_queue::<u32>(0.5);
    q.register_priority_class(0, 100).unwrap();
    q.register_priority_class(1, 100).unwrap();

    for _ in 0..2000 {
        q.queue(0, Ticket::new(1, 0), 0u32).unwrap();
        q.queue(1, Ticket::new(1, 0), 1u32).unwrap();
    }

    let mut counts_before = [0u64; 2];
    for _ in 0..1000 {
        q.dispatch_requests(|e| counts_before[e.payload as usize] += 1);
    }
    let ratio_before = counts_before[0] as f64 / counts_before.iter().sum::<u64>() as f64;
    assert!((ratio_before - 0.5).abs() < 0.05);

    q.update_shares_for_class(0, 400).unwrap();

    for _ in 0..2000 {
        q.queue(0, Ticket::new(1, 0), 0u32).unwrap();
        q.queue(1, Ticket::new(1, 0), 1u32).unwrap();
    }
    let mut counts_after = [0u64; 2];
    for _ in 0..2000 {
        q.dispatch_requests(|e| counts_after[e.payload as usize] += 1);
    }
    let ratio_after = counts_after[0] as f64 / counts_after.iter().sum::<u64>() as f64;

    assert!(
        ratio_after > ratio_before + 0.1,
        "raising class 0's shares should raise its dispatch ratio: before={ratio_before} after={ratio_after}"
    );
}

#[test]
fn shares_are_clamped_to_at_least_one() {
    let mut q = support::unthrottled_queue::<u32>(0.5);
    q.register_priority_class(0, 100).unwrap();
    q.update_shares_for_class(0, 0).unwrap();
    q.queue(0, Ticket::new(1, 0), 0u32).unwrap();
    // Should not panic with a division by zero in cost accounting.
    q.dispatch_requests(|_| {});
}

#[test]
fn update_shares_on_unregistered_class_errors() {
    let mut q = support::unthrottled_queue::<u32>(0.5);
    assert!(q.update_shares_for_class(9, 100).is_err());
}
