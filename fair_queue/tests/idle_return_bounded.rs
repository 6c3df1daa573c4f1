//! S2 — idle return is bounded: a class that sat idle while another class
//! churned through many requests does not get to "cash in" its accumulated
//! head start for the whole duration once it returns; it rejoins no more
//! than `max_deviation` behind the busy class's high-water mark.

mod support;

use ticket::Ticket;

#[test]
fn returning_class_does_not_starve_the_busy_class() {
    let mut q = support::unthrottled_queue::<u32>(0.1); // small tau: tight bound

    q.register_priority_class(0, 100).unwrap(); // stays busy
    q.register_priority_class(1, 100).unwrap(); // goes idle, then returns

    for _ in 0..2000 {
        q.queue(0, Ticket::new(1, 0), 0u32).unwrap();
        q.dispatch_requests(|_| {});
    }

    // Class 1 rejoins after a long idle period.
    q.queue(1, Ticket::new(1, 0), 1u32).unwrap();

    // If idle-return were unbounded, class 1 would now dominate dispatch
    // for as long as its cursor takes to catch back up to class 0's. With
    // a small tau it should only get a short head start.
    let mut order = Vec::new();
    for _ in 0..40 {
        q.queue(0, Ticket::new(1, 0), 0u32).unwrap();
        q.queue(1, Ticket::new(1, 0), 1u32).unwrap();
        q.dispatch_requests(|e| order.push(e.payload));
        q.dispatch_requests(|e| order.push(e.payload));
    }

    let run_of_ones = order
        .iter()
        .scan(0usize, |run, &v| {
            *run = if v == 1 { *run + 1 } else { 0 };
            Some(*run)
        })
        .max()
        .unwrap_or(0);

    assert!(
        run_of_ones < 40,
        "class 1 monopolized dispatch for {run_of_ones} consecutive turns after returning from idle"
    );
}
