//! Minimal end-to-end wiring of the fair scheduler: one process-wide
//! `FairGroup`, two shards each owning a `FairQueue`, a synthetic producer
//! per shard, and a dispatch loop that logs and immediately "completes"
//! whatever it pops. Grounded on `backend::main`'s shape (config from env,
//! logger init, one `tokio::spawn`ed loop per concern) but with no real I/O
//! backend behind it — this binary exists to exercise the crate, not to
//! move bytes.

use std::sync::Arc;
use std::time::Duration;

use common::logger::{init_logger, root_span, TraceId};
use fair_group::{FairGroup, FairGroupConfig};
use fair_queue::{ClassId, FairQueue, FairQueueConfig};
use ticket::Ticket;

const INTERACTIVE: ClassId = 0;
const BACKGROUND: ClassId = 1;

struct DemoRequest {
    trace_id: TraceId,
}

/// Feeds one shard's queue with a steady stream of requests from both
/// priority classes.
fn start_producer_loop(queue: Arc<tokio::sync::Mutex<FairQueue<DemoRequest>>>, shard: usize) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(5));
        loop {
            ticker.tick().await;
            let mut q = queue.lock().await;
            let trace_id = TraceId::default();
            let _span = root_span("produce", &trace_id).entered();

            let _ = q.queue(INTERACTIVE, Ticket::new(1, 4096), DemoRequest { trace_id });
            let trace_id = TraceId::default();
            let _ = q.queue(BACKGROUND, Ticket::new(1, 65536), DemoRequest { trace_id });
            tracing::trace!(shard, "produced one request per class");
        }
    });
}

/// Drains whatever the shard's queue currently allows, logging a span per
/// dispatched request and reporting it finished immediately (there is no
/// real I/O backend in this demo to wait on).
fn start_dispatch_loop(queue: Arc<tokio::sync::Mutex<FairQueue<DemoRequest>>>, shard: usize) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(2));
        loop {
            ticker.tick().await;
            let mut q = queue.lock().await;
            let mut finished = Vec::new();
            q.dispatch_requests(|entry| {
                let span = root_span("dispatch", &entry.payload.trace_id);
                let _guard = span.enter();
                tracing::debug!(shard, entry_id = %entry.id, "dispatched");
                finished.push(entry.ticket);
            });
            drop(q);

            if !finished.is_empty() {
                let mut q = queue.lock().await;
                for ticket in finished {
                    q.notify_request_finished(ticket);
                }
            }
        }
    });
}

/// Periodically elects a replenisher for the shared group. Any shard may
/// call this; `FairGroup::replenish_capacity` is idempotent and only one
/// caller per tick actually advances `head`.
fn start_replenish_loop(group: Arc<FairGroup>, rate_resolution_hz: f64) {
    tokio::spawn(async move {
        let period = Duration::from_secs_f64(1.0 / rate_resolution_hz);
        let mut ticker = tokio::time::interval(period);
        let mut tick: u64 = 0;
        loop {
            ticker.tick().await;
            tick += 1;
            group.replenish_capacity(tick);
        }
    });
}

#[tokio::main]
async fn main() {
    init_logger("fair-scheduler-demo", false);

    let group_cfg = FairGroupConfig::from_env();
    let rate_resolution_hz = group_cfg.rate_resolution_hz;
    let group = Arc::new(FairGroup::new(&group_cfg));

    start_replenish_loop(group.clone(), rate_resolution_hz);

    const SHARD_COUNT: usize = 2;
    for shard in 0..SHARD_COUNT {
        let mut queue_cfg = FairQueueConfig::from_env();
        queue_cfg.shard_count = SHARD_COUNT as u32;

        let mut queue = FairQueue::<DemoRequest>::new(group.clone(), queue_cfg);
        queue
            .register_priority_class(INTERACTIVE, 300)
            .expect("interactive class registers once at startup");
        queue
            .register_priority_class(BACKGROUND, 100)
            .expect("background class registers once at startup");

        let queue = Arc::new(tokio::sync::Mutex::new(queue));
        start_producer_loop(queue.clone(), shard);
        start_dispatch_loop(queue, shard);
    }

    tracing::info!(shards = SHARD_COUNT, "fair scheduler demo running");
    tokio::signal::ctrl_c().await.ok();
}
