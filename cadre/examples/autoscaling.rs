use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cadre::{
    logging, task, Priority, Submission, Supervisor, SupervisorConfig, WorkerPool,
    WorkerPoolConfig, Workspace,
};
use tracing::info;

// Simulated request: a little CPU, a little waiting
fn handle_request(id: usize, done: &AtomicUsize) {
    let mut checksum = id as u64;
    for i in 0..10_000u64 {
        checksum = checksum.wrapping_mul(31).wrapping_add(i);
    }
    thread::sleep(Duration::from_millis(15));
    done.fetch_add(1, Ordering::Relaxed);
    std::hint::black_box(checksum);
}

fn main() -> Result<(), Box<dyn Error>> {
    logging::init_development();

    let mut workspace = Workspace::new();
    let io = workspace.attach_pool(WorkerPool::with_config(
        WorkerPoolConfig::with_workers(1).labeled("io"),
    )?);
    let cpu = workspace.attach_pool(WorkerPool::with_config(
        WorkerPoolConfig::with_workers(1).labeled("cpu"),
    )?);

    let supervisor = workspace.attach_supervisor(Supervisor::new(SupervisorConfig::new(
        1,
        6,
        Duration::from_millis(100),
    ))?);
    workspace.supervise(supervisor, io)?;
    workspace.supervise(supervisor, cpu)?;
    workspace[supervisor].set_tick_callback(|report| {
        if report.changed() {
            for adjustment in &report.adjustments {
                info!(
                    tick = report.tick,
                    pool = %adjustment.label,
                    workers = adjustment.workers,
                    tasks = adjustment.tasks,
                    "{}",
                    adjustment.adjustment
                );
            }
        }
    });

    // Burst of load spread across both pools
    let done = Arc::new(AtomicUsize::new(0));
    for id in 0..300 {
        let done = done.clone();
        let _ = workspace.submit(Submission::normal(move || handle_request(id, &done)))?;
    }

    // A multi-step job that must not interleave with anything else on its worker
    let report = workspace[io].submit(Submission::sequence(vec![
        task(|| info!("step 1: open report")),
        task(|| info!("step 2: write rows")),
        task(|| info!("step 3: close report")),
    ]));

    // Health check jumps the queue
    let healthy = workspace.spawn(Priority::Urgent, || "ok")?;
    info!(status = healthy.wait()?, "Health check answered");

    report.wait()?;
    workspace.for_each_pool(|handle, pool| {
        pool.wait_tasks();
        info!(pool = %handle, label = pool.label(), workers = pool.workers_num(), "Pool drained");
    });
    info!(completed = done.load(Ordering::Relaxed), "Burst finished");

    // Give the supervisor a few ticks to shrink the pools back down
    thread::sleep(Duration::from_millis(800));
    workspace.for_each_pool(|_, pool| {
        info!(label = pool.label(), metrics = ?pool.metrics(), "Pool after cool-down");
    });

    Ok(())
}
