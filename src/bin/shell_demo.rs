//! Two-thread demo: a producer streams random orders through the async
//! shell while a monitor thread prints snapshots and metrics.

use std::thread;
use std::time::{Duration, Instant};

use rand::prelude::*;

use tickmatch::{AsyncEngineShell, EngineConfig, OrderCmd, ShellConfig, Side, TimeInForce};

const RUN_FOR: Duration = Duration::from_secs(5);

fn main() {
    tracing_subscriber::fmt().init();

    let mut shell = AsyncEngineShell::with_config(ShellConfig {
        ring_capacity: 1 << 16,
        pin_worker: false,
        engine: EngineConfig {
            market_gtc_as_ioc: true,
            market_max_levels: 10,
        },
    });

    let monitor = shell.monitor();
    let monitor_thread = thread::spawn(move || {
        let started = Instant::now();
        while started.elapsed() < RUN_FOR {
            thread::sleep(Duration::from_millis(500));

            let snap = monitor.snapshot(3);
            let metrics = monitor.metrics();

            println!("\n--- Snapshot ---");
            println!("Bids:");
            for level in &snap.bids {
                println!("  {} x{}", level.price, level.qty);
            }
            println!("Asks:");
            for level in &snap.asks {
                println!("  {} x{}", level.price, level.qty);
            }
            println!(
                "--- Metrics --- orders={} trades={} traded_qty={} add_avg_ns={}",
                metrics.add_orders,
                metrics.trades,
                metrics.traded_qty,
                metrics.add_avg_ns()
            );
        }
    });

    println!("Submitting random orders for {RUN_FOR:?}...");
    let mut rng = thread_rng();
    let started = Instant::now();
    let mut submitted = 0u64;

    while started.elapsed() < RUN_FOR {
        let side = if rng.gen_bool(0.5) {
            Side::Buy
        } else {
            Side::Sell
        };
        let cmd = OrderCmd::limit(side, rng.gen_range(99..=101), rng.gen_range(1..=5))
            .with_tif(TimeInForce::Gtc);

        shell.add_order(cmd);
        submitted += 1;

        if submitted % 200 == 0 {
            thread::sleep(Duration::from_millis(5));
        }
    }

    monitor_thread.join().expect("monitor thread panicked");

    let metrics = shell.metrics();
    println!("\nDone. Submitted {submitted} orders.");
    println!(
        "Final: orders={} cancels={} trades={} traded_qty={}",
        metrics.add_orders, metrics.cancel_orders, metrics.trades, metrics.traded_qty
    );
}
