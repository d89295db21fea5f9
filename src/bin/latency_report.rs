//! Latency profile of the synchronous engine, printed as an HDR histogram.

use hdrhistogram::Histogram;
use std::time::Instant;

use tickmatch::{Engine, EngineConfig, MatchingEngine, OrderCmd, Side};

const ITERATIONS: u64 = 1_000_000;
const BUFFER_SIZE: usize = 10_000;

fn main() {
    println!("Preparing latency benchmark...");

    let mut engine = MatchingEngine::with_capacity(EngineConfig::default(), 1 << 17);
    engine.warm_up();

    let mut histogram =
        Histogram::<u64>::new_with_bounds(1, 1_000_000, 3).expect("histogram bounds");

    // Pre-generate commands so RNG/alloc overhead stays out of the timed loop.
    println!("Pre-generating {BUFFER_SIZE} commands...");
    let mut commands = Vec::with_capacity(BUFFER_SIZE);
    for i in 0..BUFFER_SIZE as i64 {
        let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
        // Buys land just below the asks so a fraction of commands cross.
        let price = if side == Side::Buy {
            9_990 + i % 20
        } else {
            10_010 - i % 20
        };
        commands.push(OrderCmd::limit(side, price, 10));
    }

    // Train the branch predictor and fault in the book before measuring.
    println!("Warming up ({BUFFER_SIZE} ops)...");
    for cmd in &commands {
        std::hint::black_box(engine.add_order(*cmd));
    }

    println!("Running {ITERATIONS} iterations...");
    let mut command_cycle = commands.iter().cycle();
    let mut total_duration = std::time::Duration::ZERO;

    for _ in 0..ITERATIONS {
        let cmd = *command_cycle.next().expect("cycle never ends");

        let start = Instant::now();
        std::hint::black_box(engine.add_order(cmd));
        let elapsed = start.elapsed();

        histogram.record(elapsed.as_nanos() as u64).unwrap_or(());
        total_duration += elapsed;
    }

    println!("\n=== Latency Report (ns) ===");
    println!("Total Ops:  {ITERATIONS}");
    println!(
        "Throughput: {:.2} ops/sec",
        ITERATIONS as f64 / total_duration.as_secs_f64()
    );
    println!("---------------------------");
    println!("Min:    {:6} ns", histogram.min());
    println!("P50:    {:6} ns", histogram.value_at_quantile(0.50));
    println!("P90:    {:6} ns", histogram.value_at_quantile(0.90));
    println!("P99:    {:6} ns", histogram.value_at_quantile(0.99));
    println!("P99.9:  {:6} ns", histogram.value_at_quantile(0.999));
    println!("Max:    {:6} ns", histogram.max());
    println!("---------------------------");

    let metrics = engine.metrics();
    println!("\n=== Engine Metrics ===");
    println!("Adds:       {}", metrics.add_orders);
    println!("Trades:     {}", metrics.trades);
    println!("Traded qty: {}", metrics.traded_qty);
    println!(
        "Add ns min/avg/max: {}/{}/{}",
        metrics.add_min_ns,
        metrics.add_avg_ns(),
        metrics.add_max_ns
    );
    println!(
        "Best bid {} x{} | best ask {} x{}",
        metrics.best_bid_px, metrics.best_bid_qty, metrics.best_ask_px, metrics.best_ask_qty
    );
}
