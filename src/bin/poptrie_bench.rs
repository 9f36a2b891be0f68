#![cfg(feature = "cli")]

//! The reference driver: loads a prefix file, builds a Poptrie,
//! verifies correctness against the input set, then measures threaded
//! lookup throughput over a precomputed random permutation of the
//! input addresses.

use std::error::Error;
use std::process;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use log::info;
use rand::seq::SliceRandom;

use poptrie_store::loader::load_file;
use poptrie_store::multiway::Builder;
use poptrie_store::poptrie::Poptrie;
use poptrie_store::stats::PoptrieStats;

/// Checkpoints (seconds) at which cumulative throughput is reported.
const REPORT_MARKS: [u64; 5] = [5, 10, 15, 20, 25];

#[derive(Parser, Debug)]
#[command(name = "poptrie_bench", about = "Poptrie build + throughput harness")]
struct Args {
    /// Path to a "prefix/len next_hop" dataset file.
    dataset: String,

    /// Direct-pointing bit count: one of 0, 6, 12, 18, 24.
    #[arg(long, default_value_t = 12)]
    direct_bits: u8,

    /// Number of worker threads for the throughput phase.
    #[arg(long, default_value_t = 4)]
    threads: usize,

    /// Skip the throughput phase and only run the correctness check.
    #[arg(long, default_value_t = false)]
    correctness_only: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    if !matches!(args.direct_bits, 0 | 6 | 12 | 18 | 24) {
        eprintln!("--direct-bits must be one of 0, 6, 12, 18, 24");
        process::exit(2);
    }

    info!("loading dataset {}", args.dataset);
    let file = load_file(&args.dataset)?;
    println!(
        "loaded {} prefixes, {} distinct next hops",
        file.entries.len(),
        file.next_hops.len()
    );
    if file.entries.is_empty() {
        eprintln!("dataset contains no usable prefixes");
        process::exit(1);
    }

    let setup_start = Instant::now();
    let mut builder = Builder::new();
    for entry in &file.entries {
        builder.insert(entry.ip, entry.prefix_len, entry.fib_index);
    }
    let poptrie = builder.build_poptrie(args.direct_bits)?;
    let setup_time = setup_start.elapsed();

    let stats = PoptrieStats::capture(&poptrie, setup_time);
    println!("setup time: {setup_time:?}");
    println!("poptrie stats: {stats}");

    check_correctness(&poptrie, &file.entries);

    if args.correctness_only {
        return Ok(());
    }

    run_throughput(poptrie, &file.entries, args.threads);
    Ok(())
}

/// Verifies that every input prefix address resolves to its own
/// recorded next hop; shadowed prefixes are an expected, not a
/// failing, discrepancy.
fn check_correctness(t: &Poptrie, entries: &[poptrie_store::loader::PrefixEntry]) {
    let mut correct = 0usize;
    for entry in entries {
        if t.lookup(entry.ip) == Some(entry.fib_index) {
            correct += 1;
        }
    }
    let pct = 100.0 * correct as f64 / entries.len() as f64;
    println!(
        "correctness: {correct}/{} ({pct:.4}%) resolved to their own recorded next hop",
        entries.len()
    );
}

/// Spins `threads` workers, each repeatedly walking a shared
/// pseudo-random permutation of the input addresses and performing a
/// tight lookup loop, until the shared deadline flag is raised. Reports
/// cumulative throughput at each mark in [`REPORT_MARKS`].
fn run_throughput(t: Poptrie, entries: &[poptrie_store::loader::PrefixEntry], threads: usize) {
    let keys: Arc<Vec<u32>> = {
        let mut ips: Vec<u32> = entries.iter().map(|e| e.ip).collect();
        let mut rng = rand::rng();
        ips.shuffle(&mut rng);
        Arc::new(ips)
    };
    let t = Arc::new(t);
    let stop = Arc::new(AtomicBool::new(false));
    let total_lookups = Arc::new(AtomicU64::new(0));

    let mut handles = Vec::with_capacity(threads);
    for worker_id in 0..threads {
        let t = Arc::clone(&t);
        let keys = Arc::clone(&keys);
        let stop = Arc::clone(&stop);
        let total_lookups = Arc::clone(&total_lookups);
        handles.push(
            thread::Builder::new()
                .name(format!("poptrie-worker-{worker_id}"))
                .spawn(move || {
                    let mut local_count: u64 = 0;
                    let mut i = 0usize;
                    while !stop.load(Ordering::Relaxed) {
                        let key = keys[i % keys.len()];
                        std::hint::black_box(t.lookup(key));
                        local_count += 1;
                        i = i.wrapping_add(1);
                        if local_count % 4096 == 0 {
                            total_lookups.fetch_add(4096, Ordering::Relaxed);
                        }
                    }
                    total_lookups.fetch_add(local_count % 4096, Ordering::Relaxed);
                })
                .expect("failed to spawn worker thread"),
        );
    }

    let start = Instant::now();
    for &mark in &REPORT_MARKS {
        let deadline = Duration::from_secs(mark);
        while start.elapsed() < deadline {
            thread::sleep(Duration::from_millis(50).min(deadline - start.elapsed()));
        }
        let lookups = total_lookups.load(Ordering::Relaxed);
        let rate = lookups as f64 / start.elapsed().as_secs_f64();
        println!(
            "t={}s: {lookups} lookups, {:.2}M lookups/sec",
            start.elapsed().as_secs(),
            rate / 1_000_000.0
        );
    }

    stop.store(true, Ordering::Relaxed);
    // Join exactly the configured thread count, not a hard-coded one.
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }
}
