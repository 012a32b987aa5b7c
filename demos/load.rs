use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::error;

use devlog::init::{init_tracing_with_config, TracingConfig};
use devlog::{DevHandler, Options};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Render everything, discard the bytes: measures formatting and locking.
    let handler = DevHandler::new(Options::new().source(true).output(io::sink()));
    init_tracing_with_config(Arc::new(handler), TracingConfig { enable_fmt: false })?;

    let threads: u64 = 8;
    let per_thread: u64 = 25_000;
    let start = Instant::now();

    let workers: Vec<_> = (0..threads)
        .map(|t| {
            thread::spawn(move || {
                for i in 0..per_thread {
                    error!(worker = t, iteration = i, "load test error");
                }
            })
        })
        .collect();
    for worker in workers {
        if worker.join().is_err() {
            eprintln!("worker panicked");
        }
    }

    let n = threads * per_thread;
    let elapsed = start.elapsed();
    println!(
        "dev handler: rendered {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
    Ok(())
}
