use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use devlog::{Attr, DevHandler, Handler, Level, LogContext, MemorySink, Options, Record};

const THREADS: usize = 10;
const PER_THREAD: usize = 1_000;

#[test]
fn concurrent_handles_never_interleave() {
    let mem = MemorySink::new();
    let handler: Arc<dyn Handler> = Arc::new(DevHandler::new(
        Options::new()
            .color(false)
            .add_ctx_attr(["worker"])
            .output(mem.clone()),
    ));

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let handler = handler.clone().with_attrs(vec![Attr::new("t", t)]);
            thread::spawn(move || {
                let ctx = LogContext::new().with_value("worker", t);
                for i in 0..PER_THREAD {
                    let record = Record::new(Level::Info, "tick")
                        .with_time(None)
                        .with_attrs([Attr::new("i", i)]);
                    handler.handle(&ctx, record).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let text = mem.text();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), THREADS * PER_THREAD);

    let mut seen = HashSet::new();
    for line in lines {
        let rest = line.strip_prefix("INFO tick i=").unwrap_or_else(|| panic!("{}", line));
        let (i, rest) = rest.split_once(" worker=").unwrap_or_else(|| panic!("{}", line));
        let (worker, t) = rest.split_once(" t=").unwrap_or_else(|| panic!("{}", line));
        assert_eq!(worker, t, "{}", line);
        assert!(seen.insert((t.to_string(), i.to_string())), "duplicate {}", line);
    }
    assert_eq!(seen.len(), THREADS * PER_THREAD);
}

#[test]
fn derivations_from_many_threads_share_one_sink() {
    let mem = MemorySink::new();
    let base: Arc<dyn Handler> =
        Arc::new(DevHandler::new(Options::new().color(false).output(mem.clone())));

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let base = base.clone();
            thread::spawn(move || {
                let derived = base.with_group(&format!("g{}", t));
                derived
                    .handle(
                        &LogContext::new(),
                        Record::new(Level::Warn, "w")
                            .with_time(None)
                            .with_attrs([Attr::new("k", t)]),
                    )
                    .unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let text = mem.text();
    let mut lines: Vec<&str> = text.lines().collect();
    lines.sort();
    let mut expected: Vec<String> = (0..THREADS).map(|t| format!("WARN w g{0}.k={0}", t)).collect();
    expected.sort();
    assert_eq!(lines, expected);
}
