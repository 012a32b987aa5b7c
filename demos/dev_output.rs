use std::sync::Arc;
use std::time::{Duration, Instant};

use devlog::{
    Attr, DevHandler, Level, LogContext, Logger, Options, QueryLogger, SharedSink, Value,
};

#[derive(Debug)]
struct Timeout;

impl std::fmt::Display for Timeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("context deadline exceeded")
    }
}

impl std::error::Error for Timeout {}

#[inline(never)]
fn load_user(queries: &QueryLogger, ctx: &LogContext) -> Result<(), devlog::HandlerError> {
    let begin = Instant::now();
    std::thread::sleep(Duration::from_millis(3));
    queries.trace(
        ctx,
        begin,
        || ("SELECT id, name FROM users WHERE id = 7".to_string(), 1),
        None,
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out = SharedSink::stdout();
    let opts = Options::from_env()?
        .shared_output(out.clone())
        .source(true)
        .add_ctx_attr(["request_id"])
        .slow_threshold(Duration::from_millis(200));
    let logger = Logger::new(Arc::new(DevHandler::new(opts)));
    let ctx = LogContext::new().with_value("request_id", "9f1c");

    devlog::info!(logger, &ctx, "server started", "port" => 8080, "tls" => false)?;
    devlog::warn!(logger, &ctx, "cache miss ratio high", "ratio" => 0.37)?;
    devlog::debug!(logger, &ctx, "config", "path" => "/etc/app config.toml")?;

    let scoped = logger
        .with(vec![Attr::new("svc", "billing")])
        .with_group("invoice");
    scoped.info(
        &ctx,
        "issued",
        vec![
            Attr::new("id", 1042u64),
            Attr::new("elapsed", Duration::from_micros(1530)),
            Attr::group("customer", vec![Attr::new("name", "Ann Lee")]),
        ],
    )?;
    logger.log(
        &ctx,
        Level::Error,
        "charge failed",
        vec![Attr::error("err", Timeout), Attr::new("attempt", Value::from(3))],
        Some(devlog::call_site!()),
    )?;

    let queries = QueryLogger::new(logger.clone());
    load_user(&queries, &ctx)?;

    queries.trace(
        &ctx,
        Instant::now() - Duration::from_millis(450),
        || ("SELECT sum(total) FROM invoices GROUP BY month".to_string(), 12),
        Some(&Timeout),
    )?;
    out.flush()?;
    Ok(())
}
