use std::time::Instant;

use request_perf_logger::{Context, LoggerConfig, RequestLogger, RequestMetadata};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let workers: u64 = 8;
    let per_worker: u64 = 10_000;
    let start = Instant::now();

    let mut handles = Vec::new();
    for w in 0..workers {
        handles.push(tokio::task::spawn_blocking(move || -> Result<(), request_perf_logger::LoggerError> {
            let request = RequestMetadata::cli().with("OPERATION_TYPE", "load_test");
            let mut logger = RequestLogger::new(LoggerConfig::with_root("logs-load"), &request)?;
            for i in 0..per_worker {
                logger.start_timer("op");
                let mut details = Context::new();
                details.insert("worker".into(), json!(w));
                details.insert("iteration".into(), json!(i));
                logger.end_timer("op");
                logger.log_operation("load", "ok", details, Some("op"));
            }
            Ok(())
        }));
    }
    for h in handles {
        h.await??;
    }

    let n = workers * per_worker;
    let elapsed = start.elapsed();
    println!("default config: wrote {} entries in {:?} (~{:.0} entries/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
    Ok(())
}
