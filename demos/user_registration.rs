use std::thread::sleep;
use std::time::Duration;

use request_perf_logger::init::init_tracing;
use request_perf_logger::{Context, LoggerConfig, RequestLogger, RequestMetadata};
use serde_json::json;

fn details(value: serde_json::Value) -> Context {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Context::new(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;

    let request = RequestMetadata::from_env().with("OPERATION_TYPE", "user_registration");
    let mut logger = RequestLogger::new(LoggerConfig::with_root("logs"), &request)?;
    let _scope = logger.error_handler().enter();

    logger.start_timer("user_registration");

    logger.start_timer("db_insert");
    sleep(Duration::from_millis(200));
    logger.end_timer("db_insert");
    logger.log_operation(
        "db_insert",
        "success",
        details(json!({
            "rows_affected": 1,
            "table": "users",
            "user_email": "test@example.com",
            "password": "should_be_hidden"
        })),
        Some("db_insert"),
    );

    logger.start_timer("email_sending");
    sleep(Duration::from_millis(300));
    logger.end_timer("email_sending");
    logger.log_operation(
        "email_sending",
        "success",
        details(json!({"email": "test@example.com", "template": "welcome"})),
        Some("email_sending"),
    );

    // Captured into the request log through the tracing layer.
    tracing::warn!(target: "demo", "verification email queued late");

    logger.end_timer("user_registration");
    logger.log_operation(
        "user_registration",
        "completed",
        details(json!({"user_id": 123, "status": "active"})),
        Some("user_registration"),
    );

    println!("{}", serde_json::to_string_pretty(&logger.performance_report())?);
    println!("log written to {}", logger.paths().file.display());
    Ok(())
}
