//! Basic usage example for dltlog
//!
//! Run with: cargo run --example basic_usage

use std::sync::Arc;

use dltlog::*;
use parking_lot::Mutex;

fn main() -> Result<()> {
    println!("dltlog Basic Usage Example");
    println!("==========================");

    // Example 1: Registry with a console sink from configuration
    println!("\n1. Configured console sink:");
    let config = Config::from_json(r#"{"EcuId":"ECU1","AppId":"DEMO","LogSinks":["CONSOLE"]}"#)?;
    let manager = LoggerManager::from_config(&config)?;
    let engine = manager.create_logger("em", "engine manager", LogLevel::Info);

    engine.log_info().append("engine started, rpm").append(850u32);
    engine.log_warn().append("coolant temp").append(104.5f32).append(true);

    // Example 2: Threshold filtering
    println!("\n2. Threshold filtering (Debug suppressed at Info):");
    engine.log_debug().append("never printed");
    engine.set_threshold(LogLevel::Debug);
    engine.log_debug().append("printed after raising the threshold");

    // Example 3: Decorated message and its binary form
    println!("\n3. Binary form of a decorated message:");
    let diag = manager.create_logger_with_default("diag", "diagnostics");
    let capture = Arc::new(Capture::default());
    manager.add_logging_handler("diag", capture.clone())?;

    diag.log_error()
        .with_location(file!(), line!())
        .with_tag("dtc")
        .append("fault code")
        .append(&[0x0Bu8, 0x42][..]);

    if let Some(message) = capture.last() {
        let bytes = message.to_bytes()?;
        println!("  Encoded {} bytes", bytes.len());
        let decoded = Message::decode(&bytes)?;
        println!("  Decoded: {decoded}");
    }

    // Example 4: Fixed-capacity buffer
    println!("\n4. Flat buffer:");
    let mut buffer = LogBuffer::new();
    let mut appended = 0usize;
    while buffer.append(appended as u64).is_ok() {
        appended += 1;
    }
    println!(
        "  {} u64 values fit in {} bytes, next append: {}",
        appended,
        buffer.capacity(),
        buffer.append(0u8).unwrap_err()
    );

    // Example 5: Unknown context
    println!("\n5. Unknown context:");
    match manager.add_logging_handler("missing", Arc::new(ConsoleHandler::new())) {
        Err(err) => println!("  {err}"),
        Ok(()) => println!("  unexpected success"),
    }

    Ok(())
}

#[derive(Default)]
struct Capture {
    messages: Mutex<Vec<SharedMessage>>,
}

impl Capture {
    fn last(&self) -> Option<SharedMessage> {
        self.messages.lock().last().cloned()
    }
}

impl LoggingHandler for Capture {
    fn emit(&self, message: SharedMessage) {
        self.messages.lock().push(message);
    }
}
