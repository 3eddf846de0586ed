//! Integration tests for dltlog
//!
//! End-to-end scenarios through the public API: registry, streams,
//! handlers, configuration and the binary message form.

use std::fs;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;

use dltlog::argument::{self, TypeInfo};
use dltlog::header::Timestamp;
use dltlog::stamp::StampSource;
use dltlog::*;
use parking_lot::Mutex;
use proptest::prelude::*;

#[derive(Default)]
struct Collect {
    lines: Mutex<Vec<SharedMessage>>,
}

impl LoggingHandler for Collect {
    fn emit(&self, message: SharedMessage) {
        self.lines.lock().push(message);
    }
}

struct FixedStamps {
    counter: AtomicU8,
}

impl StampSource for FixedStamps {
    fn next_counter(&self) -> u8 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    fn thread_id(&self) -> String {
        "main".into()
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(1_700_000_000, 123)
    }
}

fn registry_with_sink(threshold: LogLevel) -> (LoggerManager, Arc<Collect>) {
    let manager = LoggerManager::new(Identity::new("ECU1", "APP1"));
    let sink = Arc::new(Collect::default());
    manager.create_logger("em", "engine manager", threshold);
    manager.add_logging_handler("em", sink.clone()).unwrap();
    (manager, sink)
}

#[test]
fn test_debug_suppressed_at_info_threshold() {
    let (manager, sink) = registry_with_sink(LogLevel::Info);
    let logger = manager.get_logger("em").unwrap();

    let mut stream = logger.log_debug();
    stream.append("x");
    stream.flush();

    assert!(sink.lines.lock().is_empty());
}

#[test]
fn test_info_line_rendering() {
    let (manager, sink) = registry_with_sink(LogLevel::Verbose);
    let logger = manager.get_logger("em").unwrap();

    logger.log_info().append(true).append("ok");

    let lines = sink.lines.lock();
    assert_eq!(lines.len(), 1);
    let line = lines[0].as_text();
    assert!(line.contains("|Info|"));
    assert!(line.ends_with("true ok "));
    assert!(line.contains("|ECU1|APP1|em|"));
}

#[test]
fn test_console_line_for_info_message() {
    let (manager, sink) = registry_with_sink(LogLevel::Verbose);
    let logger = manager.get_logger("em").unwrap();
    logger.log_info().append(true).append("ok");

    let message = sink.lines.lock()[0].clone();
    let mut out = Vec::new();
    ConsoleHandler::write_line(&mut out, &message).unwrap();

    let printed = String::from_utf8(out).unwrap();
    assert_eq!(printed.lines().count(), 1);
    assert!(printed.contains("|ECU1|APP1|em|"));
    assert!(printed.contains("|Info|"));
    assert!(printed.ends_with("|Info|true ok \n"));
}

#[test]
fn test_disabled_levels_skip_stamping() {
    let stamps = Arc::new(FixedStamps {
        counter: AtomicU8::new(0),
    });
    let manager = LoggerManager::with_stamps(Identity::new("ECU1", "APP1"), stamps.clone(), Vec::new());
    let sink = Arc::new(Collect::default());
    let logger = manager.create_logger("em", "", LogLevel::Info);
    manager.add_logging_handler("em", sink.clone()).unwrap();

    for _ in 0..5 {
        logger.log_verbose().append(1u8);
    }
    assert_eq!(stamps.counter.load(Ordering::Relaxed), 0);

    logger.log_info().append(2u8);
    let lines = sink.lines.lock();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].header().counter, 0);
}

#[test]
fn test_deterministic_stamps() {
    let manager = LoggerManager::with_stamps(
        Identity::new("ECU1", "APP1"),
        Arc::new(FixedStamps {
            counter: AtomicU8::new(254),
        }),
        Vec::new(),
    );
    let sink = Arc::new(Collect::default());
    let logger = manager.create_logger("em", "", LogLevel::Verbose);
    manager.add_logging_handler("em", sink.clone()).unwrap();

    for i in 0..3u8 {
        logger.log_warn().append(i);
    }

    let lines = sink.lines.lock();
    let counters: Vec<u8> = lines.iter().map(|m| m.header().counter).collect();
    assert_eq!(counters, [254, 255, 0]);

    let expected = format!("{}|ECU1|APP1|em|main|Warn|0 ", Timestamp::new(1_700_000_000, 123));
    assert_eq!(lines[0].as_text(), expected);
}

#[test]
fn test_signed_minus_42() {
    let (type_info, bytes) = argument::encode(&Value::I32(-42));
    assert_ne!(type_info & TypeInfo::SIGNED, 0);
    assert_eq!(type_info & TypeInfo::WIDTH_MASK, 3);
    assert_eq!(argument::decode(type_info, &bytes), Ok(Value::I32(-42)));
}

#[test]
fn test_add_handler_to_missing_logger() {
    let manager = LoggerManager::new(Identity::new("ECU1", "APP1"));
    let result = manager.add_logging_handler("missing-key", Arc::new(ConsoleHandler::new()));
    assert_eq!(result, Err(Error::LoggerNotFound("missing-key".into())));
}

#[test]
fn test_concurrent_create_logger() {
    const THREADS: usize = 32;
    let manager = LoggerManager::new(Identity::new("ECU1", "APP1"));

    let workers: Vec<_> = (0..THREADS)
        .map(|i| {
            let manager = manager.clone();
            thread::spawn(move || {
                let key = format!("ctx-{i}");
                manager.create_logger(&key, "worker", LogLevel::Debug);
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(manager.len(), THREADS);
    for i in 0..THREADS {
        assert!(manager.get_logger(&format!("ctx-{i}")).is_some());
    }
}

#[test]
fn test_concurrent_logging_one_handler() {
    let (manager, sink) = registry_with_sink(LogLevel::Verbose);

    let workers: Vec<_> = (0..8u32)
        .map(|t| {
            let manager = manager.clone();
            thread::spawn(move || {
                let logger = manager.get_logger("em").unwrap();
                for i in 0..50u32 {
                    logger.log_info().append(t).append(i);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(sink.lines.lock().len(), 400);
}

#[test]
fn test_buffer_overflow_is_exact() {
    let mut buf = LogBuffer::new();
    let mut appended = 0;
    loop {
        let before = buf.as_bytes().to_vec();
        match buf.append(0xABCD_u32) {
            Ok(()) => appended += 4,
            Err(err) => {
                assert_eq!(err, Error::BufferOverflow);
                assert_eq!(buf.as_bytes(), before.as_slice());
                break;
            }
        }
    }
    assert_eq!(appended, MAX_BUFFER_SIZE);
    assert_eq!(buf.len(), MAX_BUFFER_SIZE);
}

#[test]
fn test_manager_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("app.log");
    let config_path = dir.path().join("logging.json");
    let document = serde_json::json!({
        "EcuId": "ECU9",
        "AppId": "NAV",
        "LogSinks": ["FILE"],
        "LogFile": log_path,
    });
    fs::write(&config_path, document.to_string()).unwrap();

    let manager = LoggerManager::init(&config_path).unwrap();
    assert_eq!(manager.identity(), &Identity::new("ECU9", "NAV"));

    let logger = manager.create_logger("rt", "routing", LogLevel::Info);
    assert_eq!(manager.get_logging_handlers("rt").unwrap().len(), 1);
    logger.log_error().append("no route").append(7u16);

    let content = fs::read_to_string(&log_path).unwrap();
    assert!(content.contains("|ECU9|NAV|rt|"));
    assert!(content.ends_with("|Error|no route 7 \n"));
}

#[test]
fn test_manager_rejects_unknown_sink() {
    let config = Config::new("ECU1", "APP1", ["CONSOLE", "SYSLOG"]);
    let err = LoggerManager::from_config(&config).unwrap_err();
    assert_eq!(err, Error::InvalidLogSink("SYSLOG".into()));
}

#[test]
fn test_file_sink_needs_path() {
    let config = Config::new("ECU1", "APP1", ["FILE"]);
    assert!(matches!(
        LoggerManager::from_config(&config),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn test_init_with_missing_config() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        LoggerManager::init(dir.path().join("nope.json")),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn test_message_survives_binary_roundtrip() {
    let (manager, sink) = registry_with_sink(LogLevel::Verbose);
    let logger = manager.get_logger("em").unwrap();
    logger
        .log_verbose()
        .with_location("src/main.rs", 88)
        .with_tag("diag")
        .append(-7i64)
        .append(&[0xCAu8, 0xFE][..])
        .append(String::from("owned"));

    let lines = sink.lines.lock();
    let bytes = lines[0].to_bytes().unwrap();
    let decoded = Message::decode(&bytes).unwrap();

    assert_eq!(decoded.arguments(), lines[0].arguments());
    assert_eq!(decoded.extension(), lines[0].extension());
    assert_eq!(decoded.log_level(), Some(LogLevel::Verbose));
    assert!(decoded.as_text().ends_with("|em||Verbose|-7 cafe owned "));
}

fn scalar() -> impl Strategy<Value = Argument> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i8>().prop_map(Value::I8),
        any::<i16>().prop_map(Value::I16),
        any::<i32>().prop_map(Value::I32),
        any::<i64>().prop_map(Value::I64),
        any::<u8>().prop_map(Value::U8),
        any::<u16>().prop_map(Value::U16),
        any::<u32>().prop_map(Value::U32),
        any::<u64>().prop_map(Value::U64),
        any::<f32>()
            .prop_filter("NaN never compares equal", |v| !v.is_nan())
            .prop_map(Value::F32),
        any::<f64>()
            .prop_filter("NaN never compares equal", |v| !v.is_nan())
            .prop_map(Value::F64),
        ".{0,40}".prop_map(Value::from),
    ]
}

fn level() -> impl Strategy<Value = LogLevel> {
    (0u8..=6).prop_map(|v| LogLevel::from_u8(v).unwrap_or(LogLevel::Off))
}

proptest! {
    #[test]
    fn prop_argument_roundtrip(value in scalar()) {
        let (type_info, bytes) = argument::encode(&value);
        prop_assert_eq!(argument::decode(type_info, &bytes).unwrap().into_owned(), value);
    }

    #[test]
    fn prop_enabled_matches_numeric_order(message in level(), threshold in level()) {
        let manager = LoggerManager::new(Identity::default());
        let logger = manager.create_logger("p", "", threshold);
        prop_assert_eq!(logger.is_enabled(message), message.as_u8() <= threshold.as_u8());
        if threshold == LogLevel::Off {
            prop_assert_eq!(logger.is_enabled(message), message == LogLevel::Off);
        } else {
            prop_assert!(logger.is_enabled(LogLevel::Fatal));
        }
    }

    #[test]
    fn prop_buffer_never_partially_writes(chunks in proptest::collection::vec(0usize..600, 1..20)) {
        let mut buf = LogBuffer::new();
        for chunk in chunks {
            let data = vec![0x5A; chunk];
            let before = buf.len();
            match buf.append(data.as_slice()) {
                Ok(()) => prop_assert_eq!(buf.len(), before + chunk),
                Err(err) => {
                    prop_assert_eq!(err, Error::BufferOverflow);
                    prop_assert!(before + chunk > MAX_BUFFER_SIZE);
                    prop_assert_eq!(buf.len(), before);
                }
            }
        }
    }
}
