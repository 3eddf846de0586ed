//! Criterion benchmarks for dltlog
//!
//! Run with: cargo bench

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dltlog::argument::{self, Value};
use dltlog::stamp::SystemStamps;
use dltlog::*;

struct Discard;

impl LoggingHandler for Discard {
    fn emit(&self, message: SharedMessage) {
        black_box(message);
    }
}

fn sample_message(args: usize) -> Message {
    let mut builder = MessageBuilder::verbose_mode(
        LogLevel::Info,
        "bench",
        &Identity::new("ECU1", "APP1"),
        &SystemStamps::new(),
    );
    for i in 0..args {
        if i % 2 == 0 {
            builder.add_argument(Value::U32(i as u32));
        } else {
            builder.add_argument(Value::from(format!("arg-{i}")));
        }
    }
    builder.finish()
}

fn bench_argument_codec(c: &mut Criterion) {
    let values = [
        ("bool", Value::Bool(true)),
        ("i32", Value::I32(-42)),
        ("u64", Value::U64(u64::MAX)),
        ("f64", Value::F64(3.25)),
        ("str", Value::from("engine speed")),
    ];

    let mut group = c.benchmark_group("argument");
    for (name, value) in &values {
        group.bench_with_input(BenchmarkId::new("encode", name), value, |b, value| {
            b.iter(|| black_box(argument::encode(black_box(value))));
        });

        let (type_info, bytes) = argument::encode(value);
        group.bench_with_input(BenchmarkId::new("decode", name), &bytes, |b, bytes| {
            b.iter(|| black_box(argument::decode(black_box(type_info), black_box(bytes)).unwrap()));
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    for args in [0usize, 4, 16] {
        group.bench_with_input(BenchmarkId::new("finish", args), &args, |b, &args| {
            b.iter(|| black_box(sample_message(args)));
        });
    }
    group.finish();
}

fn bench_message_binary(c: &mut Criterion) {
    let message = sample_message(8);
    let mut buf = vec![0u8; 2048];

    c.bench_function("message_encode", |b| {
        b.iter(|| black_box(message.encode(black_box(&mut buf)).unwrap()));
    });

    let bytes = message.to_bytes().unwrap();
    c.bench_function("message_decode", |b| {
        b.iter(|| black_box(Message::decode(black_box(&bytes)).unwrap()));
    });
}

fn bench_stream(c: &mut Criterion) {
    let manager = LoggerManager::new(Identity::new("ECU1", "APP1"));
    let logger = manager.create_logger("bench", "benchmarks", LogLevel::Info);
    manager.add_logging_handler("bench", Arc::new(Discard)).unwrap();

    c.bench_function("stream_enabled", |b| {
        b.iter(|| {
            logger.log_info().append(black_box(7u32)).append(black_box("ok"));
        });
    });

    c.bench_function("stream_disabled", |b| {
        b.iter(|| {
            logger.log_verbose().append(black_box(7u32)).append(black_box("skipped"));
        });
    });
}

fn bench_buffer(c: &mut Criterion) {
    c.bench_function("buffer_fill", |b| {
        b.iter(|| {
            let mut buf = LogBuffer::new();
            while buf.append(black_box(0xDEAD_BEEFu32)).is_ok() {}
            black_box(buf.len());
        });
    });
}

criterion_group!(
    benches,
    bench_argument_codec,
    bench_render,
    bench_message_binary,
    bench_stream,
    bench_buffer
);
criterion_main!(benches);
