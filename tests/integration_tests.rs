//! Integration tests for the logging engine
//!
//! These tests verify:
//! - Fan-out of one record to several encoder/writer pairs
//! - Log injection prevention through escaping
//! - Level filtering, discard and hooks
//! - Buffered and file-backed destinations
//! - Sub-logger isolation
//! - Record pooling without state leaking between reuses

use chromalog::prelude::*;
use chromalog::{ErrorStack, FieldNames};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn fixed_clock() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
}

#[test]
fn test_fan_out_json_and_text() {
    let json = MemoryWriter::new();
    let text = MemoryWriter::new();
    let logger = LoggerBuilder::new()
        .with_defaults()
        .meta_keys(["META_TIME", "META_LEVEL", "META_LABEL", "message"])
        .label("billing")
        .time_format("%H:%M:%S")
        .expect("Failed to set time format")
        .clock(fixed_clock)
        .encoder_writer_pair(Arc::new(JsonEncoder), Arc::new(json.clone()))
        .encoder_writer_pair(Arc::new(TextEncoder::new()), Arc::new(text.clone()))
        .build();

    logger
        .info()
        .str("invoice", "A-17")
        .f64("amount", 12.5)
        .strs("tags", &["eu", "vat"])
        .msg("charged")
        .done();

    assert_eq!(
        json.contents_string(),
        "{\"META_TIME\":\"03:04:05\",\"META_LEVEL\":\"INFO\",\"META_LABEL\":\"billing\",\"invoice\":\"A-17\",\"amount\":12.5,\"tags\":[\"eu\",\"vat\"],\"message\":\"charged\"}\n"
    );
    assert_eq!(
        text.contents_string(),
        "03:04:05 INFO billing > invoice=A-17 amount=12.5 tags=[eu,vat] charged\n"
    );
}

#[test]
fn test_log_injection_prevention() {
    let out = MemoryWriter::new();
    let logger = LoggerBuilder::new()
        .encoder_writer_pair(Arc::new(JsonEncoder), Arc::new(out.clone()))
        .build();

    let malicious = "User login\nERROR [2024-10-17] Fake error injected\u{0}\"}";
    logger.warn().str("user", malicious).msg(malicious).done();

    let content = out.contents_string();
    assert_eq!(content.lines().count(), 1, "record must stay on one line");
    assert!(content.contains("\\n"));
    assert!(content.contains("\\u0000"));

    let parsed: serde_json::Value = serde_json::from_str(content.trim_end()).unwrap();
    assert_eq!(parsed["user"], malicious);
    assert_eq!(parsed["message"], malicious);
}

#[test]
fn test_level_filtering_and_hooks() {
    let out = MemoryWriter::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let logger = LoggerBuilder::new()
        .level(Level::WARN)
        .meta_keys(["META_LEVEL", "message"])
        .encoder_writer_pair(Arc::new(TextEncoder::new()), Arc::new(out.clone()))
        .hook(HookFn(move |_record: &Record<'_>, level: Level, _message: &str| {
            sink.lock().push(level);
        }))
        .build();

    logger.trace().msg("t").done();
    logger.info().msg("i").done();
    logger.warn().msg("w").done();
    logger.error().msg("e").done();
    logger.error().msg("gone").discard().done();

    assert_eq!(out.contents_string(), "WARN > w\nERROR > e\n");
    assert_eq!(
        *seen.lock(),
        vec![
            Level::TRACE,
            Level::INFO,
            Level::WARN,
            Level::ERROR,
            Level::DISABLED
        ]
    );
    assert_eq!(logger.metrics().records_emitted(), 2);
    assert_eq!(logger.metrics().records_struck(), 3);
}

#[test]
fn test_buffered_file_destination() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("app.log");
    let file = fs::File::create(&path).expect("Failed to create log file");

    let buffered = Arc::new(BufferedWriter::new(file, 64));
    let logger = LoggerBuilder::new()
        .meta_keys(["META_LEVEL"])
        .encoder_writer_pair(Arc::new(JsonEncoder), buffered.clone())
        .build();

    for i in 0..20 {
        logger.info().u32("seq", i).done();
    }
    logger.flush().expect("Failed to flush");

    let content = fs::read_to_string(&path).expect("Failed to read log file");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 20);
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(*line, format!("{{\"META_LEVEL\":\"INFO\",\"seq\":{}}}", i));
    }

    buffered.close().expect("Failed to close");
}

#[test]
fn test_file_adapter_destination() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("plain.log");
    let file = fs::File::create(&path).expect("Failed to create log file");

    let logger = LoggerBuilder::new()
        .meta_keys(["META_LEVEL", "message"])
        .encoder_writer_pair(
            Arc::new(TextEncoder::new()),
            Arc::new(LevelWriterAdapter::new(file)),
        )
        .build();
    logger.error().str("path", "/tmp/x").msg("open failed").done();

    let content = fs::read_to_string(&path).expect("Failed to read log file");
    assert_eq!(content, "ERROR > path=/tmp/x open failed\n");
}

#[test]
fn test_sub_logger_does_not_touch_parent() {
    let out = MemoryWriter::new();
    let parent = LoggerBuilder::new()
        .with_defaults()
        .meta_keys(["META_LEVEL", "META_LABEL", "message"])
        .label("root")
        .encoder_writer_pair(Arc::new(TextEncoder::new()), Arc::new(out.clone()))
        .build();

    let child = parent
        .sub_logger()
        .label("worker")
        .level(Level::ERROR)
        .meta_key_colors("META_LABEL", vec![SgrCode::BOLD])
        .build();

    child.info().msg("filtered by child").done();
    child.error().msg("from child").done();
    parent.info().msg("from parent").done();

    assert_eq!(
        out.contents_string(),
        "ERROR worker > from child\nINFO root > from parent\n"
    );
    assert_eq!(parent.min_level(), Level::DEBUG);
    assert_ne!(
        parent.meta_keys().console_colors("META_LABEL"),
        child.meta_keys().console_colors("META_LABEL")
    );
}

#[test]
fn test_records_are_pooled() {
    let out = MemoryWriter::new();
    let logger = LoggerBuilder::new()
        .level(Level::INFO)
        .meta_keys(["META_LEVEL", "META_LABEL"])
        .label("pool")
        .encoder_writer_pair(Arc::new(JsonEncoder), Arc::new(out.clone()))
        .build();

    let finished = Arc::new(Mutex::new(Vec::new()));
    let second = Duration::from_secs(1);
    let elapsed = Duration::from_millis(1500);
    let rounds = 50;

    for i in 0..rounds {
        let seen = Arc::clone(&finished);
        logger
            .info()
            .with_label("job")
            .str("user", "ada")
            .i64("i", i)
            .use_int_dur()
            .dur("d", second, elapsed)
            .with_done_func(move |msg| seen.lock().push(msg.to_string()))
            .msg(&format!("a{i}"))
            .done();

        // each of these leaves fields behind in the pooled state
        logger.info().str("leak", "discarded").discard().msg("never").done();
        let seen = Arc::clone(&finished);
        logger
            .debug()
            .str("leak", "struck")
            .with_done_func(move |msg| seen.lock().push(format!("struck:{msg}")))
            .msg("struck")
            .done();
        drop(logger.error().with_label("gone").str("leak", "dropped").use_int_dur());

        logger.warn().dur("d", second, elapsed).msg("b").done();
    }

    let content = out.contents_string();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2 * rounds as usize);
    for (i, pair) in lines.chunks(2).enumerate() {
        assert_eq!(
            pair[0],
            format!(
                "{{\"META_LEVEL\":\"INFO\",\"META_LABEL\":\"job\",\"user\":\"ada\",\"i\":{i},\"d\":1,\"message\":\"a{i}\"}}"
            )
        );
        assert_eq!(
            pair[1],
            "{\"META_LEVEL\":\"WARN\",\"META_LABEL\":\"pool\",\"d\":1.5,\"message\":\"b\"}"
        );
    }
    assert!(!content.contains("leak"));

    let expected: Vec<String> = (0..rounds)
        .flat_map(|i| [format!("a{i}"), "struck:".to_string()])
        .collect();
    assert_eq!(*finished.lock(), expected);

    assert_eq!(logger.metrics().records_allocated(), 1);
    assert_eq!(logger.metrics().records_emitted(), 2 * rounds as u64);
    assert_eq!(logger.metrics().records_struck(), 2 * rounds as u64);
}

#[test]
fn test_custom_field_names_and_level_marshal() {
    let out = MemoryWriter::new();
    let names = FieldNames {
        message: "msg".to_string(),
        meta_level: "lvl".to_string(),
        ..FieldNames::default()
    };
    let logger = LoggerBuilder::new()
        .field_names(names)
        .with_defaults()
        .meta_keys(["lvl"])
        .level_field_marshal(|level: Level| level.to_string().into())
        .encoder_writer_pair(Arc::new(JsonEncoder), Arc::new(out.clone()))
        .build();

    logger.warn().msg("renamed").done();
    assert_eq!(out.contents_string(), "{\"lvl\":\"warn\",\"msg\":\"renamed\"}\n");
}

#[test]
fn test_error_with_source_chain_stack() {
    let out = MemoryWriter::new();
    let logger = LoggerBuilder::new()
        .stack(true)
        .error_stack_marshal(chromalog::core::marshal::source_chain_stack)
        .encoder_writer_pair(Arc::new(JsonEncoder), Arc::new(out.clone()))
        .build();

    let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml missing");
    let outer = LoggerError::io_operation("loading config", "startup", inner);
    logger.error().err(&outer).done();

    let parsed: serde_json::Value = serde_json::from_str(out.contents_string().trim_end()).unwrap();
    assert_eq!(
        parsed["error"],
        "IO error while loading config: startup"
    );
    assert_eq!(parsed["stack"], serde_json::json!(["config.toml missing"]));

    // without the flag the stack marshal is never consulted
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let quiet = LoggerBuilder::new()
        .error_stack_marshal(move |_err: &dyn std::error::Error| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(ErrorStack::Text("unused".to_string()))
        })
        .build();
    quiet.error().err(&outer).done();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_config_driven_logger() {
    let config = LoggerConfig::from_json(
        r#"{
            "level": "warn",
            "label": "cfg",
            "enableConsolePrinting": false,
            "outputs": [{"encoder": "json"}, {"encoder": "TEXT"}]
        }"#,
    )
    .unwrap();

    let json = MemoryWriter::new();
    let text = MemoryWriter::new();
    let logger = config
        .builder_with(vec![
            Arc::new(json.clone()) as Arc<dyn LevelWriter>,
            Arc::new(text.clone()),
        ])
        .unwrap()
        .meta_keys(["META_LEVEL", "META_LABEL", "message"])
        .build();

    logger.info().msg("skip").done();
    logger.warn().msg("kept").done();

    assert_eq!(
        json.contents_string(),
        "{\"META_LEVEL\":\"WARN\",\"META_LABEL\":\"cfg\",\"message\":\"kept\"}\n"
    );
    assert_eq!(text.contents_string(), "WARN cfg > kept\n");
}

#[test]
fn test_shared_logger_across_threads() {
    let out = MemoryWriter::new();
    let logger = Arc::new(
        LoggerBuilder::new()
            .meta_keys(["META_LEVEL"])
            .encoder_writer_pair(Arc::new(JsonEncoder), Arc::new(out.clone()))
            .build(),
    );

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let logger = Arc::clone(&logger);
            std::thread::spawn(move || {
                for i in 0..25 {
                    logger.info().i32("thread", t).i32("i", i).done();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let content = out.contents_string();
    assert_eq!(content.lines().count(), 100);
    for line in content.lines() {
        let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(parsed["META_LEVEL"], "INFO");
    }
}
