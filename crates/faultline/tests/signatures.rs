//! Signature behaviour against real stack walks.

use faultline::prelude::*;
use faultline_capture::CALL_STACK_CATEGORY;

fn logger() -> SharedLogger {
    Faultline::builder().build().unwrap()
}

fn capture_in_checkout(logger: &Logger) -> CategorizedRecord {
    logger.error("checkout failed").unwrap()
}

fn capture_in_refund(logger: &Logger) -> CategorizedRecord {
    logger.error("refund failed").unwrap()
}

fn signature(record: &CategorizedRecord) -> String {
    record.signature().unwrap().to_string()
}

#[test]
fn same_call_site_gives_same_signature() {
    let logger = logger();
    let signatures: Vec<String> = (0..3)
        .map(|_| signature(&capture_in_checkout(&logger)))
        .collect();

    assert!(!signatures[0].is_empty());
    assert!(signatures.iter().all(|s| *s == signatures[0]));
}

#[test]
fn different_call_site_gives_different_signature() {
    let logger = logger();
    let checkout = signature(&capture_in_checkout(&logger));
    let refund = signature(&capture_in_refund(&logger));
    assert_ne!(checkout, refund);
}

#[test]
fn signature_is_lowercase_hex() {
    let record = capture_in_checkout(&logger());
    let sig = signature(&record);
    assert!(sig.len() <= 8);
    assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn call_stack_starts_at_caller() {
    let record = capture_in_checkout(&logger());
    let top = record
        .get(CALL_STACK_CATEGORY, "0")
        .and_then(|v| v.as_str())
        .unwrap()
        .to_string();
    assert!(top.contains("capture_in_checkout"), "{}", top);
    assert!(!top.starts_with("faultline_capture::"), "{}", top);
}

#[test]
fn file_paths_included_when_configured() {
    let logger = Faultline::builder()
        .with_file_paths_in_stack(true)
        .build()
        .unwrap();
    let record = capture_in_checkout(&logger);
    let top = record.get(CALL_STACK_CATEGORY, "0").and_then(|v| v.as_str()).unwrap();
    assert!(top.contains(" @ "), "{}", top);
    assert!(top.contains("signatures.rs"), "{}", top);
}
