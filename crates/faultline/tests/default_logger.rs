//! The process-wide default logger.

use faultline::prelude::*;

#[test]
fn default_logger_can_be_replaced() {
    let collected = Arc::new(CollectingExtension::new(10));
    let installed = Faultline::builder()
        .with_extension(Arc::clone(&collected) as Arc<dyn Extension>)
        .install()
        .unwrap();
    assert!(Arc::ptr_eq(&installed, &faultline::default_logger()));

    let error = faultline::log_error("import failed").unwrap();
    assert_eq!(error.kind(), EventKind::Error);
    faultline::log_warning("quota at 90%");
    faultline::log_info("cache warmed");
    faultline::log_fatal("shutting down");
    faultline::log_perf_issue("slow render");
    faultline::log_invalid_code_path("unreachable branch");
    faultline::log_exception(&std::io::Error::other("pipe broken"));
    faultline::global::time(Duration::from_secs(60), || ());

    let kinds: Vec<EventKind> = collected.records().iter().map(|r| r.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Error,
            EventKind::Warning,
            EventKind::Info,
            EventKind::Fatal,
            EventKind::PerfIssue,
            EventKind::InvalidCodePath,
            EventKind::Exception,
        ]
    );

    let top = error
        .get(faultline_capture::CALL_STACK_CATEGORY, "0")
        .and_then(|v| v.as_str())
        .unwrap();
    assert!(top.contains("default_logger_can_be_replaced"), "{}", top);

    let previous = faultline::set_default_logger(Arc::new(Logger::default()));
    assert!(Arc::ptr_eq(&previous, &installed));
    faultline::log_error("after reset");
    assert_eq!(collected.len(), 7);
}
