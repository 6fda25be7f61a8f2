//! End-to-end capture behaviour.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::sleep;

use faultline::prelude::*;
use faultline_capture::{EXCEPTION_CATEGORY, INNER_EXCEPTION_FIELD, PERF_CATEGORY};
use faultline_host::{HostError, HostPart, HostResult, SessionInfo};
use faultline_sink::MailError;

#[derive(Debug, thiserror::Error)]
#[error("failed to load invoice {id}")]
struct InvoiceError {
    id: u32,
    #[source]
    source: std::io::Error,
}

fn collecting() -> (Arc<CollectingExtension>, FaultlineBuilder) {
    let collected = Arc::new(CollectingExtension::new(100));
    let builder = Faultline::builder().with_extension(Arc::clone(&collected) as Arc<dyn Extension>);
    (collected, builder)
}

#[test]
fn timer_over_budget_emits_one_record() {
    let (collected, builder) = collecting();
    let logger = builder.build().unwrap();

    logger.time(Duration::from_millis(50), || sleep(Duration::from_millis(55)));

    assert_eq!(collected.len(), 1);
    let record = &collected.records()[0];
    assert_eq!(record.kind(), EventKind::PerfIssue);
    let elapsed = record.get(PERF_CATEGORY, "Elapsed").and_then(|v| v.as_f64()).unwrap();
    let threshold = record.get(PERF_CATEGORY, "MaxThreshold").and_then(|v| v.as_f64()).unwrap();
    assert!(elapsed > threshold);
}

#[test]
fn timer_under_budget_emits_nothing() {
    let (collected, builder) = collecting();
    let logger = builder.build().unwrap();

    {
        let _timer = logger.timer(Duration::from_millis(100)).start_now().unwrap();
        sleep(Duration::from_millis(85));
    }

    assert!(collected.is_empty());
}

#[test]
fn fault_with_cause_is_flattened() {
    let logger = Faultline::with_defaults().unwrap();
    let error = InvoiceError {
        id: 77,
        source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only volume"),
    };

    let record = logger.exception(&error).unwrap();
    assert_eq!(record.message(), "failed to load invoice 77");

    let exception = record.category(EXCEPTION_CATEGORY).unwrap();
    assert!(exception["Type"].as_str().unwrap().ends_with("InvoiceError"));
    assert_eq!(exception["Message"].as_str(), Some("failed to load invoice 77"));

    let inner = exception[INNER_EXCEPTION_FIELD].as_map().unwrap();
    assert!(!inner["Type"].as_str().unwrap().is_empty());
    assert_eq!(inner["Message"].as_str(), Some("read-only volume"));
}

#[test]
fn anyhow_faults_are_accepted() {
    let logger = Faultline::with_defaults().unwrap();
    let error = anyhow::anyhow!("socket closed").context("syncing inventory");
    let record = logger
        .capture(CaptureRequest::new(EventKind::Exception).fault(error))
        .unwrap();
    assert_eq!(record.message(), "syncing inventory");
    assert!(record.get(EXCEPTION_CATEGORY, INNER_EXCEPTION_FIELD).is_some());
}

#[test]
fn capture_survives_every_collaborator_failing() {
    struct FailingHost;
    impl HostContext for FailingHost {
        fn request(&self) -> HostResult<Option<RequestInfo>> {
            Err(HostError::unavailable(HostPart::Request, "stream closed"))
        }
        fn session(&self) -> HostResult<Option<SessionInfo>> {
            panic!("session store poisoned")
        }
    }

    struct FailingMail;
    impl MailTransport for FailingMail {
        fn send(&self, _message: &MailMessage) -> Result<(), MailError> {
            Err(MailError::Rejected {
                recipient: "ops@example.com".into(),
            })
        }
    }

    let crashes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&crashes);
    let (collected, builder) = collecting();
    let logger = builder
        .with_email_to("ops@example.com")
        .with_mail_transport(Arc::new(FailingMail))
        .with_host_context(|| Some(Arc::new(FailingHost) as Arc<dyn HostContext>))
        .with_extension(Arc::new(FnExtension::new("broken", |_| -> anyhow::Result<()> {
            panic!("extension bug")
        })))
        .with_crash_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    let record = logger.capture(
        CaptureRequest::new(EventKind::Fatal)
            .message("cascade")
            .enrich(|_| anyhow::bail!("enricher failed")),
    );

    assert!(record.is_some());
    assert_eq!(collected.len(), 1);
    // request, session, enrichment, mail, extension
    assert!(crashes.load(Ordering::SeqCst) >= 5);
}

#[test]
fn sensitive_form_values_are_redacted() {
    let logger = Faultline::builder()
        .with_host_context(|| {
            let request = RequestInfo::new("POST", "/account")
                .with_form_value("password", "secret123")
                .with_form_value("display_name", "Ada");
            Some(Arc::new(StaticHostContext::new().with_request(request)) as Arc<dyn HostContext>)
        })
        .build()
        .unwrap();

    let record = logger.error("profile update failed").unwrap();
    let form = record.get("HttpRequest", "Form").and_then(FieldValue::as_map).unwrap();
    let password = form["Form:password"].as_str().unwrap();
    assert_eq!(password, "[removed for security] Length: 9");
    assert_eq!(form["Form:display_name"].as_str(), Some("Ada"));

    let json = record.to_json(false).unwrap();
    assert!(!json.contains("secret123"));
    assert!(!record.render_report().contains("secret123"));
}

#[test]
fn captured_record_round_trips() {
    let logger = Faultline::with_defaults().unwrap();
    let record = logger
        .capture(
            CaptureRequest::new(EventKind::Warning)
                .message("latency {0}ms")
                .arg(13.1)
                .enrich(|record| {
                    record.set("Metrics", "P99", 13.1);
                    record.set("Metrics", "Samples", 20_000u64);
                    Ok(())
                }),
        )
        .unwrap();

    let parsed = CategorizedRecord::from_json(&record.to_json(true).unwrap()).unwrap();
    assert_eq!(parsed.id(), record.id());
    assert_eq!(parsed.kind(), record.kind());
    assert_eq!(parsed.message(), "latency 13.1ms");
    assert_eq!(parsed.signature(), record.signature());
    assert_eq!(parsed.created_at_utc(), record.created_at_utc());
    assert_eq!(parsed.created_at_local(), record.created_at_local());
    for (name, fields) in record.categories() {
        assert_eq!(parsed.category(name), Some(fields), "category {}", name);
    }
}

#[test]
fn mail_goes_to_fatal_recipient() {
    let transport = Arc::new(MemoryTransport::new());
    let logger = Faultline::builder()
        .with_email_to("team@example.com")
        .with_fatal_email_to("pager@example.com")
        .with_mail_transport(Arc::clone(&transport) as Arc<dyn MailTransport>)
        .build()
        .unwrap();

    logger.warning("slow disk");
    logger.fatal("disk gone");

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, vec!["team@example.com"]);
    assert_eq!(sent[1].to, vec!["team@example.com", "pager@example.com"]);
    assert!(sent[1].subject.starts_with("[Log] Fatal: disk gone ("));
}
