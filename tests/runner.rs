mod common;

use common::FakeAuditor;
use lighthouse_batch::{
    catalog::Catalog,
    naming::{JobId, Profile},
    runner::AuditRunner,
};
use std::sync::Arc;
use tempfile::TempDir;

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|u| u.to_string()).collect()
}

#[test]
fn audits_each_url_desktop_then_mobile_in_order() {
    let tmp = TempDir::new().unwrap();
    let auditor = Arc::new(FakeAuditor::default());
    let runner = AuditRunner::new(tmp.path(), auditor.clone());
    let job = JobId::parse("20240301101530").unwrap();

    let summary = runner
        .run_job(&job, &urls(&["https://a.com", "https://b.com/x"]))
        .unwrap();

    assert_eq!(summary.attempted, 4);
    assert_eq!(summary.produced, 4);
    assert!(summary.failures.is_empty());
    assert_eq!(
        auditor.calls(),
        vec![
            ("https://a.com".to_string(), Profile::Desktop),
            ("https://a.com".to_string(), Profile::Mobile),
            ("https://b.com/x".to_string(), Profile::Desktop),
            ("https://b.com/x".to_string(), Profile::Mobile),
        ]
    );

    let files = Catalog::new(tmp.path()).list_reports(job.as_str()).unwrap();
    assert_eq!(
        files,
        [
            "a.com_desktop.html",
            "a.com_mobile.html",
            "b.com_x_desktop.html",
            "b.com_x_mobile.html",
        ]
    );
}

#[test]
fn failed_invocation_does_not_stop_the_job() {
    let tmp = TempDir::new().unwrap();
    let auditor = Arc::new(FakeAuditor::failing(&["https://broken.example"]));
    let runner = AuditRunner::new(tmp.path(), auditor.clone());
    let job = JobId::parse("20240301101530").unwrap();

    let summary = runner
        .run_job(&job, &urls(&["https://broken.example", "https://ok.example"]))
        .unwrap();

    assert_eq!(summary.attempted, 4);
    assert_eq!(summary.produced, 2);
    assert_eq!(summary.failures.len(), 2);
    assert_eq!(summary.failures[0].profile, Profile::Desktop);
    assert_eq!(summary.failures[1].profile, Profile::Mobile);
    assert_eq!(auditor.calls().len(), 4);

    let files = Catalog::new(tmp.path()).list_reports(job.as_str()).unwrap();
    assert_eq!(files, ["ok.example_desktop.html", "ok.example_mobile.html"]);
}

#[test]
fn colliding_urls_overwrite_each_other() {
    let tmp = TempDir::new().unwrap();
    let auditor = Arc::new(FakeAuditor::default());
    let runner = AuditRunner::new(tmp.path(), auditor);
    let job = JobId::parse("20240301101530").unwrap();

    runner
        .run_job(&job, &urls(&["https://example.com/a?b", "http://example.com/a/b"]))
        .unwrap();

    let catalog = Catalog::new(tmp.path());
    let files = catalog.list_reports(job.as_str()).unwrap();
    assert_eq!(files, ["example.com_a_b_desktop.html", "example.com_a_b_mobile.html"]);
    let last = catalog
        .fetch_report(job.as_str(), "example.com_a_b_desktop.html")
        .unwrap();
    assert_eq!(last, b"<html>http://example.com/a/b desktop</html>");
}

#[test]
fn unwritable_job_directory_aborts_before_any_audit() {
    let tmp = TempDir::new().unwrap();
    let blocker = tmp.path().join("results");
    std::fs::write(&blocker, "a file where the results root should be").unwrap();

    let auditor = Arc::new(FakeAuditor::default());
    let runner = AuditRunner::new(&blocker, auditor.clone());
    let job = JobId::parse("20240301101530").unwrap();

    assert!(runner.run_job(&job, &urls(&["https://a.com"])).is_err());
    assert!(auditor.calls().is_empty());
}
