//! Integration tests for command operations.
//!
//! Capabilities are fakes built from closures that record their arguments;
//! the agent is a `RecordingAgent`, so call counts can be asserted.

use chrono::NaiveDate;
use mailwright_core::capabilities::{CapabilityFuture, MailCapabilities, ProviderKind};
use mailwright_core::composition::{ProviderFlags, select_active_provider};
use mailwright_core::config::AppConfig;
use mailwright_core::error::{BackendError, MailwrightError};
use mailwright_core::{AppContext, ClassifiedError, ErrorCategory, RecordingAgent, ops};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

type CallLog = Arc<Mutex<Vec<String>>>;

fn ok(text: impl Into<String>) -> CapabilityFuture {
    let text = text.into();
    Box::pin(async move { Ok(text) })
}

/// Gmail-shaped capabilities that log each call as `name(args)`.
fn fake_gmail(log: &CallLog) -> MailCapabilities {
    let mut caps = MailCapabilities::empty(ProviderKind::Gmail);
    let l = log.clone();
    caps.read_inbox = Some(Arc::new(move |last: usize, unread: bool| -> CapabilityFuture {
        l.lock().unwrap().push(format!("read_inbox({last}, {unread})"));
        ok("inbox listing")
    }));
    let l = log.clone();
    caps.search_emails = Some(Arc::new(move |query: String, max: usize| -> CapabilityFuture {
        l.lock().unwrap().push(format!("search_emails({query}, {max})"));
        ok("email one\nemail two")
    }));
    let l = log.clone();
    caps.sync_contacts = Some(Arc::new(move |max: usize, exclude: String| -> CapabilityFuture {
        l.lock().unwrap().push(format!("sync_contacts({max}, {exclude})"));
        ok("synced")
    }));
    let l = log.clone();
    caps.get_unanswered_emails = Some(Arc::new(move |days: u32, max: usize| -> CapabilityFuture {
        l.lock().unwrap().push(format!("get_unanswered_emails({days}, {max})"));
        ok("unanswered")
    }));
    let l = log.clone();
    caps.detect_all_my_emails = Some(Arc::new(move |max: usize| -> CapabilityFuture {
        l.lock().unwrap().push(format!("detect_all_my_emails({max})"));
        ok("a@x.io\nb@x.io")
    }));
    let l = log.clone();
    caps.get_my_identity = Some(Arc::new(move || -> CapabilityFuture {
        l.lock().unwrap().push("get_my_identity()".to_string());
        ok("Primary: a@x.io")
    }));
    caps
}

/// Outlook-shaped capabilities: inbox, search and address only.
fn fake_outlook(log: &CallLog) -> MailCapabilities {
    let mut caps = MailCapabilities::empty(ProviderKind::Outlook);
    let l = log.clone();
    caps.read_inbox = Some(Arc::new(move |last: usize, unread: bool| -> CapabilityFuture {
        l.lock().unwrap().push(format!("read_inbox({last}, {unread})"));
        ok("outlook inbox")
    }));
    let l = log.clone();
    caps.get_my_email = Some(Arc::new(move || -> CapabilityFuture {
        l.lock().unwrap().push("get_my_email()".to_string());
        ok("Primary: me@corp.com")
    }));
    caps
}

fn context(
    workspace: &Path,
    kind: Option<ProviderKind>,
    caps: Option<MailCapabilities>,
    agent: Arc<RecordingAgent>,
) -> AppContext {
    let flags = ProviderFlags {
        gmail: kind == Some(ProviderKind::Gmail),
        outlook: kind == Some(ProviderKind::Outlook),
    };
    AppContext::new(
        AppConfig::default(),
        workspace,
        select_active_provider(flags),
        caps,
        agent.clone(),
        agent,
    )
}

fn write_today_template(workspace: &Path, body: &str) {
    let dir = workspace.join("commands");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("today.md"), body).unwrap();
}

#[tokio::test]
async fn test_not_connected_skips_capabilities_and_agent() {
    let ws = TempDir::new().unwrap();
    let agent = Arc::new(RecordingAgent::new("unused"));
    let ctx = context(ws.path(), None, None, agent.clone());

    for result in [
        ops::inbox(&ctx, 10, false).await,
        ops::search(&ctx, "x", 10).await,
        ops::contacts(&ctx).await,
        ops::sync(&ctx, 500, "").await,
        ops::unanswered(&ctx, 120, 20).await,
        ops::identity(&ctx, false).await,
        ops::today(&ctx).await,
    ] {
        assert_eq!(result.unwrap(), ops::NOT_CONNECTED);
    }
    assert_eq!(agent.call_count(), 0);
}

#[tokio::test]
async fn test_handlers_pass_arguments_through() {
    let ws = TempDir::new().unwrap();
    let log = CallLog::default();
    let ctx = context(
        ws.path(),
        Some(ProviderKind::Gmail),
        Some(fake_gmail(&log)),
        Arc::new(RecordingAgent::new("ok")),
    );

    ops::inbox(&ctx, 25, true).await.unwrap();
    ops::search(&ctx, "from:ada", 10).await.unwrap();
    ops::sync(&ctx, 500, "openonion.ai").await.unwrap();
    ops::unanswered(&ctx, ops::DEFAULT_DAYS, ops::DEFAULT_UNANSWERED_COUNT)
        .await
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "read_inbox(25, true)",
            "search_emails(from:ada, 10)",
            "sync_contacts(500, openonion.ai)",
            "get_unanswered_emails(120, 20)",
        ]
    );
}

#[tokio::test]
async fn test_missing_capabilities_report_not_available() {
    let ws = TempDir::new().unwrap();
    let log = CallLog::default();
    let ctx = context(
        ws.path(),
        Some(ProviderKind::Outlook),
        Some(fake_outlook(&log)),
        Arc::new(RecordingAgent::new("ok")),
    );

    assert_eq!(
        ops::contacts(&ctx).await.unwrap(),
        "Contact caching not available for this provider."
    );
    assert_eq!(
        ops::sync(&ctx, 500, "").await.unwrap(),
        "Contact syncing not available for this provider."
    );
    assert_eq!(
        ops::unanswered(&ctx, 120, 20).await.unwrap(),
        "Unanswered email tracking not available for this provider."
    );
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_identity_resolution_order() {
    let ws = TempDir::new().unwrap();
    let log = CallLog::default();
    let gmail = context(
        ws.path(),
        Some(ProviderKind::Gmail),
        Some(fake_gmail(&log)),
        Arc::new(RecordingAgent::new("ok")),
    );
    ops::identity(&gmail, true).await.unwrap();
    ops::identity(&gmail, false).await.unwrap();

    // Outlook has neither detection nor full identity.
    let outlook = context(
        ws.path(),
        Some(ProviderKind::Outlook),
        Some(fake_outlook(&log)),
        Arc::new(RecordingAgent::new("ok")),
    );
    assert_eq!(
        ops::identity(&outlook, true).await.unwrap(),
        "Primary: me@corp.com"
    );

    assert_eq!(
        *log.lock().unwrap(),
        vec!["detect_all_my_emails(100)", "get_my_identity()", "get_my_email()"]
    );
}

#[tokio::test]
async fn test_briefing_without_template_never_calls_agent() {
    let ws = TempDir::new().unwrap();
    let log = CallLog::default();
    let agent = Arc::new(RecordingAgent::new("briefing"));
    let ctx = context(
        ws.path(),
        Some(ProviderKind::Gmail),
        Some(fake_gmail(&log)),
        agent.clone(),
    );

    let out = ops::today(&ctx).await.unwrap();
    assert!(out.contains("not found"), "got: {out}");
    assert_eq!(agent.call_count(), 0);
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_briefing_template_without_slot_is_rejected() {
    let ws = TempDir::new().unwrap();
    write_today_template(ws.path(), "Summarize my day.");
    let agent = Arc::new(RecordingAgent::new("briefing"));
    let ctx = context(
        ws.path(),
        Some(ProviderKind::Gmail),
        Some(fake_gmail(&CallLog::default())),
        agent.clone(),
    );

    let out = ops::today(&ctx).await.unwrap();
    assert!(out.contains("{emails}"), "got: {out}");
    assert_eq!(agent.call_count(), 0);
}

#[tokio::test]
async fn test_briefing_fills_template_and_asks_agent() {
    let ws = TempDir::new().unwrap();
    write_today_template(
        ws.path(),
        "---\ndescription: Daily briefing\n---\nBrief me on:\n{emails}\nThanks.",
    );
    let log = CallLog::default();
    let agent = Arc::new(RecordingAgent::new("Here is your day"));
    let ctx = context(
        ws.path(),
        Some(ProviderKind::Gmail),
        Some(fake_gmail(&log)),
        agent.clone(),
    );

    let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
    let out = ops::daily_briefing(&ctx, today).await.unwrap();

    assert_eq!(out, "Here is your day");
    assert_eq!(
        *log.lock().unwrap(),
        vec!["search_emails(after:2024/05/09, 50)"]
    );
    assert_eq!(
        agent.prompts(),
        vec!["Brief me on:\nemail one\nemail two\nThanks."]
    );
}

#[tokio::test]
async fn test_init_result_names_memory_keys() {
    let ws = TempDir::new().unwrap();
    let agent = Arc::new(RecordingAgent::new("10 contacts analyzed"));
    let ctx = context(ws.path(), None, None, agent.clone());

    let out = ops::init_crm(&ctx, 500, 10, "openonion.ai").await.unwrap();

    assert!(out.starts_with("CRM INITIALIZATION COMPLETE."));
    for key in ops::INIT_MEMORY_KEYS {
        assert!(out.contains(&format!("- {key}")), "missing {key}");
    }
    assert!(out.ends_with("Details: 10 contacts analyzed"));
    assert_eq!(agent.prompts(), vec![ops::init_prompt(500, 10, "openonion.ai")]);
}

#[tokio::test]
async fn test_ask_forwards_verbatim() {
    let ws = TempDir::new().unwrap();
    let agent = Arc::new(RecordingAgent::new("Nothing today"));
    let ctx = context(ws.path(), None, None, agent.clone());

    assert_eq!(
        ops::ask(&ctx, "What's on my calendar").await.unwrap(),
        "Nothing today"
    );
    assert_eq!(agent.prompts(), vec!["What's on my calendar"]);
}

#[tokio::test]
async fn test_backend_failure_propagates_and_classifies() {
    let ws = TempDir::new().unwrap();
    let mut caps = MailCapabilities::empty(ProviderKind::Gmail);
    caps.read_inbox = Some(Arc::new(|_: usize, _: bool| -> CapabilityFuture {
        Box::pin(async {
            Err(BackendError::Network {
                provider: "Gmail".into(),
                message: "Connection refused".into(),
            })
        })
    }));
    let ctx = context(
        ws.path(),
        Some(ProviderKind::Gmail),
        Some(caps),
        Arc::new(RecordingAgent::new("ok")),
    );

    let err = ops::inbox(&ctx, 10, false).await.unwrap_err();
    assert!(matches!(err, MailwrightError::Backend(_)));
    assert_eq!(
        ClassifiedError::from_error(&err).category,
        ErrorCategory::Network
    );
}

#[test]
fn test_link_writes_flag_and_preserves_other_keys() {
    let ws = TempDir::new().unwrap();
    std::fs::write(ws.path().join(".env"), "OPENAI_API_KEY=sk-test\nLINKED_GMAIL=false\n").unwrap();
    let ctx = context(ws.path(), None, None, Arc::new(RecordingAgent::new("ok")));

    let first = ops::link(&ctx, ProviderKind::Gmail).unwrap();
    ops::link(&ctx, ProviderKind::Gmail).unwrap();

    assert!(first.contains("Restart"));
    assert_eq!(
        std::fs::read_to_string(ws.path().join(".env")).unwrap(),
        "OPENAI_API_KEY=sk-test\nLINKED_GMAIL=true\n"
    );
}
