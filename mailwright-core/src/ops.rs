//! Command operations shared by the programmatic CLI and slash commands.
//!
//! Each operation checks for a linked provider, then for the specific
//! capability it needs, and returns a guidance message instead of failing
//! when either is missing. Backend and agent failures propagate as errors
//! for the caller to classify.

use crate::capabilities::{MailCapabilities, ProviderKind};
use crate::context::AppContext;
use crate::error::MailwrightError;
use crate::template::EMAILS_SLOT;
use chrono::{Days, NaiveDate};
use tracing::{debug, info, warn};

pub const NOT_CONNECTED: &str =
    "No email account connected. Use /link-gmail or /link-outlook to connect.";

pub const DEFAULT_COUNT: usize = 10;
pub const DEFAULT_MAX_EMAILS: usize = 500;
pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_DAYS: u32 = 120;
pub const DEFAULT_UNANSWERED_COUNT: usize = 20;
/// Sent-mail scan size for `identity --detect`.
pub const DETECT_MAX_EMAILS: usize = 100;
pub const BRIEFING_LIMIT: usize = 50;
pub const BRIEFING_TEMPLATE: &str = "today";

/// Marker the init result starts with, followed by the memory keys written.
pub const INIT_COMPLETE_MARKER: &str = "CRM INITIALIZATION COMPLETE";
pub const INIT_MEMORY_KEYS: [&str; 4] = [
    "crm:all_contacts",
    "crm:needs_reply",
    "crm:init_report",
    "contact:email@example.com",
];

pub type OpResult = Result<String, MailwrightError>;

pub fn not_available(feature: &str) -> String {
    format!("{feature} not available for this provider.")
}

fn connected(ctx: &AppContext) -> Option<&MailCapabilities> {
    let caps = ctx.capabilities.as_ref();
    if caps.is_none() {
        debug!("command needs a provider but none is linked");
    }
    caps
}

pub async fn inbox(ctx: &AppContext, count: usize, unread: bool) -> OpResult {
    let Some(caps) = connected(ctx) else {
        return Ok(NOT_CONNECTED.to_string());
    };
    let Some(read_inbox) = &caps.read_inbox else {
        return Ok(not_available("Inbox listing"));
    };
    Ok(read_inbox(count, unread).await?)
}

pub async fn search(ctx: &AppContext, query: &str, count: usize) -> OpResult {
    let Some(caps) = connected(ctx) else {
        return Ok(NOT_CONNECTED.to_string());
    };
    let Some(search_emails) = &caps.search_emails else {
        return Ok(not_available("Email search"));
    };
    Ok(search_emails(query.to_string(), count).await?)
}

pub async fn contacts(ctx: &AppContext) -> OpResult {
    let Some(caps) = connected(ctx) else {
        return Ok(NOT_CONNECTED.to_string());
    };
    let Some(cached) = &caps.get_cached_contacts else {
        return Ok(not_available("Contact caching"));
    };
    Ok(cached().await?)
}

pub async fn sync(ctx: &AppContext, max_emails: usize, exclude: &str) -> OpResult {
    let Some(caps) = connected(ctx) else {
        return Ok(NOT_CONNECTED.to_string());
    };
    let Some(sync_contacts) = &caps.sync_contacts else {
        return Ok(not_available("Contact syncing"));
    };
    Ok(sync_contacts(max_emails, exclude.to_string()).await?)
}

pub async fn unanswered(ctx: &AppContext, days: u32, count: usize) -> OpResult {
    let Some(caps) = connected(ctx) else {
        return Ok(NOT_CONNECTED.to_string());
    };
    let Some(get_unanswered) = &caps.get_unanswered_emails else {
        return Ok(not_available("Unanswered email tracking"));
    };
    Ok(get_unanswered(days, count).await?)
}

/// Resolve the user's identity: detection when requested and supported,
/// then the full identity, then the bare account address.
pub async fn identity(ctx: &AppContext, detect: bool) -> OpResult {
    let Some(caps) = connected(ctx) else {
        return Ok(NOT_CONNECTED.to_string());
    };
    if detect && let Some(detect_all) = &caps.detect_all_my_emails {
        return Ok(detect_all(DETECT_MAX_EMAILS).await?);
    }
    if let Some(get_identity) = &caps.get_my_identity {
        return Ok(get_identity().await?);
    }
    if let Some(get_email) = &caps.get_my_email {
        return Ok(get_email().await?);
    }
    Ok(not_available("Identity detection"))
}

/// Search query covering the day before `today`.
pub fn briefing_query(today: NaiveDate) -> String {
    let since = today.checked_sub_days(Days::new(1)).unwrap_or(today);
    format!("after:{}", since.format("%Y/%m/%d"))
}

/// Fill the `today` command template with recent mail and hand it to the
/// agent. A missing template or slot is reported without calling the agent.
pub async fn daily_briefing(ctx: &AppContext, today: NaiveDate) -> OpResult {
    let Some(caps) = connected(ctx) else {
        return Ok(NOT_CONNECTED.to_string());
    };
    let template = match ctx.templates.template(BRIEFING_TEMPLATE, EMAILS_SLOT) {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "briefing template unusable");
            return Ok(e.to_string());
        }
    };
    let Some(search_emails) = &caps.search_emails else {
        return Ok(not_available("Email search"));
    };
    let query = briefing_query(today);
    debug!(query = %query, "collecting briefing emails");
    let emails = search_emails(query, BRIEFING_LIMIT).await?;
    Ok(ctx.agent.input(&template.fill(&emails)).await?)
}

/// Daily briefing for the local current date.
pub async fn today(ctx: &AppContext) -> OpResult {
    daily_briefing(ctx, chrono::Local::now().date_naive()).await
}

pub fn init_prompt(max_emails: usize, top_n: usize, exclude: &str) -> String {
    format!(
        "Initialize CRM: Extract top {top_n} contacts from {max_emails} emails.\n\
         IMPORTANT: Use get_all_contacts(max_emails={max_emails}, exclude_domains=\"{exclude}\")\n\
         Then use AI judgment to categorize and analyze the most important contacts."
    )
}

/// Run the CRM init sub-agent. The result names the memory keys written so
/// follow-up questions read them instead of initializing again.
pub async fn init_crm(ctx: &AppContext, max_emails: usize, top_n: usize, exclude: &str) -> OpResult {
    info!(max_emails, top_n, "starting CRM initialization");
    let details = ctx
        .init_agent
        .input(&init_prompt(max_emails, top_n, exclude))
        .await?;
    let keys: Vec<String> = INIT_MEMORY_KEYS.iter().map(|k| format!("- {k}")).collect();
    Ok(format!(
        "{INIT_COMPLETE_MARKER}. Data saved to memory. Use read_memory() to access:\n{}\n\nDetails: {details}",
        keys.join("\n")
    ))
}

pub async fn ask(ctx: &AppContext, question: &str) -> OpResult {
    Ok(ctx.agent.input(question).await?)
}

/// Mark `kind` as linked in the env file. Takes effect on restart.
pub fn link(ctx: &AppContext, kind: ProviderKind) -> OpResult {
    ctx.env_file.upsert(kind.flag_key(), "true")?;
    info!(provider = %kind, path = %ctx.env_file.path().display(), "provider linked");

    let mut message = format!(
        "{kind} linked ({}=true written to {}). Restart mailwright to activate it.",
        kind.flag_key(),
        ctx.env_file.path().display()
    );
    let token_set = std::env::var(kind.token_env()).is_ok_and(|t| !t.trim().is_empty());
    if !token_set {
        message.push_str(&format!(
            "\nNote: {} is not set. Add an access token to .env before using {kind} commands.",
            kind.token_env()
        ));
    }
    if kind == ProviderKind::Outlook && ctx.composition.active == Some(ProviderKind::Gmail) {
        message.push_str("\nGmail is also linked and takes precedence while both are set.");
    }
    Ok(message)
}
