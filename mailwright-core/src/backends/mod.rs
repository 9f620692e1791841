//! Email backend adapters.
//!
//! Each adapter is a thin REST client. [`capabilities_for`] wraps one in a
//! [`MailCapabilities`] value, filling only the operations that backend
//! actually supports.

mod gmail;
mod http;
mod outlook;

pub use gmail::GmailClient;
pub use http::ApiClient;
pub use outlook::OutlookClient;

use crate::capabilities::{MailCapabilities, ProviderKind};
use crate::contacts::ContactRecord;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Header fields of one message, as shown in listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageSummary {
    pub from: String,
    pub subject: String,
    pub date: String,
    pub snippet: String,
    pub unread: bool,
}

/// Render a numbered message listing under `title`.
pub fn format_messages(title: &str, messages: &[MessageSummary]) -> String {
    if messages.is_empty() {
        return format!("{title}: no messages found.");
    }
    let mut out = format!("{title} ({}):\n", messages.len());
    for (i, m) in messages.iter().enumerate() {
        let marker = if m.unread { " [unread]" } else { "" };
        let subject = if m.subject.is_empty() { "(no subject)" } else { &m.subject };
        let _ = writeln!(out, "{}. {subject}{marker}", i + 1);
        let _ = writeln!(out, "   From: {}", m.from);
        if !m.date.is_empty() {
            let _ = writeln!(out, "   Date: {}", m.date);
        }
        if !m.snippet.is_empty() {
            let _ = writeln!(out, "   {}", m.snippet.trim());
        }
    }
    out.truncate(out.trim_end().len());
    out
}

/// Render cached contacts, one per line.
pub fn format_contacts(contacts: &[ContactRecord]) -> String {
    if contacts.is_empty() {
        return "No cached contacts. Run /sync to build the contact list.".to_string();
    }
    let mut out = format!("Contacts ({}):\n", contacts.len());
    for c in contacts {
        let _ = write!(out, "{} {}", c.kind().icon(), c.label());
        if !c.name.is_empty() {
            let _ = write!(out, " <{}>", c.email);
        }
        let subtitle = c.subtitle();
        if !subtitle.is_empty() {
            let _ = write!(out, " · {subtitle}");
        }
        if c.is_priority() {
            out.push_str(" ★");
        }
        out.push('\n');
    }
    out.truncate(out.trim_end().len());
    out
}

/// Split an RFC 5322 mailbox (`"Ada Lovelace" <ada@example.com>`) into
/// `(name, email)`. The email is lowercased.
pub fn parse_mailbox(raw: &str) -> (String, String) {
    let raw = raw.trim();
    if let (Some(open), Some(close)) = (raw.rfind('<'), raw.rfind('>'))
        && open < close
    {
        let name = raw[..open].trim().trim_matches('"').trim().to_string();
        let email = raw[open + 1..close].trim().to_ascii_lowercase();
        return (name, email);
    }
    (String::new(), raw.trim_matches('"').to_ascii_lowercase())
}

/// Whether `email`'s domain is in the comma-separated `exclude_domains`.
pub fn is_excluded(email: &str, exclude_domains: &str) -> bool {
    let Some((_, domain)) = email.rsplit_once('@') else {
        return false;
    };
    exclude_domains
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .any(|d| {
            let domain = domain.to_ascii_lowercase();
            let d = d.to_ascii_lowercase();
            domain == d || domain.ends_with(&format!(".{d}"))
        })
}

/// Build the capability set for `kind`, reading its access token from the
/// environment.
pub fn capabilities_for(kind: ProviderKind, contacts_path: PathBuf) -> MailCapabilities {
    match kind {
        ProviderKind::Gmail => GmailClient::from_env(contacts_path).into_capabilities(),
        ProviderKind::Outlook => OutlookClient::from_env().into_capabilities(),
    }
}
