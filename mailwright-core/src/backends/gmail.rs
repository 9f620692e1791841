//! Gmail REST adapter. Supports every optional capability.

use super::http::ApiClient;
use super::{MessageSummary, format_contacts, format_messages, is_excluded, parse_mailbox};
use crate::capabilities::{CapabilityFuture, MailCapabilities, ProviderKind};
use crate::contacts::{ContactRecord, load_contacts, write_contacts};
use crate::error::BackendError;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const GMAIL_API: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
/// Gmail caps `maxResults` per page at 500.
const PAGE_LIMIT: usize = 500;
const FETCH_CONCURRENCY: usize = 8;

pub struct GmailClient {
    api: ApiClient,
    contacts_path: PathBuf,
}

impl GmailClient {
    pub fn new(api: ApiClient, contacts_path: PathBuf) -> Self {
        Self { api, contacts_path }
    }

    pub fn from_env(contacts_path: PathBuf) -> Self {
        Self::new(ApiClient::from_env(ProviderKind::Gmail, GMAIL_API), contacts_path)
    }

    async fn list_ids(&self, resource: &str, query: &str, max: usize) -> Result<Vec<String>, BackendError> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;
        while ids.len() < max {
            let mut params = vec![("maxResults", (max - ids.len()).min(PAGE_LIMIT).to_string())];
            if !query.is_empty() {
                params.push(("q", query.to_string()));
            }
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }
            let page = self.api.get_json(resource, &params).await?;
            let batch = page
                .get(resource)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|m| m.get("id").and_then(Value::as_str).map(str::to_string))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            if batch.is_empty() {
                break;
            }
            ids.extend(batch);
            match page.get("nextPageToken").and_then(Value::as_str) {
                Some(token) => page_token = Some(token.to_string()),
                None => break,
            }
        }
        ids.truncate(max);
        Ok(ids)
    }

    async fn summaries(&self, ids: Vec<String>) -> Result<Vec<MessageSummary>, BackendError> {
        stream::iter(ids)
            .map(|id| async move {
                let path = format!("messages/{id}");
                let msg = self.api.get_json(&path, &metadata_params()).await?;
                Ok::<_, BackendError>(summary_from_message(&msg))
            })
            .buffered(FETCH_CONCURRENCY)
            .try_collect()
            .await
    }

    pub async fn read_inbox(&self, last: usize, unread: bool) -> Result<String, BackendError> {
        let query = if unread { "in:inbox is:unread" } else { "in:inbox" };
        let ids = self.list_ids("messages", query, last).await?;
        let title = if unread { "Unread inbox" } else { "Inbox" };
        Ok(format_messages(title, &self.summaries(ids).await?))
    }

    pub async fn search_emails(&self, query: &str, max_results: usize) -> Result<String, BackendError> {
        let ids = self.list_ids("messages", query, max_results).await?;
        Ok(format_messages(&format!("Results for '{query}'"), &self.summaries(ids).await?))
    }

    pub async fn cached_contacts(&self) -> Result<String, BackendError> {
        let contacts = load_contacts(&self.contacts_path).map_err(|e| BackendError::ContactFile {
            path: self.contacts_path.clone(),
            message: e.to_string(),
        })?;
        Ok(format_contacts(&contacts))
    }

    /// Scan recent senders and merge them into the contacts file.
    pub async fn sync_contacts(&self, max_emails: usize, exclude_domains: &str) -> Result<String, BackendError> {
        let ids = self.list_ids("messages", "in:inbox", max_emails).await?;
        let scanned = ids.len();
        let senders: Vec<(String, String)> = self
            .summaries(ids)
            .await?
            .iter()
            .map(|m| parse_mailbox(&m.from))
            .collect();

        let file_error = |e: std::io::Error| BackendError::ContactFile {
            path: self.contacts_path.clone(),
            message: e.to_string(),
        };
        let existing = load_contacts(&self.contacts_path).map_err(file_error)?;
        let (merged, added) = merge_senders(existing, &senders, exclude_domains);
        write_contacts(&self.contacts_path, &merged).map_err(file_error)?;
        info!(scanned, added, total = merged.len(), "contacts synced");
        Ok(format!(
            "Synced contacts from {scanned} emails: {added} new, {} total. Saved to {}.",
            merged.len(),
            self.contacts_path.display()
        ))
    }

    /// Inbox threads from the last `days` days that contain no sent reply.
    pub async fn unanswered(&self, days: u32, max_results: usize) -> Result<String, BackendError> {
        let query = format!("in:inbox newer_than:{days}d -from:me");
        let ids = self.list_ids("threads", &query, max_results.saturating_mul(3).min(PAGE_LIMIT)).await?;
        let threads: Vec<Value> = stream::iter(ids)
            .map(|id| async move {
                let path = format!("threads/{id}");
                self.api.get_json(&path, &metadata_params()).await
            })
            .buffered(FETCH_CONCURRENCY)
            .try_collect()
            .await?;

        let pending: Vec<MessageSummary> = threads
            .iter()
            .filter(|t| thread_is_unanswered(t))
            .filter_map(|t| {
                t.get("messages")
                    .and_then(Value::as_array)
                    .and_then(|m| m.last())
                    .map(summary_from_message)
            })
            .take(max_results)
            .collect();
        Ok(format_messages(&format!("Unanswered in the last {days} days"), &pending))
    }

    /// Every address the user has sent from, found in the sent folder.
    pub async fn detect_all_my_emails(&self, max_emails: usize) -> Result<String, BackendError> {
        let ids = self.list_ids("messages", "in:sent", max_emails).await?;
        let mut addresses: Vec<String> = Vec::new();
        for summary in self.summaries(ids).await? {
            let (_, email) = parse_mailbox(&summary.from);
            if !email.is_empty() && !addresses.contains(&email) {
                addresses.push(email);
            }
        }
        if addresses.is_empty() {
            return Ok("No sent messages found to detect addresses from.".to_string());
        }
        Ok(format!("Addresses you send from:\n{}", addresses.join("\n")))
    }

    pub async fn identity(&self) -> Result<String, BackendError> {
        let profile = self.api.get_json("profile", &[]).await?;
        let primary = profile
            .get("emailAddress")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let send_as = self.api.get_json("settings/sendAs", &[]).await?;
        let aliases: Vec<String> = send_as
            .get("sendAs")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|a| a.get("sendAsEmail").and_then(Value::as_str))
                    .filter(|a| !a.eq_ignore_ascii_case(&primary))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let mut out = format!("Primary: {primary}");
        if !aliases.is_empty() {
            out.push_str(&format!("\nAliases: {}", aliases.join(", ")));
        }
        Ok(out)
    }

    pub fn into_capabilities(self) -> MailCapabilities {
        let client = Arc::new(self);
        let mut caps = MailCapabilities::empty(ProviderKind::Gmail);

        let c = client.clone();
        caps.read_inbox = Some(Arc::new(move |last: usize, unread: bool| -> CapabilityFuture {
            let c = c.clone();
            Box::pin(async move { c.read_inbox(last, unread).await })
        }));
        let c = client.clone();
        caps.search_emails = Some(Arc::new(move |query: String, max: usize| -> CapabilityFuture {
            let c = c.clone();
            Box::pin(async move { c.search_emails(&query, max).await })
        }));
        let c = client.clone();
        caps.get_cached_contacts = Some(Arc::new(move || -> CapabilityFuture {
            let c = c.clone();
            Box::pin(async move { c.cached_contacts().await })
        }));
        let c = client.clone();
        caps.sync_contacts = Some(Arc::new(move |max: usize, exclude: String| -> CapabilityFuture {
            let c = c.clone();
            Box::pin(async move { c.sync_contacts(max, &exclude).await })
        }));
        let c = client.clone();
        caps.get_unanswered_emails = Some(Arc::new(move |days: u32, max: usize| -> CapabilityFuture {
            let c = c.clone();
            Box::pin(async move { c.unanswered(days, max).await })
        }));
        let c = client.clone();
        caps.detect_all_my_emails = Some(Arc::new(move |max: usize| -> CapabilityFuture {
            let c = c.clone();
            Box::pin(async move { c.detect_all_my_emails(max).await })
        }));
        let c = client;
        caps.get_my_identity = Some(Arc::new(move || -> CapabilityFuture {
            let c = c.clone();
            Box::pin(async move { c.identity().await })
        }));
        caps
    }
}

fn metadata_params() -> Vec<(&'static str, String)> {
    vec![
        ("format", "metadata".to_string()),
        ("metadataHeaders", "From".to_string()),
        ("metadataHeaders", "Subject".to_string()),
        ("metadataHeaders", "Date".to_string()),
    ]
}

fn has_label(message: &Value, label: &str) -> bool {
    message
        .get("labelIds")
        .and_then(Value::as_array)
        .is_some_and(|labels| labels.iter().any(|l| l.as_str() == Some(label)))
}

fn summary_from_message(message: &Value) -> MessageSummary {
    let header = |name: &str| {
        message
            .pointer("/payload/headers")
            .and_then(Value::as_array)
            .and_then(|headers| {
                headers.iter().find(|h| {
                    h.get("name")
                        .and_then(Value::as_str)
                        .is_some_and(|n| n.eq_ignore_ascii_case(name))
                })
            })
            .and_then(|h| h.get("value").and_then(Value::as_str))
            .unwrap_or_default()
            .to_string()
    };
    MessageSummary {
        from: header("From"),
        subject: header("Subject"),
        date: header("Date"),
        snippet: message
            .get("snippet")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        unread: has_label(message, "UNREAD"),
    }
}

fn thread_is_unanswered(thread: &Value) -> bool {
    thread
        .get("messages")
        .and_then(Value::as_array)
        .is_some_and(|messages| !messages.is_empty() && !messages.iter().any(|m| has_label(m, "SENT")))
}

fn guess_kind(email: &str) -> &'static str {
    let local = email.split('@').next().unwrap_or_default();
    if ["noreply", "no-reply", "donotreply", "notifications", "alerts"]
        .iter()
        .any(|p| local.contains(p))
    {
        "NOTIFICATION"
    } else if ["support", "billing", "info", "team", "hello"].contains(&local) {
        "SERVICE"
    } else {
        "PERSON"
    }
}

/// Merge `(name, email)` senders into `existing`. New addresses are appended
/// in descending order of frequency; existing rows keep their data and only
/// gain a name when they had none. Returns the merged list and the number
/// of rows added.
fn merge_senders(
    mut existing: Vec<ContactRecord>,
    senders: &[(String, String)],
    exclude_domains: &str,
) -> (Vec<ContactRecord>, usize) {
    let mut order: Vec<&str> = Vec::new();
    let mut seen: HashMap<&str, (usize, &str)> = HashMap::new();
    for (name, email) in senders {
        if email.is_empty() || is_excluded(email, exclude_domains) {
            continue;
        }
        let entry = seen.entry(email.as_str()).or_insert_with(|| {
            order.push(email.as_str());
            (0, name.as_str())
        });
        entry.0 += 1;
        if entry.1.is_empty() {
            entry.1 = name.as_str();
        }
    }

    let mut fresh: Vec<(usize, ContactRecord)> = Vec::new();
    for email in order {
        let (count, name) = seen[email];
        if let Some(known) = existing.iter_mut().find(|c| c.email.eq_ignore_ascii_case(email)) {
            if known.name.is_empty() {
                known.name = name.to_string();
            }
            continue;
        }
        fresh.push((
            count,
            ContactRecord {
                email: email.to_string(),
                name: name.to_string(),
                kind: guess_kind(email).to_string(),
                ..Default::default()
            },
        ));
    }
    fresh.sort_by(|a, b| b.0.cmp(&a.0));
    let added = fresh.len();
    existing.extend(fresh.into_iter().map(|(_, c)| c));
    (existing, added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_summary_from_message() {
        let msg = json!({
            "id": "1",
            "labelIds": ["INBOX", "UNREAD"],
            "snippet": "See you tomorrow",
            "payload": {"headers": [
                {"name": "From", "value": "Ada <ada@example.com>"},
                {"name": "subject", "value": "Lunch"},
                {"name": "Date", "value": "Tue, 2 Jan 2024"}
            ]}
        });
        assert_eq!(
            summary_from_message(&msg),
            MessageSummary {
                from: "Ada <ada@example.com>".into(),
                subject: "Lunch".into(),
                date: "Tue, 2 Jan 2024".into(),
                snippet: "See you tomorrow".into(),
                unread: true,
            }
        );
    }

    #[test]
    fn test_thread_is_unanswered() {
        let open = json!({"messages": [{"labelIds": ["INBOX"]}]});
        let replied = json!({"messages": [{"labelIds": ["INBOX"]}, {"labelIds": ["SENT"]}]});
        assert!(thread_is_unanswered(&open));
        assert!(!thread_is_unanswered(&replied));
        assert!(!thread_is_unanswered(&json!({"messages": []})));
    }

    #[test]
    fn test_merge_senders_orders_by_frequency_and_excludes() {
        let existing = vec![ContactRecord {
            email: "known@example.com".into(),
            priority: "high".into(),
            ..Default::default()
        }];
        let senders = vec![
            ("Bob".to_string(), "bob@example.com".to_string()),
            ("Carol".to_string(), "carol@example.com".to_string()),
            ("Carol".to_string(), "carol@example.com".to_string()),
            ("Known Person".to_string(), "known@example.com".to_string()),
            ("Team".to_string(), "x@openonion.ai".to_string()),
            ("".to_string(), "noreply@service.com".to_string()),
        ];
        let (merged, added) = merge_senders(existing, &senders, "openonion.ai");
        assert_eq!(added, 3);
        let emails: Vec<&str> = merged.iter().map(|c| c.email.as_str()).collect();
        assert_eq!(
            emails,
            vec!["known@example.com", "carol@example.com", "bob@example.com", "noreply@service.com"]
        );
        assert_eq!(merged[0].name, "Known Person");
        assert_eq!(merged[0].priority, "high");
        assert_eq!(merged[3].kind, "NOTIFICATION");
    }

    #[test]
    fn test_capabilities_cover_every_operation() {
        let api = ApiClient::new(ProviderKind::Gmail, GMAIL_API, None);
        let caps = GmailClient::new(api, PathBuf::from("contacts.csv")).into_capabilities();
        assert_eq!(caps.supported().len(), 7);
        assert!(caps.get_my_email.is_none());
    }

    #[tokio::test]
    async fn test_cached_contacts_reads_file_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contacts.csv");
        std::fs::write(&path, "email,name\nada@example.com,Ada\n").unwrap();
        let client = GmailClient::new(ApiClient::new(ProviderKind::Gmail, GMAIL_API, None), path);
        let out = client.cached_contacts().await.unwrap();
        assert!(out.contains("Ada <ada@example.com>"));
    }
}
