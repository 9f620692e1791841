//! Microsoft Graph adapter. Only inbox listing, search and the account
//! address are available.

use super::http::ApiClient;
use super::{MessageSummary, format_messages};
use crate::capabilities::{CapabilityFuture, MailCapabilities, ProviderKind};
use crate::error::BackendError;
use serde_json::Value;
use std::sync::Arc;

const GRAPH_API: &str = "https://graph.microsoft.com/v1.0";
const MESSAGE_FIELDS: &str = "from,subject,receivedDateTime,bodyPreview,isRead";

/// Graph rejects `$orderby` unless the ordered property also leads
/// `$filter`, so the unread filter opens with an always-true date bound.
fn inbox_params(last: usize, unread: bool) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("$top", last.to_string()),
        ("$select", MESSAGE_FIELDS.to_string()),
        ("$orderby", "receivedDateTime desc".to_string()),
    ];
    if unread {
        params.push((
            "$filter",
            "receivedDateTime ge 1900-01-01T00:00:00Z and isRead eq false".to_string(),
        ));
    }
    params
}

pub struct OutlookClient {
    api: ApiClient,
}

impl OutlookClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn from_env() -> Self {
        Self::new(ApiClient::from_env(ProviderKind::Outlook, GRAPH_API))
    }

    pub async fn read_inbox(&self, last: usize, unread: bool) -> Result<String, BackendError> {
        let params = inbox_params(last, unread);
        let page = self.api.get_json("me/mailFolders/inbox/messages", &params).await?;
        let title = if unread { "Unread inbox" } else { "Inbox" };
        Ok(format_messages(title, &summaries(&page)))
    }

    pub async fn search_emails(&self, query: &str, max_results: usize) -> Result<String, BackendError> {
        let params = vec![
            ("$top", max_results.to_string()),
            ("$select", MESSAGE_FIELDS.to_string()),
            ("$search", format!("\"{}\"", query.replace('"', ""))),
        ];
        let page = self.api.get_json("me/messages", &params).await?;
        Ok(format_messages(&format!("Results for '{query}'"), &summaries(&page)))
    }

    pub async fn my_email(&self) -> Result<String, BackendError> {
        let me = self.api.get_json("me", &[]).await?;
        me.get("mail")
            .and_then(Value::as_str)
            .or_else(|| me.get("userPrincipalName").and_then(Value::as_str))
            .map(|email| format!("Primary: {email}"))
            .ok_or_else(|| BackendError::Parse {
                provider: ProviderKind::Outlook.label().to_string(),
                message: "profile has no mail address".to_string(),
            })
    }

    pub fn into_capabilities(self) -> MailCapabilities {
        let client = Arc::new(self);
        let mut caps = MailCapabilities::empty(ProviderKind::Outlook);

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
        let c = client;
        caps.get_my_email = Some(Arc::new(move || -> CapabilityFuture {
            let c = c.clone();
            Box::pin(async move { c.my_email().await })
        }));
        caps
    }
}

fn summaries(page: &Value) -> Vec<MessageSummary> {
    page.get("value")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(summary_from_graph).collect())
        .unwrap_or_default()
}

fn summary_from_graph(message: &Value) -> MessageSummary {
    let text = |pointer: &str| {
        message
            .pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let name = text("/from/emailAddress/name");
    let address = text("/from/emailAddress/address");
    let from = if name.is_empty() {
        address
    } else {
        format!("{name} <{address}>")
    };
    MessageSummary {
        from,
        subject: text("/subject"),
        date: text("/receivedDateTime"),
        snippet: text("/bodyPreview"),
        unread: message.get("isRead").and_then(Value::as_bool) == Some(false),
    }
}
