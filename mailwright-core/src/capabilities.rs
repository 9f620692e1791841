//! The email capability interface handed to command handlers.
//!
//! Backends differ in which operations they support, so every operation is
//! an optional async function. A handler checks the field it needs and
//! reports "not available" when it is `None`.

use crate::error::BackendError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by every capability operation.
pub type CapabilityFuture = Pin<Box<dyn Future<Output = Result<String, BackendError>> + Send>>;

/// `read_inbox(last, unread)`.
pub type ReadInboxFn = Arc<dyn Fn(usize, bool) -> CapabilityFuture + Send + Sync>;
/// `search_emails(query, max_results)`.
pub type SearchFn = Arc<dyn Fn(String, usize) -> CapabilityFuture + Send + Sync>;
/// `sync_contacts(max_emails, exclude_domains)`.
pub type SyncContactsFn = Arc<dyn Fn(usize, String) -> CapabilityFuture + Send + Sync>;
/// `get_unanswered_emails(older_than_days, max_results)`.
pub type UnansweredFn = Arc<dyn Fn(u32, usize) -> CapabilityFuture + Send + Sync>;
/// `detect_all_my_emails(max_emails)`.
pub type DetectFn = Arc<dyn Fn(usize) -> CapabilityFuture + Send + Sync>;
/// Operations without arguments.
pub type NullaryFn = Arc<dyn Fn() -> CapabilityFuture + Send + Sync>;

/// Which backend a capability set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Gmail,
    Outlook,
}

impl ProviderKind {
    pub fn label(self) -> &'static str {
        match self {
            ProviderKind::Gmail => "Gmail",
            ProviderKind::Outlook => "Outlook",
        }
    }

    /// Env flag that marks this provider as linked.
    pub fn flag_key(self) -> &'static str {
        match self {
            ProviderKind::Gmail => "LINKED_GMAIL",
            ProviderKind::Outlook => "LINKED_OUTLOOK",
        }
    }

    /// Env var holding the provider's OAuth access token.
    pub fn token_env(self) -> &'static str {
        match self {
            ProviderKind::Gmail => "GOOGLE_ACCESS_TOKEN",
            ProviderKind::Outlook => "MICROSOFT_ACCESS_TOKEN",
        }
    }

    /// Slash command that links this provider.
    pub fn link_command(self) -> &'static str {
        match self {
            ProviderKind::Gmail => "/link-gmail",
            ProviderKind::Outlook => "/link-outlook",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Operations exposed by the active backend.
#[derive(Clone)]
pub struct MailCapabilities {
    pub provider: ProviderKind,
    pub read_inbox: Option<ReadInboxFn>,
    pub search_emails: Option<SearchFn>,
    pub get_cached_contacts: Option<NullaryFn>,
    pub sync_contacts: Option<SyncContactsFn>,
    pub get_unanswered_emails: Option<UnansweredFn>,
    pub detect_all_my_emails: Option<DetectFn>,
    pub get_my_identity: Option<NullaryFn>,
    pub get_my_email: Option<NullaryFn>,
}

impl MailCapabilities {
    /// A capability set with no operations.
    pub fn empty(provider: ProviderKind) -> Self {
        Self {
            provider,
            read_inbox: None,
            search_emails: None,
            get_cached_contacts: None,
            sync_contacts: None,
            get_unanswered_emails: None,
            detect_all_my_emails: None,
            get_my_identity: None,
            get_my_email: None,
        }
    }

    /// Names of the operations this backend provides.
    pub fn supported(&self) -> Vec<&'static str> {
        [
            ("read_inbox", self.read_inbox.is_some()),
            ("search_emails", self.search_emails.is_some()),
            ("get_cached_contacts", self.get_cached_contacts.is_some()),
            ("sync_contacts", self.sync_contacts.is_some()),
            ("get_unanswered_emails", self.get_unanswered_emails.is_some()),
            ("detect_all_my_emails", self.detect_all_my_emails.is_some()),
            ("get_my_identity", self.get_my_identity.is_some()),
            ("get_my_email", self.get_my_email.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

impl fmt::Debug for MailCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailCapabilities")
            .field("provider", &self.provider)
            .field("supported", &self.supported())
            .finish()
    }
}
