//! Startup selection of the active email provider.
//!
//! Gmail and Outlook tools expose overlapping operation names, so at most one
//! provider is active. Gmail takes precedence when both flags are set. The
//! result is computed once per process; linking a provider only takes effect
//! after a restart.

use crate::capabilities::ProviderKind;

/// The two `LINKED_*` flags as read at process start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderFlags {
    pub gmail: bool,
    pub outlook: bool,
}

impl ProviderFlags {
    /// Read the flags through `lookup` (normally `std::env::var`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let is_true = |key: &str| {
            lookup(key)
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };
        Self {
            gmail: is_true(ProviderKind::Gmail.flag_key()),
            outlook: is_true(ProviderKind::Outlook.flag_key()),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Identifies a system prompt file under the prompts directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemPromptId {
    GmailAgent,
    OutlookAgent,
    CrmInit,
}

impl SystemPromptId {
    pub fn file_name(self) -> &'static str {
        match self {
            SystemPromptId::GmailAgent => "gmail_agent.md",
            SystemPromptId::OutlookAgent => "outlook_agent.md",
            SystemPromptId::CrmInit => "crm_init.md",
        }
    }
}

/// Whether a tool is tied to one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolScope {
    Provider(ProviderKind),
    Shared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub scope: ToolScope,
}

impl ToolSpec {
    const fn shared(name: &'static str) -> Self {
        Self {
            name,
            scope: ToolScope::Shared,
        }
    }

    const fn provider(name: &'static str, kind: ProviderKind) -> Self {
        Self {
            name,
            scope: ToolScope::Provider(kind),
        }
    }
}

/// Tools handed to an agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolBundle {
    tools: Vec<ToolSpec>,
}

impl ToolBundle {
    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name).collect()
    }

    pub fn provider_specific(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools
            .iter()
            .filter(|t| matches!(t.scope, ToolScope::Provider(_)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }
}

/// Everything derived from the provider flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub active: Option<ProviderKind>,
    pub system_prompt: SystemPromptId,
    /// Tools for the main conversational agent.
    pub tools: ToolBundle,
    /// Tools for the CRM initialization sub-agent.
    pub init_tools: ToolBundle,
    pub plugins: Vec<&'static str>,
    /// Operator-facing warning when nothing is linked.
    pub warning: Option<String>,
}

pub const NOT_CONNECTED_WARNING: &str =
    "No email account connected. Use /link-gmail or /link-outlook to connect.";

fn provider_tools(kind: ProviderKind) -> [ToolSpec; 2] {
    match kind {
        ProviderKind::Gmail => [
            ToolSpec::provider("gmail", kind),
            ToolSpec::provider("google_calendar", kind),
        ],
        ProviderKind::Outlook => [
            ToolSpec::provider("outlook", kind),
            ToolSpec::provider("microsoft_calendar", kind),
        ],
    }
}

/// Pick the active provider, system prompt and tool bundles for `flags`.
pub fn select_active_provider(flags: ProviderFlags) -> Composition {
    let active = if flags.gmail {
        Some(ProviderKind::Gmail)
    } else if flags.outlook {
        Some(ProviderKind::Outlook)
    } else {
        None
    };

    let provider: Vec<ToolSpec> = active
        .map(|kind| provider_tools(kind).to_vec())
        .unwrap_or_default();

    let mut tools = provider.clone();
    tools.extend([
        ToolSpec::shared("memory"),
        ToolSpec::shared("shell"),
        ToolSpec::shared("todo"),
        ToolSpec::shared("init_crm_database"),
    ]);

    let mut init_tools = provider;
    init_tools.extend([ToolSpec::shared("memory"), ToolSpec::shared("web_fetch")]);

    let mut plugins = vec!["re_act"];
    if active == Some(ProviderKind::Gmail) {
        plugins.extend(["gmail", "calendar"]);
    }

    let system_prompt = match active {
        Some(ProviderKind::Outlook) => SystemPromptId::OutlookAgent,
        // Gmail's prompt doubles as the default.
        Some(ProviderKind::Gmail) | None => SystemPromptId::GmailAgent,
    };

    Composition {
        active,
        system_prompt,
        tools: ToolBundle { tools },
        init_tools: ToolBundle { tools: init_tools },
        plugins,
        warning: active.is_none().then(|| NOT_CONNECTED_WARNING.to_string()),
    }
}
