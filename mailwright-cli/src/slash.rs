//! Slash command registry for the REPL.
//!
//! Holds the metadata for every `/command`: aliases, icons, usage and help
//! categories. Dispatch resolves a token to a [`SlashCommand`] through
//! [`CommandRegistry::lookup`]; the `/` autocomplete reads
//! [`CommandRegistry::candidate_entries`].

use mailwright_core::StaticEntry;

/// Categories for grouping commands in `/help` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCategory {
    Essential,
    Manage,
    Other,
}

impl CommandCategory {
    pub fn label(&self) -> &'static str {
        match self {
            CommandCategory::Essential => "Essential",
            CommandCategory::Manage => "Manage",
            CommandCategory::Other => "Other",
        }
    }

    pub fn all() -> &'static [CommandCategory] {
        &[
            CommandCategory::Essential,
            CommandCategory::Manage,
            CommandCategory::Other,
        ]
    }
}

/// The handler a command is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlashCommand {
    Today,
    Inbox,
    Search,
    Contacts,
    Sync,
    Init,
    Unanswered,
    Identity,
    Ask,
    LinkGmail,
    LinkOutlook,
    Help,
    Quit,
}

/// Metadata describing a slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    /// Primary name including the slash, e.g. "/inbox".
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    /// Usage pattern, e.g. "/inbox [count]".
    pub usage: &'static str,
    pub icon: &'static str,
    pub category: CommandCategory,
    pub command: SlashCommand,
}

/// Registry holding all slash commands. Registration order is listing order.
pub struct CommandRegistry {
    commands: Vec<CommandInfo>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_defaults();
        registry
    }

    pub fn register(&mut self, info: CommandInfo) {
        self.commands.push(info);
    }

    pub fn register_defaults(&mut self) {
        use CommandCategory::{Essential, Manage, Other};
        type Row = (
            &'static str,
            &'static [&'static str],
            &'static str,
            &'static str,
            &'static str,
            CommandCategory,
            SlashCommand,
        );
        let defaults: [Row; 13] = [
            ("/today", &[], "Daily email briefing", "/today", "📅", Essential, SlashCommand::Today),
            ("/inbox", &[], "Show recent emails", "/inbox [count]", "📥", Essential, SlashCommand::Inbox),
            ("/search", &[], "Search emails", "/search <query>", "🔍", Essential, SlashCommand::Search),
            ("/unanswered", &[], "Find unanswered emails", "/unanswered [days] [count]", "⏳", Essential, SlashCommand::Unanswered),
            ("/ask", &[], "Ask the assistant", "/ask <question>", "💬", Essential, SlashCommand::Ask),
            ("/contacts", &[], "View cached contacts", "/contacts", "👥", Manage, SlashCommand::Contacts),
            ("/sync", &[], "Sync contacts from email", "/sync [max] [exclude-domains]", "🔄", Manage, SlashCommand::Sync),
            ("/init", &[], "Initialize CRM database", "/init [max] [top-n] [exclude-domains]", "🗄️", Manage, SlashCommand::Init),
            ("/identity", &[], "Show your email identity", "/identity [--detect]", "🆔", Manage, SlashCommand::Identity),
            ("/link-gmail", &[], "Link a Gmail account", "/link-gmail", "🔗", Manage, SlashCommand::LinkGmail),
            ("/link-outlook", &[], "Link an Outlook account", "/link-outlook", "🔗", Manage, SlashCommand::LinkOutlook),
            ("/help", &["/?"], "Show help", "/help", "❓", Other, SlashCommand::Help),
            ("/quit", &["/exit", "/q"], "Exit", "/quit", "👋", Other, SlashCommand::Quit),
        ];
        for (name, aliases, description, usage, icon, category, command) in defaults {
            self.register(CommandInfo {
                name,
                aliases,
                description,
                usage,
                icon,
                category,
                command,
            });
        }
    }

    /// Resolve a name or alias. Matching ignores case.
    pub fn lookup(&self, input: &str) -> Option<&CommandInfo> {
        let input = input.to_lowercase();
        self.commands
            .iter()
            .find(|c| c.name == input || c.aliases.contains(&input.as_str()))
    }

    /// Names related to an unknown `token` by prefix containment, ranked by
    /// the length of the shared prefix. Ties keep registration order.
    pub fn suggestions(&self, token: &str) -> Vec<&'static str> {
        let token = token.to_lowercase();
        let mut hits: Vec<(&'static str, usize)> = self
            .commands
            .iter()
            .map(|c| c.name)
            .filter(|name| name.starts_with(token.as_str()) || token.starts_with(name))
            .map(|name| (name, shared_prefix_len(name, &token)))
            .collect();
        hits.sort_by(|a, b| b.1.cmp(&a.1));
        hits.into_iter().map(|(name, _)| name).collect()
    }

    /// Entries for the `/` autocomplete source.
    pub fn candidate_entries(&self) -> Vec<StaticEntry> {
        self.commands
            .iter()
            .map(|c| StaticEntry::new(c.name, c.name, c.description, c.icon))
            .collect()
    }

    /// Grouped help text.
    pub fn help_text(&self) -> String {
        let mut output = String::new();
        for category in CommandCategory::all() {
            let cmds: Vec<&CommandInfo> = self
                .commands
                .iter()
                .filter(|c| c.category == *category)
                .collect();
            if cmds.is_empty() {
                continue;
            }
            output.push_str(&format!("{}:\n", category.label()));
            for cmd in cmds {
                let aliases = if cmd.aliases.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", cmd.aliases.join(", "))
                };
                output.push_str(&format!(
                    "  {} {:<38} {}{}\n",
                    cmd.icon, cmd.usage, cmd.description, aliases
                ));
            }
            output.push('\n');
        }
        output.push_str("Type / for commands, @ for contacts, or just ask a question.");
        output
    }

    pub fn all(&self) -> &[CommandInfo] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

fn shared_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}
