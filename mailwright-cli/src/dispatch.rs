//! Routes one line of REPL input to a slash command handler or the agent.
//!
//! Only input starting with `/` is a command. An exact (case-folded) token
//! match runs the bound handler with the rest of the line as its argument
//! string; an unknown `/token` yields suggestions; everything else goes to
//! the agent verbatim.

use crate::slash::{CommandInfo, CommandRegistry, SlashCommand};
use mailwright_core::error::MailwrightError;
use mailwright_core::{AppContext, ProviderKind, ops};
use std::str::FromStr;
use tracing::debug;

pub const COMMAND_TRIGGER: char = '/';

/// Where a line of input goes.
#[derive(Debug, PartialEq, Eq)]
pub enum Route<'r> {
    Empty,
    Quit,
    Command { info: &'r CommandInfo, args: String },
    Unknown { token: String, suggestions: Vec<&'static str> },
    Agent,
}

/// What the REPL should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Nothing,
    Output {
        title: String,
        body: String,
        /// `None` when the agent answered free text.
        command: Option<SlashCommand>,
    },
    Help(String),
    /// Bad arguments or an unknown command, with guidance.
    Notice(String),
    Quit,
}

pub fn route<'r>(registry: &'r CommandRegistry, input: &str) -> Route<'r> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Route::Empty;
    }
    let (token, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim()),
        None => (trimmed, ""),
    };
    let token = token.to_lowercase();

    if matches!(token.as_str(), "quit" | "exit") && rest.is_empty() {
        return Route::Quit;
    }
    if !token.starts_with(COMMAND_TRIGGER) {
        return Route::Agent;
    }
    match registry.lookup(&token) {
        Some(info) => Route::Command {
            info,
            args: rest.to_string(),
        },
        None => Route::Unknown {
            suggestions: registry.suggestions(&token),
            token,
        },
    }
}

fn unknown_message(token: &str, suggestions: &[&str]) -> String {
    if suggestions.is_empty() {
        format!("Unknown command: {token}. Type /help for commands.")
    } else {
        format!(
            "Unknown command: {token}. Did you mean: {}?",
            suggestions.join(", ")
        )
    }
}

/// Parse an optional numeric argument, falling back to `default`.
fn number<T: FromStr>(raw: Option<&str>, default: T, what: &str, usage: &str) -> Result<T, String> {
    match raw {
        None => Ok(default),
        Some(text) => text
            .parse()
            .map_err(|_| format!("Invalid {what} '{text}'. Usage: {usage}")),
    }
}

pub async fn dispatch(
    ctx: &AppContext,
    registry: &CommandRegistry,
    input: &str,
) -> Result<Reply, MailwrightError> {
    match route(registry, input) {
        Route::Empty => Ok(Reply::Nothing),
        Route::Quit => Ok(Reply::Quit),
        Route::Unknown { token, suggestions } => {
            debug!(token = %token, "unknown command");
            Ok(Reply::Notice(unknown_message(&token, &suggestions)))
        }
        Route::Agent => {
            debug!("forwarding input to agent");
            Ok(Reply::Output {
                title: "💬 Assistant".to_string(),
                body: ops::ask(ctx, input).await?,
                command: None,
            })
        }
        Route::Command { info, args } => {
            debug!(command = info.name, args = %args, "running slash command");
            run_command(ctx, registry, info, &args).await
        }
    }
}

async fn run_command(
    ctx: &AppContext,
    registry: &CommandRegistry,
    info: &CommandInfo,
    args: &str,
) -> Result<Reply, MailwrightError> {
    let mut words = args.split_whitespace();
    let usage = info.usage;
    let exclude_default = ctx.config.defaults.exclude_domains.clone();

    let body = match info.command {
        SlashCommand::Help => return Ok(Reply::Help(registry.help_text())),
        SlashCommand::Quit => return Ok(Reply::Quit),
        SlashCommand::Today => ops::today(ctx).await?,
        SlashCommand::Inbox => {
            let count = match number(words.next(), ops::DEFAULT_COUNT, "count", usage) {
                Ok(n) => n,
                Err(msg) => return Ok(Reply::Notice(msg)),
            };
            ops::inbox(ctx, count, false).await?
        }
        SlashCommand::Search => {
            if args.is_empty() {
                return Ok(Reply::Notice(format!("Usage: {usage}")));
            }
            ops::search(ctx, args, ops::DEFAULT_COUNT).await?
        }
        SlashCommand::Contacts => ops::contacts(ctx).await?,
        SlashCommand::Sync => {
            let max = match number(words.next(), ops::DEFAULT_MAX_EMAILS, "max", usage) {
                Ok(n) => n,
                Err(msg) => return Ok(Reply::Notice(msg)),
            };
            let exclude = words.next().map_or(exclude_default, str::to_string);
            ops::sync(ctx, max, &exclude).await?
        }
        SlashCommand::Init => {
            let parsed = number(words.next(), ops::DEFAULT_MAX_EMAILS, "max", usage)
                .and_then(|max| number(words.next(), ops::DEFAULT_TOP_N, "top-n", usage).map(|n| (max, n)));
            let (max, top_n) = match parsed {
                Ok(v) => v,
                Err(msg) => return Ok(Reply::Notice(msg)),
            };
            let exclude = words.next().map_or(exclude_default, str::to_string);
            ops::init_crm(ctx, max, top_n, &exclude).await?
        }
        SlashCommand::Unanswered => {
            let parsed = number(words.next(), ops::DEFAULT_DAYS, "days", usage).and_then(|days| {
                number(words.next(), ops::DEFAULT_UNANSWERED_COUNT, "count", usage).map(|n| (days, n))
            });
            let (days, count) = match parsed {
                Ok(v) => v,
                Err(msg) => return Ok(Reply::Notice(msg)),
            };
            ops::unanswered(ctx, days, count).await?
        }
        SlashCommand::Identity => match args {
            "" => ops::identity(ctx, false).await?,
            "--detect" => ops::identity(ctx, true).await?,
            _ => return Ok(Reply::Notice(format!("Usage: {usage}"))),
        },
        SlashCommand::Ask => {
            if args.is_empty() {
                return Ok(Reply::Notice(format!("Usage: {usage}")));
            }
            ops::ask(ctx, args).await?
        }
        SlashCommand::LinkGmail => ops::link(ctx, ProviderKind::Gmail)?,
        SlashCommand::LinkOutlook => ops::link(ctx, ProviderKind::Outlook)?,
    };

    Ok(Reply::Output {
        title: format!("{} {}", info.icon, info.description),
        body,
        command: Some(info.command),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailwright_core::capabilities::{CapabilityFuture, MailCapabilities};
    use mailwright_core::composition::{ProviderFlags, select_active_provider};
    use mailwright_core::config::AppConfig;
    use mailwright_core::RecordingAgent;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn gmail_context(ws: &TempDir, log: &Arc<Mutex<Vec<String>>>, agent: Arc<RecordingAgent>) -> AppContext {
        let mut caps = MailCapabilities::empty(ProviderKind::Gmail);
        let l = log.clone();
        caps.read_inbox = Some(Arc::new(move |last: usize, unread: bool| -> CapabilityFuture {
            l.lock().unwrap().push(format!("read_inbox({last}, {unread})"));
            Box::pin(async { Ok("inbox".to_string()) })
        }));
        let l = log.clone();
        caps.get_unanswered_emails = Some(Arc::new(move |days: u32, max: usize| -> CapabilityFuture {
            l.lock().unwrap().push(format!("unanswered({days}, {max})"));
            Box::pin(async { Ok("none".to_string()) })
        }));
        AppContext::new(
            AppConfig::default(),
            ws.path(),
            select_active_provider(ProviderFlags {
                gmail: true,
                outlook: false,
            }),
            Some(caps),
            agent.clone(),
            agent,
        )
    }

    #[test]
    fn test_route_command_with_args() {
        let registry = CommandRegistry::with_defaults();
        match route(&registry, "  /INBOX 25 ") {
            Route::Command { info, args } => {
                assert_eq!(info.command, SlashCommand::Inbox);
                assert_eq!(args, "25");
            }
            other => panic!("unexpected route: {other:?}"),
        }
    }

    #[test]
    fn test_route_unknown_with_suggestions() {
        let registry = CommandRegistry::with_defaults();
        assert_eq!(
            route(&registry, "/inboxxyz"),
            Route::Unknown {
                token: "/inboxxyz".into(),
                suggestions: vec!["/inbox"],
            }
        );
    }

    #[test]
    fn test_route_unknown_without_suggestions() {
        let registry = CommandRegistry::with_defaults();
        let Route::Unknown { token, suggestions } = route(&registry, "/zzz") else {
            panic!("expected unknown");
        };
        assert!(suggestions.is_empty());
        assert_eq!(
            unknown_message(&token, &suggestions),
            "Unknown command: /zzz. Type /help for commands."
        );
    }

    #[test]
    fn test_route_free_text_goes_to_agent() {
        let registry = CommandRegistry::with_defaults();
        assert_eq!(route(&registry, "What's on my calendar"), Route::Agent);
        assert_eq!(route(&registry, "inbox 25"), Route::Agent);
        assert_eq!(route(&registry, "@ada@example.com any news?"), Route::Agent);
    }

    #[test]
    fn test_route_empty_and_quit_words() {
        let registry = CommandRegistry::with_defaults();
        assert_eq!(route(&registry, "   "), Route::Empty);
        assert_eq!(route(&registry, "quit"), Route::Quit);
        assert_eq!(route(&registry, "EXIT"), Route::Quit);
        assert_eq!(route(&registry, "exit the building"), Route::Agent);
    }

    #[test]
    fn test_number_parsing() {
        assert_eq!(number(None, 10usize, "count", "/inbox [count]"), Ok(10));
        assert_eq!(number(Some("25"), 10usize, "count", "/inbox [count]"), Ok(25));
        assert_eq!(
            number(Some("ten"), 10usize, "count", "/inbox [count]"),
            Err("Invalid count 'ten'. Usage: /inbox [count]".to_string())
        );
    }

    #[tokio::test]
    async fn test_inbox_count_reaches_capability() {
        let ws = TempDir::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let agent = Arc::new(RecordingAgent::new("ok"));
        let ctx = gmail_context(&ws, &log, agent.clone());
        let registry = CommandRegistry::with_defaults();

        let reply = dispatch(&ctx, &registry, "/inbox 25").await.unwrap();

        assert_eq!(
            reply,
            Reply::Output {
                title: "📥 Show recent emails".into(),
                body: "inbox".into(),
                command: Some(SlashCommand::Inbox),
            }
        );
        assert_eq!(*log.lock().unwrap(), vec!["read_inbox(25, false)"]);
        assert_eq!(agent.call_count(), 0);
    }

    #[tokio::test]
    async fn test_defaults_apply_without_args() {
        let ws = TempDir::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let ctx = gmail_context(&ws, &log, Arc::new(RecordingAgent::new("ok")));
        let registry = CommandRegistry::with_defaults();

        dispatch(&ctx, &registry, "/inbox").await.unwrap();
        dispatch(&ctx, &registry, "/unanswered").await.unwrap();
        dispatch(&ctx, &registry, "/unanswered 30 5").await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["read_inbox(10, false)", "unanswered(120, 20)", "unanswered(30, 5)"]
        );
    }

    #[tokio::test]
    async fn test_bad_argument_is_a_notice() {
        let ws = TempDir::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let ctx = gmail_context(&ws, &log, Arc::new(RecordingAgent::new("ok")));
        let registry = CommandRegistry::with_defaults();

        let reply = dispatch(&ctx, &registry, "/inbox lots").await.unwrap();
        assert!(matches!(reply, Reply::Notice(ref m) if m.contains("Invalid count")));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_free_text_reaches_agent_only() {
        let ws = TempDir::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let agent = Arc::new(RecordingAgent::new("Two meetings"));
        let ctx = gmail_context(&ws, &log, agent.clone());
        let registry = CommandRegistry::with_defaults();

        let reply = dispatch(&ctx, &registry, "What's on my calendar").await.unwrap();

        assert!(matches!(reply, Reply::Output { command: None, ref body, .. } if body == "Two meetings"));
        assert_eq!(agent.prompts(), vec!["What's on my calendar"]);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_today_without_template_skips_agent() {
        let ws = TempDir::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let agent = Arc::new(RecordingAgent::new("briefing"));
        let ctx = gmail_context(&ws, &log, agent.clone());
        let registry = CommandRegistry::with_defaults();

        let reply = dispatch(&ctx, &registry, "/today").await.unwrap();

        assert!(matches!(reply, Reply::Output { ref body, .. } if body.contains("not found")));
        assert_eq!(agent.call_count(), 0);
    }

    #[tokio::test]
    async fn test_help_and_quit() {
        let ws = TempDir::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let ctx = gmail_context(&ws, &log, Arc::new(RecordingAgent::new("ok")));
        let registry = CommandRegistry::with_defaults();

        assert!(matches!(dispatch(&ctx, &registry, "/help").await.unwrap(), Reply::Help(_)));
        assert_eq!(dispatch(&ctx, &registry, "/q").await.unwrap(), Reply::Quit);
    }
}
