//! mailwright: a terminal email assistant.
//!
//! Runs one programmatic command when a subcommand is given, otherwise the
//! interactive REPL.

mod commands;
mod dispatch;
mod render;
mod repl;
mod repl_input;
mod setup;
mod slash;

use clap::Parser;
use mailwright_core::{AppContext, ProviderFlags, load_config, load_env_file};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// mailwright: your email, from the terminal
#[derive(Parser, Debug)]
#[command(name = "mailwright", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (holds .env, prompts/, commands/, data/)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Run one command and exit (starts interactive mode if omitted)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Commands {
    /// Show recent inbox messages
    Inbox {
        #[arg(short, long, default_value_t = mailwright_core::ops::DEFAULT_COUNT)]
        count: usize,
        /// Only unread messages
        #[arg(long)]
        unread: bool,
    },
    /// Search messages with a provider query
    Search {
        query: String,
        #[arg(short, long, default_value_t = mailwright_core::ops::DEFAULT_COUNT)]
        count: usize,
    },
    /// Show cached contacts
    Contacts,
    /// Sync contacts from recent email senders
    Sync {
        #[arg(long, default_value_t = mailwright_core::ops::DEFAULT_MAX_EMAILS)]
        max: usize,
        /// Comma-separated domains to skip
        #[arg(long)]
        exclude: Option<String>,
    },
    /// Build the contact database with the init agent
    Init {
        #[arg(long, default_value_t = mailwright_core::ops::DEFAULT_MAX_EMAILS)]
        max: usize,
        #[arg(long, default_value_t = mailwright_core::ops::DEFAULT_TOP_N)]
        top_n: usize,
        /// Comma-separated domains to skip
        #[arg(long)]
        exclude: Option<String>,
    },
    /// Find inbox threads without a reply
    Unanswered {
        #[arg(long, default_value_t = mailwright_core::ops::DEFAULT_DAYS)]
        days: u32,
        #[arg(short, long, default_value_t = mailwright_core::ops::DEFAULT_UNANSWERED_COUNT)]
        count: usize,
    },
    /// Show your email identity
    Identity {
        /// Scan sent mail for every address you use
        #[arg(long)]
        detect: bool,
    },
    /// Daily email briefing
    Today,
    /// Ask the assistant a question
    Ask { question: String },
    /// Link a Gmail account
    LinkGmail,
    /// Link an Outlook account
    LinkOutlook,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "mailwright", "mailwright")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "mailwright.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    // The env file location is itself configurable, so load config twice:
    // once to find the file, once more so its MAILWRIGHT_ keys apply.
    let config = load_config(Some(&workspace))?;
    let env_path = config.paths.resolve(&workspace).env_file;
    if load_env_file(&env_path)? {
        tracing::debug!(path = %env_path.display(), "loaded env file");
    }
    let config = load_config(Some(&workspace))?;

    let ctx = AppContext::from_config(config, &workspace, ProviderFlags::from_env());
    let renderer = render::Renderer::detect();

    if let Some(command) = cli.command {
        if let Some(warning) = &ctx.composition.warning {
            eprintln!("{}", renderer.panel("Warning", warning, render::Tone::Warning));
        }
        return commands::handle_command(command, &ctx).await;
    }

    if setup::check_setup(&ctx, &renderer).await? == setup::SetupStatus::MissingApiKey {
        return Ok(());
    }
    repl::run_interactive(&ctx, &workspace).await
}
