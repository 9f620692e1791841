//! Programmatic (non-interactive) command handlers.
//!
//! Each subcommand calls the same operation as its slash alias and prints
//! the resulting text to stdout.

use crate::Commands;
use mailwright_core::{AppContext, ClassifiedError, ProviderKind, ops};

/// Run one subcommand. Failures are classified and returned with their
/// remediation hint.
pub async fn handle_command(command: Commands, ctx: &AppContext) -> anyhow::Result<()> {
    match run(command, ctx).await {
        Ok(text) => {
            println!("{text}");
            Ok(())
        }
        Err(e) => {
            let classified = ClassifiedError::from_error(&e);
            anyhow::bail!(
                "{}: {}\n{}",
                classified.category.title(),
                classified.message,
                classified.remediation()
            )
        }
    }
}

async fn run(command: Commands, ctx: &AppContext) -> ops::OpResult {
    let default_exclude = || ctx.config.defaults.exclude_domains.clone();
    match command {
        Commands::Inbox { count, unread } => ops::inbox(ctx, count, unread).await,
        Commands::Search { query, count } => ops::search(ctx, &query, count).await,
        Commands::Contacts => ops::contacts(ctx).await,
        Commands::Sync { max, exclude } => {
            ops::sync(ctx, max, &exclude.unwrap_or_else(default_exclude)).await
        }
        Commands::Init {
            max,
            top_n,
            exclude,
        } => ops::init_crm(ctx, max, top_n, &exclude.unwrap_or_else(default_exclude)).await,
        Commands::Unanswered { days, count } => ops::unanswered(ctx, days, count).await,
        Commands::Identity { detect } => ops::identity(ctx, detect).await,
        Commands::Today => ops::today(ctx).await,
        Commands::Ask { question } => ops::ask(ctx, &question).await,
        Commands::LinkGmail => ops::link(ctx, ProviderKind::Gmail),
        Commands::LinkOutlook => ops::link(ctx, ProviderKind::Outlook),
    }
}
