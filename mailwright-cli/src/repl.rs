//! The interactive session loop.

use crate::dispatch::{Reply, dispatch};
use crate::render::{Renderer, Tone};
use crate::repl_input::{Interrupts, LineReader, ReadOutcome, Triggers};
use crate::slash::{CommandRegistry, SlashCommand};
use mailwright_core::{AppContext, ClassifiedError, ContactProvider, Session, SessionEvent, StaticProvider};
use std::path::Path;
use tracing::{debug, info};

const GOODBYE: &str = "Goodbye!";

/// Run the REPL until the user quits or input ends.
pub async fn run_interactive(ctx: &AppContext, workspace: &Path) -> anyhow::Result<()> {
    let registry = CommandRegistry::with_defaults();
    let renderer = Renderer::detect();
    let mut triggers = Triggers {
        commands: StaticProvider::new(registry.candidate_entries()),
        contacts: ContactProvider::new(ctx.paths.contacts_file.clone()),
    };
    let mut interrupts = Interrupts::install()?;
    let mut reader = LineReader::new(workspace);
    let mut session = Session::new();

    println!("{}", renderer.welcome(&ctx.composition));
    info!(provider = ?ctx.composition.active, "interactive session started");

    while !session.is_exiting() {
        session.apply(SessionEvent::Prompt);
        let line = match reader.read_line(&mut triggers, &mut interrupts).await? {
            ReadOutcome::Line(line) => line,
            ReadOutcome::Interrupted { had_text } => {
                session.apply(SessionEvent::Interrupt {
                    pending_input: had_text,
                });
                continue;
            }
            ReadOutcome::Eof => {
                session.apply(SessionEvent::EndOfInput);
                continue;
            }
        };
        session.apply(SessionEvent::Submitted);

        interrupts.clear();
        let outcome = tokio::select! {
            result = dispatch(ctx, &registry, &line) => Some(result),
            _ = interrupts.recv() => None,
        };
        let Some(result) = outcome else {
            debug!("command cancelled");
            println!("{}", renderer.dim("Cancelled."));
            session.apply(SessionEvent::Interrupt {
                pending_input: true,
            });
            continue;
        };

        match result {
            Ok(Reply::Quit) => {
                session.apply(SessionEvent::Quit);
                continue;
            }
            Ok(reply) => {
                session.apply(SessionEvent::Finished);
                render_reply(&renderer, &reply, &mut triggers);
            }
            Err(e) => {
                session.apply(SessionEvent::Finished);
                let classified = ClassifiedError::from_error(&e);
                debug!(category = ?classified.category, error = %e, "command failed");
                println!("{}", renderer.error_panel(&classified));
            }
        }
        session.apply(SessionEvent::Rendered);
    }

    println!("{}", renderer.dim(GOODBYE));
    Ok(())
}

fn render_reply(renderer: &Renderer, reply: &Reply, triggers: &mut Triggers) {
    match reply {
        Reply::Nothing | Reply::Quit => {}
        Reply::Output {
            title,
            body,
            command,
        } => {
            println!("{}", renderer.panel(title, body, Tone::Info));
            if *command == Some(SlashCommand::Sync) {
                let count = triggers.contacts.reload().len();
                debug!(count, "reloaded contacts after sync");
            }
        }
        Reply::Help(text) => println!("{}", renderer.panel("Help", text, Tone::Info)),
        Reply::Notice(text) => println!("{}", renderer.panel("Notice", text, Tone::Warning)),
    }
}
