//! First-run checks before the interactive session.
//!
//! 1. The LLM API key must be present in the environment
//! 2. With a linked provider but no usable contacts file, offer to run
//!    CRM initialization

use crate::render::{Renderer, Tone};
use dialoguer::Confirm;
use mailwright_core::{AppContext, ClassifiedError, Composition, ops};
use std::io::IsTerminal;
use std::path::Path;
use tracing::{info, warn};

/// Contacts files smaller than this hold no more than a header.
const MIN_CONTACTS_BYTES: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStatus {
    Ready,
    MissingApiKey,
}

/// Whether `api_key_env` resolves to a non-blank value.
pub fn has_api_key(api_key_env: &str, lookup: impl Fn(&str) -> Option<String>) -> bool {
    lookup(api_key_env).is_some_and(|v| !v.trim().is_empty())
}

pub fn setup_instructions(api_key_env: &str, env_file: &Path) -> String {
    format!(
        "No LLM API key found.\n\n\
         Add this line to {}:\n\n\
         ```\n{api_key_env}=<your key>\n```\n\n\
         Then run mailwright again.",
        env_file.display()
    )
}

/// True when a provider is linked and the contacts file is missing or
/// holds no rows worth using.
pub fn needs_crm_init(composition: &Composition, contacts_file: &Path) -> bool {
    if composition.active.is_none() {
        return false;
    }
    match std::fs::metadata(contacts_file) {
        Ok(meta) => meta.len() < MIN_CONTACTS_BYTES,
        Err(_) => true,
    }
}

/// Run the startup checks. Returns `MissingApiKey` after printing
/// instructions; the caller should stop.
pub async fn check_setup(ctx: &AppContext, renderer: &Renderer) -> anyhow::Result<SetupStatus> {
    let key_env = &ctx.config.llm.api_key_env;
    if !has_api_key(key_env, |k| std::env::var(k).ok()) {
        warn!(env = %key_env, "LLM API key not set");
        println!(
            "{}",
            renderer.panel(
                "Setup required",
                &setup_instructions(key_env, &ctx.paths.env_file),
                Tone::Warning
            )
        );
        return Ok(SetupStatus::MissingApiKey);
    }

    if !needs_crm_init(&ctx.composition, &ctx.paths.contacts_file) || !std::io::stdin().is_terminal() {
        return Ok(SetupStatus::Ready);
    }

    let confirmed = Confirm::new()
        .with_prompt("No contacts yet. Build your contact list from recent email now?")
        .default(true)
        .interact()?;
    if !confirmed {
        println!("{}", renderer.dim("Skipped. Run /init any time."));
        return Ok(SetupStatus::Ready);
    }

    info!("running CRM initialization from setup");
    let exclude = &ctx.config.defaults.exclude_domains;
    match ops::init_crm(ctx, ops::DEFAULT_MAX_EMAILS, ops::DEFAULT_TOP_N, exclude).await {
        Ok(summary) => println!("{}", renderer.panel("CRM initialized", &summary, Tone::Success)),
        Err(e) => println!("{}", renderer.error_panel(&ClassifiedError::from_error(&e))),
    }
    Ok(SetupStatus::Ready)
}
