//! Prompt templates and system prompts loaded from disk.

use crate::composition::SystemPromptId;
use crate::error::TemplateError;
use std::path::{Path, PathBuf};

/// Placeholder filled by the daily briefing.
pub const EMAILS_SLOT: &str = "{emails}";

/// A prompt with exactly one named slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    text: String,
    slot: &'static str,
}

impl PromptTemplate {
    /// Build a template, rejecting text that lacks `slot`.
    pub fn new(
        name: impl Into<String>,
        text: impl Into<String>,
        slot: &'static str,
    ) -> Result<Self, TemplateError> {
        let name = name.into();
        let text = text.into();
        if !text.contains(slot) {
            return Err(TemplateError::MissingSlot {
                name,
                slot: slot.to_string(),
            });
        }
        Ok(Self { name, text, slot })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Substitute `value` at every occurrence of the slot.
    pub fn fill(&self, value: &str) -> String {
        self.text.replace(self.slot, value)
    }
}

/// Named command prompts stored as `<dir>/<name>.md`.
#[derive(Debug, Clone)]
pub struct CommandTemplates {
    dir: PathBuf,
}

impl CommandTemplates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read the prompt body for `name`, without any `---` frontmatter.
    pub fn load(&self, name: &str) -> Result<String, TemplateError> {
        let path = self.dir.join(format!("{name}.md"));
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            tracing::debug!(path = %path.display(), error = %e, "command template unavailable");
            TemplateError::NotFound {
                name: name.to_string(),
                dir: self.dir.clone(),
            }
        })?;
        Ok(strip_frontmatter(&raw).to_string())
    }

    /// Load `name` as a template with the given slot.
    pub fn template(&self, name: &str, slot: &'static str) -> Result<PromptTemplate, TemplateError> {
        PromptTemplate::new(name, self.load(name)?, slot)
    }
}

fn strip_frontmatter(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("---\n") else {
        return raw;
    };
    match rest.find("\n---") {
        Some(end) => {
            let after = &rest[end + 4..];
            after.strip_prefix('\n').unwrap_or(after).trim_start_matches('\n')
        }
        None => raw,
    }
}

/// System prompts stored under the prompts directory.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    dir: PathBuf,
}

impl PromptLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load the prompt for `id`, falling back to a built-in one-liner.
    pub fn load(&self, id: SystemPromptId) -> String {
        let path = self.dir.join(id.file_name());
        match std::fs::read_to_string(&path) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) | Err(_) => {
                tracing::warn!(path = %path.display(), "system prompt missing, using built-in default");
                builtin_prompt(id).to_string()
            }
        }
    }
}

fn builtin_prompt(id: SystemPromptId) -> &'static str {
    match id {
        SystemPromptId::GmailAgent => {
            "You are an email assistant for a Gmail inbox. Check memory before fetching, be concise."
        }
        SystemPromptId::OutlookAgent => {
            "You are an email assistant for an Outlook inbox. Check memory before fetching, be concise."
        }
        SystemPromptId::CrmInit => {
            "You build a contact database from the user's email and save findings to memory."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_fill_replaces_slot() {
        let t = PromptTemplate::new("today", "Analyze these: {emails}", EMAILS_SLOT).unwrap();
        assert_eq!(t.fill("test email data"), "Analyze these: test email data");
    }

    #[test]
    fn test_missing_slot_is_rejected() {
        let err = PromptTemplate::new("today", "No placeholder here", EMAILS_SLOT).unwrap_err();
        assert!(matches!(err, TemplateError::MissingSlot { .. }));
    }

    #[test]
    fn test_load_missing_command_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = CommandTemplates::new(dir.path());
        let err = store.load("today").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_load_strips_frontmatter() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("today.md"),
            "---\nname: today\ndescription: Daily briefing\n---\n\nBrief me: {emails}\n",
        )
        .unwrap();
        let store = CommandTemplates::new(dir.path());
        assert_eq!(store.load("today").unwrap(), "Brief me: {emails}\n");
    }

    #[test]
    fn test_load_without_frontmatter_is_verbatim() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("plain.md"), "Hello {emails}").unwrap();
        let store = CommandTemplates::new(dir.path());
        assert_eq!(store.load("plain").unwrap(), "Hello {emails}");
    }

    #[test]
    fn test_prompt_library_falls_back() {
        let dir = TempDir::new().unwrap();
        let lib = PromptLibrary::new(dir.path());
        assert!(lib.load(SystemPromptId::OutlookAgent).contains("Outlook"));

        std::fs::write(dir.path().join("gmail_agent.md"), "custom gmail prompt").unwrap();
        assert_eq!(lib.load(SystemPromptId::GmailAgent), "custom gmail prompt");
    }
}
