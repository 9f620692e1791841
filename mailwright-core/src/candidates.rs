//! Autocomplete candidate sources.
//!
//! Each source answers `search(query)` with ranked candidates. The REPL
//! binds one source per trigger character: `/` for commands, `@` for
//! contacts.

use crate::contacts::{self, ContactRecord};
use crate::fuzzy::{FuzzyMatcher, NucleoMatcher};
use crate::ranking::{RankedCandidate, rank};
use std::path::{Path, PathBuf};

/// Flat score bonus for contacts marked `priority = high`.
pub const PRIORITY_BOOST: i64 = 50;

/// A source of rankable autocomplete candidates.
pub trait CandidateSource {
    fn search(&mut self, query: &str) -> Vec<RankedCandidate>;
}

/// One fixed entry in a [`StaticProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticEntry {
    pub display: String,
    pub value: String,
    pub description: String,
    pub icon: String,
}

impl StaticEntry {
    pub fn new(
        display: impl Into<String>,
        value: impl Into<String>,
        description: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        Self {
            display: display.into(),
            value: value.into(),
            description: description.into(),
            icon: icon.into(),
        }
    }
}

/// In-memory candidate list; searching does no I/O.
pub struct StaticProvider<M = NucleoMatcher> {
    entries: Vec<StaticEntry>,
    matcher: M,
}

impl StaticProvider<NucleoMatcher> {
    pub fn new(entries: Vec<StaticEntry>) -> Self {
        Self::with_matcher(entries, NucleoMatcher::new())
    }
}

impl<M: FuzzyMatcher> StaticProvider<M> {
    pub fn with_matcher(entries: Vec<StaticEntry>, matcher: M) -> Self {
        Self { entries, matcher }
    }

    pub fn entries(&self) -> &[StaticEntry] {
        &self.entries
    }
}

impl<M: FuzzyMatcher> CandidateSource for StaticProvider<M> {
    fn search(&mut self, query: &str) -> Vec<RankedCandidate> {
        rank(
            &mut self.matcher,
            query,
            &self.entries,
            |e| e.display.clone(),
            |e, hit| RankedCandidate {
                display: e.display.clone(),
                value: e.value.clone(),
                score: hit.score,
                positions: hit.positions,
                description: e.description.clone(),
                subtitle: String::new(),
                icon: e.icon.clone(),
            },
        )
    }
}

/// Contacts read from the contacts file, cached after the first load.
///
/// The cache does not watch the file; call [`ContactProvider::reload`]
/// after anything in-process rewrites it.
pub struct ContactProvider<M = NucleoMatcher> {
    path: PathBuf,
    cache: Option<Vec<ContactRecord>>,
    matcher: M,
}

impl ContactProvider<NucleoMatcher> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_matcher(path, NucleoMatcher::new())
    }
}

impl<M: FuzzyMatcher> ContactProvider<M> {
    pub fn with_matcher(path: impl Into<PathBuf>, matcher: M) -> Self {
        Self {
            path: path.into(),
            cache: None,
            matcher,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.is_some()
    }

    /// Drop the cache and read the file again.
    pub fn reload(&mut self) -> &[ContactRecord] {
        self.cache = None;
        self.contacts()
    }

    /// Cached contacts, loading them on first access.
    pub fn contacts(&mut self) -> &[ContactRecord] {
        if self.cache.is_none() {
            let loaded = match contacts::load_contacts(&self.path) {
                Ok(list) => list,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "could not read contacts file");
                    Vec::new()
                }
            };
            tracing::debug!(count = loaded.len(), "contacts loaded");
            self.cache = Some(loaded);
        }
        self.cache.as_deref().unwrap_or_default()
    }
}

fn contact_candidate(contact: &ContactRecord, score: i64, positions: Vec<usize>) -> RankedCandidate {
    let bonus = if contact.is_priority() { PRIORITY_BOOST } else { 0 };
    RankedCandidate {
        display: contact.label().to_string(),
        value: contact.email.clone(),
        score: score + bonus,
        positions,
        // Keep the address visible when the label is the name.
        description: if contact.name.is_empty() {
            String::new()
        } else {
            contact.email.clone()
        },
        subtitle: contact.subtitle(),
        icon: contact.kind().icon().to_string(),
    }
}

impl<M: FuzzyMatcher> CandidateSource for ContactProvider<M> {
    fn search(&mut self, query: &str) -> Vec<RankedCandidate> {
        self.contacts();
        let contacts = self.cache.as_deref().unwrap_or_default();
        rank(
            &mut self.matcher,
            query,
            contacts,
            ContactRecord::search_text,
            |c, hit| contact_candidate(c, hit.score, hit.positions),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::test_support::ScriptedMatcher;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("contacts.csv");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_priority_contact_ranks_first_with_fifty_point_gap() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "email,name,priority\nalex@x.io,Alex,\nalice@x.io,Alice,high\n",
        );
        let matcher = ScriptedMatcher::new(&[("Alex alex@x.io", 100), ("Alice alice@x.io", 100)]);
        let mut provider = ContactProvider::with_matcher(path, matcher);

        let results = provider.search("al");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].value, "alice@x.io");
        assert_eq!(results[1].value, "alex@x.io");
        assert_eq!(results[0].score - results[1].score, PRIORITY_BOOST);
    }

    #[test]
    fn test_display_fields() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "email,name,company,relationship,type\nd@x.io,Dana,Acme,client,SERVICE\nnoname@x.io,,,,\n",
        );
        let matcher = ScriptedMatcher::new(&[("Dana d@x.io", 1), ("noname@x.io", 1)]);
        let mut provider = ContactProvider::with_matcher(path, matcher);
        let results = provider.search("x");

        assert_eq!(results[0].display, "Dana");
        assert_eq!(results[0].description, "d@x.io");
        assert_eq!(results[0].subtitle, "Acme · client");
        assert_eq!(results[0].icon, "🔧");

        assert_eq!(results[1].display, "noname@x.io");
        assert_eq!(results[1].description, "");
        assert_eq!(results[1].icon, "📧");
    }

    #[test]
    fn test_missing_file_yields_no_results() {
        let dir = TempDir::new().unwrap();
        let mut provider = ContactProvider::new(dir.path().join("absent.csv"));
        assert!(provider.search("a").is_empty());
        assert!(provider.is_loaded());
    }

    #[test]
    fn test_cache_ignores_file_changes_until_reload() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "email\none@x.io\n");
        let mut provider = ContactProvider::new(path.clone());
        assert_eq!(provider.contacts().len(), 1);

        std::fs::write(&path, "email\none@x.io\ntwo@x.io\n").unwrap();
        assert_eq!(provider.contacts().len(), 1);

        assert_eq!(provider.reload().len(), 2);
    }

    #[test]
    fn test_static_provider_ranks_commands() {
        let mut provider = StaticProvider::new(vec![
            StaticEntry::new("/inbox", "/inbox", "Show recent emails", "📥"),
            StaticEntry::new("/identity", "/identity", "Show your email identity", "🆔"),
            StaticEntry::new("/search", "/search", "Search emails", "🔍"),
        ]);
        let results = provider.search("inb");
        assert_eq!(results[0].value, "/inbox");
        assert!(results.iter().all(|c| c.value != "/search"));
    }

    #[test]
    fn test_static_provider_empty_query_keeps_registry_order() {
        let entries = vec![
            StaticEntry::new("/today", "/today", "", ""),
            StaticEntry::new("/inbox", "/inbox", "", ""),
            StaticEntry::new("/help", "/help", "", ""),
        ];
        let mut provider = StaticProvider::new(entries);
        let values: Vec<String> = provider.search("").into_iter().map(|c| c.value).collect();
        assert_eq!(values, vec!["/today", "/inbox", "/help"]);
    }
}
