//! # Mailwright Core
//!
//! Command routing and provider composition for the mailwright terminal
//! email assistant: provider selection, capability feature detection,
//! ranked autocomplete candidates, command operations, error
//! classification, and the session state machine.

pub mod agent;
pub mod backends;
pub mod candidates;
pub mod capabilities;
pub mod classify;
pub mod composition;
pub mod config;
pub mod contacts;
pub mod context;
pub mod env_store;
pub mod error;
pub mod fuzzy;
pub mod ops;
pub mod ranking;
pub mod session;
pub mod template;

pub use agent::{Agent, AgentSpec, HttpAgent, RecordingAgent, UnconfiguredAgent, build_agent};
pub use candidates::{CandidateSource, ContactProvider, StaticEntry, StaticProvider};
pub use capabilities::{CapabilityFuture, MailCapabilities, ProviderKind};
pub use classify::{ClassifiedError, ErrorCategory, classify};
pub use composition::{Composition, ProviderFlags, SystemPromptId, select_active_provider};
pub use config::{AppConfig, load_config, load_env_file};
pub use contacts::ContactRecord;
pub use context::AppContext;
pub use env_store::EnvFile;
pub use error::{AgentError, BackendError, ConfigError, MailwrightError, Result, TemplateError};
pub use fuzzy::{FuzzyMatch, FuzzyMatcher, NucleoMatcher};
pub use ranking::{RankedCandidate, rank};
pub use session::{Session, SessionEvent, SessionState};
