//! Maps failure messages to a small set of categories with remediation text.
//!
//! Failures come from opaque collaborators (HTTP backends, the LLM
//! endpoint), so classification is a substring heuristic over the rendered
//! message. Rules are checked in order; the first hit wins.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Authentication,
    Network,
    Generic,
}

const RULES: &[(&str, ErrorCategory)] = &[
    ("credential", ErrorCategory::Authentication),
    ("auth", ErrorCategory::Authentication),
    ("token", ErrorCategory::Authentication),
    ("network", ErrorCategory::Network),
    ("connection", ErrorCategory::Network),
    ("timeout", ErrorCategory::Network),
];

impl ErrorCategory {
    pub fn title(self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "Authentication Error",
            ErrorCategory::Network => "Network Error",
            ErrorCategory::Generic => "Error",
        }
    }

    pub fn remediation(self) -> &'static str {
        match self {
            ErrorCategory::Authentication => {
                "Refresh your access token (GOOGLE_ACCESS_TOKEN or MICROSOFT_ACCESS_TOKEN) \
                 or LLM API key in .env, then restart."
            }
            ErrorCategory::Network => "Check your internet connection and try again.",
            ErrorCategory::Generic => "Try /help for available commands.",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Case-insensitive classification of a failure message.
pub fn classify(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();
    RULES
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|&(_, category)| category)
        .unwrap_or(ErrorCategory::Generic)
}

/// A classified failure ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    pub message: String,
}

impl ClassifiedError {
    pub fn from_error(err: &dyn std::error::Error) -> Self {
        let message = err.to_string();
        Self {
            category: classify(&message),
            message,
        }
    }

    pub fn remediation(&self) -> &'static str {
        self.category.remediation()
    }
}
