//! Error types.
//!
//! Only configuration problems are surfaced to callers. Collaborator failures
//! during evaluation are logged where they happen and degrade to "this rule
//! contributes nothing", so `CollaboratorError` never leaves `Engine::evaluate`.

use std::fmt;
use thiserror::Error;

/// A rule file could not be turned into a rule set.
///
/// A failed reload keeps the previously installed rule set active.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{origin}:{line}: {kind}")]
    Rule { origin: String, line: usize, kind: ConfigErrorKind },

    #[error("failed to read rule file {origin}: {source}")]
    Io {
        origin: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn at(origin: &str, line: usize, kind: ConfigErrorKind) -> Self {
        ConfigError::Rule { origin: origin.to_string(), line, kind }
    }

    /// Line number of the offending directive, if the error came from parsing.
    pub fn line(&self) -> Option<usize> {
        match self {
            ConfigError::Rule { line, .. } => Some(*line),
            ConfigError::Io { .. } => None,
        }
    }

    pub fn kind(&self) -> Option<&ConfigErrorKind> {
        match self {
            ConfigError::Rule { kind, .. } => Some(kind),
            ConfigError::Io { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigErrorKind {
    #[error("unknown directive '{token}'")]
    UnknownDirective { token: String },

    #[error("'{directive}' expects an argument")]
    MissingArgument { directive: &'static str },

    #[error("'{directive}' does not take '{token}'")]
    UnexpectedArgument { directive: &'static str, token: String },

    #[error("'{directive}' expects true or false, got '{value}'")]
    InvalidBoolean { directive: &'static str, value: String },

    #[error("'{directive}' is already set for this rule")]
    DuplicateDirective { directive: &'static str },

    #[error("'{directive}' appears before any 'match' line")]
    OutsideRule { directive: String },

    #[error("rule {rule} has an invalid pattern: {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: Box<regex::Error>,
    },

    #[error("rule name '{name}' is already used at {first}")]
    DuplicateName { name: String, first: Location },
}

/// Where a rule was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub origin: String,
    pub line: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.origin, self.line)
    }
}

/// Failure reported by a host collaborator (permission store, sink, ...).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("{0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CollaboratorError {
    pub fn failed(message: impl Into<String>) -> Self {
        CollaboratorError::Failed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_errors_render_origin_and_line() {
        let err = ConfigError::at("rules/command.rs", 12, ConfigErrorKind::UnknownDirective { token: "thne".into() });
        assert_eq!(err.to_string(), "rules/command.rs:12: unknown directive 'thne'");
        assert_eq!(err.line(), Some(12));
    }

    #[test]
    fn duplicate_names_point_at_first_declaration() {
        let kind = ConfigErrorKind::DuplicateName {
            name: "op".into(),
            first: Location { origin: "rules/chat.rs".into(), line: 3 },
        };
        assert_eq!(kind.to_string(), "rule name 'op' is already used at rules/chat.rs:3");
    }
}
