use super::grammar::parse_rules;
use crate::engine::EventKinds;
use crate::error::ConfigError;
use crate::Rule;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A rule file and the event kinds its rules apply to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSource {
    pub path: PathBuf,
    pub kinds: EventKinds,
}

impl RuleSource {
    pub fn new(path: impl Into<PathBuf>, kinds: EventKinds) -> Self {
        RuleSource { path: path.into(), kinds }
    }

    /// Infer the event kinds from the file stem: `command` → commands,
    /// `packet` → packets, `chat` → chat, anything else → every kind.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kinds = kinds_for_stem(&path);
        RuleSource { path, kinds }
    }

    /// How the file is named in errors and rule locations.
    pub fn origin(&self) -> String {
        self.path.display().to_string()
    }
}

fn kinds_for_stem(path: &Path) -> EventKinds {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    match stem.to_ascii_lowercase().as_str() {
        "command" | "commands" => EventKinds::COMMAND,
        "packet" | "packets" => EventKinds::PACKET,
        "chat" => EventKinds::CHAT,
        _ => EventKinds::all(),
    }
}

/// Read and parse one rule file.
pub fn load_rule_file(source: &RuleSource) -> Result<Vec<Rule>, ConfigError> {
    let origin = source.origin();
    let text = fs::read_to_string(&source.path).map_err(|e| ConfigError::Io { origin: origin.clone(), source: e })?;

    let rules = parse_rules(&origin, &text, source.kinds)?;
    debug!(file = %origin, rules = rules.len(), kinds = ?source.kinds, "parsed rule file");
    Ok(rules)
}
