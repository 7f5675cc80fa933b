//! Rule patterns and their capture groups.
//!
//! A pattern is compiled exactly once, when its rule block is parsed. Matching
//! uses `Regex::captures` as written by the operator: no implicit anchoring,
//! no case folding.

use regex::Regex;

/// A rule's compiled `match` expression.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
}

impl CompiledPattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Ok(CompiledPattern { regex: Regex::new(source)? })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Leftmost match in `text`, or `None`.
    pub fn captures(&self, text: &str) -> Option<Captures> {
        let caps = self.regex.captures(text)?;

        // Groups that did not take part in the match render as "".
        let groups = (0..caps.len()).map(|i| caps.get(i).map(|m| m.as_str().to_string()).unwrap_or_default()).collect();

        let named = self
            .regex
            .capture_names()
            .flatten()
            .map(|name| (name.to_string(), caps.name(name).map(|m| m.as_str().to_string()).unwrap_or_default()))
            .collect();

        Some(Captures { groups, named })
    }
}

/// Capture groups of the most recent successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    groups: Vec<String>,
    named: Vec<(String, String)>,
}

impl Captures {
    /// Group `index`; `0` is the whole match.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).map(String::as_str)
    }

    pub fn name(&self, name: &str) -> Option<&str> {
        self.named.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// Number of groups including group 0.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
