//! Rule files: grammar and loading.
//!
//! A rule file is line oriented. A `match <regex>` line opens a rule block and
//! every following directive (`name`, `require`, `ignore`, `strip`, `then`,
//! `disabled`) belongs to the most recent block. Blank lines and lines
//! starting with `#` are ignored.
//!
//! ```text
//! match ^/op\b
//! ignore perm chatcontrol.bypass.rules
//! name /op
//! then warn &cThis command is not allowed.
//! then deny
//! ```
//!
//! - `grammar.rs`: turns rule text into `Rule`s, with line-numbered errors.
//! - `loader.rs`: reads rule files and infers the event kinds they apply to.

#[path = "rules/grammar.rs"]
mod grammar;
#[path = "rules/loader.rs"]
mod loader;

pub use grammar::parse_rules;
pub use loader::{RuleSource, load_rule_file};

#[cfg(test)]
#[path = "rules/tests.rs"]
mod tests;
