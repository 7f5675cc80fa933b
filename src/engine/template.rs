//! Placeholder resolution for action templates and script expressions.
//!
//! Supported placeholders:
//!
//! ```text
//! {player}            sender display name
//! {sender_id}         sender id
//! {original_message}  text as received (alias: {command})
//! {message}           effective text at this point (after earlier rewrites)
//! {rule_name}         rule name, or #<ordinal> (alias: {ruleID})
//! {date}              event timestamp, %Y-%m-%d %H:%M:%S
//! {0} {1} ...         capture groups of the rule's match
//! {<name>}            named capture groups
//! $0 $1 ...           capture groups, legacy form
//! ```
//!
//! Resolution is a single left-to-right pass, so text substituted into the
//! output (a player's message, say) is never scanned for placeholders again.
//! Unknown `{...}` placeholders render as "" and are reported to the caller.
//! A `$n` with no such group is left as literal text (`$5 price` stays).

use super::pattern::Captures;
use crate::Sender;
use chrono::{DateTime, Local};

/// Values a template can refer to.
pub(crate) struct TemplateScope<'a> {
    pub sender: &'a Sender,
    pub original: &'a str,
    pub message: &'a str,
    pub rule_label: &'a str,
    pub captures: &'a Captures,
    pub received_at: &'a DateTime<Local>,
}

impl TemplateScope<'_> {
    fn lookup(&self, key: &str) -> Option<String> {
        let value = match key {
            "player" => self.sender.name.clone(),
            "sender_id" => self.sender.id.clone(),
            "original_message" | "command" => self.original.to_string(),
            "message" => self.message.to_string(),
            "rule_name" | "ruleID" => self.rule_label.to_string(),
            "date" => self.received_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            _ => {
                if let Ok(index) = key.parse::<usize>() {
                    return self.captures.get(index).map(str::to_string);
                }
                return self.captures.name(key).map(str::to_string);
            }
        };
        Some(value)
    }
}

/// Resolve `template` against `scope`. Names of unresolvable placeholders are
/// appended to `unresolved`.
pub(crate) fn render(template: &str, scope: &TemplateScope<'_>, unresolved: &mut Vec<String>) -> String {
    let re = regex!(r"\{([A-Za-z0-9_]+)\}|\$(\d+)");

    if !template.contains('{') && !template.contains('$') {
        return template.to_string();
    }

    re.replace_all(template, |caps: &regex::Captures<'_>| {
        if let Some(key) = caps.get(1) {
            match scope.lookup(key.as_str()) {
                Some(value) => value,
                None => {
                    unresolved.push(key.as_str().to_string());
                    String::new()
                }
            }
        } else {
            let literal = &caps[0];
            caps[2]
                .parse::<usize>()
                .ok()
                .and_then(|index| scope.captures.get(index))
                .map(str::to_string)
                .unwrap_or_else(|| literal.to_string())
        }
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::pattern::CompiledPattern;
    use chrono::TimeZone;

    fn render_with(template: &str, message: &str) -> (String, Vec<String>) {
        let sender = Sender::with_id("uuid-1", "Steve");
        let captures = CompiledPattern::new(r"^/(?P<cmd>\w+) (\w+)").unwrap().captures("/ban Alex").unwrap();
        let received_at = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let scope = TemplateScope {
            sender: &sender,
            original: "/ban Alex",
            message,
            rule_label: "punishment-audit",
            captures: &captures,
            received_at: &received_at,
        };
        let mut unresolved = Vec::new();
        let out = render(template, &scope, &mut unresolved);
        (out, unresolved)
    }

    #[test]
    fn resolves_sender_message_and_rule_placeholders() {
        let (out, unresolved) =
            render_with("{player} ({sender_id}) ran {original_message} [{rule_name}] at {date}", "/ban Alex");
        assert_eq!(out, "Steve (uuid-1) ran /ban Alex [punishment-audit] at 2024-05-01 12:30:00");
        assert!(unresolved.is_empty());
    }

    #[test]
    fn message_is_the_effective_text() {
        let (out, _) = render_with("{message} / {command}", "/ban ***");
        assert_eq!(out, "/ban *** / /ban Alex");
    }

    #[test]
    fn resolves_capture_groups_in_both_forms() {
        let (out, _) = render_with("{1}:{2}:{cmd} $2 $1", "");
        assert_eq!(out, "ban:Alex:ban Alex ban");
    }

    #[test]
    fn unknown_placeholders_render_empty_and_are_reported() {
        let (out, unresolved) = render_with("hi {nickname}{7}!", "");
        assert_eq!(out, "hi !");
        assert_eq!(unresolved, vec!["nickname".to_string(), "7".to_string()]);
    }

    #[test]
    fn dollar_amounts_without_groups_stay_literal() {
        let (out, unresolved) = render_with("costs $15", "");
        assert_eq!(out, "costs $15");
        assert!(unresolved.is_empty());
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let (out, _) = render_with("said: {message}", "{player} $1");
        assert_eq!(out, "said: {player} $1");
    }
}
