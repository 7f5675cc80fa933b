//! Per-event evaluation state.
//!
//! Created when an event enters the engine, owned by that single evaluation
//! and dropped when the verdict is returned.

use super::pattern::Captures;
use super::template::{TemplateScope, render};
use crate::{Event, Rule, Template, Verdict};
use std::collections::HashSet;
use tracing::info;

pub(crate) struct EvaluationContext<'e> {
    pub event: &'e Event,
    /// Effective text: the original, or the latest rewrite.
    pub message: String,
    /// Captures of the most recent successful match.
    pub captures: Captures,
    pub denied: bool,
    /// Last warning or kick message sent; becomes the denial reason.
    pub notice: Option<String>,
    pub aborted: bool,
    verbose: bool,
    /// (rule ordinal, placeholder) pairs already reported as unresolved.
    reported: HashSet<(usize, String)>,
}

impl<'e> EvaluationContext<'e> {
    pub fn new(event: &'e Event, verbose: bool) -> Self {
        EvaluationContext {
            event,
            message: event.text.clone(),
            captures: Captures::default(),
            denied: false,
            notice: None,
            aborted: false,
            verbose,
            reported: HashSet::new(),
        }
    }

    /// Resolve `template` for `rule` against the current state.
    pub fn render(&mut self, template: &Template, rule: &Rule) -> String {
        self.render_str(template.as_str(), rule)
    }

    pub fn render_str(&mut self, template: &str, rule: &Rule) -> String {
        let mut unresolved = Vec::new();
        let scope = TemplateScope {
            sender: &self.event.sender,
            original: &self.event.text,
            message: &self.message,
            rule_label: rule.label(),
            captures: &self.captures,
            received_at: &self.event.received_at,
        };
        let out = render(template, &scope, &mut unresolved);

        if self.verbose {
            for placeholder in unresolved {
                if self.reported.insert((rule.ordinal(), placeholder.clone())) {
                    info!(rule = %rule.label(), placeholder = %placeholder, "unresolved placeholder rendered empty");
                }
            }
        }
        out
    }

    pub fn verdict(&self) -> Verdict {
        if self.denied {
            Verdict::Deny { reason: self.notice.clone() }
        } else if self.message != self.event.text {
            Verdict::Rewrite(self.message.clone())
        } else {
            Verdict::Allow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sender;

    #[test]
    fn verdict_prefers_deny_then_rewrite() {
        let event = Event::chat(Sender::new("Steve"), "hello");
        let mut ctx = EvaluationContext::new(&event, false);
        assert_eq!(ctx.verdict(), Verdict::Allow);

        ctx.message = "hi".into();
        assert_eq!(ctx.verdict(), Verdict::Rewrite("hi".into()));

        ctx.denied = true;
        ctx.notice = Some("no".into());
        assert_eq!(ctx.verdict(), Verdict::Deny { reason: Some("no".into()) });
    }

    #[test]
    fn rewriting_back_to_the_original_is_an_allow() {
        let event = Event::chat(Sender::new("Steve"), "hello");
        let mut ctx = EvaluationContext::new(&event, false);
        ctx.message = "hello".into();
        assert_eq!(ctx.verdict(), Verdict::Allow);
    }
}
