//! Per-event rule evaluation.
//!
//! One [`Evaluator`] walks the candidate rules for a single event in
//! declaration order:
//!
//! ```text
//! for rule in rule_set.candidates(event.kind):
//!     disabled?            -> skip
//!     conditions::check    -> Skip | Reject | Applicable
//!     normalize subject    -> strip colors / accents per rule
//!     pattern.captures     -> NoMatch | captures
//!     Reject + match       -> warn sender, deny, stop
//!     dispatch::run_actions
//!     aborted?             -> stop
//!     denied && stop_on_deny -> stop
//! ```
//!
//! The subject a rule matches against depends on [`RewriteMode`]: in
//! `Cumulative` mode it is the text as rewritten by earlier rules, in
//! `LastWins` mode it is always the original text.

use super::conditions::{self, GuardOutcome};
use super::context::EvaluationContext;
use super::dispatch::{self, Flow};
use super::metrics::{RuleOutcome, RuleTrace, RunMetrics, RunResult};
use super::normalize::normalize;
use super::rule_set::RuleSet;
use crate::host::Collaborators;
use crate::{Event, Options, RewriteMode, Rule, Verdict};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Evaluates events against one rule set snapshot.
///
/// Usage: `Evaluator::new(&rules, &host, &options)` then `run(&event)` or
/// `run_with_metrics(&event)`. The evaluator holds no per-event state, so one
/// value can evaluate many events.
#[derive(Debug)]
pub struct Evaluator<'a> {
    rule_set: &'a RuleSet,
    host: &'a Collaborators,
    options: &'a Options,
    collect_traces: bool,
}

/// What a single rule did, before it is turned into a trace entry.
enum Step {
    Continue(RuleOutcome),
    Halt(RuleOutcome),
}

impl<'a> Evaluator<'a> {
    pub fn new(rule_set: &'a RuleSet, host: &'a Collaborators, options: &'a Options) -> Self {
        Evaluator { rule_set, host, options, collect_traces: false }
    }

    /// Record a [`RuleTrace`] for every candidate rule.
    pub fn with_traces(mut self) -> Self {
        self.collect_traces = true;
        self
    }

    pub fn run_with_metrics(&self, event: &Event) -> RunResult {
        let total_start = Instant::now();
        let mut ctx = EvaluationContext::new(event, self.options.verbose);
        let mut traces = Vec::new();
        let mut metrics = RunMetrics::default();

        for rule in self.rule_set.candidates(event.kind) {
            let rule_start = Instant::now();
            metrics.rules_considered += 1;

            let (outcome, halt) = match self.step(rule, &mut ctx) {
                Step::Continue(outcome) => (outcome, false),
                Step::Halt(outcome) => (outcome, true),
            };
            if matches!(outcome, RuleOutcome::Matched { .. } | RuleOutcome::Rejected) {
                metrics.rules_matched += 1;
            }
            if self.collect_traces {
                traces.push(RuleTrace {
                    rule: rule.label().to_string(),
                    ordinal: rule.ordinal(),
                    outcome,
                    duration: rule_start.elapsed(),
                });
            }
            if halt {
                break;
            }
        }

        let verdict = ctx.verdict();
        metrics.total = total_start.elapsed();
        debug!(
            kind = event.kind.name(),
            sender = %event.sender.name,
            considered = metrics.rules_considered,
            matched = metrics.rules_matched,
            verdict = ?verdict,
            "evaluated event"
        );

        RunResult { verdict, traces, metrics, generation: self.rule_set.generation() }
    }

    /// Convenience wrapper that discards traces and timings.
    pub fn run(&self, event: &Event) -> Verdict {
        self.run_with_metrics(event).verdict
    }

    fn step(&self, rule: &Rule, ctx: &mut EvaluationContext<'_>) -> Step {
        if rule.is_disabled() {
            debug!(rule = %rule.label(), "disabled");
            return Step::Continue(RuleOutcome::Disabled);
        }

        let gate = conditions::check(rule, ctx, self.host);
        if let GuardOutcome::Skip(reason) = gate {
            return Step::Continue(RuleOutcome::Skipped(reason));
        }

        let subject = match self.options.rewrite_mode {
            RewriteMode::Cumulative => ctx.message.as_str(),
            RewriteMode::LastWins => ctx.event.text.as_str(),
        };
        let subject = normalize(subject, rule.normalization());
        let Some(captures) = rule.pattern.captures(&subject) else {
            debug!(rule = %rule.label(), "no match");
            return Step::Continue(RuleOutcome::NoMatch);
        };
        ctx.captures = captures;

        if self.options.verbose {
            info!(rule = %rule.label(), pattern = rule.pattern(), subject = %subject, "rule matched");
        }

        if let GuardOutcome::Reject(message) = gate {
            let message = ctx.render(message, rule);
            if let Err(error) = self.host.sink.warn(&ctx.event.sender, &message) {
                warn!(rule = %rule.label(), error = %error, "could not deliver permission message");
            }
            debug!(rule = %rule.label(), "missing permission, event denied");
            ctx.denied = true;
            ctx.notice = Some(message);
            return Step::Halt(RuleOutcome::Rejected);
        }

        let dispatched = dispatch::run_actions(rule, ctx, self.host);
        let outcome = RuleOutcome::Matched {
            actions_run: dispatched.executed,
            failed_actions: dispatched.failures,
            aborted: dispatched.flow == Flow::Abort,
        };

        if dispatched.flow == Flow::Abort {
            return Step::Halt(outcome);
        }
        if ctx.denied && self.options.stop_on_deny {
            debug!(rule = %rule.label(), "denied, stopping");
            return Step::Halt(outcome);
        }
        Step::Continue(outcome)
    }
}
