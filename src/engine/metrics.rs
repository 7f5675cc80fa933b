//! Evaluation traces and timings.
//!
//! The intended usage is:
//!
//! - `Evaluator::run` for normal operation (no per-rule allocation).
//! - `Evaluator::run_with_metrics` for dry runs, debugging a rule file, and
//!   the CLI report.
//!
//! Traces are *opt-in*: the hot path only counts considered and matched rules.

use crate::Verdict;
use std::time::Duration;

/// Why the condition evaluator skipped a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The require guard at `index` (0-based) did not hold.
    Required { guard: &'static str, index: usize },
    /// The ignore guard at `index` (0-based) held.
    Ignored { guard: &'static str, index: usize },
}

/// What happened to one rule during an evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Disabled in the rule file; nothing was evaluated.
    Disabled,
    Skipped(SkipReason),
    NoMatch,
    /// Pattern matched and the action chain ran.
    Matched { actions_run: usize, failed_actions: usize, aborted: bool },
    /// A required permission with a denial message was missing.
    Rejected,
}

/// Per-rule trace entry.
#[derive(Debug, Clone)]
pub struct RuleTrace {
    pub rule: String,
    pub ordinal: usize,
    pub outcome: RuleOutcome,
    pub duration: Duration,
}

#[derive(Debug, Default, Clone)]
pub struct RunMetrics {
    /// Total elapsed time for the evaluation.
    pub total: Duration,
    /// Rules applicable to the event kind that were visited.
    pub rules_considered: usize,
    /// Rules whose pattern matched.
    pub rules_matched: usize,
}

/// Evaluator output bundled with traces and timing.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub verdict: Verdict,
    /// Empty unless traces were requested.
    pub traces: Vec<RuleTrace>,
    pub metrics: RunMetrics,
    pub generation: u64,
}
