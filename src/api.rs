use crate::engine::{Evaluator, RuleOutcome, RuleSet, RuleTrace};
use crate::error::ConfigError;
use crate::host::Collaborators;
use crate::rules::{RuleSource, load_rule_file};
use crate::{Event, Verdict};
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{error, info};

/// How rewrites by several rules combine for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RewriteMode {
    /// Later rules match and render against the text rewritten by earlier ones.
    #[default]
    Cumulative,
    /// Every rule matches the original text; the last rewrite wins.
    LastWins,
}

/// Options that affect evaluation.
#[derive(Debug, Clone)]
pub struct Options {
    /// Log matches and unresolved placeholders at `info` level.
    pub verbose: bool,
    /// Stop visiting rules once a rule's chain leaves the event denied.
    pub stop_on_deny: bool,
    pub rewrite_mode: RewriteMode,
}

impl Default for Options {
    fn default() -> Self {
        Options { verbose: false, stop_on_deny: true, rewrite_mode: RewriteMode::Cumulative }
    }
}

/// Extra details returned by [`Engine::evaluate_verbose`].
///
/// Compact on purpose: enough to debug a rule file without dumping the
/// evaluation context.
#[derive(Debug, Clone)]
pub struct EvaluationDetails {
    /// Total elapsed time.
    pub total: Duration,
    /// Generation of the rule set snapshot the event was evaluated against.
    pub generation: u64,
    /// One entry per candidate rule visited, in order.
    pub rules: Vec<RuleTrace>,
    pub rules_considered: usize,
    pub rules_matched: usize,
}

impl EvaluationDetails {
    /// Labels of the rules whose pattern matched.
    pub fn matched_rules(&self) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|t| matches!(t.outcome, RuleOutcome::Matched { .. } | RuleOutcome::Rejected))
            .map(|t| t.rule.as_str())
            .collect()
    }
}

/// Result from [`Engine::evaluate_verbose`].
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub verdict: Verdict,
    pub details: EvaluationDetails,
}

/// The moderation engine: a published rule set plus the host collaborators.
///
/// `evaluate` may be called from any number of threads. `reload` and
/// `install` swap the rule set atomically; an evaluation that already
/// started finishes against the snapshot it loaded.
#[derive(Debug)]
pub struct Engine {
    rules: ArcSwap<RuleSet>,
    generation: AtomicU64,
    /// Held across the generation bump and the store so sets publish in generation order.
    publish: Mutex<()>,
    host: Collaborators,
    options: Options,
}

impl Engine {
    /// An engine with no rules: every event is allowed until a reload.
    pub fn new(host: Collaborators, options: Options) -> Self {
        Engine {
            rules: ArcSwap::from_pointee(RuleSet::empty()),
            generation: AtomicU64::new(0),
            publish: Mutex::new(()),
            host,
            options,
        }
    }

    pub fn with_rules(rule_set: RuleSet, host: Collaborators, options: Options) -> Self {
        let engine = Engine::new(host, options);
        engine.install(rule_set);
        engine
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The rule set new evaluations will use.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.rules.load_full()
    }

    /// Publish `rule_set`, stamping it with the next generation number.
    pub fn install(&self, rule_set: RuleSet) -> Arc<RuleSet> {
        let _publishing = self.publish.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let published = Arc::new(rule_set.with_generation(generation));
        self.rules.store(published.clone());
        published
    }

    /// Parse every source in order and publish the combined rule set.
    ///
    /// On any error nothing is published and the previous set stays active.
    pub fn reload(&self, sources: &[RuleSource]) -> Result<Arc<RuleSet>, ConfigError> {
        match load_all(sources) {
            Ok(rule_set) => {
                let published = self.install(rule_set);
                info!(
                    generation = published.generation(),
                    rules = published.len(),
                    enabled = published.enabled_count(),
                    files = sources.len(),
                    "rules reloaded"
                );
                Ok(published)
            }
            Err(e) => {
                error!(error = %e, "rule reload rejected, keeping previous rules");
                Err(e)
            }
        }
    }

    /// Evaluate one event against the current rule set.
    pub fn evaluate(&self, event: &Event) -> Verdict {
        let rule_set = self.rules.load();
        Evaluator::new(&rule_set, &self.host, &self.options).run(event)
    }

    /// Evaluate `event` and return per-rule traces and timings with the verdict.
    ///
    /// The default [`evaluate`](Self::evaluate) path does not allocate these
    /// traces.
    pub fn evaluate_verbose(&self, event: &Event) -> Evaluation {
        let rule_set = self.rules.load();
        let run = Evaluator::new(&rule_set, &self.host, &self.options).with_traces().run_with_metrics(event);

        Evaluation {
            verdict: run.verdict,
            details: EvaluationDetails {
                total: run.metrics.total,
                generation: run.generation,
                rules: run.traces,
                rules_considered: run.metrics.rules_considered,
                rules_matched: run.metrics.rules_matched,
            },
        }
    }
}

fn load_all(sources: &[RuleSource]) -> Result<RuleSet, ConfigError> {
    let mut rules = Vec::new();
    for source in sources {
        rules.extend(load_rule_file(source)?);
    }
    RuleSet::compile(rules)
}
