//! Rule evaluation engine.
//!
//! The engine is split into focused submodules under `src/engine/`; this file
//! wires them together and re-exports what the rest of the crate uses.
//!
//! ## How the parts work together
//!
//! ```text
//! Vec<Rule> ── RuleSet::compile ──▶ RuleSet (ordinals, labels, per-kind index)
//!              (rule_set.rs)           │
//!                                      │  Engine::install swaps it in (api.rs)
//!                                      ▼
//! Event ──▶ Evaluator::run_with_metrics (evaluator.rs)
//!             │  EvaluationContext: effective text, captures, deny flag
//!             │  (context.rs)
//!             ├─ conditions::check      require / ignore guards  (conditions.rs)
//!             ├─ normalize              strip colors / accents   (normalize.rs)
//!             ├─ CompiledPattern        regex match + captures   (pattern.rs)
//!             └─ dispatch::run_actions  then ... actions         (dispatch.rs)
//!                   └─ template::render placeholders             (template.rs)
//!                               │
//!                               ▼
//!                     RunResult { verdict, traces, metrics }     (metrics.rs)
//! ```
//!
//! ## Responsibilities by module
//!
//! - `rule_set.rs`: immutable, ordered rule snapshot plus the event-kind index.
//! - `context.rs`: state owned by one evaluation and dropped with it.
//! - `conditions.rs`: short-circuiting guard checks against host collaborators.
//! - `normalize.rs`: color-code and accent stripping applied before matching.
//! - `pattern.rs`: compiled rule patterns and their capture groups.
//! - `template.rs`: single-pass placeholder substitution.
//! - `dispatch.rs`: action chain execution, sink error containment.
//! - `evaluator.rs`: the per-event loop and its stop conditions.
//! - `metrics.rs`: optional per-rule traces and timings.
//!
//! ## Debugging
//!
//! Every decision is logged at `debug` level under the `chatguard` target; set
//! `CHATGUARD_LOG=chatguard=debug` when running the CLI.

#[path = "engine/conditions.rs"]
mod conditions;
#[path = "engine/context.rs"]
mod context;
#[path = "engine/dispatch.rs"]
mod dispatch;
#[path = "engine/evaluator.rs"]
mod evaluator;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/normalize.rs"]
mod normalize;
#[path = "engine/pattern.rs"]
pub(crate) mod pattern;
#[path = "engine/rule_set.rs"]
mod rule_set;
#[path = "engine/template.rs"]
mod template;

pub use evaluator::Evaluator;
#[allow(unused_imports)]
pub use metrics::{RuleOutcome, RuleTrace, RunMetrics, RunResult, SkipReason};
pub use normalize::{Normalization, normalize};
pub use pattern::Captures;
pub(crate) use pattern::CompiledPattern;
pub use rule_set::{EventKinds, RuleSet};
