//! Rule set compilation and indexing.
//!
//! This module holds the *static* side of the engine: everything derived once
//! from the parsed rules of a reload, then shared read-only by every
//! evaluation until the next reload replaces it.
//!
//! Evaluation is split into two phases:
//!
//! 1. **Compile** (this module): assign ordinals and labels, reject duplicate
//!    names, and index rules by the event kinds they apply to.
//! 2. **Run** (see `evaluator.rs`): walk the candidates for one event in
//!    declaration order, gate, match and dispatch.
//!
//! ## Invariants
//!
//! - `RuleId` is an index into `RuleSet::rules`; every index list is sorted
//!   ascending, so walking a list preserves declaration order.
//! - `RuleIndex::by_kind` uses fixed indices (`KIND_*`) to avoid `HashMap`
//!   overhead in the hot path.
//! - Disabled rules are indexed like any other rule; the evaluator skips them
//!   before any guard or pattern work.
//! - A `RuleSet` is never mutated after `compile`. The generation number is
//!   stamped once by `Engine::install` before the set is published.

use crate::error::{ConfigError, ConfigErrorKind};
use crate::{EventKind, Rule};
use std::collections::HashMap;

/// Rule identifier (index into the rules vector).
pub(crate) type RuleId = usize;

bitflags::bitflags! {
    /// Event kinds a rule applies to. Derived from the rule file it came from.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventKinds: u8 {
        const CHAT    = 1 << 0;
        const COMMAND = 1 << 1;
        const PACKET  = 1 << 2;
    }
}

impl From<EventKind> for EventKinds {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Chat => EventKinds::CHAT,
            EventKind::Command => EventKinds::COMMAND,
            EventKind::Packet => EventKinds::PACKET,
        }
    }
}

pub const KIND_COUNT: usize = 3;
pub const KIND_CHAT: usize = 0;
pub const KIND_COMMAND: usize = 1;
pub const KIND_PACKET: usize = 2;

fn kind_slot(kind: EventKind) -> usize {
    match kind {
        EventKind::Chat => KIND_CHAT,
        EventKind::Command => KIND_COMMAND,
        EventKind::Packet => KIND_PACKET,
    }
}

#[derive(Default, Debug)]
pub struct RuleIndex {
    pub by_kind: [Vec<RuleId>; KIND_COUNT],
}

/// An immutable, ordered snapshot of every rule loaded by one reload.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    index: RuleIndex,
    names: HashMap<String, RuleId>,
    generation: u64,
}

impl RuleSet {
    pub fn empty() -> Self {
        RuleSet::default()
    }

    /// Build a rule set from parsed rules, keeping their order.
    ///
    /// Fails when two rules share a name; the error points at the second one.
    pub fn compile(mut rules: Vec<Rule>) -> Result<Self, ConfigError> {
        let mut names: HashMap<String, RuleId> = HashMap::new();

        for (id, rule) in rules.iter_mut().enumerate() {
            rule.ordinal = id + 1;
            rule.label = match &rule.name {
                Some(name) => name.clone(),
                None => format!("#{}", rule.ordinal),
            };
        }

        for (id, rule) in rules.iter().enumerate() {
            let Some(name) = &rule.name else { continue };
            if let Some(&first) = names.get(name) {
                return Err(ConfigError::at(
                    &rule.location.origin,
                    rule.location.line,
                    ConfigErrorKind::DuplicateName { name: name.clone(), first: rules[first].location.clone() },
                ));
            }
            names.insert(name.clone(), id);
        }

        let mut index = RuleIndex::default();
        for (id, rule) in rules.iter().enumerate() {
            if rule.kinds.contains(EventKinds::CHAT) {
                index.by_kind[KIND_CHAT].push(id);
            }
            if rule.kinds.contains(EventKinds::COMMAND) {
                index.by_kind[KIND_COMMAND].push(id);
            }
            if rule.kinds.contains(EventKinds::PACKET) {
                index.by_kind[KIND_PACKET].push(id);
            }
        }

        Ok(RuleSet { rules, index, names, generation: 0 })
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Reload counter of the engine that published this set (0 before any).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn enabled_count(&self) -> usize {
        self.rules.iter().filter(|r| !r.disabled).count()
    }

    /// All rules in declaration order, disabled ones included.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.names.get(name).map(|&id| &self.rules[id])
    }

    /// Rules that apply to `kind`, in declaration order.
    pub(crate) fn candidates(&self, kind: EventKind) -> impl Iterator<Item = &Rule> {
        self.index.by_kind[kind_slot(kind)].iter().map(|&id| &self.rules[id])
    }
}
