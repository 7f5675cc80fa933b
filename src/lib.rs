//! Rule-file driven moderation for chat lines, chat packets and proxy commands.
//!
//! Operators write rule blocks (`match`, `require`/`ignore` guards, `then`
//! actions); the [`Engine`] compiles them into an immutable [`RuleSet`] and
//! evaluates every inbound [`Event`] against it, producing a [`Verdict`] and
//! side effects through the host's [`ActionSink`].
//!
//! ```
//! use chatguard::{Engine, Event, Options, Sender, StaticProfile, RecordingSink, Verdict, parse_rules, RuleSet};
//! use chatguard::EventKinds;
//!
//! let rules = parse_rules("inline", "match ^/op\\b\nthen warn No.\nthen deny\n", EventKinds::all()).unwrap();
//! let sink = std::sync::Arc::new(RecordingSink::default());
//! let engine = Engine::with_rules(
//!     RuleSet::compile(rules).unwrap(),
//!     StaticProfile::default().into_collaborators(sink.clone()),
//!     Options::default(),
//! );
//!
//! let verdict = engine.evaluate(&Event::command(Sender::new("Steve"), "/op Steve"));
//! assert_eq!(verdict, Verdict::Deny { reason: Some("No.".to_string()) });
//! ```

#[macro_use]
mod macros;
mod api;
mod engine;
mod error;
mod host;
mod rules;

pub use api::{Engine, Evaluation, EvaluationDetails, Options, RewriteMode};
pub use engine::{Captures, EventKinds, Normalization, RuleOutcome, RuleSet, RuleTrace, SkipReason, normalize};
pub use error::{CollaboratorError, ConfigError, ConfigErrorKind, Location};
pub use host::{
    ActionSink, Collaborators, PermissionChecker, PlayHistory, RecordingSink, ScriptEvaluator, ServerLocator,
    SinkCall, StaticProfile,
};
pub use rules::{RuleSource, load_rule_file, parse_rules};

use chrono::{DateTime, Local};
use std::fmt;

// --- Events and verdicts ----------------------------------------------------

/// Which pipeline an event was intercepted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A chat line typed by a player.
    Chat,
    /// A command, on the game server or the proxy.
    Command,
    /// An outgoing chat packet sent to a player.
    Packet,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Chat => "chat",
            EventKind::Command => "command",
            EventKind::Packet => "packet",
        }
    }
}

/// Who caused the event. `id` is what collaborators key on, `name` is what
/// templates print as `{player}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: String,
    pub name: String,
}

impl Sender {
    /// A sender whose id and display name are the same.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Sender { id: name.clone(), name }
    }

    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Sender { id: id.into(), name: name.into() }
    }
}

/// One intercepted chat line, packet or command handed to [`Engine::evaluate`].
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub sender: Sender,
    pub text: String,
    pub received_at: DateTime<Local>,
}

impl Event {
    pub fn new(kind: EventKind, sender: Sender, text: impl Into<String>) -> Self {
        Event { kind, sender, text: text.into(), received_at: Local::now() }
    }

    pub fn chat(sender: Sender, text: impl Into<String>) -> Self {
        Self::new(EventKind::Chat, sender, text)
    }

    pub fn command(sender: Sender, text: impl Into<String>) -> Self {
        Self::new(EventKind::Command, sender, text)
    }

    pub fn packet(sender: Sender, text: impl Into<String>) -> Self {
        Self::new(EventKind::Packet, sender, text)
    }

    /// Build an event from raw bytes. Malformed UTF-8 is replaced with U+FFFD
    /// and reported; the event is still evaluated.
    pub fn from_utf8_lossy(kind: EventKind, sender: Sender, bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        if let std::borrow::Cow::Owned(_) = text {
            tracing::warn!(kind = kind.name(), sender = %sender.name, "event text is not valid UTF-8, decoded lossily");
        }
        Self::new(kind, sender, text.into_owned())
    }
}

/// The engine's decision for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Pass the event through unchanged.
    Allow,
    /// Pass the event through with this text instead of the original.
    Rewrite(String),
    /// Drop the event. `reason` is the last warning or kick message sent, if any.
    Deny { reason: Option<String> },
}

impl Verdict {
    pub fn is_denied(&self) -> bool {
        matches!(self, Verdict::Deny { .. })
    }

    /// Text the host should forward, or `None` when denied.
    pub fn output<'a>(&'a self, original: &'a str) -> Option<&'a str> {
        match self {
            Verdict::Allow => Some(original),
            Verdict::Rewrite(text) => Some(text),
            Verdict::Deny { .. } => None,
        }
    }
}

// --- Rule definitions -------------------------------------------------------

/// Message text with `{placeholder}` slots, resolved when an action runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template(String);

impl Template {
    pub fn new(raw: impl Into<String>) -> Self {
        Template(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A predicate over the sender. Held in a rule's `require` list (must hold)
/// or `ignore` list (skip the rule when it holds).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Sender has `permission`. A failing `require` guard with a `message`
    /// denies the event with that message once the pattern matches.
    Permission { permission: String, message: Option<Template> },
    /// Sender is connected to any of `names` (case-insensitive).
    Server { names: Vec<String> },
    /// Host script evaluates to true.
    Script { expression: String },
    /// Sender has joined before.
    PlayedBefore,
}

impl Guard {
    pub fn keyword(&self) -> &'static str {
        match self {
            Guard::Permission { .. } => "perm",
            Guard::Server { .. } => "server",
            Guard::Script { .. } => "script",
            Guard::PlayedBefore => "playedbefore",
        }
    }
}

/// One `then ...` line of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Deny,
    Rewrite(Template),
    Warn(Template),
    RunCommand(Template),
    RunProxyCommand(Template),
    Log(Template),
    Kick(Template),
    Discord { channel: String, message: Template },
    WriteFile { path: String, line: Template },
    Abort,
}

impl Action {
    pub fn keyword(&self) -> &'static str {
        match self {
            Action::Deny => "deny",
            Action::Rewrite(_) => "rewrite",
            Action::Warn(_) => "warn",
            Action::RunCommand(_) => "command",
            Action::RunProxyCommand(_) => "proxy",
            Action::Log(_) => "log",
            Action::Kick(_) => "kick",
            Action::Discord { .. } => "discord",
            Action::WriteFile { .. } => "write",
            Action::Abort => "abort",
        }
    }
}

/// A parsed rule block. Immutable once loaded; a reload replaces the whole
/// [`RuleSet`] instead of editing rules in place.
#[derive(Debug, Clone)]
pub struct Rule {
    pub(crate) name: Option<String>,
    /// 1-based position in the rule set, assigned by `RuleSet::compile`.
    pub(crate) ordinal: usize,
    pub(crate) label: String,
    pub(crate) pattern: engine::CompiledPattern,
    pub(crate) require: Vec<Guard>,
    pub(crate) ignore: Vec<Guard>,
    pub(crate) normalization: Normalization,
    pub(crate) actions: Vec<Action>,
    pub(crate) disabled: bool,
    pub(crate) kinds: EventKinds,
    pub(crate) location: Location,
}

impl Rule {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The rule's name, or `#<ordinal>` for unnamed rules.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn require_guards(&self) -> &[Guard] {
        &self.require
    }

    pub fn ignore_guards(&self) -> &[Guard] {
        &self.ignore
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn kinds(&self) -> EventKinds {
        self.kinds
    }

    pub fn location(&self) -> &Location {
        &self.location
    }
}
