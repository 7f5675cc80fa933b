//! Collaborators supplied by the host platform.
//!
//! The engine never talks to a permission store, a proxy, a script runtime
//! or a chat pipeline itself. It asks these traits, and treats every `Err`
//! as a logged, non-fatal condition.
//!
//! Two in-crate implementations exist for dry runs and tests:
//! [`StaticProfile`] answers lookups from fixed data, [`RecordingSink`]
//! records side effects instead of performing them.

use crate::Sender;
use crate::error::CollaboratorError;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

pub trait PermissionChecker: Send + Sync {
    fn has_permission(&self, sender: &Sender, permission: &str) -> Result<bool, CollaboratorError>;
}

pub trait ServerLocator: Send + Sync {
    /// Name of the server the sender is connected to, `None` when not on one
    /// (console, mid-switch).
    fn current_server(&self, sender: &Sender) -> Result<Option<String>, CollaboratorError>;
}

/// Evaluates an operator-supplied boolean expression. Placeholders in the
/// expression are already resolved. Sandboxing is the implementor's job.
pub trait ScriptEvaluator: Send + Sync {
    fn evaluate(&self, expression: &str, sender: &Sender) -> Result<bool, CollaboratorError>;
}

pub trait PlayHistory: Send + Sync {
    fn has_played_before(&self, sender: &Sender) -> Result<bool, CollaboratorError>;
}

/// Side effects requested by `then ...` actions.
pub trait ActionSink: Send + Sync {
    /// Send `message` to the sender (`then warn`, permission messages).
    fn warn(&self, sender: &Sender, message: &str) -> Result<(), CollaboratorError>;

    /// `then command`
    fn run_as_sender(&self, sender: &Sender, command: &str) -> Result<(), CollaboratorError>;

    /// `then proxy`
    fn run_as_console(&self, command: &str) -> Result<(), CollaboratorError>;

    fn kick(&self, sender: &Sender, reason: &str) -> Result<(), CollaboratorError>;

    /// `then log`, to the host console.
    fn log(&self, message: &str) -> Result<(), CollaboratorError>;

    /// `then write`, append one line to `path`.
    fn write_file(&self, path: &str, line: &str) -> Result<(), CollaboratorError>;

    /// `then discord`
    fn notify_channel(&self, channel: &str, message: &str) -> Result<(), CollaboratorError>;
}

/// Everything the engine needs from the host, bundled for sharing across
/// threads.
#[derive(Clone)]
pub struct Collaborators {
    pub permissions: Arc<dyn PermissionChecker>,
    pub servers: Arc<dyn ServerLocator>,
    pub scripts: Arc<dyn ScriptEvaluator>,
    pub history: Arc<dyn PlayHistory>,
    pub sink: Arc<dyn ActionSink>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("permissions", &"<dyn PermissionChecker>")
            .field("servers", &"<dyn ServerLocator>")
            .field("scripts", &"<dyn ScriptEvaluator>")
            .field("history", &"<dyn PlayHistory>")
            .field("sink", &"<dyn ActionSink>")
            .finish()
    }
}

// --- Static lookups ---------------------------------------------------------

/// Fixed answers for every sender: a permission set, a current server, a
/// played-before flag and known script results.
///
/// Scripts that were not registered with [`StaticProfile::with_script`] fail,
/// which the engine treats as "guard does not hold".
#[derive(Debug, Clone, Default)]
pub struct StaticProfile {
    permissions: HashSet<String>,
    server: Option<String>,
    played_before: bool,
    scripts: HashMap<String, bool>,
}

impl StaticProfile {
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    pub fn on_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn played_before(mut self, played_before: bool) -> Self {
        self.played_before = played_before;
        self
    }

    pub fn with_script(mut self, expression: impl Into<String>, result: bool) -> Self {
        self.scripts.insert(expression.into(), result);
        self
    }

    /// Use this profile for every lookup trait and `sink` for side effects.
    pub fn into_collaborators(self, sink: Arc<dyn ActionSink>) -> Collaborators {
        let profile = Arc::new(self);
        Collaborators {
            permissions: profile.clone(),
            servers: profile.clone(),
            scripts: profile.clone(),
            history: profile,
            sink,
        }
    }
}

impl PermissionChecker for StaticProfile {
    fn has_permission(&self, _sender: &Sender, permission: &str) -> Result<bool, CollaboratorError> {
        Ok(self.permissions.contains(permission))
    }
}

impl ServerLocator for StaticProfile {
    fn current_server(&self, _sender: &Sender) -> Result<Option<String>, CollaboratorError> {
        Ok(self.server.clone())
    }
}

impl ScriptEvaluator for StaticProfile {
    fn evaluate(&self, expression: &str, _sender: &Sender) -> Result<bool, CollaboratorError> {
        self.scripts
            .get(expression)
            .copied()
            .ok_or_else(|| CollaboratorError::failed(format!("no script result registered for '{expression}'")))
    }
}

impl PlayHistory for StaticProfile {
    fn has_played_before(&self, _sender: &Sender) -> Result<bool, CollaboratorError> {
        Ok(self.played_before)
    }
}

// --- Recording sink ---------------------------------------------------------

/// One side effect captured by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Warn { sender: String, message: String },
    RunAsSender { sender: String, command: String },
    RunAsConsole { command: String },
    Kick { sender: String, reason: String },
    Log { message: String },
    WriteFile { path: String, line: String },
    Notify { channel: String, message: String },
}

impl fmt::Display for SinkCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkCall::Warn { sender, message } => write!(f, "warn {sender}: {message}"),
            SinkCall::RunAsSender { sender, command } => write!(f, "run as {sender}: {command}"),
            SinkCall::RunAsConsole { command } => write!(f, "run as console: {command}"),
            SinkCall::Kick { sender, reason } => write!(f, "kick {sender}: {reason}"),
            SinkCall::Log { message } => write!(f, "log: {message}"),
            SinkCall::WriteFile { path, line } => write!(f, "write {path}: {line}"),
            SinkCall::Notify { channel, message } => write!(f, "discord #{channel}: {message}"),
        }
    }
}

/// An [`ActionSink`] that performs nothing and remembers every call in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<SinkCall> {
        self.lock().clone()
    }

    /// Return and clear the recorded calls.
    pub fn take(&self) -> Vec<SinkCall> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SinkCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: SinkCall) -> Result<(), CollaboratorError> {
        self.lock().push(call);
        Ok(())
    }
}

impl ActionSink for RecordingSink {
    fn warn(&self, sender: &Sender, message: &str) -> Result<(), CollaboratorError> {
        self.record(SinkCall::Warn { sender: sender.name.clone(), message: message.to_string() })
    }

    fn run_as_sender(&self, sender: &Sender, command: &str) -> Result<(), CollaboratorError> {
        self.record(SinkCall::RunAsSender { sender: sender.name.clone(), command: command.to_string() })
    }

    fn run_as_console(&self, command: &str) -> Result<(), CollaboratorError> {
        self.record(SinkCall::RunAsConsole { command: command.to_string() })
    }

    fn kick(&self, sender: &Sender, reason: &str) -> Result<(), CollaboratorError> {
        self.record(SinkCall::Kick { sender: sender.name.clone(), reason: reason.to_string() })
    }

    fn log(&self, message: &str) -> Result<(), CollaboratorError> {
        self.record(SinkCall::Log { message: message.to_string() })
    }

    fn write_file(&self, path: &str, line: &str) -> Result<(), CollaboratorError> {
        self.record(SinkCall::WriteFile { path: path.to_string(), line: line.to_string() })
    }

    fn notify_channel(&self, channel: &str, message: &str) -> Result<(), CollaboratorError> {
        self.record(SinkCall::Notify { channel: channel.to_string(), message: message.to_string() })
    }
}
