//! Action chain execution for a matched rule.
//!
//! Actions run in file order. Verdict-shaping actions (`deny`, `rewrite`,
//! `abort`) only touch the evaluation context; everything else goes to the
//! host's [`ActionSink`](crate::ActionSink). A failing sink call is logged
//! and the chain carries on with the next action.

use super::context::EvaluationContext;
use crate::error::CollaboratorError;
use crate::host::Collaborators;
use crate::{Action, Rule};
use tracing::{debug, warn};

/// Whether rule iteration may continue after this chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Abort,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct DispatchOutcome {
    pub flow: Flow,
    /// Actions executed, including failed ones and the aborting one.
    pub executed: usize,
    pub failures: usize,
}

pub(crate) fn run_actions(rule: &Rule, ctx: &mut EvaluationContext<'_>, host: &Collaborators) -> DispatchOutcome {
    let event = ctx.event;
    let sender = &event.sender;
    let sink = &host.sink;
    let mut outcome = DispatchOutcome { flow: Flow::Continue, executed: 0, failures: 0 };

    for action in &rule.actions {
        outcome.executed += 1;

        let result: Result<(), CollaboratorError> = match action {
            Action::Deny => {
                ctx.denied = true;
                Ok(())
            }
            Action::Rewrite(template) => {
                ctx.message = ctx.render(template, rule);
                ctx.denied = false;
                Ok(())
            }
            Action::Warn(template) => {
                let message = ctx.render(template, rule);
                let result = sink.warn(sender, &message);
                ctx.notice = Some(message);
                result
            }
            Action::Kick(template) => {
                let reason = ctx.render(template, rule);
                let result = sink.kick(sender, &reason);
                ctx.notice = Some(reason);
                result
            }
            Action::RunCommand(template) => {
                let command = ctx.render(template, rule);
                sink.run_as_sender(sender, &command)
            }
            Action::RunProxyCommand(template) => {
                let command = ctx.render(template, rule);
                sink.run_as_console(&command)
            }
            Action::Log(template) => {
                let message = ctx.render(template, rule);
                sink.log(&message)
            }
            Action::Discord { channel, message } => {
                let message = ctx.render(message, rule);
                sink.notify_channel(channel, &message)
            }
            Action::WriteFile { path, line } => {
                let line = ctx.render(line, rule);
                sink.write_file(path, &line)
            }
            Action::Abort => {
                ctx.aborted = true;
                outcome.flow = Flow::Abort;
                debug!(rule = %rule.label(), "abort: skipping remaining actions and rules");
                return outcome;
            }
        };

        if let Err(error) = result {
            outcome.failures += 1;
            warn!(rule = %rule.label(), action = action.keyword(), error = %error, "action failed, continuing");
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ActionSink, RecordingSink, SinkCall, StaticProfile};
    use crate::{Event, EventKinds, RuleSet, Sender, parse_rules};
    use std::sync::Arc;

    fn rule(text: &str) -> Rule {
        let set = RuleSet::compile(parse_rules("inline", text, EventKinds::all()).unwrap()).unwrap();
        set.iter().next().unwrap().clone()
    }

    /// Fails every call and remembers nothing.
    struct BrokenSink;

    impl ActionSink for BrokenSink {
        fn warn(&self, _: &Sender, _: &str) -> Result<(), CollaboratorError> {
            Err(CollaboratorError::failed("player disconnected"))
        }
        fn run_as_sender(&self, _: &Sender, _: &str) -> Result<(), CollaboratorError> {
            Err(CollaboratorError::failed("unknown command"))
        }
        fn run_as_console(&self, _: &str) -> Result<(), CollaboratorError> {
            Ok(())
        }
        fn kick(&self, _: &Sender, _: &str) -> Result<(), CollaboratorError> {
            Ok(())
        }
        fn log(&self, _: &str) -> Result<(), CollaboratorError> {
            Ok(())
        }
        fn write_file(&self, _: &str, _: &str) -> Result<(), CollaboratorError> {
            Err(CollaboratorError::failed("read-only filesystem"))
        }
        fn notify_channel(&self, _: &str, _: &str) -> Result<(), CollaboratorError> {
            Ok(())
        }
    }

    #[test]
    fn runs_actions_in_order_with_rendered_templates() {
        let sink = Arc::new(RecordingSink::default());
        let host = StaticProfile::default().into_collaborators(sink.clone());
        let r = rule(
            "match ^/ban (\\w+)\nname ban-audit\n\
             then warn Banning {1}\nthen proxy alert {player} banned $1\nthen discord staff {player} used {rule_name}\n\
             then write logs/bans.txt {player}: {command}\n",
        );
        let event = Event::command(Sender::new("Steve"), "/ban Alex");
        let mut ctx = EvaluationContext::new(&event, false);
        ctx.captures = r.pattern.captures(&event.text).unwrap();

        let outcome = run_actions(&r, &mut ctx, &host);
        assert_eq!(outcome.flow, Flow::Continue);
        assert_eq!((outcome.executed, outcome.failures), (4, 0));
        assert_eq!(
            sink.take(),
            vec![
                SinkCall::Warn { sender: "Steve".into(), message: "Banning Alex".into() },
                SinkCall::RunAsConsole { command: "alert Steve banned Alex".into() },
                SinkCall::Notify { channel: "staff".into(), message: "Steve used ban-audit".into() },
                SinkCall::WriteFile { path: "logs/bans.txt".into(), line: "Steve: /ban Alex".into() },
            ]
        );
        assert_eq!(ctx.notice.as_deref(), Some("Banning Alex"));
    }

    #[test]
    fn kick_reason_becomes_the_notice() {
        let sink = Arc::new(RecordingSink::default());
        let host = StaticProfile::default().into_collaborators(sink.clone());
        let r = rule("match ^/fly\nthen command spawn {player}\nthen kick Bye {player}\nthen deny\n");
        let event = Event::command(Sender::new("Steve"), "/fly");
        let mut ctx = EvaluationContext::new(&event, false);

        let outcome = run_actions(&r, &mut ctx, &host);
        assert_eq!((outcome.executed, outcome.failures), (3, 0));
        assert!(ctx.denied);
        assert_eq!(ctx.notice.as_deref(), Some("Bye Steve"));
        assert_eq!(
            sink.take(),
            vec![
                SinkCall::RunAsSender { sender: "Steve".into(), command: "spawn Steve".into() },
                SinkCall::Kick { sender: "Steve".into(), reason: "Bye Steve".into() },
            ]
        );
    }

    #[test]
    fn rewrite_after_deny_clears_the_deny() {
        let host = StaticProfile::default().into_collaborators(Arc::new(RecordingSink::default()));
        let r = rule("match damn\nthen deny\nthen rewrite d***\n");
        let event = Event::chat(Sender::new("Steve"), "damn");
        let mut ctx = EvaluationContext::new(&event, false);

        run_actions(&r, &mut ctx, &host);
        assert!(!ctx.denied);
        assert_eq!(ctx.message, "d***");
    }

    #[test]
    fn abort_stops_the_chain() {
        let sink = Arc::new(RecordingSink::default());
        let host = StaticProfile::default().into_collaborators(sink.clone());
        let r = rule("match x\nthen log first\nthen abort\nthen log never\n");
        let event = Event::chat(Sender::new("Steve"), "x");
        let mut ctx = EvaluationContext::new(&event, false);

        let outcome = run_actions(&r, &mut ctx, &host);
        assert_eq!(outcome.flow, Flow::Abort);
        assert_eq!(outcome.executed, 2);
        assert!(ctx.aborted);
        assert_eq!(sink.take(), vec![SinkCall::Log { message: "first".into() }]);
    }

    #[test]
    fn sink_failures_are_counted_and_skipped() {
        let host = StaticProfile::default().into_collaborators(Arc::new(BrokenSink));
        let r = rule("match x\nthen warn hey\nthen command spawn\nthen write a.txt line\nthen deny\n");
        let event = Event::chat(Sender::new("Steve"), "x");
        let mut ctx = EvaluationContext::new(&event, false);

        let outcome = run_actions(&r, &mut ctx, &host);
        assert_eq!((outcome.executed, outcome.failures), (4, 3));
        assert!(ctx.denied);
        assert_eq!(ctx.notice.as_deref(), Some("hey"));
    }
}
