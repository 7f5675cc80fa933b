//! Guard evaluation (`require` / `ignore`).
//!
//! ```text
//! require[0] ─ holds ─▶ require[1] ─ holds ─▶ … ─▶ ignore[0] ─ no ─▶ … ─▶ Applicable
//!     │                     │                          │
//!   fails                 fails                      holds
//!     ▼                     ▼                          ▼
//!   Skip / Reject         Skip / Reject              Skip
//! ```
//!
//! Both lists short-circuit: the first failing `require` or the first holding
//! `ignore` ends evaluation, and no later guard is asked. A collaborator error
//! counts as "guard does not hold" and is logged; it never reaches the host.

use super::context::EvaluationContext;
use super::metrics::SkipReason;
use crate::host::Collaborators;
use crate::{Guard, Rule, Template};
use tracing::{debug, warn};

#[derive(Debug)]
pub(crate) enum GuardOutcome<'r> {
    Applicable,
    Skip(SkipReason),
    /// A required permission with a denial message is missing. The rule
    /// still has to match before the message is sent.
    Reject(&'r Template),
}

pub(crate) fn check<'r>(rule: &'r Rule, ctx: &mut EvaluationContext<'_>, host: &Collaborators) -> GuardOutcome<'r> {
    for (index, guard) in rule.require.iter().enumerate() {
        if !holds(guard, rule, ctx, host) {
            debug!(rule = %rule.label(), guard = guard.keyword(), index, "require guard failed");
            if let Guard::Permission { message: Some(message), .. } = guard {
                return GuardOutcome::Reject(message);
            }
            return GuardOutcome::Skip(SkipReason::Required { guard: guard.keyword(), index });
        }
    }

    for (index, guard) in rule.ignore.iter().enumerate() {
        if holds(guard, rule, ctx, host) {
            debug!(rule = %rule.label(), guard = guard.keyword(), index, "ignore guard held");
            return GuardOutcome::Skip(SkipReason::Ignored { guard: guard.keyword(), index });
        }
    }

    GuardOutcome::Applicable
}

fn holds(guard: &Guard, rule: &Rule, ctx: &mut EvaluationContext<'_>, host: &Collaborators) -> bool {
    let event = ctx.event;
    let sender = &event.sender;

    let result = match guard {
        Guard::Permission { permission, .. } => host.permissions.has_permission(sender, permission),
        Guard::Server { names } => host.servers.current_server(sender).map(|current| {
            let current = current.unwrap_or_default();
            names.iter().any(|name| name.eq_ignore_ascii_case(&current))
        }),
        Guard::Script { expression } => {
            let resolved = ctx.render_str(expression, rule);
            host.scripts.evaluate(&resolved, sender)
        }
        Guard::PlayedBefore => host.history.has_played_before(sender),
    };

    match result {
        Ok(value) => value,
        Err(error) => {
            warn!(rule = %rule.label(), guard = guard.keyword(), error = %error, "guard check failed, treating as false");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use crate::host::{PermissionChecker, RecordingSink, StaticProfile};
    use crate::{Event, EventKinds, RuleSet, Sender, parse_rules};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn rule(text: &str) -> Rule {
        let set = RuleSet::compile(parse_rules("inline", text, EventKinds::all()).unwrap()).unwrap();
        set.iter().next().unwrap().clone()
    }

    fn outcome(rule: &Rule, host: &Collaborators) -> String {
        let event = Event::command(Sender::new("Steve"), "/op Steve");
        let mut ctx = EvaluationContext::new(&event, false);
        format!("{:?}", check(rule, &mut ctx, host))
    }

    /// Denies every permission and counts how often it was asked.
    #[derive(Default)]
    struct CountingDenyAll {
        calls: AtomicUsize,
    }

    impl PermissionChecker for CountingDenyAll {
        fn has_permission(&self, _sender: &Sender, _permission: &str) -> Result<bool, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        }
    }

    struct Failing;

    impl PermissionChecker for Failing {
        fn has_permission(&self, _sender: &Sender, _permission: &str) -> Result<bool, CollaboratorError> {
            Err(CollaboratorError::failed("permission store offline"))
        }
    }

    fn host_with(profile: StaticProfile) -> Collaborators {
        profile.into_collaborators(Arc::new(RecordingSink::default()))
    }

    #[test]
    fn require_guards_short_circuit_on_first_failure() {
        let counter = Arc::new(CountingDenyAll::default());
        let mut host = host_with(StaticProfile::default());
        host.permissions = counter.clone();

        let r = rule("match x\nrequire perm a\nrequire perm b\nrequire perm c\n");
        assert_eq!(outcome(&r, &host), "Skip(Required { guard: \"perm\", index: 0 })");
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ignore_guards_short_circuit_on_first_hit() {
        let host = host_with(StaticProfile::default().with_permission("b").on_server("Lobby"));
        let r = rule("match x\nignore perm a\nignore sender server lobby\nignore perm b\n");
        assert_eq!(outcome(&r, &host), "Skip(Ignored { guard: \"server\", index: 1 })");
    }

    #[test]
    fn server_guard_holds_for_any_listed_server() {
        let host = host_with(StaticProfile::default().on_server("survival"));
        let r = rule("match x\nrequire sender server lobby\nrequire sender server SURVIVAL\n");
        assert_eq!(r.require_guards().len(), 1);
        assert_eq!(outcome(&r, &host), "Applicable");

        let nowhere = host_with(StaticProfile::default());
        assert_eq!(outcome(&r, &nowhere), "Skip(Required { guard: \"server\", index: 0 })");
    }

    #[test]
    fn permission_guard_with_message_rejects() {
        let host = host_with(StaticProfile::default());
        let r = rule("match x\nrequire perm chat.op &cYou may not use {0}.\n");
        assert_eq!(outcome(&r, &host), "Reject(Template(\"&cYou may not use {0}.\"))");
    }

    #[test]
    fn scripts_see_resolved_placeholders() {
        let host = host_with(StaticProfile::default().with_script("'Steve' == 'Steve'", true));
        let r = rule("match x\nrequire sender script '{player}' == 'Steve'\n");
        assert_eq!(outcome(&r, &host), "Applicable");
    }

    #[test]
    fn collaborator_errors_count_as_false() {
        let mut host = host_with(StaticProfile::default());
        host.permissions = Arc::new(Failing);

        let required = rule("match x\nrequire perm a\n");
        assert_eq!(outcome(&required, &host), "Skip(Required { guard: \"perm\", index: 0 })");

        let ignored = rule("match x\nignore perm a\n");
        assert_eq!(outcome(&ignored, &host), "Applicable");
    }

    #[test]
    fn played_before_guards() {
        let veteran = host_with(StaticProfile::default().played_before(true));
        let newcomer = host_with(StaticProfile::default());
        let r = rule("match x\nignore playedbefore\n");
        assert_eq!(outcome(&r, &veteran), "Skip(Ignored { guard: \"playedbefore\", index: 0 })");
        assert_eq!(outcome(&r, &newcomer), "Applicable");
    }
}
