use crate::engine::{CompiledPattern, EventKinds, Normalization};
use crate::error::{ConfigError, ConfigErrorKind, Location};
use crate::{Action, Guard, Rule, Template};

/// Parse the rule blocks in `text`.
///
/// `origin` names the source in errors and rule locations (usually the file
/// path). Every parsed rule applies to `kinds`. The first problem found stops
/// parsing; nothing from a file with an error is returned.
pub fn parse_rules(origin: &str, text: &str, kinds: EventKinds) -> Result<Vec<Rule>, ConfigError> {
    let mut rules = Vec::new();
    let mut current: Option<PendingRule> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fail = |kind| ConfigError::at(origin, line_no, kind);
        let (keyword, rest) = split_word(line);

        if keyword == "match" {
            if rest.is_empty() {
                return Err(fail(ConfigErrorKind::MissingArgument { directive: "match" }));
            }
            if let Some(done) = current.take() {
                rules.push(done.finish(origin, kinds)?);
            }
            current = Some(PendingRule::new(line_no, rest));
            continue;
        }

        let Some(rule) = current.as_mut() else {
            let directive = match keyword {
                "name" | "require" | "ignore" | "strip" | "then" | "disabled" => keyword.to_string(),
                _ => return Err(fail(ConfigErrorKind::UnknownDirective { token: keyword.to_string() })),
            };
            return Err(fail(ConfigErrorKind::OutsideRule { directive }));
        };

        match keyword {
            "name" => {
                if rest.is_empty() {
                    return Err(fail(ConfigErrorKind::MissingArgument { directive: "name" }));
                }
                if rule.name.is_some() {
                    return Err(fail(ConfigErrorKind::DuplicateDirective { directive: "name" }));
                }
                rule.name = Some(rest.to_string());
            }
            "require" => {
                let guard = parse_guard(GuardList::Require, rest).map_err(fail)?;
                add_guard(&mut rule.require, guard);
            }
            "ignore" => {
                let guard = parse_guard(GuardList::Ignore, rest).map_err(fail)?;
                add_guard(&mut rule.ignore, guard);
            }
            "strip" => parse_strip(rule, rest).map_err(fail)?,
            "then" => rule.actions.push(parse_action(rest).map_err(fail)?),
            "disabled" => {
                if !rest.is_empty() {
                    return Err(fail(ConfigErrorKind::UnexpectedArgument {
                        directive: "disabled",
                        token: rest.to_string(),
                    }));
                }
                rule.disabled = true;
            }
            _ => return Err(fail(ConfigErrorKind::UnknownDirective { token: keyword.to_string() })),
        }
    }

    if let Some(done) = current.take() {
        rules.push(done.finish(origin, kinds)?);
    }
    Ok(rules)
}

/// A rule block whose directives are still being read.
#[derive(Debug)]
struct PendingRule {
    line: usize,
    pattern: String,
    name: Option<String>,
    require: Vec<Guard>,
    ignore: Vec<Guard>,
    strip_colors: Option<bool>,
    strip_accents: Option<bool>,
    actions: Vec<Action>,
    disabled: bool,
}

impl PendingRule {
    fn new(line: usize, pattern: &str) -> Self {
        PendingRule {
            line,
            pattern: pattern.to_string(),
            name: None,
            require: Vec::new(),
            ignore: Vec::new(),
            strip_colors: None,
            strip_accents: None,
            actions: Vec::new(),
            disabled: false,
        }
    }

    fn finish(self, origin: &str, kinds: EventKinds) -> Result<Rule, ConfigError> {
        let pattern = CompiledPattern::new(&self.pattern).map_err(|e| {
            let rule = match &self.name {
                Some(name) => format!("'{name}'"),
                None => format!("'{}'", self.pattern),
            };
            ConfigError::at(origin, self.line, ConfigErrorKind::InvalidPattern { rule, source: Box::new(e) })
        })?;

        let mut normalization = Normalization::empty();
        normalization.set(Normalization::STRIP_COLORS, self.strip_colors.unwrap_or(false));
        normalization.set(Normalization::STRIP_ACCENTS, self.strip_accents.unwrap_or(false));

        Ok(Rule {
            label: self.name.clone().unwrap_or_default(),
            name: self.name,
            ordinal: 0,
            pattern,
            require: self.require,
            ignore: self.ignore,
            normalization,
            actions: self.actions,
            disabled: self.disabled,
            kinds,
            location: Location { origin: origin.to_string(), line: self.line },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuardList {
    Require,
    Ignore,
}

/// Directive names used in error messages.
fn guard_directive(list: GuardList, guard: &str) -> &'static str {
    match (list, guard) {
        (GuardList::Require, "perm") => "require perm",
        (GuardList::Require, "server") => "require sender server",
        (GuardList::Require, "script") => "require sender script",
        (GuardList::Require, "playedbefore") => "require playedbefore",
        (GuardList::Require, _) => "require",
        (GuardList::Ignore, "perm") => "ignore perm",
        (GuardList::Ignore, "server") => "ignore sender server",
        (GuardList::Ignore, "script") => "ignore sender script",
        (GuardList::Ignore, "playedbefore") => "ignore playedbefore",
        (GuardList::Ignore, _) => "ignore",
    }
}

fn parse_guard(list: GuardList, rest: &str) -> Result<Guard, ConfigErrorKind> {
    let prefix = match list {
        GuardList::Require => "require",
        GuardList::Ignore => "ignore",
    };

    let (word, args) = split_word(rest);
    let (subject, args, sender_form) = if word == "sender" {
        let (subject, args) = split_word(args);
        (subject, args, true)
    } else {
        (word, args, false)
    };

    match subject {
        "" => Err(ConfigErrorKind::MissingArgument { directive: guard_directive(list, "") }),
        "perm" | "permission" => {
            let (permission, message) = split_word(args);
            if permission.is_empty() {
                return Err(ConfigErrorKind::MissingArgument { directive: guard_directive(list, "perm") });
            }
            let message = match list {
                GuardList::Require if !message.is_empty() => Some(Template::new(message)),
                GuardList::Require => None,
                GuardList::Ignore if !message.is_empty() => {
                    return Err(ConfigErrorKind::UnexpectedArgument {
                        directive: guard_directive(list, "perm"),
                        token: message.to_string(),
                    });
                }
                GuardList::Ignore => None,
            };
            Ok(Guard::Permission { permission: permission.to_string(), message })
        }
        "server" if sender_form => {
            let (server, extra) = split_word(args);
            if server.is_empty() {
                return Err(ConfigErrorKind::MissingArgument { directive: guard_directive(list, "server") });
            }
            if !extra.is_empty() {
                return Err(ConfigErrorKind::UnexpectedArgument {
                    directive: guard_directive(list, "server"),
                    token: extra.to_string(),
                });
            }
            Ok(Guard::Server { names: vec![server.to_string()] })
        }
        "script" if sender_form => {
            if args.is_empty() {
                return Err(ConfigErrorKind::MissingArgument { directive: guard_directive(list, "script") });
            }
            Ok(Guard::Script { expression: args.to_string() })
        }
        "playedbefore" if !sender_form => {
            if !args.is_empty() {
                return Err(ConfigErrorKind::UnexpectedArgument {
                    directive: guard_directive(list, "playedbefore"),
                    token: args.to_string(),
                });
            }
            Ok(Guard::PlayedBefore)
        }
        other => {
            let token = if sender_form { format!("{prefix} sender {other}") } else { format!("{prefix} {other}") };
            Err(ConfigErrorKind::UnknownDirective { token })
        }
    }
}

/// Server names of one rule and list form a single guard.
fn add_guard(guards: &mut Vec<Guard>, guard: Guard) {
    if let Guard::Server { names } = &guard {
        let existing = guards.iter_mut().find_map(|g| match g {
            Guard::Server { names } => Some(names),
            _ => None,
        });
        if let Some(existing) = existing {
            existing.extend(names.iter().cloned());
            return;
        }
    }
    guards.push(guard);
}

fn parse_strip(rule: &mut PendingRule, rest: &str) -> Result<(), ConfigErrorKind> {
    let (what, value) = split_word(rest);
    let (directive, slot) = match what {
        "colors" => ("strip colors", &mut rule.strip_colors),
        "accents" => ("strip accents", &mut rule.strip_accents),
        "" => return Err(ConfigErrorKind::MissingArgument { directive: "strip" }),
        other => return Err(ConfigErrorKind::UnknownDirective { token: format!("strip {other}") }),
    };

    if value.is_empty() {
        return Err(ConfigErrorKind::MissingArgument { directive });
    }
    if slot.is_some() {
        return Err(ConfigErrorKind::DuplicateDirective { directive });
    }
    *slot = Some(parse_bool(directive, value)?);
    Ok(())
}

fn parse_bool(directive: &'static str, value: &str) -> Result<bool, ConfigErrorKind> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ConfigErrorKind::InvalidBoolean { directive, value: value.to_string() })
    }
}

fn parse_action(rest: &str) -> Result<Action, ConfigErrorKind> {
    let (verb, args) = split_word(rest);

    let template = |directive: &'static str| {
        if args.is_empty() {
            Err(ConfigErrorKind::MissingArgument { directive })
        } else {
            Ok(Template::new(args))
        }
    };
    let no_args = |directive: &'static str, action: Action| {
        if args.is_empty() {
            Ok(action)
        } else {
            Err(ConfigErrorKind::UnexpectedArgument { directive, token: args.to_string() })
        }
    };
    let target_and_template = |directive: &'static str| {
        let (target, text) = split_word(args);
        if target.is_empty() || text.is_empty() {
            Err(ConfigErrorKind::MissingArgument { directive })
        } else {
            Ok((target.to_string(), Template::new(text)))
        }
    };

    match verb {
        "" => Err(ConfigErrorKind::MissingArgument { directive: "then" }),
        "deny" => no_args("then deny", Action::Deny),
        "abort" => no_args("then abort", Action::Abort),
        "rewrite" => template("then rewrite").map(Action::Rewrite),
        "warn" => template("then warn").map(Action::Warn),
        "command" => template("then command").map(Action::RunCommand),
        "proxy" => template("then proxy").map(Action::RunProxyCommand),
        "log" => template("then log").map(Action::Log),
        "kick" => template("then kick").map(Action::Kick),
        "discord" => target_and_template("then discord").map(|(channel, message)| Action::Discord { channel, message }),
        "write" => target_and_template("then write").map(|(path, line)| Action::WriteFile { path, line }),
        other => Err(ConfigErrorKind::UnknownDirective { token: format!("then {other}") }),
    }
}

/// Split off the first whitespace-delimited word; the remainder is trimmed
/// at the start only, so template text keeps its inner spacing.
fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}
