use crate::error::{ConfigError, ConfigErrorKind};
use crate::rules::{RuleSource, load_rule_file, parse_rules};
use crate::{Action, EventKinds, Guard, Normalization, RuleSet, Template};
use std::fs;

const PROXY_COMMANDS: &str = r"# ------------------------------------------------------------
# Proxy-level command rules.
# ------------------------------------------------------------

# Prevent /op command on the proxy
match ^/op\b
ignore perm chatcontrol.bypass.rules
name /op
then warn &cThis command is not allowed.
then deny

# Log proxy-level punishment commands for auditing
match ^/(ban|mute|kick|warn)\b
name punishment-audit
then log {player} executed proxy command: {original_message}
";

const PACKETS: &str = r"
match Hey! Sorry, but you can't drop items here\.
then rewrite &cYou cannot drop items in this area.

match Some annoying plugin message
then deny

match Welcome to the server
disabled
then rewrite &aWelcome to &bMy Awesome Server&a!
";

fn parse_err(text: &str) -> ConfigError {
    match parse_rules("test.rs", text, EventKinds::all()) {
        Ok(rules) => panic!("expected an error, parsed {} rules", rules.len()),
        Err(e) => e,
    }
}

#[test]
fn parses_proxy_command_rules() {
    let rules = parse_rules("command.rs", PROXY_COMMANDS, EventKinds::COMMAND).unwrap();
    assert_eq!(rules.len(), 2);

    let op = &rules[0];
    assert_eq!(op.name(), Some("/op"));
    assert_eq!(op.pattern(), r"^/op\b");
    assert_eq!(op.location().line, 6);
    assert_eq!(
        op.ignore_guards(),
        &[Guard::Permission { permission: "chatcontrol.bypass.rules".into(), message: None }]
    );
    assert_eq!(op.actions(), &[Action::Warn(Template::new("&cThis command is not allowed.")), Action::Deny]);
    assert_eq!(op.kinds(), EventKinds::COMMAND);

    let audit = &rules[1];
    assert_eq!(audit.name(), Some("punishment-audit"));
    assert_eq!(audit.actions(), &[Action::Log(Template::new("{player} executed proxy command: {original_message}"))]);
}

#[test]
fn parses_packet_rules() {
    let set = RuleSet::compile(parse_rules("packet.rs", PACKETS, EventKinds::PACKET).unwrap()).unwrap();
    assert_eq!(set.len(), 3);
    assert_eq!(set.enabled_count(), 2);

    let labels: Vec<&str> = set.iter().map(|r| r.label()).collect();
    assert_eq!(labels, vec!["#1", "#2", "#3"]);
    assert!(set.iter().nth(2).unwrap().is_disabled());
}

#[test]
fn accepts_long_and_short_guard_forms() {
    let text = "\
match .*
require sender perm a
require permission b Missing {0}
ignore sender permission c
ignore perm d
require sender script player.isOp()
ignore sender script {player} == 'Notch'
require playedbefore
ignore playedbefore
require sender server Lobby
ignore sender server pvp
require sender server Hub
";
    let rules = parse_rules("chat.rs", text, EventKinds::CHAT).unwrap();
    let rule = &rules[0];

    assert_eq!(
        rule.require_guards(),
        &[
            Guard::Permission { permission: "a".into(), message: None },
            Guard::Permission { permission: "b".into(), message: Some(Template::new("Missing {0}")) },
            Guard::Script { expression: "player.isOp()".into() },
            Guard::PlayedBefore,
            Guard::Server { names: vec!["Lobby".into(), "Hub".into()] },
        ]
    );
    assert_eq!(
        rule.ignore_guards(),
        &[
            Guard::Permission { permission: "c".into(), message: None },
            Guard::Permission { permission: "d".into(), message: None },
            Guard::Script { expression: "{player} == 'Notch'".into() },
            Guard::PlayedBefore,
            Guard::Server { names: vec!["pvp".into()] },
        ]
    );
}

#[test]
fn parses_every_action() {
    let text = "\
match (\\w+)
then deny
then rewrite {1}!
then warn Careful, {player}.
then command spawn
then proxy alert {player}
then log {message}
then kick Bye.
then discord moderation {player}: {message}
then write logs/chat.txt [{date}] {player}: {message}
then abort
";
    let rules = parse_rules("chat.rs", text, EventKinds::CHAT).unwrap();
    let keywords: Vec<&str> = rules[0].actions().iter().map(|a| a.keyword()).collect();
    assert_eq!(
        keywords,
        vec!["deny", "rewrite", "warn", "command", "proxy", "log", "kick", "discord", "write", "abort"]
    );
    assert_eq!(
        rules[0].actions()[8],
        Action::WriteFile { path: "logs/chat.txt".into(), line: Template::new("[{date}] {player}: {message}") }
    );
}

#[test]
fn strip_flags() {
    let text = "match a\nstrip colors TRUE\nstrip accents false\n\nmatch b\nstrip accents true\n";
    let rules = parse_rules("chat.rs", text, EventKinds::CHAT).unwrap();
    assert_eq!(rules[0].normalization(), Normalization::STRIP_COLORS);
    assert_eq!(rules[1].normalization(), Normalization::STRIP_ACCENTS);
}

#[test]
fn errors_carry_line_numbers() {
    let err = parse_err("match a\n\n# comment\nthne deny\n");
    assert_eq!(err.to_string(), "test.rs:4: unknown directive 'thne'");

    let err = parse_err("match a\nthen explode\n");
    assert!(matches!(err.kind(), Some(ConfigErrorKind::UnknownDirective { token }) if token == "then explode"));
    assert_eq!(err.line(), Some(2));
}

#[test]
fn directives_before_match_are_rejected() {
    let err = parse_err("name orphan\nmatch a\n");
    assert_eq!(err.line(), Some(1));
    assert!(matches!(err.kind(), Some(ConfigErrorKind::OutsideRule { directive }) if directive == "name"));
}

#[test]
fn missing_and_unexpected_arguments() {
    let err = parse_err("match\n");
    assert!(matches!(err.kind(), Some(ConfigErrorKind::MissingArgument { directive: "match" })));

    let err = parse_err("match a\nthen warn\n");
    assert!(matches!(err.kind(), Some(ConfigErrorKind::MissingArgument { directive: "then warn" })));

    let err = parse_err("match a\nrequire perm\n");
    assert!(matches!(err.kind(), Some(ConfigErrorKind::MissingArgument { directive: "require perm" })));

    let err = parse_err("match a\nthen abort now\n");
    assert!(matches!(err.kind(), Some(ConfigErrorKind::UnexpectedArgument { directive: "then abort", .. })));

    let err = parse_err("match a\ndisabled yes\n");
    assert!(matches!(err.kind(), Some(ConfigErrorKind::UnexpectedArgument { directive: "disabled", .. })));
}

#[test]
fn invalid_booleans_and_duplicates() {
    let err = parse_err("match a\nstrip colors maybe\n");
    assert!(matches!(
        err.kind(),
        Some(ConfigErrorKind::InvalidBoolean { directive: "strip colors", value }) if value == "maybe"
    ));

    let err = parse_err("match a\nstrip accents true\nstrip accents false\n");
    assert_eq!(err.line(), Some(3));
    assert!(matches!(err.kind(), Some(ConfigErrorKind::DuplicateDirective { directive: "strip accents" })));

    let err = parse_err("match a\nname x\nname y\n");
    assert!(matches!(err.kind(), Some(ConfigErrorKind::DuplicateDirective { directive: "name" })));
}

#[test]
fn invalid_patterns_name_the_rule() {
    let err = parse_err("match ok\n\nmatch ([a-\nname broken\nthen deny\n");
    assert_eq!(err.line(), Some(3));
    assert!(matches!(err.kind(), Some(ConfigErrorKind::InvalidPattern { rule, .. }) if rule == "'broken'"));
    assert!(err.to_string().starts_with("test.rs:3: rule 'broken' has an invalid pattern"));
}

#[test]
fn loads_files_and_infers_kinds() {
    let dir = tempfile::tempdir().unwrap();
    let command = dir.path().join("command.rs");
    let global = dir.path().join("global.rs");
    fs::write(&command, PROXY_COMMANDS).unwrap();
    fs::write(&global, "match .*\nthen log seen\n").unwrap();

    let source = RuleSource::from_path(&command);
    assert_eq!(source.kinds, EventKinds::COMMAND);
    let rules = load_rule_file(&source).unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].location().origin, command.display().to_string());

    assert_eq!(RuleSource::from_path(&global).kinds, EventKinds::all());
    assert_eq!(RuleSource::from_path(dir.path().join("packet.rs")).kinds, EventKinds::PACKET);
    assert_eq!(RuleSource::from_path(dir.path().join("chat.rs")).kinds, EventKinds::CHAT);
}

#[test]
fn missing_files_are_io_errors() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_rule_file(&RuleSource::from_path(dir.path().join("chat.rs"))).unwrap_err();

    assert!(matches!(err, ConfigError::Io { .. }));
    assert_eq!(err.line(), None);
    assert!(err.to_string().contains("chat.rs"));
}
