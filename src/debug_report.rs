use chatguard::{Evaluation, Event, RuleOutcome, RuleSet, SinkCall, SkipReason, Verdict};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_run(event: &Event, evaluation: &Evaluation, calls: &[SinkCall], rule_set: &RuleSet, color: bool) {
    let palette = ansi::Palette::new(color);
    let details = &evaluation.details;
    println!(
        "\n{}",
        palette.bold(palette.paint(
            format!("⚙  Evaluating {} from {}: \"{}\"", event.kind.name(), event.sender.name, event.text),
            ansi::CYAN
        ))
    );

    println!("\n{}", palette.paint("━━━ Rules ━━━", ansi::GRAY));
    if details.rules.is_empty() {
        println!("{}", palette.dim(format!("  No rules apply to {} events", event.kind.name())));
        println!(
            "\n{}",
            palette.dim(format!(
                "  Loaded: {} rules ({} enabled). Rule files named command/packet/chat only apply to that kind.",
                rule_set.len(),
                rule_set.enabled_count()
            ))
        );
    } else {
        for trace in &details.rules {
            println!(
                "  {} {} {} {}",
                palette.paint(format!("[{}]", trace.ordinal), ansi::GRAY),
                palette.paint(&trace.rule, ansi::BLUE),
                fmt_outcome(&trace.outcome, &palette),
                palette.dim(format!("{:?}", trace.duration)),
            );
        }
    }

    println!("\n{}", palette.paint("━━━ Side effects ━━━", ansi::GRAY));
    if calls.is_empty() {
        println!("{}", palette.dim("  None"));
    } else {
        for call in calls {
            println!("  {} {}", palette.paint("→", ansi::YELLOW), call);
        }
    }

    println!("\n{}", palette.paint("━━━ Verdict ━━━", ansi::GRAY));
    println!("  {}", fmt_verdict(&evaluation.verdict, &palette));

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!(
        "  Total: {}  │  Considered: {}  │  Matched: {}  │  Generation: {}",
        palette.paint(format!("{:?}", details.total), ansi::GREEN),
        palette.paint(details.rules_considered.to_string(), ansi::CYAN),
        palette.paint(details.rules_matched.to_string(), ansi::CYAN),
        palette.dim(details.generation.to_string()),
    );
    println!();
}

fn fmt_outcome(outcome: &RuleOutcome, palette: &ansi::Palette) -> String {
    match outcome {
        RuleOutcome::Disabled => palette.dim("disabled"),
        RuleOutcome::Skipped(SkipReason::Required { guard, index }) => {
            palette.paint(format!("skipped: require {guard} (#{}) failed", index + 1), ansi::YELLOW)
        }
        RuleOutcome::Skipped(SkipReason::Ignored { guard, index }) => {
            palette.paint(format!("skipped: ignore {guard} (#{}) held", index + 1), ansi::YELLOW)
        }
        RuleOutcome::NoMatch => palette.dim("✗ no match"),
        RuleOutcome::Matched { actions_run, failed_actions, aborted } => {
            let mut text = format!("✓ matched, {actions_run} actions");
            if *failed_actions > 0 {
                text.push_str(&format!(", {failed_actions} failed"));
            }
            if *aborted {
                text.push_str(", aborted");
            }
            palette.paint(text, ansi::GREEN)
        }
        RuleOutcome::Rejected => palette.paint("✓ matched, missing permission", ansi::RED),
    }
}

fn fmt_verdict(verdict: &Verdict, palette: &ansi::Palette) -> String {
    match verdict {
        Verdict::Allow => palette.bold(palette.paint("ALLOW", ansi::GREEN)),
        Verdict::Rewrite(text) => {
            format!("{} {}", palette.bold(palette.paint("REWRITE", ansi::CYAN)), palette.paint(text, ansi::CYAN))
        }
        Verdict::Deny { reason: Some(reason) } => {
            format!("{} {}", palette.bold(palette.paint("DENY", ansi::RED)), palette.dim(format!("({reason})")))
        }
        Verdict::Deny { reason: None } => palette.bold(palette.paint("DENY", ansi::RED)),
    }
}
