mod debug_report;

use anyhow::{Context, Result};
use chatguard::{
    ConfigError, Engine, Event, EventKind, Options, RecordingSink, RewriteMode, RuleSource, Sender, StaticProfile,
};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (`EnvFilter` syntax).
const LOG_ENV: &str = "CHATGUARD_LOG";

#[derive(Parser, Debug)]
#[command(name = "chatguard")]
#[command(version, about = "Dry-run moderation rule files against a chat line, packet or command")]
struct Args {
    /// Rule file to load; repeat to load several in order.
    #[arg(short, long = "rules", value_name = "FILE", required = true)]
    rules: Vec<PathBuf>,

    /// Pipeline the input was intercepted from.
    #[arg(long, value_enum, default_value_t = KindArg::Chat)]
    kind: KindArg,

    /// Sender display name.
    #[arg(long, default_value = "Player")]
    player: String,

    /// Permission the sender holds; repeatable.
    #[arg(long = "perm", value_name = "PERMISSION")]
    perms: Vec<String>,

    /// Server the sender is connected to.
    #[arg(long, value_name = "NAME")]
    server: Option<String>,

    /// The sender has joined before.
    #[arg(long)]
    played_before: bool,

    /// Result of a script guard expression, after placeholders are resolved.
    #[arg(long = "script", value_name = "EXPR=BOOL", value_parser = parse_script)]
    scripts: Vec<(String, bool)>,

    /// Keep evaluating rules after one denies the event.
    #[arg(long)]
    keep_going: bool,

    /// Match every rule against the original text; the last rewrite wins.
    #[arg(long)]
    last_rewrite_wins: bool,

    /// Log every rule decision and unresolved placeholder.
    #[arg(short, long)]
    verbose: bool,

    /// Force ANSI color output.
    #[arg(long, conflicts_with = "no_color")]
    color: bool,

    /// Disable ANSI color output.
    #[arg(long)]
    no_color: bool,

    /// Text to evaluate. Reads stdin, one event per line, when omitted.
    input: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Chat,
    Command,
    Packet,
}

impl From<KindArg> for EventKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Chat => EventKind::Chat,
            KindArg::Command => EventKind::Command,
            KindArg::Packet => EventKind::Packet,
        }
    }
}

fn parse_script(value: &str) -> Result<(String, bool), String> {
    let (expr, result) = value.rsplit_once('=').ok_or_else(|| format!("expected EXPR=BOOL, got '{value}'"))?;
    let result =
        result.trim().parse::<bool>().map_err(|_| format!("expected true or false after '=', got '{result}'"))?;
    Ok((expr.trim().to_string(), result))
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            if err.downcast_ref::<ConfigError>().is_some() { ExitCode::from(2) } else { ExitCode::FAILURE }
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "chatguard=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).with_target(false).init();
}

fn run(args: Args) -> Result<()> {
    let inputs = read_inputs(&args.input)?;
    if inputs.is_empty() {
        Args::command().error(ErrorKind::MissingRequiredArgument, "no input provided").exit();
    }

    let color = if args.color {
        true
    } else if args.no_color {
        false
    } else {
        io::stdout().is_terminal()
    };

    let mut profile = StaticProfile::default().played_before(args.played_before);
    for perm in &args.perms {
        profile = profile.with_permission(perm.as_str());
    }
    if let Some(server) = &args.server {
        profile = profile.on_server(server.as_str());
    }
    for (expr, result) in &args.scripts {
        profile = profile.with_script(expr.as_str(), *result);
    }

    let options = Options {
        verbose: args.verbose,
        stop_on_deny: !args.keep_going,
        rewrite_mode: if args.last_rewrite_wins { RewriteMode::LastWins } else { RewriteMode::Cumulative },
    };

    let sink = Arc::new(RecordingSink::default());
    let engine = Engine::new(profile.into_collaborators(sink.clone()), options);
    let sources: Vec<RuleSource> = args.rules.iter().map(RuleSource::from_path).collect();
    let rule_set = engine.reload(&sources)?;

    let sender = Sender::new(args.player.as_str());
    for bytes in inputs {
        let event = Event::from_utf8_lossy(args.kind.into(), sender.clone(), &bytes);
        let evaluation = engine.evaluate_verbose(&event);
        debug_report::print_run(&event, &evaluation, &sink.take(), &rule_set, color);
    }
    Ok(())
}

/// Raw event texts: the joined arguments, or one entry per non-blank stdin line.
fn read_inputs(args: &[String]) -> Result<Vec<Vec<u8>>> {
    if !args.is_empty() {
        let text = args.join(" ");
        return Ok(if text.trim().is_empty() { Vec::new() } else { vec![text.into_bytes()] });
    }

    let mut bytes = Vec::new();
    io::stdin().read_to_end(&mut bytes).context("failed to read stdin")?;
    Ok(bytes
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.trim_ascii().is_empty())
        .map(<[u8]>::to_vec)
        .collect())
}
