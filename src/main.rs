use std::collections::{BTreeMap, HashMap};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use miette::{IntoDiagnostic, Result, WrapErr};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use truechurn_core::{ChurnConfig, ChurnError, ChurnResult, OutputFormat, Window, DEFAULT_CONFIG_FILE};
use truechurn_gitpulse::{
    churn_for_author, list_authors, sync_repository, AuthorPattern, MiningOptions, RepoSource,
};
use truechurn_ledger::{aggregate, plan_units, AggregateResult, Unit, UnitFailure, UnitOutcome};

const ALL_AUTHORS: &str = "ALL";

#[derive(Parser)]
#[command(
    name = "truechurn",
    version,
    about = "True code churn: first-time contribution versus rework of recent lines",
    long_about = "truechurn replays each author's commits inside a date window and splits\n\
                   the changed lines into contribution (lines the author touches for the first\n\
                   time in the window) and churn (lines the author already touched in it).\n\n\
                   Running without a subcommand is the same as `truechurn report`.\n\n\
                   Examples:\n  \
                     truechurn --author alice                     Churn for one author in the current repo\n  \
                     truechurn --author ALL --after 2024-01-01    Every author since January\n  \
                     truechurn --dir ../service --format json     Alias map from .truechurn.toml, JSON output\n  \
                     truechurn init                               Create a .truechurn.toml config file",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    report: ReportArgs,

    /// Path to configuration file (default: .truechurn.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable table (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown table"
    )]
    format: OutputFormat,

    /// Enable verbose output (debug logging)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Compute contribution and churn per author
    #[command(long_about = "Compute contribution and churn per author.\n\n\
        Authors come from --author (a raw author string matched within `Name <email>`,\n\
        or ALL for every author in the history) or from the [aliases] table of the\n\
        config file, which credits several raw author strings to one name. With\n\
        --regex those strings are regular expressions instead.\n\n\
        Examples:\n  truechurn report --author alice --after 2020-05-20 --before 2020-05-30\n  truechurn report --author ALL --dir ../service\n  truechurn report --no-sync --format markdown")]
    Report(ReportArgs),
    /// Create a default .truechurn.toml configuration file
    #[command(long_about = "Create a default .truechurn.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .truechurn.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args, Clone, Default)]
struct ReportArgs {
    /// Only count commits on or after this date (YYYY-MM-DD)
    #[arg(long)]
    after: Option<String>,

    /// Only count commits before this date (YYYY-MM-DD)
    #[arg(long)]
    before: Option<String>,

    /// Author to analyze, or ALL for every author in the history
    #[arg(
        long,
        long_help = "Author to analyze.\n\n\
            Matched as plain text anywhere in `Name <email>` (see --regex). Pass ALL to\n\
            analyze every author found in each repository. Overrides the config alias map."
    )]
    author: Option<String>,

    /// Repository directory to analyze (default: configured repositories, else .)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Use existing checkouts of configured repositories without fetching
    #[arg(long)]
    no_sync: bool,

    /// Branch to walk instead of HEAD
    #[arg(long)]
    branch: Option<String>,

    /// Treat --author and alias strings as regular expressions
    #[arg(long)]
    regex: bool,
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

const DEFAULT_CONFIG: &str = r#"# truechurn configuration

# Clone URLs or local paths. Remote repositories are cloned into `workdir`
# and fast-forwarded on every run unless --no-sync is given.
# repositories = ["git@github.com:acme/widgets.git", "../gadgets"]
# workdir = "."

# Canonical author name -> raw author strings as they appear in `git log`.
# Every raw string is matched as plain text within "Name <email>"; pass
# --regex to treat them as regular expressions.
[aliases]
# "Jane Doe" = ["jane", "jdoe@users.noreply.github.com"]

[window]
# after = "2020-05-20"
# before = "2020-05-30"

[history]
# branch = "main"
"#;

/// A repository ready to be analyzed, or the reason it is not.
struct Target {
    label: String,
    dir: std::result::Result<PathBuf, String>,
}

/// One unit of work for the thread pool.
struct Job {
    unit: Unit,
    dir: PathBuf,
    pattern: AuthorPattern,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    window: Window,
    repositories: Vec<&'a str>,
    authors: &'a BTreeMap<String, ChurnResult>,
    total: ChurnResult,
    failures: &'a [UnitFailure],
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    match cli.command {
        None => {
            let config = load_config(cli.config.as_deref())?;
            run_report(&cli.report, &config, cli.format, use_color)?;
        }
        Some(Command::Report(ref args)) => {
            let config = load_config(cli.config.as_deref())?;
            run_report(args, &config, cli.format, use_color)?;
        }
        Some(Command::Init) => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                miette::bail!("{DEFAULT_CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {DEFAULT_CONFIG_FILE} with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "truechurn", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn load_config(explicit: Option<&Path>) -> Result<ChurnConfig> {
    let config = match explicit {
        Some(path) => ChurnConfig::from_file(path)
            .wrap_err_with(|| format!("loading {}", path.display()))?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                ChurnConfig::from_file(default_path)
                    .wrap_err_with(|| format!("loading {DEFAULT_CONFIG_FILE}"))?
            } else {
                ChurnConfig::default()
            }
        }
    };
    Ok(config)
}

fn run_report(
    args: &ReportArgs,
    config: &ChurnConfig,
    format: OutputFormat,
    use_color: bool,
) -> Result<()> {
    let window = Window::parse(
        args.after.as_deref().or(config.window.after.as_deref()),
        args.before.as_deref().or(config.window.before.as_deref()),
    )?;
    let options = MiningOptions {
        branch: args.branch.clone().or_else(|| config.history.branch.clone()),
    };

    let authors = match args.author.as_deref() {
        Some(ALL_AUTHORS) => None,
        Some(author) => Some(BTreeMap::from([(
            author.to_string(),
            vec![author.to_string()],
        )])),
        None if !config.aliases.is_empty() => Some(config.aliases.clone()),
        None => {
            return Err(miette::miette!(
                help = "pass --author <name>, --author ALL, or add an [aliases] table to the config file",
                "no authors to analyze"
            ));
        }
    };

    let targets = prepare_targets(args, config);
    debug!(%window, repositories = targets.len(), "starting report");

    let (jobs, mut outcomes) = match authors {
        Some(aliases) => plan_alias_jobs(&aliases, &targets, args.regex),
        None => plan_all_author_jobs(&targets, &options),
    };
    let planned = jobs.len() + outcomes.len();

    let progress = if std::io::stderr().is_terminal() && !jobs.is_empty() {
        let pb = ProgressBar::new(jobs.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.set_message("replaying history");
        Some(pb)
    } else {
        None
    };

    outcomes.par_extend(jobs.into_par_iter().map(|job| {
        let outcome = churn_for_author(&job.dir, &job.pattern, &window, &options).map(|run| {
            if !run.skipped().is_empty() {
                warn!(
                    alias = %job.unit.alias,
                    repository = %job.unit.repository,
                    skipped = run.skipped().len(),
                    "some commits could not be parsed and were left out"
                );
            }
            run.result()
        });
        if let Some(pb) = &progress {
            pb.inc(1);
        }
        job.unit.finish(outcome)
    }));

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let result = aggregate(outcomes);
    let labels: Vec<&str> = targets.iter().map(|t| t.label.as_str()).collect();
    print_report(&result, &window, &labels, format, use_color)?;

    if planned > 0 && result.failures.len() == planned {
        miette::bail!("churn could not be calculated for any author");
    }
    Ok(())
}

fn prepare_targets(args: &ReportArgs, config: &ChurnConfig) -> Vec<Target> {
    if let Some(dir) = &args.dir {
        return vec![Target {
            label: dir.display().to_string(),
            dir: Ok(dir.clone()),
        }];
    }
    if config.repositories.is_empty() {
        return vec![Target {
            label: ".".to_string(),
            dir: Ok(PathBuf::from(".")),
        }];
    }

    config
        .repositories
        .iter()
        .map(|entry| {
            let source = RepoSource::resolve(entry, &config.workdir);
            let dir = sync_repository(&source, !args.no_sync).map_err(|e| {
                warn!(repository = %entry, error = %e, "repository unavailable");
                e.to_string()
            });
            if let Ok(path) = &dir {
                info!(repository = %entry, dir = %path.display(), "repository ready");
            }
            Target {
                label: entry.clone(),
                dir,
            }
        })
        .collect()
}

fn plan_alias_jobs(
    aliases: &BTreeMap<String, Vec<String>>,
    targets: &[Target],
    regex: bool,
) -> (Vec<Job>, Vec<UnitOutcome>) {
    let dirs: HashMap<&str, &std::result::Result<PathBuf, String>> =
        targets.iter().map(|t| (t.label.as_str(), &t.dir)).collect();
    let labels: Vec<String> = targets.iter().map(|t| t.label.clone()).collect();

    let mut jobs = Vec::new();
    let mut failed = Vec::new();
    for unit in plan_units(aliases, &labels) {
        match dirs.get(unit.repository.as_str()) {
            Some(Ok(dir)) => {
                let pattern = if regex {
                    AuthorPattern::regex(&unit.alias)
                } else {
                    Ok(AuthorPattern::new(&unit.alias))
                };
                match pattern {
                    Ok(pattern) => jobs.push(Job {
                        dir: dir.clone(),
                        pattern,
                        unit,
                    }),
                    Err(e) => failed.push(unit.finish(Err(e))),
                }
            }
            Some(Err(reason)) => failed.push(unit.finish(Err(unavailable(reason)))),
            None => {}
        }
    }
    (jobs, failed)
}

fn plan_all_author_jobs(targets: &[Target], options: &MiningOptions) -> (Vec<Job>, Vec<UnitOutcome>) {
    let mut jobs = Vec::new();
    let mut failed = Vec::new();
    for target in targets {
        let listed = match &target.dir {
            Ok(dir) => list_authors(dir, options).map(|names| (dir, names)),
            Err(reason) => Err(unavailable(reason)),
        };
        match listed {
            Ok((dir, names)) => {
                debug!(repository = %target.label, authors = names.len(), "authors listed");
                jobs.extend(names.into_iter().map(|name| Job {
                    pattern: AuthorPattern::exact_name(&name),
                    unit: Unit::new(name.clone(), name, target.label.clone()),
                    dir: dir.clone(),
                }));
            }
            Err(e) => {
                failed.push(Unit::new(ALL_AUTHORS, ALL_AUTHORS, target.label.clone()).finish(Err(e)));
            }
        }
    }
    (jobs, failed)
}

fn unavailable(reason: &str) -> ChurnError {
    ChurnError::Git(format!("repository unavailable: {reason}"))
}

fn print_report(
    result: &AggregateResult,
    window: &Window,
    repositories: &[&str],
    format: OutputFormat,
    use_color: bool,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let report = Report {
                window: *window,
                repositories: repositories.to_vec(),
                authors: &result.authors,
                total: result.total(),
                failures: &result.failures,
            };
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
        OutputFormat::Markdown => print_markdown(result, window, repositories),
        OutputFormat::Text => print_text(result, window, repositories, use_color),
    }
    Ok(())
}

fn print_text(result: &AggregateResult, window: &Window, repositories: &[&str], use_color: bool) {
    let (bold, red, dim, reset) = if use_color {
        ("\x1b[1m", "\x1b[31m", "\x1b[2m", "\x1b[0m")
    } else {
        ("", "", "", "")
    };

    println!("{dim}Window:{reset} {window}");
    println!("{dim}Repositories:{reset} {}\n", repositories.join(", "));

    if result.is_empty() {
        println!("No activity in window.");
    } else {
        let width = result
            .authors
            .keys()
            .map(|name| name.chars().count())
            .max()
            .unwrap_or(0)
            .max("AUTHOR".len());

        println!("{bold}{:<width$}  {:>12}  {:>8}{reset}", "AUTHOR", "CONTRIBUTION", "CHURN");
        for (name, totals) in &result.authors {
            println!("{name:<width$}  {:>12}  {:>8}", totals.contribution, totals.churn);
        }
        if result.authors.len() > 1 {
            let total = result.total();
            println!(
                "{bold}{:<width$}  {:>12}  {:>8}{reset}",
                "TOTAL", total.contribution, total.churn
            );
        }
    }

    if !result.failures.is_empty() {
        println!("\n{red}{bold}Failures:{reset}");
        for failure in &result.failures {
            println!(
                "  {red}{}{reset} ({}) in {}: {}",
                failure.canonical, failure.alias, failure.repository, failure.error
            );
        }
    }
}

fn print_markdown(result: &AggregateResult, window: &Window, repositories: &[&str]) {
    println!("# True Churn\n");
    println!("**Window:** {window}  ");
    println!("**Repositories:** {}\n", repositories.join(", "));

    if result.is_empty() {
        println!("No activity in window.");
    } else {
        println!("| Author | Contribution | Churn |");
        println!("|--------|-------------:|------:|");
        for (name, totals) in &result.authors {
            println!("| {name} | {} | {} |", totals.contribution, totals.churn);
        }
        if result.authors.len() > 1 {
            let total = result.total();
            println!("| **Total** | **{}** | **{}** |", total.contribution, total.churn);
        }
    }

    if !result.failures.is_empty() {
        println!("\n## Failures\n");
        for failure in &result.failures {
            println!(
                "- **{}** (`{}`) in `{}`: {}",
                failure.canonical, failure.alias, failure.repository, failure.error
            );
        }
    }
}
