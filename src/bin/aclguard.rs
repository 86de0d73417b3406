//! Administrative CLI: count and replace ACEs in a JSON fixture store.
use std::path::PathBuf;

use aclguard_core::{
    Ace, AceCount, AceUpdateReport, AclGuard, GuardConfig, MemoryIndex, MemoryStore,
};
use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{EnvFilter, Registry, fmt as subscriber_fmt, prelude::*};

#[derive(Debug, Parser)]
#[command(
    name = "aclguard",
    version,
    about = "Count and rewrite ACL entries across document types",
    long_about = None
)]
struct Cli {
    /// JSON store file (`{"types": [...], "documents": [...]}`).
    #[arg(long, value_name = "FILE", env = "ACLGUARD_STORE")]
    store: PathBuf,
    /// Guard configuration (permission vocabulary and friends).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    #[arg(short, long, action = ArgAction::SetTrue, help = "Log debug output to stderr")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Count documents holding an ACE, per document type.
    Count(CountArgs),
    /// Replace an ACE with another in every document holding it.
    Update(UpdateArgs),
}

#[derive(Debug, Args)]
struct CountArgs {
    /// ACE to count, e.g. '{"action":"allow","principal":"user12","permission":"view"}'.
    #[arg(long, value_name = "JSON")]
    ace: String,
    /// Comma-separated document type names; all registered types when omitted.
    #[arg(long, value_delimiter = ',')]
    types: Vec<String>,
}

#[derive(Debug, Args)]
struct UpdateArgs {
    #[arg(long = "from-ace", value_name = "JSON")]
    from_ace: String,
    #[arg(long = "to-ace", value_name = "JSON")]
    to_ace: String,
    #[arg(long, value_delimiter = ',')]
    types: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => GuardConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => GuardConfig::default(),
    };
    let store = MemoryStore::load(&cli.store)
        .with_context(|| format!("failed to load store {}", cli.store.display()))?;
    let index = MemoryIndex::from_store(&store);
    let mut guard = AclGuard::new(store, index).with_config(config)?;

    match cli.command {
        Commands::Count(args) => {
            let ace = parse_ace("--ace", &args.ace)?;
            let counts = guard.count_ace(&ace, type_filter(&args.types))?;
            print!("{}", render_counts(&counts));
        }
        Commands::Update(args) => {
            let from_ace = parse_ace("--from-ace", &args.from_ace)?;
            let to_ace = parse_ace("--to-ace", &args.to_ace)?;
            let report = guard.update_ace(&from_ace, &to_ace, type_filter(&args.types))?;
            if report.updated > 0 {
                guard
                    .store()
                    .persist(&cli.store)
                    .with_context(|| format!("failed to write store {}", cli.store.display()))?;
            }
            println!("{}", render_report(&report));
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::ERROR };
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn parse_ace(flag: &str, raw: &str) -> Result<Ace> {
    serde_json::from_str(raw).with_context(|| {
        format!(
            "{flag} must be a JSON object with string `action`, `principal` and `permission`, got: {raw}"
        )
    })
}

fn type_filter(types: &[String]) -> Option<&[String]> {
    (!types.is_empty()).then_some(types)
}

fn render_counts(counts: &[(String, AceCount)]) -> String {
    let mut out = String::from("Type,Count\n");
    for (name, count) in counts {
        let count = match count {
            AceCount::Matched(count) => count.to_string(),
            AceCount::NotApplicable => "not-applicable".to_string(),
        };
        out.push_str(&format!("{name},{count}\n"));
    }
    out
}

fn render_report(report: &AceUpdateReport) -> String {
    format!(
        "matched {}, updated {}, skipped {}",
        report.matched, report.updated, report.skipped
    )
}
