// Winefind — main.rs
// One-shot command-line front-end: each invocation opens one session and
// issues at most one query.
// Author: d65v <https://github.com/d65v>

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};

use wcore::client::IndexService;
use wcore::present::{self, Outcome, SearchInput, DEFAULT_TOP_K};
use wcore::{IndexHandle, QueryFilter, SearchMode, WineColor, WineFindConfig, WineType};

#[derive(Debug, Parser)]
#[command(name = "winefind", version, about = "Wine recommendations from a hosted vector index")]
struct Cli {
    /// Write the score radar chart (plotly figure JSON) to this file
    #[arg(long, global = true, value_name = "PATH")]
    chart_out: Option<PathBuf>,

    /// More diagnostics on stderr (-v info, -vv debug); RUST_LOG wins when set
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Find wines by exact metadata criteria (WINEFIND_MODE=filter)
    Find(FindArgs),
    /// Find wines similar to a stored wine id (WINEFIND_MODE=similar)
    Similar {
        /// Wine id, e.g. wine_123
        id: String,
        /// Number of recommendations (1-10)
        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K, value_parser = present::parse_top_k)]
        top_k: usize,
    },
    /// List the indexes visible to the API key
    Indexes,
    /// Show statistics for the configured index
    Stats,
}

#[derive(Debug, Args)]
struct FindArgs {
    /// Wine name
    #[arg(long)]
    name: Option<String>,
    /// Wine region
    #[arg(long)]
    region: Option<String>,
    /// Country of origin
    #[arg(long)]
    country: Option<String>,
    /// Red | White | Rosé | Sparkling
    #[arg(long = "type", value_name = "TYPE")]
    kind: Option<WineType>,
    /// Red | White | Rosé | Gold
    #[arg(long)]
    color: Option<WineColor>,
    /// Number of results (1-10)
    #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K, value_parser = present::parse_top_k)]
    top_k: usize,
}

impl FindArgs {
    fn filter(&self) -> QueryFilter {
        QueryFilter {
            name: self.name.clone(),
            region: self.region.clone(),
            country: self.country.clone(),
            kind: self.kind,
            color: self.color,
        }
    }
}

fn main() -> ExitCode {
    // Load .env if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("[winefind] {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = WineFindConfig::from_env().context("failed to load configuration")?;
    log::info!(
        "Config: index={}, mode={}, schema={}",
        config.index_name,
        config.mode,
        config.schema.name
    );

    let required = match &cli.command {
        Command::Find(_) => Some(SearchMode::Filter),
        Command::Similar { .. } => Some(SearchMode::Similar),
        Command::Indexes | Command::Stats => None,
    };
    if let Some(required) = required {
        ensure_mode(config.mode, required)?;
    }

    eprintln!("Connecting to index '{}'...", config.index_name);
    let handle = wcore::connect(&config)
        .with_context(|| format!("failed to initialize index '{}'", config.index_name))?;

    match cli.command {
        Command::Find(args) => {
            let input = SearchInput::Filter(args.filter());
            show(&handle, &input, args.top_k, cli.chart_out.as_deref())
        }
        Command::Similar { id, top_k } => {
            show(&handle, &SearchInput::Similar(id), top_k, cli.chart_out.as_deref())
        }
        Command::Indexes => {
            let indexes = handle.list_indexes().context("failed to list indexes")?;
            print!("{}", present::render_indexes(&indexes, &config.index_name));
            Ok(())
        }
        Command::Stats => {
            let stats = handle
                .describe_stats()
                .context("failed to describe index statistics")?;
            print!("{}", present::render_stats(handle.index(), &stats));
            Ok(())
        }
    }
}

fn ensure_mode(active: SearchMode, required: SearchMode) -> anyhow::Result<()> {
    if active != required {
        bail!(
            "{} search is not enabled for this deployment (WINEFIND_MODE={}); set WINEFIND_MODE={} to use it",
            required,
            active,
            required
        );
    }
    Ok(())
}

fn show<S: IndexService>(
    handle: &IndexHandle<S>,
    input: &SearchInput,
    top_k: usize,
    chart_out: Option<&Path>,
) -> anyhow::Result<()> {
    if let Some(line) = input.progress() {
        eprintln!("{}", line);
    }
    let outcome = present::search(handle, input, top_k);
    print!("{}", present::render(&outcome));

    if let (Some(path), Outcome::Matches { chart: Some(chart), .. }) = (chart_out, &outcome) {
        let json = serde_json::to_string_pretty(&chart.to_plotly())?;
        fs::write(path, json)
            .with_context(|| format!("failed to write chart to {}", path.display()))?;
        log::info!("Chart written to {}", path.display());
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_find_args() {
        let cli = Cli::try_parse_from([
            "winefind", "find", "--region", "Burgundy", "--type", "rose", "-k", "3",
        ])
        .unwrap();
        let Command::Find(args) = cli.command else {
            panic!("expected find");
        };
        assert_eq!(args.top_k, 3);
        let filter = args.filter();
        assert_eq!(filter.region.as_deref(), Some("Burgundy"));
        assert_eq!(filter.kind, Some(WineType::Rose));
    }

    #[test]
    fn test_cli_top_k_bounded() {
        assert!(Cli::try_parse_from(["winefind", "similar", "wine_1", "-k", "11"]).is_err());
        assert!(Cli::try_parse_from(["winefind", "find", "--color", "purple"]).is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["winefind", "-vv", "similar", "wine_123"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Similar { top_k: DEFAULT_TOP_K, .. }));
    }

    #[test]
    fn test_inactive_mode_rejected() {
        assert!(ensure_mode(SearchMode::Filter, SearchMode::Filter).is_ok());
        let err = ensure_mode(SearchMode::Filter, SearchMode::Similar).unwrap_err();
        assert!(err.to_string().contains("WINEFIND_MODE=similar"));
    }
}
