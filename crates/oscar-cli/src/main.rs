// crates/oscar-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

mod rule_parse;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use oscar_core::config::{SeedRows, SparkLevel, Symmetry};
use oscar_core::{SearchConfig, SearchOutcome, Searcher};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "oscar-cli",
    about = "Search for periodic oscillators in B/S cellular automata",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Run the search and print the first oscillator found, or the deepest
    /// partial pattern reached if the search space is exhausted.
    Search(SearchArgs),
}

#[derive(Parser, Debug)]
struct SearchArgs {
    /// Load a fully-populated configuration record from a JSON file,
    /// overriding every other flag.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rule in `Bxxx/Syyy` notation, e.g. `B3/S23` for Conway's Life.
    #[arg(long)]
    rule: Option<String>,

    /// Oscillation period, in 1..=19.
    #[arg(long)]
    period: Option<u32>,

    /// Row symmetry assumed while seeding/completing.
    #[arg(long, value_enum, default_value_t = SymmetryOpt::None)]
    symmetry: SymmetryOpt,

    /// Attempt row-symmetric wrap completion.
    #[arg(long, default_value_t = true)]
    allow_row_sym: bool,

    /// Width of the oscillating (rotor) region.
    #[arg(long)]
    rotor_width: Option<u32>,

    /// Width of the left still-life stator.
    #[arg(long, default_value_t = 0)]
    left_stator_width: u32,

    /// Width of the right still-life stator.
    #[arg(long, default_value_t = 0)]
    right_stator_width: u32,

    /// Allow stator rows to exceed the configured width during completion.
    #[arg(long, default_value_t = false)]
    zero_lot_line: bool,

    /// Deepening budget for compaction's bounded DFS; 0 means unlimited.
    #[arg(long, default_value_t = 0)]
    max_deepen: u32,

    /// Spark relaxation level.
    #[arg(long, value_enum, default_value_t = SparkLevelOpt::None)]
    spark_level: SparkLevelOpt,

    /// Arena capacity override, mainly useful for forcing compaction.
    #[arg(long)]
    capacity: Option<usize>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, ValueEnum)]
enum SymmetryOpt {
    #[default]
    None,
    Odd,
    Even,
}

impl From<SymmetryOpt> for Symmetry {
    fn from(value: SymmetryOpt) -> Self {
        match value {
            SymmetryOpt::None => Self::None,
            SymmetryOpt::Odd => Self::Odd,
            SymmetryOpt::Even => Self::Even,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, ValueEnum)]
enum SparkLevelOpt {
    #[default]
    None,
    Edge,
    Wide,
}

impl From<SparkLevelOpt> for SparkLevel {
    fn from(value: SparkLevelOpt) -> Self {
        match value {
            SparkLevelOpt::None => Self::None,
            SparkLevelOpt::Edge => Self::Edge,
            SparkLevelOpt::Wide => Self::Wide,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Search(args) => search(args),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init();
}

fn search(args: SearchArgs) -> Result<()> {
    let config = build_config(&args)?;
    config.validate().context("configuration rejected")?;

    info!(period = config.period, rule = format!("{:#x}", config.rule), "starting search");

    let mut searcher = Searcher::new(config).context("failed to initialize search engine")?;
    let outcome = match searcher.run() {
        Ok(outcome) => outcome,
        Err(err) => {
            // Every fatal path (capacity exceeded, a broken internal
            // invariant) shares this one sink: print the deepest line
            // reached before propagating the error to the exit code.
            eprintln!("{}", searcher.deepest_pattern().render());
            return Err(err).context("search engine failure");
        }
    };

    match &outcome {
        SearchOutcome::Success(_) => info!("found a terminal, nontrivial pattern"),
        SearchOutcome::Exhausted(_) => info!("queue exhausted with no pattern found"),
    }

    print!("{}", outcome.render());
    Ok(())
}

fn build_config(args: &SearchArgs) -> Result<SearchConfig> {
    if let Some(path) = &args.config {
        let file = File::open(path).with_context(|| format!("opening config file {}", path.display()))?;
        let config: SearchConfig =
            serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing config file {}", path.display()))?;
        return Ok(config);
    }

    let rule_text = args.rule.as_deref().context("--rule is required unless --config is given")?;
    let rule = rule_parse::parse_rule_text(rule_text)?;
    let period = args.period.context("--period is required unless --config is given")?;
    let rotor_width = args.rotor_width.context("--rotor-width is required unless --config is given")?;

    if period == 0 {
        bail!("--period must be at least 1");
    }

    Ok(SearchConfig {
        rule,
        period,
        symmetry: args.symmetry.into(),
        allow_row_sym: args.allow_row_sym,
        rotor_width,
        left_stator_width: args.left_stator_width,
        right_stator_width: args.right_stator_width,
        zero_lot_line: args.zero_lot_line,
        max_deepen: args.max_deepen,
        spark_level: args.spark_level.into(),
        seed_rows: SeedRows::default(),
        capacity: args.capacity,
    })
}
