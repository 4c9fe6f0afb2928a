//! arxiveroo: CLI entrypoint.
//! Fetches the configured paper feeds, has each new entry judged against the
//! user's interests and prints the ranked shortlist.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use arxiveroo::analyze::{build_judge, KeywordJudge, RelevanceJudge, RelevanceScorer};
use arxiveroo::config::AppConfig;
use arxiveroo::dedup::JsonFileStore;
use arxiveroo::ingest::fetch::HttpFetcher;
use arxiveroo::ingest::PublishedWindow;
use arxiveroo::pipeline::Pipeline;
use arxiveroo::report;

#[derive(Parser)]
#[command(name = "arxiveroo")]
#[command(about = "Relevance-ranked digest of new papers from arXiv, bioRxiv and medRxiv", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: $ARXIVEROO_CONFIG_PATH or config/arxiveroo.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, score and print the shortlist
    Run(RunArgs),

    /// Print the feed sources the config resolves to
    Sources(WindowArgs),
}

#[derive(Args)]
struct WindowArgs {
    /// Earliest publication date to keep (YYYY-MM-DD)
    #[arg(long)]
    since: Option<NaiveDate>,

    /// Latest publication date to keep (YYYY-MM-DD)
    #[arg(long)]
    until: Option<NaiveDate>,
}

impl WindowArgs {
    fn window(&self) -> PublishedWindow {
        PublishedWindow {
            since: self.since,
            until: self.until,
        }
    }
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    window: WindowArgs,

    /// Maximum number of papers to show
    #[arg(long)]
    max_count: Option<usize>,

    /// Minimum relevance in [0, 1]
    #[arg(long)]
    min_score: Option<f32>,

    /// Use the keyword judge instead of the configured LLM provider
    #[arg(long)]
    offline: bool,

    /// Do not mark anything as seen
    #[arg(long)]
    dry_run: bool,

    /// Print the report as JSON instead of markdown
    #[arg(long)]
    json: bool,
}

/// Logs go to stderr so stdout carries only the report.
fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("arxiveroo=info,warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let mut cfg = match path {
        Some(p) => AppConfig::load_from(p)?,
        None => AppConfig::load_default()?,
    };
    cfg.apply_env_overrides()?;
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (OPENAI_API_KEY, PREFERENCE_PATH, ...).
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut cfg = load_config(cli.config.as_ref()).context("loading configuration")?;
    let today = chrono::Utc::now().date_naive();

    match cli.command {
        Commands::Sources(args) => {
            let sources = cfg.resolve_sources(&args.window(), today)?;
            for s in &sources {
                println!("{}\t{}\t{}", s.id, s.label, s.url);
                if !s.categories.is_empty() {
                    println!("\tcategories: {}", s.categories.join(", "));
                }
            }
            Ok(())
        }
        Commands::Run(args) => {
            if let Some(n) = args.max_count {
                cfg.budget.max_count = Some(n);
            }
            if let Some(s) = args.min_score {
                cfg.budget.min_score = Some(s);
            }
            let window = args.window.window();

            let profile = cfg.load_profile().context("loading interest profile")?;
            let sources = cfg.resolve_sources(&window, today)?;
            if sources.is_empty() {
                warn!("no feed sources configured; add [arxiv] or [[sources]] to the config");
            }

            let judge: Arc<dyn RelevanceJudge> = if args.offline {
                Arc::new(KeywordJudge)
            } else {
                build_judge(&cfg.scorer)?
            };
            let scorer = RelevanceScorer::new(judge, cfg.scorer.retry.clone());
            let fetcher = Arc::new(HttpFetcher::new(cfg.fetch.user_agent(), cfg.fetch.timeout())?);

            let mut options = cfg.pipeline_options(window);
            options.commit_seen = !args.dry_run;
            let store = JsonFileStore::new(cfg.seen_path());
            info!(
                sources = sources.len(),
                judge = scorer.judge_name(),
                seen = %store.path().display(),
                dry_run = args.dry_run,
                "starting run"
            );

            let pipeline = Pipeline::new(fetcher, scorer, options);
            let report = pipeline.run(&sources, &profile, &cfg.budget, &store).await?;

            if args.json {
                println!("{}", report::render_json(&report)?);
            } else {
                print!("{}", report::render_markdown(&report));
            }
            Ok(())
        }
    }
}
