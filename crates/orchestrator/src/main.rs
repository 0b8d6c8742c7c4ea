use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use orchestrator::config::API_KEY_ENV;
use orchestrator::{run_every, run_once, stages, PipelineConfig, PipelineContext};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[clap(name = "yt-analytics", version, about = "YouTube channel analytics pipeline")]
struct CliArgs {
    /// Path to TOML configuration file. CLI arguments override values in the file.
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding data/, plots/ and models/.
    #[clap(long, global = true)]
    base_dir: Option<PathBuf>,

    /// YouTube Data API key.
    #[clap(long, global = true, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Uploads playlist to collect.
    #[clap(long, global = true)]
    playlist_id: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch videos and comments into the raw datasets.
    Collect,
    /// Clean the raw datasets into the preprocessed datasets.
    Clean,
    /// Train and evaluate the like-count model.
    Model,
    /// Render exploratory plots.
    Plot,
    /// Run the whole pipeline, triggering stages on dataset changes.
    Run {
        /// Run every stage even if its inputs are unchanged.
        #[clap(long)]
        force: bool,

        /// Repeat until interrupted, every SECS seconds (schedule.interval_secs if omitted).
        #[clap(long, value_name = "SECS", num_args = 0..=1)]
        every: Option<Option<u64>>,
    },
}

fn resolve_config(args: &CliArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            PipelineConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };

    if let Some(base_dir) = &args.base_dir {
        config.base_dir = base_dir.clone();
    }
    if let Some(api_key) = &args.api_key {
        config.youtube.api_key = Some(api_key.clone());
    }
    if let Some(playlist_id) = &args.playlist_id {
        config.youtube.playlist_id = playlist_id.clone();
    }
    config.apply_env();

    Ok(config)
}

async fn run(args: CliArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    info!("Base directory: {:?}", config.base_dir);
    let ctx = PipelineContext::from_config(config)?;

    match args.command {
        Command::Collect => {
            stages::collect(&ctx).await?;
        }
        Command::Clean => {
            stages::clean(&ctx).await?;
        }
        Command::Model => {
            let report = stages::model(&ctx).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Plot => {
            for path in stages::plot(&ctx).await? {
                println!("{}", path.display());
            }
        }
        Command::Run { force, every } => match every {
            Some(secs) => {
                let interval = secs
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| ctx.config.schedule.interval());
                run_every(&ctx, force, interval).await?
            }
            None => {
                run_once(&ctx, force).await?;
            }
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init()
        .context("failed to install tracing subscriber")?;

    if let Err(e) = run(cli_args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
