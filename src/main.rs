use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use movies_probe::config::CliOverrides;
use movies_probe::generate::MovieGenerator;
use movies_probe::probe::{self, fetch_keys, render_json};
use movies_probe::{CatalogClient, Client, ConfigError, PayloadVariant, ProbeConfig, ProbeResult};

#[derive(Parser, Debug)]
#[command(
    name = "movies-probe",
    version,
    about = "Posts movies to a catalog service and compares cold and warm read latency"
)]
struct Cli {
    /// TOML file with probe settings.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Collection URL, e.g. http://127.0.0.1:8000/movies.
    #[arg(long, value_name = "URL", global = true)]
    url: Option<String>,

    /// Payload shape: `a` (id/title/year/description) or `b` (name/slug/year/desc).
    #[arg(long, value_name = "VARIANT", global = true)]
    variant: Option<PayloadVariant>,

    #[arg(long, global = true)]
    seed: Option<u64>,

    #[arg(long, value_name = "MS", global = true)]
    timeout_ms: Option<u64>,

    /// Emit results as JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// POST the sample movie and print the status code.
    Post,
    /// Generate and POST one movie per index in [start, end).
    Populate {
        #[arg(long)]
        start: Option<i32>,
        #[arg(long)]
        end: Option<i32>,
    },
    /// Read [start, end) twice and report the mean latency of each pass.
    Latency {
        #[arg(long)]
        start: Option<i32>,
        #[arg(long)]
        end: Option<i32>,
    },
    /// Populate, then run the cold and warm read passes.
    Run {
        #[arg(long)]
        skip_populate: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "movies_probe=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn resolve_config(cli: &Cli) -> Result<ProbeConfig, ConfigError> {
    let mut overrides = CliOverrides {
        base_url: cli.url.clone(),
        variant: cli.variant,
        seed: cli.seed,
        timeout_ms: cli.timeout_ms,
        ..CliOverrides::default()
    };
    match &cli.command {
        Command::Populate { start, end } => {
            overrides.populate_start = *start;
            overrides.populate_end = *end;
        }
        Command::Latency { start, end } => {
            overrides.fetch_start = *start;
            overrides.fetch_end = *end;
        }
        Command::Post | Command::Run { .. } => {}
    }
    ProbeConfig::resolve(cli.config.as_deref(), |key| std::env::var(key).ok(), &overrides)
}

async fn execute(cli: Cli) -> ProbeResult<()> {
    let config = resolve_config(&cli)?;
    let catalog = CatalogClient::new(Client::new(), config.base_url.as_str())
        .with_timeout(config.timeout());

    match cli.command {
        Command::Post => {
            let status = probe::post_sample(&catalog, config.variant).await?;
            if cli.json {
                println!("{}", render_json(&status)?);
            } else {
                println!("{status}");
            }
        }
        Command::Populate { .. } => {
            let mut generator = MovieGenerator::new(config.seed)
                .with_year_range(config.years())
                .with_word_counts(config.title_words, config.description_words);
            let outcome = probe::populate(
                &catalog,
                &mut generator,
                config.variant,
                config.populate_range(),
            )
            .await?;
            if cli.json {
                println!("{}", render_json(&outcome)?);
            } else {
                for status in outcome.statuses() {
                    println!("{status}");
                }
            }
        }
        Command::Latency { .. } => {
            let keys = fetch_keys(config.variant, config.fetch_range(), None)?;
            let comparison = probe::cold_warm(&catalog, &keys).await?;
            if cli.json {
                println!("{}", render_json(&comparison)?);
            } else {
                println!("{comparison}");
            }
        }
        Command::Run { skip_populate } => {
            let outcome = probe::run(&catalog, &config, !skip_populate).await?;
            if cli.json {
                println!("{}", render_json(&outcome)?);
            } else {
                if let Some(populated) = &outcome.populate {
                    for status in populated.statuses() {
                        println!("{status}");
                    }
                }
                println!("{}", outcome.comparison);
            }
        }
    }
    Ok(())
}
