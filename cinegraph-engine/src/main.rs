//! cinegraph - relationship database builder
//!
//! `cinegraph build` gathers a catalog from TMDB (or a JSON fixture), builds
//! the relationship graph, search index and recommendation tiers, and writes
//! the artifact as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cinegraph_common::config::{load_or_default, resolve_api_key, resolve_config_path, TomlConfig};
use cinegraph_common::events::BuildEvent;
use cinegraph_engine::source::{MetadataSource, StaticSource, TmdbClient};
use cinegraph_engine::{DatabaseBuild, DatabaseBuilder, RecommendOptions};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for cinegraph
#[derive(Parser, Debug)]
#[command(name = "cinegraph")]
#[command(about = "Entity relationship intelligence database builder")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the database artifact
    Build {
        /// TOML config file
        #[arg(short, long, env = "CINEGRAPH_CONFIG")]
        config: Option<PathBuf>,

        /// Build from a JSON fixture instead of the live API
        #[arg(short, long)]
        fixture: Option<PathBuf>,

        /// Artifact output path
        #[arg(short, long, env = "CINEGRAPH_OUTPUT", default_value = "cinegraph.json")]
        output: PathBuf,

        /// Provider API key
        #[arg(long)]
        api_key: Option<String>,

        /// Print deep-tier recommendations for these entity ids
        #[arg(long = "recommend", value_name = "ID")]
        recommend: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Build {
            config,
            fixture,
            output,
            api_key,
            recommend,
        } => {
            let config_path = resolve_config_path(config.as_deref());
            let toml_config = load_or_default(config_path.as_deref()).context("Failed to load configuration")?;
            init_tracing(&toml_config);

            info!("Starting cinegraph {}", env!("CARGO_PKG_VERSION"));
            let source = open_source(&toml_config, fixture, api_key.as_deref())?;
            let build = run_build(toml_config, source).await?;

            build
                .artifact
                .write_json(&output)
                .with_context(|| format!("Failed to write artifact to {}", output.display()))?;

            for id in &recommend {
                print_recommendations(&build, id)?;
            }
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(config: &TomlConfig) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_source(config: &TomlConfig, fixture: Option<PathBuf>, api_key: Option<&str>) -> Result<Arc<dyn MetadataSource>> {
    if let Some(path) = fixture {
        info!("Using fixture {}", path.display());
        let source = StaticSource::from_file(&path).with_context(|| format!("Failed to load fixture {}", path.display()))?;
        return Ok(Arc::new(source));
    }

    let Some(key) = resolve_api_key(api_key, config) else {
        bail!(
            "No API key: pass --api-key, set {} or add [source] api_key to the config file",
            cinegraph_common::config::API_KEY_ENV_VAR
        );
    };
    let client = TmdbClient::new(&config.source, &config.build.rate_limit, key).context("Failed to create TMDB client")?;
    Ok(Arc::new(client))
}

async fn run_build(config: TomlConfig, source: Arc<dyn MetadataSource>) -> Result<DatabaseBuild> {
    let builder = DatabaseBuilder::new(config, source);

    let mut events = builder.events().subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(BuildEvent::PhaseCompleted {
                    phase,
                    items,
                    duration_ms,
                    ..
                }) => eprintln!("  {:<26} {:>8} items  {:>6} ms", phase.as_str(), items, duration_ms),
                Ok(BuildEvent::BuildCompleted { .. }) | Ok(BuildEvent::BuildFailed { .. }) => break,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = builder.build().await;
    drop(builder);
    let _ = printer.await;

    let build = result.context("Build failed")?;
    let metadata = &build.artifact.metadata;
    info!(
        build_id = %metadata.build_id,
        entities = build.artifact.entities.len(),
        warnings = metadata.warnings.len(),
        errors = metadata.errors.len(),
        duration_ms = metadata.build_duration,
        "Build finished"
    );
    Ok(build)
}

fn print_recommendations(build: &DatabaseBuild, id: &str) -> Result<()> {
    let recommendations = build
        .engine
        .get_recommendations(id, &RecommendOptions::default())
        .with_context(|| format!("No recommendations for {}", id))?;

    let name = build.artifact.entities.get(id).map(|e| e.name.as_str()).unwrap_or(id);
    println!("{} ({})", name, id);
    for recommendation in recommendations {
        let target = build
            .artifact
            .entities
            .get(&recommendation.target)
            .map(|e| e.name.as_str())
            .unwrap_or(recommendation.target.as_str());
        println!(
            "  {:.3}  {:<40} {}",
            recommendation.score,
            target,
            recommendation.reason()
        );
    }
    Ok(())
}
