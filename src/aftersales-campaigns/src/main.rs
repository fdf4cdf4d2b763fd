//! After-sales campaign runner.
//!
//! Loads configuration, wires the external service adapters and the
//! customer store into the orchestrator, runs one or more campaigns and
//! prints each run result as JSON.

use std::sync::Arc;

use anyhow::Context;
use campaign_channels::TokioPacer;
use campaign_core::config::AppConfig;
use campaign_core::types::{RunResult, RunStatus, TriggerKind};
use campaign_integrations::{
    BrevoDelivery, ChatCompletionGenerator, OpenWeatherProvider, StaticCalendar,
};
use campaign_store::InMemoryStore;
use campaign_workflow::{Collaborators, Orchestrator};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "aftersales-campaigns")]
#[command(about = "Weather, holiday and lifecycle driven after-sales email campaigns")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, short = 'c', global = true)]
    config: Option<String>,

    /// Customer seed file (overrides config)
    #[arg(long, global = true, env = "AFTERSALES__STORE__SEED_PATH")]
    seed: Option<String>,

    /// Dispatch batch size (overrides config)
    #[arg(long, global = true, env = "AFTERSALES__DISPATCH__BATCH_SIZE")]
    batch_size: Option<usize>,

    /// Sender address (overrides config)
    #[arg(long, global = true, env = "AFTERSALES__SENDER__EMAIL")]
    sender_email: Option<String>,

    /// Human-readable logs instead of JSON
    #[arg(long, global = true, default_value_t = false)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one campaign for a single location
    Run {
        /// Target location (defaults to the configured location)
        #[arg(long, short = 'l')]
        location: Option<String>,

        /// weather | holiday | lifecycle | scheduled
        #[arg(long, short = 't', default_value = "scheduled")]
        trigger: TriggerKind,
    },
    /// Run independent campaigns for several locations
    RunAll {
        /// Comma-separated locations (defaults to every customer location)
        #[arg(long, value_delimiter = ',')]
        locations: Vec<String>,

        #[arg(long, short = 't', default_value = "weather")]
        trigger: TriggerKind,
    },
}

fn init_tracing(pretty: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "aftersales_campaigns=info,campaign_workflow=info,campaign_channels=info,\
         campaign_segmentation=info,campaign_personalization=info,campaign_store=info,\
         campaign_integrations=info"
            .into()
    });
    if pretty {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    }
}

fn load_config(cli: &Cli) -> AppConfig {
    let mut config = AppConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(seed) = &cli.seed {
        config.store.seed_path = Some(seed.clone());
    }
    if let Some(batch_size) = cli.batch_size {
        config.dispatch.batch_size = batch_size;
    }
    if let Some(email) = &cli.sender_email {
        config.sender.email = email.clone();
    }
    config
}

fn build_store(config: &AppConfig) -> anyhow::Result<Arc<InMemoryStore>> {
    let store = match &config.store.seed_path {
        Some(path) => InMemoryStore::from_seed_file(path)
            .with_context(|| format!("failed to load customer seed from {path}"))?,
        None => {
            warn!("No customer seed configured, store starts empty");
            InMemoryStore::new()
        }
    };
    Ok(Arc::new(store))
}

fn print_result(result: &RunResult) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.pretty);

    info!("After-sales campaign runner starting up");
    let config = load_config(&cli);
    info!(
        default_location = %config.default_location,
        batch_size = config.dispatch.batch_size,
        sender = %config.sender.email,
        "Configuration loaded"
    );

    let store = build_store(&config)?;
    info!(customers = store.customer_count(), "Customer store ready");

    let collaborators = Collaborators {
        store: store.clone(),
        weather: Arc::new(OpenWeatherProvider::new(&config.weather)?),
        holidays: Arc::new(StaticCalendar::load(
            config.holidays.calendar_path.as_deref(),
            Utc::now().date_naive(),
        )),
        generator: Arc::new(ChatCompletionGenerator::new(&config.content)?),
        delivery: Arc::new(BrevoDelivery::new(
            &config.delivery,
            config.sender.clone(),
            config.dispatch.send_timeout_ms,
        )?),
        pacer: Arc::new(TokioPacer),
    };
    let default_location = config.default_location.clone();
    let orchestrator = Orchestrator::new(config, collaborators);

    let results = match cli.command {
        Command::Run { location, trigger } => {
            let location = location.unwrap_or(default_location);
            vec![orchestrator.run_campaign(&location, trigger).await]
        }
        Command::RunAll { locations, trigger } => {
            let locations = if locations.is_empty() {
                store.locations()
            } else {
                locations
            };
            info!(locations = locations.len(), %trigger, "Running all locations");
            orchestrator.run_all_locations(&locations, trigger).await
        }
    };

    for result in &results {
        print_result(result)?;
    }

    let failed = results
        .iter()
        .filter(|r| r.status == RunStatus::Failed)
        .count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} campaign runs failed", results.len());
    }
    Ok(())
}
