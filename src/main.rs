//! COIN HERALD — scheduled market-post agent.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the pipeline components together, starts the scheduler and the
//! control server, and waits for shutdown.

use anyhow::{Context, Result};
use chrono_tz::Tz;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use coin_herald::candidates::twitter_search::TwitterSearchSource;
use coin_herald::config::AppConfig;
use coin_herald::content::generator::ContentGenerator;
use coin_herald::content::openai::OpenAiBackend;
use coin_herald::control::routes::ControlState;
use coin_herald::control::spawn_control;
use coin_herald::engine::Orchestrator;
use coin_herald::enrich::image::ImageEnricher;
use coin_herald::market::aggregator::MarketDataAggregator;
use coin_herald::market::client::RateLimitedClient;
use coin_herald::publish::twitter::TwitterPublisher;
use coin_herald::publish::PublishLimits;
use coin_herald::scheduler::TimezoneScheduler;

const BANNER: &str = r#"
  ____ ___ ___ _   _   _   _ _____ ____      _    _     ____
 / ___/ _ \_ _| \ | | | | | | ____|  _ \    / \  | |   |  _ \
| |  | | | | ||  \| | | |_| |  _| | |_) |  / _ \ | |   | | | |
| |__| |_| | || |\  | |  _  | |___|  _ <  / ___ \| |___| |_| |
 \____\___/___|_| \_| |_| |_|_____|_| \_\/_/   \_\_____|____/

  Market-data social agent
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        agent_name = %cfg.agent.name,
        categories = ?cfg.market.categories,
        schedule = ?cfg.agent.schedule_times,
        "Coin Herald starting up"
    );

    let author_tz: Tz = cfg
        .agent
        .author_timezone
        .parse()
        .map_err(|_| anyhow::anyhow!("Unknown timezone: {}", cfg.agent.author_timezone))?;
    let publish_tz: Tz = cfg
        .agent
        .publish_timezone
        .parse()
        .map_err(|_| anyhow::anyhow!("Unknown timezone: {}", cfg.agent.publish_timezone))?;

    // -- Initialise components -------------------------------------------

    let market_key = cfg
        .market
        .api_key_env
        .as_deref()
        .and_then(|env| std::env::var(env).ok());
    let market_client = RateLimitedClient::new(
        cfg.market.base_url.clone(),
        market_key,
        Duration::from_millis(cfg.market.min_request_interval_ms),
    )?;
    let feed = MarketDataAggregator::new(market_client, cfg.market.item_limit);

    let openai_key = AppConfig::resolve_env(&cfg.generation.api_key_env)
        .context("Generation backend needs an API key")?;
    let backend = OpenAiBackend::new(
        openai_key.clone(),
        Some(cfg.generation.model.clone()),
        Some(cfg.generation.max_tokens),
        Some(cfg.generation.temperature),
    )?;
    let generator = ContentGenerator::new(
        Box::new(backend),
        cfg.generation.char_ceiling,
        cfg.generation.history_window,
    );

    let enrich_key = std::env::var(&cfg.enrichment.api_key_env).unwrap_or(openai_key);
    let enricher = ImageEnricher::new(enrich_key, PathBuf::from(&cfg.enrichment.temp_dir))?;

    let publish_key = AppConfig::resolve_env(&cfg.publish.api_key_env)
        .context("Publisher needs an API key")?;
    let publisher = TwitterPublisher::new(
        publish_key,
        PublishLimits {
            post: cfg.publish.post_ceiling,
            quote: cfg.publish.quote_ceiling,
            reply: cfg.publish.reply_ceiling,
        },
    )?;

    let candidates_key = AppConfig::resolve_env(&cfg.candidates.api_key_env)
        .context("Candidate source needs an API key")?;
    let candidates = TwitterSearchSource::new(candidates_key)?;

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(feed),
        generator,
        Arc::new(enricher),
        Arc::new(publisher),
        Arc::new(candidates),
        cfg.market.categories.clone(),
        cfg.candidates.queries.clone(),
        cfg.enrichment.enabled,
        cfg.candidates.limit,
    ));

    // -- Scheduler and control server --------------------------------------

    let scheduler = Arc::new(TimezoneScheduler::new(
        Arc::clone(&orchestrator),
        author_tz,
        publish_tz,
        cfg.agent.schedule_times.clone(),
        cfg.agent.duplicate_policy,
    ));
    scheduler.start()?;

    if cfg.control.enabled {
        spawn_control(
            Arc::new(ControlState {
                orchestrator: Arc::clone(&orchestrator),
                scheduler: Arc::clone(&scheduler),
            }),
            cfg.control.port,
        )?;
    }

    info!("Running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutdown signal received.");
    scheduler.stop();
    info!("Coin Herald shut down cleanly.");

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("coin_herald=info"));

    let json_logging = std::env::var("HERALD_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
