use std::path::Path;
use std::sync::Arc;

use adapters::clock::ReplayClock;
use adapters::link::memory::CountingChunkSink;
use adapters::traffic::scenario::{AttackSpec, TrafficScenario};
use adapters::traffic::source::ReplaySource;
use anyhow::Context;
use application::admission_service_impl::AdmissionAppService;
use application::packet_pipeline::{PacketPipeline, PipelineConfig, PipelineReport};
use domain::admission::engine::AdmissionController;
use infrastructure::config::{AgentConfig, QuotaResetConfig, QuotaResetTrigger};
use infrastructure::constants::GRACEFUL_SHUTDOWN_TIMEOUT;
use infrastructure::logging::init_logging;
use infrastructure::metrics::AgentMetrics;
use ports::secondary::metrics_port::MetricsPort;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{Cli, ReplayArgs};
use crate::commands;
use crate::signals::{create_shutdown_token, spawn_quota_reset_listener};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Load the configuration named on the command line, or the defaults.
pub fn load_config(cli: &Cli) -> anyhow::Result<AgentConfig> {
    match &cli.config {
        Some(path) => AgentConfig::load(Path::new(path))
            .with_context(|| format!("failed to load config from {path}")),
        None => Ok(AgentConfig::default()),
    }
}

/// Replay the synthetic capture through the full pipeline and print the
/// report. With `looping` the capture repeats until a shutdown signal.
pub async fn run(cli: &Cli, args: ReplayArgs, looping: bool) -> anyhow::Result<()> {
    // ── 1. Load config ──────────────────────────────────────────────
    let config = load_config(cli)?;

    // ── 2. Initialize logging ───────────────────────────────────────
    // CLI flags take precedence over config file
    let log_level = cli.log_level.unwrap_or(config.agent.log_level);
    let log_format = cli.log_format.unwrap_or(config.agent.log_format);
    init_logging(log_level, log_format)?;

    let _root_span = tracing::span!(
        tracing::Level::INFO,
        "service",
        service.name = "floodgate",
        service.version = env!("CARGO_PKG_VERSION"),
    )
    .entered();

    info!(
        config_path = cli.config.as_deref().unwrap_or("<defaults>"),
        log_level = log_level.as_str(),
        log_format = log_format.as_str(),
        seconds = args.seconds,
        attack = args.attack,
        looping,
        "floodgate agent starting"
    );

    // ── 3. Run ──────────────────────────────────────────────────────
    let metrics = Arc::new(AgentMetrics::new());
    let cancel = create_shutdown_token();
    let report = run_scenario(&config, args, looping, Arc::clone(&metrics), cancel).await?;

    // ── 4. Report ───────────────────────────────────────────────────
    commands::print_report(&report, cli.output)?;
    if args.metrics {
        print!("{}", metrics.encode()?);
    }
    info!("floodgate agent stopped");
    Ok(())
}

/// Generate the scenario, wire the pipeline, and run it to completion
/// (or until `cancel` fires and the drain finishes).
pub async fn run_scenario(
    config: &AgentConfig,
    args: ReplayArgs,
    looping: bool,
    metrics: Arc<AgentMetrics>,
    cancel: CancellationToken,
) -> anyhow::Result<PipelineReport> {
    let admission = config.admission_config()?;
    let controller = AdmissionController::new(admission).context("invalid admission config")?;
    info!(
        depth = controller.config().sketch.depth,
        width = controller.config().sketch.width,
        volume_threshold = controller.config().volume_threshold,
        quota = controller.config().quota_size,
        "admission controller initialized"
    );

    let port: Arc<dyn MetricsPort> = metrics;
    let service = AdmissionAppService::new(controller, Arc::clone(&port));

    let clock = ReplayClock::new();
    let pipeline = PacketPipeline::new(
        service,
        Arc::new(clock.clone()),
        port,
        PipelineConfig {
            chunk_width: config.agent.chunk_width,
            channel_capacity: config.agent.channel_capacity,
        },
    )?;

    if config.quota.reset == QuotaResetConfig::Named(QuotaResetTrigger::External) {
        spawn_quota_reset_listener(pipeline.commands(), cancel.clone());
    }

    let mut scenario = TrafficScenario::baseline(args.seconds);
    if args.attack {
        scenario = scenario.with_attack(AttackSpec::dns_amplification());
    }
    let frames = scenario.frames();
    info!(frames = frames.len(), "synthetic capture generated");

    let mut source = ReplaySource::new(frames, config.agent.chunk_width, clock);
    if looping {
        source = source.looping(args.seconds.max(1).saturating_mul(NANOS_PER_SECOND));
    }

    let mut task = tokio::spawn(pipeline.run(
        Box::new(source),
        Box::new(CountingChunkSink::default()),
        cancel.clone(),
    ));

    let joined = tokio::select! {
        joined = &mut task => joined,
        () = cancel.cancelled() => {
            match tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(
                        timeout_secs = GRACEFUL_SHUTDOWN_TIMEOUT.as_secs(),
                        "pipeline drain timed out, aborting"
                    );
                    task.abort();
                    anyhow::bail!("pipeline did not drain before the shutdown timeout");
                }
            }
        }
    };

    let report = joined.context("pipeline task failed")??;
    Ok(report)
}
