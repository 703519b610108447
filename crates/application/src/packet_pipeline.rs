use std::sync::Arc;
use std::time::Instant;

use domain::admission::entity::AdmissionStats;
use domain::common::error::DomainError;
use domain::packet::aligner::validate_chunk_width;
use domain::packet::builder::{BuildStatus, FeatureVectorBuilder};
use domain::packet::entity::{Chunk, FeatureVector};
use domain::packet::error::{Layer, PacketError};
use ports::secondary::chunk_sink::ChunkSink;
use ports::secondary::chunk_source::ChunkSource;
use ports::secondary::clock::Clock;
use ports::secondary::metrics_port::MetricsPort;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::admission_service_impl::AdmissionAppService;

const TRUNCATED_BY_NEXT_FRAME: PacketError = PacketError::Malformed {
    layer: Layer::Framing,
    reason: "frame cut short by the next start of frame",
};

const TRUNCATED_BY_END_OF_STREAM: PacketError = PacketError::Malformed {
    layer: Layer::Framing,
    reason: "stream ended inside a frame",
};

const COMMAND_CAPACITY: usize = 16;

/// Out-of-band commands for the decide stage, applied between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineCommand {
    /// Refill the PROBING burst quota at an external burst boundary.
    ResetQuota,
    /// Close the current sliding window.
    Tick,
}

/// Sizing of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Link transfer unit in bytes.
    pub chunk_width: usize,
    /// Frames buffered between two stages.
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_width: 64,
            channel_capacity: 1024,
        }
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub chunks_in: u64,
    pub chunks_out: u64,
    /// Frames handed to the admission stage (classified or discarded).
    pub frames_in: u64,
    pub frames_admitted: u64,
    pub frames_dropped: u64,
    pub admission: AdmissionStats,
}

/// A frame leaving the classify stage.
struct ClassifiedFrame {
    /// Original chunks, kept only for well-formed frames.
    chunks: Vec<Chunk>,
    verdict: Result<FeatureVector, PacketError>,
    arrival_ns: u64,
    completed_at: Instant,
}

struct ClassifyTotals {
    chunks_in: u64,
}

struct DecideTotals {
    frames_in: u64,
    frames_admitted: u64,
    frames_dropped: u64,
    stats: AdmissionStats,
}

/// Order-preserving classify → decide → emit pipeline.
///
/// Each stage is a single task; stages are connected by bounded channels,
/// so a slow sink stalls chunk intake instead of losing admitted frames.
pub struct PacketPipeline {
    service: AdmissionAppService,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn MetricsPort>,
    config: PipelineConfig,
    commands_tx: mpsc::Sender<PipelineCommand>,
    commands_rx: mpsc::Receiver<PipelineCommand>,
}

impl PacketPipeline {
    pub fn new(
        service: AdmissionAppService,
        clock: Arc<dyn Clock>,
        metrics: Arc<dyn MetricsPort>,
        config: PipelineConfig,
    ) -> Result<Self, DomainError> {
        validate_chunk_width(config.chunk_width)?;
        if config.channel_capacity == 0 {
            return Err(DomainError::InvalidConfig(
                "channel capacity must be > 0".to_string(),
            ));
        }
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CAPACITY);
        Ok(Self {
            service,
            clock,
            metrics,
            config,
            commands_tx,
            commands_rx,
        })
    }

    /// Sender for out-of-band commands. Commands sent before `run` are
    /// applied ahead of the first frame.
    pub fn commands(&self) -> mpsc::Sender<PipelineCommand> {
        self.commands_tx.clone()
    }

    /// Run until the source is exhausted or `cancel` fires.
    ///
    /// Cancellation stops chunk intake only; frames already classified
    /// still get a decision and admitted ones are still emitted.
    pub async fn run(
        self,
        source: Box<dyn ChunkSource>,
        sink: Box<dyn ChunkSink>,
        cancel: CancellationToken,
    ) -> Result<PipelineReport, DomainError> {
        let Self {
            service,
            clock,
            metrics,
            config,
            commands_tx,
            commands_rx,
        } = self;
        drop(commands_tx);

        let (classified_tx, classified_rx) = mpsc::channel(config.channel_capacity);
        let (admitted_tx, admitted_rx) = mpsc::channel(config.channel_capacity);

        tracing::info!(
            chunk_width = config.chunk_width,
            channel_capacity = config.channel_capacity,
            "packet pipeline started"
        );

        let classify = tokio::spawn(classify_stage(
            source,
            config.chunk_width,
            clock,
            Arc::clone(&metrics),
            classified_tx,
            cancel,
        ));
        let decide = tokio::spawn(decide_stage(
            service,
            Arc::clone(&metrics),
            classified_rx,
            commands_rx,
            admitted_tx,
        ));
        let emit = tokio::spawn(emit_stage(sink, metrics, admitted_rx));

        let classify = join(classify).await?;
        let decide = join(decide).await?;
        let chunks_out = join(emit).await??;

        let report = PipelineReport {
            chunks_in: classify?.chunks_in,
            chunks_out,
            frames_in: decide.frames_in,
            frames_admitted: decide.frames_admitted,
            frames_dropped: decide.frames_dropped,
            admission: decide.stats,
        };

        tracing::info!(
            chunks_in = report.chunks_in,
            chunks_out = report.chunks_out,
            frames_in = report.frames_in,
            frames_admitted = report.frames_admitted,
            frames_dropped = report.frames_dropped,
            "packet pipeline stopped"
        );
        Ok(report)
    }
}

async fn join<T>(handle: JoinHandle<T>) -> Result<T, DomainError> {
    handle
        .await
        .map_err(|e| DomainError::EngineError(format!("pipeline stage panicked: {e}")))
}

// ── Stages ──────────────────────────────────────────────────────────

async fn classify_stage(
    mut source: Box<dyn ChunkSource>,
    width: usize,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn MetricsPort>,
    tx: mpsc::Sender<ClassifiedFrame>,
    cancel: CancellationToken,
) -> Result<ClassifyTotals, DomainError> {
    let mut builder = FeatureVectorBuilder::new(width)?;
    let mut buffered: Vec<Chunk> = Vec::new();
    let mut chunks_in: u64 = 0;

    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!("classify stage cancelled");
                break;
            }
            next = source.next_chunk() => next,
        };

        let chunk = match next {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "chunk source failed");
                break;
            }
        };
        chunks_in += 1;
        metrics.record_chunks("in", 1);

        if chunk.is_start() && !buffered.is_empty() {
            buffered.clear();
            if !send(&tx, discarded(TRUNCATED_BY_NEXT_FRAME, clock.as_ref())).await {
                break;
            }
        }

        let frame = match builder.push(&chunk) {
            BuildStatus::Pending => {
                buffered.push(chunk);
                continue;
            }
            BuildStatus::Skipped => continue,
            BuildStatus::Complete(features) => {
                buffered.push(chunk);
                ClassifiedFrame {
                    chunks: std::mem::take(&mut buffered),
                    verdict: Ok(features),
                    arrival_ns: clock.now_ns(),
                    completed_at: Instant::now(),
                }
            }
            BuildStatus::Discard(err) => {
                buffered.clear();
                discarded(err, clock.as_ref())
            }
        };

        if !send(&tx, frame).await {
            break;
        }
    }

    if !buffered.is_empty() {
        send(&tx, discarded(TRUNCATED_BY_END_OF_STREAM, clock.as_ref())).await;
    }

    Ok(ClassifyTotals { chunks_in })
}

fn discarded(err: PacketError, clock: &dyn Clock) -> ClassifiedFrame {
    ClassifiedFrame {
        chunks: Vec::new(),
        verdict: Err(err),
        arrival_ns: clock.now_ns(),
        completed_at: Instant::now(),
    }
}

/// Returns `false` once the downstream stage is gone.
async fn send(tx: &mpsc::Sender<ClassifiedFrame>, frame: ClassifiedFrame) -> bool {
    if tx.send(frame).await.is_err() {
        tracing::warn!("decide stage closed, stopping intake");
        return false;
    }
    true
}

async fn decide_stage(
    mut service: AdmissionAppService,
    metrics: Arc<dyn MetricsPort>,
    mut rx: mpsc::Receiver<ClassifiedFrame>,
    mut commands: mpsc::Receiver<PipelineCommand>,
    tx: mpsc::Sender<Vec<Chunk>>,
) -> DecideTotals {
    let mut totals = DecideTotals {
        frames_in: 0,
        frames_admitted: 0,
        frames_dropped: 0,
        stats: AdmissionStats::default(),
    };
    let mut emit_open = true;
    let mut commands_open = true;

    loop {
        let next = tokio::select! {
            biased;
            command = commands.recv(), if commands_open => {
                match command {
                    Some(command) => apply_command(&mut service, command),
                    None => commands_open = false,
                }
                continue;
            }
            next = rx.recv() => next,
        };
        let Some(frame) = next else {
            break;
        };

        totals.frames_in += 1;
        let outcome = match &frame.verdict {
            Ok(features) => service.admit(features, frame.arrival_ns),
            Err(err) => service.reject(err),
        };
        metrics.observe_decision_latency(frame.completed_at.elapsed().as_secs_f64());

        if !outcome.is_forward() {
            totals.frames_dropped += 1;
            continue;
        }
        totals.frames_admitted += 1;

        if emit_open && tx.send(frame.chunks).await.is_err() {
            tracing::warn!("emit stage closed, admitted frames are no longer written");
            emit_open = false;
        }
    }

    totals.stats = service.stats();
    totals
}

fn apply_command(service: &mut AdmissionAppService, command: PipelineCommand) {
    tracing::debug!(?command, "pipeline command received");
    match command {
        PipelineCommand::ResetQuota => service.reset_quota(),
        PipelineCommand::Tick => service.tick(),
    }
}

async fn emit_stage(
    mut sink: Box<dyn ChunkSink>,
    metrics: Arc<dyn MetricsPort>,
    mut rx: mpsc::Receiver<Vec<Chunk>>,
) -> Result<u64, DomainError> {
    let mut chunks_out: u64 = 0;

    while let Some(chunks) = rx.recv().await {
        for chunk in chunks {
            sink.send_chunk(chunk).await?;
            chunks_out += 1;
            metrics.record_chunks("out", 1);
        }
    }

    sink.close().await?;
    Ok(chunks_out)
}
