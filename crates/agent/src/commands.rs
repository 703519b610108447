use anyhow::Result;
use application::packet_pipeline::PipelineReport;
use infrastructure::config::{AgentConfig, QuotaResetConfig, QuotaResetTrigger};

use crate::cli::OutputFormat;

// ── Version ─────────────────────────────────────────────────────────────

pub fn cmd_version() {
    println!("floodgate-agent {}", env!("CARGO_PKG_VERSION"));
}

// ── Config ──────────────────────────────────────────────────────────────

pub fn cmd_check_config(config: &AgentConfig, output: OutputFormat) -> Result<()> {
    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    let window = match (config.window.packets, config.window.millis) {
        (_, Some(ms)) => format!("{ms} ms"),
        (Some(n), None) => format!("{n} packets"),
        (None, None) => "-".to_string(),
    };
    let reset = match config.quota.reset {
        QuotaResetConfig::Named(QuotaResetTrigger::Window) => "every window".to_string(),
        QuotaResetConfig::Named(QuotaResetTrigger::External) => "external".to_string(),
        QuotaResetConfig::Packets { packets } => format!("every {packets} probing packets"),
    };
    let hash = if config.sketch.hash_params.is_empty() {
        "built-in"
    } else {
        "explicit"
    };

    println!("Configuration OK");
    println!("  Chunk width:        {} bytes", config.agent.chunk_width);
    println!("  Channel capacity:   {}", config.agent.channel_capacity);
    println!(
        "  Sketch:             {} x {} cells, {}-bit counters, {hash} hashes",
        config.sketch.depth, config.sketch.width, config.sketch.counter_bits
    );
    println!("  Clear budget:       {} cells/insert", config.sketch.clear_budget);
    println!("  Window:             {window}");
    println!("  Volume threshold:   {} bytes", config.volume.threshold_bytes);
    println!(
        "  Probing thresholds: src+dst {} / dst+port {} / src+len {}",
        config.probing.src_dst_threshold,
        config.probing.dst_port_threshold,
        config.probing.src_len_threshold
    );
    println!("  Burst quota:        {} (reset {reset})", config.quota.size);
    Ok(())
}

// ── Replay report ───────────────────────────────────────────────────────

pub fn print_report(report: &PipelineReport, output: OutputFormat) -> Result<()> {
    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let stats = &report.admission;
    println!("Replay report");
    println!("  Chunks in / out:    {} / {}", report.chunks_in, report.chunks_out);
    println!("  Frames in:          {}", report.frames_in);
    println!("  Admitted:           {}", report.frames_admitted);
    println!("  Dropped:            {}", report.frames_dropped);
    println!();
    println!("  {:<22} {:>10}", "CAUSE", "PACKETS");
    for (cause, count) in [
        ("heavy_src_dst", stats.dropped_heavy_src_dst),
        ("heavy_dst_port", stats.dropped_heavy_dst_port),
        ("heavy_src_len", stats.dropped_heavy_src_len),
        ("quota_exhausted", stats.dropped_quota_exhausted),
        ("malformed", stats.discarded_malformed),
        ("runt", stats.discarded_runt),
        ("unsupported", stats.discarded_unsupported),
    ] {
        println!("  {cause:<22} {count:>10}");
    }
    println!();
    println!("  Bytes observed:     {}", stats.bytes_observed);
    println!("  Window ticks:       {}", stats.window_ticks);
    println!("  Mode switches:      {}", stats.mode_switches);
    println!("  Final mode:         {}", stats.mode);
    if stats.counter_saturations > 0 {
        println!("  Saturated counters: {}", stats.counter_saturations);
    }
    Ok(())
}
