//! Simulated 3-epoch fine-tuning run with realistic metrics, telemetry,
//! checkpoints and a mid-run eval phase.
//!
//! Run:
//!     cargo run --example train_demo
//!
//! Then inspect the output directory it prints: `latest.json` is the
//! always-current snapshot, `events.jsonl` the full audit trail.

use std::thread;
use std::time::Duration;

use traincard::{Reporter, ReporterConfig, SystemSampler, TelemetryMap, TelemetryValue};

fn main() -> traincard::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let reporter = Reporter::new(ReporterConfig {
        flush_interval: Duration::from_secs(2),
        ..ReporterConfig::default()
    })?;
    println!("writing run state to {}", reporter.output_dir().display());

    let sampler = SystemSampler::start(reporter.clone(), Duration::from_millis(500))?;

    let num_epochs = 3u64;
    let steps_per_epoch = 30u64;
    let total_steps = num_epochs * steps_per_epoch;

    reporter.log(&format!(
        "Demo run: {num_epochs} epochs x {steps_per_epoch} steps/epoch"
    ));
    reporter.log("Model: tiny-llm-demo  Batch size: 16  LR: 2e-4");

    let mut last_loss = 2.5;
    for epoch in 0..num_epochs {
        reporter.epoch(epoch + 1);
        reporter.phase("train");
        reporter.log(&format!("-- Epoch {}/{num_epochs} --", epoch + 1));

        for local_step in 0..steps_per_epoch {
            let global_step = epoch * steps_per_epoch + local_step;

            // Exponential loss decay with noise and one early LR spike.
            let base_loss = 2.5 * (-0.04 * global_step as f64).exp();
            let noise = pseudo_noise(global_step) * 0.08;
            let spike = if epoch == 0 && local_step == 15 { 0.4 } else { 0.0 };
            let loss = (base_loss + noise + spike).max(0.05);
            last_loss = loss;

            // Cosine LR schedule.
            let lr = 2e-4
                * 0.5
                * (1.0 + (std::f64::consts::PI * global_step as f64 / total_steps as f64).cos());

            reporter.metric_at("train/loss", loss, global_step);
            reporter.metric_at("train/learning_rate", lr, global_step);
            reporter.metric_at(
                "train/tokens_per_sec",
                12_500.0 + pseudo_noise(global_step) * 800.0,
                global_step,
            );
            reporter.heartbeat();

            if global_step % 10 == 0 {
                reporter.log(&format!(
                    "[E{} S{local_step:2}] loss={loss:.4}  lr={lr:.2e}",
                    epoch + 1
                ));
            }
            thread::sleep(Duration::from_millis(30));
        }

        // End-of-epoch evaluation.
        reporter.phase("eval");
        let eval_loss = last_loss * 0.93;
        let global_step = (epoch + 1) * steps_per_epoch - 1;
        reporter.metric_at("eval/loss", eval_loss, global_step);
        reporter.metric_at("eval/perplexity", eval_loss.exp(), global_step);
        reporter.log(&format!(
            "Eval: loss={eval_loss:.4}  ppl={:.2}",
            eval_loss.exp()
        ));

        // Checkpoint after each epoch.
        reporter.phase("save");
        let ckpt_path = format!("/tmp/traincard_demo_ckpt/epoch-{}", epoch + 1);
        let mut metadata = TelemetryMap::new();
        metadata.insert("epoch".to_string(), TelemetryValue::Number((epoch + 1) as f64));
        metadata.insert("eval_loss".to_string(), TelemetryValue::Number(eval_loss));
        reporter.checkpoint_with_metadata(&ckpt_path, metadata);
        reporter.log(&format!("Checkpoint saved -> {ckpt_path}"));
    }

    sampler.stop();
    reporter.finish();

    let state = reporter.state();
    println!("final train loss : {last_loss:.4}");
    println!("checkpoints saved: {}", state.checkpoints.len());
    println!("snapshot         : {}", reporter.output_dir().join("latest.json").display());
    Ok(())
}

/// Deterministic noise in [-1, 1] so the demo needs no RNG dependency.
fn pseudo_noise(step: u64) -> f64 {
    let x = (step.wrapping_mul(2654435761) % 1000) as f64 / 1000.0;
    2.0 * x - 1.0
}
