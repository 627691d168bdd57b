//! # Playback
//!
//! Runs the full playback topology with synthetic collaborators.
//!
//! ```text
//! [source] ─► [demux] ─┬─► [video] ─► [decode-0..N] ─► [frames] ─► [present]
//!                      └─► [audio] ─► [audio-0..M]
//! ```
//!
//! Settings come from `LITEPIPE_*` environment variables.
//!
//! Run: `LITEPIPE_FRAME_INTERVAL_MS=10 cargo run --example playback`

use litepipe::elements::testing::{NullSink, SyntheticDecoder, SyntheticSource};
use litepipe::error::Result;
use litepipe::media::FramePool;
use litepipe::pipeline::{Pipeline, PipelineConfig};
use tracing_subscriber::EnvFilter;

const VIDEO_PACKETS: u64 = 250;
const WIDTH: u32 = 320;
const HEIGHT: u32 = 180;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("litepipe=info")),
        )
        .init();

    let config = PipelineConfig::default().with_env_overrides()?;
    println!("=== Playback ===");
    println!("{:#?}\n", config);

    // RGBA frames.
    let pool = FramePool::new((WIDTH * HEIGHT * 4) as usize, config.frame_queue_capacity);
    let presenter = NullSink::with_name("screen");

    let running = Pipeline::new(config)?.start(
        SyntheticSource::new(VIDEO_PACKETS)
            .with_audio_per_video(2)
            .with_other_every(25)
            .with_payload_size(4096),
        |i| {
            SyntheticDecoder::new(pool.clone())
                .with_dimensions(WIDTH, HEIGHT)
                .with_name(format!("decoder-{}", i))
        },
        presenter.clone(),
        |i| NullSink::with_name(format!("speaker-{}", i)),
    )?;

    let report = running.wait()?;

    println!("\n=== Report ===");
    println!("demuxed:        {}", report.demuxed());
    println!("unrouted:       {}", report.unrouted());
    println!("decoded:        {}", report.decoded());
    println!("presented:      {}", report.presented());
    println!("audio drained:  {}", report.audio_drained());
    println!("frames in use:  {}", pool.outstanding());
    for stage in &report.stages {
        println!(
            "  {:<10} in={:<6} out={:<6} dropped={}",
            stage.name, stage.items_in, stage.items_out, stage.items_dropped
        );
    }
    Ok(())
}
