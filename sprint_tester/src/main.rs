use clap::Parser;
use sprint_vision::engine::CAPTURE_PERIOD;
use sprint_vision::{
    EngineConfig, ImageSequenceSource, SessionClock, SessionState, SprintEngine, format_elapsed,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

/// How long to wait for the final frame's result once the sequence is used up.
const EXHAUSTED_GRACE: Duration = Duration::from_secs(2);

/// Replays a directory of still frames through the sprint gate as if they came from
/// a camera, one frame per capture tick, and prints the timed result.
#[derive(Debug, Parser)]
#[command(name = "sprint_tester")]
struct Args {
    /// Directory of image frames, replayed in file name order.
    #[arg(long)]
    frames: PathBuf,

    /// TOML engine config. Falls back to SPRINT_VISION_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Per-pixel change threshold (10-100), overriding the config.
    #[arg(long)]
    sensitivity: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // --- 1. Configuration ---
    let mut config = match &args.config {
        Some(path) => {
            EngineConfig::load_with(Some(path.as_path()), |key| std::env::var(key).ok())?
        }
        None => EngineConfig::load()?,
    };
    if let Some(sensitivity) = args.sensitivity {
        config.sensitivity = EngineConfig::saturate_sensitivity(sensitivity);
    }

    // --- 2. Frame Source & Engine ---
    let clock = SessionClock::new();
    let source = ImageSequenceSource::from_dir(&args.frames, clock)?;
    log::info!("replaying {} frames from {}", source.len(), args.frames.display());
    let mut engine = SprintEngine::new(source, &config, clock);
    let mut status = engine.subscribe();
    engine.start_detecting()?;
    println!("Waiting for start...");

    // --- 3. Presentation Loop ---
    let mut last_state = SessionState::Armed;
    let mut exhausted_at = None;
    loop {
        let snapshot = *status.borrow_and_update();
        if snapshot.state != last_state {
            match snapshot.state {
                SessionState::Running => println!("Timer running!"),
                SessionState::Completed => {
                    println!("Sprint complete: {}", format_elapsed(snapshot.elapsed));
                    break;
                }
                SessionState::Idle | SessionState::Armed => {}
            }
            last_state = snapshot.state;
        }

        // The last path is handed out before it is decoded; give its tick time to land.
        if engine.source().remaining() == 0 && exhausted_at.is_none() {
            exhausted_at = Some(Instant::now() + EXHAUSTED_GRACE);
        }
        let expired = exhausted_at.is_some_and(|deadline| Instant::now() >= deadline);
        if expired {
            engine.stop_detecting();
            let snapshot = engine.snapshot();
            println!(
                "Frames exhausted in state {:?} after {} detection(s), elapsed {}",
                snapshot.state,
                snapshot.detection_count,
                format_elapsed(snapshot.elapsed)
            );
            break;
        }

        // Wake on the next published snapshot or after one capture period.
        let _ = tokio::time::timeout(CAPTURE_PERIOD, status.changed()).await;
    }

    engine.reset();
    Ok(())
}
