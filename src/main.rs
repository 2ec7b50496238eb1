use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use snake_ai::{AiComponents, Config};

/// Watch the agent learn in the terminal, one text frame per tick.
#[derive(Parser)]
#[command(name = "snake_ai")]
#[command(version, about = "Self-playing Q-learning snake")]
struct Cli {
    /// JSON file with configuration overrides
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// Frames to show before exiting
    #[arg(long, default_value_t = 1000)]
    frames: u64,

    /// Delay between frames in milliseconds
    #[arg(long, default_value_t = 100)]
    frame_ms: u64,

    /// Ticks to run without drawing before the first frame
    #[arg(long, default_value_t = 0)]
    warmup: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Config::from_json(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => Config::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    let mut ai = AiComponents::new(config)?;
    for _ in 0..cli.warmup {
        ai.tick();
    }
    info!("warmup done after {} episodes", ai.episode());

    let delay = Duration::from_millis(cli.frame_ms);
    for _ in 0..cli.frames {
        ai.tick();
        // clear and home the cursor
        print!("\x1b[2J\x1b[H");
        println!("{}", ai.arena());
        println!(
            "episode {}  epsilon {:.3}  best {}  mean {:.2}{}",
            ai.episode(),
            ai.exploration_rate(),
            ai.stats().best_score,
            ai.stats().mean_recent_score(),
            if ai.is_training() { "  (training)" } else { "" }
        );
        std::thread::sleep(delay);
    }
    Ok(())
}
