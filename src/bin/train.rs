use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use serde::Serialize;

use snake_ai::{AiComponents, Config, SafetyFallback, StateEncoding};

#[derive(Clone, Copy, ValueEnum)]
enum Fallback {
    AnySafeMove,
    PathToFood,
}

#[derive(Clone, Copy, ValueEnum)]
enum Encoding {
    Position,
    PositionDangerFood,
}

/// Train headless, then play greedily for a few episodes and report.
#[derive(Parser)]
#[command(name = "train")]
#[command(version, about = "Train the snake agent without a display")]
struct Cli {
    /// JSON file with configuration overrides
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// Training episodes (overrides the config)
    #[arg(long)]
    episodes: Option<u64>,

    /// Greedy episodes to play after training
    #[arg(long, default_value_t = 20)]
    eval_episodes: u64,

    /// Hard stop, in ticks
    #[arg(long, default_value_t = 5_000_000)]
    max_ticks: u64,

    #[arg(long, value_enum)]
    fallback: Option<Fallback>,

    #[arg(long, value_enum)]
    encoding: Option<Encoding>,
}

#[derive(Serialize)]
struct Summary {
    training_episodes: u64,
    eval_episodes: u64,
    ticks: u64,
    best_score: u32,
    mean_eval_score: f64,
    exploration_rate: f64,
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
    if let Some(episodes) = cli.episodes {
        config.max_training_episodes = episodes;
    }
    if let Some(fallback) = cli.fallback {
        config.fallback = match fallback {
            Fallback::AnySafeMove => SafetyFallback::AnySafeMove,
            Fallback::PathToFood => SafetyFallback::PathToFood,
        };
    }
    if let Some(encoding) = cli.encoding {
        config.encoding = match encoding {
            Encoding::Position => StateEncoding::Position,
            Encoding::PositionDangerFood => StateEncoding::PositionDangerFood,
        };
    }

    let training_episodes = config.max_training_episodes;
    let mut ai = AiComponents::new(config)?;

    let mut ticks = 0;
    let mut eval_scores = Vec::new();
    while ticks < cli.max_ticks && (eval_scores.len() as u64) < cli.eval_episodes {
        let training = ai.is_training();
        let outcome = ai.tick();
        ticks += 1;
        if !training && (outcome.crashed || outcome.board_full) {
            eval_scores.push(ai.stats().last_score);
        }
    }
    if ticks == cli.max_ticks {
        warn!("stopped at the {} tick limit", ticks);
    }

    let mean_eval_score = if eval_scores.is_empty() {
        0.0
    } else {
        eval_scores.iter().map(|s| *s as f64).sum::<f64>() / eval_scores.len() as f64
    };
    info!(
        "{} greedy episodes, mean score {:.2}",
        eval_scores.len(),
        mean_eval_score
    );

    let summary = Summary {
        training_episodes,
        eval_episodes: eval_scores.len() as u64,
        ticks,
        best_score: ai.stats().best_score,
        mean_eval_score,
        exploration_rate: ai.exploration_rate(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
