//! Self-playing Snake trained online with tabular Q-learning.
//!
//! [`AiComponents`] owns the whole simulation and advances it one frame per
//! [`AiComponents::tick`]. Drawing, input and pacing belong to the caller, which
//! reads the snapshot accessors between ticks.

use std::collections::VecDeque;

use log::{debug, error, info, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

pub mod error;
pub mod food;
pub mod grid;
pub mod learn;
pub mod policy;
pub mod qtable;
pub mod reward;
pub mod safety;
pub mod snake;

pub use error::{ArenaError, ConfigError};
pub use grid::{Cell, Grid};
pub use policy::{Decay, ExplorationConfig};
pub use qtable::{encode_state, QTable, StateEncoding, StateKey, MAX_TABLE_ROWS};
pub use reward::RewardConfig;
pub use safety::SafetyFallback;
pub use snake::{Action, Arena, Snake};

use learn::Learner;
use policy::{EpsilonGreedy, Exploration};
use reward::Rewards;

const RECENT_EPISODES: usize = 100;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub width: usize,
    pub height: usize,
    /// Pixels per cell, only read by renderers.
    pub cell_size: u32,
    pub initial_length: usize,
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub exploration: ExplorationConfig,
    /// Learning and exploration stop once this many episodes have ended.
    pub max_training_episodes: u64,
    /// After training, the policy is consulted every this many ticks.
    pub ai_update_interval: u64,
    /// Ticks the board stays frozen after a crash.
    pub reset_delay: u32,
    pub rewards: RewardConfig,
    pub encoding: StateEncoding,
    pub fallback: SafetyFallback,
    /// Initial Q-values are drawn from `[-q_jitter, q_jitter]`.
    pub q_jitter: f64,
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            width: 20,
            height: 20,
            cell_size: 20,
            initial_length: 2,
            learning_rate: 0.1,
            discount_factor: 0.9,
            exploration: ExplorationConfig::default(),
            max_training_episodes: 1000,
            ai_update_interval: 5,
            reset_delay: 10,
            rewards: RewardConfig::default(),
            encoding: StateEncoding::PositionDangerFood,
            fallback: SafetyFallback::PathToFood,
            q_jitter: 0.0,
            seed: None,
        }
    }
}

fn unit_range(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min: 0.0,
            max: 1.0,
        })
    }
}

impl Config {
    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Config, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < 2 || self.height < 2 {
            return Err(ConfigError::GridTooSmall {
                width: self.width,
                height: self.height,
            });
        }
        match self.encoding.checked_table_rows(self.width, self.height) {
            Some(rows) if rows <= MAX_TABLE_ROWS => {}
            _ => {
                return Err(ConfigError::TableTooLarge {
                    width: self.width,
                    height: self.height,
                    max_rows: MAX_TABLE_ROWS,
                })
            }
        }
        if self.initial_length < 2 {
            return Err(ConfigError::InitialLengthTooShort(self.initial_length));
        }
        let cells = self.width * self.height;
        if self.initial_length >= cells {
            return Err(ConfigError::InitialLengthTooLong {
                length: self.initial_length,
                cells,
            });
        }
        unit_range("learning_rate", self.learning_rate)?;
        unit_range("discount_factor", self.discount_factor)?;
        unit_range("exploration.initial_rate", self.exploration.initial_rate)?;
        unit_range("exploration.min_rate", self.exploration.min_rate)?;
        if self.exploration.min_rate > self.exploration.initial_rate {
            return Err(ConfigError::ExplorationFloorAboveStart {
                min: self.exploration.min_rate,
                initial: self.exploration.initial_rate,
            });
        }
        if self.ai_update_interval == 0 {
            return Err(ConfigError::ZeroUpdateInterval);
        }
        if self.q_jitter < 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "q_jitter",
                value: self.q_jitter,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        self.rewards.validate()
    }
}

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Phase {
    Running,
    /// Board frozen after a crash; the reset happens when this reaches zero.
    Resetting { ticks_left: u32 },
}

/// One policy evaluation: what was proposed, what it was worth, what was done.
#[derive(PartialEq, Copy, Clone, Debug)]
pub struct Decision {
    pub state: StateKey,
    pub action: Action,
    pub candidate: Cell,
    pub reward: f64,
    pub committed: Action,
    pub fallback_used: bool,
}

#[derive(PartialEq, Copy, Clone, Debug, Default)]
pub struct TickOutcome {
    pub crashed: bool,
    pub ate_food: bool,
    pub board_full: bool,
    pub decision: Option<Decision>,
}

/// Running totals for a HUD or telemetry collaborator.
#[derive(Clone, Debug, Default)]
pub struct Stats {
    pub total_ticks: u64,
    pub best_score: u32,
    pub last_score: u32,
    pub last_episode_ticks: u64,
    episode_ticks: u64,
    recent_scores: VecDeque<u32>,
}

impl Stats {
    /// Mean score of the last episodes (up to 100).
    pub fn mean_recent_score(&self) -> f64 {
        if self.recent_scores.is_empty() {
            return 0.0;
        }
        self.recent_scores.iter().map(|s| *s as f64).sum::<f64>() / self.recent_scores.len() as f64
    }

    fn end_episode(&mut self, score: u32) {
        self.best_score = self.best_score.max(score);
        self.last_score = score;
        self.last_episode_ticks = self.episode_ticks;
        self.episode_ticks = 0;
        if self.recent_scores.len() == RECENT_EPISODES {
            self.recent_scores.pop_front();
        }
        self.recent_scores.push_back(score);
    }
}

/// The episode controller: owns the arena, the learned table and all counters.
pub struct AiComponents {
    config: Config,
    arena: Arena,
    table: QTable,
    learner: Learner,
    policy: EpsilonGreedy,
    exploration: Exploration,
    rewards: Rewards,
    rng: StdRng,
    phase: Phase,
    episode: u64,
    frame: u64,
    stats: Stats,
}

impl AiComponents {
    pub fn new(config: Config) -> Result<AiComponents, ConfigError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let grid = Grid::new(config.width, config.height);
        // validated: the board has room for the food next to a fresh snake
        let arena = Arena::new(grid, config.initial_length, &mut rng).map_err(|_| {
            ConfigError::InitialLengthTooLong {
                length: config.initial_length,
                cells: config.width * config.height,
            }
        })?;
        Self::assemble(config, arena, rng)
    }

    /// Starts from an explicit arena instead of a fresh one. The board size in
    /// `config` is replaced by the arena's.
    pub fn with_arena(mut config: Config, arena: Arena) -> Result<AiComponents, ConfigError> {
        config.width = arena.grid().width();
        config.height = arena.grid().height();
        config.validate()?;
        let arena = arena.with_initial_length(config.initial_length);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::assemble(config, arena, rng)
    }

    fn assemble(config: Config, arena: Arena, mut rng: StdRng) -> Result<AiComponents, ConfigError> {
        let rows = config.encoding.table_rows(arena.grid());
        let table = QTable::with_jitter(rows, config.q_jitter, &mut rng);
        info!(
            "q-table: {} rows ({:?} on {}x{})",
            rows,
            config.encoding,
            arena.grid().width(),
            arena.grid().height()
        );

        Ok(AiComponents {
            learner: Learner::new(config.learning_rate, config.discount_factor),
            policy: EpsilonGreedy::new(config.exploration.tie_tolerance),
            exploration: Exploration::new(&config.exploration),
            rewards: Rewards::new(config.rewards.clone()),
            config,
            arena,
            table,
            rng,
            phase: Phase::Running,
            episode: 0,
            frame: 0,
            stats: Stats::default(),
        })
    }

    pub fn is_training(&self) -> bool {
        self.episode < self.config.max_training_episodes
    }

    /// Advances the world by one frame.
    pub fn tick(&mut self) -> TickOutcome {
        self.frame += 1;
        self.stats.total_ticks += 1;

        if let Phase::Resetting { ticks_left } = self.phase {
            let left = ticks_left.saturating_sub(1);
            if left == 0 {
                self.reset();
            } else {
                self.phase = Phase::Resetting { ticks_left: left };
            }
            return TickOutcome::default();
        }

        self.stats.episode_ticks += 1;
        let training = self.is_training();
        let mut direction = self.arena.heading();
        let mut decision = None;
        if training || self.frame % self.config.ai_update_interval == 0 {
            let d = self.decide(training);
            direction = d.committed;
            decision = Some(d);
        }

        let moved = self.arena.advance(direction, &mut self.rng);
        trace!(
            "frame {} {:?} -> head {} score {}",
            self.frame,
            direction,
            self.arena.head(),
            self.arena.score()
        );

        let out = TickOutcome {
            crashed: moved.crashed(),
            ate_food: moved.ate_food,
            board_full: moved.board_full,
            decision,
        };

        if out.crashed {
            debug!(
                "episode {} crashed ({:?}) with score {}",
                self.episode,
                moved.collision,
                self.arena.score()
            );
            self.end_episode();
            if self.config.reset_delay == 0 {
                self.reset();
            } else {
                self.phase = Phase::Resetting {
                    ticks_left: self.config.reset_delay,
                };
            }
        } else if out.board_full {
            warn!(
                "episode {} filled the board at length {}, forcing a reset",
                self.episode,
                self.arena.length()
            );
            self.end_episode();
            self.reset();
        }
        out
    }

    fn decide(&mut self, training: bool) -> Decision {
        let encoding = self.config.encoding;
        let head = self.arena.head();
        let state = encode_state(encoding, &self.arena, head, self.arena.heading());
        let epsilon = if training { self.exploration.rate() } else { 0.0 };
        let action = self
            .policy
            .choose_action(&self.table, state, epsilon, &mut self.rng);

        let candidate = head.moved(action);
        let crashed = !self.arena.is_safe(candidate);
        let got_food = !crashed && candidate == self.arena.food();
        let reward = self
            .rewards
            .reward(&self.arena, head, candidate, got_food, crashed);

        if training {
            let next = encode_state(encoding, &self.arena, candidate, action);
            self.learner
                .update_q(&mut self.table, state, action, next, reward);
        }

        let mut committed = action;
        let mut fallback_used = false;
        if crashed {
            fallback_used = true;
            match self.config.fallback.choose(&self.arena, &mut self.rng) {
                Some(safe) => {
                    debug!("{:?} from {} is fatal, taking {:?}", action, head, safe);
                    committed = safe;
                }
                None => debug!("trapped at {}", head),
            }
        }

        Decision {
            state,
            action,
            candidate,
            reward,
            committed,
            fallback_used,
        }
    }

    fn end_episode(&mut self) {
        let was_training = self.is_training();
        self.stats.end_episode(self.arena.score());
        self.episode += 1;

        if was_training {
            self.exploration.decay();
            if !self.is_training() {
                info!(
                    "training complete after {} episodes, final exploration rate {:.3}",
                    self.episode,
                    self.exploration.rate()
                );
            }
        }
        if self.episode % RECENT_EPISODES as u64 == 0 {
            info!(
                "episode {}: best {} mean {:.2} epsilon {:.3}",
                self.episode,
                self.stats.best_score,
                self.stats.mean_recent_score(),
                self.exploration.rate()
            );
        }
    }

    /// Fresh snake and food; the learned table and counters are kept. An
    /// episode still running is abandoned without being scored.
    pub fn reset(&mut self) {
        if let Err(e) = self.arena.reset(&mut self.rng) {
            error!("reset failed: {}", e);
        }
        self.stats.episode_ticks = 0;
        self.phase = Phase::Running;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn head(&self) -> Cell {
        self.arena.head()
    }

    pub fn body(&self) -> impl Iterator<Item = &Cell> {
        self.arena.body().iter()
    }

    pub fn food(&self) -> Cell {
        self.arena.food()
    }

    pub fn score(&self) -> u32 {
        self.arena.score()
    }

    pub fn length(&self) -> usize {
        self.arena.length()
    }

    pub fn episode(&self) -> u64 {
        self.episode
    }

    pub fn exploration_rate(&self) -> f64 {
        self.exploration.rate()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut QTable {
        &mut self.table
    }
}
