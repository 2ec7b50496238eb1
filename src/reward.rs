use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grid::Cell;
use crate::snake::{Action, Arena};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub crash_penalty: f64,
    pub food_reward: f64,
    /// Terminal rewards are multiplied by `1 + length_scale * length`.
    pub length_scale: f64,
    pub approach_reward: f64,
    pub retreat_penalty: f64,
    pub survival_bonus: f64,
    /// Charged once per own-body cell next to the candidate cell.
    pub body_proximity_penalty: f64,
    /// Charged once per tick since the last meal.
    pub hunger_penalty: f64,
    /// Bound on the absolute value of any non-terminal reward. The survival,
    /// hunger and proximity terms together are held within
    /// `shaping_limit - max(|approach_reward|, |retreat_penalty|)` so progress
    /// toward the food always separates moves.
    pub shaping_limit: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        RewardConfig {
            crash_penalty: -10.0,
            food_reward: 10.0,
            length_scale: 0.0,
            approach_reward: 0.1,
            retreat_penalty: -0.1,
            survival_bonus: 0.0,
            body_proximity_penalty: 0.0,
            hunger_penalty: 0.001,
            shaping_limit: 1.0,
        }
    }
}

impl RewardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limit = self.shaping_limit;
        if !(limit >= 0.0 && limit < self.food_reward && limit < -self.crash_penalty) {
            return Err(ConfigError::ShapingOverlapsTerminal { limit });
        }
        let progress = self.progress_margin();
        if progress >= limit {
            return Err(ConfigError::NoProgressHeadroom { limit, progress });
        }
        if self.length_scale < 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "length_scale",
                value: self.length_scale,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        Ok(())
    }

    fn progress_margin(&self) -> f64 {
        self.approach_reward.abs().max(self.retreat_penalty.abs())
    }
}

/// Reward for a candidate move. Crash is always the lowest value, food the
/// highest, everything else is shaped by progress toward the food and clamped
/// strictly between the two.
#[derive(Clone, Debug)]
pub struct Rewards {
    config: RewardConfig,
}

impl Rewards {
    pub fn new(config: RewardConfig) -> Rewards {
        Rewards { config }
    }

    /// `prev` is the current head, `next` the candidate cell; `arena` is the
    /// world before the move is executed.
    pub fn reward(&self, arena: &Arena, prev: Cell, next: Cell, got_food: bool, crashed: bool) -> f64 {
        let c = &self.config;
        let scale = 1.0 + c.length_scale * arena.length() as f64;
        if crashed {
            return c.crash_penalty * scale;
        }
        if got_food {
            return c.food_reward * scale;
        }

        let food = arena.food();
        let before = prev.manhattan(food);
        let after = next.manhattan(food);
        let progress = if after < before {
            c.approach_reward
        } else if after > before {
            c.retreat_penalty
        } else {
            0.0
        };

        let mut background = c.survival_bonus;
        background -= c.hunger_penalty * arena.steps_since_food() as f64;
        if c.body_proximity_penalty != 0.0 {
            let near = Action::ALL
                .iter()
                .map(|a| next.moved(*a))
                .filter(|cell| *cell != prev && arena.snake().contains(*cell))
                .count();
            background -= c.body_proximity_penalty * near as f64;
        }
        let headroom = (c.shaping_limit - c.progress_margin()).max(0.0);
        let shaped = background.clamp(-headroom, headroom) + progress;

        shaped.clamp(-c.shaping_limit, c.shaping_limit)
    }
}
