use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::qtable::{QTable, StateKey};
use crate::snake::Action;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Decay {
    /// Subtract `step` per finished episode.
    Linear { step: f64 },
    /// Multiply by `factor` per finished episode.
    Exponential { factor: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    pub initial_rate: f64,
    pub min_rate: f64,
    pub decay: Decay,
    /// Values within this distance of the row maximum count as tied.
    pub tie_tolerance: f64,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        ExplorationConfig {
            initial_rate: 0.3,
            min_rate: 0.1,
            decay: Decay::Linear { step: 0.001 },
            tie_tolerance: 1e-9,
        }
    }
}

/// Exploration rate with its decay schedule. The rate only ever moves down
/// and never below the floor.
#[derive(Clone, Debug)]
pub struct Exploration {
    rate: f64,
    min_rate: f64,
    decay: Decay,
}

impl Exploration {
    pub fn new(config: &ExplorationConfig) -> Exploration {
        Exploration {
            rate: config.initial_rate,
            min_rate: config.min_rate,
            decay: config.decay,
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn decay(&mut self) {
        let next = match self.decay {
            Decay::Linear { step } => self.rate - step.abs(),
            Decay::Exponential { factor } => self.rate * factor.clamp(0.0, 1.0),
        };
        self.rate = next.max(self.min_rate).min(self.rate);
    }
}

/// Epsilon-greedy selection with a randomised tie-break, so equal rows do not
/// always resolve to the same direction.
#[derive(Clone, Debug)]
pub struct EpsilonGreedy {
    tie_tolerance: f64,
}

impl EpsilonGreedy {
    pub fn new(tie_tolerance: f64) -> EpsilonGreedy {
        EpsilonGreedy {
            tie_tolerance: tie_tolerance.abs(),
        }
    }

    pub fn choose_action<R: Rng + ?Sized>(
        &self,
        table: &QTable,
        state: StateKey,
        epsilon: f64,
        rng: &mut R,
    ) -> Action {
        if rng.gen::<f64>() < epsilon {
            return Action::random(rng);
        }
        self.greedy_action(table.get(state), rng)
    }

    /// Uniform choice among the actions whose value is within tolerance of the maximum.
    pub fn greedy_action<R: Rng + ?Sized>(&self, values: [f64; 4], rng: &mut R) -> Action {
        let best = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let tied: Vec<Action> = Action::ALL
            .iter()
            .copied()
            .filter(|a| values[a.index()] >= best - self.tie_tolerance)
            .collect();
        match tied.choose(rng) {
            Some(action) => *action,
            // all NaN
            None => Action::random(rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn table_with(values: [f64; 4]) -> (QTable, StateKey) {
        let mut table = QTable::new(2);
        let key = StateKey::DEFAULT;
        for action in Action::ALL {
            table.update(key, action, values[action.index()]);
        }
        (table, key)
    }

    fn counts(policy: &EpsilonGreedy, values: [f64; 4], epsilon: f64, trials: usize) -> [usize; 4] {
        let (table, key) = table_with(values);
        let mut rng = StdRng::seed_from_u64(42);
        let mut out = [0; 4];
        for _ in 0..trials {
            out[policy.choose_action(&table, key, epsilon, &mut rng).index()] += 1;
        }
        out
    }

    #[test]
    fn test_full_exploration_is_uniform() {
        let policy = EpsilonGreedy::new(1e-9);
        let trials = 40_000;
        // a strongly preferred action must not leak through when epsilon is 1
        let seen = counts(&policy, [0.0, 0.0, 0.0, 100.0], 1.0, trials);
        let expected = trials as f64 / 4.0;
        let chi2: f64 = seen
            .iter()
            .map(|&n| (n as f64 - expected).powi(2) / expected)
            .sum();
        // 3 degrees of freedom, p = 0.001
        assert!(chi2 < 16.27, "chi-square {} for {:?}", chi2, seen);
    }

    #[test]
    fn test_greedy_single_maximum() {
        let policy = EpsilonGreedy::new(1e-9);
        let seen = counts(&policy, [0.1, -2.0, 0.7, 0.3], 0.0, 1_000);
        assert_eq!(seen, [0, 0, 1_000, 0]);
    }

    #[test]
    fn test_greedy_ties_are_fair() {
        let policy = EpsilonGreedy::new(1e-6);
        let trials = 30_000;
        let seen = counts(&policy, [1.0, 1.0 - 1e-8, 0.0, 1.0], 0.0, trials);
        assert_eq!(seen[Action::Left.index()], 0);
        for action in [Action::Up, Action::Down, Action::Right] {
            let share = seen[action.index()] as f64 / trials as f64;
            assert!((share - 1.0 / 3.0).abs() < 0.02, "{:?} share {}", action, share);
        }
    }

    #[test]
    fn test_all_zero_row_spreads_over_every_action() {
        let policy = EpsilonGreedy::new(1e-9);
        let seen = counts(&policy, [0.0; 4], 0.0, 4_000);
        assert!(seen.iter().all(|&n| n > 800), "{:?}", seen);
    }

    #[test]
    fn test_linear_decay_stops_at_floor() {
        let mut exploration = Exploration::new(&ExplorationConfig::default());
        let mut last = exploration.rate();
        for _ in 0..1_000 {
            exploration.decay();
            assert!(exploration.rate() <= last);
            last = exploration.rate();
        }
        assert!((exploration.rate() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_exponential_decay() {
        let config = ExplorationConfig {
            initial_rate: 1.0,
            min_rate: 0.05,
            decay: Decay::Exponential { factor: 0.5 },
            ..ExplorationConfig::default()
        };
        let mut exploration = Exploration::new(&config);
        exploration.decay();
        assert!((exploration.rate() - 0.5).abs() < 1e-12);
        for _ in 0..20 {
            exploration.decay();
        }
        assert!((exploration.rate() - 0.05).abs() < 1e-12);
    }
}
