use std::collections::HashMap;

use rurel::strategy::learn::{LearningStrategy, QLearning};

use crate::qtable::{QTable, StateKey};
use crate::snake::Action;

/// TD(0) update over a [`QTable`]:
///
/// `Q[s][a] = (1 - alpha) * Q[s][a] + alpha * (reward + gamma * max(Q[s']))`
pub struct Learner {
    strategy: QLearning,
}

impl Learner {
    pub fn new(alpha: f64, gamma: f64) -> Learner {
        Learner {
            // unseen values never reach the strategy, every row is allocated
            strategy: QLearning::new(alpha, gamma, 0.0),
        }
    }

    /// Applies the update for the transition `prev --action--> next` and returns
    /// the stored value.
    pub fn update_q(
        &self,
        table: &mut QTable,
        prev: StateKey,
        action: Action,
        next: StateKey,
        reward: f64,
    ) -> f64 {
        // rurel reads successor values from a map; four entries per tick is cheap
        // next to the rest of a frame, so the map is rebuilt each time.
        let next_values: HashMap<Action, f64> = Action::ALL
            .iter()
            .copied()
            .zip(table.get(next).iter().copied())
            .collect();
        let current = table.get(prev)[action.index()];

        let value = <QLearning as LearningStrategy<StateKey>>::value(
            &self.strategy,
            &Some(&next_values),
            &Some(&current),
            reward,
        );
        table.update(prev, action, value);
        value
    }
}
