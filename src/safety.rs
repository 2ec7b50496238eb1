use std::collections::VecDeque;

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::grid::{Cell, Grid};
use crate::snake::{Action, Arena};

/// Shortest 4-connected path from `start` to `goal` avoiding cells for which
/// `blocked` holds. The result excludes `start` and ends with `goal`; it is
/// empty when the goal cannot be reached (or `start == goal`).
pub fn bfs<F>(grid: &Grid, start: Cell, goal: Cell, blocked: F) -> Vec<Cell>
where
    F: Fn(Cell) -> bool,
{
    let (start_i, goal_i) = match (grid.index(start), grid.index(goal)) {
        (Some(s), Some(g)) => (s, g),
        _ => return Vec::new(),
    };
    if start_i == goal_i {
        return Vec::new();
    }

    let mut parent: Vec<Option<usize>> = vec![None; grid.len()];
    let mut visited = vec![false; grid.len()];
    let mut queue = VecDeque::new();
    visited[start_i] = true;
    queue.push_back(start);

    while let Some(cur) = queue.pop_front() {
        for action in Action::ALL {
            let next = match grid.neighbor(cur, action) {
                Some(next) => next,
                None => continue,
            };
            let next_i = match grid.index(next) {
                Some(i) => i,
                None => continue,
            };
            if visited[next_i] || (next_i != goal_i && blocked(next)) {
                continue;
            }
            visited[next_i] = true;
            parent[next_i] = grid.index(cur);
            if next_i == goal_i {
                return walk_back(grid, &parent, start_i, goal_i);
            }
            queue.push_back(next);
        }
    }
    Vec::new()
}

fn walk_back(grid: &Grid, parent: &[Option<usize>], start: usize, goal: usize) -> Vec<Cell> {
    let cells = grid.all_cells();
    let mut path = Vec::new();
    let mut at = goal;
    while at != start {
        path.push(cells[at]);
        match parent[at] {
            Some(p) => at = p,
            None => break,
        }
    }
    path.reverse();
    path
}

/// What to do when the policy picks a move that would crash.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Serialize, Deserialize)]
pub enum SafetyFallback {
    /// Any move onto a free cell, chosen uniformly.
    AnySafeMove,
    /// First step of the shortest path to the food, then any safe move.
    PathToFood,
}

impl SafetyFallback {
    /// A move that survives the next step, or `None` when the snake is trapped.
    pub fn choose<R: Rng + ?Sized>(self, arena: &Arena, rng: &mut R) -> Option<Action> {
        match self {
            SafetyFallback::AnySafeMove => any_safe_move(arena, rng),
            SafetyFallback::PathToFood => {
                let head = arena.head();
                let path = bfs(arena.grid(), head, arena.food(), |c| {
                    arena.snake().contains(c)
                });
                match path.first().and_then(|step| Action::between(head, *step)) {
                    Some(action) => Some(action),
                    None => {
                        debug!("no path from {} to food at {}", head, arena.food());
                        any_safe_move(arena, rng)
                    }
                }
            }
        }
    }
}

pub fn any_safe_move<R: Rng + ?Sized>(arena: &Arena, rng: &mut R) -> Option<Action> {
    let head = arena.head();
    let safe: Vec<Action> = Action::ALL
        .iter()
        .copied()
        .filter(|a| arena.is_safe(head.moved(*a)))
        .collect();
    safe.choose(rng).copied()
}
