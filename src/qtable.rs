use rand::Rng;
use rurel::mdp::State;
use serde::{Deserialize, Serialize};

use crate::grid::{Cell, Grid};
use crate::snake::{Action, Arena};

/// How a decision point is discretised into a table row.
///
/// * `Position`: `(row, col, heading)`, `width * height * 4` keys.
/// * `PositionDangerFood`: the above times a 4-bit danger mask (one bit per
///   neighbour that would be a crash) times a 4-bit food-direction mask (food
///   above, below, left, right of the cell), `width * height * 4 * 16 * 16` keys.
///
/// Row 0 of every table is reserved for states that do not map to a board
/// cell, so keys are offset by one.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Serialize, Deserialize)]
pub enum StateEncoding {
    Position,
    PositionDangerFood,
}

const MASK_STATES: usize = 16;

/// Largest table the controller will allocate (256 MiB of `[f64; 4]` rows).
pub const MAX_TABLE_ROWS: usize = 1 << 23;

impl StateEncoding {
    /// Number of distinct keys a board cell can produce, excluding the default row.
    pub fn key_space(self, grid: &Grid) -> usize {
        grid.len() * self.keys_per_cell()
    }

    fn keys_per_cell(self) -> usize {
        match self {
            StateEncoding::Position => Action::ALL.len(),
            StateEncoding::PositionDangerFood => Action::ALL.len() * MASK_STATES * MASK_STATES,
        }
    }

    /// Rows to allocate for a table over `grid`.
    pub fn table_rows(self, grid: &Grid) -> usize {
        self.key_space(grid) + 1
    }

    /// [`StateEncoding::table_rows`] for a `width` x `height` board, or `None`
    /// on overflow.
    pub fn checked_table_rows(self, width: usize, height: usize) -> Option<usize> {
        width
            .checked_mul(height)?
            .checked_mul(self.keys_per_cell())?
            .checked_add(1)
    }
}

#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub struct StateKey(usize);

impl StateKey {
    pub const DEFAULT: StateKey = StateKey(0);

    pub fn index(self) -> usize {
        self.0
    }
}

// Rewards are attached to transitions by `reward::Rewards`, not to states,
// so the key only reports the action set.
impl State for StateKey {
    type A = Action;

    fn reward(&self) -> f64 {
        0.0
    }

    fn actions(&self) -> Vec<Self::A> {
        Action::ALL.to_vec()
    }
}

/// Bit `a.index()` is set when stepping from `cell` in direction `a` would crash.
pub fn danger_mask(arena: &Arena, cell: Cell) -> usize {
    Action::ALL
        .iter()
        .filter(|a| !arena.is_safe(cell.moved(**a)))
        .fold(0, |mask, a| mask | (1 << a.index()))
}

/// Bits up, down, left, right (in action order) set when the food lies that way.
pub fn food_mask(cell: Cell, food: Cell) -> usize {
    let mut mask = 0;
    if food.row < cell.row {
        mask |= 1 << Action::Up.index();
    }
    if food.row > cell.row {
        mask |= 1 << Action::Down.index();
    }
    if food.col < cell.col {
        mask |= 1 << Action::Left.index();
    }
    if food.col > cell.col {
        mask |= 1 << Action::Right.index();
    }
    mask
}

/// Encodes the snake standing on `cell` having last moved `heading`.
/// Cells off the board map to [`StateKey::DEFAULT`].
pub fn encode_state(encoding: StateEncoding, arena: &Arena, cell: Cell, heading: Action) -> StateKey {
    let pos = match arena.grid().index(cell) {
        Some(pos) => pos,
        None => return StateKey::DEFAULT,
    };
    let mut raw = pos * Action::ALL.len() + heading.index();
    if encoding == StateEncoding::PositionDangerFood {
        raw = raw * MASK_STATES + danger_mask(arena, cell);
        raw = raw * MASK_STATES + food_mask(cell, arena.food());
    }
    StateKey(raw + 1)
}

/// Dense table of action values, allocated once.
#[derive(Clone, Debug)]
pub struct QTable {
    values: Vec<[f64; 4]>,
}

impl QTable {
    pub fn new(rows: usize) -> QTable {
        QTable {
            values: vec![[0.0; 4]; rows.max(1)],
        }
    }

    /// Table with every row except the default one drawn from `[-jitter, jitter]`.
    pub fn with_jitter<R: Rng + ?Sized>(rows: usize, jitter: f64, rng: &mut R) -> QTable {
        let mut out = QTable::new(rows);
        if jitter > 0.0 {
            for row in out.values.iter_mut().skip(1) {
                for v in row.iter_mut() {
                    *v = rng.gen_range(-jitter..=jitter);
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values for `key`; unknown keys read the default row.
    pub fn get(&self, key: StateKey) -> [f64; 4] {
        self.values.get(key.0).copied().unwrap_or(self.values[0])
    }

    pub fn update(&mut self, key: StateKey, action: Action, value: f64) {
        debug_assert!(key.0 < self.values.len(), "state key {} out of range", key.0);
        if let Some(row) = self.values.get_mut(key.0) {
            row[action.index()] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snake::Snake;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn arena_20() -> Arena {
        let grid = Grid::new(20, 20);
        let snake = Snake::from_cells(
            Cell::new(10, 10),
            &[Cell::new(10, 9), Cell::new(10, 8)],
            3,
            grid.len(),
        );
        Arena::from_parts(grid, snake, Cell::new(3, 14), Action::Right)
    }

    #[test]
    fn test_every_valid_state_is_in_bounds_and_deterministic() {
        let arena = arena_20();
        for encoding in [StateEncoding::Position, StateEncoding::PositionDangerFood] {
            let rows = encoding.table_rows(arena.grid());
            let mut seen = std::collections::HashSet::new();
            for cell in arena.grid().all_cells() {
                for heading in Action::ALL {
                    let key = encode_state(encoding, &arena, *cell, heading);
                    assert_eq!(key, encode_state(encoding, &arena, *cell, heading));
                    assert!(key.index() >= 1 && key.index() < rows);
                    assert!(seen.insert(key), "duplicate key for {} {:?}", cell, heading);
                }
            }
        }
    }

    #[test]
    fn test_off_board_maps_to_default_row() {
        let arena = arena_20();
        for cell in [Cell::new(-1, 5), Cell::new(5, 20), Cell::new(20, 20)] {
            assert_eq!(
                encode_state(StateEncoding::PositionDangerFood, &arena, cell, Action::Up),
                StateKey::DEFAULT
            );
        }
    }

    #[test]
    fn test_key_space_sizes() {
        let grid = Grid::new(20, 20);
        assert_eq!(StateEncoding::Position.key_space(&grid), 1600);
        assert_eq!(StateEncoding::PositionDangerFood.key_space(&grid), 409_600);
        assert_eq!(StateEncoding::Position.table_rows(&grid), 1601);
    }

    #[test]
    fn test_checked_table_rows() {
        let grid = Grid::new(20, 20);
        for encoding in [StateEncoding::Position, StateEncoding::PositionDangerFood] {
            assert_eq!(
                encoding.checked_table_rows(20, 20),
                Some(encoding.table_rows(&grid))
            );
        }
        assert_eq!(
            StateEncoding::PositionDangerFood.checked_table_rows(usize::MAX, 2),
            None
        );
        assert_eq!(StateEncoding::Position.checked_table_rows(usize::MAX / 2, 1), None);
    }

    #[test]
    fn test_masks() {
        let arena = arena_20();
        // body segment to the left of the head
        assert_eq!(danger_mask(&arena, Cell::new(10, 10)), 1 << Action::Left.index());
        // top-left corner: up and left are walls
        assert_eq!(
            danger_mask(&arena, Cell::new(0, 0)),
            (1 << Action::Up.index()) | (1 << Action::Left.index())
        );
        assert_eq!(
            food_mask(Cell::new(10, 10), Cell::new(3, 14)),
            (1 << Action::Up.index()) | (1 << Action::Right.index())
        );
        assert_eq!(food_mask(Cell::new(3, 14), Cell::new(3, 14)), 0);
    }

    #[test]
    fn test_get_clamps_unknown_keys() {
        let mut table = QTable::new(10);
        table.update(StateKey(3), Action::Down, 2.5);
        assert_eq!(table.get(StateKey(3)), [0.0, 2.5, 0.0, 0.0]);
        assert_eq!(table.get(StateKey(999)), [0.0; 4]);
    }

    #[test]
    fn test_jitter_leaves_default_row_zero() {
        let mut rng = StdRng::seed_from_u64(5);
        let table = QTable::with_jitter(50, 0.01, &mut rng);
        assert_eq!(table.get(StateKey::DEFAULT), [0.0; 4]);
        let row = table.get(StateKey(7));
        assert!(row.iter().all(|v| v.abs() <= 0.01));
        assert!(row.iter().any(|v| *v != 0.0));
    }
}
