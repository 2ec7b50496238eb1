use std::collections::VecDeque;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ArenaError;
use crate::food::place_food;
use crate::grid::{Cell, Grid};

/// Movement directions. The discriminant is the action's column in the Q-table.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, Serialize, Deserialize)]
pub enum Action {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Up, Action::Down, Action::Left, Action::Right];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Action> {
        Action::ALL.get(index).copied()
    }

    /// (row, col) offset of one step.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Action::Up => (-1, 0),
            Action::Down => (1, 0),
            Action::Left => (0, -1),
            Action::Right => (0, 1),
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Action {
        Action::ALL[rng.gen_range(0..Action::ALL.len())]
    }

    /// The action leading from `from` to the adjacent cell `to`.
    pub fn between(from: Cell, to: Cell) -> Option<Action> {
        Action::ALL.iter().copied().find(|a| from.moved(*a) == to)
    }
}

/// Snake body kept head-first in a deque allocated once for the whole board.
/// `length` is the logical length the body grows to; the deque may be shorter
/// right after a reset or a meal.
#[derive(Clone, Debug, PartialEq)]
pub struct Snake {
    body: VecDeque<Cell>,
    length: usize,
}

impl Snake {
    /// A fresh snake occupying only its head cell.
    pub fn new(head: Cell, length: usize, capacity: usize) -> Snake {
        let mut body = VecDeque::with_capacity(capacity.max(length) + 1);
        body.push_back(head);
        Snake { body, length }
    }

    /// Builds a snake from explicit segments, head first. `length` is raised to
    /// the number of segments when it is smaller.
    pub fn from_cells(head: Cell, tail: &[Cell], length: usize, capacity: usize) -> Snake {
        let mut out = Snake::new(head, length.max(tail.len() + 1), capacity);
        out.body.extend(tail.iter().copied());
        out
    }

    pub fn head(&self) -> Cell {
        // never empty: every constructor pushes the head and `advance` only trims to length >= 1
        self.body[0]
    }

    pub fn body(&self) -> &VecDeque<Cell> {
        &self.body
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.body.contains(&cell)
    }

    /// Prepends `new_head` and trims the tail to the logical length.
    pub fn advance(&mut self, new_head: Cell) {
        self.body.push_front(new_head);
        self.body.truncate(self.length);
    }

    pub fn grow(&mut self) {
        self.length += 1;
    }
}

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Collision {
    Wall,
    Body,
}

/// What happened to the arena after one committed move.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Default)]
pub struct MoveOutcome {
    pub ate_food: bool,
    pub collision: Option<Collision>,
    // food was eaten but no free cell was left for the next item
    pub board_full: bool,
}

impl MoveOutcome {
    pub fn crashed(&self) -> bool {
        self.collision.is_some()
    }
}

/// The world the agent lives in: board, snake, food and score.
#[derive(Clone, Debug)]
pub struct Arena {
    grid: Grid,
    snake: Snake,
    food: Cell,
    heading: Action,
    score: u32,
    initial_length: usize,
    steps_since_food: u32,
}

impl Arena {
    pub fn new<R: Rng + ?Sized>(
        grid: Grid,
        initial_length: usize,
        rng: &mut R,
    ) -> Result<Arena, ArenaError> {
        let center = grid.center();
        let capacity = grid.len();
        let mut out = Arena {
            grid,
            snake: Snake::new(center, initial_length, capacity),
            food: center,
            heading: Action::Up,
            score: 0,
            initial_length,
            steps_since_food: 0,
        };
        out.reset(rng)?;
        Ok(out)
    }

    /// An arena in an explicit position. The food cell is taken as given.
    pub fn from_parts(grid: Grid, snake: Snake, food: Cell, heading: Action) -> Arena {
        let initial_length = snake.length();
        Arena {
            grid,
            snake,
            food,
            heading,
            score: 0,
            initial_length,
            steps_since_food: 0,
        }
    }

    /// Length a fresh snake gets on [`Arena::reset`].
    pub fn with_initial_length(mut self, initial_length: usize) -> Arena {
        self.initial_length = initial_length;
        self
    }

    /// Puts a fresh snake of the initial length on the centre cell, picks a
    /// random heading and places new food. The score is cleared.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), ArenaError> {
        self.snake = Snake::new(self.grid.center(), self.initial_length, self.grid.len());
        self.heading = Action::random(rng);
        self.score = 0;
        self.steps_since_food = 0;
        self.food = place_food(&self.grid, self.snake.body(), rng)?;
        Ok(())
    }

    pub fn collision(&self, cell: Cell) -> Option<Collision> {
        if !self.grid.valid(cell) {
            Some(Collision::Wall)
        } else if self.snake.contains(cell) {
            Some(Collision::Body)
        } else {
            None
        }
    }

    /// Whether stepping onto `cell` would be survived.
    pub fn is_safe(&self, cell: Cell) -> bool {
        self.collision(cell).is_none()
    }

    /// Executes `action`. On a collision nothing is mutated; otherwise the body
    /// moves, and eating grows the snake and places new food.
    pub fn advance<R: Rng + ?Sized>(&mut self, action: Action, rng: &mut R) -> MoveOutcome {
        let new_head = self.snake.head().moved(action);
        if let Some(collision) = self.collision(new_head) {
            return MoveOutcome {
                collision: Some(collision),
                ..MoveOutcome::default()
            };
        }

        self.heading = action;
        self.snake.advance(new_head);
        self.steps_since_food += 1;

        let mut outcome = MoveOutcome::default();
        if new_head == self.food {
            outcome.ate_food = true;
            self.score += 1;
            self.snake.grow();
            self.steps_since_food = 0;
            match place_food(&self.grid, self.snake.body(), rng) {
                Ok(food) => self.food = food,
                Err(_) => outcome.board_full = true,
            }
        }
        outcome
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    pub fn head(&self) -> Cell {
        self.snake.head()
    }

    pub fn body(&self) -> &VecDeque<Cell> {
        self.snake.body()
    }

    pub fn length(&self) -> usize {
        self.snake.length()
    }

    pub fn food(&self) -> Cell {
        self.food
    }

    pub fn heading(&self) -> Action {
        self.heading
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn initial_length(&self) -> usize {
        self.initial_length
    }

    pub fn steps_since_food(&self) -> u32 {
        self.steps_since_food
    }
}

impl fmt::Display for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = self.head();
        for row in 0..self.grid.height() as i32 {
            for col in 0..self.grid.width() as i32 {
                let cell = Cell::new(row, col);
                let c = if cell == head {
                    '@'
                } else if self.snake.contains(cell) {
                    'o'
                } else if cell == self.food {
                    '*'
                } else {
                    '.'
                };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        write!(f, "score {} length {}", self.score, self.length())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn row_snake(cells: &[(i32, i32)]) -> Snake {
        let cells: Vec<Cell> = cells.iter().map(|&(r, c)| Cell::new(r, c)).collect();
        Snake::from_cells(cells[0], &cells[1..], cells.len(), 400)
    }

    #[test]
    fn test_action_encoding() {
        assert_eq!(Action::Up.index(), 0);
        assert_eq!(Action::Down.index(), 1);
        assert_eq!(Action::Left.index(), 2);
        assert_eq!(Action::Right.index(), 3);
        assert_eq!(Action::from_index(3), Some(Action::Right));
        assert_eq!(Action::from_index(4), None);
        assert_eq!(
            Action::between(Cell::new(5, 5), Cell::new(4, 5)),
            Some(Action::Up)
        );
        assert_eq!(Action::between(Cell::new(5, 5), Cell::new(7, 5)), None);
    }

    #[test]
    fn test_snake_grows_to_length_then_slides() {
        let mut snake = Snake::new(Cell::new(5, 5), 3, 100);
        assert_eq!(snake.body().len(), 1);

        snake.advance(Cell::new(5, 6));
        snake.advance(Cell::new(5, 7));
        assert_eq!(snake.body().len(), 3);
        snake.advance(Cell::new(5, 8));
        assert_eq!(snake.body().len(), 3);
        assert_eq!(snake.head(), Cell::new(5, 8));
        assert!(!snake.contains(Cell::new(5, 5)));

        snake.grow();
        snake.advance(Cell::new(5, 9));
        assert_eq!(snake.body().len(), 4);
        assert_eq!(snake.length(), 4);
    }

    #[test]
    fn test_collision_does_not_mutate() {
        let grid = Grid::new(10, 10);
        let snake = row_snake(&[(0, 5), (0, 6), (0, 7)]);
        let mut arena = Arena::from_parts(grid, snake.clone(), Cell::new(9, 9), Action::Left);
        let mut rng = StdRng::seed_from_u64(3);

        let outcome = arena.advance(Action::Up, &mut rng);
        assert_eq!(outcome.collision, Some(Collision::Wall));
        let outcome = arena.advance(Action::Right, &mut rng);
        assert_eq!(outcome.collision, Some(Collision::Body));

        assert_eq!(arena.snake(), &snake);
        assert_eq!(arena.food(), Cell::new(9, 9));
        assert_eq!(arena.heading(), Action::Left);
    }

    #[test]
    fn test_reset_centres_snake_and_avoids_food_overlap() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut arena = Arena::new(Grid::new(20, 20), 2, &mut rng).unwrap();
        for _ in 0..50 {
            arena.reset(&mut rng).unwrap();
            assert_eq!(arena.head(), Cell::new(10, 10));
            assert_eq!(arena.length(), 2);
            assert_eq!(arena.score(), 0);
            assert!(!arena.snake().contains(arena.food()));
        }
    }

    #[test]
    fn test_display_marks_head_body_food() {
        let grid = Grid::new(3, 2);
        let snake = row_snake(&[(0, 0), (0, 1)]);
        let arena = Arena::from_parts(grid, snake, Cell::new(1, 2), Action::Left);
        let text = arena.to_string();
        assert!(text.starts_with("@o.\n..*\n"));
    }
}
