use thiserror::Error;

/// Failures raised while mutating the arena.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArenaError {
    /// Every cell of the board is covered by the snake.
    #[error("no free cell left for food on a {width}x{height} board")]
    NoFreeCell { width: usize, height: usize },
}

/// Rejected configuration, reported once when the controller is built.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("grid must be at least 2x2, got {width}x{height}")]
    GridTooSmall { width: usize, height: usize },
    #[error("initial snake length must be at least 2, got {0}")]
    InitialLengthTooShort(usize),
    #[error("initial snake length {length} does not fit a board of {cells} cells")]
    InitialLengthTooLong { length: usize, cells: usize },
    #[error("{name} must lie in [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("exploration floor {min} is above the initial rate {initial}")]
    ExplorationFloorAboveStart { min: f64, initial: f64 },
    #[error("a {width}x{height} board needs more than {max_rows} q-table rows")]
    TableTooLarge {
        width: usize,
        height: usize,
        max_rows: usize,
    },
    #[error("ai update interval must be at least 1")]
    ZeroUpdateInterval,
    #[error("reward shaping limit {limit} must stay below the food reward and crash penalty")]
    ShapingOverlapsTerminal { limit: f64 },
    #[error("progress reward {progress} leaves no room under the shaping limit {limit}")]
    NoProgressHeadroom { limit: f64, progress: f64 },
}
