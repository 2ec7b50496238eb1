use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::ArenaError;
use crate::grid::{Cell, Grid};

/// Picks a cell for the next food item uniformly among the cells not listed in
/// `occupied`. Fails with [`ArenaError::NoFreeCell`] on a full board.
pub fn place_food<'a, R, I>(grid: &Grid, occupied: I, rng: &mut R) -> Result<Cell, ArenaError>
where
    R: Rng + ?Sized,
    I: IntoIterator<Item = &'a Cell>,
{
    let mut taken = vec![false; grid.len()];
    for cell in occupied {
        if let Some(i) = grid.index(*cell) {
            taken[i] = true;
        }
    }

    let free: Vec<Cell> = grid
        .all_cells()
        .iter()
        .zip(taken.iter())
        .filter(|(_, taken)| !**taken)
        .map(|(cell, _)| *cell)
        .collect();

    free.choose(rng).copied().ok_or(ArenaError::NoFreeCell {
        width: grid.width(),
        height: grid.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_never_lands_on_snake() {
        let grid = Grid::new(6, 6);
        let snake: Vec<Cell> = (0..6).map(|c| Cell::new(2, c)).collect();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let food = place_food(&grid, &snake, &mut rng).unwrap();
            assert!(grid.valid(food));
            assert!(!snake.contains(&food));
        }
    }

    #[test]
    fn test_single_free_cell_is_deterministic() {
        let grid = Grid::new(4, 4);
        let last = Cell::new(3, 1);
        let occupied: Vec<Cell> = grid
            .all_cells()
            .iter()
            .copied()
            .filter(|c| *c != last)
            .collect();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            assert_eq!(place_food(&grid, &occupied, &mut rng), Ok(last));
        }
    }

    #[test]
    fn test_full_board_reports_no_free_cell() {
        let grid = Grid::new(3, 3);
        let occupied = grid.all_cells().to_vec();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            place_food(&grid, &occupied, &mut rng),
            Err(ArenaError::NoFreeCell {
                width: 3,
                height: 3
            })
        );
    }
}
