//! Occupancy grid: one cell per world unit, set where an obstacle stands.
//! Only axis-aligned obstacles are supported; a world with any rotated box
//! has no grid.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use shared::world::World;
use shared::Vec2;

#[derive(Debug, Clone)]
pub struct OccGrid {
    width: usize,
    height: usize,
    /// Column-major: `cells[x * height + y]`.
    cells: Vec<bool>,
    offset_x: i64,
    offset_y: i64,
}

/// A noisy view of part of the grid, in the shape the `occgrid` command reports.
#[derive(Debug, Clone, PartialEq)]
pub struct GridReading {
    /// World coordinate of the window's lower-left cell.
    pub at: (i64, i64),
    pub width: usize,
    pub height: usize,
    /// One string of `0`/`1` per x column, each `height` long.
    pub rows: Vec<String>,
}

impl OccGrid {
    pub fn build(world: &World) -> Option<Self> {
        if world.obstacles.iter().any(|o| o.is_rotated()) {
            return None;
        }
        let width = world.width.max(0.0) as usize;
        let height = world.height.max(0.0) as usize;
        let mut grid = Self {
            width,
            height,
            cells: vec![false; width * height],
            offset_x: (world.width / 2.0) as i64,
            offset_y: (world.height / 2.0) as i64,
        };
        for obstacle in &world.obstacles {
            let lx = (obstacle.rect.x as i64) + grid.offset_x;
            let ly = (obstacle.rect.y as i64) + grid.offset_y;
            for dx in 0..obstacle.size.x as i64 {
                for dy in 0..obstacle.size.y as i64 {
                    grid.set(lx + dx, ly + dy);
                }
            }
        }
        Some(grid)
    }

    fn set(&mut self, x: i64, y: i64) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.cells[x as usize * self.height + y as usize] = true;
        }
    }

    /// Occupancy at grid coordinates (world coordinates shifted by half the world size).
    pub fn occupied(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.cells[x * self.height + y]
    }

    /// Samples a `window`-wide square centered on `center`, clipped to the world.
    /// Occupied cells read `1` with probability `true_positive`; free cells read
    /// `0` with probability `true_negative`.
    pub fn sample(
        &self,
        center: Vec2,
        window: usize,
        true_positive: f32,
        true_negative: f32,
        rng: &mut impl Rng,
    ) -> GridReading {
        let half = window as i64 / 2;
        let cx = center.x as i64;
        let cy = center.y as i64;

        let at = ((cx - half).max(-self.offset_x), (cy - half).max(-self.offset_y));
        let start_x = (cx + self.offset_x - half).max(0);
        let start_y = (cy + self.offset_y - half).max(0);
        let end_x = (cx + self.offset_x - half + window as i64).min(self.width as i64);
        let end_y = (cy + self.offset_y - half + window as i64).min(self.height as i64);
        let width = (end_x - start_x).max(0) as usize;
        let height = (end_y - start_y).max(0) as usize;

        let rows = (0..width)
            .map(|dx| {
                (0..height)
                    .map(|dy| {
                        let occ = self.occupied(start_x as usize + dx, start_y as usize + dy);
                        let r: f32 = rng.gen();
                        let reads_occupied = if occ {
                            r < true_positive
                        } else {
                            r > true_negative
                        };
                        if reads_occupied {
                            '1'
                        } else {
                            '0'
                        }
                    })
                    .collect::<String>()
            })
            .collect();

        GridReading {
            at,
            width,
            height,
            rows,
        }
    }
}

impl GridReading {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(format!("at {},{}", self.at.0, self.at.1));
        lines.push(format!("size {}x{}", self.width, self.height));
        lines.extend(self.rows.iter().cloned());
        lines
    }
}

/// Draws from a gaussian around `mean`; a non-positive `sigma` returns `mean`.
pub fn gauss(rng: &mut impl Rng, mean: f32, sigma: f32) -> f32 {
    if sigma <= 0.0 {
        return mean;
    }
    Normal::new(mean, sigma).map_or(mean, |n| n.sample(rng))
}
