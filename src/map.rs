use anyhow::{anyhow, bail, Context};
use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::common::Cell;

// Up, right, down, left, stay.
const CARDINAL_DIRECTIONS: [(isize, isize); 5] = [(0, 1), (1, 0), (0, -1), (-1, 0), (0, 0)];
const DIAGONAL_DIRECTIONS: [(isize, isize); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

#[derive(Debug, Clone)]
pub struct Tile {
    passable: bool,
    pub neighbors: Vec<Cell>, // Cardinal moves plus stay
    pub diagonal_neighbors: Vec<Cell>,
}

impl Tile {
    pub fn is_passable(&self) -> bool {
        self.passable
    }
}

/// Rectangular grid addressed `grid[y][x]`.
#[derive(Debug, Clone)]
pub struct Map {
    pub height: usize,
    pub width: usize,
    pub grid: Vec<Vec<Tile>>,
}

impl Map {
    /// Builds a map from a 0/1 matrix where 1 marks an obstacle.
    pub fn from_matrix(matrix: &[Vec<u8>]) -> anyhow::Result<Self> {
        let height = matrix.len();
        let width = matrix.first().map(Vec::len).unwrap_or(0);
        if height == 0 || width == 0 {
            bail!("grid must have at least one row and one column");
        }

        let mut grid = Vec::with_capacity(height);
        for (y, row) in matrix.iter().enumerate() {
            if row.len() != width {
                bail!("grid row {y} has {} columns, expected {width}", row.len());
            }
            let tiles_row = row
                .iter()
                .map(|&value| match value {
                    0 | 1 => Ok(Tile {
                        passable: value == 0,
                        neighbors: Vec::new(),
                        diagonal_neighbors: Vec::new(),
                    }),
                    other => Err(anyhow!("grid value {other} at row {y} is neither 0 nor 1")),
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            grid.push(tiles_row);
        }

        let mut map = Map {
            height,
            width,
            grid,
        };
        map.initialize_neighbors();
        Ok(map)
    }

    /// Reads a MovingAI `.map` file; `.` and `G` are passable.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let file = File::open(path).with_context(|| format!("cannot open map file {path}"))?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let mut header_value = |name: &str| -> anyhow::Result<usize> {
            let line = lines
                .next()
                .ok_or_else(|| anyhow!("map file ended before {name} header"))??;
            line.split_whitespace()
                .last()
                .ok_or_else(|| anyhow!("empty {name} header"))?
                .parse::<usize>()
                .with_context(|| format!("invalid {name} header: {line}"))
        };

        // Skip "type octile".
        let _type = header_value("type").ok();
        let height = header_value("height")?;
        let width = header_value("width")?;
        // Skip the "map" marker.
        let _map = lines.next();

        let mut matrix = Vec::with_capacity(height);
        for line in lines.take(height) {
            let row: Vec<u8> = line?
                .chars()
                .take(width)
                .map(|ch| if ch == '.' || ch == 'G' { 0 } else { 1 })
                .collect();
            matrix.push(row);
        }
        if matrix.len() != height {
            bail!("map file declares {height} rows but contains {}", matrix.len());
        }

        Map::from_matrix(&matrix)
    }

    fn initialize_neighbors(&mut self) {
        for y in 0..self.height {
            for x in 0..self.width {
                if self.grid[y][x].passable {
                    let cell = Cell::new(x, y);
                    self.grid[y][x].neighbors = self.collect_steps(cell, &CARDINAL_DIRECTIONS);
                    self.grid[y][x].diagonal_neighbors =
                        self.collect_steps(cell, &DIAGONAL_DIRECTIONS);
                }
            }
        }
    }

    fn collect_steps(&self, cell: Cell, directions: &[(isize, isize)]) -> Vec<Cell> {
        directions
            .iter()
            .filter_map(|&(dx, dy)| self.step(cell, dx, dy))
            .filter(|&next| self.is_passable(next))
            .collect()
    }

    /// Offsets a cell, returning `None` when the result leaves the grid.
    pub fn step(&self, cell: Cell, dx: isize, dy: isize) -> Option<Cell> {
        let x = cell.x.checked_add_signed(dx)?;
        let y = cell.y.checked_add_signed(dy)?;
        (x < self.width && y < self.height).then_some(Cell::new(x, y))
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    pub fn is_passable(&self, cell: Cell) -> bool {
        self.contains(cell) && self.grid[cell.y][cell.x].is_passable()
    }

    /// Passable successors of `cell`, including `cell` itself (wait). Order is
    /// fixed: up, right, down, left, stay, then diagonals when enabled.
    pub fn get_neighbors(&self, cell: Cell, allow_diagonals: bool) -> Vec<Cell> {
        if !self.is_passable(cell) {
            return Vec::new();
        }
        let tile = &self.grid[cell.y][cell.x];
        let mut neighbors = tile.neighbors.clone();
        if allow_diagonals {
            neighbors.extend_from_slice(&tile.diagonal_neighbors);
        }
        neighbors
    }

    /// Cells a formation member may occupy one step after holding `cell`:
    /// always 8-connected plus stay, regardless of movement connectivity.
    pub fn morphic_neighbors(&self, cell: Cell) -> Vec<Cell> {
        if !self.contains(cell) {
            return Vec::new();
        }
        let mut neighbors = self.collect_steps(cell, &DIAGONAL_DIRECTIONS);
        neighbors.extend(self.collect_steps(cell, &CARDINAL_DIRECTIONS));
        neighbors
    }
}
