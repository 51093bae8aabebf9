#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic A* pathfinding over 4-connected walkability grids.
//!
//! The search only sees the board through [`WalkabilityGrid`], so it works
//! for any rectangular grid regardless of how walkability is layered.

use std::{cmp::Reverse, collections::BinaryHeap};

use switchback_core::{CellCoord, Path, WalkabilityGrid};

/// Reusable A* planner that retains its scratch buffers between searches.
#[derive(Debug, Default)]
pub struct Pathfinder {
    prepared_dimensions: Option<(u32, u32)>,
    g_scores: Vec<u32>,
    came_from: Vec<Option<usize>>,
    closed: Vec<bool>,
    open: BinaryHeap<Reverse<OpenNode>>,
}

impl Pathfinder {
    /// Creates a planner with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds a shortest 4-connected path from `start` to `goal`.
    ///
    /// Returns `None` when either endpoint is outside the grid or not
    /// walkable, or when no walkable route connects them. The returned path
    /// includes both endpoints; `start == goal` yields a stationary path.
    ///
    /// Ties between open nodes of equal cost are broken by the smaller
    /// heuristic first and then by ascending `(column, row)`, so the path
    /// shape is identical across runs.
    pub fn find_path<G>(&mut self, grid: &G, start: CellCoord, goal: CellCoord) -> Option<Path>
    where
        G: WalkabilityGrid + ?Sized,
    {
        let (columns, rows) = grid.dimensions();
        let width = usize::try_from(columns).ok()?;
        let start_index = index(width, columns, rows, start)?;
        let goal_index = index(width, columns, rows, goal)?;

        if !grid.is_walkable(start) || !grid.is_walkable(goal) {
            return None;
        }

        if start == goal {
            return Some(Path::stationary(start));
        }

        self.prepare_workspace(columns, rows);
        self.g_scores[start_index] = 0;
        self.open.push(Reverse(OpenNode::new(start, 0, goal)));

        while let Some(Reverse(node)) = self.open.pop() {
            let cell = node.cell();
            let Some(current) = index(width, columns, rows, cell) else {
                continue;
            };

            if self.closed[current] {
                continue;
            }
            self.closed[current] = true;

            if current == goal_index {
                return self.reconstruct(width, start_index, goal_index);
            }

            let next_cost = self.g_scores[current].saturating_add(1);
            for neighbor in cardinal_neighbors(cell, columns, rows) {
                let Some(neighbor_index) = index(width, columns, rows, neighbor) else {
                    continue;
                };
                if self.closed[neighbor_index] || !grid.is_walkable(neighbor) {
                    continue;
                }
                if next_cost >= self.g_scores[neighbor_index] {
                    continue;
                }

                self.g_scores[neighbor_index] = next_cost;
                self.came_from[neighbor_index] = Some(current);
                self.open.push(Reverse(OpenNode::new(neighbor, next_cost, goal)));
            }
        }

        None
    }

    fn prepare_workspace(&mut self, columns: u32, rows: u32) {
        let node_count_u64 = u64::from(columns) * u64::from(rows);
        let node_count = usize::try_from(node_count_u64).unwrap_or(0);

        if self.prepared_dimensions != Some((columns, rows)) {
            self.g_scores = vec![u32::MAX; node_count];
            self.came_from = vec![None; node_count];
            self.closed = vec![false; node_count];
            self.prepared_dimensions = Some((columns, rows));
        } else {
            self.g_scores.fill(u32::MAX);
            self.came_from.fill(None);
            self.closed.fill(false);
        }
        self.open.clear();
    }

    fn reconstruct(&self, width: usize, start_index: usize, goal_index: usize) -> Option<Path> {
        let mut indices = vec![goal_index];
        let mut cursor = goal_index;
        while cursor != start_index {
            cursor = self.came_from[cursor]?;
            indices.push(cursor);
        }

        let cells = indices
            .into_iter()
            .rev()
            .map(|offset| cell_at(width, offset))
            .collect::<Option<Vec<_>>>()?;
        Path::new(cells)
    }
}

/// Convenience wrapper that runs a single search with fresh scratch buffers.
pub fn find_path<G>(grid: &G, start: CellCoord, goal: CellCoord) -> Option<Path>
where
    G: WalkabilityGrid + ?Sized,
{
    Pathfinder::new().find_path(grid, start, goal)
}

/// Entry of the open set ordered by `(f, h, column, row)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct OpenNode {
    estimated_total: u32,
    heuristic: u32,
    column: u32,
    row: u32,
}

impl OpenNode {
    fn new(cell: CellCoord, cost_so_far: u32, goal: CellCoord) -> Self {
        let heuristic = cell.manhattan_distance(goal);
        Self {
            estimated_total: cost_so_far.saturating_add(heuristic),
            heuristic,
            column: cell.column(),
            row: cell.row(),
        }
    }

    fn cell(&self) -> CellCoord {
        CellCoord::new(self.column, self.row)
    }
}

fn cardinal_neighbors(cell: CellCoord, columns: u32, rows: u32) -> impl Iterator<Item = CellCoord> {
    let mut candidates = [None; 4];

    if cell.row() > 0 {
        candidates[0] = Some(CellCoord::new(cell.column(), cell.row() - 1));
    }
    if cell.column() > 0 {
        candidates[1] = Some(CellCoord::new(cell.column() - 1, cell.row()));
    }
    if cell.column() + 1 < columns {
        candidates[2] = Some(CellCoord::new(cell.column() + 1, cell.row()));
    }
    if cell.row() + 1 < rows {
        candidates[3] = Some(CellCoord::new(cell.column(), cell.row() + 1));
    }

    candidates.into_iter().flatten()
}

fn index(width: usize, columns: u32, rows: u32, cell: CellCoord) -> Option<usize> {
    if cell.column() >= columns || cell.row() >= rows {
        return None;
    }
    let column = usize::try_from(cell.column()).ok()?;
    let row = usize::try_from(cell.row()).ok()?;
    row.checked_mul(width)?.checked_add(column)
}

fn cell_at(width: usize, offset: usize) -> Option<CellCoord> {
    if width == 0 {
        return None;
    }
    let column = u32::try_from(offset % width).ok()?;
    let row = u32::try_from(offset / width).ok()?;
    Some(CellCoord::new(column, row))
}
