//! Rectangular board with layered walkability overlays.
//!
//! Effective walkability of a cell is resolved in a fixed order:
//!
//! 1. cells blocked by a registered occupant are never walkable;
//! 2. otherwise cells forced walkable by an active pattern are walkable;
//! 3. otherwise cells forced blocked by an active pattern are not walkable;
//! 4. otherwise the designer-authored base layer decides.
//!
//! Pattern overlays and occupant blocks are reference counted per cell, so
//! overlapping patterns and overlapping footprints compose and can be removed
//! independently.

use std::{collections::BTreeMap, fmt};

use switchback_core::{
    CellCoord, ObstacleId, PatternDefinition, PatternId, PatternStatus, WalkStatus,
    WalkabilityGrid, WorldPoint,
};
use thiserror::Error;

use crate::{entities::BlocksCells, occupancy::OccupantRegistry};

/// Reasons a board cannot be constructed with the requested layout.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum BoardError {
    /// Either dimension was zero.
    #[error("board dimensions must be positive, got {columns}x{rows}")]
    EmptyDimensions {
        /// Requested number of columns.
        columns: u32,
        /// Requested number of rows.
        rows: u32,
    },
    /// The cell count does not fit in memory addressing.
    #[error("board of {columns}x{rows} cells is too large")]
    TooLarge {
        /// Requested number of columns.
        columns: u32,
        /// Requested number of rows.
        rows: u32,
    },
    /// The cell size was zero, negative, or not finite.
    #[error("cell size must be a positive finite number, got {0}")]
    InvalidCellSize(f32),
}

/// Identifier returned when subscribing to walkability changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u32);

/// What caused a batch of walkability changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeCause {
    /// A base-layer cell was painted.
    BaseEdited,
    /// A pattern was applied.
    PatternApplied(PatternId),
    /// A pattern was reverted.
    PatternReverted(PatternId),
    /// An occupant footprint was registered.
    OccupantRegistered(ObstacleId),
    /// A registered occupant moved, rotated, or changed mirroring.
    OccupantMoved(ObstacleId),
    /// An occupant footprint was unregistered.
    OccupantUnregistered(ObstacleId),
    /// The board layout was restored from a snapshot; every cell is listed.
    Restored,
}

/// Notification delivered to walkability observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkabilityChange {
    /// Mutation that produced the change.
    pub cause: ChangeCause,
    /// Cells whose effective walkability flipped, ascending by index.
    pub cells: Vec<CellCoord>,
}

/// Callback invoked with every walkability change on a board.
pub type WalkabilityObserver = Box<dyn FnMut(&WalkabilityChange)>;

#[derive(Default)]
struct ObserverList {
    next_id: u32,
    entries: Vec<(ObserverId, WalkabilityObserver)>,
}

impl ObserverList {
    fn subscribe(&mut self, observer: WalkabilityObserver) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.entries.push((id, observer));
        id
    }

    fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    fn notify(&mut self, change: &WalkabilityChange) {
        for (_, observer) in &mut self.entries {
            observer(change);
        }
    }
}

impl fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("subscribers", &self.entries.len())
            .finish()
    }
}

/// Authoritative cell grid with base walkability, pattern overlays, and
/// occupant blocking.
#[derive(Debug)]
pub struct Board {
    columns: u32,
    rows: u32,
    cell_size: f32,
    origin: WorldPoint,
    base: Vec<WalkStatus>,
    forced_walkable: Vec<u16>,
    forced_blocked: Vec<u16>,
    active_patterns: BTreeMap<PatternId, Vec<(usize, PatternStatus)>>,
    occupants: OccupantRegistry,
    observers: ObserverList,
}

impl Board {
    /// Creates a board whose base layer is entirely [`WalkStatus::Unspecified`].
    pub fn new(
        columns: u32,
        rows: u32,
        cell_size: f32,
        origin: WorldPoint,
    ) -> Result<Self, BoardError> {
        let cell_count = validate_layout(columns, rows, cell_size)?;
        Ok(Self {
            columns,
            rows,
            cell_size,
            origin,
            base: vec![WalkStatus::Unspecified; cell_count],
            forced_walkable: vec![0; cell_count],
            forced_blocked: vec![0; cell_count],
            active_patterns: BTreeMap::new(),
            occupants: OccupantRegistry::new(cell_count),
            observers: ObserverList::default(),
        })
    }

    /// Number of columns on the board.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows on the board.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of a cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// World-space position of the board's minimum corner.
    #[must_use]
    pub const fn origin(&self) -> WorldPoint {
        self.origin
    }

    /// Reports whether the cell lies on the board.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Effective walkability of the cell; `false` outside the board.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .is_some_and(|index| self.walkable_at(index))
    }

    /// Effective walkability ignoring the footprint of `occupant` itself.
    #[must_use]
    pub fn is_walkable_for(&self, cell: CellCoord, occupant: ObstacleId) -> bool {
        self.index(cell).is_some_and(|index| {
            !self.occupants.is_blocked_by_other(index, occupant) && self.overlay_walkable(index)
        })
    }

    /// Designer-authored status of the cell.
    #[must_use]
    pub fn base_status(&self, cell: CellCoord) -> Option<WalkStatus> {
        self.index(cell).map(|index| self.base[index])
    }

    /// Reports whether an active pattern forces the cell walkable.
    #[must_use]
    pub fn is_forced_walkable(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .is_some_and(|index| self.forced_walkable[index] > 0)
    }

    /// Reports whether an active pattern forces the cell blocked.
    #[must_use]
    pub fn is_forced_blocked(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .is_some_and(|index| self.forced_blocked[index] > 0)
    }

    /// Reports whether a registered occupant covers the cell.
    #[must_use]
    pub fn is_occupant_blocked(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .is_some_and(|index| self.occupants.is_blocked(index))
    }

    /// Writes the base-layer status of a cell. Returns `false` out of bounds.
    pub fn set_base_status(&mut self, cell: CellCoord, status: WalkStatus) -> bool {
        let Some(index) = self.index(cell) else {
            return false;
        };
        let candidates = [index];
        let before = self.effective(&candidates);
        self.base[index] = status;
        self.notify_flips(ChangeCause::BaseEdited, &candidates, &before, &candidates);
        true
    }

    /// Boolean convenience wrapper around [`Board::set_base_status`].
    pub fn set_base_walkable(&mut self, cell: CellCoord, walkable: bool) -> bool {
        let status = if walkable {
            WalkStatus::Walkable
        } else {
            WalkStatus::Blocked
        };
        self.set_base_status(cell, status)
    }

    /// Writes every cell of `pattern` into the overlay named by its status.
    ///
    /// Returns `false` without changing anything when a pattern with the same
    /// identifier is already active.
    pub fn apply_pattern(&mut self, pattern: &PatternDefinition) -> bool {
        if self.active_patterns.contains_key(&pattern.id) {
            return false;
        }

        let entries: Vec<(usize, PatternStatus)> = pattern
            .resolve()
            .into_iter()
            .filter_map(|(cell, status)| self.index(cell).map(|index| (index, status)))
            .collect();
        let candidates = sorted_indices(entries.iter().map(|(index, _)| *index));
        let before = self.effective(&candidates);

        for &(index, status) in &entries {
            let counter = match status {
                PatternStatus::Walkable => &mut self.forced_walkable[index],
                PatternStatus::Blocked => &mut self.forced_blocked[index],
            };
            *counter = counter.saturating_add(1);
        }
        let _ = self.active_patterns.insert(pattern.id, entries);

        self.notify_flips(
            ChangeCause::PatternApplied(pattern.id),
            &candidates,
            &before,
            &candidates,
        );
        true
    }

    /// Removes exactly the overlay entries added when the pattern was applied.
    ///
    /// Returns `false` when the pattern is not active.
    pub fn revert_pattern(&mut self, pattern: PatternId) -> bool {
        let Some(entries) = self.active_patterns.remove(&pattern) else {
            return false;
        };
        let candidates = sorted_indices(entries.iter().map(|(index, _)| *index));
        let before = self.effective(&candidates);

        for (index, status) in entries {
            let counter = match status {
                PatternStatus::Walkable => &mut self.forced_walkable[index],
                PatternStatus::Blocked => &mut self.forced_blocked[index],
            };
            *counter = counter.saturating_sub(1);
        }

        self.notify_flips(
            ChangeCause::PatternReverted(pattern),
            &candidates,
            &before,
            &candidates,
        );
        true
    }

    /// Reports whether the pattern is currently applied.
    #[must_use]
    pub fn is_pattern_active(&self, pattern: PatternId) -> bool {
        self.active_patterns.contains_key(&pattern)
    }

    /// Identifiers of every active pattern, ascending.
    pub fn active_patterns(&self) -> impl Iterator<Item = PatternId> + '_ {
        self.active_patterns.keys().copied()
    }

    /// Adds the occupant's current footprint to the occupant overlay.
    ///
    /// Registering an occupant twice updates its footprint in place.
    pub fn register_occupant<O>(&mut self, occupant: &O)
    where
        O: BlocksCells + ?Sized,
    {
        let id = occupant.occupant_id();
        let cells = self.footprint_indices(occupant);
        self.update_occupant_cells(id, cells, ChangeCause::OccupantRegistered(id));
    }

    /// Re-reads the occupant's footprint after a move, rotation, or mirror and
    /// applies only the difference. Unregistered occupants are ignored.
    pub fn notify_occupant_moved<O>(&mut self, occupant: &O)
    where
        O: BlocksCells + ?Sized,
    {
        let id = occupant.occupant_id();
        if !self.occupants.is_registered(id) {
            return;
        }
        let cells = self.footprint_indices(occupant);
        self.update_occupant_cells(id, cells, ChangeCause::OccupantMoved(id));
    }

    /// Removes the occupant's footprint. Returns `false` if it was not registered.
    pub fn unregister_occupant(&mut self, occupant: ObstacleId) -> bool {
        let candidates = match self.occupants.footprint(occupant) {
            Some(cells) => cells.to_vec(),
            None => return false,
        };
        let before = self.effective(&candidates);
        let _ = self.occupants.unregister(occupant);
        self.notify_flips(
            ChangeCause::OccupantUnregistered(occupant),
            &candidates,
            &before,
            &candidates,
        );
        true
    }

    /// Cells currently blocked by `occupant`, empty when it is not registered.
    #[must_use]
    pub fn occupant_footprint(&self, occupant: ObstacleId) -> Vec<CellCoord> {
        self.occupants
            .footprint(occupant)
            .map(|cells| cells.iter().filter_map(|index| self.cell_at(*index)).collect())
            .unwrap_or_default()
    }

    /// Every cell blocked by at least one registered occupant, ascending by index.
    #[must_use]
    pub fn occupant_blocked_cells(&self) -> Vec<CellCoord> {
        self.occupants
            .blocked_indices()
            .filter_map(|index| self.cell_at(index))
            .collect()
    }

    /// Identifiers of every registered occupant, ascending.
    #[must_use]
    pub fn registered_occupants(&self) -> Vec<ObstacleId> {
        self.occupants.occupants().collect()
    }

    /// Maps a world-space point to the cell that covers it.
    #[must_use]
    pub fn world_to_cell(&self, point: WorldPoint) -> Option<CellCoord> {
        let column = ((point.x() - self.origin.x()) / self.cell_size).floor();
        let row = ((point.y() - self.origin.y()) / self.cell_size).floor();
        if !column.is_finite() || !row.is_finite() || column < 0.0 || row < 0.0 {
            return None;
        }

        let cell = CellCoord::new(column as u32, row as u32);
        self.contains(cell).then_some(cell)
    }

    /// World-space centre of the cell.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> WorldPoint {
        WorldPoint::new(
            self.origin.x() + (cell.column() as f32 + 0.5) * self.cell_size,
            self.origin.y() + (cell.row() as f32 + 0.5) * self.cell_size,
        )
    }

    /// Registers a callback invoked after every effective walkability change.
    pub fn subscribe<F>(&mut self, observer: F) -> ObserverId
    where
        F: FnMut(&WalkabilityChange) + 'static,
    {
        self.observers.subscribe(Box::new(observer))
    }

    /// Removes a previously registered callback.
    pub fn unsubscribe(&mut self, observer: ObserverId) -> bool {
        self.observers.unsubscribe(observer)
    }

    /// Base layer in row-major order.
    pub(crate) fn base_layer(&self) -> &[WalkStatus] {
        &self.base
    }

    /// Replaces the layout, clearing every overlay.
    ///
    /// When `base` is `None` the previous base layer is kept for the cells
    /// that exist in both layouts and new cells start unspecified. Observers
    /// stay subscribed and receive a single [`ChangeCause::Restored`] change.
    pub(crate) fn rebuild(
        &mut self,
        columns: u32,
        rows: u32,
        cell_size: f32,
        origin: WorldPoint,
        base: Option<Vec<WalkStatus>>,
    ) -> Result<(), BoardError> {
        let cell_count = validate_layout(columns, rows, cell_size)?;
        let base = match base {
            Some(base) if base.len() == cell_count => base,
            _ => self.resized_base(columns, rows, cell_count),
        };

        self.columns = columns;
        self.rows = rows;
        self.cell_size = cell_size;
        self.origin = origin;
        self.base = base;
        self.forced_walkable = vec![0; cell_count];
        self.forced_blocked = vec![0; cell_count];
        self.active_patterns.clear();
        self.occupants = OccupantRegistry::new(cell_count);

        let cells = (0..cell_count)
            .filter_map(|index| self.cell_at(index))
            .collect();
        self.observers.notify(&WalkabilityChange {
            cause: ChangeCause::Restored,
            cells,
        });
        Ok(())
    }

    pub(crate) fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    pub(crate) fn cell_at(&self, index: usize) -> Option<CellCoord> {
        let width = usize::try_from(self.columns).ok()?;
        if index >= self.base.len() || width == 0 {
            return None;
        }
        let column = u32::try_from(index % width).ok()?;
        let row = u32::try_from(index / width).ok()?;
        Some(CellCoord::new(column, row))
    }

    fn walkable_at(&self, index: usize) -> bool {
        !self.occupants.is_blocked(index) && self.overlay_walkable(index)
    }

    fn overlay_walkable(&self, index: usize) -> bool {
        self.forced_walkable[index] > 0
            || (self.base[index].is_walkable() && self.forced_blocked[index] == 0)
    }

    fn effective(&self, indices: &[usize]) -> Vec<bool> {
        indices.iter().map(|index| self.walkable_at(*index)).collect()
    }

    fn footprint_indices<O>(&self, occupant: &O) -> Vec<usize>
    where
        O: BlocksCells + ?Sized,
    {
        occupant
            .blocked_cells(self.columns, self.rows)
            .into_iter()
            .filter_map(|cell| self.index(cell))
            .collect()
    }

    fn update_occupant_cells(&mut self, occupant: ObstacleId, cells: Vec<usize>, cause: ChangeCause) {
        let previous = self.occupants.footprint(occupant).unwrap_or(&[]);
        let candidates = sorted_indices(previous.iter().chain(cells.iter()).copied());
        let before = self.effective(&candidates);
        let touched = self.occupants.update(occupant, cells);
        self.notify_flips(cause, &candidates, &before, &touched);
    }

    /// Notifies observers about every touched index whose walkability no
    /// longer matches its entry in `before`, which is parallel to `candidates`.
    fn notify_flips(
        &mut self,
        cause: ChangeCause,
        candidates: &[usize],
        before: &[bool],
        touched: &[usize],
    ) {
        let mut cells = Vec::new();
        for &index in touched {
            let Ok(position) = candidates.binary_search(&index) else {
                continue;
            };
            if before[position] != self.walkable_at(index) {
                if let Some(cell) = self.cell_at(index) {
                    cells.push(cell);
                }
            }
        }

        if cells.is_empty() {
            return;
        }
        self.observers.notify(&WalkabilityChange { cause, cells });
    }

    fn resized_base(&self, columns: u32, rows: u32, cell_count: usize) -> Vec<WalkStatus> {
        let mut base = vec![WalkStatus::Unspecified; cell_count];
        for row in 0..rows.min(self.rows) {
            for column in 0..columns.min(self.columns) {
                let target = u64::from(row) * u64::from(columns) + u64::from(column);
                if let (Some(previous), Ok(target)) =
                    (self.index(CellCoord::new(column, row)), usize::try_from(target))
                {
                    base[target] = self.base[previous];
                }
            }
        }
        base
    }
}

impl WalkabilityGrid for Board {
    fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    fn is_walkable(&self, cell: CellCoord) -> bool {
        Board::is_walkable(self, cell)
    }
}

fn validate_layout(columns: u32, rows: u32, cell_size: f32) -> Result<usize, BoardError> {
    if columns == 0 || rows == 0 {
        return Err(BoardError::EmptyDimensions { columns, rows });
    }
    if !cell_size.is_finite() || cell_size <= 0.0 {
        return Err(BoardError::InvalidCellSize(cell_size));
    }
    let cell_count = u64::from(columns) * u64::from(rows);
    usize::try_from(cell_count).map_err(|_| BoardError::TooLarge { columns, rows })
}

fn sorted_indices(indices: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut indices: Vec<usize> = indices.collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}
