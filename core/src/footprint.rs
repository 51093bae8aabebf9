//! Integer geometry used to place multi-cell occupants on the board.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::CellCoord;

/// Signed displacement between two cells measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellOffset {
    dx: i32,
    dy: i32,
}

impl CellOffset {
    /// Offset that leaves a cell in place.
    pub const ZERO: Self = Self::new(0, 0);

    /// Creates a new offset from column and row deltas.
    #[must_use]
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// Column delta of the offset.
    #[must_use]
    pub const fn dx(&self) -> i32 {
        self.dx
    }

    /// Row delta of the offset.
    #[must_use]
    pub const fn dy(&self) -> i32 {
        self.dy
    }

    /// Rotates the offset by the provided number of quarter turns.
    #[must_use]
    pub const fn rotated(self, rotation: QuarterTurn) -> Self {
        match rotation {
            QuarterTurn::None => self,
            QuarterTurn::Quarter => Self::new(-self.dy, self.dx),
            QuarterTurn::Half => Self::new(-self.dx, -self.dy),
            QuarterTurn::ThreeQuarters => Self::new(self.dy, -self.dx),
        }
    }

    /// Reflects the offset across the axes selected by `mirror`.
    #[must_use]
    pub const fn mirrored(self, mirror: Mirror) -> Self {
        let dx = if mirror.horizontal { -self.dx } else { self.dx };
        let dy = if mirror.vertical { -self.dy } else { self.dy };
        Self::new(dx, dy)
    }
}

/// Rotation quantised to multiples of 90 degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuarterTurn {
    /// No rotation.
    #[default]
    None,
    /// Rotation by 90 degrees.
    Quarter,
    /// Rotation by 180 degrees.
    Half,
    /// Rotation by 270 degrees.
    ThreeQuarters,
}

impl QuarterTurn {
    /// Normalises an arbitrary step count into the `0..4` range.
    #[must_use]
    pub const fn from_steps(steps: i32) -> Self {
        match steps.rem_euclid(4) {
            0 => Self::None,
            1 => Self::Quarter,
            2 => Self::Half,
            _ => Self::ThreeQuarters,
        }
    }

    /// Quantises an angle in degrees to the nearest quarter turn.
    #[must_use]
    pub fn from_degrees(degrees: f32) -> Self {
        Self::from_steps((degrees / 90.0).round() as i32)
    }

    /// Number of quarter turns represented, always within `0..4`.
    #[must_use]
    pub const fn steps(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Quarter => 1,
            Self::Half => 2,
            Self::ThreeQuarters => 3,
        }
    }

    /// Adds `steps` quarter turns to the rotation.
    #[must_use]
    pub const fn turned(self, steps: i32) -> Self {
        Self::from_steps(self.steps().wrapping_add(steps))
    }
}

/// Per-axis reflection applied to a footprint before rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mirror {
    /// Mirrors left and right by negating the column delta.
    #[serde(default)]
    pub horizontal: bool,
    /// Mirrors up and down by negating the row delta.
    #[serde(default)]
    pub vertical: bool,
}

impl Mirror {
    /// Mirror that leaves offsets untouched.
    pub const NONE: Self = Self {
        horizontal: false,
        vertical: false,
    };
}

/// Placement of an occupant: anchor cell, rotation, and mirroring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OccupantTransform {
    anchor: CellCoord,
    rotation: QuarterTurn,
    mirror: Mirror,
}

impl OccupantTransform {
    /// Creates a transform anchored at `anchor` without rotation or mirroring.
    #[must_use]
    pub const fn at(anchor: CellCoord) -> Self {
        Self {
            anchor,
            rotation: QuarterTurn::None,
            mirror: Mirror::NONE,
        }
    }

    /// Creates a fully specified transform.
    #[must_use]
    pub const fn new(anchor: CellCoord, rotation: QuarterTurn, mirror: Mirror) -> Self {
        Self {
            anchor,
            rotation,
            mirror,
        }
    }

    /// Cell the footprint is anchored to.
    #[must_use]
    pub const fn anchor(&self) -> CellCoord {
        self.anchor
    }

    /// Quarter-turn rotation applied to the footprint.
    #[must_use]
    pub const fn rotation(&self) -> QuarterTurn {
        self.rotation
    }

    /// Mirroring applied to the footprint before rotation.
    #[must_use]
    pub const fn mirror(&self) -> Mirror {
        self.mirror
    }

    /// Returns a copy of the transform moved to a new anchor.
    #[must_use]
    pub const fn with_anchor(self, anchor: CellCoord) -> Self {
        Self { anchor, ..self }
    }

    /// Returns a copy of the transform with a new rotation.
    #[must_use]
    pub const fn with_rotation(self, rotation: QuarterTurn) -> Self {
        Self { rotation, ..self }
    }

    /// Returns a copy of the transform with new mirroring.
    #[must_use]
    pub const fn with_mirror(self, mirror: Mirror) -> Self {
        Self { mirror, ..self }
    }
}

/// Local shape of an occupant expressed as offsets from its anchor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Footprint {
    offsets: Vec<CellOffset>,
}

impl Footprint {
    /// Creates a footprint from the provided local offsets.
    #[must_use]
    pub fn new(offsets: Vec<CellOffset>) -> Self {
        Self { offsets }
    }

    /// Footprint covering only the anchor cell.
    #[must_use]
    pub fn single() -> Self {
        Self::new(vec![CellOffset::ZERO])
    }

    /// Footprint covering a `width × height` block growing from the anchor.
    #[must_use]
    pub fn rectangle(width: u32, height: u32) -> Self {
        let mut offsets = Vec::new();
        for dy in (0..height).map_while(|dy| i32::try_from(dy).ok()) {
            for dx in (0..width).map_while(|dx| i32::try_from(dx).ok()) {
                offsets.push(CellOffset::new(dx, dy));
            }
        }
        Self::new(offsets)
    }

    /// Local offsets composing the footprint.
    #[must_use]
    pub fn offsets(&self) -> &[CellOffset] {
        &self.offsets
    }

    /// Computes the absolute cells covered under `transform`.
    ///
    /// Offsets are mirrored, then rotated, then added to the anchor. Cells
    /// falling outside a `columns × rows` board are dropped and duplicates are
    /// collapsed, yielding cells in ascending `(column, row)` order. When
    /// nothing remains the anchor alone is returned, so every occupant covers
    /// at least one cell.
    #[must_use]
    pub fn cells(&self, transform: OccupantTransform, columns: u32, rows: u32) -> Vec<CellCoord> {
        let mut cells = BTreeSet::new();
        for offset in &self.offsets {
            let placed = offset
                .mirrored(transform.mirror())
                .rotated(transform.rotation());
            if let Some(cell) = transform.anchor().offset_by(placed) {
                if cell.column() < columns && cell.row() < rows {
                    let _ = cells.insert(cell);
                }
            }
        }

        if cells.is_empty() {
            return vec![transform.anchor()];
        }
        cells.into_iter().collect()
    }
}
