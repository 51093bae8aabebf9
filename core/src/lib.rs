#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Switchback puzzle simulation.
//!
//! This crate defines the message surface that connects collaborators, the
//! authoritative world, and pure systems. Collaborators submit [`Command`]
//! values describing requested actions, the world validates and executes them
//! through its `apply` entry point, and then reports the outcome as [`Event`]
//! values. Systems such as the pathfinder only ever see the board through the
//! read-only [`WalkabilityGrid`] trait.

mod footprint;

use serde::{Deserialize, Serialize};

pub use footprint::{CellOffset, Footprint, Mirror, OccupantTransform, QuarterTurn};

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Displaces the cell by `offset`, returning `None` below zero or past `u32::MAX`.
    #[must_use]
    pub fn offset_by(self, offset: CellOffset) -> Option<CellCoord> {
        let column = i64::from(self.column) + i64::from(offset.dx());
        let row = i64::from(self.row) + i64::from(offset.dy());
        Some(CellCoord::new(
            u32::try_from(column).ok()?,
            u32::try_from(row).ok()?,
        ))
    }
}

/// Position in continuous world space, used for presentation mapping only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    x: f32,
    y: f32,
}

impl WorldPoint {
    /// Creates a new world-space point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Horizontal world coordinate.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical world coordinate.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }
}

/// Designer-authored walkability of a single cell in the base layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalkStatus {
    /// Never painted; treated as walkable.
    #[default]
    Unspecified,
    /// Explicitly painted walkable.
    Walkable,
    /// Explicitly painted blocked.
    Blocked,
}

impl WalkStatus {
    /// Reports whether the status permits movement.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::Blocked)
    }

    /// Converts a value from the boolean walkability format.
    ///
    /// Boolean grids could not express an unpainted cell, so `true` maps to
    /// [`WalkStatus::Walkable`] rather than [`WalkStatus::Unspecified`].
    #[must_use]
    pub const fn from_legacy(walkable: bool) -> Self {
        if walkable {
            Self::Walkable
        } else {
            Self::Blocked
        }
    }
}

/// Status a pattern forces onto each of its cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternStatus {
    /// Cell is forced walkable, overriding the base layer and forced blocks.
    Walkable,
    /// Cell is forced blocked, overriding the base layer.
    Blocked,
}

/// Single entry of a pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternCell {
    /// Offset of the cell from the pattern anchor, or its absolute position
    /// when the pattern has no anchor.
    pub offset: CellOffset,
    /// Status forced onto the cell while the pattern is active.
    pub status: PatternStatus,
}

/// Named set of cells whose walkability is overridden as a unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternDefinition {
    /// Identifier used to track whether the pattern is active.
    pub id: PatternId,
    /// Cell the offsets are relative to; `None` means offsets are absolute.
    #[serde(default)]
    pub anchor: Option<CellCoord>,
    /// Cells and the statuses forced onto them.
    #[serde(default)]
    pub cells: Vec<PatternCell>,
}

impl PatternDefinition {
    /// Resolves the entries into absolute cells, dropping negative positions.
    #[must_use]
    pub fn resolve(&self) -> Vec<(CellCoord, PatternStatus)> {
        let base = self.anchor.unwrap_or(CellCoord::new(0, 0));
        self.cells
            .iter()
            .filter_map(|entry| base.offset_by(entry.offset).map(|cell| (cell, entry.status)))
            .collect()
    }
}

/// Declarative description of a floor switch and the patterns it toggles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchDefinition {
    /// Identifier assigned to the switch.
    pub id: SwitchId,
    /// Cell the agent must rest on to toggle the switch.
    pub trigger: CellCoord,
    /// Patterns applied while the switch is active.
    #[serde(default)]
    pub patterns: Vec<PatternDefinition>,
    /// Whether the switch starts active with its patterns applied.
    #[serde(default)]
    pub initially_active: bool,
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(u32);

        impl $name {
            /// Creates a new identifier with the provided numeric value.
            #[must_use]
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Retrieves the numeric representation of the identifier.
            #[must_use]
            pub const fn get(&self) -> u32 {
                self.0
            }
        }
    };
}

entity_id!(
    /// Unique identifier assigned to a pattern.
    PatternId
);
entity_id!(
    /// Unique identifier assigned to a switch.
    SwitchId
);
entity_id!(
    /// Unique identifier assigned to a hazard.
    HazardId
);
entity_id!(
    /// Unique identifier assigned to a buff.
    BuffId
);
entity_id!(
    /// Unique identifier assigned to a footprint-bearing obstacle.
    ObstacleId
);
entity_id!(
    /// Unique identifier assigned to a scripted mover.
    MoverId
);

/// Remaining hit points of the agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Health(u32);

impl Health {
    /// Creates a new health value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric health value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Reports whether no health remains.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.0 == 0
    }

    /// Subtracts damage, stopping at zero.
    #[must_use]
    pub const fn saturating_sub(self, damage: u32) -> Self {
        Self(self.0.saturating_sub(damage))
    }

    /// Adds healing without exceeding `max`.
    #[must_use]
    pub fn healed(self, amount: u32, max: Health) -> Self {
        Self(self.0.saturating_add(amount).min(max.0))
    }
}

/// Phase of the turn cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Awaiting or resolving a player action.
    Player,
    /// Resolving switches, movers, hazards, buffs, and win checks.
    Ai,
}

/// Terminal result of a level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameOutcome {
    /// The agent reached the flag.
    Won,
    /// The agent was defeated.
    Lost(LoseReason),
}

/// Cause of a lost game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoseReason {
    /// Hazard damage emptied the agent's health.
    Defeated,
    /// The agent ran out of energy before reaching the flag.
    EnergyDepleted,
}

/// Reasons a move request may be rejected without changing any state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveRejection {
    /// The level already ended.
    GameOver,
    /// The target lies outside the board.
    OutOfBounds,
    /// The target is not currently walkable.
    NotWalkable,
    /// The target equals the agent's current cell.
    AlreadyThere,
    /// No walkable route connects the agent to the target.
    NoPath,
    /// The route is longer than the movement budget for this turn.
    InsufficientBudget {
        /// Steps the shortest route requires.
        required: u32,
        /// Steps the agent may take this turn.
        available: u32,
    },
}

/// Ordered sequence of 4-adjacent cells from a start to a goal, both inclusive.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Path {
    cells: Vec<CellCoord>,
}

impl Path {
    /// Builds a path, rejecting empty sequences and non-adjacent neighbours.
    #[must_use]
    pub fn new(cells: Vec<CellCoord>) -> Option<Self> {
        if cells.is_empty() {
            return None;
        }
        if cells
            .windows(2)
            .any(|pair| pair[0].manhattan_distance(pair[1]) != 1)
        {
            return None;
        }
        Some(Self { cells })
    }

    /// Zero-step path that stays on `cell`.
    #[must_use]
    pub fn stationary(cell: CellCoord) -> Self {
        Self { cells: vec![cell] }
    }

    /// Cells along the path, start first.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// First cell of the path.
    #[must_use]
    pub fn start(&self) -> CellCoord {
        self.cells[0]
    }

    /// Last cell of the path.
    #[must_use]
    pub fn goal(&self) -> CellCoord {
        self.cells[self.cells.len() - 1]
    }

    /// Number of cell-to-cell steps, one less than the cell count.
    #[must_use]
    pub fn steps(&self) -> u32 {
        u32::try_from(self.cells.len() - 1).unwrap_or(u32::MAX)
    }

    /// Reports whether the path involves no movement.
    #[must_use]
    pub fn is_stationary(&self) -> bool {
        self.cells.len() == 1
    }
}

/// Read-only walkability query over a rectangular grid.
pub trait WalkabilityGrid {
    /// Number of columns and rows in the grid.
    fn dimensions(&self) -> (u32, u32);

    /// Reports whether the cell may currently be entered. Must be `false`
    /// outside the grid.
    fn is_walkable(&self, cell: CellCoord) -> bool;
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Asks the agent to walk to `target` during the player phase.
    RequestMove {
        /// Cell the agent should end its move on.
        target: CellCoord,
    },
    /// Ends the player phase without moving.
    RequestSkipTurn,
    /// Design-time edit of a single base-layer cell.
    SetBaseWalkable {
        /// Cell being painted.
        cell: CellCoord,
        /// Status written into the base layer.
        status: WalkStatus,
    },
    /// Registers an obstacle's footprint with the board.
    ActivateObstacle {
        /// Obstacle being activated.
        obstacle: ObstacleId,
    },
    /// Removes an obstacle's footprint from the board.
    DeactivateObstacle {
        /// Obstacle being deactivated.
        obstacle: ObstacleId,
    },
    /// Moves an obstacle to a new anchor cell.
    MoveObstacle {
        /// Obstacle being moved.
        obstacle: ObstacleId,
        /// New anchor of the obstacle's footprint.
        anchor: CellCoord,
    },
    /// Rotates an obstacle to an absolute quarter-turn orientation.
    RotateObstacle {
        /// Obstacle being rotated.
        obstacle: ObstacleId,
        /// New orientation of the obstacle.
        rotation: QuarterTurn,
    },
    /// Changes the mirroring applied to an obstacle's footprint.
    MirrorObstacle {
        /// Obstacle being mirrored.
        obstacle: ObstacleId,
        /// New mirroring of the obstacle.
        mirror: Mirror,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Announces that the turn cycle entered a new phase.
    PhaseChanged {
        /// Phase that became active.
        phase: Phase,
    },
    /// Reports that a move request was rejected and nothing changed.
    MoveRejected {
        /// Cell provided in the request.
        target: CellCoord,
        /// Specific reason the request failed.
        reason: MoveRejection,
    },
    /// Confirms that the agent advanced a single step.
    AgentStepped {
        /// Cell the agent occupied before the step.
        from: CellCoord,
        /// Cell the agent occupies after the step.
        to: CellCoord,
    },
    /// Confirms that the player ended the phase without moving.
    TurnSkipped,
    /// Reports that a queued extra turn was spent instead of yielding to the AI.
    ExtraTurnConsumed {
        /// Extra turns still queued after this one.
        remaining: u32,
    },
    /// Confirms that a switch changed state.
    SwitchToggled {
        /// Switch that toggled.
        switch: SwitchId,
        /// Whether the switch is now active.
        active: bool,
    },
    /// Confirms that a scripted mover advanced a single step.
    MoverAdvanced {
        /// Mover that advanced.
        mover: MoverId,
        /// Cell the mover occupied before the step.
        from: CellCoord,
        /// Cell the mover occupies after the step.
        to: CellCoord,
    },
    /// Reports that an obstacle footprint now covers a different set of cells.
    ObstacleFootprintChanged {
        /// Obstacle whose footprint changed.
        obstacle: ObstacleId,
        /// Cells blocked by the obstacle, empty when deactivated.
        cells: Vec<CellCoord>,
    },
    /// Reports that a hazard reached the agent.
    HazardTriggered {
        /// Hazard in range of the agent.
        hazard: HazardId,
        /// Damage dealt by the hazard.
        damage: u32,
    },
    /// Confirms that the agent picked up a buff.
    BuffConsumed {
        /// Buff that was consumed.
        buff: BuffId,
        /// Extra turns granted.
        extra_turns: u32,
        /// Health restored.
        healing: u32,
        /// Energy restored.
        energy: u32,
    },
    /// Reports the agent's health after it changed.
    HealthChanged {
        /// Current health.
        health: Health,
    },
    /// Reports the agent's energy after it changed.
    EnergyChanged {
        /// Current energy.
        energy: u32,
    },
    /// Announces that the agent reached the flag.
    GameWon {
        /// Cell of the flag.
        cell: CellCoord,
    },
    /// Announces that the agent lost.
    GameLost {
        /// Cause of the loss.
        reason: LoseReason,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn offset_below_zero_is_rejected() {
        let cell = CellCoord::new(1, 0);
        assert_eq!(
            cell.offset_by(CellOffset::new(-1, 2)),
            Some(CellCoord::new(0, 2))
        );
        assert_eq!(cell.offset_by(CellOffset::new(0, -1)), None);
    }

    #[test]
    fn unspecified_cells_are_walkable() {
        assert!(WalkStatus::Unspecified.is_walkable());
        assert!(WalkStatus::Walkable.is_walkable());
        assert!(!WalkStatus::Blocked.is_walkable());
        assert_eq!(WalkStatus::from_legacy(true), WalkStatus::Walkable);
        assert_eq!(WalkStatus::from_legacy(false), WalkStatus::Blocked);
    }

    #[test]
    fn anchored_pattern_resolves_relative_offsets() {
        let pattern = PatternDefinition {
            id: PatternId::new(1),
            anchor: Some(CellCoord::new(2, 2)),
            cells: vec![
                PatternCell {
                    offset: CellOffset::new(1, 0),
                    status: PatternStatus::Walkable,
                },
                PatternCell {
                    offset: CellOffset::new(-3, 0),
                    status: PatternStatus::Blocked,
                },
            ],
        };

        assert_eq!(
            pattern.resolve(),
            vec![(CellCoord::new(3, 2), PatternStatus::Walkable)]
        );
    }

    #[test]
    fn unanchored_pattern_uses_absolute_cells() {
        let pattern = PatternDefinition {
            id: PatternId::new(2),
            anchor: None,
            cells: vec![PatternCell {
                offset: CellOffset::new(4, 1),
                status: PatternStatus::Blocked,
            }],
        };

        assert_eq!(
            pattern.resolve(),
            vec![(CellCoord::new(4, 1), PatternStatus::Blocked)]
        );
    }

    #[test]
    fn path_requires_adjacent_cells() {
        assert!(Path::new(Vec::new()).is_none());
        assert!(Path::new(vec![CellCoord::new(0, 0), CellCoord::new(1, 1)]).is_none());

        let path = Path::new(vec![
            CellCoord::new(0, 0),
            CellCoord::new(1, 0),
            CellCoord::new(1, 1),
        ])
        .expect("adjacent cells form a path");
        assert_eq!(path.steps(), 2);
        assert_eq!(path.start(), CellCoord::new(0, 0));
        assert_eq!(path.goal(), CellCoord::new(1, 1));
        assert!(!path.is_stationary());
        assert!(Path::stationary(CellCoord::new(3, 3)).is_stationary());
    }

    #[test]
    fn healing_is_capped_at_maximum() {
        let max = Health::new(5);
        assert_eq!(Health::new(3).healed(4, max), max);
        assert!(Health::new(2).saturating_sub(7).is_depleted());
    }

    #[test]
    fn switch_definition_reads_with_defaults() {
        let json = r#"{"id":3,"trigger":{"column":1,"row":2}}"#;
        let switch: SwitchDefinition = serde_json::from_str(json).expect("deserialize");
        assert_eq!(switch.id, SwitchId::new(3));
        assert_eq!(switch.trigger, CellCoord::new(1, 2));
        assert!(switch.patterns.is_empty());
        assert!(!switch.initially_active);
    }
}
