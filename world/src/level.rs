//! Declarative level description and world construction.
//!
//! Levels are authored as TOML and deserialised into [`LevelConfig`]. Every
//! table except `board`, `agent`, and `flag` is optional.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use switchback_core::{
    BuffId, CellCoord, Footprint, HazardId, Health, Mirror, MoverId, ObstacleId,
    OccupantTransform, Path, QuarterTurn, SwitchDefinition, WalkStatus, WorldPoint,
};
use switchback_system_pathfinding::Pathfinder;
use thiserror::Error;
use tracing::info;

use crate::{
    board::{Board, BoardError},
    entities::{Agent, Buff, Hazard, Mover, MoverPayload, Obstacle, Switch},
    turn::TurnState,
    World,
};

/// Errors raised while reading or validating a level.
#[derive(Debug, Error)]
pub enum LevelError {
    /// The TOML document could not be parsed.
    #[error("failed to parse level toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// The board layout was invalid.
    #[error(transparent)]
    Board(#[from] BoardError),
    /// The explicit walkability grid does not cover the board exactly.
    #[error("walkability grid has {actual} cells but the board has {expected}")]
    WalkabilityLength {
        /// Cells on the board.
        expected: usize,
        /// Cells listed in the level.
        actual: usize,
    },
    /// An entity or painted cell lies outside the board.
    #[error("{kind} {id} at {cell:?} lies outside the board")]
    OutOfBounds {
        /// Kind of entity that was misplaced.
        kind: &'static str,
        /// Identifier of the entity, zero for anonymous cells.
        id: u32,
        /// Offending cell.
        cell: CellCoord,
    },
    /// The agent would start on a cell it cannot stand on.
    #[error("agent start {0:?} is not walkable")]
    AgentStartBlocked(CellCoord),
    /// Two entities of the same kind share an identifier.
    #[error("duplicate {kind} id {id}")]
    DuplicateId {
        /// Kind of entity with the clash.
        kind: &'static str,
        /// Identifier used more than once.
        id: u32,
    },
    /// A mover's route is empty or has non-adjacent neighbours.
    #[error("mover {0:?} has an empty or disjoint route")]
    InvalidRoute(MoverId),
    /// A mover carries an entity that does not exist.
    #[error("mover {mover:?} carries unknown {payload:?}")]
    UnknownPayload {
        /// Mover with the dangling payload.
        mover: MoverId,
        /// Payload that could not be resolved.
        payload: MoverPayload,
    },
}

/// Complete description of a level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Board layout and base walkability.
    pub board: BoardConfig,
    /// Agent start and movement rules.
    pub agent: AgentConfig,
    /// Cell the agent must rest on to win.
    pub flag: CellCoord,
    /// Damaging cells.
    #[serde(default)]
    pub hazards: Vec<HazardConfig>,
    /// Single-use pickups.
    #[serde(default)]
    pub buffs: Vec<BuffConfig>,
    /// Floor switches and the patterns they toggle.
    #[serde(default)]
    pub switches: Vec<SwitchDefinition>,
    /// Footprint-bearing obstacles.
    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,
    /// Scripted movers.
    #[serde(default)]
    pub movers: Vec<MoverConfig>,
}

impl LevelConfig {
    /// Creates a level with no entities besides the agent and the flag.
    #[must_use]
    pub fn new(board: BoardConfig, agent: AgentConfig, flag: CellCoord) -> Self {
        Self {
            board,
            agent,
            flag,
            hazards: Vec::new(),
            buffs: Vec::new(),
            switches: Vec::new(),
            obstacles: Vec::new(),
            movers: Vec::new(),
        }
    }

    /// Parses a level from its TOML representation.
    pub fn from_toml_str(contents: &str) -> Result<Self, LevelError> {
        Ok(toml::from_str(contents)?)
    }
}

/// Board layout of a level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Number of columns.
    pub columns: u32,
    /// Number of rows.
    pub rows: u32,
    /// Side length of a cell in world units.
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
    /// World-space position of the board's minimum corner.
    #[serde(default)]
    pub origin: WorldPoint,
    /// Full row-major base layer; empty leaves every cell unspecified.
    #[serde(default)]
    pub walkability: Vec<WalkStatus>,
    /// Cells painted blocked on top of `walkability`.
    #[serde(default)]
    pub blocked: Vec<CellCoord>,
}

impl BoardConfig {
    /// Creates an open board with unit cells at the origin.
    #[must_use]
    pub fn new(columns: u32, rows: u32) -> Self {
        Self {
            columns,
            rows,
            cell_size: default_cell_size(),
            origin: WorldPoint::default(),
            walkability: Vec::new(),
            blocked: Vec::new(),
        }
    }
}

/// Agent rules of a level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Starting cell.
    pub start: CellCoord,
    /// Maximum steps per move.
    pub cells_per_turn: u32,
    /// Starting energy; omit to disable the energy variant.
    #[serde(default)]
    pub energy: Option<u32>,
    /// Starting and maximum health.
    #[serde(default = "default_health")]
    pub health: u32,
}

impl AgentConfig {
    /// Creates an agent config without energy and with a single hit point.
    #[must_use]
    pub fn new(start: CellCoord, cells_per_turn: u32) -> Self {
        Self {
            start,
            cells_per_turn,
            energy: None,
            health: default_health(),
        }
    }
}

/// Hazard entry of a level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardConfig {
    /// Identifier of the hazard.
    pub id: HazardId,
    /// Cell the hazard sits on.
    pub cell: CellCoord,
    /// Manhattan reach of the hazard.
    #[serde(default)]
    pub range: u32,
    /// Damage dealt per triggering turn.
    #[serde(default = "default_damage")]
    pub damage: u32,
}

impl HazardConfig {
    /// Creates a hazard that deals one damage.
    #[must_use]
    pub fn new(id: HazardId, cell: CellCoord, range: u32) -> Self {
        Self {
            id,
            cell,
            range,
            damage: default_damage(),
        }
    }
}

/// Buff entry of a level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuffConfig {
    /// Identifier of the buff.
    pub id: BuffId,
    /// Cell the buff sits on.
    pub cell: CellCoord,
    /// Extra player turns granted.
    #[serde(default)]
    pub extra_turns: u32,
    /// Health restored.
    #[serde(default)]
    pub healing: u32,
    /// Energy restored.
    #[serde(default)]
    pub energy: u32,
    /// Collect only when the agent ends its turn on the cell.
    #[serde(default)]
    pub turn_end_only: bool,
}

impl BuffConfig {
    /// Creates a buff with no effect, to be filled in with struct update syntax.
    #[must_use]
    pub fn new(id: BuffId, cell: CellCoord) -> Self {
        Self {
            id,
            cell,
            extra_turns: 0,
            healing: 0,
            energy: 0,
            turn_end_only: false,
        }
    }
}

/// Obstacle entry of a level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstacleConfig {
    /// Identifier of the obstacle.
    pub id: ObstacleId,
    /// Anchor cell of the footprint.
    pub anchor: CellCoord,
    /// Initial orientation.
    #[serde(default)]
    pub rotation: QuarterTurn,
    /// Initial mirroring.
    #[serde(default)]
    pub mirror: Mirror,
    /// Untransformed footprint; defaults to the anchor cell alone.
    #[serde(default = "Footprint::single")]
    pub footprint: Footprint,
    /// Whether the obstacle blocks the board from the start.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl ObstacleConfig {
    /// Creates an active single-cell obstacle.
    #[must_use]
    pub fn new(id: ObstacleId, anchor: CellCoord) -> Self {
        Self {
            id,
            anchor,
            rotation: QuarterTurn::default(),
            mirror: Mirror::NONE,
            footprint: Footprint::single(),
            active: default_active(),
        }
    }
}

/// Mover entry of a level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoverConfig {
    /// Identifier of the mover.
    pub id: MoverId,
    /// Cells travelled, 4-adjacent, starting on the first.
    pub route: Vec<CellCoord>,
    /// Maximum steps per AI phase.
    #[serde(default = "default_steps_per_turn")]
    pub steps_per_turn: u32,
    /// Entity moved along with the mover.
    #[serde(default)]
    pub payload: MoverPayload,
}

impl MoverConfig {
    /// Creates an empty-handed mover taking one step per AI phase.
    #[must_use]
    pub fn new(id: MoverId, route: Vec<CellCoord>) -> Self {
        Self {
            id,
            route,
            steps_per_turn: default_steps_per_turn(),
            payload: MoverPayload::None,
        }
    }
}

fn default_cell_size() -> f32 {
    1.0
}

fn default_health() -> u32 {
    1
}

fn default_damage() -> u32 {
    1
}

fn default_active() -> bool {
    true
}

fn default_steps_per_turn() -> u32 {
    1
}

impl World {
    /// Builds a world from a validated level description.
    ///
    /// Obstacles are registered and initially active switches applied before
    /// the agent start is checked, so the start must be walkable on the
    /// effective board.
    pub fn from_level(config: &LevelConfig) -> Result<Self, LevelError> {
        let layout = &config.board;
        let mut board = Board::new(layout.columns, layout.rows, layout.cell_size, layout.origin)?;
        paint_base(&mut board, layout)?;

        let mut obstacles = Vec::with_capacity(config.obstacles.len());
        let mut seen = BTreeSet::new();
        for entry in &config.obstacles {
            unique(&mut seen, "obstacle", entry.id.get())?;
            within(&board, "obstacle", entry.id.get(), entry.anchor)?;
            let mut obstacle = Obstacle::new(
                entry.id,
                entry.footprint.clone(),
                OccupantTransform::new(entry.anchor, entry.rotation, entry.mirror),
            );
            obstacle.set_active(entry.active);
            obstacles.push(obstacle);
        }

        let mut hazards = Vec::with_capacity(config.hazards.len());
        let mut seen = BTreeSet::new();
        for entry in &config.hazards {
            unique(&mut seen, "hazard", entry.id.get())?;
            within(&board, "hazard", entry.id.get(), entry.cell)?;
            hazards.push(Hazard::new(entry.id, entry.cell, entry.range, entry.damage));
        }

        let mut buffs = Vec::with_capacity(config.buffs.len());
        let mut seen = BTreeSet::new();
        for entry in &config.buffs {
            unique(&mut seen, "buff", entry.id.get())?;
            within(&board, "buff", entry.id.get(), entry.cell)?;
            buffs.push(Buff::new(
                entry.id,
                entry.cell,
                entry.extra_turns,
                entry.healing,
                entry.energy,
                entry.turn_end_only,
            ));
        }

        let mut switches = Vec::with_capacity(config.switches.len());
        let mut seen = BTreeSet::new();
        let mut patterns = BTreeSet::new();
        for definition in &config.switches {
            unique(&mut seen, "switch", definition.id.get())?;
            within(&board, "switch", definition.id.get(), definition.trigger)?;
            for pattern in &definition.patterns {
                unique(&mut patterns, "pattern", pattern.id.get())?;
            }
            switches.push(Switch::from_definition(definition.clone()));
        }

        let mut movers = Vec::with_capacity(config.movers.len());
        let mut seen = BTreeSet::new();
        for entry in &config.movers {
            unique(&mut seen, "mover", entry.id.get())?;
            movers.push(build_mover(&board, entry, &mut hazards, &mut obstacles)?);
        }

        for obstacle in obstacles.iter().filter(|obstacle| obstacle.is_active()) {
            board.register_occupant(obstacle);
        }
        for switch in switches.iter().filter(|switch| switch.is_active()) {
            for pattern in switch.patterns() {
                let _ = board.apply_pattern(pattern);
            }
        }

        let start = config.agent.start;
        within(&board, "agent", 0, start)?;
        if !board.is_walkable(start) {
            return Err(LevelError::AgentStartBlocked(start));
        }
        within(&board, "flag", 0, config.flag)?;

        info!(
            columns = board.columns(),
            rows = board.rows(),
            hazards = hazards.len(),
            buffs = buffs.len(),
            switches = switches.len(),
            obstacles = obstacles.len(),
            movers = movers.len(),
            "level_loaded"
        );

        Ok(Self {
            board,
            agent: Agent::new(
                start,
                config.agent.cells_per_turn,
                config.agent.energy,
                Health::new(config.agent.health),
            ),
            flag: config.flag,
            turn: TurnState::new(),
            hazards,
            buffs,
            switches,
            obstacles,
            movers,
            pathfinder: Pathfinder::new(),
        })
    }
}

fn paint_base(board: &mut Board, layout: &BoardConfig) -> Result<(), LevelError> {
    if !layout.walkability.is_empty() {
        let expected = board.base_layer().len();
        if layout.walkability.len() != expected {
            return Err(LevelError::WalkabilityLength {
                expected,
                actual: layout.walkability.len(),
            });
        }
        for (index, status) in layout.walkability.iter().enumerate() {
            if let Some(cell) = board.cell_at(index) {
                let _ = board.set_base_status(cell, *status);
            }
        }
    }

    for &cell in &layout.blocked {
        if !board.set_base_walkable(cell, false) {
            return Err(LevelError::OutOfBounds {
                kind: "blocked cell",
                id: 0,
                cell,
            });
        }
    }
    Ok(())
}

/// Validates the route and payload, then moves the payload onto the route's
/// first cell.
fn build_mover(
    board: &Board,
    entry: &MoverConfig,
    hazards: &mut [Hazard],
    obstacles: &mut [Obstacle],
) -> Result<Mover, LevelError> {
    let Some(path) = Path::new(entry.route.clone()) else {
        return Err(LevelError::InvalidRoute(entry.id));
    };
    for &cell in path.cells() {
        within(board, "mover", entry.id.get(), cell)?;
    }

    let start = path.start();
    let unknown = || LevelError::UnknownPayload {
        mover: entry.id,
        payload: entry.payload,
    };
    match entry.payload {
        MoverPayload::None => {}
        MoverPayload::Hazard(id) => hazards
            .iter_mut()
            .find(|hazard| hazard.id() == id)
            .ok_or_else(unknown)?
            .set_cell(start),
        MoverPayload::Obstacle(id) => obstacles
            .iter_mut()
            .find(|obstacle| obstacle.id() == id)
            .ok_or_else(unknown)?
            .set_anchor(start),
    }

    Ok(Mover::new(
        entry.id,
        entry.route.clone(),
        entry.steps_per_turn,
        entry.payload,
    ))
}

fn unique(seen: &mut BTreeSet<u32>, kind: &'static str, id: u32) -> Result<(), LevelError> {
    if seen.insert(id) {
        Ok(())
    } else {
        Err(LevelError::DuplicateId { kind, id })
    }
}

fn within(board: &Board, kind: &'static str, id: u32, cell: CellCoord) -> Result<(), LevelError> {
    if board.contains(cell) {
        Ok(())
    } else {
        Err(LevelError::OutOfBounds { kind, id, cell })
    }
}
