//! Turn-resolved participants of a level.
//!
//! Entities only hold their own state. The world drives them from its turn
//! resolution and reflects footprint changes into the board.

use serde::{Deserialize, Serialize};
use switchback_core::{
    BuffId, CellCoord, Footprint, HazardId, Health, Mirror, MoverId, ObstacleId,
    OccupantTransform, PatternDefinition, QuarterTurn, SwitchDefinition, SwitchId,
};

/// Anything that rests on a single reference cell.
pub trait HasCell {
    /// Reference cell of the entity.
    fn cell(&self) -> CellCoord;
}

/// Entities whose footprint blocks board cells while registered.
pub trait BlocksCells: HasCell {
    /// Identifier the board tracks the footprint under.
    fn occupant_id(&self) -> ObstacleId;

    /// Cells covered by the entity, clipped to a board of the given size.
    fn blocked_cells(&self, columns: u32, rows: u32) -> Vec<CellCoord>;
}

/// Player-controlled agent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Agent {
    cell: CellCoord,
    cells_per_turn: u32,
    energy: Option<u32>,
    health: Health,
    max_health: Health,
}

impl Agent {
    /// Creates an agent at full health. `energy` is `None` when the level
    /// does not use the energy variant.
    #[must_use]
    pub fn new(cell: CellCoord, cells_per_turn: u32, energy: Option<u32>, health: Health) -> Self {
        Self {
            cell,
            cells_per_turn,
            energy,
            health,
            max_health: health,
        }
    }

    /// Cell the agent currently occupies.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Maximum number of steps per move.
    #[must_use]
    pub const fn cells_per_turn(&self) -> u32 {
        self.cells_per_turn
    }

    /// Remaining energy, if the level tracks it.
    #[must_use]
    pub const fn energy(&self) -> Option<u32> {
        self.energy
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> Health {
        self.health
    }

    /// Health the agent started with; healing never exceeds it.
    #[must_use]
    pub const fn max_health(&self) -> Health {
        self.max_health
    }

    /// Steps the agent may take on its next move.
    #[must_use]
    pub fn budget(&self) -> u32 {
        self.energy
            .map_or(self.cells_per_turn, |energy| energy.min(self.cells_per_turn))
    }

    pub(crate) fn step_to(&mut self, cell: CellCoord) {
        self.cell = cell;
    }

    /// Spends energy for one step, returning the remaining energy when tracked.
    pub(crate) fn spend_energy(&mut self) -> Option<u32> {
        let energy = self.energy.as_mut()?;
        *energy = energy.saturating_sub(1);
        Some(*energy)
    }

    pub(crate) fn restore_energy(&mut self, amount: u32) -> Option<u32> {
        let energy = self.energy.as_mut()?;
        *energy = energy.saturating_add(amount);
        Some(*energy)
    }

    pub(crate) fn take_damage(&mut self, damage: u32) -> Health {
        self.health = self.health.saturating_sub(damage);
        self.health
    }

    /// Returns the new health when it actually changed.
    pub(crate) fn heal(&mut self, amount: u32) -> Option<Health> {
        let healed = self.health.healed(amount, self.max_health);
        (healed != self.health).then(|| {
            self.health = healed;
            healed
        })
    }
}

/// Cell that damages the agent when it ends a turn within range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hazard {
    id: HazardId,
    cell: CellCoord,
    range: u32,
    damage: u32,
}

impl Hazard {
    /// Creates a hazard reaching every cell within `range` Manhattan steps.
    #[must_use]
    pub const fn new(id: HazardId, cell: CellCoord, range: u32, damage: u32) -> Self {
        Self {
            id,
            cell,
            range,
            damage,
        }
    }

    /// Identifier of the hazard.
    #[must_use]
    pub const fn id(&self) -> HazardId {
        self.id
    }

    /// Manhattan reach of the hazard; zero covers only its own cell.
    #[must_use]
    pub const fn range(&self) -> u32 {
        self.range
    }

    /// Damage dealt per triggering turn.
    #[must_use]
    pub const fn damage(&self) -> u32 {
        self.damage
    }

    /// Reports whether the hazard reaches `cell`.
    #[must_use]
    pub fn reaches(&self, cell: CellCoord) -> bool {
        self.cell.manhattan_distance(cell) <= self.range
    }

    pub(crate) fn set_cell(&mut self, cell: CellCoord) {
        self.cell = cell;
    }
}

impl HasCell for Hazard {
    fn cell(&self) -> CellCoord {
        self.cell
    }
}

/// Single-use pickup granting extra turns, healing, or energy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Buff {
    id: BuffId,
    cell: CellCoord,
    extra_turns: u32,
    healing: u32,
    energy: u32,
    turn_end_only: bool,
    consumed: bool,
}

impl Buff {
    /// Creates an unconsumed buff.
    ///
    /// A buff with `turn_end_only` set is collected only when the agent ends
    /// its turn on the cell, never while walking across it.
    #[must_use]
    pub const fn new(
        id: BuffId,
        cell: CellCoord,
        extra_turns: u32,
        healing: u32,
        energy: u32,
        turn_end_only: bool,
    ) -> Self {
        Self {
            id,
            cell,
            extra_turns,
            healing,
            energy,
            turn_end_only,
            consumed: false,
        }
    }

    /// Identifier of the buff.
    #[must_use]
    pub const fn id(&self) -> BuffId {
        self.id
    }

    /// Extra player turns granted on pickup.
    #[must_use]
    pub const fn extra_turns(&self) -> u32 {
        self.extra_turns
    }

    /// Health restored on pickup.
    #[must_use]
    pub const fn healing(&self) -> u32 {
        self.healing
    }

    /// Energy restored on pickup.
    #[must_use]
    pub const fn energy(&self) -> u32 {
        self.energy
    }

    /// Whether the buff is only collected at turn end.
    #[must_use]
    pub const fn is_turn_end_only(&self) -> bool {
        self.turn_end_only
    }

    /// Whether the buff has already been picked up.
    #[must_use]
    pub const fn is_consumed(&self) -> bool {
        self.consumed
    }

    pub(crate) fn consume(&mut self) {
        self.consumed = true;
    }
}

impl HasCell for Buff {
    fn cell(&self) -> CellCoord {
        self.cell
    }
}

/// Floor trigger that toggles its patterns when the agent rests on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Switch {
    id: SwitchId,
    trigger: CellCoord,
    patterns: Vec<PatternDefinition>,
    active: bool,
}

impl Switch {
    /// Builds the switch from its definition without touching any board.
    #[must_use]
    pub fn from_definition(definition: SwitchDefinition) -> Self {
        Self {
            id: definition.id,
            trigger: definition.trigger,
            patterns: definition.patterns,
            active: definition.initially_active,
        }
    }

    /// Definition reproducing the switch in its current state.
    #[must_use]
    pub fn definition(&self) -> SwitchDefinition {
        SwitchDefinition {
            id: self.id,
            trigger: self.trigger,
            patterns: self.patterns.clone(),
            initially_active: self.active,
        }
    }

    /// Identifier of the switch.
    #[must_use]
    pub const fn id(&self) -> SwitchId {
        self.id
    }

    /// Patterns toggled by the switch.
    #[must_use]
    pub fn patterns(&self) -> &[PatternDefinition] {
        &self.patterns
    }

    /// Whether the switch's patterns are applied.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Flips the switch and returns the new state.
    pub(crate) fn toggle(&mut self) -> bool {
        self.active = !self.active;
        self.active
    }
}

impl HasCell for Switch {
    fn cell(&self) -> CellCoord {
        self.trigger
    }
}

/// Footprint-bearing entity that blocks cells while active.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Obstacle {
    id: ObstacleId,
    footprint: Footprint,
    transform: OccupantTransform,
    active: bool,
}

impl Obstacle {
    /// Creates an active obstacle. The world registers it with the board.
    #[must_use]
    pub const fn new(id: ObstacleId, footprint: Footprint, transform: OccupantTransform) -> Self {
        Self {
            id,
            footprint,
            transform,
            active: true,
        }
    }

    /// Identifier of the obstacle.
    #[must_use]
    pub const fn id(&self) -> ObstacleId {
        self.id
    }

    /// Untransformed footprint offsets.
    #[must_use]
    pub const fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    /// Current anchor, rotation, and mirroring.
    #[must_use]
    pub const fn transform(&self) -> OccupantTransform {
        self.transform
    }

    /// Whether the obstacle currently blocks the board.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(crate) fn set_anchor(&mut self, anchor: CellCoord) {
        self.transform = self.transform.with_anchor(anchor);
    }

    pub(crate) fn set_rotation(&mut self, rotation: QuarterTurn) {
        self.transform = self.transform.with_rotation(rotation);
    }

    pub(crate) fn set_mirror(&mut self, mirror: Mirror) {
        self.transform = self.transform.with_mirror(mirror);
    }

    pub(crate) fn set_transform(&mut self, transform: OccupantTransform) {
        self.transform = transform;
    }

    /// Footprint the obstacle would cover with its anchor moved to `anchor`.
    pub(crate) fn cells_at(&self, anchor: CellCoord, columns: u32, rows: u32) -> Vec<CellCoord> {
        self.footprint
            .cells(self.transform.with_anchor(anchor), columns, rows)
    }
}

impl HasCell for Obstacle {
    fn cell(&self) -> CellCoord {
        self.transform.anchor()
    }
}

impl BlocksCells for Obstacle {
    fn occupant_id(&self) -> ObstacleId {
        self.id
    }

    fn blocked_cells(&self, columns: u32, rows: u32) -> Vec<CellCoord> {
        self.footprint.cells(self.transform, columns, rows)
    }
}

/// Entity a mover drags along its route.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoverPayload {
    /// The mover carries nothing.
    #[default]
    None,
    /// The mover carries a hazard.
    Hazard(HazardId),
    /// The mover carries an obstacle's anchor.
    Obstacle(ObstacleId),
}

/// Scripted entity that ping-pongs along a fixed route during the AI phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mover {
    id: MoverId,
    route: Vec<CellCoord>,
    position: usize,
    forward: bool,
    steps_per_turn: u32,
    payload: MoverPayload,
}

impl Mover {
    /// Creates a mover on the first cell of `route`.
    ///
    /// Routes must be non-empty and 4-adjacent; level loading checks both.
    pub(crate) fn new(
        id: MoverId,
        route: Vec<CellCoord>,
        steps_per_turn: u32,
        payload: MoverPayload,
    ) -> Self {
        Self {
            id,
            route,
            position: 0,
            forward: true,
            steps_per_turn,
            payload,
        }
    }

    /// Identifier of the mover.
    #[must_use]
    pub const fn id(&self) -> MoverId {
        self.id
    }

    /// Cells the mover travels along.
    #[must_use]
    pub fn route(&self) -> &[CellCoord] {
        &self.route
    }

    /// Maximum steps taken per AI phase.
    #[must_use]
    pub const fn steps_per_turn(&self) -> u32 {
        self.steps_per_turn
    }

    /// Entity moved along with the mover.
    #[must_use]
    pub const fn payload(&self) -> MoverPayload {
        self.payload
    }

    /// Cell the mover would enter on its next step, `None` for one-cell routes.
    #[must_use]
    pub fn next_cell(&self) -> Option<CellCoord> {
        let (position, _) = self.next_position()?;
        self.route.get(position).copied()
    }

    pub(crate) fn advance(&mut self) {
        if let Some((position, forward)) = self.next_position() {
            self.position = position;
            self.forward = forward;
        }
    }

    fn next_position(&self) -> Option<(usize, bool)> {
        let last = self.route.len().checked_sub(1)?;
        if last == 0 {
            return None;
        }
        let next = match (self.forward, self.position) {
            (true, position) if position < last => (position + 1, true),
            (true, position) => (position - 1, false),
            (false, 0) => (1, true),
            (false, position) => (position - 1, false),
        };
        Some(next)
    }
}

impl HasCell for Mover {
    fn cell(&self) -> CellCoord {
        self.route
            .get(self.position)
            .copied()
            .unwrap_or(CellCoord::new(0, 0))
    }
}
