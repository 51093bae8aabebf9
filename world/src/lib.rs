#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the Switchback puzzle simulation.
//!
//! The world owns the board, the agent, and every turn-resolved entity.
//! All gameplay mutation flows through [`apply`], which validates a
//! [`Command`], resolves its consequences in a fixed order, and reports them
//! as [`Event`] values. Read access is provided by the [`query`] module.

pub mod board;
mod entities;
mod level;
mod occupancy;
mod snapshot;
mod turn;

use switchback_core::{
    CellCoord, Command, Event, GameOutcome, LoseReason, MoveRejection, ObstacleId, Path, Phase,
};
use switchback_system_pathfinding::Pathfinder;
use tracing::{debug, info};

use crate::board::{Board, ObserverId, WalkabilityChange};

pub use entities::{
    Agent, BlocksCells, Buff, HasCell, Hazard, Mover, MoverPayload, Obstacle, Switch,
};
pub use level::{
    AgentConfig, BoardConfig, BuffConfig, HazardConfig, LevelConfig, LevelError, MoverConfig,
    ObstacleConfig,
};
pub use snapshot::{BoardState, SnapshotError};
pub use turn::TurnState;

/// Complete state of a running level.
#[derive(Debug)]
pub struct World {
    board: Board,
    agent: Agent,
    flag: CellCoord,
    turn: TurnState,
    hazards: Vec<Hazard>,
    buffs: Vec<Buff>,
    switches: Vec<Switch>,
    obstacles: Vec<Obstacle>,
    movers: Vec<Mover>,
    pathfinder: Pathfinder,
}

impl World {
    /// Registers a callback invoked after every effective walkability change
    /// on the world's board.
    pub fn observe_walkability<F>(&mut self, observer: F) -> ObserverId
    where
        F: FnMut(&WalkabilityChange) + 'static,
    {
        self.board.subscribe(observer)
    }

    /// Removes a callback registered with [`World::observe_walkability`].
    pub fn stop_observing(&mut self, observer: ObserverId) -> bool {
        self.board.unsubscribe(observer)
    }

    fn request_move(&mut self, target: CellCoord, out_events: &mut Vec<Event>) {
        let path = match self.plan_move(target) {
            Ok(path) => path,
            Err(reason) => {
                debug!(
                    column = target.column(),
                    row = target.row(),
                    ?reason,
                    "move_rejected"
                );
                out_events.push(Event::MoveRejected { target, reason });
                return;
            }
        };

        self.walk(&path, out_events);
        self.end_player_phase(out_events);
    }

    fn plan_move(&mut self, target: CellCoord) -> Result<Path, MoveRejection> {
        if self.turn.is_over() {
            return Err(MoveRejection::GameOver);
        }
        if !self.board.contains(target) {
            return Err(MoveRejection::OutOfBounds);
        }
        if !self.board.is_walkable(target) {
            return Err(MoveRejection::NotWalkable);
        }
        if target == self.agent.cell() {
            return Err(MoveRejection::AlreadyThere);
        }

        let path = self
            .pathfinder
            .find_path(&self.board, self.agent.cell(), target)
            .ok_or(MoveRejection::NoPath)?;

        let available = self.agent.budget();
        if path.steps() > available {
            return Err(MoveRejection::InsufficientBudget {
                required: path.steps(),
                available,
            });
        }
        Ok(path)
    }

    /// Walks the path one step at a time. The path never exceeds the budget
    /// checked by [`World::plan_move`], so every step is taken.
    fn walk(&mut self, path: &Path, out_events: &mut Vec<Event>) {
        for &next in path.cells().iter().skip(1) {
            let from = self.agent.cell();
            self.agent.step_to(next);
            if let Some(energy) = self.agent.spend_energy() {
                out_events.push(Event::EnergyChanged { energy });
            }
            out_events.push(Event::AgentStepped { from, to: next });
            self.collect_buffs(next, false, out_events);
        }
    }

    fn skip_turn(&mut self, out_events: &mut Vec<Event>) {
        if self.turn.is_over() {
            debug!("skip_ignored_after_game_over");
            return;
        }
        out_events.push(Event::TurnSkipped);
        self.end_player_phase(out_events);
    }

    fn end_player_phase(&mut self, out_events: &mut Vec<Event>) {
        if self.turn.take_extra_turn() {
            debug!(remaining = self.turn.extra_turns(), "extra_turn_consumed");
            out_events.push(Event::ExtraTurnConsumed {
                remaining: self.turn.extra_turns(),
            });
            self.resolve_turn_end(false, out_events);
            return;
        }

        if self.turn.enter_ai() {
            debug!(phase = ?Phase::Ai, "phase_changed");
            out_events.push(Event::PhaseChanged { phase: Phase::Ai });
        }
        self.resolve_turn_end(true, out_events);
    }

    /// Resolves the end of a player action in a fixed order: switches, movers,
    /// hazards, buffs, the win check, and the energy check. Free turns granted
    /// by buffs skip movers and hazards.
    fn resolve_turn_end(&mut self, run_ai: bool, out_events: &mut Vec<Event>) {
        let resting = self.agent.cell();
        self.toggle_switches(resting, out_events);

        if run_ai {
            self.advance_movers(out_events);
            if self.resolve_hazards(out_events) {
                return;
            }
        }

        self.collect_buffs(resting, true, out_events);

        if resting == self.flag {
            self.win(out_events);
            return;
        }
        if self.agent.energy() == Some(0) {
            self.lose(LoseReason::EnergyDepleted, out_events);
            return;
        }

        if run_ai && self.turn.enter_player() {
            debug!(
                phase = ?Phase::Player,
                rounds = self.turn.rounds(),
                "phase_changed"
            );
            out_events.push(Event::PhaseChanged {
                phase: Phase::Player,
            });
        }
    }

    fn toggle_switches(&mut self, cell: CellCoord, out_events: &mut Vec<Event>) {
        for index in positions_at(&self.switches, cell) {
            let switch = &mut self.switches[index];
            let active = switch.toggle();
            for pattern in switch.patterns() {
                if active {
                    let _ = self.board.apply_pattern(pattern);
                } else {
                    let _ = self.board.revert_pattern(pattern.id);
                }
            }
            debug!(switch = switch.id().get(), active, "switch_toggled");
            out_events.push(Event::SwitchToggled {
                switch: switch.id(),
                active,
            });
        }
    }

    /// Collects every available buff on `cell`. Turn-end-only buffs are
    /// skipped while the agent is merely passing through.
    fn collect_buffs(&mut self, cell: CellCoord, at_turn_end: bool, out_events: &mut Vec<Event>) {
        for index in positions_at(&self.buffs, cell) {
            let buff = &mut self.buffs[index];
            if buff.is_consumed() || (buff.is_turn_end_only() && !at_turn_end) {
                continue;
            }
            buff.consume();
            out_events.push(Event::BuffConsumed {
                buff: buff.id(),
                extra_turns: buff.extra_turns(),
                healing: buff.healing(),
                energy: buff.energy(),
            });

            self.turn.grant_extra_turns(buff.extra_turns());
            if buff.healing() > 0 {
                if let Some(health) = self.agent.heal(buff.healing()) {
                    out_events.push(Event::HealthChanged { health });
                }
            }
            if buff.energy() > 0 {
                if let Some(energy) = self.agent.restore_energy(buff.energy()) {
                    out_events.push(Event::EnergyChanged { energy });
                }
            }
        }
    }

    fn advance_movers(&mut self, out_events: &mut Vec<Event>) {
        for index in 0..self.movers.len() {
            for _ in 0..self.movers[index].steps_per_turn() {
                if !self.step_mover(index, out_events) {
                    break;
                }
            }
        }
    }

    /// Moves a mover one cell along its route. A blocked mover waits for the
    /// rest of the turn.
    fn step_mover(&mut self, index: usize, out_events: &mut Vec<Event>) -> bool {
        let mover = &self.movers[index];
        let Some(next) = mover.next_cell() else {
            return false;
        };
        let (id, from, payload) = (mover.id(), mover.cell(), mover.payload());

        let passable = match payload {
            MoverPayload::Obstacle(obstacle) => self.obstacle_fits(obstacle, next),
            MoverPayload::None | MoverPayload::Hazard(_) => self.board.is_walkable(next),
        };
        if !passable {
            debug!(mover = id.get(), column = next.column(), row = next.row(), "mover_blocked");
            return false;
        }

        self.movers[index].advance();
        match payload {
            MoverPayload::None => {}
            MoverPayload::Hazard(hazard) => {
                if let Some(hazard) = self.hazards.iter_mut().find(|entry| entry.id() == hazard) {
                    hazard.set_cell(next);
                }
            }
            MoverPayload::Obstacle(obstacle) => {
                self.edit_obstacle(obstacle, out_events, |entry| entry.set_anchor(next));
            }
        }

        out_events.push(Event::MoverAdvanced {
            mover: id,
            from,
            to: next,
        });
        true
    }

    /// Reports whether the obstacle could be anchored on `anchor` without
    /// covering the agent or a cell that is unwalkable for it.
    fn obstacle_fits(&self, obstacle: ObstacleId, anchor: CellCoord) -> bool {
        let Some(entry) = self.obstacles.iter().find(|entry| entry.id() == obstacle) else {
            return false;
        };
        let cells = entry.cells_at(anchor, self.board.columns(), self.board.rows());
        self.footprint_fits(obstacle, &cells)
    }

    fn footprint_fits(&self, obstacle: ObstacleId, cells: &[CellCoord]) -> bool {
        cells
            .iter()
            .all(|&cell| cell != self.agent.cell() && self.board.is_walkable_for(cell, obstacle))
    }

    /// Applies hazard damage to the resting agent. Returns `true` when the
    /// agent was defeated.
    fn resolve_hazards(&mut self, out_events: &mut Vec<Event>) -> bool {
        let resting = self.agent.cell();
        let mut total = 0u32;
        for hazard in self.hazards.iter().filter(|hazard| hazard.reaches(resting)) {
            total = total.saturating_add(hazard.damage());
            out_events.push(Event::HazardTriggered {
                hazard: hazard.id(),
                damage: hazard.damage(),
            });
        }
        if total == 0 {
            return false;
        }

        let health = self.agent.take_damage(total);
        out_events.push(Event::HealthChanged { health });
        if health.is_depleted() {
            self.lose(LoseReason::Defeated, out_events);
            return true;
        }
        false
    }

    fn win(&mut self, out_events: &mut Vec<Event>) {
        if self.turn.finish(GameOutcome::Won) {
            info!(
                column = self.flag.column(),
                row = self.flag.row(),
                "game_won"
            );
            out_events.push(Event::GameWon { cell: self.flag });
        }
    }

    fn lose(&mut self, reason: LoseReason, out_events: &mut Vec<Event>) {
        if self.turn.finish(GameOutcome::Lost(reason)) {
            info!(?reason, "game_lost");
            out_events.push(Event::GameLost { reason });
        }
    }

    fn set_obstacle_active(
        &mut self,
        obstacle: ObstacleId,
        active: bool,
        out_events: &mut Vec<Event>,
    ) {
        let Some(index) = self.obstacles.iter().position(|entry| entry.id() == obstacle) else {
            debug!(obstacle = obstacle.get(), "unknown_obstacle");
            return;
        };
        if self.obstacles[index].is_active() == active {
            return;
        }

        if active {
            let cells =
                self.obstacles[index].blocked_cells(self.board.columns(), self.board.rows());
            if !self.footprint_fits(obstacle, &cells) {
                debug!(obstacle = obstacle.get(), "obstacle_activation_blocked");
                return;
            }
            self.obstacles[index].set_active(true);
            self.board.register_occupant(&self.obstacles[index]);
        } else {
            self.obstacles[index].set_active(false);
            let _ = self.board.unregister_occupant(obstacle);
        }
        out_events.push(Event::ObstacleFootprintChanged {
            obstacle,
            cells: self.board.occupant_footprint(obstacle),
        });
    }

    /// Mutates an obstacle's transform and reflects the new footprint into the
    /// board when the obstacle is active.
    ///
    /// The edit is undone when the anchor leaves the board, or when an active
    /// obstacle would cover the agent or a cell it cannot stand on.
    fn edit_obstacle<F>(&mut self, obstacle: ObstacleId, out_events: &mut Vec<Event>, edit: F)
    where
        F: FnOnce(&mut Obstacle),
    {
        let Some(index) = self.obstacles.iter().position(|entry| entry.id() == obstacle) else {
            debug!(obstacle = obstacle.get(), "unknown_obstacle");
            return;
        };
        let before = self.obstacles[index].transform();
        edit(&mut self.obstacles[index]);
        let after = self.obstacles[index].transform();
        if after == before {
            return;
        }
        if !self.board.contains(after.anchor()) {
            debug!(
                obstacle = obstacle.get(),
                column = after.anchor().column(),
                row = after.anchor().row(),
                "obstacle_anchor_out_of_bounds"
            );
            self.obstacles[index].set_transform(before);
            return;
        }
        if !self.obstacles[index].is_active() {
            return;
        }

        let cells = self.obstacles[index].blocked_cells(self.board.columns(), self.board.rows());
        if !self.footprint_fits(obstacle, &cells) {
            debug!(obstacle = obstacle.get(), "obstacle_edit_blocked");
            self.obstacles[index].set_transform(before);
            return;
        }

        self.board.notify_occupant_moved(&self.obstacles[index]);
        out_events.push(Event::ObstacleFootprintChanged {
            obstacle,
            cells: self.board.occupant_footprint(obstacle),
        });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::RequestMove { target } => world.request_move(target, out_events),
        Command::RequestSkipTurn => world.skip_turn(out_events),
        Command::SetBaseWalkable { cell, status } => {
            if !world.board.set_base_status(cell, status) {
                debug!(
                    column = cell.column(),
                    row = cell.row(),
                    "base_edit_out_of_bounds"
                );
            }
        }
        command if world.turn.is_over() => {
            debug!(?command, "command_ignored_after_game_over");
        }
        Command::ActivateObstacle { obstacle } => {
            world.set_obstacle_active(obstacle, true, out_events);
        }
        Command::DeactivateObstacle { obstacle } => {
            world.set_obstacle_active(obstacle, false, out_events);
        }
        Command::MoveObstacle { obstacle, anchor } => {
            world.edit_obstacle(obstacle, out_events, |entry| entry.set_anchor(anchor));
        }
        Command::RotateObstacle { obstacle, rotation } => {
            world.edit_obstacle(obstacle, out_events, |entry| entry.set_rotation(rotation));
        }
        Command::MirrorObstacle { obstacle, mirror } => {
            world.edit_obstacle(obstacle, out_events, |entry| entry.set_mirror(mirror));
        }
    }
}

fn positions_at<T: HasCell>(items: &[T], cell: CellCoord) -> Vec<usize> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.cell() == cell)
        .map(|(index, _)| index)
        .collect()
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use switchback_core::{CellCoord, GameOutcome, Phase};

    use super::{Agent, Board, Buff, Hazard, Mover, Obstacle, Switch, TurnState, World};

    /// Provides read-only access to the board.
    #[must_use]
    pub fn board(world: &World) -> &Board {
        &world.board
    }

    /// Provides read-only access to the agent.
    #[must_use]
    pub fn agent(world: &World) -> &Agent {
        &world.agent
    }

    /// Cell the agent must rest on to win.
    #[must_use]
    pub fn flag(world: &World) -> CellCoord {
        world.flag
    }

    /// Phase, extra turns, and outcome of the level.
    #[must_use]
    pub fn turn(world: &World) -> &TurnState {
        &world.turn
    }

    /// Current phase of the turn cycle.
    #[must_use]
    pub fn phase(world: &World) -> Phase {
        world.turn.phase()
    }

    /// Terminal outcome, if the level has ended.
    #[must_use]
    pub fn outcome(world: &World) -> Option<GameOutcome> {
        world.turn.outcome()
    }

    /// Hazards in level order.
    #[must_use]
    pub fn hazards(world: &World) -> &[Hazard] {
        &world.hazards
    }

    /// Buffs in level order, consumed ones included.
    #[must_use]
    pub fn buffs(world: &World) -> &[Buff] {
        &world.buffs
    }

    /// Switches in level order.
    #[must_use]
    pub fn switches(world: &World) -> &[Switch] {
        &world.switches
    }

    /// Obstacles in level order, inactive ones included.
    #[must_use]
    pub fn obstacles(world: &World) -> &[Obstacle] {
        &world.obstacles
    }

    /// Movers in level order.
    #[must_use]
    pub fn movers(world: &World) -> &[Mover] {
        &world.movers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchback_core::{
        BuffId, CellOffset, Footprint, HazardId, Health, Mirror, MoverId, PatternCell,
        PatternDefinition, PatternId, PatternStatus, QuarterTurn, SwitchDefinition, SwitchId,
        WalkStatus,
    };

    fn open_level(columns: u32, rows: u32, start: CellCoord, flag: CellCoord) -> LevelConfig {
        LevelConfig::new(
            BoardConfig::new(columns, rows),
            AgentConfig::new(start, 4),
            flag,
        )
    }

    fn world(config: &LevelConfig) -> World {
        World::from_level(config).expect("valid level")
    }

    fn step(world: &mut World, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        apply(world, command, &mut events);
        events
    }

    #[test]
    fn move_within_budget_walks_and_returns_to_player_phase() {
        let mut world = world(&open_level(5, 5, CellCoord::new(0, 0), CellCoord::new(4, 4)));
        let events = step(
            &mut world,
            Command::RequestMove {
                target: CellCoord::new(2, 1),
            },
        );

        let steps = events
            .iter()
            .filter(|event| matches!(event, Event::AgentStepped { .. }))
            .count();
        assert_eq!(steps, 3);
        assert_eq!(query::agent(&world).cell(), CellCoord::new(2, 1));
        assert_eq!(
            events.last(),
            Some(&Event::PhaseChanged {
                phase: Phase::Player
            })
        );
        assert_eq!(query::turn(&world).rounds(), 1);
    }

    #[test]
    fn rejected_moves_leave_state_untouched() {
        let mut config = open_level(5, 5, CellCoord::new(0, 0), CellCoord::new(4, 4));
        config.board.blocked = vec![CellCoord::new(1, 0)];
        let mut world = world(&config);

        let cases = [
            (CellCoord::new(9, 0), MoveRejection::OutOfBounds),
            (CellCoord::new(1, 0), MoveRejection::NotWalkable),
            (CellCoord::new(0, 0), MoveRejection::AlreadyThere),
            (
                CellCoord::new(4, 4),
                MoveRejection::InsufficientBudget {
                    required: 8,
                    available: 4,
                },
            ),
        ];
        for (target, reason) in cases {
            let events = step(&mut world, Command::RequestMove { target });
            assert_eq!(events, vec![Event::MoveRejected { target, reason }]);
        }
        assert_eq!(query::agent(&world).cell(), CellCoord::new(0, 0));
        assert_eq!(query::phase(&world), Phase::Player);
    }

    #[test]
    fn unreachable_target_reports_no_path() {
        let mut config = open_level(3, 3, CellCoord::new(0, 0), CellCoord::new(2, 2));
        config.board.blocked = vec![
            CellCoord::new(0, 1),
            CellCoord::new(1, 1),
            CellCoord::new(2, 1),
        ];
        let mut world = world(&config);

        let target = CellCoord::new(2, 2);
        assert_eq!(
            step(&mut world, Command::RequestMove { target }),
            vec![Event::MoveRejected {
                target,
                reason: MoveRejection::NoPath
            }]
        );
    }

    #[test]
    fn skip_turn_runs_ai_phase() {
        let mut world = world(&open_level(3, 3, CellCoord::new(0, 0), CellCoord::new(2, 2)));
        assert_eq!(
            step(&mut world, Command::RequestSkipTurn),
            vec![
                Event::TurnSkipped,
                Event::PhaseChanged { phase: Phase::Ai },
                Event::PhaseChanged {
                    phase: Phase::Player
                },
            ]
        );
    }

    #[test]
    fn hazards_accumulate_damage_until_defeat() {
        let mut config = open_level(3, 1, CellCoord::new(0, 0), CellCoord::new(2, 0));
        config.agent.health = 2;
        config.hazards = vec![HazardConfig::new(HazardId::new(1), CellCoord::new(1, 0), 1)];
        let mut world = world(&config);

        let events = step(&mut world, Command::RequestSkipTurn);
        assert!(events.contains(&Event::HealthChanged {
            health: Health::new(1)
        }));
        assert_eq!(query::outcome(&world), None);

        let events = step(&mut world, Command::RequestSkipTurn);
        assert!(events.contains(&Event::GameLost {
            reason: LoseReason::Defeated
        }));
        assert_eq!(
            query::outcome(&world),
            Some(GameOutcome::Lost(LoseReason::Defeated))
        );
    }

    #[test]
    fn extra_turn_skips_movers_and_hazards() {
        let mut config = open_level(4, 1, CellCoord::new(0, 0), CellCoord::new(3, 0));
        config.buffs = vec![BuffConfig {
            extra_turns: 1,
            ..BuffConfig::new(BuffId::new(1), CellCoord::new(1, 0))
        }];
        config.hazards = vec![HazardConfig::new(HazardId::new(1), CellCoord::new(3, 0), 1)];
        config.movers = vec![MoverConfig::new(
            MoverId::new(1),
            vec![CellCoord::new(2, 0), CellCoord::new(3, 0)],
        )];
        let mut world = world(&config);

        let events = step(
            &mut world,
            Command::RequestMove {
                target: CellCoord::new(1, 0),
            },
        );
        assert!(events.contains(&Event::ExtraTurnConsumed { remaining: 0 }));
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::MoverAdvanced { .. } | Event::PhaseChanged { .. })));
        assert_eq!(query::phase(&world), Phase::Player);

        let events = step(&mut world, Command::RequestSkipTurn);
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::MoverAdvanced { .. })));
    }

    #[test]
    fn switch_toggles_its_patterns_when_rested_on() {
        let mut config = open_level(3, 3, CellCoord::new(0, 0), CellCoord::new(2, 2));
        config.board.blocked = vec![CellCoord::new(2, 1)];
        config.switches = vec![SwitchDefinition {
            id: SwitchId::new(1),
            trigger: CellCoord::new(1, 0),
            patterns: vec![PatternDefinition {
                id: PatternId::new(1),
                anchor: None,
                cells: vec![PatternCell {
                    offset: CellOffset::new(2, 1),
                    status: PatternStatus::Walkable,
                }],
            }],
            initially_active: false,
        }];
        let mut world = world(&config);

        let events = step(
            &mut world,
            Command::RequestMove {
                target: CellCoord::new(1, 0),
            },
        );
        assert!(events.contains(&Event::SwitchToggled {
            switch: SwitchId::new(1),
            active: true,
        }));
        assert!(query::board(&world).is_walkable(CellCoord::new(2, 1)));
        assert!(query::switches(&world)[0].is_active());
    }

    #[test]
    fn obstacle_commands_update_board_footprint() {
        let mut config = open_level(4, 4, CellCoord::new(0, 0), CellCoord::new(3, 3));
        config.obstacles = vec![ObstacleConfig {
            footprint: Footprint::rectangle(2, 1),
            ..ObstacleConfig::new(ObstacleId::new(1), CellCoord::new(1, 1))
        }];
        let mut world = world(&config);
        assert!(!query::board(&world).is_walkable(CellCoord::new(2, 1)));

        let events = step(
            &mut world,
            Command::RotateObstacle {
                obstacle: ObstacleId::new(1),
                rotation: QuarterTurn::Quarter,
            },
        );
        assert_eq!(
            events,
            vec![Event::ObstacleFootprintChanged {
                obstacle: ObstacleId::new(1),
                cells: vec![CellCoord::new(1, 1), CellCoord::new(1, 2)],
            }]
        );
        assert!(query::board(&world).is_walkable(CellCoord::new(2, 1)));

        let _ = step(
            &mut world,
            Command::DeactivateObstacle {
                obstacle: ObstacleId::new(1),
            },
        );
        assert!(query::board(&world).occupant_blocked_cells().is_empty());
        assert!(!query::obstacles(&world)[0].is_active());
    }

    fn obstacle_level(footprint: Footprint, anchor: CellCoord) -> World {
        let mut config = open_level(4, 4, CellCoord::new(0, 0), CellCoord::new(3, 3));
        config.obstacles = vec![ObstacleConfig {
            footprint,
            ..ObstacleConfig::new(ObstacleId::new(1), anchor)
        }];
        world(&config)
    }

    fn assert_agent_can_still_move(world: &mut World) {
        let agent = query::agent(world).cell();
        assert!(query::board(world).is_walkable(agent));
        let target = if agent == CellCoord::new(0, 1) {
            CellCoord::new(0, 2)
        } else {
            CellCoord::new(0, 1)
        };
        let events = step(world, Command::RequestMove { target });
        assert!(
            !events
                .iter()
                .any(|event| matches!(event, Event::MoveRejected { .. })),
            "agent stuck: {events:?}"
        );
    }

    #[test]
    fn moving_an_obstacle_onto_the_agent_is_refused() {
        let mut world = obstacle_level(Footprint::single(), CellCoord::new(2, 2));
        let events = step(
            &mut world,
            Command::MoveObstacle {
                obstacle: ObstacleId::new(1),
                anchor: CellCoord::new(0, 0),
            },
        );

        assert!(events.is_empty());
        assert_eq!(query::obstacles(&world)[0].cell(), CellCoord::new(2, 2));
        assert_eq!(
            query::board(&world).occupant_blocked_cells(),
            vec![CellCoord::new(2, 2)]
        );
        assert_agent_can_still_move(&mut world);
    }

    #[test]
    fn rotating_an_obstacle_onto_the_agent_is_refused() {
        let mut world = obstacle_level(Footprint::rectangle(2, 1), CellCoord::new(1, 0));
        let events = step(
            &mut world,
            Command::RotateObstacle {
                obstacle: ObstacleId::new(1),
                rotation: QuarterTurn::Half,
            },
        );

        assert!(events.is_empty());
        assert_eq!(
            query::obstacles(&world)[0].transform().rotation(),
            QuarterTurn::None
        );
        assert_eq!(
            query::board(&world).occupant_blocked_cells(),
            vec![CellCoord::new(1, 0), CellCoord::new(2, 0)]
        );
        assert_agent_can_still_move(&mut world);
    }

    #[test]
    fn mirroring_an_obstacle_onto_the_agent_is_refused() {
        let mut world = obstacle_level(Footprint::rectangle(2, 1), CellCoord::new(1, 0));
        let events = step(
            &mut world,
            Command::MirrorObstacle {
                obstacle: ObstacleId::new(1),
                mirror: Mirror {
                    horizontal: true,
                    vertical: false,
                },
            },
        );

        assert!(events.is_empty());
        assert_eq!(query::obstacles(&world)[0].transform().mirror(), Mirror::NONE);
        assert_agent_can_still_move(&mut world);
    }

    #[test]
    fn activating_an_obstacle_over_the_agent_is_refused() {
        let mut world = obstacle_level(Footprint::single(), CellCoord::new(1, 0));
        let _ = step(
            &mut world,
            Command::DeactivateObstacle {
                obstacle: ObstacleId::new(1),
            },
        );
        let _ = step(
            &mut world,
            Command::RequestMove {
                target: CellCoord::new(1, 0),
            },
        );
        assert_eq!(query::agent(&world).cell(), CellCoord::new(1, 0));

        let events = step(
            &mut world,
            Command::ActivateObstacle {
                obstacle: ObstacleId::new(1),
            },
        );

        assert!(events.is_empty());
        assert!(!query::obstacles(&world)[0].is_active());
        assert!(query::board(&world).occupant_blocked_cells().is_empty());
        assert_agent_can_still_move(&mut world);
    }

    #[test]
    fn obstacle_anchor_must_stay_on_the_board() {
        let mut world = obstacle_level(Footprint::single(), CellCoord::new(2, 2));
        let events = step(
            &mut world,
            Command::MoveObstacle {
                obstacle: ObstacleId::new(1),
                anchor: CellCoord::new(9, 9),
            },
        );
        assert!(events.is_empty());
        assert_eq!(
            query::board(&world).occupant_blocked_cells(),
            vec![CellCoord::new(2, 2)]
        );

        let _ = step(
            &mut world,
            Command::DeactivateObstacle {
                obstacle: ObstacleId::new(1),
            },
        );
        let _ = step(
            &mut world,
            Command::MoveObstacle {
                obstacle: ObstacleId::new(1),
                anchor: CellCoord::new(9, 9),
            },
        );
        assert_eq!(query::obstacles(&world)[0].cell(), CellCoord::new(2, 2));

        let events = step(
            &mut world,
            Command::ActivateObstacle {
                obstacle: ObstacleId::new(1),
            },
        );
        assert_eq!(
            events,
            vec![Event::ObstacleFootprintChanged {
                obstacle: ObstacleId::new(1),
                cells: vec![CellCoord::new(2, 2)],
            }]
        );
    }

    #[test]
    fn move_spends_exactly_the_path_length_of_energy() {
        let mut config = open_level(5, 1, CellCoord::new(0, 0), CellCoord::new(4, 0));
        config.agent.energy = Some(3);
        let mut world = world(&config);

        let events = step(
            &mut world,
            Command::RequestMove {
                target: CellCoord::new(3, 0),
            },
        );

        let steps = events
            .iter()
            .filter(|event| matches!(event, Event::AgentStepped { .. }))
            .count();
        assert_eq!(steps, 3);
        assert_eq!(query::agent(&world).energy(), Some(0));
        assert_eq!(
            query::outcome(&world),
            Some(GameOutcome::Lost(LoseReason::EnergyDepleted))
        );
    }

    #[test]
    fn base_edits_are_forwarded_to_the_board() {
        let mut world = world(&open_level(2, 2, CellCoord::new(0, 0), CellCoord::new(1, 1)));
        let events = step(
            &mut world,
            Command::SetBaseWalkable {
                cell: CellCoord::new(1, 0),
                status: WalkStatus::Blocked,
            },
        );
        assert!(events.is_empty());
        assert!(!query::board(&world).is_walkable(CellCoord::new(1, 0)));
    }
}
