//! Serialisable board layout used to save and restore levels.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use switchback_core::{SwitchDefinition, WalkStatus, WorldPoint};
use thiserror::Error;
use tracing::warn;

use crate::{board::BoardError, entities::Switch, World};

/// Errors raised while encoding, decoding, or applying a [`BoardState`].
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The JSON payload could not be read or written.
    #[error("invalid board state payload: {0}")]
    Json(#[from] serde_json::Error),
    /// The captured layout cannot form a board.
    #[error(transparent)]
    Board(#[from] BoardError),
    /// Two captured switches or patterns reuse one identifier.
    #[error("duplicate {kind} id {id} in board state")]
    DuplicateId {
        /// Kind of identifier that collided.
        kind: &'static str,
        /// Colliding identifier.
        id: u32,
    },
}

/// Captured board layout and switch configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardState {
    /// Number of columns.
    pub columns: u32,
    /// Number of rows.
    pub rows: u32,
    /// Side length of a cell in world units.
    pub cell_size: f32,
    /// World-space position of the board's minimum corner.
    #[serde(default)]
    pub origin: WorldPoint,
    /// Row-major base layer.
    #[serde(default)]
    pub walkability: Vec<WalkStatus>,
    /// Boolean base layer written by older saves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_walkable: Option<Vec<bool>>,
    /// Switches with their state at capture time.
    #[serde(default)]
    pub switches: Vec<SwitchDefinition>,
}

impl BoardState {
    /// Encodes the state as JSON.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a state from JSON, migrating boolean walkability if present.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let mut state: Self = serde_json::from_str(json)?;
        let _ = state.migrate_legacy();
        Ok(state)
    }

    /// Converts `legacy_walkable` into `walkability`.
    ///
    /// Returns `true` when a migration happened. A legacy grid is discarded
    /// when a tri-state grid is already present.
    pub fn migrate_legacy(&mut self) -> bool {
        let Some(legacy) = self.legacy_walkable.take() else {
            return false;
        };
        if !self.walkability.is_empty() {
            warn!(
                legacy = legacy.len(),
                current = self.walkability.len(),
                "legacy_walkability_ignored"
            );
            return false;
        }
        self.walkability = legacy.into_iter().map(WalkStatus::from_legacy).collect();
        true
    }
}

impl World {
    /// Captures the board layout and switch states.
    #[must_use]
    pub fn capture_state(&self) -> BoardState {
        BoardState {
            columns: self.board.columns(),
            rows: self.board.rows(),
            cell_size: self.board.cell_size(),
            origin: self.board.origin(),
            walkability: self.board.base_layer().to_vec(),
            legacy_walkable: None,
            switches: self.switches.iter().map(Switch::definition).collect(),
        }
    }

    /// Rebuilds the board from `state`, then re-registers active obstacles and
    /// re-applies active switches.
    ///
    /// A walkability grid whose length disagrees with the dimensions is
    /// ignored and the previous base layer is kept where the layouts overlap.
    pub fn apply_state(&mut self, mut state: BoardState) -> Result<(), SnapshotError> {
        let _ = state.migrate_legacy();
        check_unique_ids(&state.switches)?;

        let expected = u64::from(state.columns) * u64::from(state.rows);
        let actual = state.walkability.len() as u64;
        let base = if actual == expected {
            Some(state.walkability)
        } else {
            warn!(expected, actual, "walkability_length_mismatch");
            None
        };

        self.board.rebuild(
            state.columns,
            state.rows,
            state.cell_size,
            state.origin,
            base,
        )?;

        for obstacle in self.obstacles.iter().filter(|obstacle| obstacle.is_active()) {
            self.board.register_occupant(obstacle);
        }

        self.switches = state
            .switches
            .into_iter()
            .map(Switch::from_definition)
            .collect();
        for switch in self.switches.iter().filter(|switch| switch.is_active()) {
            for pattern in switch.patterns() {
                let _ = self.board.apply_pattern(pattern);
            }
        }

        let agent = self.agent.cell();
        if !self.board.contains(agent) {
            warn!(
                column = agent.column(),
                row = agent.row(),
                "agent_outside_restored_board"
            );
        }
        Ok(())
    }
}

fn check_unique_ids(switches: &[SwitchDefinition]) -> Result<(), SnapshotError> {
    let mut switch_ids = BTreeSet::new();
    let mut pattern_ids = BTreeSet::new();
    for switch in switches {
        if !switch_ids.insert(switch.id.get()) {
            return Err(SnapshotError::DuplicateId {
                kind: "switch",
                id: switch.id.get(),
            });
        }
        for pattern in &switch.patterns {
            if !pattern_ids.insert(pattern.id.get()) {
                return Err(SnapshotError::DuplicateId {
                    kind: "pattern",
                    id: pattern.id.get(),
                });
            }
        }
    }
    Ok(())
}
