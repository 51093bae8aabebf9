//! Turn phase bookkeeping.

use switchback_core::{GameOutcome, Phase};

/// Phase, queued extra turns, and terminal outcome of a level.
///
/// Once an outcome is recorded every transition is refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnState {
    phase: Phase,
    extra_turns: u32,
    outcome: Option<GameOutcome>,
    rounds: u64,
}

impl TurnState {
    /// Starts in the player phase with no extra turns.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: Phase::Player,
            extra_turns: 0,
            outcome: None,
            rounds: 0,
        }
    }

    /// Phase the level is in, or was in when it ended.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Extra player turns queued by buffs.
    #[must_use]
    pub const fn extra_turns(&self) -> u32 {
        self.extra_turns
    }

    /// Terminal outcome, if the level has ended.
    #[must_use]
    pub const fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    /// Reports whether the level has ended.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Number of completed AI phases.
    #[must_use]
    pub const fn rounds(&self) -> u64 {
        self.rounds
    }

    pub(crate) fn grant_extra_turns(&mut self, turns: u32) {
        self.extra_turns = self.extra_turns.saturating_add(turns);
    }

    /// Spends one queued extra turn, if any.
    pub(crate) fn take_extra_turn(&mut self) -> bool {
        if self.is_over() || self.extra_turns == 0 {
            return false;
        }
        self.extra_turns -= 1;
        true
    }

    pub(crate) fn enter_ai(&mut self) -> bool {
        if self.is_over() || self.phase == Phase::Ai {
            return false;
        }
        self.phase = Phase::Ai;
        true
    }

    pub(crate) fn enter_player(&mut self) -> bool {
        if self.is_over() || self.phase == Phase::Player {
            return false;
        }
        self.phase = Phase::Player;
        self.rounds += 1;
        true
    }

    /// Records the outcome; only the first call has any effect.
    pub(crate) fn finish(&mut self, outcome: GameOutcome) -> bool {
        if self.is_over() {
            return false;
        }
        self.outcome = Some(outcome);
        true
    }
}

impl Default for TurnState {
    fn default() -> Self {
        Self::new()
    }
}
