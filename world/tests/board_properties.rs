use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use switchback_core::{
    CellCoord, CellOffset, ObstacleId, PatternCell, PatternDefinition, PatternId, PatternStatus,
    WalkStatus, WorldPoint,
};
use switchback_world::{board::Board, BlocksCells, HasCell};

const COLUMNS: u32 = 5;
const ROWS: u32 = 4;

struct Stamp {
    id: ObstacleId,
    cells: Vec<CellCoord>,
}

impl HasCell for Stamp {
    fn cell(&self) -> CellCoord {
        self.cells.first().copied().unwrap_or(CellCoord::new(0, 0))
    }
}

impl BlocksCells for Stamp {
    fn occupant_id(&self) -> ObstacleId {
        self.id
    }

    fn blocked_cells(&self, _columns: u32, _rows: u32) -> Vec<CellCoord> {
        self.cells.clone()
    }
}

#[derive(Clone, Debug)]
enum Op {
    Register(u32, Vec<CellCoord>),
    Move(u32, Vec<CellCoord>),
    Unregister(u32),
}

fn board() -> Board {
    Board::new(COLUMNS, ROWS, 1.0, WorldPoint::default()).expect("valid board")
}

fn arb_cell() -> impl Strategy<Value = CellCoord> {
    (0..COLUMNS, 0..ROWS).prop_map(|(column, row)| CellCoord::new(column, row))
}

fn arb_status() -> impl Strategy<Value = WalkStatus> {
    prop_oneof![
        Just(WalkStatus::Unspecified),
        Just(WalkStatus::Walkable),
        Just(WalkStatus::Blocked),
    ]
}

fn arb_pattern_status() -> impl Strategy<Value = PatternStatus> {
    prop_oneof![Just(PatternStatus::Walkable), Just(PatternStatus::Blocked)]
}

fn arb_patterns() -> impl Strategy<Value = Vec<Vec<(CellCoord, PatternStatus)>>> {
    proptest::collection::vec(
        proptest::collection::vec((arb_cell(), arb_pattern_status()), 0..6),
        0..5,
    )
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let cells = || proptest::collection::vec(arb_cell(), 1..5);
    let op = prop_oneof![
        (0u32..3, cells()).prop_map(|(id, cells)| Op::Register(id, cells)),
        (0u32..3, cells()).prop_map(|(id, cells)| Op::Move(id, cells)),
        (0u32..3).prop_map(Op::Unregister),
    ];
    proptest::collection::vec(op, 0..24)
}

fn definition(id: usize, entries: &[(CellCoord, PatternStatus)]) -> PatternDefinition {
    PatternDefinition {
        id: PatternId::new(id as u32),
        anchor: None,
        cells: entries
            .iter()
            .map(|&(cell, status)| PatternCell {
                offset: CellOffset::new(cell.column() as i32, cell.row() as i32),
                status,
            })
            .collect(),
    }
}

fn all_cells() -> impl Iterator<Item = CellCoord> {
    (0..ROWS).flat_map(|row| (0..COLUMNS).map(move |column| CellCoord::new(column, row)))
}

proptest! {
    #[test]
    fn effective_walkability_follows_layer_precedence(
        base in proptest::collection::vec(arb_status(), (COLUMNS * ROWS) as usize),
        patterns in arb_patterns(),
        occupied in proptest::collection::vec(arb_cell(), 0..4),
    ) {
        let mut board = board();
        for (cell, status) in all_cells().zip(base.iter()) {
            prop_assert!(board.set_base_status(cell, *status));
        }
        for (id, entries) in patterns.iter().enumerate() {
            prop_assert!(board.apply_pattern(&definition(id, entries)));
        }
        board.register_occupant(&Stamp { id: ObstacleId::new(1), cells: occupied.clone() });

        for (cell, status) in all_cells().zip(base.iter()) {
            let forced = |wanted: PatternStatus| {
                patterns
                    .iter()
                    .flatten()
                    .any(|&(entry, forced_status)| entry == cell && forced_status == wanted)
            };
            let expected = !occupied.contains(&cell)
                && (forced(PatternStatus::Walkable)
                    || (status.is_walkable() && !forced(PatternStatus::Blocked)));
            prop_assert_eq!(board.is_walkable(cell), expected, "cell {:?}", cell);
        }
    }

    #[test]
    fn reverting_every_pattern_restores_base_walkability(
        base in proptest::collection::vec(arb_status(), (COLUMNS * ROWS) as usize),
        patterns in arb_patterns(),
        reverse in any::<bool>(),
    ) {
        let mut board = board();
        for (cell, status) in all_cells().zip(base.iter()) {
            prop_assert!(board.set_base_status(cell, *status));
        }
        for (id, entries) in patterns.iter().enumerate() {
            let definition = definition(id, entries);
            prop_assert!(board.apply_pattern(&definition));
            prop_assert!(!board.apply_pattern(&definition));
        }

        let mut ids: Vec<usize> = (0..patterns.len()).collect();
        if reverse {
            ids.reverse();
        }
        for id in ids {
            prop_assert!(board.revert_pattern(PatternId::new(id as u32)));
        }

        for (cell, status) in all_cells().zip(base.iter()) {
            prop_assert_eq!(board.is_walkable(cell), status.is_walkable());
            prop_assert!(!board.is_forced_walkable(cell));
            prop_assert!(!board.is_forced_blocked(cell));
        }
    }

    #[test]
    fn occupant_overlay_is_union_of_registered_footprints(ops in arb_ops()) {
        let mut board = board();
        let mut model: BTreeMap<u32, BTreeSet<CellCoord>> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Register(id, cells) => {
                    board.register_occupant(&Stamp { id: ObstacleId::new(id), cells: cells.clone() });
                    let _ = model.insert(id, cells.into_iter().collect());
                }
                Op::Move(id, cells) => {
                    board.notify_occupant_moved(&Stamp { id: ObstacleId::new(id), cells: cells.clone() });
                    if let Some(entry) = model.get_mut(&id) {
                        *entry = cells.into_iter().collect();
                    }
                }
                Op::Unregister(id) => {
                    let expected = model.remove(&id).is_some();
                    prop_assert_eq!(board.unregister_occupant(ObstacleId::new(id)), expected);
                }
            }

            let mut expected: Vec<CellCoord> = model.values().flatten().copied().collect();
            expected.sort_by_key(|cell| (cell.row(), cell.column()));
            expected.dedup();
            prop_assert_eq!(board.occupant_blocked_cells(), expected);

            let registered: Vec<ObstacleId> = model.keys().map(|id| ObstacleId::new(*id)).collect();
            prop_assert_eq!(board.registered_occupants(), registered);
        }
    }
}
