//! Integration tests for gear_inventory

use std::sync::Arc;

use gear_inventory::prelude::*;
use gear_sync::{PersistRecord, RecordingSink};
use parking_lot::Mutex;

fn engine_with(size: usize, records: Vec<ItemRecord>) -> (TransferEngine, RecordingSink) {
    let sink = RecordingSink::new();
    let (engine, _) = TransferEngine::from_records(
        GridLayout::new(size, Orientation::Horizontal),
        records,
        Box::new(sink.clone()),
    )
    .unwrap();
    sink.take();
    (engine, sink)
}

/// Capture every notification the engine publishes
fn capture(engine: &mut TransferEngine) -> Arc<Mutex<Vec<TransferEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    engine.events_mut().subscribe(move |event: &TransferEvent| {
        seen_clone.lock().push(event.clone());
    });
    seen
}

#[test]
fn test_swap_exchanges_cells() {
    let (mut engine, sink) = engine_with(
        4,
        vec![ItemRecord::new("a").at_index(0), ItemRecord::new("b").at_index(3)],
    );
    let c1 = Cell::new(0, 0);
    let c2 = Cell::new(1, 1);

    let outcome = engine.move_within_grid("a", c2).unwrap();
    assert!(outcome.is_committed());

    assert_eq!(engine.locate("a"), Some(Position::Cell(c2)));
    assert_eq!(engine.locate("b"), Some(Position::Cell(c1)));
    assert_eq!(engine.grid().occupant(c1).and_then(|o| o.item()), Some("b"));
    assert_eq!(engine.grid().occupant(c2).and_then(|o| o.item()), Some("a"));
    assert_eq!(engine.item("b").unwrap().last_position, Position::Cell(c2));

    let batches = sink.take();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0].records,
        vec![
            PersistRecord::moved("a", Some(0), Some(3)),
            PersistRecord::moved("b", Some(3), Some(0)),
        ]
    );
}

#[test]
fn test_equip_evicts_into_vacated_cell() {
    let (mut engine, sink) = engine_with(
        4,
        vec![
            ItemRecord::new("x").with_slot(SlotName::Head).equipped(),
            ItemRecord::new("y").with_slot(SlotName::Head).at_index(2),
        ],
    );
    let c = Cell::new(1, 0);
    let seen = capture(&mut engine);

    engine.equip("y", SlotName::Head).unwrap();

    assert_eq!(engine.slots().get(SlotName::Head), Some("y"));
    assert_eq!(engine.locate("x"), Some(Position::Cell(c)));
    assert!(!engine.item("x").unwrap().equipped);
    assert!(engine.item("y").unwrap().equipped);

    // The vacated cell went to x, so a new item lands elsewhere
    let free = engine.grid().next_free_cell().unwrap();
    assert_ne!(free, c);
    engine.load(vec![ItemRecord::new("z")]).unwrap();
    assert_ne!(engine.locate("z"), Some(Position::Cell(c)));

    let batches = sink.take();
    assert_eq!(
        batches[0].records,
        vec![
            PersistRecord::equip_change("y", true, Some(2), None),
            PersistRecord::equip_change("x", false, None, Some(2)),
        ]
    );
    assert_eq!(
        *seen.lock(),
        vec![
            TransferEvent::ItemEquipped {
                item: "y".to_string(),
                slot: SlotName::Head,
            },
            TransferEvent::ItemUnequipped {
                item: "x".to_string(),
                cell: c,
            },
        ]
    );
}

#[test]
fn test_equip_from_unplaced_evicts_to_first_free_cell() {
    let (mut engine, _) = engine_with(
        2,
        vec![
            ItemRecord::new("a").with_slot(SlotName::Head).at_index(0),
            ItemRecord::new("b").at_index(1),
            ItemRecord::new("w").with_slot(SlotName::Body).equipped(),
            ItemRecord::new("x").with_slot(SlotName::Body),
        ],
    );
    assert_eq!(engine.locate("x"), Some(Position::Unplaced));

    // Nowhere to put w
    assert_eq!(
        engine.equip("x", SlotName::Body).unwrap(),
        TransferOutcome::Rejected(Rejection::InventoryFull)
    );
    assert_eq!(engine.slots().get(SlotName::Body), Some("w"));

    engine.toggle_equip("a").unwrap();
    assert!(engine.equip("x", SlotName::Body).unwrap().is_committed());
    assert_eq!(engine.slots().get(SlotName::Body), Some("x"));
    assert_eq!(engine.index_of("w"), Some(0));
}

#[test]
fn test_remap_keeps_index() {
    let (mut engine, sink) = engine_with(10, vec![ItemRecord::new("sword").at_index(3)]);
    assert_eq!(engine.locate("sword"), Some(Position::Cell(Cell::new(0, 3))));

    let report = engine
        .resize(GridLayout::new(10, Orientation::Vertical))
        .unwrap();

    assert!(report.replaced.is_empty());
    assert_eq!(engine.grid().rows(), 5);
    assert_eq!(engine.index_of("sword"), Some(3));
    assert_eq!(engine.locate("sword"), Some(Position::Cell(Cell::new(1, 1))));
    assert!(sink.batches().is_empty());
}

#[test]
fn test_resize_moves_padding_and_replaces_items() {
    let (mut engine, sink) = engine_with(
        6,
        vec![ItemRecord::new("a").at_index(0), ItemRecord::new("z").at_index(5)],
    );

    let report = engine
        .resize(GridLayout::new(5, Orientation::Vertical))
        .unwrap();

    assert_eq!(report.replaced, vec!["z"]);
    assert!(engine.grid().is_reserved(Cell::new(2, 1)));
    assert_eq!(engine.index_of("a"), Some(0));
    assert_eq!(engine.index_of("z"), Some(1));

    let batches = sink.take();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0].records,
        vec![PersistRecord::moved("z", Some(5), Some(1))]
    );
}

#[test]
fn test_resize_without_room_leaves_item_unplaced() {
    let records = ["a", "b", "c", "d", "e", "f"]
        .iter()
        .enumerate()
        .map(|(i, name)| ItemRecord::new(*name).at_index(i))
        .collect();
    let (mut engine, sink) = engine_with(6, records);

    let report = engine
        .resize(GridLayout::new(5, Orientation::Vertical))
        .unwrap();

    assert!(report.replaced.is_empty());
    assert_eq!(report.overflow, vec!["f"]);
    assert_eq!(engine.locate("f"), Some(Position::Unplaced));
    assert_eq!(engine.item("f").unwrap().last_position, Position::Cell(Cell::new(2, 1)));
    assert_eq!(engine.grid().locate("f"), None);
    assert!(engine.grid().is_reserved(Cell::new(2, 1)));
    assert_eq!(engine.grid().reserved_count(), 1);
    assert_eq!(
        sink.take()[0].records,
        vec![PersistRecord::moved("f", Some(5), None)]
    );

    // With nowhere to swap from, the padding cell stays blocked
    let outcome = engine.move_within_grid("f", Cell::new(0, 0)).unwrap();
    assert_eq!(outcome, TransferOutcome::Rejected(Rejection::InventoryFull));
    assert_eq!(engine.locate("a"), Some(Position::Cell(Cell::new(0, 0))));
    assert_eq!(engine.grid().reserved_count(), 1);
}

#[test]
fn test_resize_cancels_drag() {
    let (mut engine, _) = engine_with(4, vec![ItemRecord::new("a").at_index(0)]);
    let seen = capture(&mut engine);

    engine.begin_drag("a").unwrap();
    engine
        .resize(GridLayout::new(4, Orientation::Vertical))
        .unwrap();

    assert_eq!(engine.gesture(), &GestureState::Idle);
    assert!(matches!(
        seen.lock().as_slice(),
        [TransferEvent::GestureRejected { .. }]
    ));
}

#[test]
fn test_drop_on_blocked_cell_rolls_back() {
    let (mut engine, sink) = engine_with(3, vec![ItemRecord::new("a").at_index(1)]);
    let seen = capture(&mut engine);
    let before: Vec<_> = engine
        .grid()
        .cells()
        .map(|(cell, o)| (cell, o.clone()))
        .collect();

    engine.begin_drag("a").unwrap();
    let outcome = engine
        .end_drag("a", DropTarget::Cell(Cell::new(1, 1)))
        .unwrap();

    assert!(outcome.is_rejected());
    let after: Vec<_> = engine
        .grid()
        .cells()
        .map(|(cell, o)| (cell, o.clone()))
        .collect();
    assert_eq!(before, after);
    assert_eq!(engine.locate("a"), Some(Position::Cell(Cell::new(0, 1))));
    assert!(sink.batches().is_empty());
    assert_eq!(
        *seen.lock(),
        vec![TransferEvent::GestureRejected {
            item: "a".to_string(),
            return_to: Position::Cell(Cell::new(0, 1)),
        }]
    );
}

#[test]
fn test_slot_drop_needs_selection_and_matching_type() {
    let (mut engine, _) = engine_with(
        4,
        vec![ItemRecord::new("sword").with_slot(SlotName::MainHand).at_index(0)],
    );

    engine.begin_drag("sword").unwrap();
    let outcome = engine
        .end_drag("sword", DropTarget::Slot(SlotName::MainHand))
        .unwrap();
    assert_eq!(outcome, TransferOutcome::Rejected(Rejection::NotSelected));

    engine.begin_drag("sword").unwrap();
    engine
        .cross_boundary("sword", Crossing::TowardEquipment)
        .unwrap();
    let outcome = engine
        .end_drag("sword", DropTarget::Slot(SlotName::Head))
        .unwrap();
    assert_eq!(
        outcome,
        TransferOutcome::Rejected(Rejection::SlotTypeMismatch(SlotName::Head))
    );
    assert_eq!(engine.index_of("sword"), Some(0));
}

#[test]
fn test_drag_ending_inside_grid_moves() {
    let (mut engine, _) = engine_with(4, vec![ItemRecord::new("a").at_index(0)]);

    engine.begin_drag("a").unwrap();
    engine.cross_boundary("a", Crossing::TowardEquipment).unwrap();
    engine.cross_boundary("a", Crossing::TowardInventory).unwrap();
    let outcome = engine.end_drag("a", DropTarget::Cell(Cell::new(0, 1))).unwrap();

    assert!(outcome.is_committed());
    assert_eq!(engine.index_of("a"), Some(1));
}

#[test]
fn test_sword_equip_scenario() {
    let (mut engine, sink) = engine_with(
        4,
        vec![
            ItemRecord::new("sword")
                .with_type(ItemType::Weapon)
                .with_slot(SlotName::MainHand)
                .at_index(0),
            ItemRecord::new("shield")
                .with_type(ItemType::Shield)
                .with_slot(SlotName::OffHand)
                .at_index(1),
        ],
    );
    assert_eq!(engine.slots().get(SlotName::MainHand), None);

    engine.begin_drag("sword").unwrap();
    engine
        .cross_boundary("sword", Crossing::TowardEquipment)
        .unwrap();
    let outcome = engine
        .end_drag("sword", DropTarget::Slot(SlotName::MainHand))
        .unwrap();
    assert!(outcome.is_committed());

    let sword = engine.item("sword").unwrap();
    assert!(sword.equipped);
    assert_eq!(sword.current_position, Position::Slot(SlotName::MainHand));
    assert!(engine.grid().is_empty(Cell::new(0, 0)));
    assert_eq!(engine.slots().get(SlotName::MainHand), Some("sword"));
    assert_eq!(engine.index_of("shield"), Some(1));

    let batches = sink.take();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        serde_json::to_value(&batches[0].records).unwrap(),
        serde_json::json!([{
            "name": "sword",
            "equipped": true,
            "lastSpaceIndex": 0,
            "currentSpaceIndex": -1
        }])
    );
}
