//! End-to-end combat properties through the public API
//!
//! Each test builds a small state by hand, drives one rules subsystem and
//! checks the observable result: location values, reports, graveyard and
//! turn queues.

use skirmish_core::core::{ChassisBuilder, DamageClass, Facing, LocationKind, MovementMode, TeamId, UnitId};
use skirmish_core::damage::{apply_damage, DamageRequest};
use skirmish_core::game::turn_order::{build_turns, roll_initiative};
use skirmish_core::game::{GameOptions, GameState, Phase};
use skirmish_core::hazards::{self, HazardEvent};
use skirmish_core::map::{Board, HexCoord};

fn two_sides(width: i32, height: i32) -> (GameState, skirmish_core::core::PlayerId) {
    let mut state = GameState::new(Board::new(width, height), GameOptions::default());
    state.seed(1);
    let a = state.add_player("Alpha", TeamId(1));
    state.add_player("Bravo", TeamId(2));
    (state, a)
}

fn place(state: &mut GameState, id: UnitId, x: i32, y: i32, facing: Facing) {
    state.unit_mut(id).unwrap().deployed = true;
    state.place_unit(id, HexCoord::new(x, y), facing, 0).unwrap();
}

#[test]
fn test_twelve_into_ten_armor_five_structure() {
    let (mut state, a) = two_sides(10, 10);
    let id = state.add_unit(
        ChassisBuilder::mech("Griffin", 55, 5)
            .armor(LocationKind::RightArm, 10, None)
            .build(a),
    );
    place(&mut state, id, 4, 4, Facing::NORTH);
    state
        .unit_mut(id)
        .unwrap()
        .location_mut(LocationKind::RightArm)
        .unwrap()
        .internal = 5;
    // Critical chance roll of 2: no critical
    state.dice.script(&[1, 1]);

    let out = apply_damage(
        &mut state,
        DamageRequest::at(id, LocationKind::RightArm, 12, DamageClass::Energy),
    )
    .unwrap();

    let arm = state.unit(id).unwrap().location(LocationKind::RightArm).unwrap();
    assert_eq!(arm.armor, 0);
    assert_eq!(arm.internal, 3);
    assert!(!arm.destroyed);
    assert_eq!(out.crit_rolls, 1);
    assert_eq!(out.damage_dealt(id), 12);
    assert!(out.is_balanced());
}

#[test]
fn test_vital_location_destroys_the_unit_and_transfers_excess() {
    let (mut state, a) = two_sides(10, 10);
    let id = state.add_unit(
        ChassisBuilder::vehicle("Pegasus", 35, 8, MovementMode::Wheeled)
            .armor(LocationKind::Right, 0, None)
            .build(a),
    );
    place(&mut state, id, 5, 5, Facing::NORTH);
    state
        .unit_mut(id)
        .unwrap()
        .location_mut(LocationKind::Right)
        .unwrap()
        .internal = 2;
    state.dice.script(&[1, 1]);

    let out = apply_damage(
        &mut state,
        DamageRequest::at(id, LocationKind::Right, 5, DamageClass::Ballistic),
    )
    .unwrap();

    let unit = state.unit(id).unwrap();
    assert!(unit.destroyed);
    assert!(unit.location(LocationKind::Right).unwrap().destroyed);
    assert_eq!(out.steps[0].structure_lost, 2);
    assert_eq!(out.steps[0].transferred, 3);
    assert_eq!(out.steps[1].incoming, 3);
    assert_eq!(out.destroyed, vec![id]);
    assert!(state.graveyard.contains(&id));
    assert!(out.is_balanced());
}

#[test]
fn test_destruction_is_monotonic() {
    let (mut state, a) = two_sides(10, 10);
    let id = state.add_unit(
        ChassisBuilder::vehicle("Pegasus", 35, 8, MovementMode::Wheeled)
            .armor(LocationKind::Right, 0, None)
            .build(a),
    );
    place(&mut state, id, 5, 5, Facing::NORTH);
    state
        .unit_mut(id)
        .unwrap()
        .location_mut(LocationKind::Right)
        .unwrap()
        .internal = 2;
    state.dice.script(&[1, 1]);
    apply_damage(
        &mut state,
        DamageRequest::at(id, LocationKind::Right, 5, DamageClass::Ballistic),
    )
    .unwrap();
    assert!(state.unit(id).unwrap().destroyed);

    // More damage neither revives it nor buries it twice
    let _ = apply_damage(
        &mut state,
        DamageRequest::at(id, LocationKind::Front, 5, DamageClass::Ballistic),
    );
    assert!(state.unit(id).unwrap().destroyed);
    assert_eq!(state.graveyard.iter().filter(|&&g| g == id).count(), 1);
}

#[test]
fn test_three_teams_weighted_two_one_one() {
    let mut state = GameState::new(Board::new(20, 20), GameOptions::default());
    let a = state.add_player("Alpha", TeamId(1));
    let b = state.add_player("Bravo", TeamId(2));
    let c = state.add_player("Charlie", TeamId(3));
    for (x, owner) in [(0, a), (2, a), (6, b), (10, c)] {
        let id = state.add_unit(ChassisBuilder::mech("Commando", 25, 6).build(owner));
        place(&mut state, id, x, 0, Facing::SOUTH);
    }
    // Alpha rolls lowest and moves first, Charlie highest
    state.dice.script(&[1, 1, 3, 3, 6, 6]);
    roll_initiative(&mut state);

    let turns = build_turns(&state, Phase::Movement);
    let order: Vec<_> = turns.iter().map(|t| t.player).collect();
    assert_eq!(order, vec![a, b, c, a]);
}

#[test]
fn test_turn_queue_has_one_turn_per_eligible_unit() {
    let (mut state, a) = two_sides(20, 20);
    let b = state.players[1].id;
    for x in 0..3 {
        let id = state.add_unit(ChassisBuilder::mech("Locust", 20, 8).build(a));
        place(&mut state, id, x * 2, 0, Facing::SOUTH);
    }
    for x in 0..2 {
        let id = state.add_unit(ChassisBuilder::mech("Atlas", 100, 3).build(b));
        place(&mut state, id, x * 2, 10, Facing::NORTH);
    }
    // An undeployed unit takes no movement turn
    state.add_unit(ChassisBuilder::mech("Reserve", 20, 8).build(b));
    state.dice.script(&[2, 2, 5, 5]);
    roll_initiative(&mut state);

    assert_eq!(build_turns(&state, Phase::Movement).len(), 5);
}

#[test]
fn test_impossible_displacement_destroys_and_reports() {
    let (mut state, a) = two_sides(3, 3);
    let id = state.add_unit(ChassisBuilder::mech("Wasp", 20, 6).build(a));
    place(&mut state, id, 0, 0, Facing::SOUTH);

    let out = hazards::resolve(
        &mut state,
        [HazardEvent::Displacement {
            unit: id,
            direction: Facing::NORTH,
            reason: "pushed off the map".into(),
        }],
    )
    .unwrap();

    assert_eq!(out.impossible, vec![id]);
    assert!(state.unit(id).unwrap().destroyed);
    assert!(state.reports.contains("impossible displacement"));
    assert!(state.graveyard.contains(&id));
}
