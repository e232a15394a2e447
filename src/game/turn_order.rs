//! Initiative and turn-order generation
//!
//! At phase entry the engine asks [`build_turns`] for the phase's queue. The
//! queue interleaves the initiative entries (teams, or players under
//! individual initiative) by smooth weighted round-robin, so a side with twice
//! as many units moves twice as often without ever taking two turns in a row
//! while the other side still has turns left.

use crate::core::{PlayerId, Unit, UnitClass};
use crate::game::report::Subject;
use crate::game::turn::{ClassMask, TurnBinding, TurnDescriptor};
use crate::game::{GameState, Phase};
use smallvec::SmallVec;

/// Smooth weighted round-robin over `weights`
///
/// Returns one index per unit of weight. Each step every entry with turns
/// left gains its weight; the richest entry is picked (ties to the lowest
/// index) and pays back the sum of the active weights. With `no_repeat`, the
/// previous pick sits out while another entry is still active.
pub fn interleave(weights: &[usize], no_repeat: bool) -> Vec<usize> {
    let mut remaining: Vec<usize> = weights.to_vec();
    let mut current: Vec<i64> = vec![0; weights.len()];
    let total: usize = weights.iter().sum();
    let mut order = Vec::with_capacity(total);
    let mut last: Option<usize> = None;

    while order.len() < total {
        let active: SmallVec<[usize; 8]> = (0..weights.len()).filter(|&i| remaining[i] > 0).collect();
        let active_weight: i64 = active.iter().map(|&i| weights[i] as i64).sum();
        for &i in &active {
            current[i] += weights[i] as i64;
        }
        let mut pick: Option<usize> = None;
        for &i in &active {
            if no_repeat && active.len() > 1 && Some(i) == last {
                continue;
            }
            match pick {
                Some(p) if current[p] >= current[i] => {}
                _ => pick = Some(i),
            }
        }
        let Some(pick) = pick else {
            break;
        };
        current[pick] -= active_weight;
        remaining[pick] -= 1;
        last = Some(pick);
        order.push(pick);
    }
    order
}

/// May `unit` act in `phase`
pub fn is_eligible(state: &GameState, phase: Phase, unit: &Unit) -> bool {
    match phase {
        Phase::Deployment => {
            unit.is_alive()
                && !unit.deployed
                && !unit.offboard
                && !unit.is_carried()
                && unit.deploy_round <= state.round
        }
        Phase::Movement => unit.can_act() && !unit.offboard && !unit.round.done,
        Phase::Targeting => {
            unit.can_act() && !unit.offboard && !unit.round.done && unit.has_artillery()
        }
        Phase::Offboard => unit.can_act() && unit.offboard && !unit.round.done && unit.has_artillery(),
        Phase::Firing => {
            unit.can_act()
                && !unit.offboard
                && !unit.round.done
                && unit.ready_weapons().iter().any(|&i| {
                    unit.equipment[i]
                        .weapon()
                        .is_some_and(|w| !w.is_artillery())
                })
        }
        Phase::Physical => {
            matches!(unit.class, UnitClass::Mech | UnitClass::ProtoMech)
                && unit.can_act()
                && !unit.prone
                && !unit.round.done
                && has_adjacent_enemy(state, unit)
        }
        _ => false,
    }
}

fn has_adjacent_enemy(state: &GameState, unit: &Unit) -> bool {
    let Some(pos) = unit.position else {
        return false;
    };
    let team = state.team_of(unit.owner);
    state.units.values().any(|other| {
        other.is_active()
            && !other.is_carried()
            && state.team_of(other.owner) != team
            && other.position.is_some_and(|p| p.is_adjacent(pos) || p == pos)
    })
}

/// Roll initiative for every entry and store the order, lowest first
///
/// Each entry rolls 2d6 plus its bonus (a team uses its best member's
/// bonus). Entries whose whole roll history ties reroll together, up to
/// `initiative_rerolls_max` times; a remaining tie falls back to id order.
pub fn roll_initiative(state: &mut GameState) {
    struct Entry {
        key: u32,
        members: Vec<PlayerId>,
        bonus: i32,
        rolls: Vec<i32>,
    }

    let mut entries: Vec<Entry> = if state.options.individual_initiative {
        state
            .players
            .iter()
            .map(|p| Entry {
                key: p.id.as_u32(),
                members: vec![p.id],
                bonus: p.initiative_bonus,
                rolls: Vec::new(),
            })
            .collect()
    } else {
        state
            .teams
            .iter()
            .map(|t| Entry {
                key: t.id.0,
                members: t.members.clone(),
                bonus: t
                    .members
                    .iter()
                    .filter_map(|&m| state.player(m).ok())
                    .map(|p| p.initiative_bonus)
                    .max()
                    .unwrap_or(0),
                rolls: Vec::new(),
            })
            .collect()
    };

    for entry in entries.iter_mut() {
        let roll = state.dice.roll_2d6();
        entry.rolls.push(roll.total() as i32 + entry.bonus);
    }

    for _ in 0..state.options.initiative_rerolls_max {
        let tied: Vec<usize> = (0..entries.len())
            .filter(|&i| {
                entries
                    .iter()
                    .enumerate()
                    .any(|(j, other)| j != i && other.rolls == entries[i].rolls)
            })
            .collect();
        if tied.is_empty() {
            break;
        }
        for i in tied {
            let roll = state.dice.roll_2d6();
            let bonus = entries[i].bonus;
            entries[i].rolls.push(roll.total() as i32 + bonus);
        }
    }

    entries.sort_by(|a, b| a.rolls.cmp(&b.rolls).then(a.key.cmp(&b.key)));

    for entry in &entries {
        let label = if state.options.individual_initiative {
            state
                .player(entry.members[0])
                .map(|p| p.name.to_string())
                .unwrap_or_default()
        } else {
            format!("Team {}", entry.key)
        };
        let rolls: Vec<String> = entry.rolls.iter().map(|r| r.to_string()).collect();
        state.report(
            Subject::public(),
            format!("{} rolls initiative {}", label, rolls.join(" / ")),
        );
        if !state.options.individual_initiative {
            if let Some(team) = state.teams.iter_mut().find(|t| t.id.0 == entry.key) {
                team.initiative.rolls = entry.rolls.clone();
            }
        }
    }

    state.initiative_order = entries.into_iter().map(|e| e.members).collect();
}

/// Turns a player gets in a unit phase, split into normal and even turns
fn player_turns(
    state: &GameState,
    phase: Phase,
    player: PlayerId,
) -> (Vec<TurnDescriptor>, Vec<TurnDescriptor>) {
    let mut eligible: SmallVec<[&Unit; 16]> = state
        .units
        .values()
        .filter(|u| u.owner == player && is_eligible(state, phase, u))
        .collect();
    eligible.sort_by_key(|u| u.id);

    if phase != Phase::Movement {
        let turns = eligible
            .iter()
            .map(|_| TurnDescriptor::classes(player, ClassMask::ALL))
            .collect();
        return (turns, Vec::new());
    }

    let options = &state.options;
    let mut normal_mask = ClassMask::ALL;
    for class in UnitClass::ALL {
        if options.group_size(class).is_some() || options.is_even_mover(class) {
            normal_mask = normal_mask.without(class);
        }
    }

    let mut normal = Vec::new();
    let mut even = Vec::new();
    for class in UnitClass::ALL {
        let count = eligible.iter().filter(|u| u.class == class).count();
        if count == 0 {
            continue;
        }
        let turn = if normal_mask.contains(class) {
            TurnDescriptor::classes(player, normal_mask)
        } else {
            TurnDescriptor::classes(player, ClassMask::single(class))
        };
        if options.is_even_mover(class) {
            even.extend(std::iter::repeat(turn).take(count));
        } else if let Some(size) = options.group_size(class) {
            normal.extend(std::iter::repeat(turn).take(count.div_ceil(size as usize)));
        } else {
            normal.extend(std::iter::repeat(turn).take(count));
        }
    }
    (normal, even)
}

/// Interleave turn lists by weighted round-robin, consuming each list in order
fn merge(lists: Vec<Vec<TurnDescriptor>>, no_repeat: bool) -> Vec<TurnDescriptor> {
    let weights: Vec<usize> = lists.iter().map(Vec::len).collect();
    let mut cursors = vec![0usize; lists.len()];
    interleave(&weights, no_repeat)
        .into_iter()
        .map(|i| {
            let turn = lists[i][cursors[i]];
            cursors[i] += 1;
            turn
        })
        .collect()
}

/// Build the turn queue for `phase`
pub fn build_turns(state: &GameState, phase: Phase) -> Vec<TurnDescriptor> {
    match phase {
        Phase::DeployMinefields => {
            let mut players: Vec<_> = state.players.iter().filter(|p| !p.ghost).collect();
            players.sort_by_key(|p| p.id);
            let weights: Vec<usize> = players.iter().map(|p| p.mines.total() as usize).collect();
            interleave(&weights, true)
                .into_iter()
                .map(|i| TurnDescriptor::player(players[i].id))
                .collect()
        }
        Phase::SetArtilleryTargets => {
            let mut players: Vec<_> = state
                .players
                .iter()
                .filter(|p| state.player_has_phase_action(p))
                .map(|p| p.id)
                .collect();
            players.sort();
            players.into_iter().map(TurnDescriptor::player).collect()
        }
        Phase::Deployment
        | Phase::Targeting
        | Phase::Movement
        | Phase::Offboard
        | Phase::Firing
        | Phase::Physical => {
            let mut order: Vec<&Vec<PlayerId>> = state.initiative_order.iter().collect();
            if order.is_empty() {
                return Vec::new();
            }
            if !phase.lowest_initiative_first() {
                order.reverse();
            }
            let mut normal_lists = Vec::with_capacity(order.len());
            let mut even_lists = Vec::with_capacity(order.len());
            for members in order {
                let mut normal = Vec::new();
                let mut even = Vec::new();
                for &player in members {
                    let (n, e) = player_turns(state, phase, player);
                    normal.push(n);
                    even.push(e);
                }
                normal_lists.push(merge(normal, false));
                even_lists.push(merge(even, false));
            }
            let mut turns = merge(normal_lists, true);
            turns.extend(merge(even_lists, false));
            turns
        }
        _ => Vec::new(),
    }
}

/// Multi-turns to insert after a grouped unit moved on a normal group turn
///
/// Call after the unit was marked done. Bounded by the group size and by the
/// player's remaining eligible units of the class.
pub fn group_followups(state: &GameState, turn: &TurnDescriptor, mover: &Unit) -> Vec<TurnDescriptor> {
    if state.phase != Phase::Movement || turn.multi_turn {
        return Vec::new();
    }
    let Some(size) = state.options.group_size(mover.class) else {
        return Vec::new();
    };
    let single = ClassMask::single(mover.class);
    if turn.binding != TurnBinding::Classes(single) {
        return Vec::new();
    }
    let remaining = state
        .units
        .values()
        .filter(|u| {
            u.owner == turn.player && u.class == mover.class && is_eligible(state, Phase::Movement, u)
        })
        .count();
    let count = remaining.min(size as usize - 1);
    (0..count)
        .map(|_| TurnDescriptor {
            multi_turn: true,
            ..TurnDescriptor::classes(turn.player, single)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChassisBuilder, MovementMode, TeamId};
    use crate::game::options::GroupMovement;
    use crate::game::GameOptions;
    use crate::map::{Board, HexCoord};

    fn deployed(state: &mut GameState, unit: Unit, x: i32) {
        let id = state.add_unit(unit);
        let u = state.unit_mut(id).unwrap();
        u.deployed = true;
        u.position = Some(HexCoord::new(x, 0));
    }

    #[test]
    fn test_interleave_weighted_no_repeat() {
        assert_eq!(interleave(&[2, 1, 1], true), vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_interleave_never_repeats_while_others_remain() {
        let order = interleave(&[5, 2], true);
        assert_eq!(order.len(), 7);
        // Team 1 is exhausted after its second turn; only then may team 0 repeat
        let last_one = order.iter().rposition(|&i| i == 1).unwrap();
        for pair in order[..=last_one].windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_interleave_skips_empty_entries() {
        assert_eq!(interleave(&[0, 2, 0], true), vec![1, 1]);
        assert!(interleave(&[], true).is_empty());
    }

    #[test]
    fn test_interleave_without_no_repeat_is_proportional() {
        let order = interleave(&[3, 1], false);
        assert_eq!(order.iter().filter(|&&i| i == 0).count(), 3);
        assert_eq!(order.len(), 4);
    }

    fn state_with_teams(options: GameOptions) -> (GameState, PlayerId, PlayerId) {
        let mut state = GameState::new(Board::new(20, 20), options);
        let a = state.add_player("A", TeamId(1));
        let b = state.add_player("B", TeamId(2));
        (state, a, b)
    }

    #[test]
    fn test_movement_turn_count_matches_eligible_units() {
        let (mut state, a, b) = state_with_teams(GameOptions::default());
        for x in 0..3 {
            deployed(&mut state, ChassisBuilder::mech("Locust", 20, 8).build(a), x);
        }
        deployed(&mut state, ChassisBuilder::mech("Atlas", 100, 3).build(b), 10);
        state.dice.script(&[1, 1, 6, 6]);
        roll_initiative(&mut state);
        let turns = build_turns(&state, Phase::Movement);
        assert_eq!(turns.len(), 4);
        // Team 1 rolled low, so it moves first
        assert_eq!(turns[0].player, a);
        assert_eq!(turns[1].player, b);
    }

    #[test]
    fn test_firing_reverses_initiative() {
        let (mut state, a, b) = state_with_teams(GameOptions::default());
        deployed(
            &mut state,
            ChassisBuilder::mech("Hunchback", 50, 4)
                .weapon("AC/20", crate::core::LocationKind::RightTorso)
                .build(a),
            0,
        );
        deployed(
            &mut state,
            ChassisBuilder::mech("Centurion", 50, 4)
                .weapon("Medium Laser", crate::core::LocationKind::LeftArm)
                .build(b),
            5,
        );
        state.dice.script(&[1, 1, 6, 6]);
        roll_initiative(&mut state);
        let turns = build_turns(&state, Phase::Firing);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].player, b);
    }

    #[test]
    fn test_initiative_ties_reroll() {
        let (mut state, a, b) = state_with_teams(GameOptions::default());
        state.dice.script(&[3, 4, 4, 3, 6, 6, 1, 1]);
        roll_initiative(&mut state);
        assert_eq!(state.initiative_order, vec![vec![b], vec![a]]);
        assert_eq!(state.teams[0].initiative.rolls, vec![7, 12]);
    }

    #[test]
    fn test_exhausted_rerolls_fall_back_to_id() {
        let options = GameOptions {
            initiative_rerolls_max: 0,
            ..Default::default()
        };
        let (mut state, a, b) = state_with_teams(options);
        state.dice.script(&[2, 2, 2, 2]);
        roll_initiative(&mut state);
        assert_eq!(state.initiative_order, vec![vec![a], vec![b]]);
    }

    #[test]
    fn test_group_movement_turns_and_followups() {
        let options = GameOptions {
            group_movement: vec![GroupMovement {
                class: UnitClass::Infantry,
                size: 3,
            }],
            ..Default::default()
        };
        let (mut state, a, b) = state_with_teams(options);
        for x in 0..4 {
            deployed(&mut state, ChassisBuilder::infantry("Rifles", 28, 1).build(a), x);
        }
        deployed(
            &mut state,
            ChassisBuilder::vehicle("Scorpion", 25, 4, MovementMode::Tracked).build(b),
            9,
        );
        state.dice.script(&[1, 1, 6, 6]);
        roll_initiative(&mut state);
        state.phase = Phase::Movement;
        let turns = build_turns(&state, Phase::Movement);
        let a_turns: Vec<_> = turns.iter().filter(|t| t.player == a).collect();
        assert_eq!(a_turns.len(), 2);
        assert_eq!(
            a_turns[0].binding,
            TurnBinding::Classes(ClassMask::single(UnitClass::Infantry))
        );

        let mover = state.units.ids_sorted()[0];
        state.unit_mut(mover).unwrap().round.done = true;
        let unit = state.unit(mover).unwrap().clone();
        let extra = group_followups(&state, a_turns[0], &unit);
        assert_eq!(extra.len(), 2);
        assert!(extra.iter().all(|t| t.multi_turn));
        assert!(group_followups(&state, &extra[0], &unit).is_empty());
    }

    #[test]
    fn test_even_movers_go_last() {
        let options = GameOptions {
            even_movers: vec![UnitClass::Infantry],
            ..Default::default()
        };
        let (mut state, a, b) = state_with_teams(options);
        deployed(&mut state, ChassisBuilder::infantry("Rifles", 28, 1).build(a), 0);
        deployed(&mut state, ChassisBuilder::mech("Wasp", 20, 6).build(a), 1);
        deployed(&mut state, ChassisBuilder::mech("Stinger", 20, 6).build(b), 2);
        state.dice.script(&[1, 1, 6, 6]);
        roll_initiative(&mut state);
        let turns = build_turns(&state, Phase::Movement);
        assert_eq!(turns.len(), 3);
        assert_eq!(
            turns[2].binding,
            TurnBinding::Classes(ClassMask::single(UnitClass::Infantry))
        );
        assert!(!ClassMask::ALL
            .without(UnitClass::Infantry)
            .contains(UnitClass::Infantry));
    }

    #[test]
    fn test_team_without_units_gets_no_turns() {
        let (mut state, a, _) = state_with_teams(GameOptions::default());
        deployed(&mut state, ChassisBuilder::mech("Wasp", 20, 6).build(a), 1);
        roll_initiative(&mut state);
        let turns = build_turns(&state, Phase::Movement);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].player, a);
    }

    #[test]
    fn test_minefield_turns_follow_allotments() {
        let (mut state, a, b) = state_with_teams(GameOptions::default());
        state.player_mut(a).unwrap().mines.conventional = 2;
        state.player_mut(b).unwrap().mines.vibrabomb = 1;
        let turns = build_turns(&state, Phase::DeployMinefields);
        let players: Vec<_> = turns.iter().map(|t| t.player).collect();
        assert_eq!(players, vec![a, b, a]);
    }
}
