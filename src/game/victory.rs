//! Victory evaluation at the end of each round

use crate::core::TeamId;
use crate::game::report::Subject;
use crate::game::GameState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VictoryResult {
    pub is_over: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<TeamId>,
    #[serde(default)]
    pub is_draw: bool,
    #[serde(default)]
    pub reason: String,
}

impl VictoryResult {
    fn ongoing() -> Self {
        VictoryResult::default()
    }

    fn win(team: TeamId, reason: impl Into<String>) -> Self {
        VictoryResult {
            is_over: true,
            winner: Some(team),
            is_draw: false,
            reason: reason.into(),
        }
    }

    fn draw(reason: impl Into<String>) -> Self {
        VictoryResult {
            is_over: true,
            winner: None,
            is_draw: true,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct TeamStanding {
    units: usize,
    alive: usize,
    bv_total: u32,
    bv_alive: u32,
    commanders: usize,
    commanders_alive: usize,
}

fn standings(state: &GameState) -> Vec<(TeamId, TeamStanding)> {
    let mut out: Vec<(TeamId, TeamStanding)> = state
        .teams
        .iter()
        .map(|t| (t.id, TeamStanding::default()))
        .collect();
    for id in state.units.ids_sorted() {
        let Ok(unit) = state.units.get(id) else {
            continue;
        };
        let team = state.team_of(unit.owner);
        let Some((_, s)) = out.iter_mut().find(|(t, _)| *t == team) else {
            continue;
        };
        s.units += 1;
        s.bv_total += unit.battle_value;
        if unit.commander {
            s.commanders += 1;
        }
        if unit.is_alive() {
            s.alive += 1;
            s.bv_alive += unit.battle_value;
            if unit.commander {
                s.commanders_alive += 1;
            }
        }
    }
    out.retain(|(_, s)| s.units > 0);
    out
}

/// Decide whether the game is over
///
/// Pure apart from the report entry written when the game ends.
pub fn check_victory(state: &mut GameState) -> VictoryResult {
    let result = evaluate(state);
    if result.is_over {
        let text = match result.winner {
            Some(team) => format!("{} wins: {}", team, result.reason),
            None => format!("Draw: {}", result.reason),
        };
        state.report(Subject::public(), text);
    }
    result
}

fn evaluate(state: &GameState) -> VictoryResult {
    let teams = standings(state);
    if teams.len() < 2 {
        return VictoryResult::ongoing();
    }
    let options = &state.options.victory;

    let surviving: Vec<TeamId> = teams
        .iter()
        .filter(|(_, s)| s.alive > 0)
        .map(|(t, _)| *t)
        .collect();
    if surviving.is_empty() {
        return VictoryResult::draw("mutual destruction");
    }
    if options.last_team_standing && surviving.len() == 1 {
        return VictoryResult::win(surviving[0], "last team standing");
    }

    if options.commander_killed {
        let winners: Vec<TeamId> = teams
            .iter()
            .filter(|(t, s)| {
                s.alive > 0
                    && teams
                        .iter()
                        .filter(|(o, _)| o != t)
                        .all(|(_, o)| o.commanders > 0 && o.commanders_alive == 0)
            })
            .map(|(t, _)| *t)
            .collect();
        if winners.len() == 1 {
            return VictoryResult::win(winners[0], "enemy commanders destroyed");
        }
    }

    if let Some(percent) = options.bv_destroyed_percent {
        let winners: Vec<TeamId> = teams
            .iter()
            .filter(|(t, s)| {
                let (total, alive) = teams
                    .iter()
                    .filter(|(o, _)| o != t)
                    .fold((0u32, 0u32), |(tot, al), (_, o)| {
                        (tot + o.bv_total, al + o.bv_alive)
                    });
                s.alive > 0 && total > 0 && (total - alive) * 100 >= total * percent
            })
            .map(|(t, _)| *t)
            .collect();
        match winners.len() {
            1 => return VictoryResult::win(winners[0], format!("{}% of enemy BV destroyed", percent)),
            n if n > 1 => return VictoryResult::draw("battle value thresholds reached together"),
            _ => {}
        }
    }

    if let Some(max) = state.options.max_rounds {
        if state.round >= max {
            let best = teams.iter().map(|(_, s)| s.bv_alive).max().unwrap_or(0);
            let leaders: Vec<TeamId> = teams
                .iter()
                .filter(|(_, s)| s.bv_alive == best)
                .map(|(t, _)| *t)
                .collect();
            return if leaders.len() == 1 {
                VictoryResult::win(leaders[0], "round limit reached, most battle value left")
            } else {
                VictoryResult::draw("round limit reached")
            };
        }
    }

    VictoryResult::ongoing()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChassisBuilder, Disposition};
    use crate::game::GameOptions;
    use crate::map::Board;

    fn setup(options: GameOptions) -> (GameState, Vec<crate::core::UnitId>) {
        let mut state = GameState::new(Board::new(8, 8), options);
        let a = state.add_player("A", TeamId(1));
        let b = state.add_player("B", TeamId(2));
        let ids = vec![
            state.add_unit(ChassisBuilder::mech("Atlas", 100, 3).battle_value(1900).commander().build(a)),
            state.add_unit(ChassisBuilder::mech("Locust", 20, 8).battle_value(400).build(a)),
            state.add_unit(ChassisBuilder::mech("Marauder", 75, 4).battle_value(1500).commander().build(b)),
        ];
        (state, ids)
    }

    #[test]
    fn test_ongoing_with_two_sides() {
        let (mut state, _) = setup(GameOptions::default());
        assert!(!check_victory(&mut state).is_over);
        assert!(state.reports.is_empty());
    }

    #[test]
    fn test_last_team_standing() {
        let (mut state, ids) = setup(GameOptions::default());
        state.unit_mut(ids[2]).unwrap().destroyed = true;
        let result = check_victory(&mut state);
        assert!(result.is_over);
        assert_eq!(result.winner, Some(TeamId(1)));
        assert!(state.reports.contains("last team standing"));
    }

    #[test]
    fn test_mutual_destruction_is_draw() {
        let (mut state, ids) = setup(GameOptions::default());
        for id in ids {
            state.unit_mut(id).unwrap().disposition = Some(Disposition::Graveyard);
        }
        let result = check_victory(&mut state);
        assert!(result.is_draw);
        assert_eq!(result.winner, None);
    }

    #[test]
    fn test_commander_killed() {
        let mut options = GameOptions::default();
        options.victory.last_team_standing = false;
        options.victory.commander_killed = true;
        let (mut state, ids) = setup(options);
        state.unit_mut(ids[0]).unwrap().destroyed = true;
        assert_eq!(check_victory(&mut state).winner, Some(TeamId(2)));
    }

    #[test]
    fn test_round_limit_decided_by_battle_value() {
        let options = GameOptions {
            max_rounds: Some(3),
            ..Default::default()
        };
        let (mut state, _) = setup(options);
        state.round = 3;
        let result = check_victory(&mut state);
        assert_eq!(result.winner, Some(TeamId(1)));
    }

    #[test]
    fn test_bv_threshold() {
        let mut options = GameOptions::default();
        options.victory.bv_destroyed_percent = Some(80);
        let (mut state, ids) = setup(options);
        state.unit_mut(ids[1]).unwrap().destroyed = true;
        // Team 2 destroyed 400 of 2300 BV: not enough
        assert!(!check_victory(&mut state).is_over);
    }
}
