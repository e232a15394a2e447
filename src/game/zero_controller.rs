//! Zero controller for testing and automation
//!
//! This controller always takes the first candidate action (or skips when
//! there is none). Candidates are ordered with the most aggressive choice
//! first, so two zero controllers close in and fight to a result.

use crate::core::PlayerId;
use crate::game::actions::PlayerAction;
use crate::game::controller::{GameStateView, PlayerController};
use crate::game::snapshot::ControllerState;
use crate::game::turn::TurnDescriptor;

/// A controller that always chooses the first available action (index 0)
///
/// This is useful for:
/// - Automated testing
/// - Benchmarking the engine
/// - Ensuring games can complete deterministically
pub struct ZeroController {
    player_id: PlayerId,
}

impl ZeroController {
    pub fn new(player_id: PlayerId) -> Self {
        ZeroController { player_id }
    }
}

impl PlayerController for ZeroController {
    fn player_id(&self) -> PlayerId {
        self.player_id
    }

    fn choose_action(
        &mut self,
        _view: &GameStateView,
        _turn: &TurnDescriptor,
        available_actions: &[PlayerAction],
    ) -> Option<PlayerAction> {
        available_actions.first().cloned()
    }

    fn saved_state(&self) -> Option<ControllerState> {
        Some(ControllerState::Zero {
            player: self.player_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EntityId, Facing, TeamId};
    use crate::game::{GameOptions, GameState};
    use crate::map::{Board, HexCoord};

    #[test]
    fn test_zero_controller_chooses_first() {
        let mut game = GameState::new(Board::new(4, 4), GameOptions::default());
        let player_id = game.add_player("Alpha", TeamId(1));
        let mut controller = ZeroController::new(player_id);
        let view = GameStateView::new(&game, player_id);

        let unit = EntityId::new(1);
        let actions = vec![
            PlayerAction::Deploy {
                unit,
                hex: HexCoord::new(0, 0),
                facing: Facing::NORTH,
            },
            PlayerAction::SkipTurn { unit: Some(unit) },
        ];
        let choice = controller.choose_action(&view, &TurnDescriptor::player(player_id), &actions);
        assert_eq!(choice, Some(actions[0].clone()));
    }

    #[test]
    fn test_zero_controller_empty_actions() {
        let mut game = GameState::new(Board::new(4, 4), GameOptions::default());
        let player_id = game.add_player("Alpha", TeamId(1));
        let mut controller = ZeroController::new(player_id);
        let view = GameStateView::new(&game, player_id);
        let choice = controller.choose_action(&view, &TurnDescriptor::player(player_id), &[]);
        assert_eq!(choice, None);
    }
}
