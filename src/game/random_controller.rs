//! Random bot controller for testing and baseline play
//!
//! Makes uniform random choices from the candidate actions. The RNG is
//! serializable so a snapshot can carry the controller along with the game.

use crate::core::PlayerId;
use crate::game::actions::PlayerAction;
use crate::game::controller::{GameStateView, PlayerController};
use crate::game::events::FeedbackRequest;
use crate::game::snapshot::ControllerState;
use crate::game::turn::TurnDescriptor;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// A controller that makes random choices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomController {
    player_id: PlayerId,
    rng: Xoshiro256PlusPlus,
}

impl RandomController {
    /// Create a random controller seeded from entropy
    pub fn new(player_id: PlayerId) -> Self {
        RandomController {
            player_id,
            rng: Xoshiro256PlusPlus::from_entropy(),
        }
    }

    /// Create a random controller with a seeded RNG (for deterministic testing)
    pub fn with_seed(player_id: PlayerId, seed: u64) -> Self {
        RandomController {
            player_id,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }
}

impl PlayerController for RandomController {
    fn player_id(&self) -> PlayerId {
        self.player_id
    }

    fn choose_action(
        &mut self,
        _view: &GameStateView,
        _turn: &TurnDescriptor,
        available_actions: &[PlayerAction],
    ) -> Option<PlayerAction> {
        if available_actions.is_empty() {
            None
        } else {
            let index = self.rng.gen_range(0..available_actions.len());
            Some(available_actions[index].clone())
        }
    }

    fn choose_feedback(&mut self, _view: &GameStateView, request: &FeedbackRequest) -> usize {
        match request.kind.choices() {
            0 => 0,
            n => self.rng.gen_range(0..n),
        }
    }

    fn on_game_end(&mut self, view: &GameStateView, won: bool) {
        let survivors = view.own_units().filter(|u| u.is_active()).count();
        view.logger().normal(&format!(
            "Random bot {} {} with {} unit(s) standing",
            self.player_id,
            if won { "wins" } else { "loses" },
            survivors
        ));
    }

    fn saved_state(&self) -> Option<ControllerState> {
        Some(ControllerState::Random(self.clone()))
    }
}
