//! Bot-driven connections
//!
//! A bot is a [`PlayerController`] attached to the pump like any other
//! connection: it listens to the broadcast, looks at the shared engine when
//! something concerns it and answers through the work queue.

use crate::core::PlayerId;
use crate::game::controller::{available_actions, GameStateView, PlayerController};
use crate::game::{Engine, FeedbackResponse, Outbound, Phase, PlayerAction};
use crate::server::messages::Inbound;
use crate::server::pump::ServerHandle;
use crate::Result;
use tokio::sync::broadcast::error::RecvError;

/// What the bot already answered, so a burst of events yields one message
#[derive(Debug, Default)]
struct Answered {
    ready: Option<(u32, Phase)>,
    turn: Option<(u32, Phase, usize)>,
    feedback: Option<u64>,
}

/// Play `controller`'s seat until the game ends or the server stops
pub async fn run_bot<C>(handle: ServerHandle, mut controller: C) -> Result<()>
where
    C: PlayerController + Send + 'static,
{
    let player = controller.player_id();
    let mut events = handle.subscribe();
    let engine = handle.engine();
    let mut answered = Answered::default();
    handle.send(Inbound::Connect(player))?;

    // Catch up on whatever happened before we subscribed
    let mut rejected = false;
    loop {
        let message = {
            let guard = engine.lock().await;
            if guard.is_over() {
                break;
            }
            decide(&guard, &mut controller, &mut answered, rejected)
        };
        if let Some(message) = message {
            handle.send(message)?;
        }

        rejected = false;
        match events.recv().await {
            Ok(Outbound::GameOver(_)) | Err(RecvError::Closed) => break,
            Ok(Outbound::Rejected { player: p, .. }) if p == player => rejected = true,
            Ok(_) | Err(RecvError::Lagged(_)) => {}
        }
    }

    let guard = engine.lock().await;
    let won = guard
        .state
        .victory
        .as_ref()
        .and_then(|v| v.winner)
        .is_some_and(|t| t == guard.state.team_of(player));
    controller.on_game_end(&GameStateView::new(&guard.state, player), won);
    Ok(())
}

/// The message this bot owes the engine right now, if any
fn decide<C: PlayerController>(
    engine: &Engine,
    controller: &mut C,
    answered: &mut Answered,
    rejected: bool,
) -> Option<Inbound> {
    let player = controller.player_id();
    let state = &engine.state;
    let view = GameStateView::new(state, player);

    if let Some(request) = engine.awaiting() {
        if request.player != player || answered.feedback == Some(request.token) {
            return None;
        }
        answered.feedback = Some(request.token);
        let choice = controller.choose_feedback(&view, request);
        return Some(Inbound::Feedback {
            player,
            response: FeedbackResponse {
                token: request.token,
                choice,
            },
        });
    }

    let phase = engine.phase();
    if phase.waits_for_ready() {
        let done = state.player(player).map_or(true, |p| p.done);
        if done || answered.ready == Some((state.round, phase)) {
            return None;
        }
        answered.ready = Some((state.round, phase));
        return Some(action(player, PlayerAction::Done));
    }

    let turn = engine.current_turn().filter(|t| t.player == player)?;
    let key = (state.round, phase, state.turns.index());
    if answered.turn == Some(key) {
        // Our answer for this turn was refused: give the turn up
        return rejected.then(|| action(player, PlayerAction::SkipTurn { unit: None }));
    }
    answered.turn = Some(key);
    let candidates = available_actions(state, player, &turn);
    let choice = controller
        .choose_action(&view, &turn, &candidates)
        .unwrap_or(PlayerAction::SkipTurn { unit: None });
    Some(action(player, choice))
}

fn action(player: PlayerId, action: PlayerAction) -> Inbound {
    Inbound::Action { player, action }
}
