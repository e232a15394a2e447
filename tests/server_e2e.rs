//! Pump and bot connections over a loaded scenario

use skirmish_core::game::{Engine, Outbound, Phase, RandomController};
use skirmish_core::loader::ScenarioLoader;
use skirmish_core::server::{run_bot, spawn, Inbound, PumpConfig};
use std::time::Duration;

fn engine(max_rounds: u32) -> Engine {
    let json = include_str!("scenarios/duel.json");
    let mut state = ScenarioLoader::parse(json).unwrap().build().unwrap();
    state.options.max_rounds = Some(max_rounds);
    state.logger.enable_capture();
    let mut engine = Engine::new(state);
    engine.start().unwrap();
    engine
}

#[tokio::test]
async fn test_bots_play_a_served_scenario_to_the_end() {
    let engine = engine(3);
    let players: Vec<_> = engine.state.players.iter().map(|p| p.id).collect();
    let (handle, pump) = spawn(engine, PumpConfig::default());
    let mut events = handle.subscribe();

    let bots: Vec<_> = players
        .iter()
        .map(|&p| tokio::spawn(run_bot(handle.clone(), RandomController::with_seed(p, 3))))
        .collect();
    for bot in bots {
        tokio::time::timeout(Duration::from_secs(30), bot)
            .await
            .expect("bot did not finish")
            .unwrap()
            .unwrap();
    }
    handle.shutdown().unwrap();
    pump.await.unwrap().unwrap();

    let mut saw_game_over = false;
    let mut saw_movement = false;
    while let Ok(event) = events.try_recv() {
        match event {
            Outbound::GameOver(_) => saw_game_over = true,
            Outbound::PhaseChanged {
                phase: Phase::Movement,
                ..
            } => saw_movement = true,
            _ => {}
        }
    }
    assert!(saw_game_over);
    assert!(saw_movement);
    assert!(handle.engine().lock().await.is_over());
}

#[tokio::test]
async fn test_disconnected_seat_does_not_stall_the_game() {
    let engine = engine(2);
    let alpha = engine.state.players[0].id;
    let bravo = engine.state.players[1].id;
    let (handle, pump) = spawn(engine, PumpConfig::default());

    handle.send(Inbound::Disconnect(bravo)).unwrap();
    let bot = tokio::spawn(run_bot(handle.clone(), RandomController::with_seed(alpha, 9)));
    tokio::time::timeout(Duration::from_secs(30), bot)
        .await
        .expect("lone bot did not finish")
        .unwrap()
        .unwrap();
    handle.shutdown().unwrap();
    pump.await.unwrap().unwrap();

    let engine = handle.engine();
    let engine = engine.lock().await;
    assert!(engine.is_over());
    assert!(engine.state.players[1].ghost);
}
