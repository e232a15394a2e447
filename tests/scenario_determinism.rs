//! Scenario determinism tests
//!
//! Every `.json` file under `tests/scenarios/` is loaded and played twice
//! with the same seeds; the captured game logs and final state hashes must
//! match exactly. Tests are generated per file by the `dir-test` macro, so
//! adding a scenario adds a test.

use dir_test::{dir_test, Fixture};
use similar_asserts::assert_eq;
use skirmish_core::game::state_hash::{compute_state_hash, format_hash};
use skirmish_core::game::{Engine, GameEndReason, GameLoop, RandomController, VerbosityLevel, ZeroController};
use skirmish_core::game::controller::PlayerController;
use skirmish_core::loader::ScenarioLoader;

/// Play a scenario and return the captured log plus the final state hash
fn play(json: &str, seed: u64, random: bool) -> (String, String, GameEndReason) {
    let mut state = ScenarioLoader::parse(json).unwrap().build().unwrap();
    state.seed(seed);
    state.logger.enable_capture();
    let max_rounds = state.options.max_rounds.unwrap_or(10);

    let mut controllers: Vec<Box<dyn PlayerController>> = state
        .players
        .iter()
        .map(|p| -> Box<dyn PlayerController> {
            if random {
                Box::new(RandomController::with_seed(p.id, seed ^ p.id.as_u32() as u64))
            } else {
                Box::new(ZeroController::new(p.id))
            }
        })
        .collect();
    let mut seats: Vec<&mut dyn PlayerController> = controllers
        .iter_mut()
        .map(|c| -> &mut dyn PlayerController { &mut **c })
        .collect();

    let mut engine = Engine::new(state);
    let result = GameLoop::new(&mut engine)
        .with_verbosity(VerbosityLevel::Verbose)
        .with_max_rounds(max_rounds)
        .run_game(&mut seats)
        .unwrap();

    let log: Vec<String> = engine
        .state
        .logger
        .logs()
        .iter()
        .map(|e| e.message.clone())
        .collect();
    (
        log.join("\n"),
        format_hash(compute_state_hash(&engine.state)),
        result.end_reason,
    )
}

#[dir_test(
    dir: "$CARGO_MANIFEST_DIR/tests/scenarios",
    glob: "**/*.json",
)]
fn test_scenario_determinism(fixture: Fixture<&str>) {
    let json = fixture.content();
    let (log1, hash1, end1) = play(json, 42, true);
    let (log2, hash2, end2) = play(json, 42, true);

    assert!(!log1.is_empty(), "{} produced no log output", fixture.path());
    assert_eq!(log1, log2, "{} diverged with the same seed", fixture.path());
    assert_eq!(hash1, hash2);
    assert_eq!(end1, end2);
}

#[dir_test(
    dir: "$CARGO_MANIFEST_DIR/tests/scenarios",
    glob: "**/*.json",
)]
fn test_scenario_plays_with_zero_controllers(fixture: Fixture<&str>) {
    let (log, _, end) = play(fixture.content(), 7, false);
    assert!(!log.is_empty(), "{} produced no log output", fixture.path());
    assert!(matches!(
        end,
        GameEndReason::Victory(_) | GameEndReason::Draw | GameEndReason::RoundLimit
    ));
}

#[test]
fn test_different_seeds_still_finish() {
    let json = include_str!("scenarios/duel.json");
    for seed in [1, 2, 3] {
        let (log, hash, _) = play(json, seed, true);
        assert!(!log.is_empty());
        assert_eq!(hash.len(), 8, "unexpected hash format {}", hash);
    }
}
