//! Deterministic state hashing for replay and snapshot checks
//!
//! The hash covers everything that affects play and skips presentation and
//! outbound plumbing, so a resumed game can be compared with an
//! uninterrupted one at any round boundary.

use crate::game::GameState;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Fields to exclude when computing the hash
///
/// - logger: presentation layer
/// - journal: deltas waiting to be broadcast
/// - reports: narration, already reflected in unit state
/// - ghost: connection status, not game state
const EXCLUDED_FIELDS: &[&str] = &["logger", "journal", "reports", "ghost"];

/// Compute a deterministic hash of game state
///
/// Serializes the state to JSON, strips the excluded fields and hashes the
/// canonical string. The entity store is keyed by id in a sorted map once in
/// `serde_json::Value` form, so iteration order never leaks into the hash.
pub fn compute_state_hash(game: &GameState) -> u64 {
    let json_value = match serde_json::to_value(game) {
        Ok(v) => v,
        Err(e) => {
            game.logger.minimal(&format!("Warning: failed to serialize game state for hashing: {}", e));
            return 0;
        }
    };
    let cleaned = strip_metadata(json_value);
    let canonical = match serde_json::to_string(&cleaned) {
        Ok(s) => s,
        Err(e) => {
            game.logger.minimal(&format!("Warning: failed to canonicalize cleaned state: {}", e));
            return 0;
        }
    };

    let mut hasher = FxHasher::default();
    canonical.hash(&mut hasher);
    hasher.finish()
}

/// Recursively strip excluded fields from a JSON value
fn strip_metadata(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(mut map) => {
            for field in EXCLUDED_FIELDS {
                map.remove(*field);
            }
            let cleaned = map.into_iter().map(|(k, v)| (k, strip_metadata(v))).collect();
            serde_json::Value::Object(cleaned)
        }
        serde_json::Value::Array(arr) => serde_json::Value::Array(arr.into_iter().map(strip_metadata).collect()),
        other => other,
    }
}

/// Format a hash for display (first 8 hex digits)
pub fn format_hash(hash: u64) -> String {
    format!("{:08x}", (hash >> 32) as u32)
}
