// ABOUTME: Tests for the project state store: JSON layout, defaults, round-trips.
// ABOUTME: The on-disk keys stay test/prod; absent files mean never deployed.

use reflow::config::{self, EnvironmentState, ProjectState};
use reflow::types::{CommitHash, Environment, Slot};

fn commit() -> CommitHash {
    CommitHash::new("abc1234def5678abc1234def5678abc1234def56").unwrap()
}

/// Test: loading state for a project without a state file yields empty state.
#[test]
fn absent_state_file_is_never_deployed() {
    let dir = tempfile::tempdir().unwrap();
    let state = config::load_state(dir.path(), "ghost").unwrap();

    assert!(!state.test.is_deployed());
    assert!(!state.prod.is_deployed());
    assert_eq!(state.test.active_slot, "");
    assert_eq!(state.test.active_commit, "");
}

/// Test: state survives a save/load round-trip byte-for-byte in meaning.
#[test]
fn state_round_trips() {
    let dir = tempfile::tempdir().unwrap();

    let mut state = ProjectState::default();
    state
        .env_mut(Environment::Staging)
        .record_rollout(Slot::B, &commit());

    config::save_state(dir.path(), "myblog", &state).unwrap();
    let loaded = config::load_state(dir.path(), "myblog").unwrap();

    assert_eq!(loaded, state);
    assert_eq!(loaded.test.active_slot, "B");
    assert_eq!(loaded.test.inactive_slot, "A");
    assert_eq!(
        loaded.test.active_commit,
        "abc1234def5678abc1234def5678abc1234def56"
    );
    assert_eq!(loaded.test.pending_commit, "");
    assert!(!loaded.prod.is_deployed());
}

/// Test: the serialized JSON uses the compatibility keys and field names.
#[test]
fn state_json_uses_compatibility_keys() {
    let mut state = ProjectState::default();
    state
        .env_mut(Environment::Staging)
        .record_rollout(Slot::B, &commit());

    let json = serde_json::to_string_pretty(&state).unwrap();
    assert!(json.contains("\"test\""));
    assert!(json.contains("\"prod\""));
    assert!(json.contains("\"activeSlot\": \"B\""));
    assert!(json.contains("\"inactiveSlot\": \"A\""));
    assert!(json.contains("\"pendingCommit\": \"\""));
    assert!(!json.contains("staging"), "display names must not leak into state");
}

/// Test: state files written by other tools (unknown formatting) still parse.
#[test]
fn state_parses_compact_json() {
    let dir = tempfile::tempdir().unwrap();
    let project_dir = dir.path().join("apps").join("legacy");
    std::fs::create_dir_all(&project_dir).unwrap();
    std::fs::write(
        project_dir.join("state.json"),
        r#"{"test":{"activeSlot":"A","activeCommit":"abc1234def5678abc1234def5678abc1234def56","inactiveSlot":"B","pendingCommit":""},"prod":{}}"#,
    )
    .unwrap();

    let state = config::load_state(dir.path(), "legacy").unwrap();
    assert_eq!(state.env(Environment::Staging).active_slot(), Some(Slot::A));
    assert_eq!(
        state.env(Environment::Staging).active_commit(),
        Some(commit())
    );
    assert!(!state.env(Environment::Production).is_deployed());
}

/// Test: record_rollout clears any pending commit.
#[test]
fn record_rollout_clears_pending() {
    let mut env = EnvironmentState {
        pending_commit: "abc1234def5678abc1234def5678abc1234def56".to_string(),
        ..Default::default()
    };
    env.record_rollout(Slot::B, &commit());
    assert_eq!(env.pending_commit, "");
}

/// Test: a failed rollout leaves the state file untouched on disk.
#[test]
fn state_file_unchanged_until_saved() {
    let dir = tempfile::tempdir().unwrap();

    let mut state = ProjectState::default();
    state
        .env_mut(Environment::Staging)
        .record_rollout(Slot::B, &commit());
    config::save_state(dir.path(), "myblog", &state).unwrap();

    let before = std::fs::read(
        config::project_base_path(dir.path(), "myblog").join("state.json"),
    )
    .unwrap();

    // Mutating the in-memory copy (as an aborted rollout would) must not
    // touch the file.
    let mut aborted = config::load_state(dir.path(), "myblog").unwrap();
    aborted
        .env_mut(Environment::Staging)
        .record_rollout(Slot::A, &commit());

    let after = std::fs::read(
        config::project_base_path(dir.path(), "myblog").join("state.json"),
    )
    .unwrap();
    assert_eq!(before, after, "state file must be byte-identical");
}
