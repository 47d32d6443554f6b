// ABOUTME: Tests for the slot toggle law and the naming conventions built on it.
// ABOUTME: Successful deployments to one environment must strictly alternate slots.

use reflow::config::EnvironmentState;
use reflow::orchestrator::Rollout;
use reflow::types::{CommitHash, Environment, ProjectName, Slot};

fn commit(filler: char) -> CommitHash {
    let mut hash = String::from("abc1234");
    hash.extend(std::iter::repeat(filler).take(33));
    CommitHash::new(&hash).unwrap()
}

/// Test: a never-deployed environment targets slot B.
#[test]
fn first_deployment_targets_slot_b() {
    let state = EnvironmentState::default();
    assert_eq!(Slot::next_inactive(state.active_slot()), Slot::B);
}

/// Test: the slot value strictly alternates over successive rollouts.
#[test]
fn slots_alternate_across_rollouts() {
    let mut state = EnvironmentState::default();
    let mut observed = Vec::new();

    for i in 0..5 {
        let slot = Slot::next_inactive(state.active_slot());
        observed.push(slot);
        let c = commit(char::from_digit((i % 10) as u32, 10).unwrap());
        state.record_rollout(slot, &c);
    }

    assert_eq!(
        observed,
        vec![Slot::B, Slot::A, Slot::B, Slot::A, Slot::B],
        "slot sequence must strictly alternate starting at B"
    );
}

/// Test: after each rollout the recorded active and inactive slots differ.
#[test]
fn active_and_inactive_slots_always_differ() {
    let mut state = EnvironmentState::default();
    for i in 0..4 {
        let slot = Slot::next_inactive(state.active_slot());
        state.record_rollout(slot, &commit(char::from_digit(i, 10).unwrap()));
        assert_ne!(state.active_slot, state.inactive_slot);
    }
}

/// Test: rollout accessors expose the naming conventions.
#[test]
fn rollout_naming_follows_conventions() {
    let project = ProjectName::new("myblog").unwrap();
    let c = CommitHash::new("abc1234def5678abc1234def5678abc1234def56").unwrap();

    let rollout = Rollout::new(
        std::path::PathBuf::from("/tmp/reflow"),
        project,
        reflow::config::ProjectConfig {
            project_name: "myblog".to_string(),
            source_repo_url: "git@example.com:me/myblog.git".to_string(),
            app_port: 3000,
            runtime_version: "18-alpine".to_string(),
            environments: Default::default(),
        },
        Default::default(),
        Environment::Staging,
        c,
        Slot::B,
        Vec::new(),
    );

    assert_eq!(rollout.container_name(), "myblog-staging-B-abc1234");
    assert_eq!(
        rollout.image_tag(),
        "myblog:abc1234def5678abc1234def5678abc1234def56"
    );
    assert_eq!(rollout.slot(), Slot::B);
    assert_eq!(rollout.environment(), Environment::Staging);
    assert!(rollout.new_container().is_none());
    assert!(rollout.domain().is_none());
}
