// ABOUTME: Tests for the NDJSON deployment audit log.
// ABOUTME: Append-only growth, descending order, filters, and pagination.

use reflow::audit::{self, DeploymentEvent, EventType, HistoryQuery, Outcome};
use reflow::config::deployments_log_path;
use reflow::types::Environment;

fn event(event_type: EventType, env: Environment, outcome: Outcome) -> DeploymentEvent {
    DeploymentEvent::new(
        event_type,
        "myblog",
        env,
        "abc1234def5678abc1234def5678abc1234def56",
        outcome,
    )
}

/// Test: every record call grows the log by exactly one line.
#[test]
fn record_appends_one_line_per_event() {
    let dir = tempfile::tempdir().unwrap();

    audit::record(
        dir.path(),
        "myblog",
        &event(EventType::Deploy, Environment::Staging, Outcome::Started),
    );
    audit::record(
        dir.path(),
        "myblog",
        &event(EventType::Deploy, Environment::Staging, Outcome::Success).with_duration_ms(1234),
    );

    let raw = std::fs::read_to_string(deployments_log_path(dir.path(), "myblog")).unwrap();
    assert_eq!(raw.lines().count(), 2);
    assert!(raw.ends_with('\n'), "every line is newline-terminated");
}

/// Test: serialized lines carry the contract field names.
#[test]
fn event_json_uses_contract_field_names() {
    let line = serde_json::to_string(
        &event(EventType::Approve, Environment::Production, Outcome::Failure)
            .with_error("health check timed out")
            .with_duration_ms(61000)
            .with_trigger("cli"),
    )
    .unwrap();

    assert!(line.contains("\"eventType\":\"approve\""));
    assert!(line.contains("\"projectName\":\"myblog\""));
    assert!(line.contains("\"environment\":\"production\""));
    assert!(line.contains("\"commitSHA\""));
    assert!(line.contains("\"outcome\":\"failure\""));
    assert!(line.contains("\"errorMessage\":\"health check timed out\""));
    assert!(line.contains("\"durationMs\":61000"));
    assert!(line.contains("\"triggeredBy\":\"cli\""));
}

/// Test: history is sorted descending by timestamp.
#[test]
fn history_is_newest_first() {
    let dir = tempfile::tempdir().unwrap();

    let mut first = event(EventType::Deploy, Environment::Staging, Outcome::Started);
    first.timestamp = "2026-01-01T10:00:00Z".parse().unwrap();
    let mut second = event(EventType::Deploy, Environment::Staging, Outcome::Success);
    second.timestamp = "2026-01-02T10:00:00Z".parse().unwrap();

    audit::record(dir.path(), "myblog", &first);
    audit::record(dir.path(), "myblog", &second);

    let events = audit::history(dir.path(), "myblog", &HistoryQuery::default()).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].outcome, Outcome::Success);
    assert_eq!(events[1].outcome, Outcome::Started);
}

/// Test: environment and outcome filters compose.
#[test]
fn history_filters_by_env_and_outcome() {
    let dir = tempfile::tempdir().unwrap();

    audit::record(
        dir.path(),
        "myblog",
        &event(EventType::Deploy, Environment::Staging, Outcome::Success),
    );
    audit::record(
        dir.path(),
        "myblog",
        &event(EventType::Approve, Environment::Production, Outcome::Failure),
    );
    audit::record(
        dir.path(),
        "myblog",
        &event(EventType::Approve, Environment::Production, Outcome::Success),
    );

    let query = HistoryQuery {
        environment: Some(Environment::Production),
        outcome: Some(Outcome::Success),
        ..Default::default()
    };
    let events = audit::history(dir.path(), "myblog", &query).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Approve);
}

/// Test: limit and offset paginate the filtered set.
#[test]
fn history_paginates() {
    let dir = tempfile::tempdir().unwrap();

    for hour in 0..5 {
        let mut e = event(EventType::Deploy, Environment::Staging, Outcome::Success);
        e.timestamp = format!("2026-01-01T{:02}:00:00Z", 10 + hour).parse().unwrap();
        audit::record(dir.path(), "myblog", &e);
    }

    let query = HistoryQuery {
        limit: Some(2),
        offset: Some(1),
        ..Default::default()
    };
    let events = audit::history(dir.path(), "myblog", &query).unwrap();
    assert_eq!(events.len(), 2);
    // Newest first, so offset 1 skips the 14:00 event.
    assert_eq!(
        events[0].timestamp,
        "2026-01-01T13:00:00Z".parse::<chrono::DateTime<chrono::Utc>>().unwrap()
    );
}

/// Test: a malformed line is skipped, not fatal.
#[test]
fn malformed_lines_are_skipped() {
    let dir = tempfile::tempdir().unwrap();

    audit::record(
        dir.path(),
        "myblog",
        &event(EventType::Deploy, Environment::Staging, Outcome::Success),
    );
    let path = deployments_log_path(dir.path(), "myblog");
    let mut raw = std::fs::read_to_string(&path).unwrap();
    raw.push_str("this is not json\n");
    std::fs::write(&path, raw).unwrap();

    let events = audit::history(dir.path(), "myblog", &HistoryQuery::default()).unwrap();
    assert_eq!(events.len(), 1);
}

/// Test: a project with no log yet has empty history.
#[test]
fn missing_log_is_empty_history() {
    let dir = tempfile::tempdir().unwrap();
    let events = audit::history(dir.path(), "ghost", &HistoryQuery::default()).unwrap();
    assert!(events.is_empty());
}
