// ABOUTME: Rollout state marker types for the type state pattern.
// ABOUTME: Transitions go forward only; rollback exists from the launched and verified states.

/// Ready to roll out: configs loaded, commit resolved, image available.
/// Available actions: `launch()`
#[derive(Debug, Clone, Default)]
pub struct Prepared;

/// New container created and started in the inactive slot.
/// Available actions: `verify_health()`, `rollback()`
#[derive(Debug, Clone, Default)]
pub struct Launched;

/// Readiness probe passed via the proxy's network path.
/// Available actions: `switch_traffic()`, `rollback()`
#[derive(Debug, Clone, Default)]
pub struct HealthVerified;

/// Proxy reloaded; live traffic now reaches the new container.
/// Available actions: `commit_state()`
#[derive(Debug, Clone, Default)]
pub struct TrafficShifted;

/// State persisted; the rollout is complete.
#[derive(Debug, Clone, Default)]
pub struct Committed;
