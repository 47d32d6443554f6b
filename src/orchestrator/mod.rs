// ABOUTME: Deployment orchestration: the rollout state machine and its workflows.
// ABOUTME: Deploy, approve, cleanup, destroy, and start/stop compose the lower layers.

mod approve;
mod cleanup;
mod deploy;
mod destroy;
mod error;
mod lifecycle;
mod rollout;
mod state;
mod transitions;

pub use approve::approve;
pub use cleanup::{cleanup, CleanupReport};
pub use deploy::{deploy, RolloutOutcome};
pub use destroy::destroy_all;
pub use error::DeployError;
pub use lifecycle::{start_project_env, stop_project_env};
pub use rollout::Rollout;
pub use state::{Committed, HealthVerified, Launched, Prepared, TrafficShifted};
pub use transitions::TransitionResult;
