// ABOUTME: Generic rollout struct parameterized by state marker.
// ABOUTME: Uses PhantomData to track rollout progress at compile time.

use std::marker::PhantomData;
use std::path::PathBuf;

use crate::config::{ProjectConfig, ProjectState};
use crate::types::{CommitHash, ContainerId, Environment, ProjectName, Slot};

use super::state::Prepared;

/// A rollout in progress, parameterized by its current state.
///
/// The state type parameter `S` is a zero-sized marker that indicates which
/// phase the rollout is in, so an out-of-order step is a compile error. The
/// same machine drives staging deployments and production promotions; only
/// the preparation differs.
#[derive(Debug)]
pub struct Rollout<S> {
    pub(super) base: PathBuf,
    pub(super) project: ProjectName,
    pub(super) config: ProjectConfig,
    pub(super) state: ProjectState,
    pub(super) env: Environment,
    pub(super) commit: CommitHash,
    pub(super) slot: Slot,
    pub(super) env_vars: Vec<String>,
    pub(super) new_container: Option<ContainerId>,
    pub(super) domain: Option<String>,
    pub(super) _state: PhantomData<S>,
}

impl Rollout<Prepared> {
    /// Begin a rollout of `commit` into `slot` of `env`.
    ///
    /// The caller has already resolved the commit, ensured the image exists
    /// (or built it), and loaded the environment file.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        base: PathBuf,
        project: ProjectName,
        config: ProjectConfig,
        state: ProjectState,
        env: Environment,
        commit: CommitHash,
        slot: Slot,
        env_vars: Vec<String>,
    ) -> Self {
        Rollout {
            base,
            project,
            config,
            state,
            env,
            commit,
            slot,
            env_vars,
            new_container: None,
            domain: None,
            _state: PhantomData,
        }
    }
}

impl<S> Rollout<S> {
    pub fn project(&self) -> &ProjectName {
        &self.project
    }

    pub fn environment(&self) -> Environment {
        self.env
    }

    pub fn commit(&self) -> &CommitHash {
        &self.commit
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// The container id created by `launch`, if the rollout got that far.
    pub fn new_container(&self) -> Option<&ContainerId> {
        self.new_container.as_ref()
    }

    /// The domain the proxy serves this rollout on, known after the traffic
    /// switch.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// `<project>:<full-commit>`, the image tag convention.
    pub fn image_tag(&self) -> String {
        image_tag(&self.project, &self.commit)
    }

    /// `<project>-<env>-<slot>-<commit7>`, the container naming convention.
    pub fn container_name(&self) -> String {
        container_name(&self.project, self.env, self.slot, &self.commit)
    }
}

pub fn image_tag(project: &ProjectName, commit: &CommitHash) -> String {
    format!("{project}:{commit}")
}

pub fn container_name(
    project: &ProjectName,
    env: Environment,
    slot: Slot,
    commit: &CommitHash,
) -> String {
    format!("{project}-{env}-{slot}-{}", commit.short())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit() -> CommitHash {
        CommitHash::new("abc1234def5678abc1234def5678abc1234def56").unwrap()
    }

    #[test]
    fn image_tag_is_project_colon_commit() {
        let project = ProjectName::new("myblog").unwrap();
        assert_eq!(
            image_tag(&project, &commit()),
            "myblog:abc1234def5678abc1234def5678abc1234def56"
        );
    }

    #[test]
    fn container_name_uses_short_commit() {
        let project = ProjectName::new("myblog").unwrap();
        assert_eq!(
            container_name(&project, Environment::Staging, Slot::B, &commit()),
            "myblog-staging-B-abc1234"
        );
        assert_eq!(
            container_name(&project, Environment::Production, Slot::A, &commit()),
            "myblog-production-A-abc1234"
        );
    }
}
