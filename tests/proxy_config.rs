// ABOUTME: Tests for proxy site config rendering and file placement.
// ABOUTME: Mirrors the first-deployment scenario: one upstream, one server block.

use reflow::proxy;
use reflow::types::{Environment, ProjectName, Slot};

/// Test: the rendered fragment for a first staging deployment.
#[test]
fn first_deployment_site_config() {
    let project = ProjectName::new("myblog").unwrap();
    let conf = proxy::render_site_config(
        &project,
        Environment::Staging,
        Slot::B,
        "myblog-staging-B-abc1234",
        "myblog-staging.example.com",
        3000,
    )
    .unwrap();

    assert!(conf.contains("server myblog-staging-B-abc1234:3000;"));
    assert!(conf.contains("listen 80;"));
    assert!(conf.contains("server_name myblog-staging.example.com;"));
    assert!(conf.contains("proxy_set_header Connection 'upgrade';"));
}

/// Test: staging and production configs land in distinct files, so a staging
/// container can never be referenced by a production proxy file.
#[test]
fn environments_write_distinct_files() {
    let dir = tempfile::tempdir().unwrap();
    let project = ProjectName::new("myblog").unwrap();

    let staging = proxy::render_site_config(
        &project,
        Environment::Staging,
        Slot::B,
        "myblog-staging-B-abc1234",
        "staging.example.com",
        3000,
    )
    .unwrap();
    let production = proxy::render_site_config(
        &project,
        Environment::Production,
        Slot::B,
        "myblog-production-B-def5678",
        "example.com",
        3000,
    )
    .unwrap();

    proxy::write_site_config(dir.path(), &project, Environment::Staging, &staging).unwrap();
    proxy::write_site_config(dir.path(), &project, Environment::Production, &production).unwrap();

    let staging_file = std::fs::read_to_string(
        dir.path().join("proxy/conf.d/myblog.staging.conf"),
    )
    .unwrap();
    let production_file = std::fs::read_to_string(
        dir.path().join("proxy/conf.d/myblog.production.conf"),
    )
    .unwrap();

    assert!(staging_file.contains("myblog-staging-B-abc1234"));
    assert!(!staging_file.contains("myblog-production"));
    assert!(production_file.contains("myblog-production-B-def5678"));
    assert!(!production_file.contains("myblog-staging"));
}

/// Test: rewriting a site config replaces the previous upstream entirely.
#[test]
fn rewrite_replaces_previous_upstream() {
    let dir = tempfile::tempdir().unwrap();
    let project = ProjectName::new("myblog").unwrap();

    for (slot, container) in [
        (Slot::B, "myblog-staging-B-abc1234"),
        (Slot::A, "myblog-staging-A-def5678"),
    ] {
        let conf = proxy::render_site_config(
            &project,
            Environment::Staging,
            slot,
            container,
            "staging.example.com",
            3000,
        )
        .unwrap();
        proxy::write_site_config(dir.path(), &project, Environment::Staging, &conf).unwrap();
    }

    let current = std::fs::read_to_string(
        dir.path().join("proxy/conf.d/myblog.staging.conf"),
    )
    .unwrap();
    assert!(current.contains("server myblog-staging-A-def5678:3000;"));
    assert!(
        !current.contains("myblog-staging-B-abc1234"),
        "the old slot must be the only upstream no longer"
    );
}
