// ABOUTME: Tests for config parsing, defaults, and effective-domain resolution.
// ABOUTME: Covers the YAML field names and the domain priority chain.

use reflow::config::{
    self, effective_domain, GlobalConfig, ProjectConfig, ProjectEnvConfig,
};
use reflow::types::Environment;
use std::collections::BTreeMap;

fn project_with_domains(staging: Option<&str>, production: Option<&str>) -> ProjectConfig {
    let mut environments = BTreeMap::new();
    environments.insert(
        "test".to_string(),
        ProjectEnvConfig {
            domain: staging.map(String::from),
            env_file: Some(".env.development".to_string()),
        },
    );
    environments.insert(
        "prod".to_string(),
        ProjectEnvConfig {
            domain: production.map(String::from),
            env_file: Some(".env.production".to_string()),
        },
    );

    ProjectConfig {
        project_name: "myblog".to_string(),
        source_repo_url: "git@example.com:me/myblog.git".to_string(),
        app_port: 3000,
        runtime_version: "18-alpine".to_string(),
        environments,
    }
}

fn global(domain: &str) -> GlobalConfig {
    GlobalConfig {
        default_domain: domain.to_string(),
        debug: false,
    }
}

/// Test: project config YAML parses with field defaults applied.
#[test]
fn project_config_parses_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let project_dir = dir.path().join("apps").join("myblog");
    std::fs::create_dir_all(&project_dir).unwrap();
    std::fs::write(
        project_dir.join("config.yaml"),
        concat!(
            "projectName: myblog\n",
            "sourceRepoURL: git@example.com:me/myblog.git\n",
            "environments:\n",
            "  test:\n",
            "    envFile: .env.development\n",
            "  prod:\n",
            "    domain: blog.example.com\n",
        ),
    )
    .unwrap();

    let cfg = config::load_project(dir.path(), "myblog").unwrap();
    assert_eq!(cfg.app_port, 3000, "appPort defaults to 3000");
    assert_eq!(cfg.runtime_version, "18-alpine");
    assert_eq!(cfg.source_repo_url, "git@example.com:me/myblog.git");
    assert_eq!(
        cfg.environment(Environment::Production).unwrap().domain,
        Some("blog.example.com".to_string())
    );
    assert_eq!(
        cfg.environment(Environment::Staging).unwrap().env_file,
        Some(".env.development".to_string())
    );
}

/// Test: loading a missing project reports ProjectNotFound.
#[test]
fn missing_project_config_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = config::load_project(dir.path(), "ghost").unwrap_err();
    assert!(matches!(err, config::ConfigError::ProjectNotFound(name) if name == "ghost"));
}

/// Test: an explicit per-environment domain wins over the computed default.
#[test]
fn explicit_domain_takes_priority() {
    let cfg = project_with_domains(Some("preview.example.com"), None);
    let domain = effective_domain(&global("example.org"), &cfg, Environment::Staging).unwrap();
    assert_eq!(domain, "preview.example.com");
}

/// Test: without an explicit domain the default is computed per environment.
#[test]
fn computed_default_domain_uses_env_name() {
    let cfg = project_with_domains(None, None);
    let staging = effective_domain(&global("example.org"), &cfg, Environment::Staging).unwrap();
    let production =
        effective_domain(&global("example.org"), &cfg, Environment::Production).unwrap();
    assert_eq!(staging, "myblog-staging.example.org");
    assert_eq!(production, "myblog-production.example.org");
}

/// Test: no explicit domain and no global default is unresolvable.
#[test]
fn missing_domains_are_unresolvable() {
    let cfg = project_with_domains(None, None);
    let err = effective_domain(&global(""), &cfg, Environment::Staging).unwrap_err();
    assert!(matches!(err, config::ConfigError::DomainUnresolved { .. }));
}

/// Test: an environment absent from the config map is an error.
#[test]
fn undefined_environment_is_an_error() {
    let cfg = ProjectConfig {
        environments: BTreeMap::new(),
        ..project_with_domains(None, None)
    };
    let err = effective_domain(&global("example.org"), &cfg, Environment::Production).unwrap_err();
    assert!(matches!(err, config::ConfigError::EnvironmentUndefined { .. }));
}

/// Test: global config save/load round-trip with cache invalidation.
#[test]
fn global_config_round_trips() {
    let dir = tempfile::tempdir().unwrap();

    config::invalidate_global_cache();
    let initial = config::load_global(dir.path()).unwrap();
    assert_eq!(initial.default_domain, "localhost");

    config::save_global(
        dir.path(),
        &GlobalConfig {
            default_domain: "example.net".to_string(),
            debug: true,
        },
    )
    .unwrap();

    // The save refreshed the cache in place.
    let cached = config::load_global(dir.path()).unwrap();
    assert_eq!(cached.default_domain, "example.net");
    assert!(cached.debug);

    // And the file itself carries the camelCase key.
    let raw = std::fs::read_to_string(dir.path().join("config.yaml")).unwrap();
    assert!(raw.contains("defaultDomain: example.net"));
    config::invalidate_global_cache();
}
