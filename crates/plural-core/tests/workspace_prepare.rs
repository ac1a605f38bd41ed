mod support;

use std::fs;

use plural_core::config::PluralConfig;
use plural_core::context::AppContext;
use plural_core::coordination::LockCoordinator;
use plural_core::lockfile::{Lockfile, LockfileStore};
use plural_core::manifest::Manifest;
use plural_core::manifest::context::context_path;
use plural_core::scaffold::plan::plan_path;
use plural_core::scaffold::{Plan, PlanKind};
use plural_core::types::ComponentKind;
use plural_core::workspace::{Stage, Workspace, WorkspaceError};
use tempfile::TempDir;

use support::{MemoryLedger, StaticInstallations};

fn workspace(app: &AppContext, repo: &str) -> Workspace {
    Workspace::new(
        &StaticInstallations::with_api_chart(),
        app,
        support::installation(repo),
    )
    .unwrap()
}

#[test]
fn prepare_lays_out_workspace() {
    let temp = TempDir::new().unwrap();
    let app = support::deployment_repo(temp.path());

    let root = workspace(&app, "api").prepare().unwrap();

    assert_eq!(root, temp.path().join("api"));
    assert_eq!(fs::read_to_string(root.join(".plural/ONCE")).unwrap(), "once");
    assert_eq!(fs::read_to_string(root.join(".plural/NONCE")).unwrap().len(), 32);
    assert!(plan_path(&root, PlanKind::Execution).exists());
    assert!(plan_path(&root, PlanKind::Diff).exists());

    let ignore = fs::read_to_string(root.join(".pluralignore")).unwrap();
    assert!(ignore.lines().any(|l| l == "terraform/.terraform"));

    let manifest = Manifest::read(&root.join("manifest.yaml")).unwrap();
    assert_eq!(manifest.name, "api");
    assert_eq!(manifest.provider, "aws");
    assert_eq!(manifest.charts[0].version, "0.3.1");
    assert_eq!(manifest.terraform[0].name, "aws");
}

#[test]
fn prepare_twice_rotates_nonce_only() {
    let temp = TempDir::new().unwrap();
    let app = support::deployment_repo(temp.path());
    let ws = workspace(&app, "api");

    let root = ws.prepare().unwrap();
    let first_nonce = fs::read_to_string(root.join(".plural/NONCE")).unwrap();
    let first_manifest = fs::read_to_string(root.join("manifest.yaml")).unwrap();
    let first_ignore = fs::read_to_string(root.join(".pluralignore")).unwrap();

    ws.prepare().unwrap();
    let second_nonce = fs::read_to_string(root.join(".plural/NONCE")).unwrap();

    assert_eq!(second_nonce.len(), 32);
    assert!(second_nonce.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(first_nonce, second_nonce);
    assert_eq!(fs::read_to_string(root.join(".plural/ONCE")).unwrap(), "once");
    assert_eq!(
        fs::read_to_string(root.join("manifest.yaml")).unwrap(),
        first_manifest
    );
    assert_eq!(
        fs::read_to_string(root.join(".pluralignore")).unwrap(),
        first_ignore
    );
}

#[test]
fn prepare_keeps_recorded_step_fingerprints() {
    let temp = TempDir::new().unwrap();
    let app = support::deployment_repo(temp.path());
    let ws = workspace(&app, "api");
    let root = ws.prepare().unwrap();

    let mut plan = Plan::load(&root, PlanKind::Execution).unwrap();
    let step = plan.steps.iter_mut().find(|s| s.name == "terraform").unwrap();
    step.sha = "recorded".to_string();
    plan.flush(temp.path()).unwrap();

    ws.prepare().unwrap();

    let plan = Plan::load(&root, PlanKind::Execution).unwrap();
    assert_eq!(plan.step("terraform").unwrap().sha, "recorded");
    assert_eq!(plan.step("crds").unwrap().sha, "");
}

#[test]
fn prepare_keeps_operator_edited_manifest_fields() {
    let temp = TempDir::new().unwrap();
    let app = support::deployment_repo(temp.path());
    let ws = workspace(&app, "api");
    let root = ws.prepare().unwrap();

    let path = root.join("manifest.yaml");
    let mut manifest = Manifest::read(&path).unwrap();
    manifest.wait = true;
    manifest.write(&path).unwrap();

    ws.prepare().unwrap();
    assert!(Manifest::read(&path).unwrap().wait);
}

#[test]
fn repo_root_is_discovered_through_git() {
    let temp = TempDir::new().unwrap();
    git2::Repository::init(temp.path()).unwrap();
    support::deployment_repo(temp.path());
    let app = AppContext::new(
        temp.path().to_path_buf(),
        temp.path().join(".config"),
        PluralConfig::default(),
    );

    let root = workspace(&app, "api").prepare().unwrap();

    assert_eq!(root, temp.path().canonicalize().unwrap().join("api"));
    assert!(root.join(".plural/deploy").exists());
}

#[test]
fn missing_context_fails_at_read_context() {
    let temp = TempDir::new().unwrap();
    let app = support::deployment_repo(temp.path());
    fs::remove_file(context_path(temp.path())).unwrap();

    let err = Workspace::new(
        &StaticInstallations::with_api_chart(),
        &app,
        support::installation("api"),
    )
    .unwrap_err();

    assert_eq!(err.stage, Stage::ReadContext);
    assert_eq!(err.repo, "api");
    assert_eq!(err.to_string(), "failed to read context for api");
}

#[test]
fn installation_lookup_failure_stops_first() {
    let temp = TempDir::new().unwrap();
    let app = support::deployment_repo(temp.path());
    fs::remove_file(temp.path().join("workspace.yaml")).unwrap();

    let err = Workspace::new(
        &StaticInstallations::failing(),
        &app,
        support::installation("api"),
    )
    .unwrap_err();

    assert_eq!(err.stage, Stage::ResolveInstallations);
}

#[test]
fn unknown_provider_fails_at_bootstrap() {
    let temp = TempDir::new().unwrap();
    let app = support::deployment_repo(temp.path());
    let mut project = support::project_manifest();
    project.provider = "mainframe".to_string();
    project.write(&temp.path().join("workspace.yaml")).unwrap();

    let err = Workspace::new(
        &StaticInstallations::with_api_chart(),
        &app,
        support::installation("api"),
    )
    .unwrap_err();

    assert_eq!(err.stage, Stage::BootstrapProvider);
    assert!(format!("{:#}", anyhow::Error::new(err)).contains("mainframe"));
}

#[test]
fn invalid_config_fails_at_read_config() {
    let temp = TempDir::new().unwrap();
    let config = PluralConfig {
        endpoint: Some("ftp://plural.acme.dev".to_string()),
        ..PluralConfig::default()
    };
    let app = support::deployment_repo_with(temp.path(), config);

    let err = Workspace::new(
        &StaticInstallations::with_api_chart(),
        &app,
        support::installation("api"),
    )
    .unwrap_err();

    assert_eq!(err.stage, Stage::ReadConfig);
}

fn remote_config() -> PluralConfig {
    PluralConfig {
        token: "tok".to_string(),
        ..PluralConfig::default()
    }
}

#[test]
fn prepare_with_ledger_releases_seeded_ledger() {
    let temp = TempDir::new().unwrap();
    let app = support::deployment_repo_with(temp.path(), remote_config());
    let manifest = temp.path().join("api/manifest.yaml");
    let mut local = Lockfile::new();
    local.set(ComponentKind::Helm, "api", "abc");
    LockfileStore::default().save(&manifest, &local).unwrap();

    let ledger = MemoryLedger::new();
    let coordinator = app.coordinator(Some(ledger.boxed()));
    let root = workspace(&app, "api").prepare_with_ledger(&coordinator).unwrap();

    assert!(root.join(".plural/deploy").exists());
    let blob = ledger.blob("api").unwrap();
    let (released, _) = Lockfile::from_yaml_lenient(&blob);
    assert!(released.same_entries(&local));
}

#[test]
fn prepare_with_ledger_releases_on_failure() {
    let temp = TempDir::new().unwrap();
    let app = support::deployment_repo_with(temp.path(), remote_config());
    fs::write(temp.path().join("api"), "not a directory").unwrap();

    let ledger = MemoryLedger::new();
    let coordinator = app.coordinator(Some(ledger.boxed()));
    let err = workspace(&app, "api").prepare_with_ledger(&coordinator).unwrap_err();

    let err = err.downcast_ref::<WorkspaceError>().unwrap();
    assert_eq!(err.stage, Stage::CreateDirectory);
    assert!(ledger.blob("api").is_some());
}

#[test]
fn prepare_with_ledger_offline_flushes_local_file() {
    let temp = TempDir::new().unwrap();
    let app = support::deployment_repo(temp.path());
    let coordinator = LockCoordinator::local_only(LockfileStore::default());

    workspace(&app, "api").prepare_with_ledger(&coordinator).unwrap();

    assert!(temp.path().join("api/plural.lock").exists());
}

#[test]
fn prepare_with_ledger_leaves_local_file_when_remote_unreachable() {
    let temp = TempDir::new().unwrap();
    let app = support::deployment_repo_with(temp.path(), remote_config());
    let coordinator = app.coordinator(Some(MemoryLedger::unreachable().boxed()));

    workspace(&app, "api").prepare_with_ledger(&coordinator).unwrap();

    assert!(!temp.path().join("api/plural.lock").exists());
}
