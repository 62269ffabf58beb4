//! End-to-end coordination tests against real git repositories: an origin
//! working tree and a clone, with assets registered in the in-memory host.

use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
    sync::Arc,
    time::Duration,
};

use relink::{
    AssetId, CommandRunner, Config, ContentRoot, Coordinator, GitCommandRunner, GitProvider,
    HeadlessUi, HostEvent, InMemoryAssetHost, OperationKind, OperationState,
};
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(30);

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn git_config_user(dir: &Path) {
    git(dir, &["config", "--local", "user.name", "Test"]);
    git(dir, &["config", "--local", "user.email", "test@test.com"]);
    git(dir, &["config", "--local", "commit.gpgsign", "false"]);
}

fn git_commit_all(dir: &Path, msg: &str) {
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-m", msg]);
}

/// An origin working tree with a Content directory, and a clone of it.
struct RepoPair {
    _tmp: TempDir,
    origin: PathBuf,
    clone: PathBuf,
}

impl RepoPair {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let origin = tmp.path().join("origin");
        let clone = tmp.path().join("clone");

        fs::create_dir_all(origin.join("Content")).unwrap();
        git(&origin, &["init"]);
        git_config_user(&origin);

        Self {
            _tmp: tmp,
            origin,
            clone,
        }
    }

    fn clone_origin(&self) {
        git(
            self._tmp.path(),
            &[
                "clone",
                self.origin.to_str().unwrap(),
                self.clone.to_str().unwrap(),
            ],
        );
        git_config_user(&self.clone);
    }

    fn write_origin_asset(&self, name: &str, content: &str) {
        fs::write(self.origin.join("Content").join(name), content).unwrap();
    }

    fn coordinator(&self, host: Arc<InMemoryAssetHost>) -> Coordinator {
        let config = Config::default();
        let runner = Arc::new(GitCommandRunner::from_config(&config));
        let provider =
            GitProvider::discover(runner.clone(), &self.clone).expect("clone should be a repo");
        let content = ContentRoot::new(self.clone.join("Content"), &config);

        Coordinator::new(
            Arc::new(provider),
            runner,
            host,
            Arc::new(HeadlessUi::new()),
            content,
            config,
        )
    }
}

#[test]
fn sync_reloads_modified_and_unloads_deleted_assets() {
    let repos = RepoPair::new();
    repos.write_origin_asset("Feature.uasset", "v1");
    repos.write_origin_asset("Doomed.uasset", "short-lived");
    git_commit_all(&repos.origin, "init");
    repos.clone_origin();

    // Advance origin: one modification, one deletion. Fetch so the clone's
    // remote-tracking ref sees them before the sync resolves its changed set.
    repos.write_origin_asset("Feature.uasset", "v2");
    fs::remove_file(repos.origin.join("Content/Doomed.uasset")).unwrap();
    git_commit_all(&repos.origin, "remote changes");
    git(&repos.clone, &["fetch", "origin"]);

    let host = Arc::new(InMemoryAssetHost::new());
    let feature = AssetId::new("/Game/Feature");
    let doomed = AssetId::new("/Game/Doomed");
    host.insert_loaded(feature.clone(), repos.clone.join("Content/Feature.uasset"));
    host.insert_loaded(doomed.clone(), repos.clone.join("Content/Doomed.uasset"));

    let mut coordinator = repos.coordinator(host.clone());
    coordinator.request(OperationKind::Sync).unwrap();

    let completed = coordinator.pump_blocking(TIMEOUT).unwrap();
    assert!(completed.succeeded, "pull failed: {:?}", completed.stderr);
    assert_eq!(coordinator.state(), OperationState::Idle);

    // The pull landed on disk and the host was reconciled against it.
    assert_eq!(
        fs::read_to_string(repos.clone.join("Content/Feature.uasset")).unwrap(),
        "v2"
    );
    let events = host.events();
    assert!(events.contains(&HostEvent::Detached(feature.clone())));
    assert!(events.contains(&HostEvent::Reloaded(feature)));
    assert!(events.contains(&HostEvent::Unloaded(doomed.clone())));
    assert!(!host.is_resident(&doomed));
}

#[test]
fn sync_with_local_modification_stashes_and_restores_it() {
    let repos = RepoPair::new();
    repos.write_origin_asset("Feature.uasset", "v1");
    repos.write_origin_asset("Local.uasset", "committed");
    git_commit_all(&repos.origin, "init");
    repos.clone_origin();

    repos.write_origin_asset("Feature.uasset", "v2");
    git_commit_all(&repos.origin, "remote edit");
    git(&repos.clone, &["fetch", "origin"]);

    // Uncommitted local modification to a file the remote did not touch.
    fs::write(repos.clone.join("Content/Local.uasset"), "local edit").unwrap();

    let host = Arc::new(InMemoryAssetHost::new());
    let feature = AssetId::new("/Game/Feature");
    let local = AssetId::new("/Game/Local");
    host.insert_loaded(feature.clone(), repos.clone.join("Content/Feature.uasset"));
    host.insert_loaded(local.clone(), repos.clone.join("Content/Local.uasset"));

    let mut coordinator = repos.coordinator(host.clone());
    coordinator.request(OperationKind::Sync).unwrap();

    let completed = coordinator.pump_blocking(TIMEOUT).unwrap();
    assert!(completed.succeeded, "pull failed: {:?}", completed.stderr);

    // Stash was popped: the local edit survived the pull and no stash
    // remains behind.
    assert_eq!(
        fs::read_to_string(repos.clone.join("Content/Local.uasset")).unwrap(),
        "local edit"
    );
    let runner = GitCommandRunner::default();
    let stash_list = runner.run("stash", &repos.clone, &["list"]);
    assert!(stash_list.stdout.is_empty(), "stash was not popped");

    let events = host.events();
    assert!(events.contains(&HostEvent::Reloaded(feature)));
    assert!(events.contains(&HostEvent::Reloaded(local)));
}

#[test]
fn revert_restores_working_tree_and_reloads() {
    let repos = RepoPair::new();
    repos.write_origin_asset("Hero.uasset", "committed content");
    git_commit_all(&repos.origin, "init");
    repos.clone_origin();

    // Local damage to be reverted.
    fs::write(repos.clone.join("Content/Hero.uasset"), "scribbles").unwrap();

    let host = Arc::new(InMemoryAssetHost::new());
    let hero = AssetId::new("/Game/Hero");
    host.insert_loaded(hero.clone(), repos.clone.join("Content/Hero.uasset"));

    let mut coordinator = repos.coordinator(host.clone());
    coordinator.request(OperationKind::Revert).unwrap();

    let completed = coordinator.pump_blocking(TIMEOUT).unwrap();
    assert!(completed.succeeded);

    assert_eq!(
        fs::read_to_string(repos.clone.join("Content/Hero.uasset")).unwrap(),
        "committed content"
    );
    let events = host.events();
    assert!(events.contains(&HostEvent::Detached(hero.clone())));
    assert!(events.contains(&HostEvent::Reloaded(hero)));
}

#[test]
fn refresh_runs_without_touching_assets() {
    let repos = RepoPair::new();
    repos.write_origin_asset("Hero.uasset", "v1");
    git_commit_all(&repos.origin, "init");
    repos.clone_origin();

    let host = Arc::new(InMemoryAssetHost::new());
    host.insert_loaded(
        AssetId::new("/Game/Hero"),
        repos.clone.join("Content/Hero.uasset"),
    );

    let mut coordinator = repos.coordinator(host.clone());
    coordinator.request(OperationKind::Refresh).unwrap();

    let completed = coordinator.pump_blocking(TIMEOUT).unwrap();
    assert!(completed.succeeded);
    assert!(host.events().is_empty());
}
