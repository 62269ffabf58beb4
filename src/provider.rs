use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::git::CommandRunner;

/// Repository facts the coordinator needs: where the working tree is, what
/// branch is checked out, and whether a remote is configured (which gates
/// the Push and Sync operations).
pub trait Provider {
    fn repository_root(&self) -> &Path;

    /// Name of the currently checked-out branch, or `None` on a detached
    /// HEAD or if the lookup fails.
    fn branch_name(&self) -> Option<String>;

    /// URL of the `origin` remote, or `None` if no remote is configured.
    fn remote_url(&self) -> Option<String>;

    fn has_remote(&self) -> bool {
        self.remote_url().is_some()
    }
}

/// [`Provider`] backed by git queries through the command runner.
pub struct GitProvider {
    runner: Arc<dyn CommandRunner>,
    repo_root: PathBuf,
}

impl GitProvider {
    /// Locates the repository containing `start_dir`. Returns `None` if the
    /// directory is not inside a working tree.
    pub fn discover(runner: Arc<dyn CommandRunner>, start_dir: &Path) -> Option<Self> {
        let output = runner.run("rev-parse", start_dir, &["--show-toplevel"]);
        if !output.success {
            return None;
        }

        let root = output.stdout.first()?.trim();
        if root.is_empty() {
            return None;
        }

        Some(Self {
            runner,
            repo_root: PathBuf::from(root),
        })
    }
}

impl Provider for GitProvider {
    fn repository_root(&self) -> &Path {
        &self.repo_root
    }

    fn branch_name(&self) -> Option<String> {
        let output = self
            .runner
            .run("branch", &self.repo_root, &["--show-current"]);
        if !output.success {
            return None;
        }

        let branch = output.stdout.first()?.trim();
        if branch.is_empty() {
            None
        } else {
            Some(branch.to_owned())
        }
    }

    fn remote_url(&self) -> Option<String> {
        let output = self
            .runner
            .run("remote", &self.repo_root, &["get-url", "origin"]);
        if !output.success {
            return None;
        }

        let url = output.stdout.first()?.trim();
        if url.is_empty() {
            None
        } else {
            Some(url.to_owned())
        }
    }
}
