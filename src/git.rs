use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    process::Command,
};

use thiserror::Error;

use crate::config::Config;

/// Result of one version-control command invocation. `stdout` and `stderr`
/// are split into lines with leading whitespace preserved, since porcelain
/// status output is column-sensitive.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl CommandOutput {
    pub fn failed(message: String) -> Self {
        Self {
            success: false,
            stdout: Vec::new(),
            stderr: vec![message],
        }
    }
}

/// Executes version-control subcommands against a repository root.
///
/// This is the only way the crate touches the version-control tool; the
/// command layer itself (binary discovery, environment, credentials) belongs
/// to the host and can be swapped out wholesale in tests.
pub trait CommandRunner: Send + Sync {
    fn run(&self, subcommand: &str, repo_root: &Path, args: &[&str]) -> CommandOutput;
}

/// [`CommandRunner`] that shells out to a git binary.
pub struct GitCommandRunner {
    binary: String,
}

impl GitCommandRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Uses the binary name or path from the project settings.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.vcs_binary.clone())
    }
}

impl Default for GitCommandRunner {
    fn default() -> Self {
        Self::new("git")
    }
}

impl CommandRunner for GitCommandRunner {
    fn run(&self, subcommand: &str, repo_root: &Path, args: &[&str]) -> CommandOutput {
        let output = match Command::new(&self.binary)
            .arg(subcommand)
            .args(args)
            .current_dir(repo_root)
            .output()
        {
            Ok(output) => output,
            Err(err) => {
                log::warn!("Failed to run {} {}: {}", self.binary, subcommand, err);
                return CommandOutput::failed(err.to_string());
            }
        };

        let to_lines = |bytes: &[u8]| {
            String::from_utf8_lossy(bytes)
                .lines()
                .map(str::to_owned)
                .collect::<Vec<_>>()
        };

        CommandOutput {
            success: output.status.success(),
            stdout: to_lines(&output.stdout),
            stderr: to_lines(&output.stderr),
        }
    }
}

#[derive(Debug, Error)]
#[error("`{subcommand}` failed: {message}")]
pub struct CommandError {
    pub subcommand: String,
    pub message: String,
}

impl CommandError {
    fn from_output(subcommand: &str, output: &CommandOutput) -> Self {
        Self {
            subcommand: subcommand.to_owned(),
            message: output.stderr.join("\n"),
        }
    }
}

/// One entry of porcelain status output: the two-column state code and the
/// repo-relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub code: String,
    pub path: PathBuf,
}

impl StatusEntry {
    /// Whether this entry is a modification or addition in either the index
    /// or the working tree. Deletions are excluded: a file that is gone
    /// locally has nothing on disk worth detaching from.
    pub fn is_modify_or_add(&self) -> bool {
        self.code.bytes().any(|b| b == b'M' || b == b'A')
    }
}

/// Returns the tracked working-tree status, one entry per changed file.
/// Untracked files are excluded at the command level.
pub fn working_tree_status(
    runner: &dyn CommandRunner,
    repo_root: &Path,
) -> Result<Vec<StatusEntry>, CommandError> {
    let output = runner.run(
        "status",
        repo_root,
        &["--porcelain", "--untracked-files=no"],
    );
    if !output.success {
        return Err(CommandError::from_output("status", &output));
    }

    let mut entries = Vec::new();
    for line in &output.stdout {
        // Porcelain format: XY<space>path
        if line.len() < 4 {
            continue;
        }
        let code = &line[..2];
        let mut path = &line[3..];

        // Renames and copies print as "old -> new"; only the new path
        // exists on disk.
        if code.contains(['R', 'C']) {
            if let Some((_, new_path)) = path.rsplit_once(" -> ") {
                path = new_path;
            }
        }

        entries.push(StatusEntry {
            code: code.to_owned(),
            path: PathBuf::from(path),
        });
    }
    Ok(entries)
}

/// Whether the working tree has any uncommitted, tracked change.
pub fn has_working_tree_changes(
    runner: &dyn CommandRunner,
    repo_root: &Path,
) -> Result<bool, CommandError> {
    Ok(!working_tree_status(runner, repo_root)?.is_empty())
}

/// Returns the repo-relative paths that differ between `HEAD` and the remote
/// counterpart of `branch`. An endpoint diff is used rather than a range, so
/// files changed only in unpushed local commits are included as well.
pub fn committed_diff_paths(
    runner: &dyn CommandRunner,
    repo_root: &Path,
    branch: &str,
) -> Result<BTreeSet<PathBuf>, CommandError> {
    let range = format!("HEAD..origin/{}", branch);
    let output = runner.run("diff", repo_root, &["--name-only", &range]);
    if !output.success {
        return Err(CommandError::from_output("diff", &output));
    }

    Ok(output
        .stdout
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

/// Creates a stash carrying the given message so it can be recognized later.
/// Returns whether the stash command succeeded.
pub fn stash_push(runner: &dyn CommandRunner, repo_root: &Path, message: &str) -> bool {
    let output = runner.run("stash", repo_root, &["push", "-m", message]);
    if !output.success {
        log::warn!("stash push failed: {}", output.stderr.join("\n"));
    }
    output.success
}

/// Pops the most recent stash. Returns whether the pop succeeded; a failed
/// pop (e.g. conflicts) leaves the stash in place for the user to resolve.
pub fn stash_pop(runner: &dyn CommandRunner, repo_root: &Path) -> bool {
    let output = runner.run("stash", repo_root, &["pop"]);
    if !output.success {
        log::warn!("stash pop failed: {}", output.stderr.join("\n"));
    }
    output.success
}
