use std::{collections::BTreeSet, path::Path};

use walkdir::WalkDir;

use crate::{
    asset_id::{AssetId, ContentRoot},
    git::{self, CommandError, CommandRunner},
};

/// Enumerates every asset under the content root and resolves it to a
/// logical id. Used before a revert, which can touch anything.
///
/// Conversion failures are logged per path and excluded; they never fail the
/// batch.
pub fn full_scan(content: &ContentRoot) -> BTreeSet<AssetId> {
    let mut ids = BTreeSet::new();

    for entry in WalkDir::new(content.root()).into_iter() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("Could not walk content root: {}", err);
                continue;
            }
        };

        if !entry.file_type().is_file() || !content.is_asset_file(entry.path()) {
            continue;
        }

        match content.id_for_path(entry.path()) {
            Ok(id) => {
                ids.insert(id);
            }
            Err(err) => {
                log::error!("{}", err);
            }
        }
    }

    log::debug!("Full content scan resolved {} assets", ids.len());
    ids
}

/// Resolves the set of assets that differ between the local checkout and the
/// remote counterpart of `branch`: the committed diff against
/// `origin/<branch>` united with uncommitted working-tree modifications and
/// additions. Deletions and untracked files are excluded.
///
/// Paths are made absolute against the repository root before id
/// resolution. A failing status or diff command surfaces as an error; the
/// caller decides whether to degrade to an empty set.
pub fn changed_since_remote(
    runner: &dyn CommandRunner,
    repo_root: &Path,
    branch: &str,
    content: &ContentRoot,
) -> Result<BTreeSet<AssetId>, CommandError> {
    let mut changed_paths = git::committed_diff_paths(runner, repo_root, branch)?;

    for entry in git::working_tree_status(runner, repo_root)? {
        if entry.is_modify_or_add() {
            changed_paths.insert(entry.path);
        }
    }

    let mut ids = BTreeSet::new();
    for rel_path in changed_paths {
        let abs_path = repo_root.join(&rel_path);
        if !content.is_asset_file(&abs_path) {
            continue;
        }

        match content.id_for_path(&abs_path) {
            Ok(id) => {
                log::debug!("Changed asset: {} -> {}", abs_path.display(), id);
                ids.insert(id);
            }
            Err(err) => {
                log::error!("{}", err);
            }
        }
    }

    Ok(ids)
}
