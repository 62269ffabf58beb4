use std::{collections::BTreeSet, sync::Arc, time::Duration};

use thiserror::Error;

use crate::{
    asset_host::{AssetHandle, AssetHost},
    asset_id::{AssetId, ContentRoot},
    config::Config,
    detach,
    git::{self, CommandRunner},
    operation::{CompletedOperation, DispatchError, OperationExecutor, OperationKind},
    provider::Provider,
    reconcile, resolver,
    ui::{Confirmation, EditorUi, ProgressToken},
};

/// Where the coordinator currently is in an operation's lifecycle. Exposed
/// for diagnostics; mutual exclusion is enforced by the progress token, not
/// by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Idle,
    SavingAssets,
    Stashing,
    InProgress,
    Reconciling,
}

/// Sequences mutating version-control operations against the working tree
/// while keeping the editor's loaded assets consistent with disk.
///
/// For a sync: save dirty assets, resolve the changed set against the
/// remote, detach those assets, stash local modifications if the user
/// agrees, then dispatch the pull. For a revert: confirm, then detach every
/// asset under the content root. Push and Refresh touch no tracked files and
/// skip all of that. Completion always flows through [`Coordinator::pump`]
/// on the caller's thread: unstash, reconcile detached assets against what
/// the operation left on disk, and notify.
///
/// One operation at a time: a request made while the progress notification
/// is alive is rejected synchronously, never queued.
pub struct Coordinator {
    provider: Arc<dyn Provider>,
    runner: Arc<dyn CommandRunner>,
    host: Arc<dyn AssetHost>,
    ui: Arc<dyn EditorUi>,
    content: ContentRoot,
    config: Config,

    executor: OperationExecutor,
    state: OperationState,

    /// Present while an operation is dispatched and its progress
    /// notification is showing. This is the mutual-exclusion flag.
    progress: Option<ProgressToken>,

    /// Assets detached for the current operation, in discovery order.
    /// Consumed exactly once by reconciliation.
    pending_reload: Vec<AssetHandle>,

    /// True only if this coordinator created a stash for the current
    /// operation. We never pop a stash we did not push.
    stash_created: bool,
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("a source control operation is already in progress")]
    AlreadyInProgress,

    #[error("{0} requires a configured remote")]
    NoRemote(&'static str),

    #[error("assets must be saved before a sync")]
    SaveDeclined,

    #[error("modifications must be stashed before a sync")]
    StashDeclined,

    #[error("revert was not confirmed")]
    RevertDeclined,

    #[error("could not dispatch {operation}")]
    Dispatch {
        operation: &'static str,
        #[source]
        source: DispatchError,
    },
}

impl Coordinator {
    pub fn new(
        provider: Arc<dyn Provider>,
        runner: Arc<dyn CommandRunner>,
        host: Arc<dyn AssetHost>,
        ui: Arc<dyn EditorUi>,
        content: ContentRoot,
        config: Config,
    ) -> Self {
        Self {
            provider,
            runner,
            host,
            ui,
            content,
            config,
            executor: OperationExecutor::new(),
            state: OperationState::Idle,
            progress: None,
            pending_reload: Vec::new(),
            stash_created: false,
        }
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Whether an operation is currently running. Checked synchronously at
    /// the top of every request.
    pub fn is_busy(&self) -> bool {
        self.progress.is_some()
    }

    /// Menu gating: Push and Sync are only offered when a remote is
    /// configured; Revert and Refresh are always offered.
    pub fn can_start(&self, kind: OperationKind) -> bool {
        !kind.requires_remote() || self.provider.has_remote()
    }

    /// Starts the given operation. Rejected synchronously if another
    /// operation is in progress or a required precondition is declined; all
    /// rejections are also surfaced as a notification.
    pub fn request(&mut self, kind: OperationKind) -> Result<(), RequestError> {
        if self.is_busy() {
            self.ui
                .notify_warning("Source control operation already in progress");
            return Err(RequestError::AlreadyInProgress);
        }

        if !self.can_start(kind) {
            self.ui.notify_warning(&format!(
                "{} requires a configured remote",
                kind.label()
            ));
            return Err(RequestError::NoRemote(kind.label()));
        }

        match kind {
            OperationKind::Sync => self.start_sync(),
            OperationKind::Revert => self.start_revert(),
            OperationKind::Push | OperationKind::Refresh => self.dispatch(kind),
        }
    }

    /// Drains at most one completed operation from the worker, running the
    /// completion steps (unstash, reconcile, notify) on this thread. Call
    /// this from the editor's tick.
    pub fn pump(&mut self) -> Option<CompletedOperation> {
        let completed = self.executor.try_complete()?;
        self.handle_completion(&completed);
        Some(completed)
    }

    /// Like [`Coordinator::pump`], but waits up to `timeout` for the running
    /// operation to finish.
    pub fn pump_blocking(&mut self, timeout: Duration) -> Option<CompletedOperation> {
        let completed = self.executor.wait_complete(timeout)?;
        self.handle_completion(&completed);
        Some(completed)
    }

    fn start_sync(&mut self) -> Result<(), RequestError> {
        // Ask the user to save any dirty assets open in the editor.
        self.state = OperationState::SavingAssets;
        if !self.host.save_dirty_assets() {
            self.ui
                .notify_warning("Save all assets before attempting to Sync");
            self.state = OperationState::Idle;
            return Err(RequestError::SaveDeclined);
        }

        // Resolve what the pull can touch, and detach only that subset so
        // the rest of the loaded world is left alone.
        let changed = self.resolve_changed_set();
        self.pending_reload = detach::detach_assets(&*self.host, changed);

        // Local modifications would block the pull; offer to stash them.
        self.state = OperationState::Stashing;
        if let Err(err) = self.stash_if_needed() {
            self.abort_detached();
            return Err(err);
        }

        self.dispatch(OperationKind::Sync)
    }

    fn start_revert(&mut self) -> Result<(), RequestError> {
        // Always confirm before unlinking anything; "no" has no side
        // effects at all.
        if !self.ui.confirm(Confirmation::RevertAll) {
            return Err(RequestError::RevertDeclined);
        }

        // A revert can touch any file under the content root, so the whole
        // working set is detached.
        let all = resolver::full_scan(&self.content);
        self.pending_reload = detach::detach_assets(&*self.host, all);

        self.dispatch(OperationKind::Revert)
    }

    /// Resolves the differential changed set for a sync. Command failures
    /// degrade to an empty set with a warning; the sync itself proceeds.
    fn resolve_changed_set(&self) -> BTreeSet<AssetId> {
        let branch = match self.provider.branch_name() {
            Some(branch) => branch,
            None => {
                log::warn!("Could not determine current branch, nothing will be detached");
                return BTreeSet::new();
            }
        };

        match resolver::changed_since_remote(
            &*self.runner,
            self.provider.repository_root(),
            &branch,
            &self.content,
        ) {
            Ok(ids) => ids,
            Err(err) => {
                log::warn!("Changed-set resolution failed: {}", err);
                self.ui
                    .notify_warning("Could not determine changed files before sync");
                BTreeSet::new()
            }
        }
    }

    fn stash_if_needed(&mut self) -> Result<(), RequestError> {
        let repo_root = self.provider.repository_root().to_path_buf();

        match git::has_working_tree_changes(&*self.runner, &repo_root) {
            Ok(false) => return Ok(()),
            Ok(true) => {}
            Err(err) => {
                // Status failure is non-fatal to the decision to proceed.
                log::warn!("Working tree status check failed: {}", err);
                return Ok(());
            }
        }

        if !self.ui.confirm(Confirmation::StashBeforeSync) {
            self.ui
                .notify_warning("Stash away all modifications before attempting to Sync");
            return Err(RequestError::StashDeclined);
        }

        self.stash_created = git::stash_push(&*self.runner, &repo_root, &self.config.stash_tag);
        if !self.stash_created {
            self.ui
                .notify_warning("Stashing away modifications failed");
        }
        Ok(())
    }

    fn dispatch(&mut self, kind: OperationKind) -> Result<(), RequestError> {
        self.state = OperationState::InProgress;
        let repo_root = self.provider.repository_root().to_path_buf();

        match self
            .executor
            .dispatch(kind, Arc::clone(&self.runner), repo_root)
        {
            Ok(()) => {
                self.progress = Some(self.ui.begin_progress(kind.in_progress_label()));
                Ok(())
            }
            Err(source) => {
                // The command never started, so no mutation occurred; put
                // the detached assets back as if the operation completed
                // with no changes.
                self.ui.notify_failure(kind.label());
                if kind.mutates_working_tree() {
                    self.abort_detached();
                } else {
                    self.state = OperationState::Idle;
                }
                Err(RequestError::Dispatch {
                    operation: kind.label(),
                    source,
                })
            }
        }
    }

    fn handle_completion(&mut self, completed: &CompletedOperation) {
        if let Some(token) = self.progress.take() {
            self.ui.end_progress(token);
        }

        if completed.kind.mutates_working_tree() {
            self.state = OperationState::Reconciling;
            self.unstash_if_created();
            self.reconcile_pending();
        }

        if completed.succeeded {
            self.ui.notify_success(completed.kind.label());
        } else {
            self.ui.notify_failure(completed.kind.label());
        }
        self.state = OperationState::Idle;
    }

    /// Undoes detachment after an aborted sync/revert: unstash if we
    /// stashed, reconcile whatever was detached, return to idle.
    fn abort_detached(&mut self) {
        self.state = OperationState::Reconciling;
        self.unstash_if_created();
        self.reconcile_pending();
        self.state = OperationState::Idle;
    }

    fn unstash_if_created(&mut self) {
        if !self.stash_created {
            return;
        }
        self.stash_created = false;

        if !git::stash_pop(&*self.runner, self.provider.repository_root()) {
            // A failed pop can leave conflicts; resolving them is up to the
            // user, and must not block reconciliation.
            self.ui
                .notify_warning("Unstashing previously saved modifications failed");
        }
    }

    fn reconcile_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending_reload);
        reconcile::reconcile(&*self.host, pending);
    }

    #[cfg(test)]
    pub(crate) fn stash_created(&self) -> bool {
        self.stash_created
    }

    #[cfg(test)]
    pub(crate) fn pending_reload_len(&self) -> usize {
        self.pending_reload.len()
    }
}
