use std::{io, path::PathBuf, sync::Arc, time::Duration};

use crossbeam_channel::{Receiver, Sender};
use jod_thread::JoinHandle;
use thiserror::Error;

use crate::git::CommandRunner;

/// The four operations the coordinator can run. This is a closed set: each
/// kind carries its own pre/post behavior in the coordinator, while the
/// command mapping lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Push,
    Sync,
    Revert,
    Refresh,
}

impl OperationKind {
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Push => "Push",
            OperationKind::Sync => "Sync",
            OperationKind::Revert => "Revert",
            OperationKind::Refresh => "Refresh",
        }
    }

    pub fn in_progress_label(&self) -> &'static str {
        match self {
            OperationKind::Push => "Pushing local commits to the remote",
            OperationKind::Sync => "Syncing from the remote",
            OperationKind::Revert => "Reverting the working tree",
            OperationKind::Refresh => "Refreshing file status",
        }
    }

    /// Whether the operation can rewrite tracked files in the working tree.
    /// Only these kinds detach assets up front and reconcile afterward.
    pub fn mutates_working_tree(&self) -> bool {
        matches!(self, OperationKind::Sync | OperationKind::Revert)
    }

    /// Whether the operation talks to a remote and is therefore only offered
    /// when one is configured.
    pub fn requires_remote(&self) -> bool {
        matches!(self, OperationKind::Push | OperationKind::Sync)
    }

    fn command(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            OperationKind::Push => ("push", &[]),
            OperationKind::Sync => ("pull", &[]),
            OperationKind::Revert => ("checkout", &["--", "."]),
            OperationKind::Refresh => ("status", &["--porcelain"]),
        }
    }
}

/// Delivered exactly once per dispatched operation.
#[derive(Debug, Clone)]
pub struct CompletedOperation {
    pub kind: OperationKind,
    pub succeeded: bool,
    pub stderr: Vec<String>,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("an operation is already running")]
    Busy,

    #[error("could not start worker thread")]
    Spawn(#[from] io::Error),
}

/// Runs one mutating command at a time on a worker thread and delivers its
/// completion over a channel.
///
/// The channel is the only suspension point: the worker never touches
/// coordinator state, and the coordinator observes completion by draining
/// the channel on its own thread.
pub struct OperationExecutor {
    completion_sender: Sender<CompletedOperation>,
    completion_receiver: Receiver<CompletedOperation>,

    /// Joined (via drop) when the completion message is consumed. The send
    /// happens-before the thread exits, so the join is prompt.
    worker: Option<JoinHandle<()>>,
}

impl OperationExecutor {
    pub fn new() -> Self {
        let (completion_sender, completion_receiver) = crossbeam_channel::unbounded();
        Self {
            completion_sender,
            completion_receiver,
            worker: None,
        }
    }

    /// Starts the command for `kind` asynchronously. Exactly one completion
    /// message will arrive on the channel, success or failure.
    pub fn dispatch(
        &mut self,
        kind: OperationKind,
        runner: Arc<dyn CommandRunner>,
        repo_root: PathBuf,
    ) -> Result<(), DispatchError> {
        if self.worker.is_some() {
            return Err(DispatchError::Busy);
        }

        let sender = self.completion_sender.clone();
        let worker = jod_thread::Builder::new()
            .name(format!("relink {} worker", kind.label()))
            .spawn(move || {
                let (subcommand, args) = kind.command();
                log::trace!("Operation worker running `{}`", subcommand);

                let output = runner.run(subcommand, &repo_root, args);
                if !output.success {
                    log::warn!(
                        "{} failed: {}",
                        kind.label(),
                        output.stderr.join("\n")
                    );
                }

                // The receiver only goes away if the executor was dropped
                // mid-operation, in which case nobody cares about the result.
                let _ = sender.send(CompletedOperation {
                    kind,
                    succeeded: output.success,
                    stderr: output.stderr,
                });
            })?;

        self.worker = Some(worker);
        Ok(())
    }

    /// Non-blocking check for a completed operation.
    pub fn try_complete(&mut self) -> Option<CompletedOperation> {
        let completed = self.completion_receiver.try_recv().ok()?;
        self.worker.take();
        Some(completed)
    }

    /// Waits up to `timeout` for the running operation to complete.
    pub fn wait_complete(&mut self, timeout: Duration) -> Option<CompletedOperation> {
        let completed = self.completion_receiver.recv_timeout(timeout).ok()?;
        self.worker.take();
        Some(completed)
    }
}

impl Default for OperationExecutor {
    fn default() -> Self {
        Self::new()
    }
}
