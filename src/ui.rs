use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier for an in-progress notification. The coordinator stores the
/// token in an `Option`; its presence is the "operation in progress" flag,
/// so the token itself never needs to be inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressToken(pub u64);

/// Yes/no questions the coordinator asks before mutating anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Confirmation {
    /// "Stash (save) all modifications of the working tree? Required to
    /// sync."
    StashBeforeSync,
    /// "Revert all modifications of the working tree?"
    RevertAll,
}

/// The editor surface the coordinator talks to: confirmation dialogs, result
/// notifications, and the non-expiring progress notification shown while an
/// operation runs.
///
/// Implementations must answer `confirm` synchronously on the calling
/// thread; the coordinator blocks on it.
pub trait EditorUi {
    fn confirm(&self, request: Confirmation) -> bool;

    /// Shows a non-expiring progress notification. The returned token must
    /// be handed back to [`EditorUi::end_progress`] exactly once.
    fn begin_progress(&self, label: &str) -> ProgressToken;

    fn end_progress(&self, token: ProgressToken);

    fn notify_success(&self, operation: &str);

    fn notify_failure(&self, operation: &str);

    fn notify_warning(&self, message: &str);
}

/// [`EditorUi`] for embedding without a display: confirmations auto-accept
/// and notifications go to the log.
#[derive(Debug, Default)]
pub struct HeadlessUi {
    next_token: AtomicU64,
}

impl HeadlessUi {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EditorUi for HeadlessUi {
    fn confirm(&self, request: Confirmation) -> bool {
        log::debug!("Auto-confirming {:?}", request);
        true
    }

    fn begin_progress(&self, label: &str) -> ProgressToken {
        log::info!("{}...", label);
        ProgressToken(self.next_token.fetch_add(1, Ordering::Relaxed))
    }

    fn end_progress(&self, _token: ProgressToken) {}

    fn notify_success(&self, operation: &str) {
        log::info!("{} operation was successful", operation);
    }

    fn notify_failure(&self, operation: &str) {
        log::error!("{} operation failed", operation);
    }

    fn notify_warning(&self, message: &str) {
        log::warn!("{}", message);
    }
}
