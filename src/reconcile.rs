use crate::asset_host::{AssetHandle, AssetHost};

/// Reconciles previously detached assets with the state the mutating
/// operation left on disk: assets whose backing file still exists are
/// reloaded, assets whose backing file is gone are unloaded.
///
/// An empty pending set is a no-op, so running reconciliation twice is safe.
pub fn reconcile(host: &dyn AssetHost, pending: Vec<AssetHandle>) {
    if pending.is_empty() {
        return;
    }

    log::info!("Reconciling {} detached assets...", pending.len());

    // The operation may have deleted some files, so those assets need to be
    // unloaded rather than re-read.
    let (to_reload, to_unload): (Vec<_>, Vec<_>) = pending
        .into_iter()
        .partition(|handle| handle.backing_file().exists());

    for handle in &to_reload {
        host.reload(handle);
    }

    for handle in &to_unload {
        host.unload(handle);
    }

    log::info!(
        "Reconciled: {} reloaded, {} unloaded",
        to_reload.len(),
        to_unload.len()
    );
}
