use crate::{
    asset_host::{AssetHandle, AssetHost},
    asset_id::AssetId,
};

/// Detaches every resident asset in `ids` from its backing file so the files
/// can be overwritten or deleted externally. Non-resident ids are skipped.
///
/// Assets that are not fully materialized are force-loaded first; detaching
/// a partially loaded asset is undefined behavior in the host, so the order
/// here is load-then-detach, always.
///
/// Returns the handles in discovery order. This list is the pending reload
/// set and must eventually be passed to [`crate::reconcile::reconcile`].
pub fn detach_assets(
    host: &dyn AssetHost,
    ids: impl IntoIterator<Item = AssetId>,
) -> Vec<AssetHandle> {
    let mut detached = Vec::new();

    for id in ids {
        let handle = match host.find_resident(&id) {
            Some(handle) => handle,
            None => continue,
        };

        if !host.is_fully_loaded(&handle) {
            host.finish_loading(&handle);
        }
        host.detach_backing(&handle);

        detached.push(handle);
    }

    log::info!("Detached {} loaded assets", detached.len());
    detached
}
