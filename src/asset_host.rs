use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::asset_id::AssetId;

/// An ownership-free reference to an asset that was resident in memory when
/// it was captured. Handles become stale once the asset is reloaded or
/// unloaded; the coordinator only holds them between detachment and
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetHandle {
    id: AssetId,
    backing_file: PathBuf,
}

impl AssetHandle {
    pub fn new(id: AssetId, backing_file: PathBuf) -> Self {
        Self { id, backing_file }
    }

    pub fn id(&self) -> &AssetId {
        &self.id
    }

    /// The on-disk file this asset was loaded from, captured at detach time.
    pub fn backing_file(&self) -> &Path {
        &self.backing_file
    }
}

/// Capability interface over the editor's asset registry and loader.
///
/// The coordinator never owns assets; it observes residency and requests
/// state transitions through this trait. All calls happen on the control
/// thread.
///
/// Detaching an asset that is not fully materialized is undefined behavior
/// in the host, so callers must check [`AssetHost::is_fully_loaded`] and
/// call [`AssetHost::finish_loading`] first.
pub trait AssetHost {
    /// Looks up whether an asset with this identity is currently resident.
    fn find_resident(&self, id: &AssetId) -> Option<AssetHandle>;

    /// Whether the asset's content is fully materialized in memory.
    fn is_fully_loaded(&self, handle: &AssetHandle) -> bool;

    /// Synchronously drains any outstanding background load so the asset is
    /// fully materialized.
    fn finish_loading(&self, handle: &AssetHandle);

    /// Severs the asset's link to its backing file so the file can be
    /// overwritten or deleted externally.
    fn detach_backing(&self, handle: &AssetHandle);

    /// Replaces the in-memory content by re-reading the backing file.
    fn reload(&self, handle: &AssetHandle);

    /// Discards the in-memory content without touching disk.
    fn unload(&self, handle: &AssetHandle);

    /// Prompts to persist all modified assets. Returns `true` if nothing
    /// dirty remains afterward (including the trivial case of nothing having
    /// been dirty), `false` if the user declined and unsaved changes remain.
    fn save_dirty_assets(&self) -> bool;
}

/// Observable host transitions, recorded by [`InMemoryAssetHost`] in call
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    FinishedLoading(AssetId),
    Detached(AssetId),
    Reloaded(AssetId),
    Unloaded(AssetId),
    SaveRequested,
}

#[derive(Debug)]
struct AssetRecord {
    backing_file: PathBuf,
    fully_loaded: bool,
    detached: bool,
    dirty: bool,
}

/// A simple in-memory asset table implementing [`AssetHost`], useful for
/// testing coordinators without a real engine, in the same spirit as an
/// in-memory filesystem backend.
///
/// It enforces the host's detach precondition: detaching an asset that is
/// not fully loaded panics, which turns a protocol-order bug into a loud
/// test failure.
#[derive(Debug, Default)]
pub struct InMemoryAssetHost {
    inner: Mutex<HostState>,
}

#[derive(Debug, Default)]
struct HostState {
    resident: BTreeMap<AssetId, AssetRecord>,
    events: Vec<HostEvent>,
    decline_save: bool,
}

impl InMemoryAssetHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fully loaded asset backed by the given file.
    pub fn insert_loaded(&self, id: AssetId, backing_file: PathBuf) {
        let mut inner = self.inner.lock().unwrap();
        inner.resident.insert(
            id,
            AssetRecord {
                backing_file,
                fully_loaded: true,
                detached: false,
                dirty: false,
            },
        );
    }

    /// Registers an asset whose background load has not finished yet.
    pub fn insert_partially_loaded(&self, id: AssetId, backing_file: PathBuf) {
        let mut inner = self.inner.lock().unwrap();
        inner.resident.insert(
            id,
            AssetRecord {
                backing_file,
                fully_loaded: false,
                detached: false,
                dirty: false,
            },
        );
    }

    /// Marks a resident asset as having unsaved in-memory modifications.
    pub fn mark_dirty(&self, id: &AssetId) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner.resident.get_mut(id) {
            record.dirty = true;
        }
    }

    /// Makes subsequent save prompts behave as if the user declined.
    pub fn decline_save(&self) {
        self.inner.lock().unwrap().decline_save = true;
    }

    pub fn is_resident(&self, id: &AssetId) -> bool {
        self.inner.lock().unwrap().resident.contains_key(id)
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.inner.lock().unwrap().events.clone()
    }
}

impl AssetHost for InMemoryAssetHost {
    fn find_resident(&self, id: &AssetId) -> Option<AssetHandle> {
        let inner = self.inner.lock().unwrap();
        inner
            .resident
            .get(id)
            .map(|record| AssetHandle::new(id.clone(), record.backing_file.clone()))
    }

    fn is_fully_loaded(&self, handle: &AssetHandle) -> bool {
        let inner = self.inner.lock().unwrap();
        inner
            .resident
            .get(handle.id())
            .map(|record| record.fully_loaded)
            .unwrap_or(false)
    }

    fn finish_loading(&self, handle: &AssetHandle) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner.resident.get_mut(handle.id()) {
            record.fully_loaded = true;
        }
        inner
            .events
            .push(HostEvent::FinishedLoading(handle.id().clone()));
    }

    fn detach_backing(&self, handle: &AssetHandle) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner.resident.get_mut(handle.id()) {
            assert!(
                record.fully_loaded,
                "detach_backing called on partially loaded asset {}",
                handle.id()
            );
            record.detached = true;
        }
        inner.events.push(HostEvent::Detached(handle.id().clone()));
    }

    fn reload(&self, handle: &AssetHandle) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner.resident.get_mut(handle.id()) {
            record.detached = false;
            record.fully_loaded = true;
            record.dirty = false;
        }
        inner.events.push(HostEvent::Reloaded(handle.id().clone()));
    }

    fn unload(&self, handle: &AssetHandle) {
        let mut inner = self.inner.lock().unwrap();
        inner.resident.remove(handle.id());
        inner.events.push(HostEvent::Unloaded(handle.id().clone()));
    }

    fn save_dirty_assets(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.events.push(HostEvent::SaveRequested);
        if inner.decline_save {
            return !inner.resident.values().any(|record| record.dirty);
        }
        for record in inner.resident.values_mut() {
            record.dirty = false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> AssetId {
        AssetId::new(name)
    }

    #[test]
    fn resident_lookup() {
        let host = InMemoryAssetHost::new();
        host.insert_loaded(id("/Game/A"), PathBuf::from("/c/A.uasset"));

        let handle = host.find_resident(&id("/Game/A")).unwrap();
        assert_eq!(handle.backing_file(), Path::new("/c/A.uasset"));
        assert!(host.find_resident(&id("/Game/B")).is_none());
    }

    #[test]
    #[should_panic(expected = "partially loaded")]
    fn detach_before_full_load_panics() {
        let host = InMemoryAssetHost::new();
        host.insert_partially_loaded(id("/Game/A"), PathBuf::from("/c/A.uasset"));
        let handle = host.find_resident(&id("/Game/A")).unwrap();
        host.detach_backing(&handle);
    }

    #[test]
    fn finish_loading_then_detach() {
        let host = InMemoryAssetHost::new();
        host.insert_partially_loaded(id("/Game/A"), PathBuf::from("/c/A.uasset"));
        let handle = host.find_resident(&id("/Game/A")).unwrap();

        assert!(!host.is_fully_loaded(&handle));
        host.finish_loading(&handle);
        host.detach_backing(&handle);

        assert_eq!(
            host.events(),
            vec![
                HostEvent::FinishedLoading(id("/Game/A")),
                HostEvent::Detached(id("/Game/A")),
            ]
        );
    }

    #[test]
    fn unload_removes_residency() {
        let host = InMemoryAssetHost::new();
        host.insert_loaded(id("/Game/A"), PathBuf::from("/c/A.uasset"));
        let handle = host.find_resident(&id("/Game/A")).unwrap();

        host.unload(&handle);
        assert!(!host.is_resident(&id("/Game/A")));
    }

    #[test]
    fn save_clears_dirty_when_accepted() {
        let host = InMemoryAssetHost::new();
        host.insert_loaded(id("/Game/A"), PathBuf::from("/c/A.uasset"));
        host.mark_dirty(&id("/Game/A"));

        assert!(host.save_dirty_assets());
    }

    #[test]
    fn save_declined_with_dirty_assets_fails() {
        let host = InMemoryAssetHost::new();
        host.insert_loaded(id("/Game/A"), PathBuf::from("/c/A.uasset"));
        host.mark_dirty(&id("/Game/A"));
        host.decline_save();

        assert!(!host.save_dirty_assets());
    }

    #[test]
    fn save_declined_with_nothing_dirty_succeeds() {
        let host = InMemoryAssetHost::new();
        host.insert_loaded(id("/Game/A"), PathBuf::from("/c/A.uasset"));
        host.decline_save();

        assert!(host.save_dirty_assets());
    }
}
