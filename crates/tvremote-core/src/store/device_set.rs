// ── Reactive discovered-device set ──
//
// Concurrent storage keyed by device id with push-based change
// notification through a `watch` snapshot. The discovery engine is the
// only writer; any number of readers subscribe.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::{Device, DeviceId};

/// Snapshot type handed to subscribers, sorted by display name.
pub type DeviceSnapshot = Arc<Vec<Arc<Device>>>;

pub(crate) struct DeviceSet {
    by_id: DashMap<DeviceId, Arc<Device>>,
    snapshot: watch::Sender<DeviceSnapshot>,
}

impl DeviceSet {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_id: DashMap::new(),
            snapshot,
        }
    }

    /// Insert or replace by id. Returns `true` if the id was new.
    pub(crate) fn upsert(&self, device: Device) -> bool {
        let is_new = self
            .by_id
            .insert(device.id.clone(), Arc::new(device))
            .is_none();
        self.rebuild_snapshot();
        is_new
    }

    pub(crate) fn remove(&self, id: &DeviceId) -> Option<Arc<Device>> {
        let removed = self.by_id.remove(id).map(|(_, v)| v);
        if removed.is_some() {
            self.rebuild_snapshot();
        }
        removed
    }

    pub(crate) fn get(&self, id: &DeviceId) -> Option<Arc<Device>> {
        self.by_id.get(id).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn snapshot(&self) -> DeviceSnapshot {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<DeviceSnapshot> {
        self.snapshot.subscribe()
    }

    pub(crate) fn clear(&self) {
        if self.by_id.is_empty() && self.snapshot.borrow().is_empty() {
            return;
        }
        self.by_id.clear();
        self.rebuild_snapshot();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }

    fn rebuild_snapshot(&self) {
        let mut values: Vec<Arc<Device>> = self.by_id.iter().map(|r| Arc::clone(r.value())).collect();
        values.sort_by(|a, b| {
            a.display_name()
                .cmp(&b.display_name())
                .then_with(|| a.id.cmp(&b.id))
        });
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}
