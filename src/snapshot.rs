//! Point-in-time view of the seat's devices.
//!
//! [`Snapshot`] is an **owned**, read-only copy of every device's engine state,
//! produced by [`DeviceManager::snapshot`](crate::manager::DeviceManager::snapshot).
//! It does not poll devices and is cheap to clone for diagnostics.
//!
//! # Example
//! ```no_run
//! use evseat::{DeviceManager, SeatConfig};
//!
//! let seat = DeviceManager::new(SeatConfig::default());
//! for (id, status) in seat.snapshot().iter() {
//!     println!("{id}: {} {:?} active slots {:?}", status.name, status.state, status.active_slots);
//! }
//! ```

use crate::dispatch::DispatchState;
use crate::evdev::EvdevDevice;
use crate::manager::DeviceId;
use crate::probe::DeviceCaps;
use std::collections::HashMap;

/// Engine state of one device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceStatus {
    pub name: String,
    pub devnode: String,
    pub caps: DeviceCaps,
    pub state: DispatchState,
    pub multitouch: bool,
    pub active_slots: Vec<usize>,
    /// Key-state resyncs performed after `SYN_DROPPED`.
    pub resyncs: u64,
}

impl DeviceStatus {
    pub(crate) fn of(device: &EvdevDevice) -> Self {
        Self {
            name: device.meta().name.clone(),
            devnode: device.meta().devnode.clone(),
            caps: device.caps(),
            state: device.state(),
            multitouch: device.is_multitouch(),
            active_slots: device.slots().active(),
            resyncs: device.resync_count(),
        }
    }
}

/// Owned snapshot of device states (`DeviceId → DeviceStatus`).
#[derive(Clone, Debug, Default)]
pub struct Snapshot(pub HashMap<DeviceId, DeviceStatus>);

impl Snapshot {
    #[inline]
    pub fn get(&self, id: DeviceId) -> Option<&DeviceStatus> {
        self.0.get(&id)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&DeviceId, &DeviceStatus)> {
        self.0.iter()
    }

    #[inline]
    pub fn into_inner(self) -> HashMap<DeviceId, DeviceStatus> {
        self.0
    }
}
