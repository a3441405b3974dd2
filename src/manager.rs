//! Seat-level device registry.
//!
//! [`DeviceManager`] owns every admitted [`EvdevDevice`] and hands out
//! [`DeviceId`]s: arena slot plus generation, so a stale id held by the
//! readiness loop after teardown can never reach a newer device.
//!
//! Typical flow:
//! - [`DeviceManager::admit`] when a device node is opened
//! - [`DeviceManager::dispatch`] from the readiness callback of that node
//! - [`DeviceManager::remove`] when dispatch fails or the node goes away
//! - [`DeviceManager::notify_keyboard_focus`] / [`DeviceManager::update_leds`]
//!   from the seat

use crate::config::{SeatConfig, Viewport};
use crate::device::DeviceIo;
use crate::dispatch::{SpecializedDispatch, SpecializedKind, SpecializedProvider};
use crate::error::EngineError;
use crate::evdev::EvdevDevice;
use crate::focus;
use crate::led::Leds;
use crate::metadata::DeviceMeta;
use crate::probe::{probe, DeviceCaps, DeviceProfile, ProbeOutcome, RejectReason};
use crate::sink::SeatSink;
use crate::snapshot::{DeviceStatus, Snapshot};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// Stable handle of an admitted device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId {
    index: u32,
    generation: u32,
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evdev:{}.{}", self.index, self.generation)
    }
}

/// Result of offering a device to the seat.
#[derive(Debug)]
pub enum Admission {
    Admitted(DeviceId),
    Rejected {
        meta: DeviceMeta,
        reason: RejectReason,
    },
}

impl Admission {
    pub fn id(&self) -> Option<DeviceId> {
        match self {
            Admission::Admitted(id) => Some(*id),
            Admission::Rejected { .. } => None,
        }
    }
}

struct Entry {
    generation: u32,
    device: Option<EvdevDevice>,
}

pub struct DeviceManager {
    config: SeatConfig,
    entries: Vec<Entry>,
    free: Vec<u32>,
    specialized: Option<SpecializedProvider>,
    enabled: bool,
}

impl DeviceManager {
    pub fn new(config: SeatConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            free: Vec::new(),
            specialized: None,
            enabled: true,
        }
    }

    /// Register the factory used for devices that probe as specialized.
    pub fn with_specialized<F>(mut self, provider: F) -> Self
    where
        F: Fn(SpecializedKind, &DeviceProfile) -> Option<Box<dyn SpecializedDispatch>> + 'static,
    {
        self.specialized = Some(Box::new(provider));
        self
    }

    pub fn config(&self) -> &SeatConfig {
        &self.config
    }

    /// Probe `io` and admit it unless the prober rejects it.
    pub fn admit<D: DeviceIo + 'static>(&mut self, io: D, devnode: &str) -> Admission {
        let profile = match probe(&io, devnode) {
            ProbeOutcome::Admit(profile) => profile,
            ProbeOutcome::Reject { meta, reason } => {
                return Admission::Rejected { meta, reason };
            }
        };

        let specialized = match (profile.specialized, &self.specialized) {
            (Some(kind), Some(provider)) => provider(kind, &profile),
            _ => None,
        };
        let device = EvdevDevice::new(profile, Box::new(io), &self.config, specialized);
        let id = self.insert(device);
        debug!(%id, devnode, "device admitted");
        Admission::Admitted(id)
    }

    fn insert(&mut self, device: EvdevDevice) -> DeviceId {
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.device = Some(device);
            return DeviceId {
                index,
                generation: entry.generation,
            };
        }
        let index = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 0,
            device: Some(device),
        });
        DeviceId {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, id: DeviceId) -> Option<&EvdevDevice> {
        self.entries
            .get(id.index as usize)
            .filter(|e| e.generation == id.generation)
            .and_then(|e| e.device.as_ref())
    }

    pub fn get_mut(&mut self, id: DeviceId) -> Option<&mut EvdevDevice> {
        self.entries
            .get_mut(id.index as usize)
            .filter(|e| e.generation == id.generation)
            .and_then(|e| e.device.as_mut())
    }

    /// Tear a device down. Its id becomes permanently stale.
    pub fn remove(&mut self, id: DeviceId) -> Option<EvdevDevice> {
        let entry = self
            .entries
            .get_mut(id.index as usize)
            .filter(|e| e.generation == id.generation)?;
        let device = entry.device.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(id.index);
        info!(%id, devnode = %device.meta().devnode, "device removed");
        Some(device)
    }

    pub fn len(&self) -> usize {
        self.devices().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &EvdevDevice)> {
        self.entries.iter().enumerate().filter_map(|(i, e)| {
            e.device.as_ref().map(|d| {
                (
                    DeviceId {
                        index: i as u32,
                        generation: e.generation,
                    },
                    d,
                )
            })
        })
    }

    /// Gate reads. While disabled, [`dispatch`](Self::dispatch) leaves data
    /// queued in the device.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Readiness callback for one device.
    ///
    /// On error the device is left registered; the caller decides on teardown
    /// (normally [`remove`](Self::remove)).
    pub fn dispatch(
        &mut self,
        id: DeviceId,
        sink: &mut dyn SeatSink,
    ) -> Result<usize, EngineError> {
        if !self.enabled {
            return Ok(0);
        }
        let device = self.get_mut(id).ok_or(EngineError::UnknownDevice(id))?;
        device.dispatch_readable(sink)
    }

    /// Remap every device into a new output region.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.config.viewport = viewport;
        for entry in &mut self.entries {
            if let Some(device) = entry.device.as_mut() {
                device.set_viewport(viewport);
            }
        }
    }

    /// Report keys held on any device to a newly focused keyboard target.
    ///
    /// Returns `None` (and emits nothing) when no device on the seat is a
    /// keyboard.
    pub fn notify_keyboard_focus(&self, sink: &mut dyn SeatSink) -> Option<Vec<u32>> {
        let has_keyboard = self
            .devices()
            .any(|(_, d)| d.caps().contains(DeviceCaps::KEYBOARD));
        if !has_keyboard {
            return None;
        }
        Some(focus::notify_keyboard_focus(
            self.devices().map(|(_, d)| d),
            sink,
        ))
    }

    /// Push lock indicators to every keyboard on the seat.
    pub fn update_leds(&mut self, leds: Leds) {
        for entry in &mut self.entries {
            if let Some(device) = entry.device.as_mut() {
                device.update_leds(leds);
            }
        }
    }

    /// Owned view of every device's state.
    pub fn snapshot(&self) -> Snapshot {
        let map: HashMap<DeviceId, DeviceStatus> = self
            .devices()
            .map(|(id, d)| (id, DeviceStatus::of(d)))
            .collect();
        Snapshot(map)
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new(SeatConfig::default())
    }
}
