//! Collaborator interfaces the engine drives.
//!
//! A device backend (a real `/dev/input/eventN` node, a scripted virtual device,
//! or a replay harness) implements three small traits:
//! - [`CapabilitySource`]: queried once at admission and again for key state
//! - [`RecordReader`]: drained in bursts from the readiness callback
//! - [`LedWriter`]: best-effort indicator writes
//!
//! Every method may fail independently. The engine treats a failed capability
//! query as "feature absent", never as an admission failure.

use crate::bits::BitSet;
use serde::{Deserialize, Serialize};
use std::io;

/// Range reported by `EVIOCGABS` for one absolute axis.
///
/// Laid out as the kernel's `struct input_absinfo`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsInfo {
    pub value: i32,
    pub minimum: i32,
    pub maximum: i32,
    pub fuzz: i32,
    pub flat: i32,
    pub resolution: i32,
}

impl AbsInfo {
    pub fn range(minimum: i32, maximum: i32) -> Self {
        Self {
            minimum,
            maximum,
            ..Self::default()
        }
    }
}

/// Bus / vendor / product / version as reported by `EVIOCGID`.
///
/// Laid out as the kernel's `struct input_id`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputId {
    pub bustype: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

/// One indicator value written to the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedState {
    /// `LED_*` code.
    pub code: u16,
    pub on: bool,
}

/// Kernel-side description of a device.
pub trait CapabilitySource {
    /// Bitmap of supported `EV_*` types.
    fn supported_event_types(&self) -> io::Result<BitSet>;
    /// Bitmap of supported codes for one event type.
    fn supported_codes(&self, ev_type: u16) -> io::Result<BitSet>;
    fn axis_info(&self, code: u16) -> io::Result<AbsInfo>;
    /// Authoritative bitmap of keys currently held down.
    fn key_state(&self) -> io::Result<BitSet>;
    fn name(&self) -> io::Result<String>;
    fn identity(&self) -> io::Result<InputId>;
    fn properties(&self) -> io::Result<BitSet>;
}

/// Source of raw record bytes.
pub trait RecordReader {
    /// Read as many whole records as fit into `buf`.
    ///
    /// `Ok(0)` or [`io::ErrorKind::WouldBlock`] means no more data is ready.
    fn read_records(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Indicator LED output.
pub trait LedWriter {
    fn write_leds(&mut self, leds: &[LedState]) -> io::Result<()>;
}

/// Everything the engine needs from one device handle.
pub trait DeviceIo: CapabilitySource + RecordReader + LedWriter {}

impl<T: CapabilitySource + RecordReader + LedWriter> DeviceIo for T {}
