//! evseat: evdev input normalization for compositor seats.
//!
//! Reads kernel `input_event` records from admitted devices, folds each burst
//! into relative/absolute pointer motion, buttons, wheel axes, keys and
//! multi-touch frames, and delivers them to a [`SeatSink`].

pub mod backends;
pub mod bits;
pub mod codes;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod evdev;
pub mod event;
pub mod focus;
pub mod led;
pub mod logger;
pub mod manager;
pub mod metadata;
pub mod probe;
pub mod sink;
pub mod slots;
pub mod snapshot;

pub use config::*;
pub use device::*;
pub use error::*;
pub use event::*;
pub use manager::*;
pub use sink::*;

pub use dispatch::{DispatchState, SpecializedDispatch, SpecializedKind};
pub use evdev::EvdevDevice;
pub use led::Leds;
pub use logger::LogSink;
pub use probe::{DeviceCaps, ProbeOutcome, RejectReason};
pub use snapshot::{DeviceStatus, Snapshot};
