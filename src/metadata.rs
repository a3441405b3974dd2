//! Device metadata snapshot.
//!
//! [`DeviceMeta`] is a lightweight, cloneable description of a device suitable
//! for logging and diagnostics. The prober fills what the kernel reports;
//! anything that could not be read stays at its placeholder.
//!
//! # Conventions
//! - `name` falls back to `"unknown"` when `EVIOCGNAME` fails.
//! - `devnode` is the path the consumer opened (opaque, diagnostic only).
//! - `id` is the `EVIOCGID` tuple, or `None` if it could not be read.

use crate::bits::BitSet;
use crate::device::InputId;

/// Placeholder used when a device does not report its name.
pub const UNKNOWN_NAME: &str = "unknown";

#[derive(Clone, Debug)]
pub struct DeviceMeta {
    /// Kernel-reported device name.
    pub name: String,

    /// Device node path, e.g. `/dev/input/event3`.
    pub devnode: String,

    /// Bus / vendor / product / version, if known.
    pub id: Option<InputId>,

    /// `INPUT_PROP_*` bitmap, empty when unavailable.
    pub properties: BitSet,
}

impl DeviceMeta {
    pub fn new(name: impl Into<String>, devnode: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            devnode: devnode.into(),
            id: None,
            properties: BitSet::default(),
        }
    }
}

impl Default for DeviceMeta {
    fn default() -> Self {
        Self::new(UNKNOWN_NAME, "")
    }
}

impl std::fmt::Display for DeviceMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(
                f,
                "{} ({}) [{:04x}:{:04x}]",
                self.name, self.devnode, id.vendor, id.product
            ),
            None => write!(f, "{} ({})", self.name, self.devnode),
        }
    }
}
