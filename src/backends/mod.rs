//! Device backends for `evseat`.
//!
//! Implementations of the collaborator traits in [`device`](crate::device).
//!
//! # Feature flags
//! - **`evdev`**: enables the Linux `/dev/input/eventN` backend (default).
//!
//! The in-memory [`virtual_input::VirtualEvdev`] is always available; it is what
//! tests and record/replay harnesses drive the engine with.
//!
//! evseat reads input devices; it does not enumerate them or create virtual
//! kernel devices (uinput).

#[cfg(all(feature = "evdev", target_os = "linux"))]
#[cfg_attr(docsrs, doc(cfg(all(feature = "evdev", target_os = "linux"))))]
pub mod linux;

pub mod virtual_input;
