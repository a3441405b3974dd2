#![cfg(target_os = "linux")]

//! Linux evdev backend.
//!
//! [`EvdevNode`] wraps an open `/dev/input/eventN` character device and
//! implements the engine's collaborator traits with the `EVIOCG*` ioctl family:
//! - capability bitmaps via `EVIOCGBIT`
//! - axis ranges via `EVIOCGABS`
//! - key state via `EVIOCGKEY`
//! - name / id / properties via `EVIOCGNAME` / `EVIOCGID` / `EVIOCGPROP`
//!
//! Discovery and readiness registration belong to the caller: open the node,
//! hand it to [`DeviceManager::admit`](crate::manager::DeviceManager::admit),
//! and call [`DeviceManager::dispatch`](crate::manager::DeviceManager::dispatch)
//! whenever [`EvdevNode::as_raw_fd`] polls readable.

pub mod evdev_node;

pub use evdev_node::EvdevNode;
