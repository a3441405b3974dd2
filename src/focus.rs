//! Keyboard focus hand-off.
//!
//! When the seat's keyboard focus moves, the new target never saw the presses
//! of keys that are still held. [`notify_keyboard_focus`] asks every device on
//! the seat for its kernel key state and reports the union once.

use crate::bits::BitSet;
use crate::codes::KEY_CNT;
use crate::evdev::EvdevDevice;
use crate::sink::SeatSink;
use tracing::warn;

/// Union of the pressed-key bitmaps of `devices`, as sorted key codes.
///
/// Devices whose key state cannot be read are skipped.
pub fn pressed_keys<'a>(devices: impl IntoIterator<Item = &'a EvdevDevice>) -> Vec<u32> {
    let mut all = BitSet::with_capacity(KEY_CNT);
    for device in devices {
        match device.key_state() {
            Ok(keys) => all.union_with(&keys),
            Err(e) => warn!(
                devnode = %device.meta().devnode,
                error = %e,
                "failed to get keys for device"
            ),
        }
    }
    all.iter()
        .filter(|code| (*code as usize) < KEY_CNT)
        .map(u32::from)
        .collect()
}

/// Emit exactly one `keyboard_focus_in` with the keys held on any device.
pub fn notify_keyboard_focus<'a>(
    devices: impl IntoIterator<Item = &'a EvdevDevice>,
    sink: &mut dyn SeatSink,
) -> Vec<u32> {
    let keys = pressed_keys(devices);
    sink.keyboard_focus_in(&keys);
    keys
}
