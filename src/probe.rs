//! One-shot device classification from kernel capability bitmaps.
//!
//! [`probe`] runs once when a device is offered to the seat. It decides:
//! - which seat capabilities the device provides ([`DeviceCaps`])
//! - the X/Y ranges used to remap absolute coordinates
//! - whether the device is multitouch
//! - whether a specialized dispatch strategy replaces the fallback one
//! - whether the device is admitted at all
//!
//! Individual queries that fail are treated as "capability absent".

use crate::bits::BitSet;
use crate::codes::*;
use crate::device::CapabilitySource;
use crate::dispatch::SpecializedKind;
use crate::metadata::{DeviceMeta, UNKNOWN_NAME};
use bitflags::bitflags;
use std::fmt;
use tracing::{debug, info};

bitflags! {
    /// Seat capabilities a device contributes.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DeviceCaps: u8 {
        const ABSOLUTE_MOTION = 1 << 0;
        const RELATIVE_MOTION = 1 << 1;
        const BUTTON = 1 << 2;
        const KEYBOARD = 1 << 3;
        const TOUCH = 1 << 4;
    }
}

impl DeviceCaps {
    pub fn is_pointer(self) -> bool {
        self.intersects(Self::ABSOLUTE_MOTION | Self::RELATIVE_MOTION | Self::BUTTON)
    }
}

/// Inclusive `(min, max)` of an absolute axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl AxisRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// `max - min`; zero-width ranges cannot be remapped.
    pub fn width(self) -> i64 {
        i64::from(self.max) - i64::from(self.min)
    }

    /// Linear remap of `raw` onto `[offset, offset + size]`.
    ///
    /// `None` for a zero-width range, or when a value far outside the range
    /// would land outside `i32`.
    pub fn remap(self, raw: i32, offset: i32, size: i32) -> Option<i32> {
        let width = self.width();
        if width == 0 {
            return None;
        }
        let scaled = (i64::from(raw) - i64::from(self.min)) * i64::from(size) / width;
        i32::try_from(scaled + i64::from(offset)).ok()
    }
}

/// Result of a successful probe.
#[derive(Clone, Debug)]
pub struct DeviceProfile {
    pub meta: DeviceMeta,
    pub caps: DeviceCaps,
    pub x_range: Option<AxisRange>,
    pub y_range: Option<AxisRange>,
    pub multitouch: bool,
    /// Set when a specialized strategy should replace the fallback one.
    pub specialized: Option<SpecializedKind>,
}

/// Why a device was not admitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Absolute axes without keys or multitouch (accelerometers and the like).
    UnsupportedDeviceType,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::UnsupportedDeviceType => f.write_str("unsupported device type"),
        }
    }
}

#[derive(Clone, Debug)]
pub enum ProbeOutcome {
    Admit(DeviceProfile),
    Reject {
        meta: DeviceMeta,
        reason: RejectReason,
    },
}

fn axis_range<S: CapabilitySource + ?Sized>(source: &S, code: u16) -> Option<AxisRange> {
    match source.axis_info(code) {
        Ok(info) => Some(AxisRange::new(info.minimum, info.maximum)),
        Err(e) => {
            debug!(code, error = %e, "[probe] axis query failed");
            None
        }
    }
}

fn codes<S: CapabilitySource + ?Sized>(source: &S, ev_type: u16) -> BitSet {
    source.supported_codes(ev_type).unwrap_or_else(|e| {
        debug!(ev_type, error = %e, "[probe] code bitmap query failed");
        BitSet::default()
    })
}

/// Read identity fields; failures leave placeholders.
pub fn read_meta<S: CapabilitySource + ?Sized>(source: &S, devnode: &str) -> DeviceMeta {
    let mut meta = DeviceMeta::new(
        source.name().unwrap_or_else(|_| UNKNOWN_NAME.to_string()),
        devnode,
    );
    meta.id = source.identity().ok();
    meta.properties = source.properties().unwrap_or_default();
    meta
}

/// Classify a device.
pub fn probe<S: CapabilitySource + ?Sized>(source: &S, devnode: &str) -> ProbeOutcome {
    let meta = read_meta(source, devnode);
    let ev_bits = source.supported_event_types().unwrap_or_else(|e| {
        debug!(device = %meta.name, error = %e, "[probe] event type query failed");
        BitSet::default()
    });

    let mut caps = DeviceCaps::empty();
    let mut x_range = None;
    let mut y_range = None;
    let mut multitouch = false;
    let mut specialized = None;

    let has_abs = ev_bits.contains(EV_ABS);
    let has_key = ev_bits.contains(EV_KEY);

    if has_abs {
        let abs_bits = codes(source, EV_ABS);
        if abs_bits.contains(ABS_X) {
            x_range = axis_range(source, ABS_X);
            caps |= DeviceCaps::ABSOLUTE_MOTION;
        }
        if abs_bits.contains(ABS_Y) {
            y_range = axis_range(source, ABS_Y);
            caps |= DeviceCaps::ABSOLUTE_MOTION;
        }
        if abs_bits.contains(ABS_MT_SLOT) {
            x_range = axis_range(source, ABS_MT_POSITION_X);
            y_range = axis_range(source, ABS_MT_POSITION_Y);
            multitouch = true;
            caps |= DeviceCaps::TOUCH;
        }
    }

    if ev_bits.contains(EV_REL) {
        let rel_bits = codes(source, EV_REL);
        if rel_bits.contains(REL_X) || rel_bits.contains(REL_Y) {
            caps |= DeviceCaps::RELATIVE_MOTION;
        }
    }

    if has_key {
        let key_bits = codes(source, EV_KEY);
        if key_bits.contains(BTN_TOOL_FINGER) && !key_bits.contains(BTN_TOOL_PEN) && has_abs {
            specialized = Some(SpecializedKind::Touchpad);
        }
        if key_bits.any_in(KEY_ESC..BTN_MISC) || key_bits.any_in(KEY_OK..KEY_MAX) {
            caps |= DeviceCaps::KEYBOARD;
        }
        if key_bits.any_in(BTN_MISC..KEY_OK) {
            caps |= DeviceCaps::BUTTON;
        }
    }

    if ev_bits.contains(EV_LED) {
        caps |= DeviceCaps::KEYBOARD;
    }

    if has_abs && !has_key && !multitouch {
        info!(
            "input device {}, {} ignored: {}",
            meta.name,
            meta.devnode,
            RejectReason::UnsupportedDeviceType
        );
        return ProbeOutcome::Reject {
            meta,
            reason: RejectReason::UnsupportedDeviceType,
        };
    }

    log_classification(&meta, caps);

    ProbeOutcome::Admit(DeviceProfile {
        meta,
        caps,
        x_range,
        y_range,
        multitouch,
        specialized,
    })
}

const POINTER_CAP_NAMES: [(DeviceCaps, &str); 3] = [
    (DeviceCaps::ABSOLUTE_MOTION, " absolute-motion"),
    (DeviceCaps::RELATIVE_MOTION, " relative-motion"),
    (DeviceCaps::BUTTON, " button"),
];

fn log_classification(meta: &DeviceMeta, caps: DeviceCaps) {
    if caps.is_pointer() {
        let names: String = POINTER_CAP_NAMES
            .iter()
            .filter(|(cap, _)| caps.contains(*cap))
            .map(|(_, name)| *name)
            .collect();
        info!(
            "input device {}, {} is a pointer caps ={}",
            meta.name, meta.devnode, names
        );
    }
    if caps.contains(DeviceCaps::KEYBOARD) {
        info!("input device {}, {} is a keyboard", meta.name, meta.devnode);
    }
    if caps.contains(DeviceCaps::TOUCH) {
        info!("input device {}, {} is a touch device", meta.name, meta.devnode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_input::VirtualEvdev;

    fn admit(dev: &VirtualEvdev) -> DeviceProfile {
        match probe(dev, "/dev/input/test") {
            ProbeOutcome::Admit(profile) => profile,
            ProbeOutcome::Reject { reason, .. } => panic!("rejected: {reason}"),
        }
    }

    #[test]
    fn button_codes_alone_are_not_a_keyboard() {
        let dev = VirtualEvdev::builder("mouse")
            .keys([BTN_LEFT, BTN_RIGHT, BTN_MIDDLE])
            .rel([REL_X, REL_Y, REL_WHEEL])
            .build();
        let profile = admit(&dev);
        assert!(profile.caps.contains(DeviceCaps::BUTTON));
        assert!(profile.caps.contains(DeviceCaps::RELATIVE_MOTION));
        assert!(!profile.caps.contains(DeviceCaps::KEYBOARD));
        assert!(profile.specialized.is_none());
    }

    #[test]
    fn key_codes_above_button_block_count_as_keyboard() {
        let dev = VirtualEvdev::builder("remote").keys([KEY_OK]).build();
        assert!(admit(&dev).caps.contains(DeviceCaps::KEYBOARD));
    }

    #[test]
    fn leds_imply_keyboard() {
        let dev = VirtualEvdev::builder("led panel")
            .leds([LED_NUML, LED_CAPSL])
            .build();
        assert_eq!(admit(&dev).caps, DeviceCaps::KEYBOARD);
    }

    #[test]
    fn accelerometer_is_rejected() {
        let dev = VirtualEvdev::builder("accel")
            .abs(ABS_X, -512, 512)
            .abs(ABS_Y, -512, 512)
            .build();
        match probe(&dev, "/dev/input/event9") {
            ProbeOutcome::Reject { meta, reason } => {
                assert_eq!(reason, RejectReason::UnsupportedDeviceType);
                assert_eq!(meta.name, "accel");
            }
            ProbeOutcome::Admit(_) => panic!("accelerometer admitted"),
        }
    }

    #[test]
    fn multitouch_ranges_replace_single_touch_ones() {
        let dev = VirtualEvdev::builder("touchscreen")
            .abs(ABS_X, 0, 100)
            .abs(ABS_Y, 0, 100)
            .abs(ABS_MT_SLOT, 0, 9)
            .abs(ABS_MT_POSITION_X, 0, 4095)
            .abs(ABS_MT_POSITION_Y, 0, 2047)
            .build();
        let profile = admit(&dev);
        assert!(profile.multitouch);
        assert!(profile.caps.contains(DeviceCaps::TOUCH | DeviceCaps::ABSOLUTE_MOTION));
        assert_eq!(profile.x_range, Some(AxisRange::new(0, 4095)));
        assert_eq!(profile.y_range, Some(AxisRange::new(0, 2047)));
    }

    #[test]
    fn finger_without_pen_selects_touchpad() {
        let dev = VirtualEvdev::builder("touchpad")
            .keys([BTN_LEFT, BTN_TOOL_FINGER, BTN_TOUCH])
            .abs(ABS_X, 0, 1000)
            .abs(ABS_Y, 0, 800)
            .build();
        assert_eq!(admit(&dev).specialized, Some(SpecializedKind::Touchpad));

        let tablet = VirtualEvdev::builder("tablet")
            .keys([BTN_TOOL_FINGER, BTN_TOOL_PEN])
            .abs(ABS_X, 0, 1000)
            .abs(ABS_Y, 0, 800)
            .build();
        assert_eq!(admit(&tablet).specialized, None);
    }

    #[test]
    fn failed_queries_mean_absent_features() {
        let dev = VirtualEvdev::builder("flaky")
            .keys([KEY_A])
            .rel([REL_X])
            .fail_codes(EV_KEY)
            .fail_name()
            .build();
        let profile = admit(&dev);
        assert_eq!(profile.meta.name, UNKNOWN_NAME);
        assert_eq!(profile.caps, DeviceCaps::RELATIVE_MOTION);
    }

    #[test]
    fn remap_guards_zero_width() {
        assert_eq!(AxisRange::new(5, 5).remap(5, 0, 100), None);
        assert_eq!(AxisRange::new(0, 1000).remap(500, 10, 200), Some(110));
        assert_eq!(AxisRange::new(-100, 100).remap(-100, 0, 640), Some(0));
    }

    #[test]
    fn remap_refuses_values_outside_i32() {
        let narrow = AxisRange::new(0, 1);
        assert_eq!(narrow.remap(i32::MAX, 0, i32::MAX), None);
        assert_eq!(narrow.remap(i32::MIN, 0, i32::MAX), None);
        // out of range but still representable
        assert_eq!(AxisRange::new(0, 100).remap(200, 10, 100), Some(210));
    }
}
