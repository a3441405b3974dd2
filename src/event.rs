//! Raw records and seat notifications.
//!
//! The engine consumes [`RawRecord`]s (one kernel `struct input_event` each) and
//! produces [`Notification`]s, the small set of semantic changes a seat consumer
//! understands.
//!
//! ## Value conventions
//! - **Coordinates and deltas** are [`Fixed`] 24.8 values. Absolute coordinates
//!   are already remapped into the output viewport (screen space).
//! - **Buttons / keys:** `pressed` is `true` for press and `false` for release.
//!   Kernel auto-repeat (`value == 2`) never reaches the consumer.
//! - **Scroll axes:** one wheel detent is one step (10 logical units by default);
//!   vertical scroll is positive when scrolling down.
//! - **Time:** milliseconds derived from the record timestamp
//!   (`sec * 1000 + usec / 1000`), wrapping at `u32::MAX`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One kernel input record.
///
/// Decoded from the native 64-bit Linux `struct input_event` layout:
/// `timeval { i64 sec, i64 usec }`, `u16 type`, `u16 code`, `i32 value`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub sec: u64,
    pub usec: u32,
    /// Event type (`EV_*`).
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl RawRecord {
    /// Size of one record on the wire.
    pub const SIZE: usize = 24;

    pub fn new(kind: u16, code: u16, value: i32) -> Self {
        Self {
            kind,
            code,
            value,
            ..Self::default()
        }
    }

    /// Same record stamped with a timestamp.
    pub fn at(mut self, sec: u64, usec: u32) -> Self {
        self.sec = sec;
        self.usec = usec;
        self
    }

    /// Millisecond timestamp handed to the seat.
    pub fn time_ms(&self) -> u32 {
        self.sec
            .wrapping_mul(1000)
            .wrapping_add(u64::from(self.usec / 1000)) as u32
    }

    /// Decode one record from exactly [`RawRecord::SIZE`] bytes.
    pub fn from_bytes(chunk: &[u8; Self::SIZE]) -> Self {
        let sec = i64::from_ne_bytes(chunk[0..8].try_into().unwrap_or_default());
        let usec = i64::from_ne_bytes(chunk[8..16].try_into().unwrap_or_default());
        Self {
            sec: sec as u64,
            usec: usec as u32,
            kind: u16::from_ne_bytes([chunk[16], chunk[17]]),
            code: u16::from_ne_bytes([chunk[18], chunk[19]]),
            value: i32::from_ne_bytes([chunk[20], chunk[21], chunk[22], chunk[23]]),
        }
    }

    /// Encode into the kernel layout (used for LED writes and scripted devices).
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..8].copy_from_slice(&(self.sec as i64).to_ne_bytes());
        out[8..16].copy_from_slice(&i64::from(self.usec).to_ne_bytes());
        out[16..18].copy_from_slice(&self.kind.to_ne_bytes());
        out[18..20].copy_from_slice(&self.code.to_ne_bytes());
        out[20..24].copy_from_slice(&self.value.to_ne_bytes());
        out
    }
}

impl fmt::Display for RawRecord {
    /// evemu-style line: `E: sec.usec type code value`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "E: {}.{:06} {:04x} {:04x} {}",
            self.sec, self.usec, self.kind, self.code, self.value
        )
    }
}

/// Decode a burst buffer into records.
///
/// Returns `None` when `bytes` is not a whole number of records; the caller
/// treats that as fatal for the device rather than decoding a partial record.
pub fn decode_burst(bytes: &[u8]) -> Option<Vec<RawRecord>> {
    if bytes.len() % RawRecord::SIZE != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(RawRecord::SIZE)
            .filter_map(|chunk| <&[u8; RawRecord::SIZE]>::try_from(chunk).ok())
            .map(RawRecord::from_bytes)
            .collect(),
    )
}

/// Signed 24.8 fixed-point number, the unit of every coordinate the seat sees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fixed(i32);

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);

    pub const fn from_int(v: i32) -> Self {
        Fixed(v.wrapping_mul(256))
    }

    pub fn from_f64(v: f64) -> Self {
        Fixed((v * 256.0) as i32)
    }

    pub const fn from_raw(raw: i32) -> Self {
        Fixed(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Integer part, truncated toward zero.
    pub const fn to_int(self) -> i32 {
        self.0 / 256
    }

    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / 256.0
    }
}

impl std::ops::Add for Fixed {
    type Output = Fixed;
    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0.wrapping_add(rhs.0))
    }
}

impl std::ops::AddAssign for Fixed {
    fn add_assign(&mut self, rhs: Fixed) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

impl std::ops::Mul<i32> for Fixed {
    type Output = Fixed;
    fn mul(self, rhs: i32) -> Fixed {
        Fixed(self.0.wrapping_mul(rhs))
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_f64())
    }
}

/// Scroll axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisKind {
    VerticalScroll,
    HorizontalScroll,
}

/// Phase of a multitouch contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TouchPhase {
    Down,
    Motion,
    Up,
}

/// One semantic change delivered to the seat.
///
/// This is the owned mirror of the [`SeatSink`](crate::sink::SeatSink) calls,
/// produced by [`NotificationLog`](crate::sink::NotificationLog).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// Relative pointer motion.
    Motion { time: u32, dx: Fixed, dy: Fixed },
    /// Absolute pointer position in screen space.
    MotionAbsolute { time: u32, x: Fixed, y: Fixed },
    /// Pointer button edge (`BTN_LEFT` .. `BTN_TASK`).
    Button { time: u32, code: u16, pressed: bool },
    /// Keyboard key edge (any other `EV_KEY` code).
    Key { time: u32, code: u16, pressed: bool },
    /// Discrete scroll step.
    Axis {
        time: u32,
        axis: AxisKind,
        value: Fixed,
    },
    /// Multitouch contact change.
    Touch {
        time: u32,
        slot: usize,
        x: Fixed,
        y: Fixed,
        phase: TouchPhase,
    },
    /// Keys already held down when the seat gained keyboard focus.
    KeyboardFocusIn { keys: Vec<u32> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_bytes_follow_kernel_layout() {
        let rec = RawRecord::new(3, 0x35, -7).at(12, 345_678);
        let bytes = rec.to_bytes();
        assert_eq!(&bytes[16..18], &3u16.to_ne_bytes());
        assert_eq!(RawRecord::from_bytes(&bytes), rec);
    }

    #[test]
    fn misaligned_burst_is_refused() {
        let mut buf = RawRecord::new(1, 30, 1).to_bytes().to_vec();
        buf.push(0);
        assert!(decode_burst(&buf).is_none());
        assert_eq!(decode_burst(&buf[..RawRecord::SIZE]).map(|v| v.len()), Some(1));
        assert_eq!(decode_burst(&[]).map(|v| v.len()), Some(0));
    }

    #[test]
    fn millisecond_time() {
        assert_eq!(RawRecord::default().at(2, 5_999).time_ms(), 2_005);
    }

    #[test]
    fn fixed_point_units() {
        assert_eq!(Fixed::from_int(10).raw(), 2560);
        assert_eq!((Fixed::from_int(3) * -1).to_int(), -3);
        assert_eq!(Fixed::from_f64(1.5).to_f64(), 1.5);
    }

    #[test]
    fn display_is_evemu_line() {
        let rec = RawRecord::new(2, 0, 5).at(1, 42);
        assert_eq!(rec.to_string(), "E: 1.000042 0002 0000 5");
    }
}
