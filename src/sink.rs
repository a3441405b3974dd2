//! The seat side of the engine.
//!
//! [`SeatSink`] is the collaborator that receives normalized input. A
//! compositor implements it on its seat object; tests and replay tools use
//! [`NotificationLog`], which records every call as a [`Notification`].

use crate::event::{AxisKind, Fixed, Notification, TouchPhase};

/// Receiver of normalized seat notifications.
///
/// Calls arrive only at flush points, in the order the engine guarantees:
/// relative motion, touch down, touch motion, touch up, absolute motion.
/// Buttons, keys and scroll steps are delivered as soon as they are decoded,
/// after any motion that preceded them.
pub trait SeatSink {
    fn motion(&mut self, time: u32, dx: Fixed, dy: Fixed);
    fn motion_absolute(&mut self, time: u32, x: Fixed, y: Fixed);
    fn button(&mut self, time: u32, code: u16, pressed: bool);
    fn key(&mut self, time: u32, code: u16, pressed: bool);
    fn axis(&mut self, time: u32, axis: AxisKind, value: Fixed);
    fn touch(&mut self, time: u32, slot: usize, x: Fixed, y: Fixed, phase: TouchPhase);
    fn keyboard_focus_in(&mut self, keys: &[u32]);
}

/// Sink that keeps every notification in arrival order.
#[derive(Clone, Debug, Default)]
pub struct NotificationLog {
    events: Vec<Notification>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Notification] {
        &self.events
    }

    /// Take the recorded notifications, leaving the log empty.
    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Serialize the log as a JSON array, for diffing traces by hand.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.events)
    }
}

impl SeatSink for NotificationLog {
    fn motion(&mut self, time: u32, dx: Fixed, dy: Fixed) {
        self.events.push(Notification::Motion { time, dx, dy });
    }

    fn motion_absolute(&mut self, time: u32, x: Fixed, y: Fixed) {
        self.events.push(Notification::MotionAbsolute { time, x, y });
    }

    fn button(&mut self, time: u32, code: u16, pressed: bool) {
        self.events.push(Notification::Button {
            time,
            code,
            pressed,
        });
    }

    fn key(&mut self, time: u32, code: u16, pressed: bool) {
        self.events.push(Notification::Key {
            time,
            code,
            pressed,
        });
    }

    fn axis(&mut self, time: u32, axis: AxisKind, value: Fixed) {
        self.events.push(Notification::Axis { time, axis, value });
    }

    fn touch(&mut self, time: u32, slot: usize, x: Fixed, y: Fixed, phase: TouchPhase) {
        self.events.push(Notification::Touch {
            time,
            slot,
            x,
            y,
            phase,
        });
    }

    fn keyboard_focus_in(&mut self, keys: &[u32]) {
        self.events.push(Notification::KeyboardFocusIn {
            keys: keys.to_vec(),
        });
    }
}
