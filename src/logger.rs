//! A sink decorator that logs every notification before forwarding it.
use crate::event::{AxisKind, Fixed, TouchPhase};
use crate::sink::SeatSink;
use tracing::debug;

/// Logs each notification at `debug` level, then hands it to `inner`.
pub struct LogSink<S> {
    inner: S,
}

impl<S: SeatSink> LogSink<S> {
    pub fn new(inner: S) -> Self {
        LogSink { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: SeatSink> SeatSink for LogSink<S> {
    fn motion(&mut self, time: u32, dx: Fixed, dy: Fixed) {
        debug!(time, %dx, %dy, "[seat] motion");
        self.inner.motion(time, dx, dy);
    }

    fn motion_absolute(&mut self, time: u32, x: Fixed, y: Fixed) {
        debug!(time, %x, %y, "[seat] motion_absolute");
        self.inner.motion_absolute(time, x, y);
    }

    fn button(&mut self, time: u32, code: u16, pressed: bool) {
        debug!(time, code, pressed, "[seat] button");
        self.inner.button(time, code, pressed);
    }

    fn key(&mut self, time: u32, code: u16, pressed: bool) {
        debug!(time, code, pressed, "[seat] key");
        self.inner.key(time, code, pressed);
    }

    fn axis(&mut self, time: u32, axis: AxisKind, value: Fixed) {
        debug!(time, ?axis, %value, "[seat] axis");
        self.inner.axis(time, axis, value);
    }

    fn touch(&mut self, time: u32, slot: usize, x: Fixed, y: Fixed, phase: TouchPhase) {
        debug!(time, slot, %x, %y, ?phase, "[seat] touch");
        self.inner.touch(time, slot, x, y, phase);
    }

    fn keyboard_focus_in(&mut self, keys: &[u32]) {
        debug!(?keys, "[seat] keyboard_focus_in");
        self.inner.keyboard_focus_in(keys);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Notification;
    use crate::sink::NotificationLog;

    #[test]
    fn forwards_unchanged() {
        let mut sink = LogSink::new(NotificationLog::new());
        sink.key(7, 30, true);
        sink.keyboard_focus_in(&[30, 48]);
        let log = sink.into_inner();
        assert_eq!(
            log.events(),
            &[
                Notification::Key {
                    time: 7,
                    code: 30,
                    pressed: true
                },
                Notification::KeyboardFocusIn { keys: vec![30, 48] },
            ]
        );
    }
}
