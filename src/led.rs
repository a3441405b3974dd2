//! Keyboard indicator LEDs.
use crate::codes::{LED_CAPSL, LED_NUML, LED_SCROLLL};
use crate::device::{LedState, LedWriter};
use crate::probe::DeviceCaps;
use bitflags::bitflags;
use tracing::trace;

bitflags! {
    /// Lock indicators the seat wants lit.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Leds: u8 {
        const NUM_LOCK = 1 << 0;
        const CAPS_LOCK = 1 << 1;
        const SCROLL_LOCK = 1 << 2;
    }
}

const LED_MAP: [(Leds, u16); 3] = [
    (Leds::NUM_LOCK, LED_NUML),
    (Leds::CAPS_LOCK, LED_CAPSL),
    (Leds::SCROLL_LOCK, LED_SCROLLL),
];

/// Kernel LED states for every mapped indicator, lit or not.
pub fn led_states(leds: Leds) -> [LedState; 3] {
    LED_MAP.map(|(flag, code)| LedState {
        code,
        on: leds.contains(flag),
    })
}

/// Push indicator state to a keyboard. Best effort: write errors are dropped.
pub fn sync_leds<W: LedWriter + ?Sized>(caps: DeviceCaps, writer: &mut W, leds: Leds) {
    if !caps.contains(DeviceCaps::KEYBOARD) {
        return;
    }
    if let Err(e) = writer.write_leds(&led_states(leds)) {
        trace!(error = %e, "[led] write ignored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[derive(Default)]
    struct Recorder {
        writes: Vec<Vec<LedState>>,
        fail: bool,
    }

    impl LedWriter for Recorder {
        fn write_leds(&mut self, leds: &[LedState]) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
            self.writes.push(leds.to_vec());
            Ok(())
        }
    }

    #[test]
    fn every_indicator_is_written() {
        let mut w = Recorder::default();
        sync_leds(DeviceCaps::KEYBOARD, &mut w, Leds::CAPS_LOCK);
        assert_eq!(
            w.writes,
            vec![vec![
                LedState {
                    code: LED_NUML,
                    on: false
                },
                LedState {
                    code: LED_CAPSL,
                    on: true
                },
                LedState {
                    code: LED_SCROLLL,
                    on: false
                },
            ]]
        );
    }

    #[test]
    fn non_keyboards_are_skipped() {
        let mut w = Recorder::default();
        sync_leds(DeviceCaps::BUTTON | DeviceCaps::RELATIVE_MOTION, &mut w, Leds::all());
        assert!(w.writes.is_empty());
    }

    #[test]
    fn write_failure_is_swallowed() {
        let mut w = Recorder {
            fail: true,
            ..Recorder::default()
        };
        sync_leds(DeviceCaps::KEYBOARD, &mut w, Leds::NUM_LOCK);
        assert!(w.writes.is_empty());
    }
}
