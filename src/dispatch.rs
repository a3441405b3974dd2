//! Per-device dispatch strategy and its transition table.
//!
//! A device is in exactly one [`DispatchState`] at a time:
//!
//! | state        | record                 | next        | effect          |
//! |--------------|------------------------|-------------|-----------------|
//! | Fallback     | `EV_SYN / SYN_DROPPED` | SynDrop     | warning logged  |
//! | SynDrop      | `EV_SYN / SYN_REPORT`  | Fallback    | key-state resync|
//! | Specialized  | anything               | Specialized | none            |
//!
//! Every other (state, record) pair keeps the state. While in `SynDrop` the
//! records are discarded; in `Fallback` they go to the normalizer; in
//! `Specialized` they go to the device's [`SpecializedDispatch`].

use crate::codes::{EV_SYN, SYN_DROPPED, SYN_REPORT};
use crate::event::RawRecord;
use crate::probe::DeviceProfile;
use crate::sink::SeatSink;

/// Alternate decode paths selected once at admission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpecializedKind {
    /// Finger-tool absolute devices without a pen tool.
    Touchpad,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DispatchState {
    #[default]
    Fallback,
    SynDrop,
    Specialized(SpecializedKind),
}

/// Side effect requested by a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The kernel dropped records; stop decoding until the next report.
    EnteredSynDrop,
    /// A genuine `SYN_REPORT` ended the drop; re-read key state.
    Resync,
}

/// What the controller decided for one record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Decode the record with the fallback normalizer.
    Decode,
    /// Hand the record to the specialized strategy.
    Specialized,
    /// Discard the record, optionally performing a transition.
    Consume(Option<Transition>),
}

impl DispatchState {
    /// Pure transition function.
    pub fn next(self, record: &RawRecord) -> (DispatchState, Step) {
        let is_syn = record.kind == EV_SYN;
        match self {
            DispatchState::Fallback if is_syn && record.code == SYN_DROPPED => (
                DispatchState::SynDrop,
                Step::Consume(Some(Transition::EnteredSynDrop)),
            ),
            DispatchState::Fallback => (self, Step::Decode),
            DispatchState::SynDrop if is_syn && record.code == SYN_REPORT => (
                DispatchState::Fallback,
                Step::Consume(Some(Transition::Resync)),
            ),
            DispatchState::SynDrop => (self, Step::Consume(None)),
            DispatchState::Specialized(_) => (self, Step::Specialized),
        }
    }
}

/// Alternate decoder owned by one device.
///
/// Implementations receive every record of a burst in order and emit into the
/// seat themselves; `frame_end` is called once after each burst.
pub trait SpecializedDispatch {
    fn kind(&self) -> SpecializedKind;
    fn process(&mut self, record: &RawRecord, time: u32, sink: &mut dyn SeatSink);
    fn frame_end(&mut self, _time: u32, _sink: &mut dyn SeatSink) {}
}

/// Factory for specialized strategies, consulted at admission.
///
/// Returning `None` keeps the device on the fallback strategy.
pub type SpecializedProvider =
    Box<dyn Fn(SpecializedKind, &DeviceProfile) -> Option<Box<dyn SpecializedDispatch>>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::*;

    fn syn(code: u16) -> RawRecord {
        RawRecord::new(EV_SYN, code, 0)
    }

    #[test]
    fn drop_and_recover() {
        let (state, step) = DispatchState::Fallback.next(&syn(SYN_DROPPED));
        assert_eq!(state, DispatchState::SynDrop);
        assert_eq!(step, Step::Consume(Some(Transition::EnteredSynDrop)));

        let (state, step) = state.next(&RawRecord::new(EV_KEY, KEY_A, 1));
        assert_eq!((state, step), (DispatchState::SynDrop, Step::Consume(None)));

        let (state, step) = state.next(&syn(SYN_REPORT));
        assert_eq!(state, DispatchState::Fallback);
        assert_eq!(step, Step::Consume(Some(Transition::Resync)));
    }

    #[test]
    fn syn_drop_exit_requires_syn_type() {
        // REL_X shares the numeric code of SYN_REPORT.
        let rel = RawRecord::new(EV_REL, REL_X, 3);
        assert_eq!(
            DispatchState::SynDrop.next(&rel),
            (DispatchState::SynDrop, Step::Consume(None))
        );
        assert_eq!(
            DispatchState::SynDrop.next(&syn(SYN_DROPPED)),
            (DispatchState::SynDrop, Step::Consume(None))
        );
    }

    #[test]
    fn fallback_decodes_reports() {
        assert_eq!(
            DispatchState::Fallback.next(&syn(SYN_REPORT)),
            (DispatchState::Fallback, Step::Decode)
        );
    }

    #[test]
    fn specialized_never_transitions() {
        let state = DispatchState::Specialized(SpecializedKind::Touchpad);
        for rec in [syn(SYN_DROPPED), syn(SYN_REPORT)] {
            assert_eq!(state.next(&rec), (state, Step::Specialized));
        }
    }
}
