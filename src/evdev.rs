//! The per-device engine: decode, coalesce, flush, resync.
//!
//! [`EvdevDevice`] owns one admitted device. Each readiness callback calls
//! [`EvdevDevice::dispatch_readable`], which drains the device in bursts of at
//! most `burst_capacity` records and feeds every burst through
//! [`EvdevDevice::process_burst`].
//!
//! ## Flush points
//! The seat never sees individual records. Decoded motion is accumulated as
//! pending state and turned into notifications:
//! - right before a non-motion record is handled, if motion is pending, and
//! - once at the end of every burst.
//!
//! A touch down or up on its own does not force a flush, so records such as
//! `ABS_MT_TOOL_TYPE` between the tracking id and the position of a new contact
//! do not split the down from its coordinates.
//!
//! A flush emits, in order: relative motion, touch downs, touch motions,
//! touch ups, absolute motion. Keys, buttons and scroll steps are emitted as
//! soon as they are decoded, which is always after the flush that precedes
//! them.

use crate::bits::BitSet;
use crate::codes::*;
use crate::config::{Calibration, SeatConfig, Viewport};
use crate::device::DeviceIo;
use crate::dispatch::{DispatchState, SpecializedDispatch, Step, Transition};
use crate::error::EngineError;
use crate::event::{decode_burst, AxisKind, Fixed, RawRecord, TouchPhase};
use crate::led::{sync_leds, Leds};
use crate::metadata::DeviceMeta;
use crate::probe::{AxisRange, DeviceCaps, DeviceProfile};
use crate::sink::SeatSink;
use crate::slots::{SlotPending, SlotTable};
use bitflags::bitflags;
use std::io;
use tracing::{debug, trace, warn};

bitflags! {
    /// Device-wide motion waiting for the next flush.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Pending: u8 {
        const RELATIVE_MOTION = 1 << 0;
        const ABSOLUTE_MOTION = 1 << 1;
    }
}

pub struct EvdevDevice {
    meta: DeviceMeta,
    caps: DeviceCaps,
    x_range: Option<AxisRange>,
    y_range: Option<AxisRange>,
    multitouch: bool,
    calibration: Option<Calibration>,
    viewport: Viewport,
    axis_step: Fixed,

    state: DispatchState,
    specialized: Option<Box<dyn SpecializedDispatch>>,

    pending: Pending,
    rel_dx: Fixed,
    rel_dy: Fixed,
    abs_x: i32,
    abs_y: i32,
    slots: SlotTable,
    resyncs: u64,

    io: Box<dyn DeviceIo>,
    buf: Vec<u8>,
    span: tracing::Span,
}

impl EvdevDevice {
    /// Build the device record from a successful probe.
    ///
    /// `specialized` is installed only when the profile asked for the matching
    /// kind; otherwise the device runs the fallback strategy.
    pub fn new(
        profile: DeviceProfile,
        io: Box<dyn DeviceIo>,
        config: &SeatConfig,
        specialized: Option<Box<dyn SpecializedDispatch>>,
    ) -> Self {
        let specialized = match (profile.specialized, specialized) {
            (Some(kind), Some(dispatch)) if dispatch.kind() == kind => Some(dispatch),
            (Some(kind), _) => {
                warn!(
                    device = %profile.meta.name,
                    ?kind,
                    "no specialized dispatch available, using fallback"
                );
                None
            }
            (None, _) => None,
        };
        let state = match &specialized {
            Some(dispatch) => DispatchState::Specialized(dispatch.kind()),
            None => DispatchState::Fallback,
        };
        let span = tracing::info_span!(
            "evdev",
            device = %profile.meta.name,
            devnode = %profile.meta.devnode
        );

        Self {
            calibration: config.calibration_for(&profile.meta.name),
            meta: profile.meta,
            caps: profile.caps,
            x_range: profile.x_range,
            y_range: profile.y_range,
            multitouch: profile.multitouch,
            viewport: config.viewport,
            axis_step: Fixed::from_int(config.axis_step),
            state,
            specialized,
            pending: Pending::empty(),
            rel_dx: Fixed::ZERO,
            rel_dy: Fixed::ZERO,
            abs_x: 0,
            abs_y: 0,
            slots: SlotTable::new(),
            resyncs: 0,
            io,
            buf: vec![0; config.burst_capacity.max(1) * RawRecord::SIZE],
            span,
        }
    }

    pub fn meta(&self) -> &DeviceMeta {
        &self.meta
    }

    pub fn caps(&self) -> DeviceCaps {
        self.caps
    }

    pub fn is_multitouch(&self) -> bool {
        self.multitouch
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn pending(&self) -> Pending {
        self.pending
    }

    /// Accumulated, not yet emitted relative motion.
    pub fn relative_delta(&self) -> (Fixed, Fixed) {
        (self.rel_dx, self.rel_dy)
    }

    /// Last remapped absolute position (before calibration).
    pub fn absolute_position(&self) -> (i32, i32) {
        (self.abs_x, self.abs_y)
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    /// Number of key-state resyncs performed after `SYN_DROPPED`.
    pub fn resync_count(&self) -> u64 {
        self.resyncs
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn set_calibration(&mut self, calibration: Option<Calibration>) {
        self.calibration = calibration;
    }

    /// Current pressed-key bitmap straight from the kernel.
    pub fn key_state(&self) -> io::Result<BitSet> {
        self.io.key_state()
    }

    /// Best-effort indicator update; no-op for non-keyboards.
    pub fn update_leds(&mut self, leds: Leds) {
        sync_leds(self.caps, &mut *self.io, leds);
    }

    /// Drain everything the device has ready, burst by burst.
    ///
    /// Returns the number of records processed. A read error (other than
    /// `WouldBlock`) or a byte count that is not a whole number of records is
    /// fatal for the device.
    pub fn dispatch_readable(&mut self, sink: &mut dyn SeatSink) -> Result<usize, EngineError> {
        let span = self.span.clone();
        let _enter = span.enter();
        let mut total = 0;

        loop {
            let len = match self.io.read_records(&mut self.buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(EngineError::Read {
                        device: self.meta.name.clone(),
                        source,
                    })
                }
            };
            let records = self
                .buf
                .get(..len)
                .and_then(decode_burst)
                .ok_or_else(|| EngineError::MisalignedRead {
                    device: self.meta.name.clone(),
                    len,
                    record: RawRecord::SIZE,
                })?;

            trace!(records = records.len(), "[evdev] burst");
            total += records.len();
            self.process_burst(&records, sink);
        }

        Ok(total)
    }

    /// Run one burst through the dispatch controller and flush at the end.
    pub fn process_burst(&mut self, records: &[RawRecord], sink: &mut dyn SeatSink) {
        let mut time = 0;

        for rec in records {
            time = rec.time_ms();

            #[cfg(feature = "debug-log")]
            trace!("{rec}");

            if !is_motion(rec.kind, rec.code) && self.has_pending_motion() {
                self.flush(time, sink);
            }

            let (next, step) = self.state.next(rec);
            self.state = next;
            match step {
                Step::Decode => self.decode(rec, time, sink),
                Step::Specialized => {
                    if let Some(dispatch) = self.specialized.as_mut() {
                        dispatch.process(rec, time, sink);
                    }
                }
                Step::Consume(Some(Transition::EnteredSynDrop)) => {
                    warn!(time, device = %self.meta.name, "syn drop, discarding until next report");
                }
                Step::Consume(Some(Transition::Resync)) => self.resync(),
                Step::Consume(None) => {}
            }
        }

        self.flush(time, sink);
        if let Some(dispatch) = self.specialized.as_mut() {
            dispatch.frame_end(time, sink);
        }
    }

    fn decode(&mut self, rec: &RawRecord, time: u32, sink: &mut dyn SeatSink) {
        match rec.kind {
            EV_KEY => self.decode_key(rec, time, sink),
            EV_REL => self.decode_relative(rec, time, sink),
            EV_ABS if self.multitouch => self.decode_touch(rec),
            EV_ABS => self.decode_absolute(rec),
            _ => {}
        }
    }

    fn decode_key(&mut self, rec: &RawRecord, time: u32, sink: &mut dyn SeatSink) {
        if rec.value == 2 {
            return;
        }
        let pressed = rec.value != 0;
        if POINTER_BUTTONS.contains(&rec.code) {
            sink.button(time, rec.code, pressed);
        } else {
            sink.key(time, rec.code, pressed);
        }
    }

    fn decode_relative(&mut self, rec: &RawRecord, time: u32, sink: &mut dyn SeatSink) {
        match rec.code {
            REL_X => {
                self.rel_dx += Fixed::from_int(rec.value);
                self.pending |= Pending::RELATIVE_MOTION;
            }
            REL_Y => {
                self.rel_dy += Fixed::from_int(rec.value);
                self.pending |= Pending::RELATIVE_MOTION;
            }
            REL_WHEEL if matches!(rec.value, -1 | 1) => {
                sink.axis(time, AxisKind::VerticalScroll, self.axis_step * -rec.value);
            }
            REL_HWHEEL if matches!(rec.value, -1 | 1) => {
                sink.axis(time, AxisKind::HorizontalScroll, self.axis_step * rec.value);
            }
            _ => {}
        }
    }

    fn decode_absolute(&mut self, rec: &RawRecord) {
        match rec.code {
            ABS_X => {
                if let Some(x) = self.remap_x(rec.value) {
                    self.abs_x = x;
                    self.pending |= Pending::ABSOLUTE_MOTION;
                }
            }
            ABS_Y => {
                if let Some(y) = self.remap_y(rec.value) {
                    self.abs_y = y;
                    self.pending |= Pending::ABSOLUTE_MOTION;
                }
            }
            _ => {}
        }
    }

    fn decode_touch(&mut self, rec: &RawRecord) {
        match rec.code {
            ABS_MT_SLOT => {
                self.slots.select(rec.value);
            }
            ABS_MT_TRACKING_ID => self.slots.set_tracking_id(rec.value),
            ABS_MT_POSITION_X => {
                if let Some(x) = self.remap_x(rec.value) {
                    self.slots.set_x(x);
                }
            }
            ABS_MT_POSITION_Y => {
                if let Some(y) = self.remap_y(rec.value) {
                    self.slots.set_y(y);
                }
            }
            _ => {}
        }
    }

    fn remap_x(&self, raw: i32) -> Option<i32> {
        self.x_range?
            .remap(raw, self.viewport.x, self.viewport.width)
    }

    fn remap_y(&self, raw: i32) -> Option<i32> {
        self.y_range?
            .remap(raw, self.viewport.y, self.viewport.height)
    }

    /// Calibration only applies with a configured matrix and usable ranges.
    fn calibrated(&self, x: i32, y: i32) -> (i32, i32) {
        let usable = |r: Option<AxisRange>| r.is_some_and(|r| r.width() != 0);
        match self.calibration {
            Some(cal) if usable(self.x_range) && usable(self.y_range) => cal.apply(x, y),
            _ => (x, y),
        }
    }

    /// Coordinates that a non-motion record must not overtake.
    ///
    /// Touch downs and ups alone do not count: a position update later in the
    /// same frame still has to land in the down notification.
    fn has_pending_motion(&self) -> bool {
        !self.pending.is_empty() || self.slots.has_pending_motion()
    }

    fn flush(&mut self, time: u32, sink: &mut dyn SeatSink) {
        if self.pending.is_empty() && !self.slots.has_pending() {
            return;
        }

        if self.pending.contains(Pending::RELATIVE_MOTION) {
            sink.motion(time, self.rel_dx, self.rel_dy);
            self.rel_dx = Fixed::ZERO;
            self.rel_dy = Fixed::ZERO;
        }

        for (index, slot) in self.slots.iter_mut() {
            if slot.pending.contains(SlotPending::DOWN) {
                let (x, y) = (Fixed::from_int(slot.x), Fixed::from_int(slot.y));
                sink.touch(time, index, x, y, TouchPhase::Down);
                slot.pending.remove(SlotPending::DOWN | SlotPending::MOTION);
            }
        }
        for (index, slot) in self.slots.iter_mut() {
            if slot.pending.contains(SlotPending::MOTION) {
                let (x, y) = (Fixed::from_int(slot.x), Fixed::from_int(slot.y));
                sink.touch(time, index, x, y, TouchPhase::Motion);
                slot.pending.remove(SlotPending::MOTION);
            }
        }
        for (index, slot) in self.slots.iter_mut() {
            if slot.pending.contains(SlotPending::UP) {
                sink.touch(time, index, Fixed::ZERO, Fixed::ZERO, TouchPhase::Up);
                slot.pending.remove(SlotPending::UP);
            }
        }

        if self.pending.contains(Pending::ABSOLUTE_MOTION) {
            let (x, y) = self.calibrated(self.abs_x, self.abs_y);
            sink.motion_absolute(time, Fixed::from_int(x), Fixed::from_int(y));
        }

        self.pending = Pending::empty();
    }

    fn resync(&mut self) {
        self.resyncs += 1;
        match self.io.key_state() {
            Ok(keys) => {
                debug!(device = %self.meta.name, pressed = ?keys, "[evdev] key state resynced")
            }
            Err(e) => {
                warn!(device = %self.meta.name, error = %e, "[evdev] key state resync failed")
            }
        }
    }
}

impl std::fmt::Debug for EvdevDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevDevice")
            .field("meta", &self.meta)
            .field("caps", &self.caps)
            .field("state", &self.state)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
