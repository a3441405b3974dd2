//! Scripted in-memory evdev device.
//!
//! [`VirtualEvdev`] implements every collaborator trait without touching the
//! kernel, so the engine can be driven from tests and replay tools. Build it
//! with [`VirtualEvdev::builder`], keep a [`VirtualHandle`] to feed records and
//! inspect side effects after the device has been handed to the seat.
//!
//! Reads behave like a non-blocking descriptor: queued bytes are returned in
//! chunks no larger than the caller's buffer, and an empty queue reports
//! [`io::ErrorKind::WouldBlock`].

use crate::bits::BitSet;
use crate::codes::*;
use crate::device::{AbsInfo, CapabilitySource, InputId, LedState, LedWriter, RecordReader};
use crate::event::RawRecord;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::rc::Rc;

enum Chunk {
    Bytes(Vec<u8>),
    Error(io::ErrorKind),
}

#[derive(Default)]
struct Shared {
    queue: VecDeque<Chunk>,
    pressed: BitSet,
    key_reads: usize,
    fail_key_state: bool,
    fail_leds: bool,
    led_writes: Vec<Vec<LedState>>,
}

pub struct VirtualEvdev {
    name: Option<String>,
    id: InputId,
    codes: HashMap<u16, BitSet>,
    abs: HashMap<u16, AbsInfo>,
    failing_codes: HashSet<u16>,
    fail_events: bool,
    shared: Rc<RefCell<Shared>>,
}

impl VirtualEvdev {
    pub fn builder(name: &str) -> VirtualEvdevBuilder {
        VirtualEvdevBuilder {
            dev: VirtualEvdev {
                name: Some(name.to_string()),
                id: InputId::default(),
                codes: HashMap::new(),
                abs: HashMap::new(),
                failing_codes: HashSet::new(),
                fail_events: false,
                shared: Rc::default(),
            },
        }
    }

    /// Handle sharing this device's queue and side-effect log.
    pub fn handle(&self) -> VirtualHandle {
        VirtualHandle {
            shared: Rc::clone(&self.shared),
        }
    }
}

pub struct VirtualEvdevBuilder {
    dev: VirtualEvdev,
}

impl VirtualEvdevBuilder {
    fn codes(mut self, ev_type: u16, codes: impl IntoIterator<Item = u16>) -> Self {
        let set = self
            .dev
            .codes
            .entry(ev_type)
            .or_insert_with(|| BitSet::with_capacity(code_count(ev_type)));
        for code in codes {
            set.insert(code);
        }
        self
    }

    pub fn keys(self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.codes(EV_KEY, codes)
    }

    pub fn rel(self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.codes(EV_REL, codes)
    }

    pub fn leds(self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.codes(EV_LED, codes)
    }

    /// Declare an absolute axis with its range.
    pub fn abs(mut self, code: u16, minimum: i32, maximum: i32) -> Self {
        self.dev.abs.insert(code, AbsInfo::range(minimum, maximum));
        self.codes(EV_ABS, [code])
    }

    pub fn id(mut self, id: InputId) -> Self {
        self.dev.id = id;
        self
    }

    /// Keys reported as held by `key_state`.
    pub fn pressed(self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.dev.shared.borrow_mut().pressed = BitSet::from_codes(KEY_CNT, codes);
        self
    }

    /// Make `supported_codes(ev_type)` fail.
    pub fn fail_codes(mut self, ev_type: u16) -> Self {
        self.dev.failing_codes.insert(ev_type);
        self
    }

    /// Make `supported_event_types` fail.
    pub fn fail_events(mut self) -> Self {
        self.dev.fail_events = true;
        self
    }

    pub fn fail_name(mut self) -> Self {
        self.dev.name = None;
        self
    }

    pub fn build(self) -> VirtualEvdev {
        self.dev
    }
}

/// Test-side view of a [`VirtualEvdev`].
#[derive(Clone)]
pub struct VirtualHandle {
    shared: Rc<RefCell<Shared>>,
}

impl VirtualHandle {
    /// Queue records as one contiguous kernel write.
    pub fn push_records(&self, records: &[RawRecord]) {
        let bytes = records.iter().flat_map(|r| r.to_bytes()).collect();
        self.push_bytes(bytes);
    }

    /// Queue raw bytes, aligned or not.
    pub fn push_bytes(&self, bytes: Vec<u8>) {
        self.shared.borrow_mut().queue.push_back(Chunk::Bytes(bytes));
    }

    /// Queue a read failure.
    pub fn push_error(&self, kind: io::ErrorKind) {
        self.shared.borrow_mut().queue.push_back(Chunk::Error(kind));
    }

    pub fn set_pressed(&self, codes: impl IntoIterator<Item = u16>) {
        self.shared.borrow_mut().pressed = BitSet::from_codes(KEY_CNT, codes);
    }

    pub fn fail_key_state(&self, fail: bool) {
        self.shared.borrow_mut().fail_key_state = fail;
    }

    pub fn fail_leds(&self, fail: bool) {
        self.shared.borrow_mut().fail_leds = fail;
    }

    /// Number of `key_state` queries made so far.
    pub fn key_reads(&self) -> usize {
        self.shared.borrow().key_reads
    }

    /// Successful LED writes, oldest first.
    pub fn led_writes(&self) -> Vec<Vec<LedState>> {
        self.shared.borrow().led_writes.clone()
    }

    /// `true` once every queued chunk has been read.
    pub fn is_drained(&self) -> bool {
        self.shared.borrow().queue.is_empty()
    }
}

impl CapabilitySource for VirtualEvdev {
    fn supported_event_types(&self) -> io::Result<BitSet> {
        if self.fail_events {
            return Err(io::Error::from(io::ErrorKind::Unsupported));
        }
        Ok(BitSet::from_codes(
            EV_CNT,
            std::iter::once(EV_SYN).chain(self.codes.keys().copied()),
        ))
    }

    fn supported_codes(&self, ev_type: u16) -> io::Result<BitSet> {
        if self.failing_codes.contains(&ev_type) {
            return Err(io::Error::from(io::ErrorKind::Unsupported));
        }
        Ok(self
            .codes
            .get(&ev_type)
            .cloned()
            .unwrap_or_else(|| BitSet::with_capacity(code_count(ev_type))))
    }

    fn axis_info(&self, code: u16) -> io::Result<AbsInfo> {
        self.abs
            .get(&code)
            .copied()
            .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))
    }

    fn key_state(&self) -> io::Result<BitSet> {
        let mut shared = self.shared.borrow_mut();
        shared.key_reads += 1;
        if shared.fail_key_state {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        Ok(shared.pressed.clone())
    }

    fn name(&self) -> io::Result<String> {
        self.name
            .clone()
            .ok_or_else(|| io::Error::from(io::ErrorKind::Unsupported))
    }

    fn identity(&self) -> io::Result<InputId> {
        Ok(self.id)
    }

    fn properties(&self) -> io::Result<BitSet> {
        Ok(BitSet::default())
    }
}

impl RecordReader for VirtualEvdev {
    fn read_records(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut shared = self.shared.borrow_mut();
        match shared.queue.pop_front() {
            None => Err(io::Error::from(io::ErrorKind::WouldBlock)),
            Some(Chunk::Error(kind)) => Err(io::Error::from(kind)),
            Some(Chunk::Bytes(mut bytes)) => {
                // Oversized chunks are cut on record boundaries; anything that
                // fits (misaligned or not) is delivered as-is.
                let n = if bytes.len() <= buf.len() {
                    bytes.len()
                } else {
                    match buf.len() / RawRecord::SIZE * RawRecord::SIZE {
                        0 => buf.len(),
                        whole => whole,
                    }
                };
                buf[..n].copy_from_slice(&bytes[..n]);
                let rest = bytes.split_off(n);
                if !rest.is_empty() {
                    shared.queue.push_front(Chunk::Bytes(rest));
                }
                Ok(n)
            }
        }
    }
}

impl LedWriter for VirtualEvdev {
    fn write_leds(&mut self, leds: &[LedState]) -> io::Result<()> {
        let mut shared = self.shared.borrow_mut();
        if shared.fail_leds {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        shared.led_writes.push(leds.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_split_on_buffer_size() {
        let mut dev = VirtualEvdev::builder("v").build();
        let handle = dev.handle();
        handle.push_records(&[RawRecord::new(EV_KEY, KEY_A, 1); 3]);
        let mut buf = [0u8; RawRecord::SIZE * 2];
        assert_eq!(dev.read_records(&mut buf).ok(), Some(RawRecord::SIZE * 2));
        assert_eq!(dev.read_records(&mut buf).ok(), Some(RawRecord::SIZE));
        let err = dev.read_records(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
        assert!(handle.is_drained());
    }

    #[test]
    fn event_types_follow_declared_codes() {
        let dev = VirtualEvdev::builder("v").rel([REL_X]).abs(ABS_X, 0, 10).build();
        let types = dev.supported_event_types().unwrap_or_default();
        assert_eq!(types.iter().collect::<Vec<_>>(), vec![EV_SYN, EV_REL, EV_ABS]);
        assert_eq!(dev.axis_info(ABS_X).ok(), Some(AbsInfo::range(0, 10)));
        assert!(dev.axis_info(ABS_Y).is_err());
    }
}
