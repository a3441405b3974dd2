#![cfg(target_os = "linux")]

//! `/dev/input/eventN` device handle.
//!
//! The node is opened non-blocking: the engine drains it until the kernel
//! reports `EAGAIN`, which surfaces here as [`io::ErrorKind::WouldBlock`].
//! Write access is only needed for LEDs, so a node that cannot be opened
//! read-write is reopened read-only and LED writes then fail (and are ignored
//! by the engine).

use crate::bits::BitSet;
use crate::codes::*;
use crate::device::{AbsInfo, CapabilitySource, InputId, LedState, LedWriter, RecordReader};
use crate::event::RawRecord;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// `EVIOCG*` requests from `linux/input.h`.
///
/// `EVIOCGBIT` and `EVIOCGABS` carry the event type or axis in the request
/// number, so there is one wrapper per type and axis that admission queries.
mod ioctl {
    use crate::device::{AbsInfo, InputId};
    use nix::{ioctl_read, ioctl_read_buf};

    ioctl_read!(eviocgid, b'E', 0x02, InputId);
    ioctl_read_buf!(eviocgname, b'E', 0x06, u8);
    ioctl_read_buf!(eviocgprop, b'E', 0x09, u8);
    ioctl_read_buf!(eviocgkey, b'E', 0x18, u8);

    ioctl_read_buf!(eviocgbit_ev, b'E', 0x20, u8);
    ioctl_read_buf!(eviocgbit_key, b'E', 0x21, u8);
    ioctl_read_buf!(eviocgbit_rel, b'E', 0x22, u8);
    ioctl_read_buf!(eviocgbit_abs, b'E', 0x23, u8);
    ioctl_read_buf!(eviocgbit_led, b'E', 0x31, u8);

    ioctl_read!(eviocgabs_x, b'E', 0x40, AbsInfo);
    ioctl_read!(eviocgabs_y, b'E', 0x41, AbsInfo);
    ioctl_read!(eviocgabs_mt_position_x, b'E', 0x75, AbsInfo);
    ioctl_read!(eviocgabs_mt_position_y, b'E', 0x76, AbsInfo);
}

type BufIoctl = unsafe fn(libc::c_int, &mut [u8]) -> nix::Result<libc::c_int>;
type AbsIoctl = unsafe fn(libc::c_int, *mut AbsInfo) -> nix::Result<libc::c_int>;

const NAME_LEN: usize = 256;
const PROP_CNT: usize = 64;

pub struct EvdevNode {
    file: File,
    path: PathBuf,
}

impl EvdevNode {
    /// Open a device node non-blocking, read-write when permitted.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let open = |write: bool| {
            OpenOptions::new()
                .read(true)
                .write(write)
                .custom_flags(libc::O_NONBLOCK | libc::O_CLOEXEC)
                .open(path)
        };
        let file = match open(true) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => open(false)?,
            Err(e) => return Err(e),
        };
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a buffer ioctl sized for `bits` bits and keep what the kernel filled.
    fn bits(&self, request: BufIoctl, bits: usize) -> io::Result<BitSet> {
        let mut buf = vec![0u8; bits.div_ceil(8)];
        // SAFETY: the request encodes `buf.len()`, the kernel writes at most that much.
        let n = unsafe { request(self.file.as_raw_fd(), &mut buf) }?;
        buf.truncate(usize::try_from(n).unwrap_or(0));
        Ok(BitSet::from_bytes(&buf))
    }
}

impl AsRawFd for EvdevNode {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

fn unsupported() -> io::Error {
    io::Error::from(io::ErrorKind::Unsupported)
}

impl CapabilitySource for EvdevNode {
    fn supported_event_types(&self) -> io::Result<BitSet> {
        self.bits(ioctl::eviocgbit_ev, EV_CNT)
    }

    fn supported_codes(&self, ev_type: u16) -> io::Result<BitSet> {
        let request: BufIoctl = match ev_type {
            EV_KEY => ioctl::eviocgbit_key,
            EV_REL => ioctl::eviocgbit_rel,
            EV_ABS => ioctl::eviocgbit_abs,
            EV_LED => ioctl::eviocgbit_led,
            _ => return Err(unsupported()),
        };
        self.bits(request, code_count(ev_type))
    }

    fn axis_info(&self, code: u16) -> io::Result<AbsInfo> {
        let request: AbsIoctl = match code {
            ABS_X => ioctl::eviocgabs_x,
            ABS_Y => ioctl::eviocgabs_y,
            ABS_MT_POSITION_X => ioctl::eviocgabs_mt_position_x,
            ABS_MT_POSITION_Y => ioctl::eviocgabs_mt_position_y,
            _ => return Err(unsupported()),
        };
        let mut info = AbsInfo::default();
        // SAFETY: `AbsInfo` is `#[repr(C)]` with the layout of `struct input_absinfo`.
        unsafe { request(self.file.as_raw_fd(), &mut info) }?;
        Ok(info)
    }

    fn key_state(&self) -> io::Result<BitSet> {
        self.bits(ioctl::eviocgkey, KEY_CNT)
    }

    fn name(&self) -> io::Result<String> {
        let raw = self.bits(ioctl::eviocgname, NAME_LEN * 8)?;
        let bytes = raw.as_bytes();
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    fn identity(&self) -> io::Result<InputId> {
        let mut id = InputId::default();
        // SAFETY: `InputId` is `#[repr(C)]` with the layout of `struct input_id`.
        unsafe { ioctl::eviocgid(self.file.as_raw_fd(), &mut id) }?;
        Ok(id)
    }

    fn properties(&self) -> io::Result<BitSet> {
        self.bits(ioctl::eviocgprop, PROP_CNT)
    }
}

impl RecordReader for EvdevNode {
    fn read_records(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl LedWriter for EvdevNode {
    fn write_leds(&mut self, leds: &[LedState]) -> io::Result<()> {
        let bytes: Vec<u8> = leds
            .iter()
            .flat_map(|led| RawRecord::new(EV_LED, led.code, i32::from(led.on)).to_bytes())
            .collect();
        self.file.write_all(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn kernel_structs_have_kernel_sizes() {
        assert_eq!(size_of::<AbsInfo>(), 24);
        assert_eq!(size_of::<InputId>(), 8);
    }

    #[test]
    fn non_input_node_fails_every_query() {
        let node = EvdevNode::open("/dev/null").expect("open /dev/null");
        assert!(node.supported_event_types().is_err());
        assert!(node.supported_codes(EV_KEY).is_err());
        assert!(node.axis_info(ABS_X).is_err());
        assert!(node.identity().is_err());
        assert!(node.name().is_err());
    }

    #[test]
    fn unqueried_axis_and_type_are_unsupported() {
        let node = EvdevNode::open("/dev/null").expect("open /dev/null");
        let err = node.axis_info(ABS_MT_TRACKING_ID).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        let err = node.supported_codes(EV_SYN).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
