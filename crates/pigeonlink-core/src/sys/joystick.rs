use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

// linux/joystick.h
const JS_EVENT_AXIS: u8 = 0x02;
const JS_EVENT_INIT: u8 = 0x80;
const JS_EVENT_LEN: usize = 8;
const MAX_AXES: usize = 8;

/// Latest deflection of the first two axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AxisState {
    pub x: i16,
    pub y: i16,
}

/// A joystick opened through the Linux joydev interface (`/dev/input/jsN`).
///
/// The descriptor is non-blocking: `poll` drains whatever events the kernel
/// has queued and returns at once.
pub struct Joystick {
    path: PathBuf,
    file: File,
    axes: [i16; MAX_AXES],
}

impl Joystick {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            axes: [0; MAX_AXES],
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn poll(&mut self) -> io::Result<AxisState> {
        let mut buf = [0u8; JS_EVENT_LEN];
        loop {
            match self.file.read(&mut buf) {
                Ok(JS_EVENT_LEN) => self.apply(&buf),
                // Short reads only happen on a detached device.
                Ok(_) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(AxisState {
            x: self.axes[0],
            y: self.axes[1],
        })
    }

    fn apply(&mut self, event: &[u8; JS_EVENT_LEN]) {
        // struct js_event { __u32 time; __s16 value; __u8 type; __u8 number; }
        let value = i16::from_ne_bytes([event[4], event[5]]);
        let kind = event[6] & !JS_EVENT_INIT;
        let number = event[7] as usize;

        if kind == JS_EVENT_AXIS && number < MAX_AXES {
            self.axes[number] = value;
        }
    }
}
