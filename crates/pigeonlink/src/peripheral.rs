//! Interfaces to the hardware and UI collaborators the carriers drive.
//!
//! Carriers never talk to devices directly: they ask a [`Peripherals`]
//! implementation for fresh handles. [`SystemPeripherals`] binds them to the
//! real machine; the simulator binds them to scripted fakes.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use pigeonlink_core::sys::joystick::Joystick;
use pigeonlink_core::sys::printer::LpPrinter;
use pigeonlink_core::sys::scan::ScanCommand;
use tracing::{info, warn};

use crate::config::LinkConfig;
use crate::engine::CancelToken;
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Motion {
    pub x: i16,
    pub y: i16,
}

impl Motion {
    /// Any vertical deflection counts as the scan trigger.
    pub fn is_trigger(&self) -> bool {
        self.y != 0
    }
}

pub trait MotionSensor: Send {
    fn open(&mut self) -> io::Result<()>;
    fn motion(&mut self) -> io::Result<Motion>;
    fn close(&mut self) -> io::Result<()>;
}

pub trait BarcodeReader: Send {
    /// One capture attempt. An empty buffer means nothing was read this time.
    ///
    /// A capture that blocks must give up once `cancel` fires and return an
    /// empty buffer.
    fn capture(&mut self, cancel: &CancelToken) -> io::Result<Vec<u8>>;
}

pub trait PrintSink: Send {
    fn open(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn print(&mut self, payload: &[u8]) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    RxSuccess,
    RxRetry,
    TxSuccess,
    TxRetry,
}

impl UiAction {
    pub fn message(self) -> &'static str {
        match self {
            Self::RxSuccess => "frame received",
            Self::RxRetry => "please take another image",
            Self::TxSuccess => "frame sent",
            Self::TxRetry => "send failed, will retry",
        }
    }
}

/// Fire-and-forget user feedback.
pub trait Notifier: Send + Sync {
    fn notify(&self, action: UiAction);
}

pub trait Peripherals: Send + Sync {
    fn motion_sensor(&self, config: &LinkConfig) -> Box<dyn MotionSensor>;
    fn barcode_reader(&self, config: &LinkConfig) -> Result<Box<dyn BarcodeReader>>;
    fn printer(&self, queue: &str) -> Box<dyn PrintSink>;
    fn console(&self) -> Box<dyn Write + Send>;
    fn notifier(&self) -> Arc<dyn Notifier>;
}

/// The real machine: joydev, the scan command, `lp`, stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPeripherals;

impl Peripherals for SystemPeripherals {
    fn motion_sensor(&self, config: &LinkConfig) -> Box<dyn MotionSensor> {
        Box::new(JoystickSensor {
            path: config.joystick_path().to_path_buf(),
            device: None,
        })
    }

    fn barcode_reader(&self, config: &LinkConfig) -> Result<Box<dyn BarcodeReader>> {
        let cmd = ScanCommand::parse(config.scan_command_line())?;
        Ok(Box::new(ScanReader {
            cmd,
            poll: config.input_poll_interval(),
        }))
    }

    fn printer(&self, queue: &str) -> Box<dyn PrintSink> {
        Box::new(LpSink {
            printer: LpPrinter::new(queue),
        })
    }

    fn console(&self) -> Box<dyn Write + Send> {
        Box::new(io::stderr())
    }

    fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::new(LogNotifier::default())
    }
}

struct JoystickSensor {
    path: PathBuf,
    device: Option<Joystick>,
}

impl MotionSensor for JoystickSensor {
    fn open(&mut self) -> io::Result<()> {
        let js = Joystick::open(&self.path)?;
        info!("Opened joystick {}", js.path().display());
        self.device = Some(js);
        Ok(())
    }

    fn motion(&mut self) -> io::Result<Motion> {
        let js = self
            .device
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "joystick not open"))?;
        let axes = js.poll()?;
        Ok(Motion { x: axes.x, y: axes.y })
    }

    fn close(&mut self) -> io::Result<()> {
        // Dropping the handle closes the descriptor.
        self.device = None;
        Ok(())
    }
}

struct ScanReader {
    cmd: ScanCommand,
    poll: Duration,
}

impl BarcodeReader for ScanReader {
    fn capture(&mut self, cancel: &CancelToken) -> io::Result<Vec<u8>> {
        self.cmd.capture_until(|| cancel.sleep(self.poll))
    }
}

struct LpSink {
    printer: LpPrinter,
}

impl PrintSink for LpSink {
    fn print(&mut self, payload: &[u8]) -> io::Result<()> {
        self.printer.print(payload)
    }
}

/// Logs every action, ringing the terminal bell on success.
pub struct LogNotifier {
    bell: bool,
    out: Mutex<Box<dyn Write + Send>>,
}

impl LogNotifier {
    pub fn new(bell: bool) -> Self {
        Self::with_writer(bell, Box::new(io::stderr()))
    }

    /// Rings the bell on `out` instead of stderr.
    pub fn with_writer(bell: bool, out: Box<dyn Write + Send>) -> Self {
        Self {
            bell,
            out: Mutex::new(out),
        }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new(true)
    }
}

impl std::fmt::Debug for LogNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogNotifier").field("bell", &self.bell).finish()
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, action: UiAction) {
        let success = matches!(action, UiAction::RxSuccess | UiAction::TxSuccess);
        if success {
            info!("{}", action.message());
        } else {
            warn!("{}", action.message());
        }

        if self.bell && success {
            let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = out.write_all(b"\x07").and_then(|_| out.flush());
        }
    }
}
