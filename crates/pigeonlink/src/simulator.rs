//! Scripted stand-ins for the hardware, so whole links can run in tests.
//!
//! A [`SimPeripherals`] is a cheap handle onto shared state: clone it, hand
//! one clone to a [`LinkContext`](crate::linkmod::LinkContext), and use the
//! other to script inputs and inspect what the carriers did.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::LinkConfig;
use crate::engine::CancelToken;
use crate::error::Result;
use crate::peripheral::{
    BarcodeReader, Motion, MotionSensor, Notifier, Peripherals, PrintSink, UiAction,
};

#[derive(Default)]
struct SimState {
    motion: VecDeque<i16>,
    idle_y: i16,
    sensor_open_fails: bool,
    sensor_opens: usize,
    sensor_closes: usize,
    captures: VecDeque<Vec<u8>>,
    print_failures: usize,
    printed: Vec<Vec<u8>>,
    printer_opens: usize,
    printer_closes: usize,
    console: Vec<u8>,
    notifications: Vec<UiAction>,
}

#[derive(Clone, Default)]
pub struct SimPeripherals {
    state: Arc<Mutex<SimState>>,
}

impl SimPeripherals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vertical axis readings returned by successive motion reads. Once the
    /// script runs out the sensor reports the idle position.
    pub fn with_motion(self, ys: impl IntoIterator<Item = i16>) -> Self {
        self.lock().motion.extend(ys);
        self
    }

    /// Makes the idle position a deflected stick, so every read triggers.
    pub fn hold_trigger(self) -> Self {
        self.lock().idle_y = 1;
        self
    }

    /// Buffers returned by successive captures; an exhausted script reads
    /// as "nothing decoded".
    pub fn with_captures(self, buffers: impl IntoIterator<Item = Vec<u8>>) -> Self {
        self.lock().captures.extend(buffers);
        self
    }

    pub fn fail_sensor_open(self) -> Self {
        self.lock().sensor_open_fails = true;
        self
    }

    /// The next `n` print jobs fail.
    pub fn fail_prints(self, n: usize) -> Self {
        self.lock().print_failures = n;
        self
    }

    pub fn notifications(&self) -> Vec<UiAction> {
        self.lock().notifications.clone()
    }

    pub fn console_output(&self) -> Vec<u8> {
        self.lock().console.clone()
    }

    pub fn printed(&self) -> Vec<Vec<u8>> {
        self.lock().printed.clone()
    }

    pub fn sensor_opens(&self) -> usize {
        self.lock().sensor_opens
    }

    pub fn sensor_closes(&self) -> usize {
        self.lock().sensor_closes
    }

    pub fn printer_opens(&self) -> usize {
        self.lock().printer_opens
    }

    pub fn printer_closes(&self) -> usize {
        self.lock().printer_closes
    }

    pub fn captures_remaining(&self) -> usize {
        self.lock().captures.len()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panicking test thread must not hide the state from the others.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Peripherals for SimPeripherals {
    fn motion_sensor(&self, _config: &LinkConfig) -> Box<dyn MotionSensor> {
        Box::new(self.clone())
    }

    fn barcode_reader(&self, _config: &LinkConfig) -> Result<Box<dyn BarcodeReader>> {
        Ok(Box::new(self.clone()))
    }

    fn printer(&self, _queue: &str) -> Box<dyn PrintSink> {
        Box::new(self.clone())
    }

    fn console(&self) -> Box<dyn Write + Send> {
        Box::new(self.clone())
    }

    fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::new(self.clone())
    }
}

impl MotionSensor for SimPeripherals {
    fn open(&mut self) -> io::Result<()> {
        let mut state = self.lock();
        if state.sensor_open_fails {
            return Err(io::Error::new(io::ErrorKind::NotFound, "simulated joystick missing"));
        }
        state.sensor_opens += 1;
        Ok(())
    }

    fn motion(&mut self) -> io::Result<Motion> {
        let mut state = self.lock();
        let y = state.motion.pop_front().unwrap_or(state.idle_y);
        Ok(Motion { x: 0, y })
    }

    fn close(&mut self) -> io::Result<()> {
        self.lock().sensor_closes += 1;
        Ok(())
    }
}

impl BarcodeReader for SimPeripherals {
    fn capture(&mut self, _cancel: &CancelToken) -> io::Result<Vec<u8>> {
        Ok(self.lock().captures.pop_front().unwrap_or_default())
    }
}

impl PrintSink for SimPeripherals {
    fn open(&mut self) -> io::Result<()> {
        self.lock().printer_opens += 1;
        Ok(())
    }

    fn print(&mut self, payload: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        if state.print_failures > 0 {
            state.print_failures -= 1;
            return Err(io::Error::other("simulated printer jam"));
        }
        state.printed.push(payload.to_vec());
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.lock().printer_closes += 1;
        Ok(())
    }
}

impl Write for SimPeripherals {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().console.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Notifier for SimPeripherals {
    fn notify(&self, action: UiAction) {
        self.lock().notifications.push(action);
    }
}
