use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{LinkError, Result};

pub const CAMERA_RX_VAR: &str = "PIGEOND_CAMERA_RX";
pub const FILES_RX_VAR: &str = "PIGEOND_FILES_RX";
pub const FILES_TX_VAR: &str = "PIGEOND_FILES_TX";
pub const PRINTER_VAR: &str = "PIGEOND_PRINTER";
pub const JOYSTICK_VAR: &str = "PIGEOND_JOYSTICK";
pub const SCAN_CMD_VAR: &str = "PIGEOND_SCAN_CMD";
pub const IDLE_POLL_VAR: &str = "PIGEOND_IDLE_POLL_MS";

pub const DEFAULT_JOYSTICK: &str = "/dev/input/js0";
pub const DEFAULT_SCAN_CMD: &str = "zbarcam --oneshot --raw --nodisplay";
pub const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(100);
pub const INPUT_POLL: Duration = Duration::from_millis(50);

/// Snapshot of everything the linkmods read from the environment.
///
/// Probes only look at this snapshot, so selecting against the same
/// `LinkConfig` twice picks the same carriers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    camera_enabled: bool,
    files_rx: Option<PathBuf>,
    files_tx: Option<PathBuf>,
    printer: Option<String>,
    joystick: PathBuf,
    scan_command: String,
    idle_poll: Duration,
    input_poll: Duration,
}

impl LinkConfig {
    /// Defaults with every optional carrier disabled.
    pub fn new() -> Self {
        Self {
            camera_enabled: false,
            files_rx: None,
            files_tx: None,
            printer: None,
            joystick: PathBuf::from(DEFAULT_JOYSTICK),
            scan_command: DEFAULT_SCAN_CMD.to_string(),
            idle_poll: DEFAULT_IDLE_POLL,
            input_poll: INPUT_POLL,
        }
    }

    pub fn from_env() -> Result<Self> {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| k.into_string().ok().map(|k| (k, v)));
        Self::from_vars(vars)
    }

    /// Builds a config from `(name, value)` pairs; unknown names are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<OsStr>,
    {
        let mut config = Self::new();
        for (key, value) in vars {
            let value = value.as_ref();
            match key.as_ref() {
                // Presence is the switch; the value is never looked at.
                CAMERA_RX_VAR => config.camera_enabled = true,
                FILES_RX_VAR => config.files_rx = non_empty_path(value),
                FILES_TX_VAR => config.files_tx = non_empty_path(value),
                PRINTER_VAR => {
                    let name = value.to_string_lossy().trim().to_string();
                    config.printer = (!name.is_empty()).then_some(name);
                }
                JOYSTICK_VAR => {
                    if let Some(path) = non_empty_path(value) {
                        config.joystick = path;
                    }
                }
                SCAN_CMD_VAR => {
                    let cmd = value.to_string_lossy().trim().to_string();
                    if cmd.is_empty() {
                        return Err(LinkError::InvalidConfiguration(format!(
                            "{} is set but empty",
                            SCAN_CMD_VAR
                        )));
                    }
                    config.scan_command = cmd;
                }
                IDLE_POLL_VAR => {
                    let raw = value.to_string_lossy();
                    let ms: u64 = raw.trim().parse().map_err(|_| {
                        LinkError::InvalidConfiguration(format!(
                            "{} must be a whole number of milliseconds, got {:?}",
                            IDLE_POLL_VAR, raw
                        ))
                    })?;
                    config.idle_poll = Duration::from_millis(ms);
                }
                _ => {}
            }
        }
        Ok(config)
    }

    pub fn camera_enabled(mut self, enabled: bool) -> Self {
        self.camera_enabled = enabled;
        self
    }

    pub fn files_rx(mut self, dir: impl Into<PathBuf>) -> Self {
        self.files_rx = Some(dir.into());
        self
    }

    pub fn files_tx(mut self, dir: impl Into<PathBuf>) -> Self {
        self.files_tx = Some(dir.into());
        self
    }

    pub fn printer(mut self, queue: &str) -> Self {
        self.printer = Some(queue.to_string());
        self
    }

    pub fn joystick(mut self, path: impl Into<PathBuf>) -> Self {
        self.joystick = path.into();
        self
    }

    pub fn scan_command(mut self, cmd: &str) -> Self {
        self.scan_command = cmd.to_string();
        self
    }

    pub fn idle_poll(mut self, interval: Duration) -> Self {
        self.idle_poll = interval;
        self
    }

    pub fn input_poll(mut self, interval: Duration) -> Self {
        self.input_poll = interval;
        self
    }

    pub fn is_camera_enabled(&self) -> bool {
        self.camera_enabled
    }

    pub fn files_rx_dir(&self) -> Option<&Path> {
        self.files_rx.as_deref()
    }

    pub fn files_tx_dir(&self) -> Option<&Path> {
        self.files_tx.as_deref()
    }

    pub fn printer_queue(&self) -> Option<&str> {
        self.printer.as_deref()
    }

    pub fn joystick_path(&self) -> &Path {
        &self.joystick
    }

    pub fn scan_command_line(&self) -> &str {
        &self.scan_command
    }

    pub fn idle_poll_interval(&self) -> Duration {
        self.idle_poll
    }

    pub fn input_poll_interval(&self) -> Duration {
        self.input_poll
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty_path(value: &OsStr) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}
