use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

const WAIT_STEP: Duration = Duration::from_millis(10);

/// Runs an external barcode scanner once per capture and returns what it
/// printed on stdout.
///
/// A scanner that exits unsuccessfully, or prints nothing, yields an empty
/// buffer: "no code this time" rather than an error. Only a failure to run
/// the program at all is reported as `Err`.
#[derive(Debug, Clone)]
pub struct ScanCommand {
    program: String,
    args: Vec<String>,
}

impl ScanCommand {
    /// Splits `line` on whitespace into program and arguments.
    pub fn parse(line: &str) -> io::Result<Self> {
        let mut words = line.split_whitespace().map(str::to_string);
        let program = words.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "empty scan command")
        })?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn capture(&self) -> io::Result<Vec<u8>> {
        self.capture_until(|| {
            thread::sleep(WAIT_STEP);
            false
        })
    }

    /// Like [`capture`](Self::capture), but calls `wait` between checks on
    /// the scanner. `wait` should block for a short while and return `true`
    /// to abandon the scan; the scanner is then killed and an empty buffer
    /// returned.
    pub fn capture_until<F>(&self, mut wait: F) -> io::Result<Vec<u8>>
    where
        F: FnMut() -> bool,
    {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        // Drained on its own thread so a chatty scanner never blocks on a
        // full pipe while we poll for its exit.
        let reader = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut data = Vec::new();
                stdout.read_to_end(&mut data).map(|_| data)
            })
        });

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break Some(status);
            }
            if wait() {
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
        };

        let data = match reader {
            Some(handle) => handle
                .join()
                .map_err(|_| io::Error::other("scan output reader panicked"))??,
            None => Vec::new(),
        };

        match status {
            Some(status) if status.success() => Ok(strip_newline(data)),
            _ => Ok(Vec::new()),
        }
    }
}

// Scanners terminate each decoded symbol with a newline.
fn strip_newline(mut data: Vec<u8>) -> Vec<u8> {
    if data.last() == Some(&b'\n') {
        data.pop();
    }
    data
}
