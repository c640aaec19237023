use std::io::{self, Write};
use std::process::{Command, Stdio};

/// Submits jobs to a CUPS/LPD queue through the `lp` client.
#[derive(Debug, Clone)]
pub struct LpPrinter {
    program: String,
    queue: String,
}

impl LpPrinter {
    pub fn new(queue: &str) -> Self {
        Self::with_program("lp", queue)
    }

    /// Uses `program` in place of `lp`; it is invoked as `program -d <queue> -s`
    /// with the job on stdin.
    pub fn with_program(program: &str, queue: &str) -> Self {
        Self {
            program: program.to_string(),
            queue: queue.to_string(),
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn print(&self, data: &[u8]) -> io::Result<()> {
        let mut child = Command::new(&self.program)
            .arg("-d")
            .arg(&self.queue)
            .arg("-s")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // A spooler that exits early closes the pipe; its exit status decides.
            match stdin.write_all(data) {
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                other => other?,
            }
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(io::Error::other(format!(
                "{} rejected job for queue {}: {}",
                self.program, self.queue, status
            )));
        }
        Ok(())
    }
}
