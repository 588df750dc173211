//! Helper-backed PIB images.
//!
//! PIB images are only readable through an external reader invoked as
//! `getpib <image> <HEX_OFFSET> <hfid|mac|data> [length]`. Its stdout is the
//! field value with no framing.

use super::{BlobSource, FieldError, FieldRead};
use crate::schema::ParameterKind;
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Timeout applied when none is configured
pub const DEFAULT_HELPER_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Capability to read one PIB field.
///
/// Implemented by [`ProcessHelper`] and by any closure with the same
/// signature, so extraction can run against a fake reader.
pub trait PibHelper {
    fn read(
        &self,
        image: &Path,
        offset: u64,
        kind: ParameterKind,
        length: usize,
    ) -> Result<Vec<u8>, FieldError>;
}

impl<F> PibHelper for F
where
    F: Fn(&Path, u64, ParameterKind, usize) -> Result<Vec<u8>, FieldError>,
{
    fn read(
        &self,
        image: &Path,
        offset: u64,
        kind: ParameterKind,
        length: usize,
    ) -> Result<Vec<u8>, FieldError> {
        self(image, offset, kind, length)
    }
}

/// Runs the external reader as a subprocess
#[derive(Debug, Clone)]
pub struct ProcessHelper {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessHelper {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: Some(DEFAULT_HELPER_TIMEOUT),
        }
    }

    /// Set the per-field deadline, `None` waits forever
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Positional arguments for one field; length is only passed for raw data
    pub fn arguments(image: &Path, offset: u64, kind: ParameterKind, length: usize) -> Vec<OsString> {
        let mut args = vec![
            image.as_os_str().to_owned(),
            OsString::from(format!("{:X}", offset)),
            OsString::from(kind.helper_tag()),
        ];
        if kind == ParameterKind::Raw {
            args.push(OsString::from(length.to_string()));
        }
        args
    }

    fn deadline(&self) -> Option<Instant> {
        self.timeout.map(|timeout| Instant::now() + timeout)
    }

    fn timed_out(&self) -> FieldError {
        FieldError::HelperTimeout {
            timeout: self.timeout.unwrap_or_default(),
        }
    }

    fn wait(&self, child: &mut Child, deadline: Option<Instant>) -> Result<ExitStatus, FieldError> {
        let Some(deadline) = deadline else {
            return Ok(child.wait()?);
        };

        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(self.timed_out());
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Collect a drained pipe. A pipe can outlive the helper when it leaves a
    /// background process holding it, so this wait is bounded too.
    fn collect(
        &self,
        output: &Receiver<Vec<u8>>,
        deadline: Option<Instant>,
    ) -> Result<Vec<u8>, FieldError> {
        let received = match deadline {
            Some(deadline) => {
                output.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            }
            None => output.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(bytes) => Ok(bytes),
            Err(RecvTimeoutError::Timeout) => Err(self.timed_out()),
            Err(RecvTimeoutError::Disconnected) => Ok(Vec::new()),
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = sender.send(buf);
    });
    receiver
}

impl PibHelper for ProcessHelper {
    fn read(
        &self,
        image: &Path,
        offset: u64,
        kind: ParameterKind,
        length: usize,
    ) -> Result<Vec<u8>, FieldError> {
        let mut child = Command::new(&self.program)
            .args(Self::arguments(image, offset, kind, length))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| FieldError::HelperSpawn {
                program: self.program.display().to_string(),
                reason: err.to_string(),
            })?;

        // Pipes are drained concurrently so a chatty helper cannot block on a full pipe
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = self.deadline();
        let status = self.wait(&mut child, deadline)?;
        let stdout = self.collect(&stdout, deadline)?;
        let stderr = self.collect(&stderr, deadline)?;

        if !status.success() {
            return Err(FieldError::HelperInvocation {
                status,
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        Ok(stdout)
    }
}

/// A PIB image read field by field through a helper
pub struct HelperBlob<H> {
    image: PathBuf,
    origin: String,
    helper: H,
}

impl<H: PibHelper> HelperBlob<H> {
    pub fn new(image: impl Into<PathBuf>, helper: H) -> Self {
        let image = image.into();
        let origin = image.display().to_string();
        Self {
            image,
            origin,
            helper,
        }
    }
}

impl<H: PibHelper> BlobSource for HelperBlob<H> {
    fn read_at(
        &self,
        offset: u64,
        length: usize,
        kind: ParameterKind,
    ) -> Result<FieldRead, FieldError> {
        self.helper
            .read(&self.image, offset, kind, length)
            .map(FieldRead::Rendered)
    }

    fn origin(&self) -> &str {
        &self.origin
    }
}
