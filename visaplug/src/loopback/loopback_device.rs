//! Simulated devices and the sessions that are opened to them.
//!
//! The devices behave like simple IEEE-488.2 message-based instruments: every query that is
//! written to a device discards output that was not read yet and queues the answer to the new
//! query. Commands that are not queries produce no output.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::{ResourceSession, VisaError};

/// Everything that happened to a device.
#[derive(Debug, Default)]
struct LoopbackLog {
    written: Vec<String>,
    opened: usize,
    closed: usize,
}

/// A simulated device on a [`crate::LoopbackResourceManager`].
///
/// Cloning a device is cheap, all clones share the same log.
#[derive(Clone, Debug, Default)]
pub struct LoopbackDevice {
    responses: HashMap<String, String>,
    unresponsive: bool,
    log: Arc<Mutex<LoopbackLog>>,
}

impl LoopbackDevice {
    /// Create a new device that answers the `*IDN?` query with the given identification.
    pub fn new(idn: &str) -> Self {
        Self::default().with_response("*IDN?", idn)
    }

    /// Create a device that fails whenever a session to it is opened.
    pub fn unresponsive() -> Self {
        Self {
            unresponsive: true,
            ..Default::default()
        }
    }

    /// Add a query and the response the device answers it with.
    ///
    /// Queries are matched case-insensitively.
    pub fn with_response(mut self, query: &str, response: &str) -> Self {
        self.responses
            .insert(query.trim().to_uppercase(), response.to_string());
        self
    }

    /// Get all commands written to the device so far, in order, without terminators.
    pub fn written(&self) -> Vec<String> {
        self.lock_log().written.clone()
    }

    /// Get the last command written to the device.
    pub fn last_written(&self) -> Option<String> {
        self.lock_log().written.last().cloned()
    }

    /// Number of sessions that were opened to this device.
    pub fn times_opened(&self) -> usize {
        self.lock_log().opened
    }

    /// Number of sessions to this device that were closed.
    pub fn times_closed(&self) -> usize {
        self.lock_log().closed
    }

    /// Returns `true` if the device fails to be opened.
    pub fn is_unresponsive(&self) -> bool {
        self.unresponsive
    }

    /// Open a new session to this device.
    pub(crate) fn open(
        &self,
        address: &str,
        timeout: Duration,
    ) -> Result<LoopbackSession, VisaError> {
        if self.unresponsive {
            return Err(VisaError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("{address} does not respond"),
            )));
        }
        self.lock_log().opened += 1;
        Ok(LoopbackSession {
            address: address.to_string(),
            device: self.clone(),
            output: VecDeque::new(),
            terminator: "\n".to_string(),
            timeout,
            open: true,
        })
    }

    fn lock_log(&self) -> std::sync::MutexGuard<'_, LoopbackLog> {
        self.log.lock().expect("Mutex should not be poisoned")
    }
}

/// A session to a [`LoopbackDevice`].
#[derive(Debug)]
pub struct LoopbackSession {
    address: String,
    device: LoopbackDevice,
    output: VecDeque<u8>,
    terminator: String,
    timeout: Duration,
    open: bool,
}

impl LoopbackSession {
    /// The resource address this session was opened for.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns `true` until the session was closed.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Handle one command that was written to the device.
    fn handle_command(&mut self, cmd: &str) {
        self.device.lock_log().written.push(cmd.to_string());
        if !cmd.contains('?') {
            return;
        }
        self.output.clear();
        if let Some(resp) = self.device.responses.get(&cmd.trim().to_uppercase()) {
            self.output.extend(resp.as_bytes());
            self.output.extend(self.terminator.as_bytes());
        }
    }
}

impl ResourceSession for LoopbackSession {
    fn write_raw(&mut self, data: &[u8]) -> Result<(), VisaError> {
        if !self.open {
            return Err(VisaError::NotConnected);
        }
        let data = String::from_utf8_lossy(data).into_owned();
        if self.terminator.is_empty() {
            self.handle_command(&data);
            return Ok(());
        }
        let terminator = self.terminator.clone();
        for cmd in data.split(terminator.as_str()).filter(|cmd| !cmd.is_empty()) {
            self.handle_command(cmd);
        }
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), VisaError> {
        if !self.open {
            return Err(VisaError::NotConnected);
        }
        for byte in buf.iter_mut() {
            *byte = self
                .output
                .pop_front()
                .ok_or(VisaError::Timeout(self.timeout))?;
        }
        Ok(())
    }

    fn get_terminator(&self) -> &str {
        self.terminator.as_str()
    }

    fn set_terminator(&mut self, terminator: &str) {
        self.terminator = terminator.to_string();
    }

    fn get_timeout(&self) -> Duration {
        self.timeout
    }

    fn close(&mut self) -> Result<(), VisaError> {
        if !self.open {
            return Err(VisaError::NotConnected);
        }
        self.open = false;
        self.output.clear();
        self.device.lock_log().closed += 1;
        Ok(())
    }
}
