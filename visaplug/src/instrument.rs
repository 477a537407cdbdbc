//! This module provides a generic session for any byte stream.
//!
//! It can be called with any type that implements [`std::io::Read`] and [`std::io::Write`],
//! such as [`std::net::TcpStream`] or a boxed `serialport::SerialPort`.

use std::time::Duration;

use crate::{ResourceSession, VisaError};

/// A session that can be built with any port that implements [`std::io::Read`] and
/// [`std::io::Write`].
///
/// The bundled resource managers return this session for their ports. It can also be used with
/// any other stream to implement your own [`crate::ResourceManager`].
///
/// # Example
///
/// ```no_run
/// use std::{net::TcpStream, time::Duration};
///
/// use visaplug::{Instrument, ResourceSession};
///
/// let stream = TcpStream::connect("192.168.10.1:5025").unwrap();
/// let mut session = Instrument::new(stream, Duration::from_secs(3));
/// println!("{}", session.query("*IDN?").unwrap());
/// ```
pub struct Instrument<P: std::io::Read + std::io::Write> {
    port: Option<P>,
    terminator: String,
    timeout: Duration,
}

impl<P: std::io::Read + std::io::Write> Instrument<P> {
    /// Create a new session on the given port.
    ///
    /// The terminator defaults to `"\n"`. The timeout is used to bound reading responses; the
    /// port itself should be configured with a matching read timeout.
    pub fn new(port: P, timeout: Duration) -> Self {
        Self {
            port: Some(port),
            terminator: "\n".to_string(),
            timeout,
        }
    }

    /// Returns `true` until the session was closed.
    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn port(&mut self) -> Result<&mut P, VisaError> {
        self.port.as_mut().ok_or(VisaError::NotConnected)
    }
}

impl<P: std::io::Read + std::io::Write> ResourceSession for Instrument<P> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), VisaError> {
        self.port()?.read_exact(buf)?;
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

    fn write_raw(&mut self, data: &[u8]) -> Result<(), VisaError> {
        log::debug!("write: {:?}", String::from_utf8_lossy(data));
        let port = self.port()?;
        port.write_all(data)?;
        port.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), VisaError> {
        match self.port.take() {
            Some(mut port) => {
                port.flush()?;
                Ok(())
            }
            None => Err(VisaError::NotConnected),
        }
    }
}
