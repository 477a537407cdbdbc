//! VisaPlug: find an instrument on a VISA bus by its identification and talk to it.
//!
//! The VisaPlug library is a thin layer between a hardware test run and the instruments on the
//! bench. It does not implement any bus protocol itself. Instead, it talks to a
//! [`ResourceManager`] that enumerates resource addresses and opens [`ResourceSession`]s to them,
//! and builds two things on top of that:
//!
//! - Device discovery: every enumerated resource is asked for its identification (`*IDN?`), the
//!   response is parsed into a [`DeviceDescriptor`], and descriptors are filtered by an
//!   identification fragment. See [`scan`] and [`find_devices`].
//! - The [`VisaPlug`]: connects to the first device matching a [`PlugConfig`] and exposes the raw
//!   `write`/`query`/`read` primitives as well as the IEEE-488.2 common commands (`*RST`, `*CLS`,
//!   `*OPC?`, ...) as named methods.
//!
//! # Bundled resource managers
//! - [`TcpIpResourceManager`]: raw sockets (`TCPIP0::<host>::<port>::SOCKET`).
//! - `SerialResourceManager`: serial ports (`ASRL<port>::INSTR`) using the `serialport` crate.
//!   Requires the `serial` feature.
//! - [`LoopbackResourceManager`]: a simulated bus to test your test steps without hardware.
//!
//! # Example
//!
//! ```no_run
//! use visaplug::{Plug, PlugConfig, TcpIpResourceManager, VisaPlug};
//!
//! let mut rm = TcpIpResourceManager::new(["192.168.10.1:5025", "192.168.10.2:5025"]).unwrap();
//! let config = PlugConfig::new("MY44012345");
//!
//! let mut plug = VisaPlug::connect(&mut rm, &config).unwrap();
//! println!("Connected to {} {}", plug.vendor(), plug.device_name());
//!
//! plug.reset().unwrap();
//! println!("Operation complete: {}", plug.get_operation_complete().unwrap());
//! plug.tear_down().unwrap();
//! ```
//!
//! # License
//!
//! Licensed under either of
//!
//! - Apache License, Version 2.0 ([LICENSE-APACHE](http://www.apache.org/licenses/LICENSE-2.0))
//! - MIT license ([LICENSE-MIT](http://opensource.org/licenses/MIT))
//!
//! at your option.

#![warn(missing_docs)]

mod address;
mod commands;
mod config;
mod discovery;
mod instrument;
mod loopback;
mod plug;
mod resource_manager;
#[cfg(feature = "serial")]
mod serial;
mod tcp_ip;

pub use address::ResourceAddress;
pub use config::{ConfigKey, PlugConfig};
pub use discovery::{DeviceDescriptor, DeviceScan, find_devices, scan};
pub use instrument::Instrument;
pub use loopback::{LoopbackDevice, LoopbackResourceManager, LoopbackSession};
pub use plug::{Plug, VisaPlug};
pub use resource_manager::{OpenOptions, ResourceManager};
#[cfg(feature = "serial")]
pub use serial::SerialResourceManager;
pub use tcp_ip::TcpIpResourceManager;

use std::time::{Duration, Instant};

use thiserror::Error;

/// Timeout that sessions fall back to if they do not provide their own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// The error enum for everything VisaPlug does.
///
/// Discovery only ever surfaces [`VisaError::DeviceNotFound`]: problems with single resources
/// while scanning are swallowed. Once a plug is connected, all transport errors are passed on
/// unmodified.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VisaError {
    /// No enumerated resource matched the identification code.
    #[error("Device can't be found. No resource matched the identification code '{ident_code}'.")]
    DeviceNotFound {
        /// The identification code that was searched for.
        ident_code: String,
    },
    /// The address string could not be parsed into a resource address that this resource
    /// manager understands.
    #[error("Invalid resource address: {0}")]
    InvalidAddress(String),
    /// The connection to the instrument was closed, e.g., after a teardown.
    #[error("The connection to the instrument is closed.")]
    NotConnected,
    /// The session has an empty terminator, so the end of a response cannot be found.
    #[error("The terminator is empty, responses cannot be read until a terminator.")]
    EmptyTerminator,
    /// The resource manager does not know the requested resource.
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),
    /// Instrument response could not be parsed. The error contains the response received.
    #[error("Response from instrument could not be parsed. Response was: {0}")]
    ResponseParseError(String),
    /// Error when reading from/writing to an interface. See [`std::io::Error`] for more details.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "serial")]
    /// Serial port errors can occur when listing or opening serial ports. See the
    /// [`serialport::Error`] documentation for more information.
    #[error(transparent)]
    Serialport(#[from] serialport::Error),
    /// Timeout occurred while waiting for a response from the instrument.
    #[error(
        "Timeout occured while waiting for a response from the instrument. Timeout was set to {0:?}."
    )]
    Timeout(Duration),
    /// Timeout occurred while waiting for a response to a query.
    #[error(
        "Timeout occured while waiting for a response to query: {query}. Timeout was set to {timeout:?}."
    )]
    TimeoutQuery {
        /// The query that timed out.
        query: String,
        /// The timeout that was set.
        timeout: Duration,
    },
}

/// One open session to an instrument resource.
///
/// Implementors only have to provide the raw byte transport, i.e., [`write_raw`] and
/// [`read_exact`]. Sending terminated commands, reading terminated responses, and querying are
/// provided on top of that. Sessions that have a configurable terminator or timeout should
/// override the respective getters and setters.
///
/// [`write_raw`]: ResourceSession::write_raw
/// [`read_exact`]: ResourceSession::read_exact
pub trait ResourceSession {
    /// Write all bytes to the instrument and flush them.
    fn write_raw(&mut self, data: &[u8]) -> Result<(), VisaError>;

    /// Fill the whole buffer with bytes read from the instrument.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), VisaError>;

    /// Get the terminator that is appended to commands and ends responses.
    fn get_terminator(&self) -> &str {
        "\n"
    }

    /// Set the terminator of the session.
    ///
    /// # Arguments:
    /// - `_terminator` - A string slice that will be used as the terminator for commands
    fn set_terminator(&mut self, _terminator: &str) {}

    /// Get the timeout that bounds reading a response.
    fn get_timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    /// Send a command to the instrument.
    ///
    /// The terminator is appended to the command before it is written.
    fn sendcmd(&mut self, cmd: &str) -> Result<(), VisaError> {
        let data = format!("{cmd}{}", self.get_terminator());
        self.write_raw(data.as_bytes())
    }

    /// Read from the instrument until the terminator is received.
    ///
    /// The response is returned without the terminator. If the terminator is not found within
    /// the timeout, a [`VisaError::Timeout`] is returned. Invalid UTF-8 is replaced. An empty
    /// terminator is rejected with [`VisaError::EmptyTerminator`] before anything is read.
    fn read_until_terminator(&mut self) -> Result<String, VisaError> {
        let terminator = self.get_terminator().as_bytes().to_vec();
        if terminator.is_empty() {
            return Err(VisaError::EmptyTerminator);
        }
        let timeout = self.get_timeout();
        let mut response: Vec<u8> = Vec::new();
        let mut single_buf = [0u8];

        let tic = Instant::now();
        while tic.elapsed() < timeout {
            self.read_exact(&mut single_buf)?;
            response.push(single_buf[0]);
            if response.ends_with(&terminator) {
                response.truncate(response.len() - terminator.len());
                return match String::from_utf8(response) {
                    Ok(resp) => Ok(resp),
                    Err(err) => {
                        log::warn!("Received invalid UTF-8 data: {:?}", err.as_bytes());
                        Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
                    }
                };
            }
        }
        Err(VisaError::Timeout(timeout))
    }

    /// Query the instrument with a command and return the response.
    ///
    /// # Arguments
    /// * `cmd` - The command to send to the instrument for which we expect a response.
    fn query(&mut self, cmd: &str) -> Result<String, VisaError> {
        self.sendcmd(cmd)?;
        match self.read_until_terminator() {
            Err(VisaError::Timeout(timeout)) => Err(VisaError::TimeoutQuery {
                query: cmd.to_string(),
                timeout,
            }),
            res => res,
        }
    }

    /// Close the session. Sessions that own a resource release it here.
    fn close(&mut self) -> Result<(), VisaError> {
        Ok(())
    }
}
