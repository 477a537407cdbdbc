//! The plug: a connection to one instrument for the duration of a test run.

use crate::{
    DeviceDescriptor, PlugConfig, ResourceManager, ResourceSession, VisaError,
    discovery::{Probe, probe},
};

/// The lifecycle of a plug as seen by the host of a test run.
///
/// A plug is set up when it is constructed. At the end of the test run, the host calls
/// [`Plug::tear_down`] to release the hardware.
pub trait Plug {
    /// Release all resources that the plug holds.
    fn tear_down(&mut self) -> Result<(), VisaError>;
}

/// A plug for an instrument that is found on the bus by its identification.
///
/// A `VisaPlug` is connected on construction and stays connected until it is torn down. Once
/// torn down, all operations return [`VisaError::NotConnected`]; there is no reconnection.
///
/// The plug owns exactly one session. Queries are a write followed by a read on this session, so
/// do not interleave other writes between sending a query and reading its response.
pub struct VisaPlug<S: ResourceSession> {
    descriptor: DeviceDescriptor,
    connection: Option<S>,
}

impl<S: ResourceSession> VisaPlug<S> {
    /// Connect to the first device that matches the identification code of the configuration.
    ///
    /// Resources are probed in the order the resource manager lists them. Resources that fail
    /// to open or to identify themselves are skipped. The session that was used to identify the
    /// first matching device is kept as the connection.
    ///
    /// Returns [`VisaError::DeviceNotFound`] if no device matches.
    pub fn connect<M>(manager: &mut M, config: &PlugConfig) -> Result<Self, VisaError>
    where
        M: ResourceManager<Session = S>,
    {
        let options = config.open_options();
        for address in manager.list_resources()? {
            match probe(
                manager,
                &address,
                &config.ident_code,
                &config.idn_query,
                &options,
            ) {
                Probe::Matched(descriptor, session) => {
                    log::info!("Connected to {descriptor}");
                    return Ok(Self {
                        descriptor,
                        connection: Some(session),
                    });
                }
                Probe::Mismatch(descriptor) => {
                    log::debug!("{descriptor} does not match '{}'", config.ident_code);
                }
                Probe::Skipped(err) => {
                    log::debug!("Skipping resource {address}: {err}");
                }
            }
        }
        Err(VisaError::DeviceNotFound {
            ident_code: config.ident_code.clone(),
        })
    }

    /// Get the identification of the connected device.
    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    /// Get the vendor of the device.
    pub fn vendor(&self) -> &str {
        &self.descriptor.vendor
    }

    /// Get the device name, i.e., the model of the device.
    pub fn device_name(&self) -> &str {
        &self.descriptor.device_name
    }

    /// Get the serial number of the device. Empty if the device does not report one.
    pub fn serial_number(&self) -> &str {
        &self.descriptor.serial_number
    }

    /// Get the firmware version of the device.
    pub fn firmware_version(&self) -> &str {
        &self.descriptor.firmware_version
    }

    /// Get the resource address of the device.
    pub fn port(&self) -> &str {
        &self.descriptor.port
    }

    /// Returns `true` until the plug is closed.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Get the session to the device, or `None` once the plug is closed.
    pub fn connection(&self) -> Option<&S> {
        self.connection.as_ref()
    }

    /// Write a command to the device.
    pub fn write(&mut self, data: &str) -> Result<(), VisaError> {
        self.session()?.sendcmd(data)
    }

    /// Write a query to the device and read the response.
    pub fn query(&mut self, data: &str) -> Result<String, VisaError> {
        self.session()?.query(data)
    }

    /// Read a pending response from the device.
    pub fn read(&mut self) -> Result<String, VisaError> {
        self.session()?.read_until_terminator()
    }

    /// Close the connection to the device.
    ///
    /// The session is released even if closing it fails. Closing an already closed plug returns
    /// [`VisaError::NotConnected`].
    pub fn close(&mut self) -> Result<(), VisaError> {
        let mut session = self.connection.take().ok_or(VisaError::NotConnected)?;
        log::info!("Closing connection to {}", self.descriptor.port);
        session.close()
    }

    fn session(&mut self) -> Result<&mut S, VisaError> {
        self.connection.as_mut().ok_or(VisaError::NotConnected)
    }
}

impl<S: ResourceSession> Plug for VisaPlug<S> {
    fn tear_down(&mut self) -> Result<(), VisaError> {
        self.close()
    }
}
