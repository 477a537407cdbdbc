//! A resource manager for a bus of simulated devices.

use std::time::Duration;

use crate::{LoopbackDevice, LoopbackSession, ResourceManager, VisaError};

/// A resource manager that allows you to test your test steps without any hardware.
///
/// # Example
///
/// Let us put a meter without a serial number and a device that does not respond on the bus,
/// and connect to the meter via a [`crate::VisaPlug`].
///
/// ```
/// use visaplug::{LoopbackDevice, LoopbackResourceManager, Plug, PlugConfig, VisaPlug};
///
/// // Keep a handle on the device in order to check what was sent to it later on.
/// let meter = LoopbackDevice::new("ACME,Meter,1.0").with_response("*OPC?", "1");
/// let mut rm = LoopbackResourceManager::new()
///     .with_device("GPIB0::01::INSTR", LoopbackDevice::unresponsive())
///     .with_device("GPIB0::02::INSTR", meter.clone());
///
/// let mut plug = VisaPlug::connect(&mut rm, &PlugConfig::new("Meter")).unwrap();
/// assert_eq!(plug.serial_number(), "");
/// assert_eq!(plug.firmware_version(), "1.0");
///
/// plug.reset().unwrap();
/// assert_eq!(plug.get_operation_complete().unwrap(), "1");
/// plug.tear_down().unwrap();
///
/// assert_eq!(meter.written(), vec!["*IDN?", "*RST", "*OPC?"]);
/// assert_eq!(meter.times_closed(), 1);
/// ```
#[derive(Debug, Default)]
pub struct LoopbackResourceManager {
    devices: Vec<(String, LoopbackDevice)>,
}

impl LoopbackResourceManager {
    /// Create a new, empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device to the bus.
    ///
    /// Devices are listed in the order they were added. Adding a device under an address that
    /// is already taken replaces the old device.
    pub fn with_device(mut self, address: &str, device: LoopbackDevice) -> Self {
        self.add_device(address, device);
        self
    }

    /// Add a device to the bus, see [`LoopbackResourceManager::with_device`].
    pub fn add_device(&mut self, address: &str, device: LoopbackDevice) {
        match self.devices.iter_mut().find(|(addr, _)| addr == address) {
            Some(entry) => entry.1 = device,
            None => self.devices.push((address.to_string(), device)),
        }
    }

    /// Remove a device from the bus and return it.
    pub fn remove_device(&mut self, address: &str) -> Option<LoopbackDevice> {
        let idx = self.devices.iter().position(|(addr, _)| addr == address)?;
        Some(self.devices.remove(idx).1)
    }

    /// Get the device with the given address.
    pub fn device(&self, address: &str) -> Option<&LoopbackDevice> {
        self.devices
            .iter()
            .find(|(addr, _)| addr == address)
            .map(|(_, device)| device)
    }
}

impl ResourceManager for LoopbackResourceManager {
    type Session = LoopbackSession;

    fn list_resources(&mut self) -> Result<Vec<String>, VisaError> {
        Ok(self.devices.iter().map(|(addr, _)| addr.clone()).collect())
    }

    fn open_resource(
        &mut self,
        address: &str,
        timeout: Duration,
    ) -> Result<Self::Session, VisaError> {
        self.device(address)
            .ok_or_else(|| VisaError::ResourceNotFound(address.to_string()))?
            .open(address, timeout)
    }
}
