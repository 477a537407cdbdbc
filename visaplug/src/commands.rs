//! The IEEE-488.2 common commands.
//!
//! Commands are written as is, queries return the response exactly as the session delivered it.

use crate::{ResourceSession, VisaError, VisaPlug};

impl<S: ResourceSession> VisaPlug<S> {
    /// Query the identification of the device (`*IDN?`).
    ///
    /// Returns a comma-separated string of vendor, device name, serial number, and firmware
    /// version.
    pub fn get_identification(&mut self) -> Result<String, VisaError> {
        self.query("*IDN?")
    }

    /// Clear the status data structures of the device (`*CLS`).
    pub fn clear_status(&mut self) -> Result<(), VisaError> {
        self.write("*CLS")
    }

    /// Reset the device (`*RST`).
    pub fn reset(&mut self) -> Result<(), VisaError> {
        self.write("*RST")
    }

    /// Make the device finish all pending commands before executing new ones (`*WAI`).
    pub fn wait_to_continue(&mut self) -> Result<(), VisaError> {
        self.write("*WAI")
    }

    /// Query and clear the standard event status register (`*ESR?`).
    pub fn get_event_status_register(&mut self) -> Result<String, VisaError> {
        self.query("*ESR?")
    }

    /// Run the self-test of the device and return its result (`*TST?`).
    pub fn self_test(&mut self) -> Result<String, VisaError> {
        self.query("*TST?")
    }

    /// Query the status byte (`*STB?`).
    pub fn get_status_byte(&mut self) -> Result<String, VisaError> {
        self.query("*STB?")
    }

    /// Send the event status enable command (`*ESE`).
    pub fn enable_event_status(&mut self) -> Result<(), VisaError> {
        self.write("*ESE")
    }

    /// Set the event status enable register to the given mask (`*ESE <mask>`).
    pub fn set_event_status_enable(&mut self, mask: u8) -> Result<(), VisaError> {
        self.write(&format!("*ESE {mask}"))
    }

    /// Query the event status enable register (`*ESE?`).
    pub fn get_event_status_enabled(&mut self) -> Result<String, VisaError> {
        self.query("*ESE?")
    }

    /// Set the operation complete bit once all pending operations are done (`*OPC`).
    pub fn set_operation_complete(&mut self) -> Result<(), VisaError> {
        self.write("*OPC")
    }

    /// Query operation complete (`*OPC?`). The device answers once all pending operations are
    /// done.
    pub fn get_operation_complete(&mut self) -> Result<String, VisaError> {
        self.query("*OPC?")
    }

    /// Send the service request enable command (`*SRE`).
    pub fn enable_service_request(&mut self) -> Result<(), VisaError> {
        self.write("*SRE")
    }

    /// Set the service request enable register to the given mask (`*SRE <mask>`).
    pub fn set_service_request_enable(&mut self, mask: u8) -> Result<(), VisaError> {
        self.write(&format!("*SRE {mask}"))
    }

    /// Query the service request enable register (`*SRE?`).
    pub fn get_service_request_enabled(&mut self) -> Result<String, VisaError> {
        self.query("*SRE?")
    }
}
