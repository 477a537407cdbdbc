//! This module provides a resource manager for instruments controlled via a serial port.
//!
//! Ports are enumerated and opened with the [`serialport`] crate. Sessions are blocking
//! [`Instrument`]s on a boxed [`SerialPort`].

use std::time::Duration;

use serialport::SerialPort;

use crate::{Instrument, ResourceAddress, ResourceManager, VisaError};

/// A resource manager for the serial ports of the host.
///
/// All serial ports that the operating system reports are listed as `ASRL<port>::INSTR`. Since
/// serial ports have no way of telling their settings, all ports are opened with the same baud
/// rate, 8 data bits, no parity, and one stop bit.
#[derive(Debug)]
pub struct SerialResourceManager {
    baud_rate: u32,
}

impl SerialResourceManager {
    /// Create a new serial resource manager that opens ports with the given baud rate.
    pub fn new(baud_rate: u32) -> Self {
        Self { baud_rate }
    }

    /// Get the baud rate that ports are opened with.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

impl Default for SerialResourceManager {
    fn default() -> Self {
        Self::new(9600)
    }
}

impl ResourceManager for SerialResourceManager {
    type Session = Instrument<Box<dyn SerialPort>>;

    fn list_resources(&mut self) -> Result<Vec<String>, VisaError> {
        let ports = serialport::available_ports()?;
        Ok(ports
            .into_iter()
            .map(|p| {
                ResourceAddress::Asrl {
                    port_name: p.port_name,
                }
                .to_string()
            })
            .collect())
    }

    fn open_resource(
        &mut self,
        address: &str,
        timeout: Duration,
    ) -> Result<Self::Session, VisaError> {
        let ResourceAddress::Asrl { port_name } = address.parse::<ResourceAddress>()? else {
            return Err(VisaError::InvalidAddress(address.to_string()));
        };
        let port = serialport::new(port_name, self.baud_rate)
            .timeout(timeout)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .open()?;
        log::debug!("Opened serial port for {address} at {} baud", self.baud_rate);
        Ok(Instrument::new(port, timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_baud_rate() {
        assert_eq!(SerialResourceManager::default().baud_rate(), 9600);
    }

    #[test]
    fn test_open_wrong_address_kind() {
        let mut rm = SerialResourceManager::new(115200);
        assert!(matches!(
            rm.open_resource("TCPIP0::127.0.0.1::5025::SOCKET", Duration::from_secs(1)),
            Err(VisaError::InvalidAddress(_))
        ));
    }
}
