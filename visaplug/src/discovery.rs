//! Discovery of devices by their identification.
//!
//! Every resource that a [`ResourceManager`] lists is opened and asked for its identification.
//! Resources that cannot be opened, do not answer, or answer with something that is not an
//! identification are skipped. Only if no resource at all matches, discovery fails.

use std::fmt;

use serde::Serialize;

use crate::{OpenOptions, PlugConfig, ResourceManager, ResourceSession, VisaError};

/// The identification of a device found during a scan, together with its resource address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    /// Resource address of the device.
    pub port: String,
    /// Vendor of the device.
    pub vendor: String,
    /// Model name of the device.
    pub device_name: String,
    /// Serial number of the device, empty if the device does not report one.
    pub serial_number: String,
    /// Firmware version of the device.
    pub firmware_version: String,
}

impl DeviceDescriptor {
    /// Parse the response to an identification query.
    ///
    /// Line terminators are removed and the response is split at commas. The first four fields
    /// are the vendor, device name, serial number, and firmware version. Devices that do not have
    /// a serial number answer with three fields only: the serial number is then empty and the
    /// third field is the firmware version.
    ///
    /// # Arguments
    /// * `port` - The resource address the response came from.
    /// * `response` - The response to the identification query.
    pub fn parse(port: &str, response: &str) -> Result<Self, VisaError> {
        let cleaned: String = response.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
        if cleaned.is_empty() {
            return Err(VisaError::ResponseParseError(response.to_string()));
        }
        let fields: Vec<&str> = cleaned.split(',').collect();
        let (vendor, device_name, serial_number, firmware_version) = match fields.as_slice() {
            [vendor, device_name, firmware_version] => {
                (*vendor, *device_name, "", *firmware_version)
            }
            [vendor, device_name, serial_number, firmware_version, ..] => {
                (*vendor, *device_name, *serial_number, *firmware_version)
            }
            _ => return Err(VisaError::ResponseParseError(response.to_string())),
        };
        Ok(Self {
            port: port.to_string(),
            vendor: vendor.to_string(),
            device_name: device_name.to_string(),
            serial_number: serial_number.to_string(),
            firmware_version: firmware_version.to_string(),
        })
    }

    /// Check if the device matches an identification code.
    ///
    /// A device matches if the code is contained in any of its identification fields or if the
    /// code is its resource address. An empty code matches every device.
    pub fn matches(&self, ident_code: &str) -> bool {
        self.port == ident_code
            || [
                &self.vendor,
                &self.device_name,
                &self.serial_number,
                &self.firmware_version,
            ]
            .iter()
            .any(|field| field.contains(ident_code))
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {},{},{},{}",
            self.port, self.vendor, self.device_name, self.serial_number, self.firmware_version
        )
    }
}

/// Outcome of probing a single resource.
pub(crate) enum Probe<S> {
    /// The device matches, the session is still open.
    Matched(DeviceDescriptor, S),
    /// The device answered but does not match. Its session is closed.
    Mismatch(DeviceDescriptor),
    /// The resource could not be identified.
    Skipped(VisaError),
}

/// Open a resource, identify it, and check it against the identification code.
pub(crate) fn probe<M: ResourceManager>(
    manager: &mut M,
    address: &str,
    ident_code: &str,
    idn_query: &str,
    options: &OpenOptions,
) -> Probe<M::Session> {
    let mut session = match manager.open(address, options) {
        Ok(session) => session,
        Err(err) => return Probe::Skipped(err),
    };
    let descriptor = match session
        .query(idn_query)
        .and_then(|resp| DeviceDescriptor::parse(address, &resp))
    {
        Ok(descriptor) => descriptor,
        Err(err) => {
            let _ = session.close();
            return Probe::Skipped(err);
        }
    };
    if descriptor.matches(ident_code) {
        Probe::Matched(descriptor, session)
    } else {
        let _ = session.close();
        Probe::Mismatch(descriptor)
    }
}

/// A lazy scan over all resources of a resource manager.
///
/// Each call to `next` probes resources until the next matching device is found. If all
/// resources were probed without a single match, the scan yields one
/// [`VisaError::DeviceNotFound`] and ends. Create a new scan to look at the bus again.
pub struct DeviceScan<'a, M: ResourceManager> {
    manager: &'a mut M,
    addresses: std::vec::IntoIter<String>,
    ident_code: String,
    idn_query: String,
    options: OpenOptions,
    num_matches: usize,
    done: bool,
}

impl<M: ResourceManager> Iterator for DeviceScan<'_, M> {
    type Item = Result<DeviceDescriptor, VisaError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        for address in self.addresses.by_ref() {
            match probe(
                self.manager,
                &address,
                &self.ident_code,
                &self.idn_query,
                &self.options,
            ) {
                Probe::Matched(descriptor, mut session) => {
                    let _ = session.close();
                    self.num_matches += 1;
                    return Some(Ok(descriptor));
                }
                Probe::Mismatch(descriptor) => {
                    log::debug!("{descriptor} does not match '{}'", self.ident_code);
                }
                Probe::Skipped(err) => {
                    log::debug!("Skipping resource {address}: {err}");
                }
            }
        }
        self.done = true;
        if self.num_matches == 0 {
            Some(Err(VisaError::DeviceNotFound {
                ident_code: self.ident_code.clone(),
            }))
        } else {
            None
        }
    }
}

/// Start a scan for devices matching the identification code of the configuration.
///
/// Listing the resources happens right away, probing them happens lazily while iterating. If
/// the resource manager fails to list its resources, the error is returned.
///
/// # Example
///
/// ```
/// use visaplug::{LoopbackDevice, LoopbackResourceManager, PlugConfig, scan};
///
/// let mut rm = LoopbackResourceManager::new()
///     .with_device("GPIB0::01::INSTR", LoopbackDevice::new("ACME,Meter,SN01,1.0"))
///     .with_device("GPIB0::02::INSTR", LoopbackDevice::new("ACME,Source,SN02,1.0"));
///
/// for device in scan(&mut rm, &PlugConfig::new("Source")).unwrap() {
///     println!("{}", device.unwrap());
/// }
/// ```
pub fn scan<'a, M: ResourceManager>(
    manager: &'a mut M,
    config: &PlugConfig,
) -> Result<DeviceScan<'a, M>, VisaError> {
    let addresses = manager.list_resources()?;
    log::debug!("Scanning {} resources", addresses.len());
    Ok(DeviceScan {
        manager,
        addresses: addresses.into_iter(),
        ident_code: config.ident_code.clone(),
        idn_query: config.idn_query.clone(),
        options: config.open_options(),
        num_matches: 0,
        done: false,
    })
}

/// Find all devices matching the identification code of the configuration.
///
/// Returns [`VisaError::DeviceNotFound`] if no device matches.
pub fn find_devices<M: ResourceManager>(
    manager: &mut M,
    config: &PlugConfig,
) -> Result<Vec<DeviceDescriptor>, VisaError> {
    scan(manager, config)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::*;

    #[rstest]
    #[case("vendor,device,sn,fw", "vendor", "device", "sn", "fw")]
    #[case("vendor,device,sn,fw\r\n", "vendor", "device", "sn", "fw")]
    #[case("vendor,device,fw\n", "vendor", "device", "", "fw")]
    #[case("vendor,device,sn,fw,hw", "vendor", "device", "sn", "fw")]
    #[case("vendor,,,", "vendor", "", "", "")]
    fn parse_identification(
        #[case] response: &str,
        #[case] vendor: &str,
        #[case] device_name: &str,
        #[case] serial_number: &str,
        #[case] firmware_version: &str,
    ) {
        let desc = DeviceDescriptor::parse("GPIB0::01::INSTR", response).unwrap();
        assert_eq!(desc.port, "GPIB0::01::INSTR");
        assert_eq!(desc.vendor, vendor);
        assert_eq!(desc.device_name, device_name);
        assert_eq!(desc.serial_number, serial_number);
        assert_eq!(desc.firmware_version, firmware_version);
    }

    #[rstest]
    #[case("")]
    #[case("\r\n")]
    #[case("just a name")]
    #[case("vendor,device")]
    fn parse_identification_fails(#[case] response: &str) {
        match DeviceDescriptor::parse("GPIB0::01::INSTR", response) {
            Err(VisaError::ResponseParseError(resp)) => assert_eq!(resp, response),
            other => panic!("Expected ResponseParseError, got {other:?}"),
        }
    }

    #[fixture]
    fn desc() -> DeviceDescriptor {
        DeviceDescriptor::parse("GPIB0::07::INSTR", "ACME,Meter 3000,SN1234,2.01").unwrap()
    }

    #[rstest]
    #[case("")]
    #[case("ACME")]
    #[case("Meter")]
    #[case("SN12")]
    #[case("2.01")]
    #[case("GPIB0::07::INSTR")]
    fn matches(desc: DeviceDescriptor, #[case] ident_code: &str) {
        assert!(desc.matches(ident_code));
    }

    #[rstest]
    #[case("acme")]
    #[case("GPIB0::07")]
    #[case("ACME,Meter")]
    #[case("SN9999")]
    fn does_not_match(desc: DeviceDescriptor, #[case] ident_code: &str) {
        assert!(!desc.matches(ident_code));
    }

    #[rstest]
    fn display(desc: DeviceDescriptor) {
        assert_eq!(
            desc.to_string(),
            "GPIB0::07::INSTR: ACME,Meter 3000,SN1234,2.01"
        );
    }
}
