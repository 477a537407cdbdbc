//! Parsing of the VISA resource addresses understood by the bundled resource managers.
//!
//! Supported are addresses of the forms
//! - `ASRL<port name>::INSTR`, e.g., `ASRL/dev/ttyUSB0::INSTR` or `ASRLCOM3::INSTR`
//! - `TCPIP[board]::<host>::<port>::SOCKET`, e.g., `TCPIP0::192.168.1.10::5025::SOCKET`
//!
//! Prefixes and suffixes are matched case-insensitively.

use std::{fmt, str::FromStr};

use crate::VisaError;

/// A parsed resource address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResourceAddress {
    /// A serial port.
    Asrl {
        /// Name of the port as known to the operating system.
        port_name: String,
    },
    /// A raw TCP/IP socket.
    TcpipSocket {
        /// Board number, `0` if omitted.
        board: u16,
        /// Host name or IP address.
        host: String,
        /// TCP port.
        port: u16,
    },
}

impl ResourceAddress {
    fn parse_tcpip(addr: &str, splits: &[&str]) -> Result<Self, VisaError> {
        let invalid = || VisaError::InvalidAddress(addr.to_string());
        if splits.len() != 4 || !splits[3].eq_ignore_ascii_case("SOCKET") {
            return Err(invalid());
        }
        let board = match &splits[0][5..] {
            "" => 0,
            num => num.parse().map_err(|_| invalid())?,
        };
        let host = splits[1];
        if host.is_empty() {
            return Err(invalid());
        }
        let port = splits[2].parse().map_err(|_| invalid())?;
        Ok(ResourceAddress::TcpipSocket {
            board,
            host: host.to_string(),
            port,
        })
    }

    fn parse_asrl(addr: &str, splits: &[&str]) -> Result<Self, VisaError> {
        // serial port names on linux contain no `::`, so we can rely on the split
        if splits.len() != 2 || !splits[1].eq_ignore_ascii_case("INSTR") || splits[0].len() <= 4 {
            return Err(VisaError::InvalidAddress(addr.to_string()));
        }
        Ok(ResourceAddress::Asrl {
            port_name: splits[0][4..].to_string(),
        })
    }
}

impl FromStr for ResourceAddress {
    type Err = VisaError;

    fn from_str(addr: &str) -> Result<Self, Self::Err> {
        let splits: Vec<&str> = addr.trim().split("::").collect();
        let prefix = splits[0].to_ascii_uppercase();
        if prefix.starts_with("TCPIP") {
            Self::parse_tcpip(addr, &splits)
        } else if prefix.starts_with("ASRL") {
            Self::parse_asrl(addr, &splits)
        } else {
            Err(VisaError::InvalidAddress(addr.to_string()))
        }
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceAddress::Asrl { port_name } => write!(f, "ASRL{port_name}::INSTR"),
            ResourceAddress::TcpipSocket { board, host, port } => {
                write!(f, "TCPIP{board}::{host}::{port}::SOCKET")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::*;

    #[rstest]
    #[case("ASRL/dev/ttyUSB0::INSTR", "/dev/ttyUSB0")]
    #[case("ASRLCOM3::INSTR", "COM3")]
    #[case("asrl/dev/ttyACM1::instr", "/dev/ttyACM1")]
    fn parse_asrl(#[case] addr: &str, #[case] port_name: &str) {
        let parsed: ResourceAddress = addr.parse().unwrap();
        assert_eq!(
            parsed,
            ResourceAddress::Asrl {
                port_name: port_name.to_string()
            }
        );
    }

    #[rstest]
    #[case("TCPIP0::192.168.1.10::5025::SOCKET", 0, "192.168.1.10", 5025)]
    #[case("TCPIP::scope.local::4000::SOCKET", 0, "scope.local", 4000)]
    #[case("tcpip2::10.0.0.1::23::socket", 2, "10.0.0.1", 23)]
    fn parse_tcpip(#[case] addr: &str, #[case] board: u16, #[case] host: &str, #[case] port: u16) {
        let parsed: ResourceAddress = addr.parse().unwrap();
        assert_eq!(
            parsed,
            ResourceAddress::TcpipSocket {
                board,
                host: host.to_string(),
                port
            }
        );
    }

    #[rstest]
    #[case("GPIB0::12::INSTR")]
    #[case("ASRL::INSTR")]
    #[case("ASRLCOM3")]
    #[case("TCPIP0::192.168.1.10::inst0::INSTR")]
    #[case("TCPIP0::192.168.1.10::99999::SOCKET")]
    #[case("TCPIPx::192.168.1.10::5025::SOCKET")]
    #[case("TCPIP0::::5025::SOCKET")]
    #[case("")]
    fn parse_invalid(#[case] addr: &str) {
        match addr.parse::<ResourceAddress>() {
            Err(VisaError::InvalidAddress(a)) => assert_eq!(a, addr),
            other => panic!("Expected InvalidAddress error, got {other:?}"),
        }
    }

    #[rstest]
    fn display_is_canonical() {
        let addr: ResourceAddress = "tcpip::host::1234::socket".parse().unwrap();
        assert_eq!(addr.to_string(), "TCPIP0::host::1234::SOCKET");
        assert_eq!(addr, addr.to_string().parse().unwrap());
    }
}
