//! This module provides a resource manager for instruments controlled via raw TCP/IP sockets.
//!
//! Sessions are blocking [`Instrument`]s on a [`std::net::TcpStream`].

use std::{
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use crate::{Instrument, ResourceAddress, ResourceManager, VisaError};

/// A resource manager for raw socket instruments.
///
/// Raw sockets cannot be enumerated, so the manager is created with the socket addresses of the
/// instruments that are on the bench. They are listed as `TCPIP0::<host>::<port>::SOCKET`.
#[derive(Debug, Default)]
pub struct TcpIpResourceManager {
    resources: Vec<ResourceAddress>,
}

impl TcpIpResourceManager {
    /// Create a new resource manager from `host:port` strings.
    ///
    /// # Arguments
    /// * `sockets` - Socket addresses of the instruments, e.g., `"192.168.1.10:5025"`.
    pub fn new<I, S>(sockets: I) -> Result<Self, VisaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let resources = sockets
            .into_iter()
            .map(|sock| {
                let sock = sock.as_ref();
                let (host, port) = sock
                    .rsplit_once(':')
                    .ok_or_else(|| VisaError::InvalidAddress(sock.to_string()))?;
                let port = port
                    .parse()
                    .map_err(|_| VisaError::InvalidAddress(sock.to_string()))?;
                Ok(ResourceAddress::TcpipSocket {
                    board: 0,
                    host: host.to_string(),
                    port,
                })
            })
            .collect::<Result<Vec<_>, VisaError>>()?;
        Ok(Self { resources })
    }
}

impl ResourceManager for TcpIpResourceManager {
    type Session = Instrument<TcpStream>;

    fn list_resources(&mut self) -> Result<Vec<String>, VisaError> {
        Ok(self.resources.iter().map(|r| r.to_string()).collect())
    }

    fn open_resource(
        &mut self,
        address: &str,
        timeout: Duration,
    ) -> Result<Self::Session, VisaError> {
        let ResourceAddress::TcpipSocket { host, port, .. } =
            address.parse::<ResourceAddress>()?
        else {
            return Err(VisaError::InvalidAddress(address.to_string()));
        };
        let sock_addr = (host.as_str(), port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| VisaError::ResourceNotFound(address.to_string()))?;

        let stream = TcpStream::connect_timeout(&sock_addr, timeout)?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_read_timeout(Some(timeout))?;
        log::debug!("Opened socket {sock_addr} for {address}");
        Ok(Instrument::new(stream, timeout))
    }
}
