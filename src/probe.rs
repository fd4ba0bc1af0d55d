//! TCP reachability checks.
//!
//! A probe answers one question: does a TCP handshake to `address:port`
//! complete within the timeout. Refusals, timeouts and every other transport
//! error collapse to `false`.
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::time::Duration;

use log::debug;

use crate::error::NetworkError;

pub const SMB_NETBIOS_PORT: u16 = 139;
pub const SMB_PORT: u16 = 445;
pub const RPC_ENDPOINT_MAPPER_PORT: u16 = 135;
pub const LDAP_PORT: u16 = 389;
pub const LDAPS_PORT: u16 = 636;
pub const GLOBAL_CATALOG_PORT: u16 = 3268;

pub trait PortProbe {
    fn probe(&self, address: IpAddr, port: u16, timeout: Duration) -> bool;
}

/// Plain TCP connect probe. The stream is dropped as soon as it is open.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpProbe;

impl PortProbe for TcpProbe {
    fn probe(&self, address: IpAddr, port: u16, timeout: Duration) -> bool {
        match connect(address, port, timeout) {
            Ok(()) => true,
            Err(e) => {
                debug!("probe {}:{} failed: {}", address, port, e);
                false
            }
        }
    }
}

/// Attempt one TCP handshake, reporting why it failed.
pub fn connect(address: IpAddr, port: u16, timeout: Duration) -> Result<(), NetworkError> {
    let addr = SocketAddr::new(address, port);
    match TcpStream::connect_timeout(&addr, timeout) {
        Ok(stream) => {
            drop(stream);
            Ok(())
        }
        Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
            Err(NetworkError::Timeout {
                endpoint: addr.to_string(),
            })
        }
        Err(e) => Err(NetworkError::Connect {
            endpoint: addr.to_string(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, TcpListener};

    #[test]
    fn open_port_is_reachable() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(TcpProbe.probe(IpAddr::V4(Ipv4Addr::LOCALHOST), port, Duration::from_secs(2)));
    }

    #[test]
    fn closed_port_degrades_to_false() {
        let port = {
            let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
            listener.local_addr().unwrap().port()
        };
        assert!(!TcpProbe.probe(IpAddr::V4(Ipv4Addr::LOCALHOST), port, Duration::from_secs(2)));
        let err = connect(IpAddr::V4(Ipv4Addr::LOCALHOST), port, Duration::from_secs(2)).unwrap_err();
        assert!(err.to_string().contains(&port.to_string()));
    }
}
